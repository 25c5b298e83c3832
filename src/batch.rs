/*
 * duebump/src/batch.rs
 *
 * Batch driver: one `now` snapshot, every document of a source rewritten
 * with one policy, persisted through a sink only when something changed.
 *
 * Failures stay local to their document. Nothing here aborts a run once the
 * document list has been obtained.
 */

use crate::config::RecognitionConfig;
use crate::model::{InvalidDate, MARKER, MatchMode, ShiftPolicy};
use crate::rewriter::rewrite;
use crate::storage::{DocumentHandle, DocumentSink, DocumentSource};
use anyhow::Result;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fmt;

/// Values fixed for the duration of one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchContext {
    pub today: NaiveDate,
    pub dry_run: bool,
}

impl BatchContext {
    /// Samples the local clock once.
    pub fn now() -> Self {
        Self::at(Local::now().date_naive())
    }

    pub fn at(today: NaiveDate) -> Self {
        Self {
            today,
            dry_run: false,
        }
    }
}

/// Per-document failure taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentError {
    InvalidDate { handle: DocumentHandle, text: String },
    ReadFailure { handle: DocumentHandle, reason: String },
    WriteFailure { handle: DocumentHandle, reason: String },
}

impl DocumentError {
    pub fn invalid_date(handle: &DocumentHandle, invalid: &InvalidDate) -> Self {
        Self::InvalidDate {
            handle: handle.clone(),
            text: invalid.0.clone(),
        }
    }

    /// I/O failures skip the whole document; invalid dates only skip one task.
    pub fn is_io(&self) -> bool {
        !matches!(self, DocumentError::InvalidDate { .. })
    }
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::InvalidDate { handle, text } => {
                write!(f, "{}: '{}' is not a valid calendar date", handle, text)
            }
            DocumentError::ReadFailure { handle, reason } => {
                write!(f, "{}: read failed: {}", handle, reason)
            }
            DocumentError::WriteFailure { handle, reason } => {
                write!(f, "{}: write failed: {}", handle, reason)
            }
        }
    }
}

impl std::error::Error for DocumentError {}

/// Aggregate outcome of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub today: NaiveDate,
    pub scanned: usize,
    /// Documents whose text changed (and were written, unless dry run).
    pub changed: Vec<DocumentHandle>,
    pub replacements: usize,
    pub failures: Vec<DocumentError>,
    pub dry_run: bool,
}

impl BatchSummary {
    pub fn any_changed(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Documents skipped because of read or write errors.
    pub fn io_failure_count(&self) -> usize {
        self.failures.iter().filter(|f| f.is_io()).count()
    }

    /// The single user-facing completion message.
    pub fn message(&self, policy: ShiftPolicy) -> String {
        let verb = if self.dry_run { "would update" } else { "updated" };
        let mut msg = if self.any_changed() {
            format!(
                "{}: {} {} task(s) in {} of {} file(s)",
                policy,
                verb,
                self.replacements,
                self.changed.len(),
                self.scanned
            )
        } else {
            format!("{}: no due dates to update in {} file(s)", policy, self.scanned)
        };
        let io = self.io_failure_count();
        if io > 0 {
            msg.push_str(&format!(", {} file(s) skipped", io));
        }
        msg
    }
}

/// Rewrites every document of `source` with `policy`.
///
/// Returns an error only when the document list itself cannot be obtained.
pub fn run_batch<S, W>(
    source: &S,
    sink: &W,
    policy: ShiftPolicy,
    recognition: &RecognitionConfig,
    ctx: BatchContext,
) -> Result<BatchSummary>
where
    S: DocumentSource + ?Sized,
    W: DocumentSink + ?Sized,
{
    let mode = policy.match_mode(recognition);
    if let MatchMode::WithDate(gap) = mode {
        log::debug!("Recognising {} dates separated by {}", MARKER, gap);
    }
    let documents = source.list_documents()?;
    log::info!(
        "Running {} over {} document(s) with today = {}",
        policy,
        documents.len(),
        ctx.today
    );

    let mut summary = BatchSummary {
        today: ctx.today,
        dry_run: ctx.dry_run,
        ..BatchSummary::default()
    };

    for handle in documents {
        summary.scanned += 1;
        log::debug!("Checking due dates in {}", handle);

        let text = match source.read_text(&handle) {
            Ok(t) => t,
            Err(e) => {
                log::error!("Skipping {}: {:#}", handle, e);
                summary.failures.push(DocumentError::ReadFailure {
                    handle,
                    reason: format!("{:#}", e),
                });
                continue;
            }
        };

        let result = rewrite(&text, policy, mode, ctx.today);
        summary.failures.extend(
            result
                .invalid_dates
                .iter()
                .map(|invalid| DocumentError::invalid_date(&handle, invalid)),
        );
        if !result.changed {
            continue;
        }

        if !ctx.dry_run
            && let Err(e) = sink.write_text(&handle, &result.text)
        {
            log::error!("Could not save {}: {:#}", handle, e);
            summary.failures.push(DocumentError::WriteFailure {
                handle,
                reason: format!("{:#}", e),
            });
            continue;
        }

        log::info!("Updated {} task(s) in {}", result.replacements, handle);
        summary.replacements += result.replacements;
        summary.changed.push(handle);
    }

    log::info!("{}", summary.message(policy));
    Ok(summary)
}
