// Line-oriented matcher for checklist items and their due-date annotations.
//
// The scan walks the text one line at a time (both `\n` and `\r\n` endings)
// and only looks at lines starting with the checklist prefix, optionally
// indented. Two modes:
//
//   WithDate(gap)  -> one match per `📅<gap>YYYY-MM-DD` on a checklist line
//   WithoutDate    -> one match per checklist line without any marker
//
// Matches are produced lazily, in document order, and never overlap.

use crate::model::item::{
    Annotation, CHECKLIST_PREFIX, DATE_FORMAT, InvalidDate, MARKER, MarkerGap, MatchMode,
    TaskMatch,
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{CaptureMatches, Regex};
use std::ops::Range;

// The whitespace run is captured whole so the gap width can be checked
// against the configured `MarkerGap` afterwards.
static ANNOTATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"{}(\s*)(\d{{4}}-\d{{2}}-\d{{2}})\b",
        regex::escape(MARKER)
    ))
    .expect("valid annotation regex")
});

impl MarkerGap {
    /// Whether a whitespace run of `width` characters satisfies this gap.
    pub fn accepts(&self, width: usize) -> bool {
        match *self {
            MarkerGap::Exactly(n) => width == n,
            MarkerGap::AtLeast(n) => width >= n,
        }
    }
}

/// Parses a `YYYY-MM-DD` string, rejecting impossible calendar dates.
pub fn parse_date(s: &str) -> Result<NaiveDate, InvalidDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| InvalidDate(s.to_string()))
}

/// Enumerates the task lines of `text` for the given mode.
pub fn find_task_lines(text: &str, mode: MatchMode) -> TaskMatches<'_> {
    TaskMatches {
        text,
        mode,
        cursor: 0,
        current: None,
    }
}

/// Returns the description span if `line` (starting at byte `start`) is a
/// checklist item.
fn checklist_description(line: &str, start: usize) -> Option<Range<usize>> {
    let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
    let rest = &line[indent..];
    if !rest.starts_with(CHECKLIST_PREFIX) {
        return None;
    }
    let desc_start = start + indent + CHECKLIST_PREFIX.len();
    Some(desc_start..start + line.len())
}

struct LineScan<'t> {
    line: Range<usize>,
    description: Range<usize>,
    hits: CaptureMatches<'static, 't>,
}

/// Lazy iterator over the matches of one document.
pub struct TaskMatches<'t> {
    text: &'t str,
    mode: MatchMode,
    cursor: usize,
    current: Option<LineScan<'t>>,
}

impl<'t> TaskMatches<'t> {
    /// Advances to the next line; returns its span without the terminator.
    fn next_line(&mut self) -> Option<Range<usize>> {
        if self.cursor >= self.text.len() {
            return None;
        }
        let start = self.cursor;
        let rest = &self.text[start..];
        let (mut end, next) = match rest.find('\n') {
            Some(i) => (start + i, start + i + 1),
            None => (self.text.len(), self.text.len()),
        };
        if end > start && self.text.as_bytes()[end - 1] == b'\r' {
            end -= 1;
        }
        self.cursor = next;
        Some(start..end)
    }

    fn next_annotation(&mut self, gap: MarkerGap) -> Option<TaskMatch> {
        loop {
            if let Some(scan) = self.current.as_mut() {
                let offset = scan.description.start;
                for caps in scan.hits.by_ref() {
                    let (Some(whole), Some(ws), Some(date)) = (caps.get(0), caps.get(1), caps.get(2))
                    else {
                        continue;
                    };
                    if !gap.accepts(ws.as_str().chars().count()) {
                        continue;
                    }
                    return Some(TaskMatch {
                        line: scan.line.clone(),
                        description: scan.description.clone(),
                        annotation: Some(Annotation {
                            span: offset + whole.start()..offset + whole.end(),
                            date_span: offset + date.start()..offset + date.end(),
                            date: parse_date(date.as_str()),
                        }),
                    });
                }
                self.current = None;
            }

            let line = self.next_line()?;
            let text = self.text;
            if let Some(description) = checklist_description(&text[line.clone()], line.start) {
                let hits = ANNOTATION_RE.captures_iter(&text[description.clone()]);
                self.current = Some(LineScan {
                    line,
                    description,
                    hits,
                });
            }
        }
    }

    fn next_undated(&mut self) -> Option<TaskMatch> {
        while let Some(line) = self.next_line() {
            let Some(description) = checklist_description(&self.text[line.clone()], line.start)
            else {
                continue;
            };
            let desc = &self.text[description.clone()];
            if desc.contains(MARKER) || desc.trim().is_empty() {
                continue;
            }
            return Some(TaskMatch {
                line,
                description,
                annotation: None,
            });
        }
        None
    }
}

impl Iterator for TaskMatches<'_> {
    type Item = TaskMatch;

    fn next(&mut self) -> Option<TaskMatch> {
        match self.mode {
            MatchMode::WithDate(gap) => self.next_annotation(gap),
            MatchMode::WithoutDate => self.next_undated(),
        }
    }
}
