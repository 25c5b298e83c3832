// Applies a shift policy to every matching task line of one document.
use crate::config::RecognitionConfig;
use crate::model::matcher::find_task_lines;
use crate::model::shift::compute_replacement;
use crate::model::{InvalidDate, MatchMode, Replacement, ShiftPolicy, format_annotation};
use chrono::NaiveDate;

/// Output of [`rewrite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    /// True when at least one replacement differs from the text it replaced.
    pub changed: bool,
    /// Number of annotations actually rewritten or added.
    pub replacements: usize,
    /// Annotations whose date could not be parsed; left verbatim.
    pub invalid_dates: Vec<InvalidDate>,
}

/// Rewrites `text` in a single pass over the matcher output.
///
/// Replacements are spliced in between untouched slices of the input, so text
/// introduced by one replacement is never rescanned. The input is not
/// modified; when nothing changes the returned text equals it byte for byte.
pub fn rewrite(text: &str, policy: ShiftPolicy, mode: MatchMode, now: NaiveDate) -> Rewrite {
    let mut out = String::with_capacity(text.len() + 16);
    let mut copied_to = 0;
    let mut replacements = 0;
    let mut invalid_dates = Vec::new();

    for m in find_task_lines(text, mode) {
        let (span, replacement) = match &m.annotation {
            Some(annotation) => {
                let existing = match &annotation.date {
                    Ok(d) => *d,
                    Err(invalid) => {
                        log::warn!(
                            "Skipping task '{}': {}",
                            m.description(text).trim(),
                            invalid
                        );
                        invalid_dates.push(invalid.clone());
                        continue;
                    }
                };
                let Replacement::Date(next) = compute_replacement(policy, now, Some(existing))
                else {
                    continue;
                };
                (annotation.span.clone(), format_annotation(next))
            }
            None => {
                let Replacement::Date(next) = compute_replacement(policy, now, None) else {
                    continue;
                };
                // Append to the line, dropping trailing blanks of the description.
                let desc = m.description(text);
                let kept = desc.trim_end_matches([' ', '\t']);
                let start = m.description.start + kept.len();
                (start..m.line.end, format!(" {}", format_annotation(next)))
            }
        };

        if text[span.clone()] == replacement {
            continue;
        }
        log::debug!(
            "{}: '{}' -> '{}'",
            policy,
            &text[span.clone()],
            replacement.trim_start()
        );
        out.push_str(&text[copied_to..span.start]);
        out.push_str(&replacement);
        copied_to = span.end;
        replacements += 1;
    }

    if replacements == 0 {
        return Rewrite {
            text: text.to_string(),
            changed: false,
            replacements,
            invalid_dates,
        };
    }
    out.push_str(&text[copied_to..]);
    Rewrite {
        text: out,
        changed: true,
        replacements,
        invalid_dates,
    }
}

/// Convenience wrapper binding the policy to its configured match mode.
pub fn rewrite_with_policy(
    text: &str,
    policy: ShiftPolicy,
    recognition: &RecognitionConfig,
    now: NaiveDate,
) -> Rewrite {
    rewrite(text, policy, policy.match_mode(recognition), now)
}
