// Core data types for task lines, due-date annotations and shift policies.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use strum::{Display, EnumIter, EnumString};

/// The due-date marker glyph (U+1F4C5 CALENDAR).
pub const MARKER: &str = "📅";

/// Literal prefix of an unchecked checklist item.
pub const CHECKLIST_PREFIX: &str = "- [ ] ";

/// Date format used both for recognition and output.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Width requirement for the whitespace run between the marker and the date.
///
/// Written in the config as `"1"` (exactly one) or `"2+"` (two or more).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MarkerGap {
    Exactly(usize),
    AtLeast(usize),
}

impl TryFrom<String> for MarkerGap {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let s = s.trim();
        let (digits, at_least) = match s.strip_suffix('+') {
            Some(d) => (d, true),
            None => (s, false),
        };
        let n = digits
            .parse::<usize>()
            .map_err(|_| format!("Invalid marker gap '{}', expected e.g. \"1\" or \"2+\"", s))?;
        Ok(if at_least {
            MarkerGap::AtLeast(n)
        } else {
            MarkerGap::Exactly(n)
        })
    }
}

impl From<MarkerGap> for String {
    fn from(gap: MarkerGap) -> Self {
        match gap {
            MarkerGap::Exactly(n) => n.to_string(),
            MarkerGap::AtLeast(n) => format!("{}+", n),
        }
    }
}

impl Default for MarkerGap {
    fn default() -> Self {
        MarkerGap::Exactly(1)
    }
}

impl fmt::Display for MarkerGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerGap::Exactly(1) => write!(f, "exactly 1 space"),
            MarkerGap::Exactly(n) => write!(f, "exactly {} spaces", n),
            MarkerGap::AtLeast(n) => write!(f, "{} or more spaces", n),
        }
    }
}

/// Selects which checklist lines the matcher yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Every due-date annotation on a checklist line, one match per annotation.
    WithDate(MarkerGap),
    /// Checklist lines with no marker anywhere after the prefix.
    WithoutDate,
}

/// The date substring of an annotation was not a real calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDate(pub String);

impl fmt::Display for InvalidDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a valid calendar date", self.0)
    }
}

impl std::error::Error for InvalidDate {}

/// A recognised `📅 YYYY-MM-DD` annotation. Spans are byte offsets into the
/// scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Marker, gap and date.
    pub span: Range<usize>,
    pub date_span: Range<usize>,
    pub date: Result<NaiveDate, InvalidDate>,
}

/// One matcher hit. Spans are byte offsets into the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMatch {
    /// Whole line, without the line terminator.
    pub line: Range<usize>,
    pub description: Range<usize>,
    pub annotation: Option<Annotation>,
}

impl TaskMatch {
    pub fn description<'t>(&self, text: &'t str) -> &'t str {
        &text[self.description.clone()]
    }

    pub fn line<'t>(&self, text: &'t str) -> &'t str {
        &text[self.line.clone()]
    }
}

/// The fixed set of batch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum ShiftPolicy {
    AdvanceOneYear,
    SetOneMonthFromToday,
    AdvanceOverdueToTomorrow,
    SetMissingToToday,
}

impl ShiftPolicy {
    /// Short description shown by `duebump policies` and in help output.
    pub fn describe(&self) -> &'static str {
        match self {
            ShiftPolicy::AdvanceOneYear => "Move every due date one year later",
            ShiftPolicy::SetOneMonthFromToday => "Give undated tasks a due date one month from today",
            ShiftPolicy::AdvanceOverdueToTomorrow => "Move overdue tasks to tomorrow",
            ShiftPolicy::SetMissingToToday => "Give undated tasks a due date of today",
        }
    }
}

/// Result of the policy engine for one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement {
    Date(NaiveDate),
    NoChange,
}

/// Renders the annotation text emitted for `date`: marker, one space, date.
pub fn format_annotation(date: NaiveDate) -> String {
    format!("{} {}", MARKER, date.format(DATE_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_marker_is_calendar_emoji() {
        assert_eq!(MARKER.as_bytes(), &[0xF0, 0x9F, 0x93, 0x85]);
        assert_eq!(MARKER.chars().count(), 1);
        assert_eq!(MARKER.chars().next(), Some('\u{1F4C5}'));
    }

    #[test]
    fn test_policy_names_are_kebab_case() {
        let names: Vec<String> = ShiftPolicy::iter().map(|p| p.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "advance-one-year",
                "set-one-month-from-today",
                "advance-overdue-to-tomorrow",
                "set-missing-to-today"
            ]
        );
        assert_eq!(
            ShiftPolicy::from_str("advance-overdue-to-tomorrow").ok(),
            Some(ShiftPolicy::AdvanceOverdueToTomorrow)
        );
        assert!(ShiftPolicy::from_str("advance-two-years").is_err());
    }

    #[test]
    fn test_gap_config_strings() {
        assert_eq!(MarkerGap::try_from("1".to_string()), Ok(MarkerGap::Exactly(1)));
        assert_eq!(MarkerGap::try_from(" 2+ ".to_string()), Ok(MarkerGap::AtLeast(2)));
        assert!(MarkerGap::try_from("two".to_string()).is_err());
        assert_eq!(String::from(MarkerGap::AtLeast(2)), "2+");
    }

    #[test]
    fn test_format_annotation_zero_pads() {
        let d = NaiveDate::from_ymd_opt(987, 3, 4).unwrap();
        assert_eq!(format_annotation(d), "📅 0987-03-04");
    }
}
