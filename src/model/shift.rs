// Date-shift policy engine.
use crate::model::item::{MatchMode, Replacement, ShiftPolicy};
use crate::config::RecognitionConfig;
use chrono::{Datelike, Days, NaiveDate};

/// Adds `months` calendar months to `date`. A day that does not exist in the
/// target month rolls forward into the next one (Jan 31 + 1 month = Mar 3,
/// Feb 29 + 12 months = Mar 1) instead of being clamped.
///
/// Returns `None` only when the result leaves chrono's supported range.
pub fn add_months_overflowing(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let total = date.year() * 12 + date.month0() as i32 + months;
    let year = total.div_euclid(12);
    let month0 = total.rem_euclid(12) as u32;
    let first = NaiveDate::from_ymd_opt(year, month0 + 1, 1)?;
    first.checked_add_days(Days::new(u64::from(date.day0())))
}

/// Computes the replacement date for one match.
///
/// `now` is the date-only snapshot of the batch run. `existing` is the parsed
/// annotation date, if the match carried one.
pub fn compute_replacement(
    policy: ShiftPolicy,
    now: NaiveDate,
    existing: Option<NaiveDate>,
) -> Replacement {
    let next = match policy {
        ShiftPolicy::AdvanceOneYear => {
            existing.and_then(|d| add_months_overflowing(d, 12))
        }
        ShiftPolicy::SetOneMonthFromToday => add_months_overflowing(now, 1),
        ShiftPolicy::AdvanceOverdueToTomorrow => match existing {
            Some(d) if d < now => now.checked_add_days(Days::new(1)),
            _ => None,
        },
        ShiftPolicy::SetMissingToToday => Some(now),
    };
    next.map_or(Replacement::NoChange, Replacement::Date)
}

impl ShiftPolicy {
    /// The matcher mode each policy runs with.
    pub fn match_mode(&self, recognition: &RecognitionConfig) -> MatchMode {
        match self {
            ShiftPolicy::AdvanceOneYear => MatchMode::WithDate(recognition.advance_one_year),
            ShiftPolicy::AdvanceOverdueToTomorrow => {
                MatchMode::WithDate(recognition.advance_overdue_to_tomorrow)
            }
            ShiftPolicy::SetOneMonthFromToday | ShiftPolicy::SetMissingToToday => {
                MatchMode::WithoutDate
            }
        }
    }
}
