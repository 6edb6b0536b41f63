use crate::error::SyncError;
use crate::models::{Basename, RetentionWindow};
use chrono::{Days, Months, NaiveDate};

/// Compute the basenames that should exist locally for `reference`.
///
/// The reference date always comes first. Without square mode the days window
/// follows, then one basename per anniversary. In square mode each anniversary
/// is followed by its own days window. Duplicates are kept so the length is
/// always `window.expected_len()`.
///
/// Any date that falls outside the calendar range fails the whole computation;
/// a partial list could otherwise mark valid images as stale.
pub fn retention_names(reference: NaiveDate, window: &RetentionWindow) -> Result<Vec<Basename>, SyncError> {
    // The oldest date bounds every other one, so check it before listing
    minus_days(minus_years(reference, window.years)?, window.days)?;

    let mut names = vec![Basename::from_date(reference)];

    if window.square {
        for year in 1..=window.years {
            let anniversary = minus_years(reference, year)?;
            names.push(Basename::from_date(anniversary));
            for day in 1..=window.days {
                names.push(Basename::from_date(minus_days(anniversary, day)?));
            }
        }
    } else {
        for day in 1..=window.days {
            names.push(Basename::from_date(minus_days(reference, day)?));
        }
        for year in 1..=window.years {
            names.push(Basename::from_date(minus_years(reference, year)?));
        }
    }

    Ok(names)
}

fn minus_days(date: NaiveDate, days: u32) -> Result<NaiveDate, SyncError> {
    date.checked_sub_days(Days::new(u64::from(days)))
        .ok_or_else(|| calendar_error(date, format!("{} days", days)))
}

/// Same month and day `years` earlier; Feb 29 becomes Feb 28 in common years
fn minus_years(date: NaiveDate, years: u32) -> Result<NaiveDate, SyncError> {
    years
        .checked_mul(12)
        .and_then(|months| date.checked_sub_months(Months::new(months)))
        .ok_or_else(|| calendar_error(date, format!("{} years", years)))
}

fn calendar_error(date: NaiveDate, offset: String) -> SyncError {
    SyncError::Calendar {
        reference: date.to_string(),
        offset,
    }
}
