use chrono::{Duration, Local, NaiveDate};

use crate::error::Result;

/// A calendar day argument: either an already-parsed date or an ISO
/// `YYYY-MM-DD` string taken verbatim from user input.
#[derive(Debug, Clone)]
pub enum Day {
    Date(NaiveDate),
    Iso(String),
}

impl Day {
    pub fn resolve(self) -> Result<NaiveDate> {
        match self {
            Day::Date(date) => Ok(date),
            Day::Iso(text) => Ok(text.parse()?),
        }
    }
}

impl From<NaiveDate> for Day {
    fn from(date: NaiveDate) -> Self {
        Day::Date(date)
    }
}

impl From<&str> for Day {
    fn from(text: &str) -> Self {
        Day::Iso(text.to_string())
    }
}

impl From<String> for Day {
    fn from(text: String) -> Self {
        Day::Iso(text)
    }
}

/// Resolves an optional end-date argument, defaulting to today.
pub fn end_or_today(end: Option<Day>) -> Result<NaiveDate> {
    match end {
        Some(day) => day.resolve(),
        None => Ok(Local::now().date_naive()),
    }
}

/// The `days` consecutive dates ending at and including `end`, newest first.
pub fn date_range(end: NaiveDate, days: u32) -> impl Iterator<Item = NaiveDate> {
    (0..i64::from(days)).map(move |back| end - Duration::days(back))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(text: &str) -> NaiveDate {
        text.parse().unwrap()
    }

    #[test]
    fn day_from_date_resolves_to_itself() {
        let day: Day = date("2024-01-10").into();
        assert_eq!(day.resolve().unwrap(), date("2024-01-10"));
    }

    #[test]
    fn day_from_iso_string_parses() {
        let day: Day = "2024-01-10".into();
        assert_eq!(day.resolve().unwrap(), date("2024-01-10"));
    }

    #[test]
    fn day_from_garbage_string_fails() {
        let day: Day = "last tuesday".into();
        assert!(day.resolve().is_err());
    }

    #[test]
    fn range_walks_backward_from_end() {
        let dates: Vec<NaiveDate> = date_range(date("2024-01-10"), 3).collect();
        assert_eq!(
            dates,
            vec![date("2024-01-10"), date("2024-01-09"), date("2024-01-08")]
        );
    }

    #[test]
    fn range_crosses_month_boundary() {
        let dates: Vec<NaiveDate> = date_range(date("2024-03-01"), 2).collect();
        assert_eq!(dates, vec![date("2024-03-01"), date("2024-02-29")]);
    }

    #[test]
    fn explicit_end_wins_over_today() {
        let end = end_or_today(Some("2023-06-30".into())).unwrap();
        assert_eq!(end, date("2023-06-30"));
    }
}
