//! Paged daily sleep scores from the wellness stats endpoint.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::dates::{end_or_today, Day};
use crate::error::{GarminError, Result};

const SCORE_PATH: &str = "/wellness-service/stats/daily/sleep/score";
const PAGE_SIZE: u32 = 28;

/// One day's overall sleep score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySleepScore {
    pub calendar_date: NaiveDate,
    pub value: i32,
}

// Entries arrive either flat or with the score wrapped in a `values`
// object; days the service never scored carry a null.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScoreEntry {
    calendar_date: NaiveDate,
    #[serde(default)]
    value: Option<i32>,
    #[serde(default)]
    values: Option<RawScoreValues>,
}

#[derive(Deserialize)]
struct RawScoreValues {
    #[serde(default)]
    value: Option<i32>,
}

impl RawScoreEntry {
    fn into_score(self) -> Option<DailySleepScore> {
        let value = self.value.or(self.values.and_then(|wrapped| wrapped.value))?;
        Some(DailySleepScore {
            calendar_date: self.calendar_date,
            value,
        })
    }
}

impl DailySleepScore {
    /// Fetches the `days` of daily scores ending at `end` (today when
    /// omitted), one request per 28-day page, sorted ascending by calendar
    /// date. Days without a computed score are absent from the result.
    pub async fn list(
        end: Option<Day>,
        days: u32,
        client: &impl ApiClient,
    ) -> Result<Vec<DailySleepScore>> {
        if days < 1 {
            return Err(GarminError::InvalidDayCount(days));
        }

        let end = end_or_today(end)?;
        let mut scores = Vec::with_capacity(days as usize);
        let mut remaining = days;
        let mut page_end = end;
        while remaining > 0 {
            let span = remaining.min(PAGE_SIZE);
            let page_start = page_end - Duration::days(i64::from(span) - 1);
            let path = format!("{SCORE_PATH}/{page_start}/{page_end}");

            if let Some(body) = client.connectapi(&path).await? {
                let entries: Vec<RawScoreEntry> = serde_json::from_value(body)?;
                scores.extend(entries.into_iter().filter_map(RawScoreEntry::into_score));
            }

            remaining -= span;
            page_end = page_start - Duration::days(1);
        }

        scores.sort_by_key(|score| score.calendar_date);
        Ok(scores)
    }
}
