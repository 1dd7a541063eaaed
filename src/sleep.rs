//! Nightly sleep records from the Garmin Connect wellness API.
//!
//! The service reports every timestamp twice: as a GMT instant and as a
//! zone-less local wall clock. Construction derives a fixed UTC offset from
//! each local/GMT pair and attaches it to the local timestamp, so the
//! records callers see are always timezone-aware.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::client::ApiClient;
use crate::dates::{date_range, end_or_today, Day};
use crate::error::{GarminError, Result};

/// Timestamps arrive as ISO `YYYY-MM-DDTHH:MM:SS[.fff]` text or as epoch
/// milliseconds, depending on the endpoint revision.
#[derive(Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Millis(i64),
    Text(String),
}

impl Timestamp {
    fn naive<E: de::Error>(self) -> std::result::Result<NaiveDateTime, E> {
        match self {
            Timestamp::Millis(millis) => DateTime::from_timestamp_millis(millis)
                .map(|at| at.naive_utc())
                .ok_or_else(|| E::custom(format!("timestamp out of range: {millis}"))),
            Timestamp::Text(text) => text.parse().map_err(E::custom),
        }
    }
}

fn de_naive<'de, D>(deserializer: D) -> std::result::Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    Timestamp::deserialize(deserializer)?.naive()
}

fn de_utc<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(de_naive(deserializer)?.and_utc())
}

fn de_opt_utc<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Timestamp>::deserialize(deserializer)? {
        Some(stamp) => Ok(Some(stamp.naive()?.and_utc())),
        None => Ok(None),
    }
}

/// A local/GMT pair a full day or more apart, which no real offset explains.
#[derive(Debug)]
struct OffsetOutOfRange {
    field: &'static str,
}

impl fmt::Display for OffsetOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timezone offset derived for {} is out of range", self.field)
    }
}

// Whole minutes, truncated toward zero; sub-minute remainders are noise in
// the service data, not part of the offset.
fn attach_offset(
    local: NaiveDateTime,
    gmt: DateTime<Utc>,
    field: &'static str,
) -> std::result::Result<DateTime<FixedOffset>, OffsetOutOfRange> {
    let minutes = (local - gmt.naive_utc()).num_minutes();
    i32::try_from(minutes * 60)
        .ok()
        .and_then(FixedOffset::east_opt)
        .and_then(|offset| local.and_local_timezone(offset).single())
        .ok_or(OffsetOutOfRange { field })
}

// ── Movement ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepMovement {
    #[serde(rename = "startGMT", deserialize_with = "de_utc")]
    pub start_gmt: DateTime<Utc>,
    #[serde(rename = "endGMT", deserialize_with = "de_utc")]
    pub end_gmt: DateTime<Utc>,
    #[serde(rename = "activityLevel")]
    pub activity_level: f64,
}

// ── Scores ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub qualifier_key: String,
    #[serde(default)]
    pub optimal_start: Option<f64>,
    #[serde(default)]
    pub optimal_end: Option<f64>,
    #[serde(default)]
    pub value: Option<i32>,
    #[serde(default)]
    pub ideal_start_in_seconds: Option<f64>,
    #[serde(default)]
    pub ideal_end_in_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepScores {
    pub total_duration: Score,
    pub stress: Score,
    pub awake_count: Score,
    pub overall: Score,
    pub rem_percentage: Score,
    pub restlessness: Score,
    pub light_percentage: Score,
    pub deep_percentage: Score,
}

// ── Daily record ────────────────────────────────────────

/// One night's sleep as the service reports it (wire name `dailySleepDTO`).
///
/// The local timestamps carry the fixed offset derived from their GMT
/// counterparts; start and end offsets are computed independently, so a
/// night spanning a DST switch keeps two different offsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawDailySleep")]
pub struct DailySleepRecord {
    pub id: i64,
    #[serde(rename = "userProfilePK")]
    pub user_profile_pk: i64,
    pub calendar_date: NaiveDate,
    pub sleep_time_seconds: i32,
    pub nap_time_seconds: i32,
    pub sleep_window_confirmed: bool,
    pub sleep_window_confirmation_type: String,
    #[serde(rename = "sleepStartTimestampGMT")]
    pub sleep_start_timestamp_gmt: DateTime<Utc>,
    #[serde(rename = "sleepEndTimestampGMT")]
    pub sleep_end_timestamp_gmt: DateTime<Utc>,
    pub sleep_start_timestamp_local: DateTime<FixedOffset>,
    pub sleep_end_timestamp_local: DateTime<FixedOffset>,
    pub unmeasurable_sleep_seconds: i32,
    pub deep_sleep_seconds: i32,
    pub light_sleep_seconds: i32,
    pub rem_sleep_seconds: i32,
    pub awake_sleep_seconds: i32,
    pub device_rem_capable: bool,
    pub retro: bool,
    pub sleep_from_device: bool,
    pub sleep_version: i32,
    pub awake_count: Option<i32>,
    pub sleep_scores: Option<SleepScores>,
    #[serde(rename = "autoSleepStartTimestampGMT")]
    pub auto_sleep_start_timestamp_gmt: Option<DateTime<Utc>>,
    #[serde(rename = "autoSleepEndTimestampGMT")]
    pub auto_sleep_end_timestamp_gmt: Option<DateTime<Utc>>,
    #[serde(rename = "sleepQualityTypePK")]
    pub sleep_quality_type_pk: Option<i64>,
    #[serde(rename = "sleepResultTypePK")]
    pub sleep_result_type_pk: Option<i64>,
    pub average_sp_o2_value: Option<f64>,
    pub lowest_sp_o2_value: Option<i32>,
    pub highest_sp_o2_value: Option<i32>,
    #[serde(rename = "averageSpO2HRSleep")]
    pub average_sp_o2_hr_sleep: Option<f64>,
    pub average_respiration_value: Option<f64>,
    pub lowest_respiration_value: Option<f64>,
    pub highest_respiration_value: Option<f64>,
    pub avg_sleep_stress: Option<f64>,
    pub age_group: Option<String>,
    pub sleep_score_feedback: Option<String>,
    pub sleep_score_insight: Option<String>,
}

/// Parsed wire form, before the local timestamps gain their offsets.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDailySleep {
    id: i64,
    #[serde(rename = "userProfilePK")]
    user_profile_pk: i64,
    calendar_date: NaiveDate,
    sleep_time_seconds: i32,
    nap_time_seconds: i32,
    sleep_window_confirmed: bool,
    sleep_window_confirmation_type: String,
    #[serde(rename = "sleepStartTimestampGMT", deserialize_with = "de_utc")]
    sleep_start_timestamp_gmt: DateTime<Utc>,
    #[serde(rename = "sleepEndTimestampGMT", deserialize_with = "de_utc")]
    sleep_end_timestamp_gmt: DateTime<Utc>,
    #[serde(deserialize_with = "de_naive")]
    sleep_start_timestamp_local: NaiveDateTime,
    #[serde(deserialize_with = "de_naive")]
    sleep_end_timestamp_local: NaiveDateTime,
    unmeasurable_sleep_seconds: i32,
    deep_sleep_seconds: i32,
    light_sleep_seconds: i32,
    rem_sleep_seconds: i32,
    awake_sleep_seconds: i32,
    device_rem_capable: bool,
    retro: bool,
    sleep_from_device: bool,
    sleep_version: i32,
    #[serde(default)]
    awake_count: Option<i32>,
    #[serde(default)]
    sleep_scores: Option<SleepScores>,
    #[serde(
        rename = "autoSleepStartTimestampGMT",
        default,
        deserialize_with = "de_opt_utc"
    )]
    auto_sleep_start_timestamp_gmt: Option<DateTime<Utc>>,
    #[serde(
        rename = "autoSleepEndTimestampGMT",
        default,
        deserialize_with = "de_opt_utc"
    )]
    auto_sleep_end_timestamp_gmt: Option<DateTime<Utc>>,
    #[serde(rename = "sleepQualityTypePK", default)]
    sleep_quality_type_pk: Option<i64>,
    #[serde(rename = "sleepResultTypePK", default)]
    sleep_result_type_pk: Option<i64>,
    #[serde(default)]
    average_sp_o2_value: Option<f64>,
    #[serde(default)]
    lowest_sp_o2_value: Option<i32>,
    #[serde(default)]
    highest_sp_o2_value: Option<i32>,
    #[serde(rename = "averageSpO2HRSleep", default)]
    average_sp_o2_hr_sleep: Option<f64>,
    #[serde(default)]
    average_respiration_value: Option<f64>,
    #[serde(default)]
    lowest_respiration_value: Option<f64>,
    #[serde(default)]
    highest_respiration_value: Option<f64>,
    #[serde(default)]
    avg_sleep_stress: Option<f64>,
    #[serde(default)]
    age_group: Option<String>,
    #[serde(default)]
    sleep_score_feedback: Option<String>,
    #[serde(default)]
    sleep_score_insight: Option<String>,
}

impl TryFrom<RawDailySleep> for DailySleepRecord {
    type Error = OffsetOutOfRange;

    fn try_from(raw: RawDailySleep) -> std::result::Result<Self, OffsetOutOfRange> {
        let sleep_start_timestamp_local = attach_offset(
            raw.sleep_start_timestamp_local,
            raw.sleep_start_timestamp_gmt,
            "sleepStartTimestampLocal",
        )?;
        let sleep_end_timestamp_local = attach_offset(
            raw.sleep_end_timestamp_local,
            raw.sleep_end_timestamp_gmt,
            "sleepEndTimestampLocal",
        )?;

        Ok(Self {
            id: raw.id,
            user_profile_pk: raw.user_profile_pk,
            calendar_date: raw.calendar_date,
            sleep_time_seconds: raw.sleep_time_seconds,
            nap_time_seconds: raw.nap_time_seconds,
            sleep_window_confirmed: raw.sleep_window_confirmed,
            sleep_window_confirmation_type: raw.sleep_window_confirmation_type,
            sleep_start_timestamp_gmt: raw.sleep_start_timestamp_gmt,
            sleep_end_timestamp_gmt: raw.sleep_end_timestamp_gmt,
            sleep_start_timestamp_local,
            sleep_end_timestamp_local,
            unmeasurable_sleep_seconds: raw.unmeasurable_sleep_seconds,
            deep_sleep_seconds: raw.deep_sleep_seconds,
            light_sleep_seconds: raw.light_sleep_seconds,
            rem_sleep_seconds: raw.rem_sleep_seconds,
            awake_sleep_seconds: raw.awake_sleep_seconds,
            device_rem_capable: raw.device_rem_capable,
            retro: raw.retro,
            sleep_from_device: raw.sleep_from_device,
            sleep_version: raw.sleep_version,
            awake_count: raw.awake_count,
            sleep_scores: raw.sleep_scores,
            auto_sleep_start_timestamp_gmt: raw.auto_sleep_start_timestamp_gmt,
            auto_sleep_end_timestamp_gmt: raw.auto_sleep_end_timestamp_gmt,
            sleep_quality_type_pk: raw.sleep_quality_type_pk,
            sleep_result_type_pk: raw.sleep_result_type_pk,
            average_sp_o2_value: raw.average_sp_o2_value,
            lowest_sp_o2_value: raw.lowest_sp_o2_value,
            highest_sp_o2_value: raw.highest_sp_o2_value,
            average_sp_o2_hr_sleep: raw.average_sp_o2_hr_sleep,
            average_respiration_value: raw.average_respiration_value,
            lowest_respiration_value: raw.lowest_respiration_value,
            highest_respiration_value: raw.highest_respiration_value,
            avg_sleep_stress: raw.avg_sleep_stress,
            age_group: raw.age_group,
            sleep_score_feedback: raw.sleep_score_feedback,
            sleep_score_insight: raw.sleep_score_insight,
        })
    }
}

// ── Sleep data ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepData {
    #[serde(rename = "dailySleepDTO")]
    pub daily_sleep_dto: DailySleepRecord,
    #[serde(rename = "sleepMovement")]
    pub sleep_movement: Vec<SleepMovement>,
}

impl SleepData {
    /// Fetches one night's sleep for `day`, a date or ISO `YYYY-MM-DD` string.
    pub async fn get(day: impl Into<Day>, client: &impl ApiClient) -> Result<SleepData> {
        let date = day.into().resolve()?;
        let path = format!(
            "/wellness-service/wellness/dailySleepData/{}?nonSleepBufferMinutes=60&date={}",
            client.username(),
            date
        );

        let body = client
            .connectapi(&path)
            .await?
            .ok_or(GarminError::EmptyResponse(date))?;

        Ok(serde_json::from_value(body)?)
    }

    /// Fetches the `days` nights ending at `end` (today when omitted),
    /// sorted ascending by calendar date. The first failed day aborts the
    /// whole fetch; there are no partial results.
    pub async fn list(
        end: Option<Day>,
        days: u32,
        client: &impl ApiClient,
    ) -> Result<Vec<SleepData>> {
        if days < 1 {
            return Err(GarminError::InvalidDayCount(days));
        }

        let end = end_or_today(end)?;
        let mut nights = Vec::with_capacity(days as usize);
        for date in date_range(end, days) {
            nights.push(Self::get(date, client).await?);
        }
        nights.sort_by_key(|night| night.daily_sleep_dto.calendar_date);
        Ok(nights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn dto_body() -> Value {
        json!({
            "id": 1704931200000_i64,
            "userProfilePK": 9000001,
            "calendarDate": "2024-01-11",
            "sleepTimeSeconds": 27000,
            "napTimeSeconds": 0,
            "sleepWindowConfirmed": true,
            "sleepWindowConfirmationType": "enhanced_confirmed_final",
            "sleepStartTimestampGMT": "2024-01-10T23:00:00",
            "sleepEndTimestampGMT": "2024-01-11T07:00:00",
            "sleepStartTimestampLocal": "2024-01-11T01:00:00",
            "sleepEndTimestampLocal": "2024-01-11T09:00:00",
            "unmeasurableSleepSeconds": 0,
            "deepSleepSeconds": 6300,
            "lightSleepSeconds": 14700,
            "remSleepSeconds": 6000,
            "awakeSleepSeconds": 1800,
            "deviceRemCapable": true,
            "retro": false,
            "sleepFromDevice": true,
            "sleepVersion": 2
        })
    }

    fn record(body: Value) -> DailySleepRecord {
        serde_json::from_value(body).unwrap()
    }

    fn offset_seconds(at: &DateTime<FixedOffset>) -> i32 {
        at.offset().local_minus_utc()
    }

    #[test]
    fn both_local_timestamps_gain_plus_two_hours() {
        let record = record(dto_body());
        assert_eq!(offset_seconds(&record.sleep_start_timestamp_local), 7200);
        assert_eq!(offset_seconds(&record.sleep_end_timestamp_local), 7200);
    }

    #[test]
    fn local_wall_clock_is_preserved() {
        let record = record(dto_body());
        assert_eq!(
            record.sleep_start_timestamp_local.naive_local(),
            "2024-01-11T01:00:00".parse::<NaiveDateTime>().unwrap()
        );
        // With a consistent pair, the tagged local time names the same
        // instant as the GMT field.
        assert_eq!(
            record.sleep_start_timestamp_local.with_timezone(&Utc),
            record.sleep_start_timestamp_gmt
        );
    }

    #[test]
    fn start_and_end_offsets_are_independent() {
        let mut body = dto_body();
        // Start +60 min, end +120 min: a night crossing a DST switch.
        body["sleepStartTimestampLocal"] = json!("2024-01-11T00:00:00");
        let record = record(body);
        assert_eq!(offset_seconds(&record.sleep_start_timestamp_local), 3600);
        assert_eq!(offset_seconds(&record.sleep_end_timestamp_local), 7200);
    }

    #[test]
    fn western_offsets_are_negative() {
        let mut body = dto_body();
        // GMT 23:00 against local 17:30 the same day: -5h30m.
        body["sleepStartTimestampLocal"] = json!("2024-01-10T17:30:00");
        let record = record(body);
        assert_eq!(
            offset_seconds(&record.sleep_start_timestamp_local),
            -(5 * 3600 + 1800)
        );
    }

    #[test]
    fn sub_minute_remainders_truncate_toward_zero() {
        let mut body = dto_body();
        body["sleepStartTimestampLocal"] = json!("2024-01-10T23:01:30");
        body["sleepEndTimestampLocal"] = json!("2024-01-11T06:58:30");
        let record = record(body);
        // +90 s becomes +1 min, -90 s becomes -1 min.
        assert_eq!(offset_seconds(&record.sleep_start_timestamp_local), 60);
        assert_eq!(offset_seconds(&record.sleep_end_timestamp_local), -60);
    }

    #[test]
    fn epoch_millis_timestamps_are_accepted() {
        let mut body = dto_body();
        body["sleepStartTimestampGMT"] = json!(1704927600000_i64);
        body["sleepStartTimestampLocal"] = json!(1704934800000_i64);
        let record = record(body);
        assert_eq!(
            record.sleep_start_timestamp_gmt,
            "2024-01-10T23:00:00".parse::<NaiveDateTime>().unwrap().and_utc()
        );
        assert_eq!(offset_seconds(&record.sleep_start_timestamp_local), 7200);
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let mut body = dto_body();
        body.as_object_mut().unwrap().remove("sleepEndTimestampLocal");
        assert!(serde_json::from_value::<DailySleepRecord>(body).is_err());
    }

    #[test]
    fn unparseable_calendar_date_is_rejected() {
        let mut body = dto_body();
        body["calendarDate"] = json!("January 11th");
        assert!(serde_json::from_value::<DailySleepRecord>(body).is_err());
    }

    #[test]
    fn unparseable_timestamp_is_rejected() {
        let mut body = dto_body();
        body["sleepStartTimestampGMT"] = json!("around midnight");
        assert!(serde_json::from_value::<DailySleepRecord>(body).is_err());
    }

    #[test]
    fn local_and_gmt_a_day_apart_is_rejected() {
        let mut body = dto_body();
        body["sleepStartTimestampLocal"] = json!("2024-01-13T01:00:00");
        assert!(serde_json::from_value::<DailySleepRecord>(body).is_err());
    }

    #[test]
    fn omitted_metrics_stay_absent() {
        let record = record(dto_body());
        assert_eq!(record.awake_count, None);
        assert_eq!(record.sleep_scores, None);
        assert_eq!(record.average_sp_o2_value, None);
        assert_eq!(record.age_group, None);
    }

    #[test]
    fn null_metrics_stay_absent() {
        let mut body = dto_body();
        body["awakeCount"] = json!(null);
        body["avgSleepStress"] = json!(null);
        let record = record(body);
        assert_eq!(record.awake_count, None);
        assert_eq!(record.avg_sleep_stress, None);
    }

    #[test]
    fn construction_is_idempotent() {
        let first = record(dto_body());
        let second = record(dto_body());
        assert_eq!(first, second);
    }

    #[test]
    fn sleep_scores_parse_all_eight_metrics() {
        let score = |key: &str, value: i32| {
            json!({ "qualifierKey": key, "value": value })
        };
        let mut body = dto_body();
        body["sleepScores"] = json!({
            "totalDuration": {
                "qualifierKey": "GOOD",
                "optimalStart": 28740.0,
                "optimalEnd": 28740.0
            },
            "stress": score("FAIR", 65),
            "awakeCount": score("GOOD", 88),
            "overall": score("EXCELLENT", 91),
            "remPercentage": {
                "qualifierKey": "GOOD",
                "value": 23,
                "idealStartInSeconds": 5594.0,
                "idealEndInSeconds": 9324.0
            },
            "restlessness": score("GOOD", 79),
            "lightPercentage": score("GOOD", 55),
            "deepPercentage": score("FAIR", 22)
        });

        let scores = record(body).sleep_scores.unwrap();
        assert_eq!(scores.overall.qualifier_key, "EXCELLENT");
        assert_eq!(scores.overall.value, Some(91));
        assert_eq!(scores.total_duration.value, None);
        assert_eq!(scores.total_duration.optimal_start, Some(28740.0));
        assert_eq!(scores.rem_percentage.ideal_end_in_seconds, Some(9324.0));
    }

    #[test]
    fn sleep_data_keeps_movement_in_service_order() {
        let body = json!({
            "dailySleepDTO": dto_body(),
            "remSleepData": true,
            "sleepMovement": [
                {
                    "startGMT": "2024-01-11T04:00:00",
                    "endGMT": "2024-01-11T04:01:00",
                    "activityLevel": 5.69
                },
                {
                    "startGMT": "2024-01-10T23:00:00",
                    "endGMT": "2024-01-10T23:01:00",
                    "activityLevel": 1.22
                }
            ]
        });

        let data: SleepData = serde_json::from_value(body).unwrap();
        assert_eq!(data.sleep_movement.len(), 2);
        // Service order is kept verbatim, even when it is not chronological.
        assert_eq!(data.sleep_movement[0].activity_level, 5.69);
        assert_eq!(
            data.sleep_movement[1].start_gmt,
            "2024-01-10T23:00:00".parse::<NaiveDateTime>().unwrap().and_utc()
        );
    }

    #[test]
    fn record_serializes_local_timestamps_with_offset() {
        let value = serde_json::to_value(record(dto_body())).unwrap();
        assert_eq!(
            value["sleepStartTimestampLocal"],
            json!("2024-01-11T01:00:00+02:00")
        );
        assert_eq!(value["userProfilePK"], json!(9000001));
    }
}
