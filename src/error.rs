use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GarminError>;

#[derive(Error, Debug)]
pub enum GarminError {
    #[error("service returned no sleep data for {0}")]
    EmptyResponse(NaiveDate),

    #[error("response did not match the expected shape: {0}")]
    SchemaMismatch(#[from] serde_json::Error),

    #[error("not an ISO calendar date: {0}")]
    InvalidDate(#[from] chrono::ParseError),

    #[error("day count must be at least 1, got {0}")]
    InvalidDayCount(u32),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}
