//! Typed client for Garmin Connect sleep data.
//!
//! Fetches one night or a date range of sleep records from the wellness
//! API, reconstructs fixed-offset local timestamps from the paired
//! GMT/local values the service reports, and returns plain value types.
//! Authentication is out of scope: build a [`GarminClient`] from an
//! already-obtained OAuth bearer token, or implement [`ApiClient`] over
//! your own transport.

pub mod client;
pub mod config;
pub mod dates;
pub mod error;
pub mod sleep;
pub mod stats;

pub use client::{ApiClient, GarminClient};
pub use dates::Day;
pub use error::{GarminError, Result};
pub use sleep::{DailySleepRecord, Score, SleepData, SleepMovement, SleepScores};
pub use stats::DailySleepScore;
