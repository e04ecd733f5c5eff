//! Condition evaluators: one pure function per domain, mapping a snapshot
//! entity to at most one alert candidate.
//!
//! An `Err` means the entity carried malformed data; callers skip it and move
//! on to the next one.

pub mod governance;
pub mod position;
pub mod reward;

use chrono::{DateTime, Utc};

use crate::{error::EvalError, models::DecimalValue};

pub use governance::evaluate_epoch;
pub use position::evaluate_position;
pub use reward::evaluate_reward;

fn parse_decimal(field: &'static str, value: &DecimalValue) -> Result<f64, EvalError> {
    value.to_f64().ok_or_else(|| EvalError::Malformed {
        field,
        value: value.raw(),
    })
}

fn parse_optional(field: &'static str, value: Option<&DecimalValue>) -> Result<Option<f64>, EvalError> {
    value.map(|v| parse_decimal(field, v)).transpose()
}

// Timestamps too far from `now` to subtract are treated as malformed.
fn hours_until(field: &'static str, ts: i64, now: DateTime<Utc>) -> Result<f64, EvalError> {
    ts.checked_sub(now.timestamp())
        .map(|secs| secs as f64 / 3600.0)
        .ok_or_else(|| EvalError::Malformed {
            field,
            value: ts.to_string(),
        })
}

fn fmt_ts(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}
