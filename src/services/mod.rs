//! Report accessors.
//!
//! Each accessor reads what it needs from an [`EventStore`], hands the
//! records to the matching engine in `signals`, and returns the report. Store
//! failures are logged and degrade to the report's empty/default form; they
//! never reach the caller.
//!
//! [`EventStore`]: crate::store::EventStore

use chrono::{NaiveDate, Utc};

use crate::db::DbError;

pub mod commitments;
pub mod cultural;
pub mod dashboard;
pub mod introductions;
pub mod momentum;
pub mod proof_points;
pub mod stall;

/// Reports are computed against the UTC calendar date.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Unwrap a report, or log the failure and fall back to `T::default()`.
pub(crate) fn or_default<T: Default>(report: &str, result: Result<T, DbError>) -> T {
    result.unwrap_or_else(|e| {
        log::error!("{} failed, returning empty report: {}", report, e);
        T::default()
    })
}
