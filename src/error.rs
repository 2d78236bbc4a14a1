//! Error type shared by the timeline engines

use chrono::NaiveDate;
use thiserror::Error;

/// Validation and reference errors raised by timeline operations
///
/// Every variant carries a message that can be shown to the user as-is.
/// None of these are fatal: callers report them and leave the timeline
/// untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimelineError {
    #[error("Lot allocation percentages must total 100% (currently {total:.2}%)")]
    AllocationTotal { total: f64 },

    #[error(
        "Mixed-use percentages must total 100% (living {living}% + rental {rental}% + business {business}% = {total}%)"
    )]
    MixedUseTotal {
        living: f64,
        rental: f64,
        business: f64,
        total: f64,
    },

    #[error("Owner percentages must total 100% (currently {total:.2}%)")]
    OwnershipTotal { total: f64 },

    #[error("Property '{0}' not found")]
    PropertyNotFound(String),

    #[error("Property ID '{0}' already exists")]
    DuplicateProperty(String),

    #[error("Event '{0}' not found")]
    EventNotFound(String),

    #[error("{0}")]
    InvalidEvent(String),

    #[error("Invalid date '{0}'. Use DD/MM/YYYY, DDMMYYYY, '15 Jan 2023' or YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Date {0} is outside the supported range (years 1900 to 2100)")]
    DateOutOfRange(NaiveDate),

    #[error("{0}")]
    InvalidSubdivision(String),
}

pub type TimelineResult<T> = Result<T, TimelineError>;
