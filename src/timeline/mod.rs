//! Timeline domain models and their bookkeeping
//!
//! This module contains the property/event data structures and the store
//! that owns them. It is split into submodules:
//! - `property`: properties, lots and owners
//! - `event`: timeline events, cost bases and subdivision details
//! - `timeline_data`: main data container with mutation and the event index
//! - `queries`: hierarchy and visibility queries
//! - `subdivision`: subdividing a property and editing its lots
//! - `serde_impl`: serialization/deserialization implementations

mod event;
mod property;
mod queries;
mod serde_impl;
mod subdivision;
mod timeline_data;

use chrono::{Local, NaiveDate};

// Re-export all public types
pub use event::{
    AllocationMethod, CheckboxState, CostBaseCategory, CostBaseItem, CostBreakdown, EventType,
    MixedUse, SubdivisionDetails, TimelineEvent,
};
pub use property::{Owner, Property, PropertyStatus};
pub use subdivision::{LotSpec, SubdivisionRequest};
pub use timeline_data::TimelineData;

/// Get the current date in local timezone
pub fn local_date_today() -> NaiveDate {
    Local::now().date_naive()
}
