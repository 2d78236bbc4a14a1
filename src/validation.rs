//! Validation helpers for the timeline MCP server
//!
//! Event validation only rejects timelines that cannot happen (selling a
//! property that was never bought, moving out without moving in). Each
//! rejection can carry a suggestion for the event that would fix it.
//!
//! The `parse_*` helpers turn tool arguments into domain types and report
//! bad input as MCP invalid-params errors.

use crate::allocation::PERCENTAGE_TOLERANCE;
use crate::dates::{format_date_short, parse_date};
use crate::error::{TimelineError, TimelineResult};
use crate::timeline::{AllocationMethod, EventType, Owner, PropertyStatus, TimelineEvent};
use crate::units::AreaUnit;
use chrono::NaiveDate;
use mcp_attr::Result as McpResult;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Event types that only make sense once the property is owned
const REQUIRES_PURCHASE: [EventType; 9] = [
    EventType::move_in,
    EventType::move_out,
    EventType::rent_start,
    EventType::rent_end,
    EventType::improvement,
    EventType::refinance,
    EventType::vacant_start,
    EventType::vacant_end,
    EventType::sale,
];

/// The kind of event a rejection suggests creating first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    CreatePurchase,
    CreateSale,
    CreateMoveIn,
    CreateRentStart,
    CreateVacantStart,
}

impl SuggestionKind {
    pub fn event_type(self) -> EventType {
        match self {
            SuggestionKind::CreatePurchase => EventType::purchase,
            SuggestionKind::CreateSale => EventType::sale,
            SuggestionKind::CreateMoveIn => EventType::move_in,
            SuggestionKind::CreateRentStart => EventType::rent_start,
            SuggestionKind::CreateVacantStart => EventType::vacant_start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub date: NaiveDate,
    pub message: String,
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (suggested: add a {} event on {})",
            self.message,
            self.kind.event_type().label(),
            self.date
        )
    }
}

/// Why an event cannot be added to a property's timeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EventRejection {
    pub message: String,
    pub suggestion: Option<Suggestion>,
}

impl EventRejection {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
        }
    }

    fn suggest(mut self, kind: SuggestionKind, date: NaiveDate, message: &str) -> Self {
        self.suggestion = Some(Suggestion {
            kind,
            date,
            message: message.to_string(),
        });
        self
    }

    /// Message plus the suggestion, for tool output
    pub fn describe(&self) -> String {
        match &self.suggestion {
            Some(s) => format!("{}\n{}", self.message, s),
            None => self.message.clone(),
        }
    }
}

/// Check an event against the other events of its property
///
/// # Arguments
/// * `candidate` - Event being added or saved
/// * `existing` - The property's other events (not including `candidate`)
/// * `acquired_on` - Acquisition date for properties without a purchase
///   event, such as lots created by a subdivision
pub fn validate_event(
    candidate: &TimelineEvent,
    existing: &[&TimelineEvent],
    acquired_on: Option<NaiveDate>,
) -> Result<(), EventRejection> {
    check_purchase(candidate, existing, acquired_on)?;
    check_sale(candidate, existing)?;
    check_open_period(candidate, existing)?;
    check_repurchase(candidate, existing)?;
    Ok(())
}

fn check_purchase(
    candidate: &TimelineEvent,
    existing: &[&TimelineEvent],
    acquired_on: Option<NaiveDate>,
) -> Result<(), EventRejection> {
    if !REQUIRES_PURCHASE.contains(&candidate.event_type) {
        return Ok(());
    }
    let label = candidate.event_type.label();

    let purchased = existing
        .iter()
        .find(|e| e.event_type == EventType::purchase)
        .map(|e| e.date)
        .or(acquired_on);
    let Some(purchased) = purchased else {
        return Err(EventRejection::new(format!(
            "Cannot add {} event without a purchase event.",
            label
        ))
        .suggest(
            SuggestionKind::CreatePurchase,
            candidate.date,
            "This property needs a purchase event first.",
        ));
    };

    if candidate.date < purchased {
        return Err(EventRejection::new(format!(
            "Cannot add {} event before purchase date.\n\nPurchase date: {}\nEvent date: {}",
            label,
            format_date_short(purchased),
            format_date_short(candidate.date)
        )));
    }
    Ok(())
}

fn check_sale(candidate: &TimelineEvent, existing: &[&TimelineEvent]) -> Result<(), EventRejection> {
    // Buying the property back is allowed
    if candidate.event_type == EventType::purchase {
        return Ok(());
    }
    let Some(sale) = existing.iter().find(|e| e.event_type == EventType::sale) else {
        return Ok(());
    };
    if candidate.date > sale.date {
        return Err(EventRejection::new(format!(
            "Cannot add {} event after sale date.\n\nSale date: {}\n\nThe property was sold on this date and is no longer owned.",
            candidate.event_type.label(),
            format_date_short(sale.date)
        )));
    }
    Ok(())
}

fn check_open_period(
    candidate: &TimelineEvent,
    existing: &[&TimelineEvent],
) -> Result<(), EventRejection> {
    let (start, message, kind, hint) = match candidate.event_type {
        EventType::move_out => (
            EventType::move_in,
            "Cannot move out - no active move-in period exists.",
            SuggestionKind::CreateMoveIn,
            "Create a move-in event first.",
        ),
        EventType::rent_end => (
            EventType::rent_start,
            "Cannot end rental - no active rental period exists.",
            SuggestionKind::CreateRentStart,
            "Create a rent start event first.",
        ),
        EventType::vacant_end => (
            EventType::vacant_start,
            "Cannot end vacancy - no active vacancy period exists.",
            SuggestionKind::CreateVacantStart,
            "Create a vacant start event first.",
        ),
        _ => return Ok(()),
    };

    let before = |event_type: EventType| {
        existing
            .iter()
            .filter(|e| e.date < candidate.date && e.event_type == event_type)
            .count()
    };
    if before(candidate.event_type) >= before(start) {
        return Err(EventRejection::new(message).suggest(kind, candidate.date, hint));
    }
    Ok(())
}

fn check_repurchase(
    candidate: &TimelineEvent,
    existing: &[&TimelineEvent],
) -> Result<(), EventRejection> {
    if candidate.event_type != EventType::purchase {
        return Ok(());
    }
    let Some(purchase) = existing.iter().find(|e| e.event_type == EventType::purchase) else {
        return Ok(());
    };
    let sold_between = existing.iter().any(|e| {
        e.event_type == EventType::sale && e.date >= purchase.date && e.date <= candidate.date
    });
    if !sold_between {
        return Err(EventRejection::new(format!(
            "Property already purchased on {}.\n\nCannot purchase the same property twice.",
            format_date_short(purchase.date)
        ))
        .suggest(
            SuggestionKind::CreateSale,
            candidate.date,
            "Add a sale event first.",
        ));
    }
    Ok(())
}

/// Owner shares must total 100%
pub fn validate_owners(owners: &[Owner]) -> TimelineResult<()> {
    if owners.is_empty() {
        return Ok(());
    }
    if owners.iter().any(|o| o.name.trim().is_empty()) {
        return Err(TimelineError::InvalidEvent(
            "Owner names cannot be empty".to_string(),
        ));
    }
    let total: f64 = owners.iter().map(|o| o.percentage).sum();
    if (total - 100.0).abs() > PERCENTAGE_TOLERANCE {
        return Err(TimelineError::OwnershipTotal { total });
    }
    Ok(())
}

fn invalid_params(message: String) -> mcp_attr::Error {
    mcp_attr::Error::new(mcp_attr::ErrorCode::INVALID_PARAMS).with_message(message, true)
}

fn parse_arg<T: FromStr<Err = String>>(value: &str) -> McpResult<T> {
    value.trim().parse::<T>().map_err(invalid_params)
}

/// Parse an event type argument
pub fn parse_event_type(value: &str) -> McpResult<EventType> {
    parse_arg(value)
}

/// Parse a property status argument
pub fn parse_status(value: &str) -> McpResult<PropertyStatus> {
    parse_arg(value)
}

/// Parse an allocation method argument
pub fn parse_allocation_method(value: &str) -> McpResult<AllocationMethod> {
    parse_arg(value)
}

/// Parse an area unit argument
pub fn parse_area_unit(value: &str) -> McpResult<AreaUnit> {
    parse_arg(value)
}

/// Parse a date argument in any accepted format
pub fn parse_date_arg(value: &str) -> McpResult<NaiveDate> {
    parse_date(value).map_err(|e| invalid_params(e.to_string()))
}

/// Parse an optional date argument; `""` means "clear"
pub fn parse_optional_date_arg(value: Option<&str>) -> McpResult<Option<Option<NaiveDate>>> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(Some(None)),
        Some(v) => parse_date_arg(v).map(|d| Some(Some(d))),
    }
}

#[cfg(test)]
/// Extract ID from response message
///
/// Response format: "... with ID: <id> (...)"
pub fn extract_id_from_response(response: &str) -> String {
    if let Some(start) = response.find("ID: ") {
        let id_part = &response[start + 4..];
        let end = id_part
            .find(|c: char| c == ' ' || c == '\n' || c == ')')
            .unwrap_or(id_part.len());
        return id_part[..end].trim().to_string();
    }
    response
        .split_whitespace()
        .last()
        .unwrap_or("")
        .trim_end_matches(')')
        .to_string()
}
