//! Status periods derived from a property's events

use crate::timeline::{EventType, PropertyStatus, TimelineEvent};
use chrono::NaiveDate;

/// A stretch of time with one status; `end` is `None` while ongoing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPeriod {
    pub status: PropertyStatus,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

/// Status a purchase starts with, read from its checkboxes
fn purchase_status(event: &TimelineEvent) -> PropertyStatus {
    let flags = event.checkbox_state.unwrap_or_default();
    let living = event
        .mixed_use
        .is_some_and(|m| flags.is_mixed_use && m.living_use_percentage > 0.0);
    if flags.move_in_on_same_day || living {
        PropertyStatus::ppr
    } else if flags.purchase_as_vacant {
        PropertyStatus::vacant
    } else {
        PropertyStatus::rental
    }
}

/// The status an event switches the property to, if any
pub fn status_after(event: &TimelineEvent) -> Option<PropertyStatus> {
    match event.event_type {
        EventType::purchase => Some(purchase_status(event)),
        EventType::move_in => Some(PropertyStatus::ppr),
        EventType::move_out => Some(PropertyStatus::vacant),
        EventType::rent_start => Some(PropertyStatus::rental),
        EventType::rent_end => Some(PropertyStatus::vacant),
        EventType::living_in_rental_start => Some(PropertyStatus::living_in_rental),
        EventType::living_in_rental_end => Some(PropertyStatus::vacant),
        EventType::vacant_start => Some(PropertyStatus::vacant),
        EventType::building_start => Some(PropertyStatus::construction),
        EventType::subdivision => Some(PropertyStatus::subdivided),
        EventType::sale => Some(PropertyStatus::sold),
        EventType::status_change => event.new_status,
        _ => None,
    }
}

/// Walk events in date order and split time into status periods
///
/// Events sharing a date collapse into one period with the last status of
/// that day, so no period has zero length.
pub fn calculate_status_periods<'a, I>(events: I) -> Vec<StatusPeriod>
where
    I: IntoIterator<Item = &'a TimelineEvent>,
{
    let mut sorted: Vec<&TimelineEvent> = events.into_iter().collect();
    sorted.sort_by_key(|e| e.date);

    let mut periods: Vec<StatusPeriod> = Vec::new();
    for event in sorted {
        let Some(status) = status_after(event) else {
            continue;
        };

        match periods.last_mut() {
            Some(current) if current.status == status => {}
            Some(current) if current.start == event.date => {
                current.status = status;
                // The replacement may now match the period before it
                if periods.len() >= 2 && periods[periods.len() - 2].status == status {
                    periods.pop();
                    if let Some(previous) = periods.last_mut() {
                        previous.end = None;
                    }
                }
            }
            Some(current) => {
                current.end = Some(event.date);
                periods.push(StatusPeriod {
                    status,
                    start: event.date,
                    end: None,
                });
            }
            None => periods.push(StatusPeriod {
                status,
                start: event.date,
                end: None,
            }),
        }
    }
    periods
}
