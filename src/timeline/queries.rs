//! Hierarchy and visibility queries for TimelineData
//!
//! These are read-only helpers used by the layout, allocation and tool
//! layers. They are kept apart from timeline_data.rs, which owns mutation.

use super::event::{EventType, TimelineEvent};
use super::property::Property;
use super::timeline_data::TimelineData;
use crate::layout::TimelineRange;

impl TimelineData {
    /// Direct lots of a property, in insertion order
    pub fn children_of(&self, parent_id: &str) -> Vec<&Property> {
        self.properties
            .iter()
            .filter(|p| p.parent_property_id.as_deref() == Some(parent_id))
            .collect()
    }

    /// All lots created by one subdivision, in insertion order
    pub fn lots_in_group(&self, group: &str) -> Vec<&Property> {
        self.properties
            .iter()
            .filter(|p| p.is_lot() && p.subdivision_group.as_deref() == Some(group))
            .collect()
    }

    /// The property a lot was subdivided from
    pub fn parent_of(&self, lot: &Property) -> Option<&Property> {
        lot.parent_property_id
            .as_deref()
            .and_then(|id| self.find_property(id))
    }

    /// Check if a property has been subdivided into lots
    pub fn is_subdivided(&self, property_id: &str) -> bool {
        self.properties
            .iter()
            .any(|p| p.parent_property_id.as_deref() == Some(property_id))
    }

    /// The subdivision event that created a group
    ///
    /// Group ids are the ids of their subdivision events, so this is a
    /// direct lookup with a fallback scan for hand-edited files.
    pub fn subdivision_event_for_group(&self, group: &str) -> Option<&TimelineEvent> {
        self.find_event(group)
            .filter(|e| e.event_type == EventType::subdivision)
            .or_else(|| {
                let first_lot = self.lots_in_group(group).into_iter().next()?;
                self.events.iter().find(|e| e.created_lot(&first_lot.id))
            })
    }

    /// Properties that get their own branch
    ///
    /// Main-continuation lots ride on their parent's branch, and lots of a
    /// collapsed subdivision are hidden.
    pub fn visible_properties(&self) -> Vec<Property> {
        self.properties
            .iter()
            .filter(|p| !p.is_main_lot_continuation)
            .filter(|p| {
                p.subdivision_group
                    .as_deref()
                    .is_none_or(|group| !self.is_collapsed(group))
            })
            .cloned()
            .collect()
    }

    /// Date span covering every event and property date, ending no earlier
    /// than today
    pub fn timeline_range(&self) -> TimelineRange {
        let today = super::local_date_today();
        let dates = self
            .events
            .iter()
            .map(|e| e.date)
            .chain(self.properties.iter().filter_map(|p| p.purchase_date))
            .chain(self.properties.iter().filter_map(|p| p.sale_date));

        let (start, end) = dates.fold((today, today), |(start, end), d| {
            (start.min(d), end.max(d))
        });
        TimelineRange::new(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn lot(id: &str, parent: &str, group: &str, main: bool) -> Property {
        Property {
            parent_property_id: Some(parent.to_string()),
            subdivision_group: Some(group.to_string()),
            is_main_lot_continuation: main,
            ..Property::new(id, id, "1 Main St")
        }
    }

    fn sample() -> TimelineData {
        let mut data = TimelineData::new();
        data.add_property(Property::new("prop-1", "Farm", "1 Main St"))
            .unwrap();
        data.add_property(lot("lot-1", "prop-1", "evt-9", true)).unwrap();
        data.add_property(lot("lot-2", "prop-1", "evt-9", false)).unwrap();
        data.add_property(lot("lot-3", "prop-1", "evt-9", false)).unwrap();
        data
    }

    #[test]
    fn test_children_and_groups() {
        let data = sample();
        assert_eq!(data.children_of("prop-1").len(), 3);
        assert_eq!(data.lots_in_group("evt-9").len(), 3);
        assert!(data.is_subdivided("prop-1"));
        assert!(!data.is_subdivided("lot-2"));

        let lot = data.find_property("lot-2").unwrap();
        assert_eq!(data.parent_of(lot).unwrap().id, "prop-1");
    }

    #[test]
    fn test_visible_properties_hide_main_lot_and_collapsed_groups() {
        let mut data = sample();
        let ids: Vec<String> = data
            .visible_properties()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["prop-1", "lot-2", "lot-3"]);

        data.toggle_subdivision("evt-9");
        let ids: Vec<String> = data
            .visible_properties()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["prop-1"]);
    }

    #[test]
    fn test_timeline_range_spans_events() {
        let mut data = sample();
        let early = NaiveDate::from_ymd_opt(1995, 2, 1).unwrap();
        data.add_event(TimelineEvent::new("evt-1", "prop-1", EventType::purchase, early));
        let range = data.timeline_range();
        assert_eq!(range.start, early);
        assert!(range.end >= early);
    }
}
