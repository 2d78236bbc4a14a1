use super::event::{EventType, TimelineEvent};
use super::property::{Property, PropertyStatus};
use crate::error::{TimelineError, TimelineResult};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use tracing::info;

/// Index key for event lookups: one property, one event type, one calendar day
pub(crate) type EventKey = (String, EventType, NaiveDate);

pub struct TimelineData {
    /// Format version for the TOML file (current: 1)
    pub format_version: u32,

    /// All properties, including subdivided lots, in insertion order
    ///
    /// Insertion order is the order the layout engine sees, so keeping a Vec
    /// keeps branch positions stable across saves.
    pub(crate) properties: Vec<Property>,

    /// All timeline events in insertion order
    pub(crate) events: Vec<TimelineEvent>,

    /// Subdivision groups whose lots are currently folded into the parent
    pub(crate) collapsed_subdivisions: BTreeSet<String>,

    /// (property, type, date) → event ids
    ///
    /// Companion lookups go through this map instead of scanning `events`.
    /// It is kept in sync by add_event, update_event and remove_event, and is
    /// NOT serialized: it is rebuilt from `events` during deserialization.
    pub(crate) event_index: HashMap<EventKey, Vec<String>>,

    /// Counter for generating unique property IDs
    pub property_counter: u32,

    /// Counter for generating unique event IDs
    pub event_counter: u32,
}

impl Default for TimelineData {
    fn default() -> Self {
        Self {
            format_version: 1,
            properties: Vec::new(),
            events: Vec::new(),
            collapsed_subdivisions: BTreeSet::new(),
            event_index: HashMap::new(),
            property_counter: 0,
            event_counter: 0,
        }
    }
}

// Serialize/Deserialize implementations are in serde_impl.rs

impl TimelineData {
    /// Create a new empty TimelineData instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a new unique property ID
    pub fn generate_property_id(&mut self) -> String {
        loop {
            self.property_counter += 1;
            let id = format!("prop-{}", self.property_counter);
            if self.find_property(&id).is_none() {
                return id;
            }
        }
    }

    /// Generate a new unique event ID
    pub fn generate_event_id(&mut self) -> String {
        loop {
            self.event_counter += 1;
            let id = format!("evt-{}", self.event_counter);
            if self.find_event(&id).is_none() {
                return id;
            }
        }
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Find a property by its ID
    pub fn find_property(&self, id: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == id)
    }

    /// Find a property by its ID and return a mutable reference
    pub fn find_property_mut(&mut self, id: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.id == id)
    }

    /// Add a property, rejecting duplicate IDs
    pub fn add_property(&mut self, property: Property) -> TimelineResult<()> {
        if self.find_property(&property.id).is_some() {
            return Err(TimelineError::DuplicateProperty(property.id));
        }
        self.properties.push(property);
        Ok(())
    }

    /// Find an event by its ID
    pub fn find_event(&self, id: &str) -> Option<&TimelineEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Add an event to the collection and the lookup index
    pub fn add_event(&mut self, event: TimelineEvent) {
        self.index_insert(&event);
        self.events.push(event);
    }

    /// Apply `edit` to an event, keeping the lookup index consistent
    ///
    /// # Returns
    /// `Some(())` if the event was found, `None` otherwise
    pub fn update_event<F>(&mut self, id: &str, edit: F) -> Option<()>
    where
        F: FnOnce(&mut TimelineEvent),
    {
        let pos = self.events.iter().position(|e| e.id == id)?;
        let before = self.events[pos].clone();
        self.index_remove(&before);
        edit(&mut self.events[pos]);
        // The id is the index payload; an edit must not change it
        self.events[pos].id = before.id;
        let after = self.events[pos].clone();
        self.index_insert(&after);
        Some(())
    }

    /// Remove an event and return it
    pub fn remove_event(&mut self, id: &str) -> Option<TimelineEvent> {
        let pos = self.events.iter().position(|e| e.id == id)?;
        let event = self.events.remove(pos);
        self.index_remove(&event);
        Some(event)
    }

    /// Events of one type on one property on one calendar day
    pub fn events_on(
        &self,
        property_id: &str,
        event_type: EventType,
        date: NaiveDate,
    ) -> Vec<&TimelineEvent> {
        let key = (property_id.to_string(), event_type, date);
        match self.event_index.get(&key) {
            Some(ids) => ids.iter().filter_map(|id| self.find_event(id)).collect(),
            None => Vec::new(),
        }
    }

    /// All events of a property, ordered by date (insertion order within a day)
    pub fn events_for_property(&self, property_id: &str) -> Vec<&TimelineEvent> {
        let mut events: Vec<&TimelineEvent> = self
            .events
            .iter()
            .filter(|e| e.property_id == property_id)
            .collect();
        events.sort_by_key(|e| e.date);
        events
    }

    /// Remove a property together with its events and lots
    ///
    /// Removing the main-continuation lot is refused while other lots of the
    /// same subdivision remain. Removing the last non-main lot undoes the
    /// subdivision: the main lot and the subdivision event go too and the
    /// parent returns to a single branch.
    pub fn remove_property(&mut self, id: &str) -> TimelineResult<Property> {
        let property = self
            .find_property(id)
            .cloned()
            .ok_or_else(|| TimelineError::PropertyNotFound(id.to_string()))?;

        if property.is_main_lot_continuation
            && let Some(group) = property.subdivision_group.as_deref()
            && self
                .lots_in_group(group)
                .iter()
                .any(|lot| lot.id != property.id)
        {
            return Err(TimelineError::InvalidSubdivision(
                "Lot 1 continues the main timeline. Delete other lots first to undo the subdivision."
                    .to_string(),
            ));
        }

        // Lots of this property go with it
        let child_ids: Vec<String> = self.children_of(id).iter().map(|c| c.id.clone()).collect();
        for child_id in child_ids {
            self.remove_property_unchecked(&child_id);
        }
        let removed = self.remove_property_unchecked(id);

        if let (Some(group), Some(parent_id)) = (
            property.subdivision_group.as_deref(),
            property.parent_property_id.as_deref(),
        ) {
            let remaining_non_main = self
                .lots_in_group(group)
                .iter()
                .filter(|lot| !lot.is_main_lot_continuation)
                .count();
            if remaining_non_main == 0 {
                self.revert_subdivision(group, parent_id);
            }
        }

        Ok(removed.unwrap_or(property))
    }

    /// Drop what is left of a subdivision group and restore its parent
    fn revert_subdivision(&mut self, group: &str, parent_id: &str) {
        let leftover: Vec<String> = self
            .lots_in_group(group)
            .iter()
            .map(|lot| lot.id.clone())
            .collect();
        for lot_id in leftover {
            self.remove_property_unchecked(&lot_id);
        }
        self.remove_event(group);
        self.collapsed_subdivisions.remove(group);

        if let Some(parent) = self.find_property_mut(parent_id)
            && parent.current_status == Some(PropertyStatus::subdivided)
        {
            parent.current_status = None;
        }
        info!(group, parent_id, "subdivision reverted to a single branch");
    }

    fn remove_property_unchecked(&mut self, id: &str) -> Option<Property> {
        let grandchildren: Vec<String> =
            self.children_of(id).iter().map(|c| c.id.clone()).collect();
        for child_id in grandchildren {
            self.remove_property_unchecked(&child_id);
        }

        let event_ids: Vec<String> = self
            .events
            .iter()
            .filter(|e| e.property_id == id)
            .map(|e| e.id.clone())
            .collect();
        for event_id in event_ids {
            self.remove_event(&event_id);
        }

        let pos = self.properties.iter().position(|p| p.id == id)?;
        Some(self.properties.remove(pos))
    }

    /// Fold or unfold the lots of a subdivision group
    ///
    /// # Returns
    /// `true` if the group is collapsed after the call
    pub fn toggle_subdivision(&mut self, group: &str) -> bool {
        if self.collapsed_subdivisions.remove(group) {
            false
        } else {
            self.collapsed_subdivisions.insert(group.to_string());
            true
        }
    }

    pub fn is_collapsed(&self, group: &str) -> bool {
        self.collapsed_subdivisions.contains(group)
    }

    pub(crate) fn rebuild_index(&mut self) {
        self.event_index.clear();
        let events = std::mem::take(&mut self.events);
        for event in &events {
            self.index_insert(event);
        }
        self.events = events;
    }

    fn index_insert(&mut self, event: &TimelineEvent) {
        self.event_index
            .entry((event.property_id.clone(), event.event_type, event.date))
            .or_default()
            .push(event.id.clone());
    }

    fn index_remove(&mut self, event: &TimelineEvent) {
        let key = (event.property_id.clone(), event.event_type, event.date);
        if let Some(ids) = self.event_index.get_mut(&key) {
            ids.retain(|id| id != &event.id);
            if ids.is_empty() {
                self.event_index.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_generate_ids_skip_existing() {
        let mut data = TimelineData::new();
        data.add_property(Property::new("prop-1", "Taken", "1 Main St"))
            .unwrap();
        assert_eq!(data.generate_property_id(), "prop-2");
        assert_eq!(data.generate_event_id(), "evt-1");
    }

    #[test]
    fn test_duplicate_property_rejected() {
        let mut data = TimelineData::new();
        data.add_property(Property::new("prop-1", "Home", "1 Main St"))
            .unwrap();
        assert_eq!(
            data.add_property(Property::new("prop-1", "Other", "2 Main St")),
            Err(TimelineError::DuplicateProperty("prop-1".to_string()))
        );
        assert_eq!(data.properties().len(), 1);
    }

    #[test]
    fn test_index_follows_date_changes() {
        let mut data = TimelineData::new();
        data.add_event(TimelineEvent::new(
            "evt-1",
            "prop-1",
            EventType::move_in,
            date(2020, 1, 1),
        ));
        assert_eq!(
            data.events_on("prop-1", EventType::move_in, date(2020, 1, 1))
                .len(),
            1
        );

        data.update_event("evt-1", |e| e.date = date(2021, 6, 30))
            .unwrap();
        assert!(
            data.events_on("prop-1", EventType::move_in, date(2020, 1, 1))
                .is_empty()
        );
        assert_eq!(
            data.events_on("prop-1", EventType::move_in, date(2021, 6, 30))
                .len(),
            1
        );

        data.remove_event("evt-1").unwrap();
        assert!(data.event_index.is_empty());
    }

    #[test]
    fn test_remove_property_cascades_events() {
        let mut data = TimelineData::new();
        data.add_property(Property::new("prop-1", "Home", "1 Main St"))
            .unwrap();
        data.add_event(TimelineEvent::new(
            "evt-1",
            "prop-1",
            EventType::purchase,
            date(2010, 5, 1),
        ));
        data.add_event(TimelineEvent::new(
            "evt-2",
            "prop-2",
            EventType::purchase,
            date(2011, 5, 1),
        ));

        data.remove_property("prop-1").unwrap();
        assert!(data.find_property("prop-1").is_none());
        assert!(data.find_event("evt-1").is_none());
        assert!(data.find_event("evt-2").is_some());
    }

    #[test]
    fn test_remove_missing_property() {
        let mut data = TimelineData::new();
        assert_eq!(
            data.remove_property("ghost"),
            Err(TimelineError::PropertyNotFound("ghost".to_string()))
        );
    }

    #[test]
    fn test_toggle_subdivision() {
        let mut data = TimelineData::new();
        assert!(data.toggle_subdivision("evt-3"));
        assert!(data.is_collapsed("evt-3"));
        assert!(!data.toggle_subdivision("evt-3"));
        assert!(!data.is_collapsed("evt-3"));
    }
}
