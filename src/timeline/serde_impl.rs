//! Serialization and deserialization implementations for TimelineData
//!
//! The event index is derived state: it is skipped on save and rebuilt from
//! the event list on load.

use super::event::TimelineEvent;
use super::property::Property;
use super::timeline_data::TimelineData;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};

/// On-disk shape of TimelineData
#[derive(Deserialize, Default)]
#[serde(default)]
struct TimelineDataHelper {
    format_version: u32,
    property: Vec<Property>,
    event: Vec<TimelineEvent>,
    collapsed_subdivisions: BTreeSet<String>,
    property_counter: u32,
    event_counter: u32,
}

impl<'de> Deserialize<'de> for TimelineData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let helper = TimelineDataHelper::deserialize(deserializer)?;

        // Collapsed groups that no longer have lots are dropped on load
        let collapsed_subdivisions = helper
            .collapsed_subdivisions
            .into_iter()
            .filter(|group| {
                helper
                    .property
                    .iter()
                    .any(|p| p.subdivision_group.as_deref() == Some(group.as_str()))
            })
            .collect();

        let mut data = TimelineData {
            format_version: helper.format_version.max(1),
            properties: helper.property,
            events: helper.event,
            collapsed_subdivisions,
            event_index: HashMap::new(),
            property_counter: helper.property_counter,
            event_counter: helper.event_counter,
        };
        data.rebuild_index();
        Ok(data)
    }
}

impl Serialize for TimelineData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("TimelineData", 6)?;
        state.serialize_field("format_version", &self.format_version)?;

        if self.property_counter != 0 {
            state.serialize_field("property_counter", &self.property_counter)?;
        }
        if self.event_counter != 0 {
            state.serialize_field("event_counter", &self.event_counter)?;
        }
        if !self.collapsed_subdivisions.is_empty() {
            state.serialize_field("collapsed_subdivisions", &self.collapsed_subdivisions)?;
        }

        // Arrays of tables go last so TOML can emit them as [[property]]/[[event]]
        if !self.properties.is_empty() {
            state.serialize_field("property", &self.properties)?;
        }
        if !self.events.is_empty() {
            state.serialize_field("event", &self.events)?;
        }

        state.end()
    }
}
