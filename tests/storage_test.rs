//! Persistence tests: a full timeline survives a save/load cycle

mod common;

use cgt_timeline_mcp::{EventType, Storage, TimelineData};
use common::{count, date, lot_ids, purchased_property, subdivide};
use std::fs;
use tempfile::TempDir;

fn saved_and_loaded(data: &TimelineData) -> (TimelineData, String) {
    let dir = TempDir::new().unwrap();
    let storage = Storage::new(dir.path().join("timeline.toml"), false);
    storage.save_with_message(data, "Save timeline").unwrap();
    let raw = fs::read_to_string(storage.file_path()).unwrap();
    (storage.load().unwrap(), raw)
}

#[test]
fn test_subdivided_timeline_round_trip() {
    let mut data = purchased_property(500_000.0);
    let group = subdivide(&mut data, &[600.0, 400.0], 10_000.0);
    data.toggle_subdivision(&group);

    let (loaded, raw) = saved_and_loaded(&data);

    assert!(raw.contains("[[property]]"));
    assert!(raw.contains("[[event]]"));
    assert!(raw.contains("type = \"subdivision\""));

    assert_eq!(loaded.properties(), data.properties());
    assert_eq!(loaded.events(), data.events());
    assert!(loaded.is_collapsed(&group));
    assert_eq!(lot_ids(&loaded, &group), lot_ids(&data, &group));

    let details = loaded
        .subdivision_event_for_group(&group)
        .and_then(|e| e.subdivision_details.clone())
        .unwrap();
    assert_eq!(details.surveyor_fees, 10_000.0);
    assert_eq!(details.child_properties.len(), 2);
}

#[test]
fn test_event_index_is_rebuilt_on_load() {
    let data = purchased_property(300_000.0);
    let (loaded, raw) = saved_and_loaded(&data);

    // The index is derived state and never written out
    assert!(!raw.contains("event_index"));
    assert_eq!(
        loaded
            .events_on("prop-1", EventType::purchase, date(2010, 1, 1))
            .len(),
        1
    );
    assert_eq!(count(&loaded, "prop-1", EventType::purchase), 1);
}

#[test]
fn test_counters_continue_after_load() {
    let data = purchased_property(300_000.0);
    let (mut loaded, _) = saved_and_loaded(&data);

    assert_eq!(loaded.generate_property_id(), "prop-2");
    assert_eq!(loaded.generate_event_id(), "evt-2");
}

#[test]
fn test_hand_written_file_without_counters() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("timeline.toml");
    fs::write(
        &path,
        r#"
[[property]]
id = "prop-7"
name = "Unit"
address = "3/4 Beach Rd"

[[event]]
id = "evt-3"
property_id = "prop-7"
type = "purchase"
date = "2001-02-03"
title = "Purchase"
amount = 210000.0
"#,
    )
    .unwrap();

    let mut data = Storage::new(&path, false).load().unwrap();
    assert_eq!(data.format_version, 1);
    assert_eq!(data.find_event("evt-3").unwrap().amount, Some(210_000.0));

    // Generated ids skip the ones already in the file
    let ids: Vec<String> = (0..7).map(|_| data.generate_property_id()).collect();
    assert!(!ids.contains(&"prop-7".to_string()));
}
