//! Common test utilities for integration tests

#![allow(dead_code)]

use cgt_timeline_mcp::timeline::{LotSpec, SubdivisionRequest};
use cgt_timeline_mcp::{EventType, Property, TimelineData, TimelineEvent};
use chrono::NaiveDate;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Timeline with one property (prop-1) bought for `price` on 1 Jan 2010
pub fn purchased_property(price: f64) -> TimelineData {
    let mut data = TimelineData::new();
    let id = data.generate_property_id();
    let mut property = Property::new(id.clone(), "Farm", "12 Creek Rd");
    property.purchase_price = Some(price);
    property.purchase_date = Some(date(2010, 1, 1));
    data.add_property(property).unwrap();

    let event_id = data.generate_event_id();
    let mut purchase = TimelineEvent::new(event_id, id, EventType::purchase, date(2010, 1, 1));
    purchase.amount = Some(price);
    data.add_event(purchase);
    data
}

pub fn lots(sizes: &[f64]) -> Vec<LotSpec> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, size)| LotSpec {
            name: format!("Lot {}", i + 1),
            address: None,
            lot_size: *size,
        })
        .collect()
}

/// Subdivide prop-1 on 1 Jul 2018 and return the group id
pub fn subdivide(data: &mut TimelineData, sizes: &[f64], fees: f64) -> String {
    let mut request = SubdivisionRequest::new("prop-1", date(2018, 7, 1), lots(sizes));
    request.surveyor_fees = fees;
    data.subdivide(request).unwrap()
}

/// Ids of a group's lots in stored order
pub fn lot_ids(data: &TimelineData, group: &str) -> Vec<String> {
    data.lots_in_group(group)
        .iter()
        .map(|l| l.id.clone())
        .collect()
}

pub fn count(data: &TimelineData, property_id: &str, event_type: EventType) -> usize {
    data.events_for_property(property_id)
        .iter()
        .filter(|e| e.event_type == event_type)
        .count()
}
