//! Branch layout for the timeline
//!
//! Every visible property gets a horizontal lane ("branch"). Lots created by
//! a subdivision are placed directly under their parent so the timeline
//! reads as a tree, and split markers connect each parent branch to its lot
//! branches at the subdivision date.

use crate::timeline::{Property, TimelineEvent};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// y coordinate of the first branch
pub const BRANCH_BASE_Y: f64 = 100.0;

/// Vertical distance between consecutive branches
pub const BRANCH_SPACING: f64 = 120.0;

/// Where one property's branch is drawn
#[derive(Debug, Clone, PartialEq)]
pub struct BranchPosition {
    pub property_id: String,
    /// Row number, counted from the top
    pub branch_index: usize,
    /// `BRANCH_BASE_Y + branch_index * BRANCH_SPACING`
    pub y_offset: f64,
    /// 0 for top-level properties, 1 for their lots, and so on
    pub level: usize,
    /// Parent branch, when the parent is also drawn
    pub parent_id: Option<String>,
}

/// Line from a parent branch to one of its lot branches
#[derive(Debug, Clone, PartialEq)]
pub struct SubdivisionConnection {
    pub parent_id: String,
    pub child_id: String,
    /// Horizontal timeline coordinate of the split, 0-100
    pub split_position: f64,
    pub split_date: NaiveDate,
    pub parent_y: f64,
    pub child_y: f64,
}

/// Date span mapped onto the 0-100 horizontal timeline axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimelineRange {
    /// Build a range, swapping the bounds if they are reversed
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Horizontal position (0-100) of a date, clamped to the range
    pub fn position_of(&self, date: NaiveDate) -> f64 {
        let span = (self.end - self.start).num_days();
        if span <= 0 {
            return 0.0;
        }
        let offset = (date - self.start).num_days();
        (offset as f64 / span as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// Lot numbers sort numerically when both are numbers ("2" < "10")
fn compare_lot_numbers(a: &Property, b: &Property) -> Ordering {
    match (a.lot_number.as_deref(), b.lot_number.as_deref()) {
        (Some(x), Some(y)) => match (x.trim().parse::<u64>(), y.trim().parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => x.cmp(y),
        },
        _ => Ordering::Equal,
    }
}

/// Assign a branch to every property in `visible`
///
/// Callers pass only what should be drawn: main-continuation lots and lots
/// of collapsed subdivisions are already filtered out. A property whose
/// parent is not in `visible` is drawn as a top-level branch. The result
/// depends only on the input and its order.
pub fn calculate_branch_positions(visible: &[Property]) -> HashMap<String, BranchPosition> {
    let ids: HashSet<&str> = visible.iter().map(|p| p.id.as_str()).collect();

    let mut roots: Vec<&Property> = Vec::new();
    let mut children: HashMap<&str, Vec<&Property>> = HashMap::new();
    for property in visible {
        match property.parent_property_id.as_deref() {
            Some(parent) if parent != property.id && ids.contains(parent) => {
                children.entry(parent).or_default().push(property);
            }
            _ => roots.push(property),
        }
    }
    for lots in children.values_mut() {
        // Stable: lots without numbers keep input order
        lots.sort_by(|a, b| compare_lot_numbers(a, b));
    }

    let mut positions = HashMap::with_capacity(visible.len());
    let mut next_index = 0;
    for root in roots {
        place_branch(root, None, 0, &children, &mut positions, &mut next_index);
    }
    // Parent references that loop back on themselves never reach a root
    for property in visible {
        if !positions.contains_key(&property.id) {
            place_branch(property, None, 0, &children, &mut positions, &mut next_index);
        }
    }
    positions
}

fn place_branch(
    property: &Property,
    parent_id: Option<&str>,
    level: usize,
    children: &HashMap<&str, Vec<&Property>>,
    positions: &mut HashMap<String, BranchPosition>,
    next_index: &mut usize,
) {
    if positions.contains_key(&property.id) {
        return;
    }
    let branch_index = *next_index;
    *next_index += 1;
    positions.insert(
        property.id.clone(),
        BranchPosition {
            property_id: property.id.clone(),
            branch_index,
            y_offset: BRANCH_BASE_Y + branch_index as f64 * BRANCH_SPACING,
            level,
            parent_id: parent_id.map(str::to_string),
        },
    );

    if let Some(lots) = children.get(property.id.as_str()) {
        for lot in lots {
            place_branch(
                lot,
                Some(property.id.as_str()),
                level + 1,
                children,
                positions,
                next_index,
            );
        }
    }
}

/// Split markers between parent branches and their lot branches
///
/// # Arguments
/// * `all_properties` - Every property, visible or not
/// * `branch_positions` - Output of [`calculate_branch_positions`]
/// * `events` - All events; the parent's subdivision event supplies the date
/// * `date_to_position` - Maps a date to the 0-100 horizontal axis
///
/// # Returns
/// One connection per lot whose branch and parent branch are both drawn
pub fn calculate_subdivision_connections<F>(
    all_properties: &[Property],
    branch_positions: &HashMap<String, BranchPosition>,
    events: &[TimelineEvent],
    date_to_position: F,
) -> Vec<SubdivisionConnection>
where
    F: Fn(NaiveDate) -> f64,
{
    let mut connections = Vec::new();

    for child in all_properties {
        let (Some(parent_id), Some(_group)) = (
            child.parent_property_id.as_deref(),
            child.subdivision_group.as_deref(),
        ) else {
            continue;
        };
        let Some(parent) = all_properties.iter().find(|p| p.id == parent_id) else {
            continue;
        };
        let (Some(parent_pos), Some(child_pos)) = (
            branch_positions.get(&parent.id),
            branch_positions.get(&child.id),
        ) else {
            continue;
        };

        // The subdivision event is authoritative so the marker lines up with
        // the event badge
        let split_date = events
            .iter()
            .find(|e| e.property_id == parent.id && e.created_lot(&child.id))
            .map(|e| e.date)
            .or(child.subdivision_date);
        let Some(split_date) = split_date else {
            continue;
        };

        connections.push(SubdivisionConnection {
            parent_id: parent.id.clone(),
            child_id: child.id.clone(),
            split_position: date_to_position(split_date),
            split_date,
            parent_y: parent_pos.y_offset,
            child_y: child_pos.y_offset,
        });
    }

    connections
}
