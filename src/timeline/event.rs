use super::property::PropertyStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kind of lifecycle event placed on a property's branch
///
/// Uses snake_case naming to match TOML serialization format.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    purchase,
    sale,
    move_in,
    move_out,
    rent_start,
    rent_end,
    improvement,
    building_start,
    building_end,
    refinance,
    inherit,
    ownership_change,
    subdivision,
    status_change,
    living_in_rental_start,
    living_in_rental_end,
    vacant_start,
    vacant_end,
    custom,
}

impl EventType {
    /// Human-readable label used in titles and messages
    pub fn label(self) -> &'static str {
        match self {
            EventType::purchase => "Purchase",
            EventType::sale => "Sale",
            EventType::move_in => "Move In",
            EventType::move_out => "Move Out",
            EventType::rent_start => "Rent Start",
            EventType::rent_end => "Rent End",
            EventType::improvement => "Improvement",
            EventType::building_start => "Building Start",
            EventType::building_end => "Building End",
            EventType::refinance => "Refinance",
            EventType::inherit => "Inherit",
            EventType::ownership_change => "Ownership Change",
            EventType::subdivision => "Subdivision",
            EventType::status_change => "Status Change",
            EventType::living_in_rental_start => "Living in Rental Start",
            EventType::living_in_rental_end => "Living in Rental End",
            EventType::vacant_start => "Vacant Start",
            EventType::vacant_end => "Vacant End",
            EventType::custom => "Custom Event",
        }
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(EventType::purchase),
            "sale" => Ok(EventType::sale),
            "move_in" => Ok(EventType::move_in),
            "move_out" => Ok(EventType::move_out),
            "rent_start" => Ok(EventType::rent_start),
            "rent_end" => Ok(EventType::rent_end),
            "improvement" => Ok(EventType::improvement),
            "building_start" => Ok(EventType::building_start),
            "building_end" => Ok(EventType::building_end),
            "refinance" => Ok(EventType::refinance),
            "inherit" => Ok(EventType::inherit),
            "ownership_change" => Ok(EventType::ownership_change),
            "subdivision" => Ok(EventType::subdivision),
            "status_change" => Ok(EventType::status_change),
            "living_in_rental_start" => Ok(EventType::living_in_rental_start),
            "living_in_rental_end" => Ok(EventType::living_in_rental_end),
            "vacant_start" => Ok(EventType::vacant_start),
            "vacant_end" => Ok(EventType::vacant_end),
            "custom" => Ok(EventType::custom),
            _ => Err(format!(
                "Invalid event type '{}'. Valid options are: purchase, sale, move_in, move_out, rent_start, rent_end, improvement, building_start, building_end, refinance, inherit, ownership_change, subdivision, status_change, living_in_rental_start, living_in_rental_end, vacant_start, vacant_end, custom",
                s
            )),
        }
    }
}

/// The five CGT cost base elements
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CostBaseCategory {
    /// Acquisition or disposal amount
    element1,
    /// Incidental costs of acquiring or disposing
    element2,
    /// Costs of owning (non-deductible holding costs)
    element3,
    /// Capital expenditure to increase or preserve value
    element4,
    /// Capital expenditure to establish, preserve or defend title
    element5,
}

/// One cost base entry attached to an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBaseItem {
    pub id: String,
    /// Predefined definition id (e.g., "stamp_duty") or "custom"
    pub definition_id: String,
    pub name: String,
    pub amount: f64,
    pub category: CostBaseCategory,
    pub is_custom: bool,
}

/// How a subdivision splits the parent's cost base across lots
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AllocationMethod {
    /// Proportional to lot size, except lots with a locked percentage
    #[default]
    by_lot_size,
    /// Every lot uses its own entered percentage
    manual,
}

impl FromStr for AllocationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "by_lot_size" => Ok(AllocationMethod::by_lot_size),
            "manual" => Ok(AllocationMethod::manual),
            _ => Err(format!(
                "Invalid allocation method '{}'. Valid options are: by_lot_size, manual",
                s
            )),
        }
    }
}

/// Land/building split of the parent's purchase price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct CostBreakdown {
    pub land_value: f64,
    pub building_value: f64,
}

/// Details recorded on a `subdivision` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SubdivisionDetails {
    pub parent_property_id: String,
    pub total_lots: usize,
    /// Ids of the lots created by this subdivision, main continuation first
    pub child_properties: Vec<String>,
    pub allocation_method: AllocationMethod,
    pub surveyor_fees: f64,
    pub planning_fees: f64,
    pub legal_fees: f64,
    pub title_fees: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_breakdown: Option<CostBreakdown>,
}

impl SubdivisionDetails {
    /// Sum of all subdivision fees
    pub fn total_fees(&self) -> f64 {
        self.surveyor_fees + self.planning_fees + self.legal_fees + self.title_fees
    }
}

/// Compound-action checkboxes persisted with an event
///
/// Reopening an event for editing reads this back as the session snapshot,
/// so a box that was already ticked is not mistaken for a new tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CheckboxState {
    pub move_in_on_same_day: bool,
    pub purchase_as_vacant: bool,
    pub purchase_as_rent: bool,
    pub is_mixed_use: bool,
}

/// Split of a property's use between living, rental and business
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MixedUse {
    pub living_use_percentage: f64,
    pub rental_use_percentage: f64,
    pub business_use_percentage: f64,
    /// Date the owner moved into the living portion, if not the event date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub move_in_date: Option<NaiveDate>,
}

impl MixedUse {
    pub fn total(&self) -> f64 {
        self.living_use_percentage + self.rental_use_percentage + self.business_use_percentage
    }
}

/// A dated event on a property's branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineEvent {
    pub id: String,
    pub property_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub date: NaiveDate,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Target status for `status_change` events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<PropertyStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cost_bases: Vec<CostBaseItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdivision_details: Option<SubdivisionDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkbox_state: Option<CheckboxState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mixed_use: Option<MixedUse>,
    /// Capital works deductions claimed, reduces the cost base on sale
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division43_deductions: Option<f64>,
}

impl Default for TimelineEvent {
    fn default() -> Self {
        Self {
            id: String::new(),
            property_id: String::new(),
            event_type: EventType::custom,
            date: super::local_date_today(),
            title: String::new(),
            amount: None,
            description: None,
            new_status: None,
            cost_bases: Vec::new(),
            subdivision_details: None,
            checkbox_state: None,
            mixed_use: None,
            division43_deductions: None,
        }
    }
}

impl TimelineEvent {
    /// Create an event titled after its type
    pub fn new(
        id: impl Into<String>,
        property_id: impl Into<String>,
        event_type: EventType,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            property_id: property_id.into(),
            event_type,
            date,
            title: event_type.label().to_string(),
            ..Default::default()
        }
    }

    /// Check if this is a subdivision event that created the given lot
    pub fn created_lot(&self, lot_id: &str) -> bool {
        self.event_type == EventType::subdivision
            && self
                .subdivision_details
                .as_ref()
                .is_some_and(|d| d.child_properties.iter().any(|c| c == lot_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_round_trips_through_label_and_parse() {
        assert_eq!("move_in".parse::<EventType>(), Ok(EventType::move_in));
        assert_eq!(EventType::move_in.label(), "Move In");
        assert!("moving_day".parse::<EventType>().is_err());
    }

    #[test]
    fn test_new_event_title_defaults_to_label() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 14).unwrap();
        let event = TimelineEvent::new("evt-1", "prop-1", EventType::rent_start, date);
        assert_eq!(event.title, "Rent Start");
        assert!(event.cost_bases.is_empty());
    }

    #[test]
    fn test_created_lot() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 14).unwrap();
        let mut event = TimelineEvent::new("evt-1", "prop-1", EventType::subdivision, date);
        assert!(!event.created_lot("lot-a"));

        event.subdivision_details = Some(SubdivisionDetails {
            parent_property_id: "prop-1".to_string(),
            total_lots: 2,
            child_properties: vec!["lot-a".to_string(), "lot-b".to_string()],
            ..Default::default()
        });
        assert!(event.created_lot("lot-b"));
        assert!(!event.created_lot("lot-c"));
    }

    #[test]
    fn test_subdivision_fee_total() {
        let details = SubdivisionDetails {
            surveyor_fees: 4000.0,
            planning_fees: 3000.0,
            legal_fees: 2000.0,
            title_fees: 1000.0,
            ..Default::default()
        };
        assert_eq!(details.total_fees(), 10000.0);
        assert_eq!(details.allocation_method, AllocationMethod::by_lot_size);
    }
}
