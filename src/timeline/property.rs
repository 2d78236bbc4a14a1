use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a property is being used over a period of time
///
/// Uses snake_case naming to match TOML serialization format.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyStatus {
    /// Main residence (owner lives in it)
    ppr,
    /// Rented to tenants
    rental,
    /// Empty or not used
    vacant,
    /// Being built or renovated
    construction,
    /// Disposed of
    sold,
    /// Split into lots by a subdivision event
    subdivided,
    /// Owner is living in a rental they do not own
    living_in_rental,
}

impl FromStr for PropertyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ppr" => Ok(PropertyStatus::ppr),
            "rental" => Ok(PropertyStatus::rental),
            "vacant" => Ok(PropertyStatus::vacant),
            "construction" => Ok(PropertyStatus::construction),
            "sold" => Ok(PropertyStatus::sold),
            "subdivided" => Ok(PropertyStatus::subdivided),
            "living_in_rental" => Ok(PropertyStatus::living_in_rental),
            _ => Err(format!(
                "Invalid status '{}'. Valid options are: ppr, rental, vacant, construction, sold, subdivided, living_in_rental",
                s
            )),
        }
    }
}

/// One owner's share of a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub name: String,
    /// Share of ownership, 0-100
    pub percentage: f64,
}

/// A property (or a subdivided lot) drawn as one branch of the timeline
///
/// Lots produced by a subdivision carry a `parent_property_id` and share a
/// `subdivision_group` with their siblings. Exactly one lot per group is the
/// main continuation: it keeps the parent's timeline identity and is drawn on
/// the parent's branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Property {
    /// Unique identifier (e.g., "prop-1")
    pub id: String,
    pub name: String,
    pub address: String,
    /// Owning property when this is a subdivided lot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_property_id: Option<String>,
    /// Groups sibling lots created by one subdivision event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdivision_group: Option<String>,
    pub is_main_lot_continuation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,
    /// Lot size in square metres
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_size: Option<f64>,
    /// Share of the parent's cost base, 0-100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation_percentage: Option<f64>,
    /// Set when `allocation_percentage` was entered by hand and must not be
    /// recomputed from lot sizes
    pub is_percentage_locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_date: Option<NaiveDate>,
    /// Date the lot came into existence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdivision_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status: Option<PropertyStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<Owner>,
}

impl Property {
    /// Create a top-level property with just its identity fields
    pub fn new(id: impl Into<String>, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: address.into(),
            ..Default::default()
        }
    }

    /// Check if this property is a lot produced by a subdivision
    pub fn is_lot(&self) -> bool {
        self.parent_property_id.is_some()
    }

    /// Sum of all owners' percentages
    pub fn ownership_total(&self) -> f64 {
        self.owners.iter().map(|o| o.percentage).sum()
    }
}
