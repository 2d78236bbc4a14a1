//! CGT cost-base definitions and summaries
//!
//! Cost-base items attached to events reference a definition by id. The
//! element 1 amounts (purchase, land, building and sale prices) are the
//! transaction price itself, so they are never summed as extra costs.

use crate::allocation::calculate_lot_cost_base;
use crate::timeline::{CostBaseCategory, CostBaseItem, EventType, TimelineData, TimelineEvent};
use std::collections::HashMap;

/// A predefined cost-base line item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBaseDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub category: CostBaseCategory,
    pub applicable_events: &'static [EventType],
}

const PURCHASE: &[EventType] = &[EventType::purchase];
const SALE: &[EventType] = &[EventType::sale];
const IMPROVEMENT: &[EventType] = &[EventType::improvement];
const PURCHASE_OR_REFINANCE: &[EventType] = &[EventType::purchase, EventType::refinance];
const HOLDING: &[EventType] = &[
    EventType::purchase,
    EventType::move_in,
    EventType::move_out,
    EventType::rent_start,
    EventType::rent_end,
    EventType::status_change,
];
const TITLE: &[EventType] = &[EventType::purchase, EventType::status_change];
const CAPITAL_WORKS: &[EventType] = &[EventType::improvement, EventType::purchase, EventType::custom];

macro_rules! definition {
    ($id:literal, $name:literal, $category:ident, $events:expr) => {
        CostBaseDefinition {
            id: $id,
            name: $name,
            category: CostBaseCategory::$category,
            applicable_events: $events,
        }
    };
}

/// Australian CGT cost-base items, grouped by element
pub const COST_BASE_DEFINITIONS: &[CostBaseDefinition] = &[
    definition!("purchase_price", "Purchase Price", element1, PURCHASE),
    definition!("land_price", "Land Price", element1, PURCHASE),
    definition!("building_price", "Building Price", element1, PURCHASE),
    definition!("stamp_duty", "Stamp Duty", element2, PURCHASE),
    definition!("purchase_legal_fees", "Legal Fees (Purchase)", element2, PURCHASE),
    definition!("conveyancing_fees_purchase", "Conveyancing Fees (Purchase)", element2, PURCHASE),
    definition!(
        "valuation_fees",
        "Valuation Fees",
        element2,
        &[EventType::purchase, EventType::move_out, EventType::refinance]
    ),
    definition!("purchase_agent_fees", "Buyer's Agent Commission", element2, PURCHASE),
    definition!("building_inspection", "Building Inspection Fees", element2, PURCHASE),
    definition!("pest_inspection", "Pest Inspection Fees", element2, PURCHASE),
    definition!("survey_fees", "Survey Fees", element2, PURCHASE),
    definition!("search_fees", "Title Search Fees", element2, PURCHASE),
    definition!("loan_application_fees", "Loan Application Fees", element2, PURCHASE_OR_REFINANCE),
    definition!("loan_establishment", "Loan Establishment Fees", element2, PURCHASE_OR_REFINANCE),
    definition!("mortgage_insurance", "Lender's Mortgage Insurance (LMI)", element2, PURCHASE),
    definition!("sale_price", "Sale Price", element1, SALE),
    definition!("sale_legal_fees", "Legal Fees (Sale)", element2, SALE),
    definition!("conveyancing_fees_sale", "Conveyancing Fees (Sale)", element2, SALE),
    definition!("sale_agent_fees", "Real Estate Agent Commission", element2, SALE),
    definition!("advertising_costs", "Advertising Costs", element2, SALE),
    definition!("staging_costs", "Property Staging Costs", element2, SALE),
    definition!("auction_fees", "Auction Fees", element2, SALE),
    definition!("mortgage_discharge_fees", "Mortgage Discharge Fees", element2, SALE),
    definition!("land_tax", "Land Tax", element3, HOLDING),
    definition!("council_rates", "Council Rates", element3, HOLDING),
    definition!("water_rates", "Water Rates", element3, HOLDING),
    definition!("insurance", "Property Insurance", element3, HOLDING),
    definition!("body_corporate_fees", "Body Corporate/Strata Fees", element3, HOLDING),
    definition!("maintenance_costs", "Maintenance Costs", element3, HOLDING),
    definition!("renovation_kitchen", "Kitchen Renovation", element4, IMPROVEMENT),
    definition!("renovation_bathroom", "Bathroom Renovation", element4, IMPROVEMENT),
    definition!("renovation_whole_house", "Whole House Renovation", element4, IMPROVEMENT),
    definition!("extension", "Extension", element4, IMPROVEMENT),
    definition!("swimming_pool", "Swimming Pool", element4, IMPROVEMENT),
    definition!("landscaping", "Capital Landscaping", element4, IMPROVEMENT),
    definition!("garage_carport", "Garage/Carport", element4, IMPROVEMENT),
    definition!("fencing", "Fencing", element4, IMPROVEMENT),
    definition!("solar_panels", "Solar Panels", element4, IMPROVEMENT),
    definition!("zoning_change_costs", "Zoning Change Application Costs", element4, CAPITAL_WORKS),
    definition!("title_legal_fees", "Legal Fees (Title Defense)", element5, TITLE),
    definition!("boundary_dispute", "Boundary Dispute Costs", element5, &[EventType::status_change]),
    definition!("title_insurance", "Title Insurance", element5, PURCHASE),
    definition!("easement_costs", "Easement Legal Costs", element5, TITLE),
];

/// Definitions that hold a transaction price rather than a cost
const PRICE_DEFINITIONS: [&str; 4] = ["purchase_price", "land_price", "building_price", "sale_price"];

pub fn find_definition(id: &str) -> Option<&'static CostBaseDefinition> {
    COST_BASE_DEFINITIONS.iter().find(|d| d.id == id)
}

/// Definitions offered for an event type
pub fn definitions_for(event_type: EventType) -> Vec<&'static CostBaseDefinition> {
    COST_BASE_DEFINITIONS
        .iter()
        .filter(|d| d.applicable_events.contains(&event_type))
        .collect()
}

pub fn category_name(category: CostBaseCategory) -> &'static str {
    match category {
        CostBaseCategory::element1 => "Element 1: Acquisition Costs",
        CostBaseCategory::element2 => "Element 2: Incidental Costs",
        CostBaseCategory::element3 => "Element 3: Holding Costs",
        CostBaseCategory::element4 => "Element 4: Capital Improvements",
        CostBaseCategory::element5 => "Element 5: Title Costs",
    }
}

/// Build a cost-base item from a predefined definition
///
/// `None` for an unknown definition or a negative amount.
pub fn cost_base_item(id: impl Into<String>, definition_id: &str, amount: f64) -> Option<CostBaseItem> {
    if amount < 0.0 {
        return None;
    }
    let definition = find_definition(definition_id)?;
    Some(CostBaseItem {
        id: id.into(),
        definition_id: definition.id.to_string(),
        name: definition.name.to_string(),
        amount,
        category: definition.category,
        is_custom: false,
    })
}

fn is_price(item: &CostBaseItem) -> bool {
    PRICE_DEFINITIONS.contains(&item.definition_id.as_str())
}

fn item_amount(event: &TimelineEvent, definition_id: &str) -> f64 {
    event
        .cost_bases
        .iter()
        .find(|cb| cb.definition_id == definition_id)
        .map(|cb| cb.amount)
        .unwrap_or(0.0)
}

/// Sum of an event's cost items, leaving out transaction prices
pub fn incidental_costs(event: Option<&TimelineEvent>) -> f64 {
    event
        .map(|e| {
            e.cost_bases
                .iter()
                .filter(|cb| !is_price(cb))
                .map(|cb| cb.amount)
                .sum()
        })
        .unwrap_or(0.0)
}

fn positive_amount(event: &TimelineEvent) -> Option<f64> {
    event.amount.filter(|a| *a > 0.0)
}

/// Purchase price: event amount, else a `purchase_price` item, else land
/// plus building
pub fn purchase_price(event: Option<&TimelineEvent>) -> f64 {
    let Some(event) = event else {
        return 0.0;
    };
    if let Some(amount) = positive_amount(event) {
        return amount;
    }
    let explicit = item_amount(event, "purchase_price");
    if explicit > 0.0 {
        return explicit;
    }
    item_amount(event, "land_price") + item_amount(event, "building_price")
}

/// Sale price: event amount, else a `sale_price` item
pub fn sale_price(event: Option<&TimelineEvent>) -> f64 {
    let Some(event) = event else {
        return 0.0;
    };
    positive_amount(event).unwrap_or_else(|| item_amount(event, "sale_price"))
}

/// Cost of one improvement: event amount, else its non-price items
pub fn improvement_amount(event: &TimelineEvent) -> f64 {
    positive_amount(event).unwrap_or_else(|| incidental_costs(Some(event)))
}

/// Running totals for one property's CGT cost base
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CostBaseSummary {
    pub property_id: String,
    /// Purchase price, or the share allocated from the parent for a lot
    pub acquisition_cost: f64,
    pub purchase_costs: f64,
    pub improvement_costs: f64,
    pub selling_costs: f64,
    pub division43_deductions: f64,
    pub sale_price: Option<f64>,
}

impl CostBaseSummary {
    pub fn total_cost_base(&self) -> f64 {
        self.acquisition_cost + self.purchase_costs + self.improvement_costs + self.selling_costs
            - self.division43_deductions
    }

    /// Gain (or loss, if negative) once the property has been sold
    pub fn capital_gain(&self) -> Option<f64> {
        self.sale_price.map(|price| price - self.total_cost_base())
    }
}

impl TimelineData {
    /// Summarise the cost base of a property or lot
    ///
    /// A lot without its own purchase event starts from its allocated share
    /// of the parent's price and subdivision fees.
    pub fn cost_base_summary(&self, property_id: &str) -> Option<CostBaseSummary> {
        let property = self.find_property(property_id)?;
        let events = self.events_for_property(property_id);

        let purchase = events
            .iter()
            .copied()
            .find(|e| e.event_type == EventType::purchase);
        let sale = events
            .iter()
            .copied()
            .rev()
            .find(|e| e.event_type == EventType::sale);

        let acquisition_cost = match purchase {
            Some(p) => purchase_price(Some(p)),
            None if property.is_lot() => {
                let details = property
                    .subdivision_group
                    .as_deref()
                    .and_then(|group| self.subdivision_event_for_group(group))
                    .and_then(|e| e.subdivision_details.as_ref());
                calculate_lot_cost_base(property_id, self.properties(), &HashMap::new(), details)
            }
            None => property.purchase_price.unwrap_or(0.0),
        };

        let improvement_costs = events
            .iter()
            .filter(|e| e.event_type == EventType::improvement)
            .map(|e| improvement_amount(e))
            .sum();

        Some(CostBaseSummary {
            property_id: property_id.to_string(),
            acquisition_cost,
            purchase_costs: incidental_costs(purchase),
            improvement_costs,
            selling_costs: incidental_costs(sale),
            division43_deductions: sale.and_then(|s| s.division43_deductions).unwrap_or(0.0),
            sale_price: sale
                .map(|s| sale_price(Some(s)))
                .or(property.sale_price),
        })
    }
}
