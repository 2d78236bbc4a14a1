//! Subdividing a property into lots and editing those lots
//!
//! A subdivision creates one `subdivision` event on the parent and one
//! property per lot. The event id doubles as the lots' `subdivision_group`.
//! Lot 1 is the main continuation and keeps the parent's timeline identity.

use super::event::{AllocationMethod, CostBreakdown, EventType, SubdivisionDetails, TimelineEvent};
use super::property::{Property, PropertyStatus};
use super::timeline_data::TimelineData;
use crate::allocation::{self, EffectiveLot, LotEdit};
use crate::error::{TimelineError, TimelineResult};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::info;

/// One lot to create in a subdivision
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LotSpec {
    pub name: String,
    /// Defaults to "<parent address> (Lot N)"
    pub address: Option<String>,
    /// Size in square metres
    pub lot_size: f64,
}

/// Everything needed to subdivide a property
#[derive(Debug, Clone, PartialEq)]
pub struct SubdivisionRequest {
    pub property_id: String,
    pub date: NaiveDate,
    pub lots: Vec<LotSpec>,
    pub surveyor_fees: f64,
    pub planning_fees: f64,
    pub legal_fees: f64,
    pub title_fees: f64,
    pub allocation_method: AllocationMethod,
    pub cost_breakdown: Option<CostBreakdown>,
}

impl SubdivisionRequest {
    pub fn new(property_id: impl Into<String>, date: NaiveDate, lots: Vec<LotSpec>) -> Self {
        Self {
            property_id: property_id.into(),
            date,
            lots,
            surveyor_fees: 0.0,
            planning_fees: 0.0,
            legal_fees: 0.0,
            title_fees: 0.0,
            allocation_method: AllocationMethod::default(),
            cost_breakdown: None,
        }
    }
}

impl TimelineData {
    /// Split a property into lots
    ///
    /// # Returns
    /// The id of the new subdivision event, which is also the group id of
    /// the created lots
    pub fn subdivide(&mut self, request: SubdivisionRequest) -> TimelineResult<String> {
        let parent = self
            .find_property(&request.property_id)
            .cloned()
            .ok_or_else(|| TimelineError::PropertyNotFound(request.property_id.clone()))?;

        if request.lots.len() < 2 {
            return Err(TimelineError::InvalidSubdivision(
                "Subdivision requires at least 2 lots".to_string(),
            ));
        }
        if request
            .lots
            .iter()
            .any(|lot| lot.name.trim().is_empty() || lot.lot_size <= 0.0)
        {
            return Err(TimelineError::InvalidSubdivision(
                "Every lot needs a name and a lot size greater than zero".to_string(),
            ));
        }
        if self.is_subdivided(&parent.id) {
            return Err(TimelineError::InvalidSubdivision(format!(
                "Property '{}' is already subdivided",
                parent.id
            )));
        }
        let fees = [
            request.surveyor_fees,
            request.planning_fees,
            request.legal_fees,
            request.title_fees,
        ];
        if fees.iter().any(|f| *f < 0.0) {
            return Err(TimelineError::InvalidSubdivision(
                "Subdivision fees cannot be negative".to_string(),
            ));
        }

        let event_id = self.generate_event_id();
        let lot_ids: Vec<String> = request
            .lots
            .iter()
            .map(|_| self.generate_property_id())
            .collect();

        let total_size: f64 = request.lots.iter().map(|l| l.lot_size).sum();
        for (index, (spec, lot_id)) in request.lots.iter().zip(&lot_ids).enumerate() {
            let lot_number = index + 1;
            let lot = Property {
                id: lot_id.clone(),
                name: spec.name.trim().to_string(),
                address: spec
                    .address
                    .clone()
                    .unwrap_or_else(|| format!("{} (Lot {})", parent.address, lot_number)),
                parent_property_id: Some(parent.id.clone()),
                subdivision_group: Some(event_id.clone()),
                is_main_lot_continuation: index == 0,
                lot_number: Some(lot_number.to_string()),
                lot_size: Some(spec.lot_size),
                allocation_percentage: Some(spec.lot_size * 100.0 / total_size),
                subdivision_date: Some(request.date),
                owners: parent.owners.clone(),
                ..Default::default()
            };
            self.properties.push(lot);
        }

        let mut event = TimelineEvent::new(
            event_id.clone(),
            parent.id.clone(),
            EventType::subdivision,
            request.date,
        );
        event.description = Some(format!("Subdivided into {} lots", request.lots.len()));
        event.subdivision_details = Some(SubdivisionDetails {
            parent_property_id: parent.id.clone(),
            total_lots: request.lots.len(),
            child_properties: lot_ids,
            allocation_method: request.allocation_method,
            surveyor_fees: request.surveyor_fees,
            planning_fees: request.planning_fees,
            legal_fees: request.legal_fees,
            title_fees: request.title_fees,
            cost_breakdown: request.cost_breakdown,
        });
        self.add_event(event);

        if let Some(p) = self.find_property_mut(&parent.id) {
            p.current_status = Some(PropertyStatus::subdivided);
        }

        info!(
            property = %parent.id,
            group = %event_id,
            lots = request.lots.len(),
            "property subdivided"
        );
        Ok(event_id)
    }

    /// Commit an edit session's lot changes for one subdivision group
    ///
    /// The whole group is validated first; on error nothing is changed.
    /// Unlocked lots get their percentage recomputed from size, locked
    /// lots keep theirs.
    pub fn apply_lot_edits(
        &mut self,
        group: &str,
        edits: &HashMap<String, LotEdit>,
    ) -> TimelineResult<()> {
        let lot_ids: Vec<String> = self
            .lots_in_group(group)
            .iter()
            .map(|l| l.id.clone())
            .collect();
        if lot_ids.is_empty() {
            return Err(TimelineError::InvalidSubdivision(format!(
                "Subdivision '{}' has no lots",
                group
            )));
        }
        if let Some(unknown) = edits.keys().find(|id| !lot_ids.contains(id)) {
            return Err(TimelineError::PropertyNotFound(unknown.clone()));
        }
        if edits
            .values()
            .any(|e| e.lot_size.is_some_and(|s| s <= 0.0))
        {
            return Err(TimelineError::InvalidSubdivision(
                "Lot size must be greater than zero".to_string(),
            ));
        }
        if edits
            .values()
            .any(|e| e.allocation_percentage.is_some_and(|p| !(0.0..=100.0).contains(&p)))
        {
            return Err(TimelineError::InvalidSubdivision(
                "Allocation percentage must be between 0 and 100".to_string(),
            ));
        }

        let method = self
            .subdivision_event_for_group(group)
            .and_then(|e| e.subdivision_details.as_ref())
            .map(|d| d.allocation_method)
            .unwrap_or_default();

        let effective: Vec<EffectiveLot> = self
            .lots_in_group(group)
            .into_iter()
            .map(|l| EffectiveLot::from_property(l, edits.get(&l.id)))
            .collect();
        allocation::validate_allocation_percentages(&effective, method)?;
        let percentages = allocation::lot_percentages(&effective, method);

        for (lot, percentage) in effective.iter().zip(percentages) {
            if let Some(stored) = self.find_property_mut(&lot.id) {
                stored.lot_size = Some(lot.lot_size);
                stored.is_percentage_locked = lot.is_percentage_locked;
                stored.allocation_percentage = if lot.locked_percentage().is_some() {
                    lot.allocation_percentage
                } else {
                    Some(percentage)
                };
            }
        }

        info!(group, lots = lot_ids.len(), "lot edits applied");
        Ok(())
    }
}
