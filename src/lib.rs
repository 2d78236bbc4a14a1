//! CGT Timeline MCP Server Library
//!
//! This library provides a Model Context Protocol (MCP) server for building
//! property timelines used in Australian capital gains tax (CGT) work:
//! purchases, moves, rentals, improvements, subdivisions into lots and
//! sales, with cost bases allocated across subdivided lots.
//!
//! # Architecture
//!
//! The library follows a 3-layer architecture:
//! - **MCP Layer**: `CgtTimelineHandler` - Handles MCP protocol communication
//! - **Domain Layer**: `timeline`, `allocation`, `companion`, `layout` and
//!   friends - Data models and the timeline engines
//! - **Persistence Layer**: `storage` module - File-based TOML storage with Git sync,
//!   plus the in-memory undo/redo `history`
//!
//! # Example
//!
//! ```no_run
//! use cgt_timeline_mcp::CgtTimelineHandler;
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let handler = CgtTimelineHandler::new("timeline.toml", false)?;
//!     // Use handler with MCP server...
//!     Ok(())
//! }
//! ```

pub mod allocation;
pub mod companion;
pub mod cost_base;
pub mod dates;
pub mod error;
pub mod formatting;
mod git_ops;
pub mod history;
pub mod layout;
pub mod status;
mod storage;
pub mod timeline;
pub mod units;
pub mod validation;

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

use mcp_attr::server::{McpServer, mcp_server};
use mcp_attr::{Result as McpResult, bail};

use allocation::{LotEdit, allocate_lots, sibling_lots};
use companion::{CompanionSnapshot, plan_companions};
use cost_base::{cost_base_item, definitions_for};
use dates::format_date_display;
use formatting::{
    format_cost_base_summary, format_currency, format_events, format_layout, format_property,
    format_status_periods,
};
use history::{History, Snapshot};
use layout::{calculate_branch_positions, calculate_subdivision_connections};
use status::calculate_status_periods;
use units::AreaUnit;
use validation::{
    parse_allocation_method, parse_area_unit, parse_date_arg, parse_event_type,
    parse_optional_date_arg, parse_status, validate_event, validate_owners,
};

// Re-export commonly used types
pub use error::{TimelineError, TimelineResult};
pub use git_ops::{CommitOutcome, GitOps, PullOutcome};
pub use storage::Storage;
pub use timeline::{
    AllocationMethod, CheckboxState, EventType, MixedUse, Owner, Property, PropertyStatus,
    TimelineData, TimelineEvent,
};

/// MCP Server handler for CGT property timelines
///
/// All changes are persisted to a TOML file after every successful tool
/// call and optionally synchronized with Git. Edits to properties and events
/// can be undone for the life of the process.
pub struct CgtTimelineHandler {
    pub(crate) data: Mutex<TimelineData>,
    pub(crate) history: Mutex<History>,
    pub(crate) storage: Storage,
}

impl CgtTimelineHandler {
    /// Create a new handler
    ///
    /// # Arguments
    /// * `storage_path` - Path to the timeline data file (TOML format)
    /// * `sync_git` - Enable automatic Git synchronization
    ///
    /// # Returns
    /// Result containing the handler or an error
    pub fn new(storage_path: &str, sync_git: bool) -> Result<Self> {
        let storage = Storage::new(storage_path, sync_git);
        let data = Mutex::new(storage.load()?);
        Ok(Self {
            data,
            history: Mutex::new(History::default()),
            storage,
        })
    }

    /// Keep at most `limit` edits for undo (0 disables undo)
    pub fn with_history_limit(self, limit: usize) -> Self {
        *self.history.lock().unwrap() = History::new(limit);
        self
    }

    /// Record a successful edit so it can be undone
    fn remember(&self, action: &str, before: Snapshot) {
        self.history.lock().unwrap().record(action, before);
    }

    /// Save timeline data with a custom commit message
    fn save_data_with_message(&self, message: &str) -> Result<()> {
        let data = self.data.lock().unwrap();
        self.storage.save_with_message(&data, message)?;
        Ok(())
    }

    fn area_unit(unit: Option<&str>) -> McpResult<AreaUnit> {
        match unit {
            Some(u) if !u.trim().is_empty() => parse_area_unit(u),
            _ => Ok(AreaUnit::default()),
        }
    }

    fn checkbox_state(
        base: Option<CheckboxState>,
        move_in_on_same_day: Option<bool>,
        purchase_as_vacant: Option<bool>,
        purchase_as_rent: Option<bool>,
        is_mixed_use: Option<bool>,
    ) -> Option<CheckboxState> {
        if base.is_none()
            && move_in_on_same_day.is_none()
            && purchase_as_vacant.is_none()
            && purchase_as_rent.is_none()
            && is_mixed_use.is_none()
        {
            return None;
        }
        let base = base.unwrap_or_default();
        Some(CheckboxState {
            move_in_on_same_day: move_in_on_same_day.unwrap_or(base.move_in_on_same_day),
            purchase_as_vacant: purchase_as_vacant.unwrap_or(base.purchase_as_vacant),
            purchase_as_rent: purchase_as_rent.unwrap_or(base.purchase_as_rent),
            is_mixed_use: is_mixed_use.unwrap_or(base.is_mixed_use),
        })
    }

    fn mixed_use(
        base: Option<MixedUse>,
        living: Option<f64>,
        rental: Option<f64>,
        business: Option<f64>,
        move_in_date: Option<Option<NaiveDate>>,
    ) -> Option<MixedUse> {
        if base.is_none()
            && living.is_none()
            && rental.is_none()
            && business.is_none()
            && move_in_date.is_none()
        {
            return None;
        }
        let base = base.unwrap_or_default();
        Some(MixedUse {
            living_use_percentage: living.unwrap_or(base.living_use_percentage),
            rental_use_percentage: rental.unwrap_or(base.rental_use_percentage),
            business_use_percentage: business.unwrap_or(base.business_use_percentage),
            move_in_date: move_in_date.unwrap_or(base.move_in_date),
        })
    }

    /// Keep the property's headline purchase/sale fields in step with its events
    fn sync_property_dates(data: &mut TimelineData, event: &TimelineEvent) {
        let Some(property) = data.find_property_mut(&event.property_id) else {
            return;
        };
        match event.event_type {
            EventType::purchase => {
                property.purchase_date = Some(event.date);
                if event.amount.is_some() {
                    property.purchase_price = event.amount;
                }
            }
            EventType::sale => {
                property.sale_date = Some(event.date);
                if event.amount.is_some() {
                    property.sale_price = event.amount;
                }
                property.current_status = Some(PropertyStatus::sold);
            }
            _ => {}
        }
    }

    fn describe_companions(created: &[TimelineEvent], removed: &[TimelineEvent]) -> String {
        let mut result = String::new();
        for event in created {
            result.push_str(&format!(
                "\nCompanion created: {} ({} on {})",
                event.id,
                event.title,
                format_date_display(event.date)
            ));
        }
        for event in removed {
            result.push_str(&format!(
                "\nCompanion removed: {} ({} on {})",
                event.id,
                event.title,
                format_date_display(event.date)
            ));
        }
        result
    }
}

impl Drop for CgtTimelineHandler {
    fn drop(&mut self) {
        // Push to git on shutdown if sync is enabled
        if let Err(e) = self.storage.shutdown() {
            warn!(error = %e, "shutdown git sync failed");
        }
    }
}

/// CGT property timeline server for Australian capital gains tax records.
///
/// Each property has a branch on a timeline holding dated events: purchase,
/// move_in/move_out, rent_start/rent_end, improvement, refinance, sale,
/// status_change and more. A property can be subdivided into lots; Lot 1
/// continues the parent's branch and the other lots branch off at the
/// subdivision date.
///
/// Key concepts:
/// - **Companion events**: ticking "moved in on the same day", "bought as
///   vacant" or "bought as a rental" on an event creates the matching
///   move_in, vacant status_change or rent_start. Unticking removes it.
/// - **Lot allocation**: each lot's cost base is its share of the parent's
///   purchase price (by lot size, or a locked percentage) plus an even share
///   of the subdivision fees.
/// - **Dates**: day-first, e.g. "15/01/2023", "15012023", "15 Jan 2023" or
///   ISO "2023-01-15".
///
/// Property IDs: prop-1, prop-2, ... Event IDs: evt-1, evt-2, ...
/// A subdivision's ID is the ID of its subdivision event.
/// Changes can be stepped back and forth with undo/redo.
#[mcp_server]
impl McpServer for CgtTimelineHandler {
    /// **Add property**: Create a new property branch on the timeline.
    /// **Workflow**: add_property → add_event (purchase) → further events.
    #[tool]
    async fn add_property(
        &self,
        /// Name, e.g. "Family home"
        name: String,
        /// Street address
        address: String,
        /// Purchase price in dollars (optional)
        purchase_price: Option<f64>,
        /// Purchase date, e.g. "15/01/2023" (optional)
        purchase_date: Option<String>,
        /// Status: ppr/rental/vacant/construction/sold/living_in_rental (optional)
        status: Option<String>,
    ) -> McpResult<String> {
        if name.trim().is_empty() {
            bail!("Property name cannot be empty");
        }
        let purchase_date = purchase_date.as_deref().map(parse_date_arg).transpose()?;
        let status = status.as_deref().map(parse_status).transpose()?;
        if purchase_price.is_some_and(|p| p < 0.0) {
            bail!("Purchase price cannot be negative");
        }

        let mut data = self.data.lock().unwrap();
        let before = Snapshot::of(&data);
        let id = data.generate_property_id();
        let mut property = Property::new(id.clone(), name.trim(), address.trim());
        property.purchase_price = purchase_price;
        property.purchase_date = purchase_date;
        property.current_status = status;

        if let Err(e) = data.add_property(property) {
            drop(data);
            bail!("{}", e);
        }
        let message = format!("Add property {}", id);
        self.remember(&message, before);
        drop(data);

        if let Err(e) = self.save_data_with_message(&message) {
            bail!("Failed to save: {}", e);
        }

        Ok(format!("Property created with ID: {} ({})", id, name.trim()))
    }

    /// **Update property**: Change a property's details.
    /// **Tip**: Use empty string "" to clear optional dates.
    #[allow(clippy::too_many_arguments)]
    #[tool]
    async fn update_property(
        &self,
        /// Property ID
        id: String,
        /// New name (optional)
        name: Option<String>,
        /// New address (optional)
        address: Option<String>,
        /// Purchase price in dollars (optional)
        purchase_price: Option<f64>,
        /// Purchase date, ""=clear (optional)
        purchase_date: Option<String>,
        /// Sale price in dollars (optional)
        sale_price: Option<f64>,
        /// Sale date, ""=clear (optional)
        sale_date: Option<String>,
        /// Status: ppr/rental/vacant/construction/sold/subdivided/living_in_rental (optional)
        status: Option<String>,
    ) -> McpResult<String> {
        let purchase_date = parse_optional_date_arg(purchase_date.as_deref())?;
        let sale_date = parse_optional_date_arg(sale_date.as_deref())?;
        let status = status.as_deref().map(parse_status).transpose()?;
        if purchase_price.is_some_and(|p| p < 0.0) || sale_price.is_some_and(|p| p < 0.0) {
            bail!("Prices cannot be negative");
        }

        if name.as_ref().is_some_and(|n| n.trim().is_empty()) {
            bail!("Property name cannot be empty");
        }

        let mut data = self.data.lock().unwrap();
        let before = Snapshot::of(&data);
        let Some(property) = data.find_property_mut(&id) else {
            bail!("Property '{}' not found", id);
        };

        if let Some(name) = name {
            property.name = name.trim().to_string();
        }
        if let Some(address) = address {
            property.address = address.trim().to_string();
        }
        if purchase_price.is_some() {
            property.purchase_price = purchase_price;
        }
        if let Some(date) = purchase_date {
            property.purchase_date = date;
        }
        if sale_price.is_some() {
            property.sale_price = sale_price;
        }
        if let Some(date) = sale_date {
            property.sale_date = date;
        }
        if status.is_some() {
            property.current_status = status;
        }
        let message = format!("Update property {}", id);
        self.remember(&message, before);
        drop(data);

        if let Err(e) = self.save_data_with_message(&message) {
            bail!("Failed to save: {}", e);
        }

        Ok(format!("Property {} updated", id))
    }

    /// **Set owners**: Replace a property's owners. Percentages must total 100.
    #[tool]
    async fn set_owners(
        &self,
        /// Property ID
        property_id: String,
        /// Owner names
        names: Vec<String>,
        /// Ownership percentages, same order as names
        percentages: Vec<f64>,
    ) -> McpResult<String> {
        if names.len() != percentages.len() {
            bail!(
                "Got {} owner name(s) but {} percentage(s)",
                names.len(),
                percentages.len()
            );
        }
        let owners: Vec<Owner> = names
            .into_iter()
            .zip(percentages)
            .map(|(name, percentage)| Owner {
                name: name.trim().to_string(),
                percentage,
            })
            .collect();
        if let Err(e) = validate_owners(&owners) {
            bail!("{}", e);
        }

        let mut data = self.data.lock().unwrap();
        let before = Snapshot::of(&data);
        let Some(property) = data.find_property_mut(&property_id) else {
            bail!("Property '{}' not found", property_id);
        };
        let count = owners.len();
        property.owners = owners;
        let message = format!("Set owners of {}", property_id);
        self.remember(&message, before);
        drop(data);

        if let Err(e) = self.save_data_with_message(&message) {
            bail!("Failed to save: {}", e);
        }

        Ok(format!("Set {} owner(s) on {}", count, property_id))
    }

    /// **Delete property**: Remove a property or lot with its events.
    /// **Subdivisions**: Lot 1 cannot be deleted while other lots exist. Deleting the
    /// last other lot undoes the subdivision.
    #[tool]
    async fn delete_property(
        &self,
        /// Property or lot ID
        id: String,
    ) -> McpResult<String> {
        let mut data = self.data.lock().unwrap();
        let before = Snapshot::of(&data);
        let removed = match data.remove_property(&id) {
            Ok(p) => p,
            Err(e) => {
                drop(data);
                bail!("{}", e);
            }
        };
        let message = format!("Delete property {}", id);
        self.remember(&message, before);
        drop(data);

        if let Err(e) = self.save_data_with_message(&message) {
            bail!("Failed to save: {}", e);
        }

        Ok(format!("Deleted property {} ({})", removed.id, removed.name))
    }

    /// **Add event**: Record a dated event on a property.
    /// **Types**: purchase, sale, move_in, move_out, rent_start, rent_end, improvement,
    /// building_start, building_end, refinance, inherit, ownership_change, status_change,
    /// living_in_rental_start, living_in_rental_end, vacant_start, vacant_end, custom.
    /// **Companions**: move_in_on_same_day/purchase_as_vacant/purchase_as_rent/is_mixed_use
    /// create the matching events automatically.
    #[allow(clippy::too_many_arguments)]
    #[tool]
    async fn add_event(
        &self,
        /// Property ID
        property_id: String,
        /// Event type (see list above)
        event_type: String,
        /// Date, e.g. "15/01/2023"
        date: String,
        /// Title; defaults to the event type name (optional)
        title: Option<String>,
        /// Amount in dollars, e.g. price or improvement cost (optional)
        amount: Option<f64>,
        /// Description (optional)
        description: Option<String>,
        /// New status, required for status_change (optional)
        new_status: Option<String>,
        /// Moved in on the same day (optional)
        move_in_on_same_day: Option<bool>,
        /// Bought as vacant (optional)
        purchase_as_vacant: Option<bool>,
        /// Bought as a rental (optional)
        purchase_as_rent: Option<bool>,
        /// Mixed use; living+rental+business must total 100 (optional)
        is_mixed_use: Option<bool>,
        /// Mixed use: living percentage (optional)
        living_use_percentage: Option<f64>,
        /// Mixed use: rental percentage (optional)
        rental_use_percentage: Option<f64>,
        /// Mixed use: business percentage (optional)
        business_use_percentage: Option<f64>,
        /// Mixed use: move-in date if different from the event date (optional)
        mixed_use_move_in_date: Option<String>,
        /// Cost-base item IDs, e.g. "stamp_duty", "sale_agent_fees" (optional)
        cost_base_ids: Option<Vec<String>>,
        /// Cost-base amounts, same order as cost_base_ids (optional)
        cost_base_amounts: Option<Vec<f64>>,
        /// Division 43 capital works deductions claimed, for sale events (optional)
        division43_deductions: Option<f64>,
    ) -> McpResult<String> {
        let event_type = parse_event_type(&event_type)?;
        if event_type == EventType::subdivision {
            bail!("Use subdivide_property to create a subdivision");
        }
        let date = parse_date_arg(&date)?;
        if amount.is_some_and(|a| a < 0.0) || division43_deductions.is_some_and(|d| d < 0.0) {
            bail!("Amounts cannot be negative");
        }
        let new_status = new_status.as_deref().map(parse_status).transpose()?;
        if event_type == EventType::status_change && new_status.is_none() {
            bail!("status_change events require new_status");
        }
        let mixed_use_move_in_date = mixed_use_move_in_date
            .as_deref()
            .map(parse_date_arg)
            .transpose()?;

        let mut event = TimelineEvent::new(String::new(), property_id.clone(), event_type, date);
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            event.title = title.trim().to_string();
        }
        event.amount = amount;
        event.description = description;
        event.new_status = new_status;
        event.division43_deductions = division43_deductions;
        event.checkbox_state = Self::checkbox_state(
            None,
            move_in_on_same_day,
            purchase_as_vacant,
            purchase_as_rent,
            is_mixed_use,
        );
        event.mixed_use = Self::mixed_use(
            None,
            living_use_percentage,
            rental_use_percentage,
            business_use_percentage,
            mixed_use_move_in_date.map(Some),
        );

        let ids = cost_base_ids.unwrap_or_default();
        let amounts = cost_base_amounts.unwrap_or_default();
        if ids.len() != amounts.len() {
            bail!(
                "Got {} cost-base ID(s) but {} amount(s)",
                ids.len(),
                amounts.len()
            );
        }
        let applicable = definitions_for(event_type);
        if let Some(unknown) = ids
            .iter()
            .find(|id| !applicable.iter().any(|d| d.id == id.as_str()))
        {
            if applicable.is_empty() {
                bail!(
                    "Cost-base item '{}' does not apply: {} events take no cost-base items",
                    unknown,
                    event_type.label()
                );
            }
            let valid: Vec<&str> = applicable.iter().map(|d| d.id).collect();
            bail!(
                "Cost-base item '{}' does not apply to {} events. Valid items: {}",
                unknown,
                event_type.label(),
                valid.join(", ")
            );
        }
        if let Some(index) = amounts.iter().position(|a| *a < 0.0) {
            bail!("Cost-base amount for '{}' cannot be negative", ids[index]);
        }

        let mut data = self.data.lock().unwrap();
        let Some(property) = data.find_property(&property_id) else {
            bail!("Property '{}' not found", property_id);
        };
        let acquired_on = if property.is_lot() {
            property.subdivision_date
        } else {
            None
        };

        {
            let existing = data.events_for_property(&property_id);
            if let Err(rejection) = validate_event(&event, &existing, acquired_on) {
                bail!("{}", rejection.describe());
            }
        }

        let plan = match plan_companions(&data, &property_id, None, &CompanionSnapshot::of(&event))
        {
            Ok(plan) => plan,
            Err(e) => {
                drop(data);
                bail!("{}", e);
            }
        };

        let before = Snapshot::of(&data);
        let event_id = data.generate_event_id();
        event.cost_bases = ids
            .iter()
            .zip(amounts)
            .enumerate()
            .filter_map(|(index, (definition_id, cost))| {
                cost_base_item(format!("{}-cb{}", event_id, index + 1), definition_id, cost)
            })
            .collect();
        event.id = event_id.clone();
        Self::sync_property_dates(&mut data, &event);
        data.add_event(event.clone());
        let outcome = data.apply_companion_plan(&plan);
        let message = format!("Add event {}", event_id);
        self.remember(&message, before);
        drop(data);

        if let Err(e) = self.save_data_with_message(&message) {
            bail!("Failed to save: {}", e);
        }

        Ok(format!(
            "Event created with ID: {} ({} on {}){}",
            event_id,
            event.title,
            format_date_display(event.date),
            Self::describe_companions(&outcome.created, &outcome.removed)
        ))
    }

    /// **Update event**: Change an event's details.
    /// **Companions**: Changing a companion checkbox creates or removes the matching event;
    /// moving the date moves the companions with it.
    #[allow(clippy::too_many_arguments)]
    #[tool]
    async fn update_event(
        &self,
        /// Event ID
        id: String,
        /// New date (optional)
        date: Option<String>,
        /// New title (optional)
        title: Option<String>,
        /// New amount in dollars (optional)
        amount: Option<f64>,
        /// New description, ""=clear (optional)
        description: Option<String>,
        /// New status for status_change events (optional)
        new_status: Option<String>,
        /// Moved in on the same day (optional)
        move_in_on_same_day: Option<bool>,
        /// Bought as vacant (optional)
        purchase_as_vacant: Option<bool>,
        /// Bought as a rental (optional)
        purchase_as_rent: Option<bool>,
        /// Mixed use (optional)
        is_mixed_use: Option<bool>,
        /// Mixed use: living percentage (optional)
        living_use_percentage: Option<f64>,
        /// Mixed use: rental percentage (optional)
        rental_use_percentage: Option<f64>,
        /// Mixed use: business percentage (optional)
        business_use_percentage: Option<f64>,
        /// Mixed use: move-in date, ""=clear (optional)
        mixed_use_move_in_date: Option<String>,
        /// Division 43 deductions (optional)
        division43_deductions: Option<f64>,
    ) -> McpResult<String> {
        let date = date.as_deref().map(parse_date_arg).transpose()?;
        if amount.is_some_and(|a| a < 0.0) || division43_deductions.is_some_and(|d| d < 0.0) {
            bail!("Amounts cannot be negative");
        }
        let new_status = new_status.as_deref().map(parse_status).transpose()?;
        let mixed_use_move_in_date = parse_optional_date_arg(mixed_use_move_in_date.as_deref())?;

        let mut data = self.data.lock().unwrap();
        let Some(original) = data.find_event(&id).cloned() else {
            drop(data);
            bail!("{}", TimelineError::EventNotFound(id));
        };
        if original.event_type == EventType::subdivision && date.is_some() {
            drop(data);
            bail!("Subdivision dates cannot be moved; delete the lots and subdivide again");
        }

        let mut edited = original.clone();
        if let Some(date) = date {
            edited.date = date;
        }
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            edited.title = title.trim().to_string();
        }
        if amount.is_some() {
            edited.amount = amount;
        }
        if let Some(description) = description {
            edited.description = Some(description).filter(|d| !d.is_empty());
        }
        if new_status.is_some() {
            edited.new_status = new_status;
        }
        if division43_deductions.is_some() {
            edited.division43_deductions = division43_deductions;
        }
        edited.checkbox_state = Self::checkbox_state(
            original.checkbox_state,
            move_in_on_same_day,
            purchase_as_vacant,
            purchase_as_rent,
            is_mixed_use,
        );
        edited.mixed_use = Self::mixed_use(
            original.mixed_use,
            living_use_percentage,
            rental_use_percentage,
            business_use_percentage,
            mixed_use_move_in_date,
        );

        let acquired_on = data
            .find_property(&original.property_id)
            .filter(|p| p.is_lot())
            .and_then(|p| p.subdivision_date);
        {
            let others: Vec<&TimelineEvent> = data
                .events_for_property(&original.property_id)
                .into_iter()
                .filter(|e| e.id != id)
                .collect();
            if let Err(rejection) = validate_event(&edited, &others, acquired_on) {
                bail!("{}", rejection.describe());
            }
        }

        let previous = CompanionSnapshot::of(&original);
        let plan = match plan_companions(
            &data,
            &original.property_id,
            Some(&previous),
            &CompanionSnapshot::of(&edited),
        ) {
            Ok(plan) => plan,
            Err(e) => {
                drop(data);
                bail!("{}", e);
            }
        };

        let before = Snapshot::of(&data);
        Self::sync_property_dates(&mut data, &edited);
        data.update_event(&id, |event| *event = edited);
        let outcome = data.apply_companion_plan(&plan);
        let message = format!("Update event {}", id);
        self.remember(&message, before);
        drop(data);

        if let Err(e) = self.save_data_with_message(&message) {
            bail!("Failed to save: {}", e);
        }

        Ok(format!(
            "Event {} updated{}",
            id,
            Self::describe_companions(&outcome.created, &outcome.removed)
        ))
    }

    /// **Delete event**: Remove an event and the companions its checkboxes created.
    /// **Subdivisions**: Delete the lots instead; removing the last extra lot undoes it.
    #[tool]
    async fn delete_event(
        &self,
        /// Event ID
        id: String,
    ) -> McpResult<String> {
        let mut data = self.data.lock().unwrap();
        let Some(event) = data.find_event(&id).cloned() else {
            drop(data);
            bail!("{}", TimelineError::EventNotFound(id));
        };
        if event.event_type == EventType::subdivision {
            drop(data);
            bail!(
                "Event '{}' is a subdivision. Delete its lots (other than Lot 1) to undo it.",
                id
            );
        }

        let cleared = CompanionSnapshot {
            flags: CheckboxState::default(),
            date: Some(event.date),
            mixed_use: None,
        };
        let plan = match plan_companions(
            &data,
            &event.property_id,
            Some(&CompanionSnapshot::of(&event)),
            &cleared,
        ) {
            Ok(plan) => plan,
            Err(e) => {
                drop(data);
                bail!("{}", e);
            }
        };
        let before = Snapshot::of(&data);
        data.remove_event(&id);
        let outcome = data.apply_companion_plan(&plan);
        let message = format!("Delete event {}", id);
        self.remember(&message, before);
        drop(data);

        if let Err(e) = self.save_data_with_message(&message) {
            bail!("Failed to save: {}", e);
        }

        Ok(format!(
            "Deleted event {} ({}){}",
            id,
            event.title,
            Self::describe_companions(&outcome.created, &outcome.removed)
        ))
    }

    /// **Subdivide**: Split a property into at least 2 lots on a date.
    /// **Lots**: Lot 1 continues the parent's timeline; the rest branch off.
    /// **Allocation**: by_lot_size (default) splits the purchase price by area; manual
    /// uses percentages set later with edit_lots.
    #[allow(clippy::too_many_arguments)]
    #[tool]
    async fn subdivide_property(
        &self,
        /// Property ID to subdivide
        property_id: String,
        /// Subdivision date, e.g. "01/07/2018"
        date: String,
        /// Lot names, e.g. ["Lot 1", "Lot 2"]
        lot_names: Vec<String>,
        /// Lot sizes, same order as lot_names
        lot_sizes: Vec<f64>,
        /// Unit for lot_sizes: sqm (default), hectares, acres (optional)
        area_unit: Option<String>,
        /// Surveyor fees (optional)
        surveyor_fees: Option<f64>,
        /// Planning/council fees (optional)
        planning_fees: Option<f64>,
        /// Legal fees (optional)
        legal_fees: Option<f64>,
        /// Title registration fees (optional)
        title_fees: Option<f64>,
        /// by_lot_size or manual (optional)
        allocation_method: Option<String>,
        /// Land value, when splitting land and building (optional)
        land_value: Option<f64>,
        /// Building value, assigned to Lot 1 (optional)
        building_value: Option<f64>,
    ) -> McpResult<String> {
        let date = parse_date_arg(&date)?;
        let unit = Self::area_unit(area_unit.as_deref())?;
        let allocation_method = allocation_method
            .as_deref()
            .map(parse_allocation_method)
            .transpose()?
            .unwrap_or_default();
        if lot_names.len() != lot_sizes.len() {
            bail!(
                "Got {} lot name(s) but {} lot size(s)",
                lot_names.len(),
                lot_sizes.len()
            );
        }

        let lots = lot_names
            .into_iter()
            .zip(lot_sizes)
            .map(|(name, size)| timeline::LotSpec {
                name,
                address: None,
                lot_size: unit.to_sqm(size),
            })
            .collect();
        let mut request = timeline::SubdivisionRequest::new(property_id.clone(), date, lots);
        request.surveyor_fees = surveyor_fees.unwrap_or(0.0);
        request.planning_fees = planning_fees.unwrap_or(0.0);
        request.legal_fees = legal_fees.unwrap_or(0.0);
        request.title_fees = title_fees.unwrap_or(0.0);
        request.allocation_method = allocation_method;
        if land_value.is_some() || building_value.is_some() {
            request.cost_breakdown = Some(timeline::CostBreakdown {
                land_value: land_value.unwrap_or(0.0),
                building_value: building_value.unwrap_or(0.0),
            });
        }

        let mut data = self.data.lock().unwrap();
        let before = Snapshot::of(&data);
        let group = match data.subdivide(request) {
            Ok(group) => group,
            Err(e) => {
                drop(data);
                bail!("{}", e);
            }
        };
        let mut result = format!(
            "Subdivision created with ID: {} (property {})\n",
            group, property_id
        );
        for lot in data.lots_in_group(&group) {
            result.push_str(&format!(
                "  - [{}] {} {:.2}%{}\n",
                lot.id,
                lot.name,
                lot.allocation_percentage.unwrap_or(0.0),
                if lot.is_main_lot_continuation {
                    " (main lot)"
                } else {
                    ""
                }
            ));
        }
        let message = format!("Subdivide property {}", property_id);
        self.remember(&message, before);
        drop(data);

        if let Err(e) = self.save_data_with_message(&message) {
            bail!("Failed to save: {}", e);
        }

        Ok(result)
    }

    /// **Edit lots**: Change lot sizes, percentages and locks of one subdivision at once.
    /// **Rules**: Locked percentages are kept; unlocked lots share the rest by size. With
    /// locks or manual allocation the lots must total 100%.
    #[allow(clippy::too_many_arguments)]
    #[tool]
    async fn edit_lots(
        &self,
        /// Subdivision ID (the subdivision event ID)
        subdivision_id: String,
        /// Lot IDs to edit
        lot_ids: Vec<String>,
        /// New lot sizes, same order as lot_ids (optional)
        lot_sizes: Option<Vec<f64>>,
        /// Unit for lot_sizes: sqm (default), hectares, acres (optional)
        area_unit: Option<String>,
        /// New allocation percentages, same order as lot_ids (optional)
        percentages: Option<Vec<f64>>,
        /// Lock flags, same order as lot_ids (optional)
        locked: Option<Vec<bool>>,
    ) -> McpResult<String> {
        let unit = Self::area_unit(area_unit.as_deref())?;
        let count = lot_ids.len();
        let lengths_ok = lot_sizes.as_ref().is_none_or(|v| v.len() == count)
            && percentages.as_ref().is_none_or(|v| v.len() == count)
            && locked.as_ref().is_none_or(|v| v.len() == count);
        if !lengths_ok {
            bail!("lot_sizes, percentages and locked must each have one entry per lot ID");
        }

        let mut edits: HashMap<String, LotEdit> = HashMap::new();
        for (i, lot_id) in lot_ids.iter().enumerate() {
            edits.insert(
                lot_id.clone(),
                LotEdit {
                    lot_size: lot_sizes.as_ref().map(|v| unit.to_sqm(v[i])),
                    allocation_percentage: percentages.as_ref().map(|v| v[i]),
                    is_percentage_locked: locked.as_ref().map(|v| v[i]),
                },
            );
        }

        let mut data = self.data.lock().unwrap();
        let before = Snapshot::of(&data);
        if let Err(e) = data.apply_lot_edits(&subdivision_id, &edits) {
            drop(data);
            bail!("{}", e);
        }
        let mut result = format!("Updated {} lot(s) in {}\n", count, subdivision_id);
        for lot in data.lots_in_group(&subdivision_id) {
            result.push_str(&format!(
                "  - [{}] {} {:.2}%{}\n",
                lot.id,
                lot.name,
                lot.allocation_percentage.unwrap_or(0.0),
                if lot.is_percentage_locked {
                    " (locked)"
                } else {
                    ""
                }
            ));
        }
        let message = format!("Edit lots of {}", subdivision_id);
        self.remember(&message, before);
        drop(data);

        if let Err(e) = self.save_data_with_message(&message) {
            bail!("Failed to save: {}", e);
        }

        Ok(result)
    }

    /// **Lot cost base**: Show how a lot's cost base is allocated from its parent.
    #[tool]
    async fn lot_cost_base(
        &self,
        /// Lot ID
        lot_id: String,
    ) -> McpResult<String> {
        let data = self.data.lock().unwrap();
        let Some(lot) = data.find_property(&lot_id).filter(|p| p.is_lot()) else {
            bail!("'{}' is not a subdivided lot", lot_id);
        };
        let Some(parent) = data.parent_of(lot) else {
            bail!("Parent of lot '{}' not found", lot_id);
        };
        let Some(purchase_price) = parent.purchase_price else {
            bail!(
                "Parent property '{}' has no purchase price; set it with update_property or a purchase event",
                parent.id
            );
        };
        let details = lot
            .subdivision_group
            .as_deref()
            .and_then(|group| data.subdivision_event_for_group(group))
            .and_then(|e| e.subdivision_details.as_ref());

        let siblings = sibling_lots(lot, data.properties(), &HashMap::new());
        let Some(allocation) = allocate_lots(&siblings, purchase_price, details)
            .into_iter()
            .find(|a| a.lot_id == lot_id)
        else {
            bail!("Lot '{}' has no allocation", lot_id);
        };
        let result = format!(
            "Lot {} ({}):\n  Share: {:.2}% of {}\n  Price share: {}\n  Subdivision fee share: {}\n  Cost base: {}\n",
            lot.id,
            lot.name,
            allocation.percentage,
            format_currency(purchase_price),
            format_currency(allocation.price_share),
            format_currency(allocation.fee_share),
            format_currency(allocation.cost_base())
        );
        Ok(result)
    }

    /// **Toggle subdivision**: Collapse or expand the lot branches of a subdivision.
    #[tool]
    async fn toggle_subdivision(
        &self,
        /// Subdivision ID (the subdivision event ID)
        subdivision_id: String,
    ) -> McpResult<String> {
        let mut data = self.data.lock().unwrap();
        if data.lots_in_group(&subdivision_id).is_empty() {
            drop(data);
            bail!("Subdivision '{}' not found", subdivision_id);
        }
        let collapsed = data.toggle_subdivision(&subdivision_id);
        drop(data);

        let state = if collapsed { "collapsed" } else { "expanded" };
        if let Err(e) =
            self.save_data_with_message(&format!("Subdivision {} {}", subdivision_id, state))
        {
            bail!("Failed to save: {}", e);
        }

        Ok(format!("Subdivision {} {}", subdivision_id, state))
    }

    /// **Layout**: Branch rows for visible properties and split markers for subdivisions.
    #[tool]
    async fn layout(&self) -> McpResult<String> {
        let data = self.data.lock().unwrap();
        let visible = data.visible_properties();
        let positions = calculate_branch_positions(&visible);
        let range = data.timeline_range();
        let connections = calculate_subdivision_connections(
            data.properties(),
            &positions,
            data.events(),
            |date| range.position_of(date),
        );
        drop(data);

        Ok(format!(
            "Timeline {} to {}\n{}",
            range.start,
            range.end,
            format_layout(&positions, &connections)
        ))
    }

    /// **List**: Show properties with their events and status periods.
    #[tool]
    async fn list(
        &self,
        /// Only this property (optional)
        property_id: Option<String>,
        /// Unit for lot sizes: sqm (default), hectares, acres (optional)
        area_unit: Option<String>,
    ) -> McpResult<String> {
        let unit = Self::area_unit(area_unit.as_deref())?;
        let data = self.data.lock().unwrap();

        let properties: Vec<&Property> = match property_id.as_deref() {
            Some(id) => match data.find_property(id) {
                Some(p) => vec![p],
                None => bail!("Property '{}' not found", id),
            },
            None => data.properties().iter().collect(),
        };
        if properties.is_empty() {
            return Ok("No properties found".to_string());
        }

        let mut result = format!("Found {} property(ies):\n\n", properties.len());
        for property in properties {
            result.push_str(&format_property(property, unit));
            let events = data.events_for_property(&property.id);
            if !events.is_empty() {
                result.push_str("  Events:\n");
                result.push_str(&format_events(&events));
                let periods = calculate_status_periods(events.iter().copied());
                if !periods.is_empty() {
                    result.push_str("  Status periods:\n");
                    result.push_str(&format_status_periods(&periods));
                }
            }
        }

        Ok(result)
    }

    /// **Cost base summary**: Acquisition cost, incidental, improvement and selling
    /// costs, total cost base and capital gain for a property or lot.
    #[tool]
    async fn cost_base_summary(
        &self,
        /// Property or lot ID
        property_id: String,
    ) -> McpResult<String> {
        let data = self.data.lock().unwrap();
        let Some(summary) = data.cost_base_summary(&property_id) else {
            bail!("Property '{}' not found", property_id);
        };
        drop(data);

        Ok(format_cost_base_summary(&summary))
    }

    /// **Undo**: Revert the most recent change to properties, events or lots.
    /// Collapsing a subdivision is not a change and is not undone.
    #[tool]
    async fn undo(&self) -> McpResult<String> {
        let mut data = self.data.lock().unwrap();
        let undone = self.history.lock().unwrap().undo(&mut data);
        drop(data);
        let Some(action) = undone else {
            bail!("Nothing to undo");
        };

        if let Err(e) = self.save_data_with_message(&format!("Undo: {}", action)) {
            bail!("Failed to save: {}", e);
        }

        Ok(format!("Undone: {}", action))
    }

    /// **Redo**: Re-apply the change most recently undone.
    /// Any new change after an undo clears what can be redone.
    #[tool]
    async fn redo(&self) -> McpResult<String> {
        let mut data = self.data.lock().unwrap();
        let redone = self.history.lock().unwrap().redo(&mut data);
        drop(data);
        let Some(action) = redone else {
            bail!("Nothing to redo");
        };

        if let Err(e) = self.save_data_with_message(&format!("Redo: {}", action)) {
            bail!("Failed to save: {}", e);
        }

        Ok(format!("Redone: {}", action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::extract_id_from_response;
    use tempfile::NamedTempFile;

    fn get_test_handler() -> (CgtTimelineHandler, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let handler = CgtTimelineHandler::new(temp_file.path().to_str().unwrap(), false).unwrap();
        (handler, temp_file)
    }

    async fn add_property(handler: &CgtTimelineHandler, name: &str, price: Option<f64>) -> String {
        let result = handler
            .add_property(name.to_string(), format!("{} St", name), price, None, None)
            .await
            .unwrap();
        extract_id_from_response(&result)
    }

    async fn add_simple_event(
        handler: &CgtTimelineHandler,
        property_id: &str,
        event_type: &str,
        date: &str,
    ) -> McpResult<String> {
        handler
            .add_event(
                property_id.to_string(),
                event_type.to_string(),
                date.to_string(),
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
            )
            .await
    }

    async fn add_purchase_with_flags(
        handler: &CgtTimelineHandler,
        property_id: &str,
        date: &str,
        move_in: bool,
        vacant: bool,
    ) -> String {
        let result = handler
            .add_event(
                property_id.to_string(),
                "purchase".to_string(),
                date.to_string(),
                None,
                Some(500_000.0),
                None,
                None,
                Some(move_in),
                Some(vacant),
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
            )
            .await
            .unwrap();
        extract_id_from_response(&result)
    }

    async fn add_purchase_with_costs(
        handler: &CgtTimelineHandler,
        property_id: &str,
        ids: &[&str],
        amounts: Vec<f64>,
    ) -> McpResult<String> {
        handler
            .add_event(
                property_id.to_string(),
                "purchase".to_string(),
                "01/02/2012".to_string(),
                None,
                Some(400_000.0),
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                Some(ids.iter().map(|s| s.to_string()).collect()),
                Some(amounts),
                None,
            )
            .await
    }

    fn count_events(handler: &CgtTimelineHandler, event_type: EventType) -> usize {
        let data = handler.data.lock().unwrap();
        data.events()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    #[test]
    fn test_custom_file_path() {
        let temp_file = NamedTempFile::new().unwrap();
        let custom_path = temp_file.path().to_str().unwrap();

        let handler = CgtTimelineHandler::new(custom_path, false).unwrap();
        assert_eq!(handler.storage.file_path(), temp_file.path());

        let mut data = handler.data.lock().unwrap();
        data.add_property(Property::new("prop-9", "Cottage", "9 Hill Rd"))
            .unwrap();
        drop(data);
        assert!(handler.save_data_with_message("Add cottage").is_ok());

        let handler2 = CgtTimelineHandler::new(custom_path, false).unwrap();
        let loaded = handler2.data.lock().unwrap();
        assert_eq!(loaded.find_property("prop-9").unwrap().name, "Cottage");
    }

    #[tokio::test]
    async fn test_add_property_and_list() {
        let (handler, _temp_file) = get_test_handler();
        let id = add_property(&handler, "Home", Some(500_000.0)).await;
        assert_eq!(id, "prop-1");

        let list = handler.list(None, None).await.unwrap();
        assert!(list.contains("[prop-1] Home"));
        assert!(list.contains("$500,000.00"));
    }

    #[tokio::test]
    async fn test_add_property_rejects_bad_date() {
        let (handler, _temp_file) = get_test_handler();
        let result = handler
            .add_property(
                "Home".to_string(),
                "1 Main St".to_string(),
                None,
                Some("31/02/2020".to_string()),
                None,
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_event_requires_purchase() {
        let (handler, _temp_file) = get_test_handler();
        let id = add_property(&handler, "Home", None).await;
        let result = add_simple_event(&handler, &id, "sale", "01/01/2020").await;
        assert!(result.is_err());
        assert_eq!(count_events(&handler, EventType::sale), 0);
    }

    #[tokio::test]
    async fn test_purchase_creates_companion_once() {
        let (handler, _temp_file) = get_test_handler();
        let id = add_property(&handler, "Home", None).await;
        let purchase = add_purchase_with_flags(&handler, &id, "14/03/2015", true, false).await;
        assert_eq!(count_events(&handler, EventType::move_in), 1);

        // Saving the same flags again must not duplicate the move-in
        handler
            .update_event(
                purchase.clone(),
                None,
                None,
                None,
                None,
                None,
                Some(true),
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(count_events(&handler, EventType::move_in), 1);

        let data = handler.data.lock().unwrap();
        assert_eq!(data.find_property(&id).unwrap().purchase_price, Some(500_000.0));
    }

    #[tokio::test]
    async fn test_untick_removes_companion() {
        let (handler, _temp_file) = get_test_handler();
        let id = add_property(&handler, "Home", None).await;
        let purchase = add_purchase_with_flags(&handler, &id, "14/03/2015", false, true).await;
        assert_eq!(count_events(&handler, EventType::status_change), 1);

        let result = handler
            .update_event(
                purchase, None, None, None, None, None, None, Some(false), None, None, None,
                None, None, None, None,
            )
            .await
            .unwrap();
        assert!(result.contains("Companion removed"));
        assert_eq!(count_events(&handler, EventType::status_change), 0);
    }

    #[tokio::test]
    async fn test_mixed_use_must_total_100() {
        let (handler, _temp_file) = get_test_handler();
        let id = add_property(&handler, "Home", None).await;
        let result = handler
            .add_event(
                id,
                "purchase".to_string(),
                "01/07/2016".to_string(),
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                Some(true),
                Some(50.0),
                Some(30.0),
                Some(10.0),
                None,
                None,
                None,
                None,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(count_events(&handler, EventType::purchase), 0);
    }

    #[tokio::test]
    async fn test_subdivide_and_lot_cost_base() {
        let (handler, _temp_file) = get_test_handler();
        let id = add_property(&handler, "Farm", Some(500_000.0)).await;
        let result = handler
            .subdivide_property(
                id.clone(),
                "01/07/2018".to_string(),
                vec!["Lot 1".to_string(), "Lot 2".to_string()],
                vec![600.0, 400.0],
                None,
                Some(10_000.0),
                None,
                None,
                None,
                None,
                None,
                None,
            )
            .await
            .unwrap();
        let group = extract_id_from_response(&result);

        let lot2 = {
            let data = handler.data.lock().unwrap();
            let lots = data.lots_in_group(&group);
            assert_eq!(lots.len(), 2);
            lots[1].id.clone()
        };
        let text = handler.lot_cost_base(lot2.clone()).await.unwrap();
        assert!(text.contains("Cost base: $205,000.00"));

        let summary = handler.cost_base_summary(lot2).await.unwrap();
        assert!(summary.contains("Acquisition: $205,000.00"));
    }

    #[tokio::test]
    async fn test_edit_lots_rejects_bad_locked_total() {
        let (handler, _temp_file) = get_test_handler();
        let id = add_property(&handler, "Farm", Some(500_000.0)).await;
        let result = handler
            .subdivide_property(
                id,
                "01/07/2018".to_string(),
                vec!["Lot 1".to_string(), "Lot 2".to_string()],
                vec![600.0, 400.0],
                None,
                None,
                None,
                None,
                None,
                Some("manual".to_string()),
                None,
                None,
            )
            .await
            .unwrap();
        let group = extract_id_from_response(&result);
        let lot_ids: Vec<String> = {
            let data = handler.data.lock().unwrap();
            data.lots_in_group(&group).iter().map(|l| l.id.clone()).collect()
        };

        let bad = handler
            .edit_lots(
                group.clone(),
                lot_ids.clone(),
                None,
                None,
                Some(vec![70.0, 20.0]),
                Some(vec![true, true]),
            )
            .await;
        assert!(bad.is_err());

        let good = handler
            .edit_lots(
                group,
                lot_ids.clone(),
                None,
                None,
                Some(vec![70.0, 30.0]),
                Some(vec![true, true]),
            )
            .await
            .unwrap();
        assert!(good.contains("70.00% (locked)"));

        let text = handler.lot_cost_base(lot_ids[0].clone()).await.unwrap();
        assert!(text.contains("Cost base: $350,000.00"));
    }

    #[tokio::test]
    async fn test_delete_main_lot_refused_then_revert() {
        let (handler, _temp_file) = get_test_handler();
        let id = add_property(&handler, "Farm", Some(500_000.0)).await;
        let result = handler
            .subdivide_property(
                id.clone(),
                "01/07/2018".to_string(),
                vec!["Lot 1".to_string(), "Lot 2".to_string()],
                vec![600.0, 400.0],
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
            )
            .await
            .unwrap();
        let group = extract_id_from_response(&result);
        let (main, other) = {
            let data = handler.data.lock().unwrap();
            let lots = data.lots_in_group(&group);
            (lots[0].id.clone(), lots[1].id.clone())
        };

        assert!(handler.delete_property(main).await.is_err());
        handler.delete_property(other).await.unwrap();

        let data = handler.data.lock().unwrap();
        assert!(data.lots_in_group(&group).is_empty());
        assert!(data.find_event(&group).is_none());
        assert_eq!(data.properties().len(), 1);
    }

    #[tokio::test]
    async fn test_layout_lists_branches() {
        let (handler, _temp_file) = get_test_handler();
        let id = add_property(&handler, "Farm", Some(500_000.0)).await;
        add_simple_event(&handler, &id, "purchase", "01/01/2010")
            .await
            .unwrap();
        let result = handler
            .subdivide_property(
                id.clone(),
                "01/07/2018".to_string(),
                vec!["Lot 1".to_string(), "Lot 2".to_string(), "Lot 3".to_string()],
                vec![500.0, 300.0, 200.0],
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
            )
            .await
            .unwrap();
        let group = extract_id_from_response(&result);

        let layout = handler.layout().await.unwrap();
        assert!(layout.contains("Branches (3)"));
        assert!(layout.contains("Connections (2)"));

        handler.toggle_subdivision(group).await.unwrap();
        let layout = handler.layout().await.unwrap();
        assert!(layout.contains("Branches (1)"));
    }

    #[tokio::test]
    async fn test_cost_base_items_feed_summary() {
        let (handler, _temp_file) = get_test_handler();
        let id = add_property(&handler, "Home", None).await;
        assert!(
            add_purchase_with_costs(&handler, &id, &["gold_plating"], vec![1.0])
                .await
                .is_err()
        );
        assert_eq!(count_events(&handler, EventType::purchase), 0);

        add_purchase_with_costs(
            &handler,
            &id,
            &["stamp_duty", "purchase_legal_fees"],
            vec![15_000.0, 2_000.0],
        )
        .await
        .unwrap();
        let summary = handler.cost_base_summary(id).await.unwrap();
        assert!(summary.contains("Purchase costs: $17,000.00"));
        assert!(summary.contains("Total cost base: $417,000.00"));
    }

    #[tokio::test]
    async fn test_negative_amounts_rejected() {
        let (handler, _temp_file) = get_test_handler();
        let id = add_property(&handler, "Home", None).await;
        let result = add_purchase_with_costs(&handler, &id, &["stamp_duty"], vec![-25_000.0]).await;
        assert!(result.is_err());
        assert_eq!(count_events(&handler, EventType::purchase), 0);

        let result = add_purchase_with_costs(&handler, &id, &["stamp_duty"], vec![25_000.0])
            .await
            .unwrap();
        assert!(result.contains("Wednesday, 1 February 2012"));
        let purchase = extract_id_from_response(&result);
        let edit = handler
            .update_event(
                purchase,
                None,
                None,
                Some(-400_000.0),
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
            )
            .await;
        assert!(edit.is_err());

        let data = handler.data.lock().unwrap();
        let summary = data.cost_base_summary(&id).unwrap();
        assert_eq!(summary.acquisition_cost, 400_000.0);
        assert_eq!(summary.purchase_costs, 25_000.0);
    }

    #[tokio::test]
    async fn test_cost_base_items_must_suit_event_type() {
        let (handler, _temp_file) = get_test_handler();
        let id = add_property(&handler, "Home", None).await;
        let result =
            add_purchase_with_costs(&handler, &id, &["sale_agent_fees"], vec![12_000.0]).await;
        assert!(result.is_err());
        assert_eq!(count_events(&handler, EventType::purchase), 0);
    }

    #[tokio::test]
    async fn test_undo_and_redo_subdivision() {
        let (handler, temp_file) = get_test_handler();
        assert!(handler.undo().await.is_err());

        let id = add_property(&handler, "Farm", Some(500_000.0)).await;
        handler
            .subdivide_property(
                id.clone(),
                "01/07/2018".to_string(),
                vec!["Lot 1".to_string(), "Lot 2".to_string()],
                vec![600.0, 400.0],
                None,
                None,
                None,
                None,
                None,
                None,
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(handler.data.lock().unwrap().properties().len(), 3);

        let result = handler.undo().await.unwrap();
        assert!(result.contains("Subdivide property prop-1"));
        assert_eq!(count_events(&handler, EventType::subdivision), 0);
        {
            let data = handler.data.lock().unwrap();
            assert_eq!(data.properties().len(), 1);
            assert_ne!(
                data.find_property(&id).unwrap().current_status,
                Some(PropertyStatus::subdivided)
            );
        }

        // The undo is saved like any other change
        let reloaded =
            CgtTimelineHandler::new(temp_file.path().to_str().unwrap(), false).unwrap();
        assert_eq!(reloaded.data.lock().unwrap().properties().len(), 1);

        handler.redo().await.unwrap();
        assert_eq!(handler.data.lock().unwrap().properties().len(), 3);
        assert_eq!(count_events(&handler, EventType::subdivision), 1);
        assert!(handler.redo().await.is_err());
    }

    #[tokio::test]
    async fn test_undo_event_with_companion() {
        let (handler, _temp_file) = get_test_handler();
        let id = add_property(&handler, "Home", None).await;
        add_purchase_with_flags(&handler, &id, "14/03/2015", true, false).await;
        assert_eq!(count_events(&handler, EventType::move_in), 1);

        handler.undo().await.unwrap();
        assert_eq!(count_events(&handler, EventType::purchase), 0);
        assert_eq!(count_events(&handler, EventType::move_in), 0);
        assert_eq!(
            handler.data.lock().unwrap().find_property(&id).unwrap().purchase_price,
            None
        );

        handler.redo().await.unwrap();
        assert_eq!(count_events(&handler, EventType::purchase), 1);
        assert_eq!(count_events(&handler, EventType::move_in), 1);

        // A new change after an undo drops the redo
        handler.undo().await.unwrap();
        add_purchase_with_flags(&handler, &id, "14/03/2015", false, true).await;
        assert!(handler.redo().await.is_err());
        assert_eq!(count_events(&handler, EventType::move_in), 0);
        assert_eq!(count_events(&handler, EventType::status_change), 1);
    }

    #[tokio::test]
    async fn test_set_owners_must_total_100() {
        let (handler, _temp_file) = get_test_handler();
        let id = add_property(&handler, "Home", None).await;
        let bad = handler
            .set_owners(
                id.clone(),
                vec!["Alex".to_string(), "Sam".to_string()],
                vec![50.0, 40.0],
            )
            .await;
        assert!(bad.is_err());
        handler
            .set_owners(id, vec!["Alex".to_string(), "Sam".to_string()], vec![50.0, 50.0])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_event_removes_its_companions() {
        let (handler, _temp_file) = get_test_handler();
        let id = add_property(&handler, "Home", None).await;
        let purchase = add_purchase_with_flags(&handler, &id, "14/03/2015", true, false).await;
        assert_eq!(count_events(&handler, EventType::move_in), 1);

        handler.delete_event(purchase).await.unwrap();
        assert_eq!(count_events(&handler, EventType::move_in), 0);
        assert_eq!(count_events(&handler, EventType::purchase), 0);
    }
}
