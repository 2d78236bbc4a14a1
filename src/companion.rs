//! Companion event synchronisation
//!
//! Some event forms carry compound intents such as "moved in on the same
//! day" or "bought as a rental". Each ticked box stands for a companion
//! event (a `move_in`, a `rent_start`, a vacant `status_change`) that has to
//! exist next to the primary event.
//!
//! Synchronisation compares the flags captured when the edit session opened
//! with the flags being saved:
//! - unset → set creates the companion unless one already exists on that
//!   property, type and calendar day
//! - set → unset deletes the companion, but only because the snapshot had
//!   the flag set, so companions created some other way are left alone
//! - unchanged flags do nothing
//!
//! Planning is pure and validates first; only [`TimelineData::apply_companion_plan`]
//! mutates.

use crate::error::{TimelineError, TimelineResult};
use crate::timeline::{CheckboxState, EventType, MixedUse, PropertyStatus, TimelineData, TimelineEvent};
use chrono::NaiveDate;
use tracing::debug;

/// Tolerance for the mixed-use total, which only absorbs float noise
const MIXED_USE_TOLERANCE: f64 = 1e-6;

/// Which checkbox a companion belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompanionKind {
    MoveInSameDay,
    PurchaseAsVacant,
    PurchaseAsRent,
    MixedUseMoveIn,
    MixedUseRental,
}

impl CompanionKind {
    const ALL: [CompanionKind; 5] = [
        CompanionKind::MoveInSameDay,
        CompanionKind::PurchaseAsVacant,
        CompanionKind::PurchaseAsRent,
        CompanionKind::MixedUseMoveIn,
        CompanionKind::MixedUseRental,
    ];
}

/// A companion event that should exist
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompanionSpec {
    pub kind: CompanionKind,
    pub event_type: EventType,
    pub date: NaiveDate,
    /// Required status for `status_change` companions
    pub new_status: Option<PropertyStatus>,
}

impl CompanionSpec {
    fn matches(&self, event: &TimelineEvent) -> bool {
        event.event_type == self.event_type
            && event.date == self.date
            && (self.new_status.is_none() || event.new_status == self.new_status)
    }

    fn same_target(&self, other: &CompanionSpec) -> bool {
        self.event_type == other.event_type
            && self.date == other.date
            && self.new_status == other.new_status
    }

    fn title(&self) -> String {
        match self.new_status {
            Some(PropertyStatus::vacant) => "Status: Vacant".to_string(),
            Some(status) => format!("Status: {:?}", status),
            None => self.event_type.label().to_string(),
        }
    }
}

/// The flags of a primary event at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CompanionSnapshot {
    pub flags: CheckboxState,
    /// Date of the primary event
    pub date: Option<NaiveDate>,
    pub mixed_use: Option<MixedUse>,
}

impl CompanionSnapshot {
    /// Capture a stored event's flags at the start of an edit session
    pub fn of(event: &TimelineEvent) -> Self {
        Self {
            flags: event.checkbox_state.unwrap_or_default(),
            date: Some(event.date),
            mixed_use: event.mixed_use,
        }
    }

    /// Companions these flags call for, one per active checkbox
    pub fn wanted(&self) -> Vec<CompanionSpec> {
        let Some(date) = self.date else {
            return Vec::new();
        };
        let mixed = self.mixed_use.unwrap_or_default();
        let mut specs = Vec::new();

        for kind in CompanionKind::ALL {
            let spec = match kind {
                CompanionKind::MoveInSameDay if self.flags.move_in_on_same_day => {
                    Some((EventType::move_in, date, None))
                }
                CompanionKind::PurchaseAsVacant if self.flags.purchase_as_vacant => Some((
                    EventType::status_change,
                    date,
                    Some(PropertyStatus::vacant),
                )),
                CompanionKind::PurchaseAsRent if self.flags.purchase_as_rent => {
                    Some((EventType::rent_start, date, None))
                }
                CompanionKind::MixedUseMoveIn
                    if self.flags.is_mixed_use && mixed.living_use_percentage > 0.0 =>
                {
                    Some((EventType::move_in, mixed.move_in_date.unwrap_or(date), None))
                }
                CompanionKind::MixedUseRental
                    if self.flags.is_mixed_use && mixed.rental_use_percentage > 0.0 =>
                {
                    Some((EventType::rent_start, date, None))
                }
                _ => None,
            };
            if let Some((event_type, date, new_status)) = spec {
                specs.push(CompanionSpec {
                    kind,
                    event_type,
                    date,
                    new_status,
                });
            }
        }
        specs
    }
}

/// Creates and deletes needed to match the current flags
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompanionPlan {
    pub property_id: String,
    pub create: Vec<CompanionSpec>,
    /// Ids of existing companion events to delete
    pub delete: Vec<String>,
}

impl CompanionPlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.delete.is_empty()
    }
}

/// What applying a plan changed
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompanionOutcome {
    pub created: Vec<TimelineEvent>,
    pub removed: Vec<TimelineEvent>,
}

/// Reject a mixed-use configuration whose shares do not total 100
pub fn validate_mixed_use(flags: &CheckboxState, mixed_use: Option<&MixedUse>) -> TimelineResult<()> {
    if !flags.is_mixed_use {
        return Ok(());
    }
    let mixed = mixed_use.copied().unwrap_or_default();
    let total = mixed.total();
    if (total - 100.0).abs() > MIXED_USE_TOLERANCE {
        return Err(TimelineError::MixedUseTotal {
            living: mixed.living_use_percentage,
            rental: mixed.rental_use_percentage,
            business: mixed.business_use_percentage,
            total,
        });
    }
    Ok(())
}

/// Work out which companions to create and delete
///
/// # Arguments
/// * `data` - Current timeline, read through its event index
/// * `property_id` - Property owning the primary event
/// * `previous` - Flags when the edit session opened; `None` for a new event
/// * `current` - Flags being saved
///
/// # Returns
/// The plan, or a validation error before anything is decided
pub fn plan_companions(
    data: &TimelineData,
    property_id: &str,
    previous: Option<&CompanionSnapshot>,
    current: &CompanionSnapshot,
) -> TimelineResult<CompanionPlan> {
    validate_mixed_use(&current.flags, current.mixed_use.as_ref())?;

    let before = previous.map(CompanionSnapshot::wanted).unwrap_or_default();
    let after = current.wanted();
    let mut plan = CompanionPlan {
        property_id: property_id.to_string(),
        ..Default::default()
    };

    let existing = |spec: &CompanionSpec| -> Option<String> {
        data.events_on(property_id, spec.event_type, spec.date)
            .into_iter()
            .find(|e| spec.matches(e))
            .map(|e| e.id.clone())
    };

    for kind in CompanionKind::ALL {
        let was = before.iter().find(|s| s.kind == kind);
        let now = after.iter().find(|s| s.kind == kind);

        // A companion still wanted by another checkbox is never deleted
        let still_wanted = |spec: &CompanionSpec| after.iter().any(|s| s.same_target(spec));

        let remove = match (was, now) {
            (Some(old), None) => Some(old),
            (Some(old), Some(new)) if !old.same_target(new) => Some(old),
            _ => None,
        };
        if let Some(old) = remove
            && !still_wanted(old)
            && let Some(id) = existing(old)
            && !plan.delete.contains(&id)
        {
            plan.delete.push(id);
        }

        let add = match (was, now) {
            (None, Some(new)) => Some(new),
            (Some(old), Some(new)) if !old.same_target(new) => Some(new),
            _ => None,
        };
        if let Some(new) = add
            && existing(new).is_none()
            && !plan.create.iter().any(|s| s.same_target(new))
        {
            plan.create.push(*new);
        }
    }

    debug!(
        property_id,
        create = plan.create.len(),
        delete = plan.delete.len(),
        "companion plan"
    );
    Ok(plan)
}

impl TimelineData {
    /// Carry out a companion plan
    pub fn apply_companion_plan(&mut self, plan: &CompanionPlan) -> CompanionOutcome {
        let mut outcome = CompanionOutcome::default();

        for id in &plan.delete {
            if let Some(event) = self.remove_event(id) {
                outcome.removed.push(event);
            }
        }

        for spec in &plan.create {
            // The plan may be stale if another pass ran in between
            let already = self
                .events_on(&plan.property_id, spec.event_type, spec.date)
                .into_iter()
                .any(|e| spec.matches(e));
            if already {
                continue;
            }
            let id = self.generate_event_id();
            let mut event = TimelineEvent::new(id, plan.property_id.clone(), spec.event_type, spec.date);
            event.title = spec.title();
            event.new_status = spec.new_status;
            self.add_event(event.clone());
            outcome.created.push(event);
        }

        outcome
    }
}

/// Plan and apply in one step
pub fn sync_companions(
    data: &mut TimelineData,
    property_id: &str,
    previous: Option<&CompanionSnapshot>,
    current: &CompanionSnapshot,
) -> TimelineResult<CompanionOutcome> {
    let plan = plan_companions(data, property_id, previous, current)?;
    Ok(data.apply_companion_plan(&plan))
}
