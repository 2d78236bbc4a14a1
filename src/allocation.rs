//! Lot cost-base allocation
//!
//! When a property is subdivided, the parent's purchase price (and the
//! subdivision fees) are apportioned across the new lots. A lot's share is
//! either a hand-entered, locked percentage or a share of the remaining
//! percentage proportional to its size among the unlocked lots.
//!
//! All functions here are pure. Pending edits from an open edit session are
//! passed in as [`LotEdit`] overlays and never written back.

use crate::error::{TimelineError, TimelineResult};
use crate::timeline::{AllocationMethod, Property, SubdivisionDetails};
use std::collections::HashMap;

/// Tolerance when checking that percentages total 100
pub const PERCENTAGE_TOLERANCE: f64 = 0.01;

/// Uncommitted changes to one lot from an edit session
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LotEdit {
    /// New lot size in square metres
    pub lot_size: Option<f64>,
    /// New allocation percentage
    pub allocation_percentage: Option<f64>,
    /// New lock state; `Some(false)` unlocks a percentage
    pub is_percentage_locked: Option<bool>,
}

/// A lot as seen through any pending edit
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveLot {
    pub id: String,
    pub is_main_lot_continuation: bool,
    pub lot_size: f64,
    pub allocation_percentage: Option<f64>,
    pub is_percentage_locked: bool,
}

impl EffectiveLot {
    /// Merge a stored lot with its pending edit, if any
    pub fn from_property(lot: &Property, edit: Option<&LotEdit>) -> Self {
        let edit = edit.copied().unwrap_or_default();
        Self {
            id: lot.id.clone(),
            is_main_lot_continuation: lot.is_main_lot_continuation,
            lot_size: edit.lot_size.or(lot.lot_size).unwrap_or(0.0).max(0.0),
            allocation_percentage: edit.allocation_percentage.or(lot.allocation_percentage),
            is_percentage_locked: edit
                .is_percentage_locked
                .unwrap_or(lot.is_percentage_locked),
        }
    }

    /// The percentage this lot is pinned to, if it is locked to a positive value
    pub fn locked_percentage(&self) -> Option<f64> {
        if self.is_percentage_locked {
            self.allocation_percentage.filter(|p| *p > 0.0)
        } else {
            None
        }
    }
}

/// One lot's computed share of a subdivision
#[derive(Debug, Clone, PartialEq)]
pub struct LotAllocation {
    pub lot_id: String,
    /// Share of the parent's price, 0-100
    pub percentage: f64,
    /// Allocated purchase price (or land value plus building value)
    pub price_share: f64,
    /// Even share of the subdivision fees
    pub fee_share: f64,
}

impl LotAllocation {
    pub fn cost_base(&self) -> f64 {
        self.price_share + self.fee_share
    }
}

/// Sibling lots of `lot`, in stored order, seen through `edits`
///
/// Siblings share a subdivision group; lots without a group fall back to
/// sharing a parent.
pub fn sibling_lots(
    lot: &Property,
    properties: &[Property],
    edits: &HashMap<String, LotEdit>,
) -> Vec<EffectiveLot> {
    properties
        .iter()
        .filter(|p| p.is_lot())
        .filter(|p| match lot.subdivision_group.as_deref() {
            Some(group) => p.subdivision_group.as_deref() == Some(group),
            None => p.subdivision_group.is_none() && p.parent_property_id == lot.parent_property_id,
        })
        .map(|p| EffectiveLot::from_property(p, edits.get(&p.id)))
        .collect()
}

/// Percentage share (0-100) of each lot, in the same order as `lots`
///
/// With `by_lot_size`, locked lots keep their percentage and the unlocked
/// lots split what is left in proportion to their size. With `manual`, every
/// lot uses its entered percentage and a lot without one gets nothing.
pub fn lot_percentages(lots: &[EffectiveLot], method: AllocationMethod) -> Vec<f64> {
    if method == AllocationMethod::manual {
        return lots
            .iter()
            .map(|l| l.allocation_percentage.unwrap_or(0.0).max(0.0))
            .collect();
    }

    let locked_total: f64 = lots.iter().filter_map(|l| l.locked_percentage()).sum();
    let remainder = (100.0 - locked_total).max(0.0);
    let unlocked_size: f64 = lots
        .iter()
        .filter(|l| l.locked_percentage().is_none())
        .map(|l| l.lot_size)
        .sum();

    lots.iter()
        .map(|l| match l.locked_percentage() {
            Some(pct) => pct,
            None if unlocked_size > 0.0 => remainder * l.lot_size / unlocked_size,
            None => 0.0,
        })
        .collect()
}

/// Check that a group's allocation adds up to 100% before it is saved
///
/// Only enforced once a lot is locked (or the method is `manual`); a pure
/// size-based split is always whole unless every lot has zero size, which
/// is left to the caller to report as missing data.
pub fn validate_allocation_percentages(
    lots: &[EffectiveLot],
    method: AllocationMethod,
) -> TimelineResult<()> {
    let any_locked = lots.iter().any(|l| l.locked_percentage().is_some());
    if method != AllocationMethod::manual && !any_locked {
        return Ok(());
    }

    let total: f64 = lot_percentages(lots, method).iter().sum();
    if (total - 100.0).abs() > PERCENTAGE_TOLERANCE {
        return Err(TimelineError::AllocationTotal { total });
    }
    Ok(())
}

/// Allocate a parent's price and fees across every lot of one subdivision
pub fn allocate_lots(
    lots: &[EffectiveLot],
    purchase_price: f64,
    details: Option<&SubdivisionDetails>,
) -> Vec<LotAllocation> {
    let method = details.map(|d| d.allocation_method).unwrap_or_default();
    let percentages = lot_percentages(lots, method);
    let fee_share = match details {
        Some(d) if !lots.is_empty() => d.total_fees() / lots.len() as f64,
        _ => 0.0,
    };
    let breakdown = details.and_then(|d| d.cost_breakdown);

    lots.iter()
        .zip(percentages)
        .map(|(lot, percentage)| {
            let fraction = percentage / 100.0;
            let price_share = match breakdown {
                // The dwelling stays with the continuing title
                Some(b) => {
                    let building = if lot.is_main_lot_continuation {
                        b.building_value
                    } else {
                        0.0
                    };
                    b.land_value * fraction + building
                }
                None => purchase_price * fraction,
            };
            LotAllocation {
                lot_id: lot.id.clone(),
                percentage,
                price_share,
                fee_share,
            }
        })
        .collect()
}

/// Cost base allocated to one lot from its parent
///
/// # Arguments
/// * `lot_id` - The lot to price
/// * `properties` - All properties, including the parent and sibling lots
/// * `lot_edits` - Pending edit-session changes keyed by lot id
/// * `subdivision_details` - Fees, method and land/building split of the
///   subdivision, if recorded
///
/// # Returns
/// The allocated amount, or 0 when the lot, its parent or the parent's
/// purchase price is missing
pub fn calculate_lot_cost_base(
    lot_id: &str,
    properties: &[Property],
    lot_edits: &HashMap<String, LotEdit>,
    subdivision_details: Option<&SubdivisionDetails>,
) -> f64 {
    let Some(lot) = properties.iter().find(|p| p.id == lot_id) else {
        return 0.0;
    };
    let Some(parent_id) = lot.parent_property_id.as_deref() else {
        return 0.0;
    };
    let Some(purchase_price) = properties
        .iter()
        .find(|p| p.id == parent_id)
        .and_then(|p| p.purchase_price)
    else {
        return 0.0;
    };

    let siblings = sibling_lots(lot, properties, lot_edits);
    allocate_lots(&siblings, purchase_price, subdivision_details)
        .into_iter()
        .find(|a| a.lot_id == lot_id)
        .map(|a| a.cost_base())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::CostBreakdown;

    fn parent(price: Option<f64>) -> Property {
        Property {
            purchase_price: price,
            ..Property::new("prop-1", "Parent", "1 Main St")
        }
    }

    fn lot(id: &str, size: f64, main: bool) -> Property {
        Property {
            parent_property_id: Some("prop-1".to_string()),
            subdivision_group: Some("evt-2".to_string()),
            is_main_lot_continuation: main,
            lot_size: Some(size),
            ..Property::new(id, id, "1 Main St")
        }
    }

    fn locked(mut p: Property, pct: f64) -> Property {
        p.allocation_percentage = Some(pct);
        p.is_percentage_locked = true;
        p
    }

    fn fees(total: f64) -> SubdivisionDetails {
        SubdivisionDetails {
            parent_property_id: "prop-1".to_string(),
            total_lots: 2,
            surveyor_fees: total / 2.0,
            legal_fees: total / 2.0,
            ..Default::default()
        }
    }

    fn no_edits() -> HashMap<String, LotEdit> {
        HashMap::new()
    }

    #[test]
    fn test_simple_subdivision() {
        let props = vec![
            parent(Some(500_000.0)),
            lot("lot-a", 600.0, true),
            lot("lot-b", 400.0, false),
        ];
        assert_eq!(calculate_lot_cost_base("lot-a", &props, &no_edits(), None), 300_000.0);
        assert_eq!(calculate_lot_cost_base("lot-b", &props, &no_edits(), None), 200_000.0);
    }

    #[test]
    fn test_subdivision_with_fees() {
        let props = vec![
            parent(Some(500_000.0)),
            lot("lot-a", 600.0, true),
            lot("lot-b", 400.0, false),
        ];
        let details = fees(10_000.0);
        assert_eq!(
            calculate_lot_cost_base("lot-a", &props, &no_edits(), Some(&details)),
            305_000.0
        );
        assert_eq!(
            calculate_lot_cost_base("lot-b", &props, &no_edits(), Some(&details)),
            205_000.0
        );
    }

    #[test]
    fn test_manual_override() {
        let props = vec![
            parent(Some(500_000.0)),
            locked(lot("lot-a", 600.0, true), 70.0),
            lot("lot-b", 400.0, false),
        ];
        assert_eq!(calculate_lot_cost_base("lot-a", &props, &no_edits(), None), 350_000.0);
        // Unlocked lots split the remaining 30% by size
        assert_eq!(calculate_lot_cost_base("lot-b", &props, &no_edits(), None), 150_000.0);
    }

    #[test]
    fn test_locked_percentage_ignores_size() {
        let small = vec![
            parent(Some(500_000.0)),
            locked(lot("lot-a", 10.0, true), 70.0),
            lot("lot-b", 400.0, false),
        ];
        let large = vec![
            parent(Some(500_000.0)),
            locked(lot("lot-a", 90_000.0, true), 70.0),
            lot("lot-b", 400.0, false),
        ];
        assert_eq!(
            calculate_lot_cost_base("lot-a", &small, &no_edits(), None),
            calculate_lot_cost_base("lot-a", &large, &no_edits(), None)
        );
    }

    #[test]
    fn test_zero_sizes_allocate_nothing() {
        let props = vec![
            parent(Some(500_000.0)),
            lot("lot-a", 0.0, true),
            lot("lot-b", 0.0, false),
        ];
        for id in ["lot-a", "lot-b"] {
            let amount = calculate_lot_cost_base(id, &props, &no_edits(), None);
            assert_eq!(amount, 0.0);
            assert!(amount.is_finite());
        }
    }

    #[test]
    fn test_missing_references_return_zero() {
        let props = vec![parent(None), lot("lot-a", 600.0, true)];
        assert_eq!(calculate_lot_cost_base("lot-a", &props, &no_edits(), None), 0.0);
        assert_eq!(calculate_lot_cost_base("nope", &props, &no_edits(), None), 0.0);
        assert_eq!(calculate_lot_cost_base("prop-1", &props, &no_edits(), None), 0.0);

        let orphan = vec![lot("lot-a", 600.0, true)];
        assert_eq!(calculate_lot_cost_base("lot-a", &orphan, &no_edits(), None), 0.0);
    }

    #[test]
    fn test_pending_edits_override_stored_sizes() {
        let props = vec![
            parent(Some(500_000.0)),
            lot("lot-a", 600.0, true),
            lot("lot-b", 400.0, false),
        ];
        let mut edits = HashMap::new();
        edits.insert(
            "lot-b".to_string(),
            LotEdit {
                lot_size: Some(600.0),
                ..Default::default()
            },
        );
        assert_eq!(calculate_lot_cost_base("lot-a", &props, &edits, None), 250_000.0);
        // Stored data is untouched
        assert_eq!(props[2].lot_size, Some(400.0));
    }

    #[test]
    fn test_building_value_stays_with_main_lot() {
        let props = vec![
            parent(Some(500_000.0)),
            lot("lot-a", 500.0, true),
            lot("lot-b", 500.0, false),
        ];
        let details = SubdivisionDetails {
            cost_breakdown: Some(CostBreakdown {
                land_value: 300_000.0,
                building_value: 200_000.0,
            }),
            ..Default::default()
        };
        assert_eq!(
            calculate_lot_cost_base("lot-a", &props, &no_edits(), Some(&details)),
            350_000.0
        );
        assert_eq!(
            calculate_lot_cost_base("lot-b", &props, &no_edits(), Some(&details)),
            150_000.0
        );
    }

    #[test]
    fn test_manual_method_uses_entered_percentages() {
        let mut a = lot("lot-a", 600.0, true);
        a.allocation_percentage = Some(25.0);
        let mut b = lot("lot-b", 400.0, false);
        b.allocation_percentage = Some(75.0);
        let props = vec![parent(Some(400_000.0)), a, b];
        let details = SubdivisionDetails {
            allocation_method: AllocationMethod::manual,
            ..Default::default()
        };
        assert_eq!(
            calculate_lot_cost_base("lot-a", &props, &no_edits(), Some(&details)),
            100_000.0
        );
        assert_eq!(
            calculate_lot_cost_base("lot-b", &props, &no_edits(), Some(&details)),
            300_000.0
        );
    }

    #[test]
    fn test_validation_only_applies_once_locked() {
        let lots = vec![
            EffectiveLot::from_property(&lot("lot-a", 600.0, true), None),
            EffectiveLot::from_property(&lot("lot-b", 400.0, false), None),
        ];
        assert!(validate_allocation_percentages(&lots, AllocationMethod::by_lot_size).is_ok());

        let over = vec![
            EffectiveLot::from_property(&locked(lot("lot-a", 600.0, true), 80.0), None),
            EffectiveLot::from_property(&locked(lot("lot-b", 400.0, false), 40.0), None),
        ];
        assert_eq!(
            validate_allocation_percentages(&over, AllocationMethod::by_lot_size),
            Err(TimelineError::AllocationTotal { total: 120.0 })
        );
    }

    #[test]
    fn test_validation_rejects_unfilled_remainder() {
        // One lot locked below 100% and the only other lot has no size
        let lots = vec![
            EffectiveLot::from_property(&locked(lot("lot-a", 600.0, true), 60.0), None),
            EffectiveLot::from_property(&lot("lot-b", 0.0, false), None),
        ];
        assert!(validate_allocation_percentages(&lots, AllocationMethod::by_lot_size).is_err());
    }

    #[test]
    fn test_unlock_through_edit() {
        let stored = locked(lot("lot-a", 600.0, true), 70.0);
        let edit = LotEdit {
            is_percentage_locked: Some(false),
            ..Default::default()
        };
        let effective = EffectiveLot::from_property(&stored, Some(&edit));
        assert_eq!(effective.locked_percentage(), None);
    }
}
