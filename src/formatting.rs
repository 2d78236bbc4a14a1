//! Formatting helper functions for tool output

use crate::cost_base::{CostBaseSummary, category_name};
use crate::layout::{BranchPosition, SubdivisionConnection};
use crate::status::StatusPeriod;
use crate::timeline::{Property, TimelineEvent};
use crate::units::{AreaUnit, format_area};
use std::collections::HashMap;

/// Format a dollar amount with thousands separators, e.g. "$1,234,567.89"
pub fn format_currency(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let dollars = (cents / 100).to_string();

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!(
        "{}${}.{:02}",
        if negative { "-" } else { "" },
        grouped,
        cents % 100
    )
}

/// Format one property with its lot and ownership details
pub fn format_property(property: &Property, unit: AreaUnit) -> String {
    let mut result = format!("- [{}] {}", property.id, property.name);
    if !property.address.is_empty() {
        result.push_str(&format!(" ({})", property.address));
    }
    if let Some(status) = property.current_status {
        result.push_str(&format!(" [status: {:?}]", status));
    }
    result.push('\n');

    if let Some(ref parent) = property.parent_property_id {
        result.push_str(&format!(
            "  Lot {} of {}{}\n",
            property.lot_number.as_deref().unwrap_or("?"),
            parent,
            if property.is_main_lot_continuation {
                " (main lot)"
            } else {
                ""
            }
        ));
    }
    if let Some(size) = property.lot_size {
        result.push_str(&format!("  Size: {}\n", format_area(size, unit)));
    }
    if let Some(pct) = property.allocation_percentage {
        result.push_str(&format!(
            "  Allocation: {:.2}%{}\n",
            pct,
            if property.is_percentage_locked {
                " (locked)"
            } else {
                ""
            }
        ));
    }
    if let Some(price) = property.purchase_price {
        result.push_str(&format!("  Purchase price: {}\n", format_currency(price)));
    }
    if !property.owners.is_empty() {
        let owners: Vec<String> = property
            .owners
            .iter()
            .map(|o| format!("{} {}%", o.name, o.percentage))
            .collect();
        result.push_str(&format!("  Owners: {}\n", owners.join(", ")));
    }
    result
}

/// Format a property's events in date order
pub fn format_events(events: &[&TimelineEvent]) -> String {
    let mut result = String::new();
    for event in events {
        result.push_str(&format!(
            "  - [{}] {} {} ({:?})",
            event.id, event.date, event.title, event.event_type
        ));
        if let Some(amount) = event.amount {
            result.push_str(&format!(" {}", format_currency(amount)));
        }
        if let Some(status) = event.new_status {
            result.push_str(&format!(" -> {:?}", status));
        }
        result.push('\n');
        if let Some(ref description) = event.description {
            result.push_str(&format!("    {}\n", description));
        }
        for item in &event.cost_bases {
            result.push_str(&format!(
                "    {}: {} ({})\n",
                item.name,
                format_currency(item.amount),
                category_name(item.category)
            ));
        }
    }
    result
}

/// Format status periods as "status: start to end"
pub fn format_status_periods(periods: &[StatusPeriod]) -> String {
    periods
        .iter()
        .map(|p| match p.end {
            Some(end) => format!("  {:?}: {} to {}\n", p.status, p.start, end),
            None => format!("  {:?}: {} onwards\n", p.status, p.start),
        })
        .collect()
}

/// Format branch positions and split connections
pub fn format_layout(
    positions: &HashMap<String, BranchPosition>,
    connections: &[SubdivisionConnection],
) -> String {
    let mut branches: Vec<&BranchPosition> = positions.values().collect();
    branches.sort_by_key(|b| b.branch_index);

    let mut result = format!("Branches ({}):\n", branches.len());
    for branch in branches {
        result.push_str(&format!(
            "  {} [{}] y={} level={}",
            branch.branch_index, branch.property_id, branch.y_offset, branch.level
        ));
        if let Some(ref parent) = branch.parent_id {
            result.push_str(&format!(" parent={}", parent));
        }
        result.push('\n');
    }

    if !connections.is_empty() {
        result.push_str(&format!("Connections ({}):\n", connections.len()));
        for c in connections {
            result.push_str(&format!(
                "  {} -> {} at {:.2}% ({}) y {} -> {}\n",
                c.parent_id, c.child_id, c.split_position, c.split_date, c.parent_y, c.child_y
            ));
        }
    }
    result
}

/// Format a cost-base summary
pub fn format_cost_base_summary(summary: &CostBaseSummary) -> String {
    let mut result = format!("Cost base for {}:\n", summary.property_id);
    result.push_str(&format!(
        "  Acquisition: {}\n",
        format_currency(summary.acquisition_cost)
    ));
    result.push_str(&format!(
        "  Purchase costs: {}\n",
        format_currency(summary.purchase_costs)
    ));
    result.push_str(&format!(
        "  Improvements: {}\n",
        format_currency(summary.improvement_costs)
    ));
    result.push_str(&format!(
        "  Selling costs: {}\n",
        format_currency(summary.selling_costs)
    ));
    if summary.division43_deductions > 0.0 {
        result.push_str(&format!(
            "  Division 43 deductions: -{}\n",
            format_currency(summary.division43_deductions)
        ));
    }
    result.push_str(&format!(
        "  Total cost base: {}\n",
        format_currency(summary.total_cost_base())
    ));
    if let (Some(price), Some(gain)) = (summary.sale_price, summary.capital_gain()) {
        result.push_str(&format!("  Sale price: {}\n", format_currency(price)));
        result.push_str(&format!("  Capital gain: {}\n", format_currency(gain)));
    }
    result
}
