//! Undo/redo history of timeline edits
//!
//! Each recorded edit keeps the properties and events as they were before
//! it. ID counters and collapsed subdivisions are not part of a snapshot, so
//! an undone ID is never handed out again and folding lots is not an edit.

use crate::timeline::{Property, TimelineData, TimelineEvent};
use std::collections::VecDeque;
use tracing::debug;

/// Edits kept for undo unless configured otherwise
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Properties and events at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    properties: Vec<Property>,
    events: Vec<TimelineEvent>,
}

impl Snapshot {
    pub fn of(data: &TimelineData) -> Self {
        Self {
            properties: data.properties.clone(),
            events: data.events.clone(),
        }
    }
}

impl TimelineData {
    /// Replace properties and events with `snapshot`, returning the ones
    /// that were there
    ///
    /// The event index is rebuilt and collapse flags of subdivisions that no
    /// longer exist are dropped.
    pub fn restore(&mut self, snapshot: Snapshot) -> Snapshot {
        let replaced = Snapshot {
            properties: std::mem::replace(&mut self.properties, snapshot.properties),
            events: std::mem::replace(&mut self.events, snapshot.events),
        };
        self.collapsed_subdivisions.retain(|group| {
            self.properties
                .iter()
                .any(|p| p.subdivision_group.as_deref() == Some(group.as_str()))
        });
        self.rebuild_index();
        replaced
    }
}

#[derive(Debug)]
struct Entry {
    action: String,
    snapshot: Snapshot,
}

/// Two bounded stacks of snapshots
#[derive(Debug)]
pub struct History {
    undo: VecDeque<Entry>,
    redo: Vec<Entry>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    /// History keeping at most `limit` edits; 0 turns undo off
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit,
        }
    }

    fn push_undo(&mut self, entry: Entry) {
        self.undo.push_back(entry);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    /// Record an edit described by `action`, given the state before it
    ///
    /// A new edit discards anything that could have been redone.
    pub fn record(&mut self, action: impl Into<String>, before: Snapshot) {
        self.redo.clear();
        self.push_undo(Entry {
            action: action.into(),
            snapshot: before,
        });
    }

    /// Step back over the latest edit, returning its description
    pub fn undo(&mut self, data: &mut TimelineData) -> Option<String> {
        let entry = self.undo.pop_back()?;
        let after = data.restore(entry.snapshot);
        debug!(action = %entry.action, "undo");
        self.redo.push(Entry {
            action: entry.action.clone(),
            snapshot: after,
        });
        Some(entry.action)
    }

    /// Re-apply the latest undone edit, returning its description
    pub fn redo(&mut self, data: &mut TimelineData) -> Option<String> {
        let entry = self.redo.pop()?;
        let before = data.restore(entry.snapshot);
        debug!(action = %entry.action, "redo");
        self.push_undo(Entry {
            action: entry.action.clone(),
            snapshot: before,
        });
        Some(entry.action)
    }

    pub fn next_undo(&self) -> Option<&str> {
        self.undo.back().map(|e| e.action.as_str())
    }

    pub fn next_redo(&self) -> Option<&str> {
        self.redo.last().map(|e| e.action.as_str())
    }
}
