//! The canonical selection store.
//!
//! One store per dashboard session holds the single current [`Selection`].
//! Every update replaces the selection wholesale, stamps the originating
//! view and increments a monotonic generation counter; the new value is
//! pushed onto an mpsc channel that the session pumps into the event
//! router.

use std::collections::BTreeSet;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::entity::EntityTable;
use crate::data::query::Query;
use crate::error::Result;

/// The view kinds participating in synchronization.
///
/// `System` tags selections not produced by any view (clear, select-all,
/// query filters, preset selections from config).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewKind {
    Scatter,
    Map,
    Histogram,
    Table,
    System,
}

impl ViewKind {
    /// The four concrete view kinds, in dashboard layout order.
    pub fn views() -> [ViewKind; 4] {
        [
            ViewKind::Scatter,
            ViewKind::Map,
            ViewKind::Histogram,
            ViewKind::Table,
        ]
    }
}

/// The current set of selected entity ids plus provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub ids: BTreeSet<String>,
    pub origin: ViewKind,
    pub generation: u64,
}

impl Selection {
    /// The initial, empty selection (generation 0).
    pub fn empty() -> Self {
        Self {
            ids: BTreeSet::new(),
            origin: ViewKind::System,
            generation: 0,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Ids as an ordered list, the export form.
    pub fn to_ordered_ids(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }
}

/// Per-session selection state with change notification.
pub struct SelectionStore {
    table: Arc<EntityTable>,
    current: Selection,
    notify_tx: Sender<Selection>,
}

impl SelectionStore {
    /// Create a store over the given table. The returned receiver yields
    /// every new selection in update order; the session drains it and
    /// broadcasts through the router.
    pub fn new(table: Arc<EntityTable>) -> (Self, Receiver<Selection>) {
        let (tx, rx) = std::sync::mpsc::channel();
        (
            Self {
                table,
                current: Selection::empty(),
                notify_tx: tx,
            },
            rx,
        )
    }

    /// The latest selection. Never blocks.
    pub fn current(&self) -> &Selection {
        &self.current
    }

    /// Replace the selection. Unknown ids are silently dropped; the
    /// generation counter always increments, even when the id set is
    /// unchanged.
    pub fn set_selection(
        &mut self,
        ids: impl IntoIterator<Item = String>,
        origin: ViewKind,
    ) -> Selection {
        let mut kept = BTreeSet::new();
        let mut dropped = 0usize;
        for id in ids {
            if self.table.contains(&id) {
                kept.insert(id);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!("selection update dropped {dropped} unknown id(s)");
        }
        let selection = Selection {
            ids: kept,
            origin,
            generation: self.current.generation + 1,
        };
        self.current = selection.clone();
        // Receiver may already be gone during session teardown.
        let _ = self.notify_tx.send(selection.clone());
        selection
    }

    /// Deselect everything.
    pub fn clear(&mut self) -> Selection {
        self.set_selection(std::iter::empty(), ViewKind::System)
    }

    /// Select every entity in the table.
    pub fn select_all(&mut self) -> Selection {
        let ids: Vec<String> = self.table.ids().map(str::to_string).collect();
        self.set_selection(ids, ViewKind::System)
    }

    /// Select all entities matching a filter expression.
    ///
    /// On a parse or validation error the current selection is left
    /// untouched and the error is returned for display.
    pub fn filter_by_query(&mut self, expression: &str) -> Result<Selection> {
        let query = Query::parse(expression, &self.table)?;
        let ids: Vec<String> = self
            .table
            .iter()
            .filter(|e| query.matches(e, &self.table))
            .map(|e| e.id.clone())
            .collect();
        debug!("query '{expression}' matched {} of {}", ids.len(), self.table.len());
        Ok(self.set_selection(ids, ViewKind::System))
    }
}
