//! Fan-out of selection changes to the registered view adapters.
//!
//! The router is what keeps the views from feeding updates back into each
//! other forever: every broadcast carries the selection's generation and
//! origin, and each registered adapter remembers the last generation it
//! applied. A selection at or below that watermark is ignored; a selection
//! whose origin is the adapter's own view only advances the watermark
//! (that view already shows the state it reported).

use std::collections::HashMap;

use log::{debug, trace};

use crate::adapters::{RenderInputs, ViewAdapter};
use crate::cache::FigureCache;
use crate::data::aesthetics::AestheticsTable;
use crate::data::entity::EntityTable;
use crate::data::selection::{Selection, ViewKind};
use crate::error::{Error, Result};
use crate::figure::FigureRequest;

struct Entry {
    adapter: Box<dyn ViewAdapter>,
    /// Highest selection generation this view has applied.
    last_applied_generation: u64,
    /// The view's current figure, if one has been rendered. Highlight
    /// patches mutate it in place; structural changes drop it.
    figure: Option<FigureRequest>,
}

/// What a single broadcast did, per view category. Useful for tests and
/// for logging; a well-behaved broadcast touches each view at most once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Views whose figure was restyled (or freshly rendered).
    pub renders: usize,
    /// Views that only acknowledged their own update.
    pub acks: usize,
    /// Views that ignored a stale generation.
    pub skips: usize,
}

/// Routes selection broadcasts to the registered adapters.
#[derive(Default)]
pub struct EventRouter {
    entries: HashMap<ViewKind, Entry>,
    order: Vec<ViewKind>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter. At most one adapter per view kind.
    pub fn register(&mut self, adapter: Box<dyn ViewAdapter>) -> Result<()> {
        let kind = adapter.kind();
        if self.entries.contains_key(&kind) {
            return Err(Error::DuplicateId(format!("{kind:?}")));
        }
        self.order.push(kind);
        self.entries.insert(
            kind,
            Entry {
                adapter,
                last_applied_generation: 0,
                figure: None,
            },
        );
        Ok(())
    }

    /// Registered view kinds, in registration order.
    pub fn kinds(&self) -> &[ViewKind] {
        &self.order
    }

    pub fn is_registered(&self, kind: ViewKind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn adapter(&self, kind: ViewKind) -> Result<&dyn ViewAdapter> {
        self.entries
            .get(&kind)
            .map(|e| e.adapter.as_ref())
            .ok_or(Error::UnknownView(kind))
    }

    pub fn adapter_mut(&mut self, kind: ViewKind) -> Result<&mut (dyn ViewAdapter + 'static)> {
        self.entries
            .get_mut(&kind)
            .map(|e| e.adapter.as_mut())
            .ok_or(Error::UnknownView(kind))
    }

    /// Typed access to a concrete adapter.
    pub fn adapter_as<T: ViewAdapter>(&self, kind: ViewKind) -> Option<&T> {
        self.entries.get(&kind)?.adapter.downcast_ref::<T>()
    }

    /// Typed mutable access. Callers changing structural parameters must
    /// follow up with [`invalidate_figure`](Self::invalidate_figure).
    pub fn adapter_as_mut<T: ViewAdapter>(&mut self, kind: ViewKind) -> Option<&mut T> {
        self.entries.get_mut(&kind)?.adapter.downcast_mut::<T>()
    }

    /// The view's current figure, if any.
    pub fn figure(&self, kind: ViewKind) -> Option<&FigureRequest> {
        self.entries.get(&kind)?.figure.as_ref()
    }

    pub fn set_figure(&mut self, kind: ViewKind, figure: FigureRequest) {
        if let Some(entry) = self.entries.get_mut(&kind) {
            entry.figure = Some(figure);
        }
    }

    /// Drop a view's figure after a structural change (axes, buckets,
    /// grouping). The next broadcast or render call rebuilds it.
    pub fn invalidate_figure(&mut self, kind: ViewKind) {
        if let Some(entry) = self.entries.get_mut(&kind) {
            entry.figure = None;
        }
    }

    /// Drop every figure. Used when aesthetics or data change.
    pub fn invalidate_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.figure = None;
        }
    }

    /// Broadcast one selection to every registered view.
    ///
    /// Each view applies a given generation at most once, and the origin
    /// view never re-renders from its own update, so a broadcast can never
    /// echo back into the store. Views with a live figure take the cheap
    /// restyle path; views without one go through the cache, so a figure
    /// built here is a hit for a later render of the same inputs.
    pub fn dispatch(
        &mut self,
        selection: &Selection,
        table: &EntityTable,
        aesthetics: &AestheticsTable,
        cache: &mut FigureCache,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for kind in &self.order {
            // `order` and `entries` are only updated together.
            let Some(entry) = self.entries.get_mut(kind) else {
                continue;
            };
            if selection.generation <= entry.last_applied_generation {
                trace!(
                    "{kind:?}: skipping generation {} (already at {})",
                    selection.generation,
                    entry.last_applied_generation
                );
                outcome.skips += 1;
                continue;
            }
            entry.last_applied_generation = selection.generation;
            if selection.origin == *kind {
                trace!("{kind:?}: acknowledging own generation {}", selection.generation);
                outcome.acks += 1;
                continue;
            }
            let inputs = RenderInputs {
                table,
                selection,
                aesthetics,
            };
            match entry.figure.as_mut() {
                Some(figure) => {
                    let patch = entry.adapter.highlight(figure, selection);
                    figure.apply_highlight(&patch);
                }
                None => {
                    let key = entry.adapter.cache_key(&inputs);
                    let mut figure = match cache.get(&key) {
                        Some(figure) => figure,
                        None => {
                            let figure = entry.adapter.render(&inputs);
                            cache.put(key, figure.clone());
                            figure
                        }
                    };
                    let patch = entry.adapter.highlight(&figure, selection);
                    figure.apply_highlight(&patch);
                    entry.figure = Some(figure);
                }
            }
            outcome.renders += 1;
        }
        debug!(
            "dispatched generation {} from {:?}: {} renders, {} acks, {} skips",
            selection.generation, selection.origin, outcome.renders, outcome.acks, outcome.skips
        );
        outcome
    }
}
