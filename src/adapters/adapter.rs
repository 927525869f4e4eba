//! The uniform contract every visualization implements.

use std::collections::BTreeSet;

use downcast_rs::{impl_downcast, Downcast};

use crate::cache::CacheKey;
use crate::data::aesthetics::AestheticsTable;
use crate::data::entity::EntityTable;
use crate::data::selection::{Selection, ViewKind};
use crate::figure::{FigureRequest, HighlightPatch};

/// Everything an adapter may read while translating interactions or
/// building a figure. All references are into session-owned state.
pub struct RenderInputs<'a> {
    pub table: &'a EntityTable,
    pub selection: &'a Selection,
    pub aesthetics: &'a AestheticsTable,
}

/// A raw user interaction, already translated out of the UI toolkit by
/// the (external) transport collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    /// Lasso/box bounding region in the view's own coordinate space
    /// (PC values for scatter, lat/lon for the map).
    Region { x0: f64, x1: f64, y0: f64, y1: f64 },
    /// Inclusive value range from a range slider (time histogram).
    Range { min: f64, max: f64 },
    /// Toggle a single table row against the current selection.
    RowToggle { id: String, selected: bool },
    /// Click a table row: the selection becomes exactly that row.
    RowClick { id: String },
    /// Click a legend entry: select the whole group.
    LegendClick { group: String },
}

/// The adapter contract (one implementation per view kind).
///
/// `render` must be a deterministic function of its inputs so that figure
/// caching is sound; anything session- or time-dependent is forbidden.
pub trait ViewAdapter: Downcast {
    /// Which view this adapter drives.
    fn kind(&self) -> ViewKind;

    /// Whether the table carries the data this view needs (the map needs
    /// geo coordinates, the histogram a time role). Unsupported views are
    /// hidden rather than erroring.
    fn supported_by(&self, table: &EntityTable) -> bool {
        let _ = table;
        true
    }

    /// Structural parameters that change this view's geometry (axes,
    /// bucket count, columns). Folded into the cache key.
    fn params(&self) -> Vec<String>;

    /// Map an interaction onto the subset of this view's *visible*
    /// entities it covers. Entities not rendered by this view are never
    /// returned.
    fn to_selection(&self, inputs: &RenderInputs, event: &InteractionEvent) -> BTreeSet<String>;

    /// Build the full declarative figure.
    fn render(&self, inputs: &RenderInputs) -> FigureRequest;

    /// Cheap restyle for a selection-only change. The default computes
    /// selection marks from the ids already present in the figure, which
    /// is correct for every view kind.
    fn highlight(&self, figure: &FigureRequest, selection: &Selection) -> HighlightPatch {
        let trace_selected = figure
            .traces
            .iter()
            .map(|trace| {
                trace
                    .ids
                    .iter()
                    .enumerate()
                    .filter(|(_, id)| selection.contains(id))
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();
        let bin_selected = figure
            .bins
            .iter()
            .map(|bin| bin.ids.iter().filter(|id| selection.contains(id)).count())
            .collect();
        let row_selected = figure
            .rows
            .iter()
            .map(|row| selection.contains(&row.id))
            .collect();
        HighlightPatch {
            selection_active: !selection.is_empty(),
            trace_selected,
            bin_selected,
            row_selected,
        }
    }

    /// The composite key capturing every input of `render`.
    fn cache_key(&self, inputs: &RenderInputs) -> CacheKey {
        CacheKey {
            view: self.kind(),
            params: self.params(),
            grouping: inputs.aesthetics.grouping().map(str::to_string),
            aesthetics_fp: inputs.aesthetics.fingerprint(),
            data_fp: inputs.table.fingerprint(),
        }
    }
}

impl_downcast!(ViewAdapter);

/// Entities in a group, by the active grouping's value key. Shared by the
/// legend-click handling of the scatter and map adapters.
pub(crate) fn ids_in_group(inputs: &RenderInputs, group: &str) -> BTreeSet<String> {
    let Some(grouping) = inputs.aesthetics.grouping() else {
        return BTreeSet::new();
    };
    inputs
        .table
        .iter()
        .filter(|e| {
            e.attributes
                .get(grouping)
                .map(|v| v.as_key() == group)
                .unwrap_or(false)
        })
        .map(|e| e.id.clone())
        .collect()
}
