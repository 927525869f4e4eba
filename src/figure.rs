//! Declarative figure descriptions.
//!
//! A [`FigureRequest`] is the renderer-independent output of a view
//! adapter: traces, bins or rows plus axis metadata, serializable for the
//! (external) rendering collaborator. Selection-only changes are carried
//! by a [`HighlightPatch`], which restyles an existing figure without
//! rebuilding its geometry.

use serde::{Deserialize, Serialize};

use crate::data::aesthetics::Style;
use crate::palette::Rgb;

/// Which figure family a request describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FigureKind {
    Scatter2d,
    Scatter3d,
    Map,
    Histogram,
    Table,
}

/// Axis metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub label: String,
}

impl AxisSpec {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

/// One marker trace: parallel point arrays plus the ids they belong to.
///
/// `selected` holds indices into the point arrays (the highlight layer);
/// an empty list with `selection_active` on the figure means "nothing
/// selected", rendered dimmed-everything by convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSpec {
    pub label: String,
    pub ids: Vec<String>,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zs: Option<Vec<f64>>,
    pub style: Style,
    /// Per-point colors for continuous grouping; overrides `style.color`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_colors: Option<Vec<Rgb>>,
    pub selected: Vec<usize>,
}

impl TraceSpec {
    pub fn new(label: impl Into<String>, style: Style) -> Self {
        Self {
            label: label.into(),
            ids: Vec::new(),
            xs: Vec::new(),
            ys: Vec::new(),
            zs: None,
            style,
            point_colors: None,
            selected: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One histogram bucket, interval `[lo, hi)` (last bucket inclusive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinSpec {
    pub lo: f64,
    pub hi: f64,
    pub label: String,
    pub ids: Vec<String>,
    pub total: usize,
    pub selected: usize,
}

/// One table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowSpec {
    pub id: String,
    pub cells: Vec<String>,
    pub selected: bool,
}

/// A complete declarative figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureRequest {
    pub kind: FigureKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<AxisSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<AxisSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_axis: Option<AxisSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traces: Vec<TraceSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bins: Vec<BinSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<RowSpec>,
    /// True when a non-empty selection exists; with an empty selection the
    /// figure renders every point in its normal style.
    pub selection_active: bool,
    /// Style for points outside the selection while one is active.
    pub unselected_style: Style,
}

impl FigureRequest {
    pub fn new(kind: FigureKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            x_axis: None,
            y_axis: None,
            z_axis: None,
            traces: Vec::new(),
            bins: Vec::new(),
            columns: Vec::new(),
            rows: Vec::new(),
            selection_active: false,
            unselected_style: Style::unselected_default(),
        }
    }

    /// Apply a highlight patch in place. Geometry is untouched; only
    /// selection marks change.
    pub fn apply_highlight(&mut self, patch: &HighlightPatch) {
        self.selection_active = patch.selection_active;
        for (trace, selected) in self.traces.iter_mut().zip(patch.trace_selected.iter()) {
            trace.selected = selected.clone();
        }
        for (bin, &selected) in self.bins.iter_mut().zip(patch.bin_selected.iter()) {
            bin.selected = selected;
        }
        for (row, &selected) in self.rows.iter_mut().zip(patch.row_selected.iter()) {
            row.selected = selected;
        }
    }
}

/// The cheap restyle produced when only the selection changed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HighlightPatch {
    pub selection_active: bool,
    /// Per trace: indices of selected points, aligned with figure traces.
    pub trace_selected: Vec<Vec<usize>>,
    /// Per histogram bin: selected count.
    pub bin_selected: Vec<usize>,
    /// Per table row: selection mark.
    pub row_selected: Vec<bool>,
}
