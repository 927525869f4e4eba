//! Time histogram adapter.

use std::collections::BTreeSet;

use chrono::DateTime;

use crate::adapters::adapter::{InteractionEvent, RenderInputs, ViewAdapter};
use crate::data::entity::EntityTable;
use crate::data::selection::ViewKind;
use crate::figure::{AxisSpec, BinSpec, FigureKind, FigureRequest};

/// Histogram over the entities' time role. Requires a table where at
/// least one entity carries a time value; selection happens via an
/// inclusive value range.
pub struct HistogramAdapter {
    bins: usize,
    /// Format bucket labels as dates (time values are unix seconds).
    date_labels: bool,
}

impl HistogramAdapter {
    pub const DEFAULT_BINS: usize = 100;

    pub fn new(bins: usize) -> Self {
        Self {
            bins: bins.max(1),
            date_labels: false,
        }
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn set_bins(&mut self, bins: usize) {
        self.bins = bins.max(1);
    }

    pub fn set_date_labels(&mut self, on: bool) {
        self.date_labels = on;
    }

    fn label(&self, lo: f64, hi: f64) -> String {
        if self.date_labels {
            let fmt = |t: f64| {
                DateTime::from_timestamp(t as i64, 0)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| format!("{t:.0}"))
            };
            format!("{}..{}", fmt(lo), fmt(hi))
        } else {
            format!("{lo:.3}..{hi:.3}")
        }
    }
}

impl Default for HistogramAdapter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BINS)
    }
}

impl ViewAdapter for HistogramAdapter {
    fn kind(&self) -> ViewKind {
        ViewKind::Histogram
    }

    fn supported_by(&self, table: &EntityTable) -> bool {
        table.has_time()
    }

    fn params(&self) -> Vec<String> {
        vec![format!("bins={}", self.bins), format!("dates={}", self.date_labels)]
    }

    fn to_selection(&self, inputs: &RenderInputs, event: &InteractionEvent) -> BTreeSet<String> {
        match event {
            // Inclusive interval match on the time role.
            InteractionEvent::Range { min, max } => {
                let (lo, hi) = (min.min(*max), min.max(*max));
                inputs
                    .table
                    .iter()
                    .filter(|e| e.time.map_or(false, |t| t >= lo && t <= hi))
                    .map(|e| e.id.clone())
                    .collect()
            }
            _ => BTreeSet::new(),
        }
    }

    fn render(&self, inputs: &RenderInputs) -> FigureRequest {
        let mut fig = FigureRequest::new(FigureKind::Histogram, "Time");
        fig.x_axis = Some(AxisSpec::new("time"));
        fig.y_axis = Some(AxisSpec::new("count"));
        fig.unselected_style = *inputs.aesthetics.unselected();
        fig.selection_active = !inputs.selection.is_empty();

        let Some((lo, hi)) = inputs.table.time_range() else {
            return fig;
        };
        // Degenerate range: a single bucket holding everything.
        let width = if hi > lo {
            (hi - lo) / self.bins as f64
        } else {
            1.0
        };
        let n = if hi > lo { self.bins } else { 1 };
        let mut bins: Vec<BinSpec> = (0..n)
            .map(|i| {
                let b_lo = lo + width * i as f64;
                let b_hi = lo + width * (i + 1) as f64;
                BinSpec {
                    lo: b_lo,
                    hi: b_hi,
                    label: self.label(b_lo, b_hi),
                    ids: Vec::new(),
                    total: 0,
                    selected: 0,
                }
            })
            .collect();

        for e in inputs.table.iter() {
            let Some(t) = e.time else { continue };
            // Last bucket is inclusive at its upper edge.
            let mut idx = ((t - lo) / width).floor() as usize;
            if idx >= n {
                idx = n - 1;
            }
            let bin = &mut bins[idx];
            bin.total += 1;
            if inputs.selection.contains(&e.id) {
                bin.selected += 1;
            }
            bin.ids.push(e.id.clone());
        }
        fig.bins = bins;
        fig
    }
}
