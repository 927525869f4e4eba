//! View adapters: the bridge between session state and each view.

mod adapter;
mod histogram;
mod map;
mod scatter;
mod table;

pub use adapter::{InteractionEvent, RenderInputs, ViewAdapter};
pub use histogram::HistogramAdapter;
pub use map::MapAdapter;
pub use scatter::ScatterAdapter;
pub use table::TableAdapter;

use crate::data::aesthetics::Style;
use crate::data::entity::{AttrKind, Entity};
use crate::figure::TraceSpec;
use crate::palette::Rgb;

/// Build marker traces grouped by the active grouping attribute.
///
/// `point` projects one entity into this view's coordinates, or `None`
/// when the entity is not visible here (missing geo, short coord vector).
/// Categorical grouping yields one trace per group in legend order plus a
/// trailing trace for entities without a grouping value; continuous or
/// disabled grouping yields a single trace with per-point colors.
pub(crate) fn grouped_traces(
    inputs: &RenderInputs,
    mut point: impl FnMut(&Entity) -> Option<(f64, f64, Option<f64>)>,
) -> Vec<TraceSpec> {
    let aes = inputs.aesthetics;
    let grouping = aes.grouping();
    let categorical = grouping
        .and_then(|g| inputs.table.attr_kind(g))
        .map(|k| k == AttrKind::Categorical)
        .unwrap_or(false);

    // Trace labels in legend order; the last slot collects entities
    // without a grouping value.
    let mut traces: Vec<TraceSpec> = Vec::new();
    let mut trace_of_group: Vec<(String, usize)> = Vec::new();
    if categorical {
        for (group, color) in aes.group_colors() {
            let style = Style {
                color: *color,
                ..Style::default()
            };
            trace_of_group.push((group.clone(), traces.len()));
            traces.push(TraceSpec::new(group.clone(), style));
        }
    } else {
        let label = grouping.unwrap_or("all");
        traces.push(TraceSpec::new(label, Style::default()));
    }
    let mut other_trace: Option<usize> = None;

    let mut point_colors: Vec<Vec<Rgb>> = vec![Vec::new(); traces.len()];

    for entity in inputs.table.iter() {
        let Some((x, y, z)) = point(entity) else {
            continue;
        };
        let style = aes
            .style_of(&entity.id)
            .copied()
            .unwrap_or_default();

        let idx = if categorical {
            let group_key = grouping
                .and_then(|g| entity.attributes.get(g))
                .map(|v| v.as_key());
            match group_key
                .as_deref()
                .and_then(|k| trace_of_group.iter().find(|(g, _)| g == k))
            {
                Some((_, i)) => *i,
                None => *other_trace.get_or_insert_with(|| {
                    traces.push(TraceSpec::new("n/a", style));
                    point_colors.push(Vec::new());
                    traces.len() - 1
                }),
            }
        } else {
            0
        };

        let trace = &mut traces[idx];
        if trace.is_empty() {
            // First member defines the trace's base style.
            trace.style = style;
        }
        if inputs.selection.contains(&entity.id) {
            trace.selected.push(trace.len());
        }
        trace.ids.push(entity.id.clone());
        trace.xs.push(x);
        trace.ys.push(y);
        if let Some(z) = z {
            trace.zs.get_or_insert_with(Vec::new).push(z);
        }
        point_colors[idx].push(style.color);
    }

    // Attach per-point colors only where they deviate from the trace base
    // (continuous scales, per-entity color overrides).
    for (trace, colors) in traces.iter_mut().zip(point_colors) {
        if colors.iter().any(|c| *c != trace.style.color) {
            trace.point_colors = Some(colors);
        }
    }

    traces.retain(|t| !t.is_empty());
    traces
}
