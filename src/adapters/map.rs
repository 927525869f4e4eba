//! Geographic map adapter.

use std::collections::BTreeSet;

use crate::adapters::adapter::{ids_in_group, InteractionEvent, RenderInputs, ViewAdapter};
use crate::data::entity::EntityTable;
use crate::data::selection::ViewKind;
use crate::figure::{AxisSpec, FigureKind, FigureRequest};

/// Entities on a lat/lon map. Entities without geo coordinates are not
/// rendered and never appear in this view's selections; when the whole
/// table lacks geo the view is unsupported and the session hides it.
#[derive(Default)]
pub struct MapAdapter;

impl MapAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ViewAdapter for MapAdapter {
    fn kind(&self) -> ViewKind {
        ViewKind::Map
    }

    fn supported_by(&self, table: &EntityTable) -> bool {
        table.has_geo()
    }

    fn params(&self) -> Vec<String> {
        Vec::new()
    }

    fn to_selection(&self, inputs: &RenderInputs, event: &InteractionEvent) -> BTreeSet<String> {
        match event {
            // Region coordinates are (lon, lat) to match the rendered axes.
            InteractionEvent::Region { x0, x1, y0, y1 } => {
                let (lon_lo, lon_hi) = (x0.min(*x1), x0.max(*x1));
                let (lat_lo, lat_hi) = (y0.min(*y1), y0.max(*y1));
                inputs
                    .table
                    .iter()
                    .filter(|e| {
                        e.geo.map_or(false, |g| {
                            g.lon >= lon_lo && g.lon <= lon_hi && g.lat >= lat_lo && g.lat <= lat_hi
                        })
                    })
                    .map(|e| e.id.clone())
                    .collect()
            }
            InteractionEvent::LegendClick { group } => {
                // Restrict the group to entities this view actually shows.
                let mut ids = ids_in_group(inputs, group);
                ids.retain(|id| {
                    inputs
                        .table
                        .get(id)
                        .map(|e| e.geo.is_some())
                        .unwrap_or(false)
                });
                ids
            }
            _ => BTreeSet::new(),
        }
    }

    fn render(&self, inputs: &RenderInputs) -> FigureRequest {
        let mut fig = FigureRequest::new(FigureKind::Map, "Map");
        fig.x_axis = Some(AxisSpec::new("lon"));
        fig.y_axis = Some(AxisSpec::new("lat"));
        fig.unselected_style = *inputs.aesthetics.unselected();
        fig.traces = super::grouped_traces(inputs, |e| {
            let g = e.geo?;
            Some((g.lon, g.lat, None))
        });
        fig.selection_active = !inputs.selection.is_empty();
        fig
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aesthetics::AestheticsManager;
    use crate::data::entity::Entity;
    use crate::data::selection::Selection;
    use crate::palette::{ColorScale, Palette};
    use std::sync::Arc;

    #[test]
    fn entities_without_geo_are_invisible() {
        let table = Arc::new(
            EntityTable::new(
                vec![
                    Entity::new("geo1", vec![]).with_geo(48.1, 11.5),
                    Entity::new("nogeo", vec![]),
                    Entity::new("geo2", vec![]).with_geo(52.5, 13.4),
                ],
                vec![],
            )
            .unwrap(),
        );
        let mut mgr = AestheticsManager::new(table.clone(), Palette::Plotly, ColorScale::Viridis);
        let selection = Selection::empty();
        let inputs = RenderInputs {
            table: &table,
            selection: &selection,
            aesthetics: mgr.resolve(),
        };
        let adapter = MapAdapter::new();
        assert!(adapter.supported_by(&table));

        let fig = adapter.render(&inputs);
        let rendered: Vec<&String> = fig.traces.iter().flat_map(|t| t.ids.iter()).collect();
        assert_eq!(rendered, vec!["geo1", "geo2"]);

        // A region covering the whole planet still excludes "nogeo".
        let ids = adapter.to_selection(
            &inputs,
            &InteractionEvent::Region {
                x0: -180.0,
                x1: 180.0,
                y0: -90.0,
                y1: 90.0,
            },
        );
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["geo1", "geo2"]);
    }

    #[test]
    fn geoless_table_is_unsupported() {
        let table = EntityTable::new(vec![Entity::new("a", vec![])], vec![]).unwrap();
        assert!(!MapAdapter::new().supported_by(&table));
    }
}
