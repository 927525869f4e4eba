//! PCA scatter adapter (2D/3D).

use std::collections::BTreeSet;

use crate::adapters::adapter::{ids_in_group, InteractionEvent, RenderInputs, ViewAdapter};
use crate::data::selection::ViewKind;
use crate::figure::{AxisSpec, FigureKind, FigureRequest};

/// Scatter of entities in PC space. Axes are PC names; a `Some` third
/// axis switches the adapter to 3D. Switching back to 2D drops the third
/// axis entirely, so no partial 3D state survives.
pub struct ScatterAdapter {
    x: String,
    y: String,
    z: Option<String>,
}

impl ScatterAdapter {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            z: None,
        }
    }

    pub fn axes(&self) -> (&str, &str, Option<&str>) {
        (&self.x, &self.y, self.z.as_deref())
    }

    pub fn is_3d(&self) -> bool {
        self.z.is_some()
    }

    /// Set the plotted axes. Passing `z: None` returns to 2D.
    pub fn set_axes(&mut self, x: impl Into<String>, y: impl Into<String>, z: Option<String>) {
        self.x = x.into();
        self.y = y.into();
        self.z = z;
    }

    // Axis indices with a defined fallback: an axis name not present in
    // the table resolves to the first PCs rather than failing the render.
    fn axis_indices(&self, inputs: &RenderInputs) -> (usize, usize, Option<usize>) {
        let t = inputs.table;
        let xi = t.pc_index(&self.x).unwrap_or(0);
        let yi = t.pc_index(&self.y).unwrap_or(1);
        let zi = self.z.as_deref().map(|z| t.pc_index(z).unwrap_or(2));
        (xi, yi, zi)
    }
}

impl ViewAdapter for ScatterAdapter {
    fn kind(&self) -> ViewKind {
        ViewKind::Scatter
    }

    fn params(&self) -> Vec<String> {
        let mut p = vec![self.x.clone(), self.y.clone()];
        if let Some(z) = &self.z {
            p.push(z.clone());
        }
        p
    }

    fn to_selection(&self, inputs: &RenderInputs, event: &InteractionEvent) -> BTreeSet<String> {
        match event {
            InteractionEvent::Region { x0, x1, y0, y1 } => {
                let (xi, yi, _) = self.axis_indices(inputs);
                let (xlo, xhi) = (x0.min(*x1), x0.max(*x1));
                let (ylo, yhi) = (y0.min(*y1), y0.max(*y1));
                inputs
                    .table
                    .iter()
                    .filter(|e| {
                        match (e.coord(xi), e.coord(yi)) {
                            (Some(x), Some(y)) => {
                                x >= xlo && x <= xhi && y >= ylo && y <= yhi
                            }
                            _ => false,
                        }
                    })
                    .map(|e| e.id.clone())
                    .collect()
            }
            InteractionEvent::LegendClick { group } => ids_in_group(inputs, group),
            _ => BTreeSet::new(),
        }
    }

    fn render(&self, inputs: &RenderInputs) -> FigureRequest {
        let (xi, yi, zi) = self.axis_indices(inputs);
        let kind = if zi.is_some() {
            FigureKind::Scatter3d
        } else {
            FigureKind::Scatter2d
        };
        let mut fig = FigureRequest::new(kind, "PCA");
        fig.x_axis = Some(AxisSpec::new(&self.x));
        fig.y_axis = Some(AxisSpec::new(&self.y));
        fig.z_axis = self.z.as_deref().map(AxisSpec::new);
        fig.unselected_style = *inputs.aesthetics.unselected();
        fig.traces = super::grouped_traces(inputs, |e| {
            let x = e.coord(xi)?;
            let y = e.coord(yi)?;
            let z = match zi {
                Some(i) => Some(e.coord(i)?),
                None => None,
            };
            Some((x, y, z))
        });
        fig.selection_active = !inputs.selection.is_empty();
        fig
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aesthetics::AestheticsManager;
    use crate::data::entity::{Entity, EntityTable};
    use crate::data::selection::Selection;
    use crate::palette::{ColorScale, Palette};
    use std::sync::Arc;

    fn fixture() -> (Arc<EntityTable>, AestheticsManager) {
        let table = Arc::new(
            EntityTable::new(
                vec![
                    Entity::new("a", vec![0.0, 0.0, 0.5]),
                    Entity::new("b", vec![1.0, 1.0, 0.5]),
                    Entity::new("c", vec![2.0, 0.1, 0.5]),
                ],
                vec!["PC1".into(), "PC2".into(), "PC3".into()],
            )
            .unwrap(),
        );
        let mgr = AestheticsManager::new(table.clone(), Palette::Plotly, ColorScale::Viridis);
        (table, mgr)
    }

    #[test]
    fn region_selects_contained_points() {
        let (table, mut mgr) = fixture();
        let selection = Selection::empty();
        let inputs = RenderInputs {
            table: &table,
            selection: &selection,
            aesthetics: mgr.resolve(),
        };
        let adapter = ScatterAdapter::new("PC1", "PC2");
        let ids = adapter.to_selection(
            &inputs,
            &InteractionEvent::Region {
                x0: -0.5,
                x1: 1.5,
                y0: -0.5,
                y1: 1.5,
            },
        );
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn dimension_toggle_is_pure_state() {
        let (table, mut mgr) = fixture();
        let selection = Selection::empty();
        let inputs = RenderInputs {
            table: &table,
            selection: &selection,
            aesthetics: mgr.resolve(),
        };
        let mut adapter = ScatterAdapter::new("PC1", "PC2");
        let fig2d = adapter.render(&inputs);
        assert_eq!(fig2d.kind, FigureKind::Scatter2d);
        assert!(fig2d.traces[0].zs.is_none());

        adapter.set_axes("PC1", "PC2", Some("PC3".into()));
        let fig3d = adapter.render(&inputs);
        assert_eq!(fig3d.kind, FigureKind::Scatter3d);
        assert!(fig3d.traces[0].zs.is_some());

        // Back to 2D: identical to the original 2D figure.
        adapter.set_axes("PC1", "PC2", None);
        assert_eq!(adapter.render(&inputs), fig2d);
    }

    #[test]
    fn render_is_deterministic() {
        let (table, mut mgr) = fixture();
        let selection = Selection::empty();
        let inputs = RenderInputs {
            table: &table,
            selection: &selection,
            aesthetics: mgr.resolve(),
        };
        let adapter = ScatterAdapter::new("PC1", "PC2");
        assert_eq!(adapter.render(&inputs), adapter.render(&inputs));
    }
}
