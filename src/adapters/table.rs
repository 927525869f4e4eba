//! Tabular view adapter.

use std::collections::BTreeSet;

use crate::adapters::adapter::{InteractionEvent, RenderInputs, ViewAdapter};
use crate::data::selection::ViewKind;
use crate::figure::{FigureKind, FigureRequest, RowSpec};

/// Table view. Rows always follow the table's input order regardless of
/// the selection; selection only toggles per-row marks.
pub struct TableAdapter {
    columns: Vec<String>,
}

impl TableAdapter {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn set_columns(&mut self, columns: Vec<String>) {
        self.columns = columns;
    }
}

impl ViewAdapter for TableAdapter {
    fn kind(&self) -> ViewKind {
        ViewKind::Table
    }

    fn params(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn to_selection(&self, inputs: &RenderInputs, event: &InteractionEvent) -> BTreeSet<String> {
        match event {
            InteractionEvent::RowToggle { id, selected } => {
                let mut ids = inputs.selection.ids.clone();
                if *selected {
                    if inputs.table.contains(id) {
                        ids.insert(id.clone());
                    }
                } else {
                    ids.remove(id);
                }
                ids
            }
            InteractionEvent::RowClick { id } => {
                if inputs.table.contains(id) {
                    BTreeSet::from([id.clone()])
                } else {
                    BTreeSet::new()
                }
            }
            _ => BTreeSet::new(),
        }
    }

    fn render(&self, inputs: &RenderInputs) -> FigureRequest {
        let mut fig = FigureRequest::new(FigureKind::Table, "Entities");
        fig.selection_active = !inputs.selection.is_empty();
        fig.unselected_style = *inputs.aesthetics.unselected();

        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push("id".to_string());
        columns.extend(self.columns.iter().cloned());
        fig.columns = columns;

        fig.rows = inputs
            .table
            .iter()
            .map(|e| {
                let mut cells = Vec::with_capacity(self.columns.len() + 1);
                cells.push(e.id.clone());
                for col in &self.columns {
                    cells.push(
                        e.attributes
                            .get(col)
                            .map(|v| v.as_key())
                            .unwrap_or_default(),
                    );
                }
                RowSpec {
                    id: e.id.clone(),
                    cells,
                    selected: inputs.selection.contains(&e.id),
                }
            })
            .collect();
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

    fn fixture() -> Arc<EntityTable> {
        Arc::new(
            EntityTable::new(
                vec![
                    Entity::new("c", vec![]).with_attr("region", "Asia"),
                    Entity::new("a", vec![]).with_attr("region", "Europe"),
                    Entity::new("b", vec![]),
                ],
                vec![],
            )
            .unwrap(),
        )
    }

    #[test]
    fn rows_keep_input_order_and_fill_missing_cells() {
        let table = fixture();
        let mut mgr = AestheticsManager::new(table.clone(), Palette::Plotly, ColorScale::Viridis);
        let mut selection = Selection::empty();
        selection.ids.insert("a".to_string());
        let inputs = RenderInputs {
            table: &table,
            selection: &selection,
            aesthetics: mgr.resolve(),
        };
        let fig = TableAdapter::new(vec!["region".to_string()]).render(&inputs);
        let ids: Vec<_> = fig.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert!(!fig.rows[0].selected);
        assert!(fig.rows[1].selected);
        assert_eq!(fig.rows[2].cells, vec!["b", ""]);
    }

    #[test]
    fn row_toggle_edits_the_current_selection() {
        let table = fixture();
        let mut mgr = AestheticsManager::new(table.clone(), Palette::Plotly, ColorScale::Viridis);
        let mut selection = Selection::empty();
        selection.ids.insert("a".to_string());
        let inputs = RenderInputs {
            table: &table,
            selection: &selection,
            aesthetics: mgr.resolve(),
        };
        let adapter = TableAdapter::new(vec![]);
        let added = adapter.to_selection(
            &inputs,
            &InteractionEvent::RowToggle {
                id: "b".to_string(),
                selected: true,
            },
        );
        assert_eq!(added.len(), 2);
        assert!(added.contains("a") && added.contains("b"));
        let removed = adapter.to_selection(
            &inputs,
            &InteractionEvent::RowToggle {
                id: "a".to_string(),
                selected: false,
            },
        );
        assert!(removed.is_empty());
    }

    #[test]
    fn row_click_replaces_the_selection() {
        let table = fixture();
        let mut mgr = AestheticsManager::new(table.clone(), Palette::Plotly, ColorScale::Viridis);
        let mut selection = Selection::empty();
        selection.ids.insert("a".to_string());
        selection.ids.insert("b".to_string());
        let inputs = RenderInputs {
            table: &table,
            selection: &selection,
            aesthetics: mgr.resolve(),
        };
        let ids = TableAdapter::new(vec![]).to_selection(
            &inputs,
            &InteractionEvent::RowClick { id: "c".to_string() },
        );
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["c"]);
    }
}
