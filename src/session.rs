//! One dashboard session: the composition root tying the selection store,
//! the router, the aesthetics manager and the figure cache together.
//!
//! Everything here is per-session state. Nothing is shared between
//! sessions, so two users looking at the same dataset never see each
//! other's selections.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use log::{info, warn};

use crate::adapters::{
    HistogramAdapter, InteractionEvent, MapAdapter, RenderInputs, ScatterAdapter, TableAdapter,
    ViewAdapter,
};
use crate::cache::FigureCache;
use crate::config::DashboardConfig;
use crate::data::aesthetics::{AestheticsManager, StylePatch};
use crate::data::entity::{AttrKind, Entity, EntityTable};
use crate::data::selection::{Selection, SelectionStore, ViewKind};
use crate::error::{Error, Result};
use crate::figure::FigureRequest;
use crate::persistence;
use crate::router::{DispatchOutcome, EventRouter};

/// A live dashboard session.
pub struct DashboardSession {
    table: Arc<EntityTable>,
    store: SelectionStore,
    updates: Receiver<Selection>,
    router: EventRouter,
    aesthetics: AestheticsManager,
    cache: FigureCache,
}

impl DashboardSession {
    /// Build a session from entity data and a configuration.
    ///
    /// Duplicate entity ids are fatal. An unknown grouping or axis in the
    /// config degrades with a warning instead; views whose data
    /// requirements the table cannot meet are skipped with a note.
    pub fn new(
        entities: Vec<Entity>,
        pc_names: Vec<String>,
        config: DashboardConfig,
    ) -> Result<Self> {
        let mut table = EntityTable::new(entities, pc_names)?;
        for (attr, kind) in &config.attr_kinds {
            if table.set_attr_kind(attr, *kind).is_err() {
                warn!("kind override for unknown attribute '{attr}' ignored");
            }
        }
        let table = Arc::new(table);
        let mut aesthetics =
            AestheticsManager::new(table.clone(), config.palette, config.scale);

        let first_categorical = || {
            table
                .attr_names()
                .find(|a| table.attr_kind(a) == Some(AttrKind::Categorical))
                .map(str::to_string)
        };
        let grouping = match config.grouping.clone() {
            Some(g) if table.attr_kind(&g).is_some() => Some(g),
            Some(g) => {
                warn!("unknown grouping attribute '{g}', falling back");
                first_categorical()
            }
            None => first_categorical(),
        };
        if let Some(ref g) = grouping {
            aesthetics.set_grouping(Some(g.as_str()))?;
        }

        let (store, updates) = SelectionStore::new(table.clone());
        let mut session = Self {
            table,
            store,
            updates,
            router: EventRouter::new(),
            aesthetics,
            cache: FigureCache::new(config.cache_capacity),
        };

        if config.views.scatter {
            let x = session.resolve_axis(&config.x_axis, 0);
            let y = session.resolve_axis(&config.y_axis, 1);
            let mut scatter = ScatterAdapter::new(x.clone(), y.clone());
            if config.z_axis.is_some() {
                let z = session.resolve_axis(&config.z_axis, 2);
                scatter.set_axes(x, y, Some(z));
            }
            session.register(Box::new(scatter))?;
        }
        if config.views.map {
            session.register(Box::new(MapAdapter))?;
        }
        if config.views.histogram {
            let mut histogram = HistogramAdapter::new(config.histogram_bins);
            histogram.set_date_labels(config.date_labels);
            session.register(Box::new(histogram))?;
        }
        if config.views.table {
            session.register(Box::new(TableAdapter::new(config.table_columns.clone())))?;
        }

        if !config.preset_selection.is_empty() {
            session
                .store
                .set_selection(config.preset_selection.clone(), ViewKind::System);
            session.pump();
        }
        Ok(session)
    }

    fn resolve_axis(&self, name: &Option<String>, idx: usize) -> String {
        let pcs = self.table.pc_names();
        match name {
            Some(n) if self.table.pc_index(n).is_some() => n.clone(),
            Some(n) => {
                warn!("unknown axis '{n}', falling back to a principal component");
                pcs.get(idx).cloned().unwrap_or_else(|| format!("PC{}", idx + 1))
            }
            None => pcs.get(idx).cloned().unwrap_or_else(|| format!("PC{}", idx + 1)),
        }
    }

    /// Register an adapter if the table supports it.
    fn register(&mut self, adapter: Box<dyn ViewAdapter>) -> Result<()> {
        if !adapter.supported_by(&self.table) {
            info!("hiding {:?} view: table lacks the required data", adapter.kind());
            return Ok(());
        }
        self.router.register(adapter)
    }

    pub fn table(&self) -> &EntityTable {
        &self.table
    }

    pub fn selection(&self) -> &Selection {
        self.store.current()
    }

    pub fn aesthetics(&self) -> &AestheticsManager {
        &self.aesthetics
    }

    /// The fully resolved style for one entity, or `None` for unknown ids.
    pub fn style_of(&mut self, id: &str) -> Option<crate::data::aesthetics::Style> {
        self.aesthetics.resolve().style_of(id).copied()
    }

    /// View kinds actually registered for this session.
    pub fn views(&self) -> &[ViewKind] {
        self.router.kinds()
    }

    pub fn cache_stats(&self) -> crate::cache::CacheStats {
        self.cache.stats()
    }

    /// Drain pending selection updates into the router. Returns the sum of
    /// everything dispatched; a session with no pending updates returns
    /// the zero outcome.
    pub fn pump(&mut self) -> DispatchOutcome {
        let mut total = DispatchOutcome::default();
        while let Ok(selection) = self.updates.try_recv() {
            let outcome = self.router.dispatch(
                &selection,
                &self.table,
                self.aesthetics.resolve(),
                &mut self.cache,
            );
            total.renders += outcome.renders;
            total.acks += outcome.acks;
            total.skips += outcome.skips;
        }
        total
    }

    /// Apply a raw interaction from one of the views and propagate the
    /// resulting selection everywhere.
    pub fn handle_interaction(
        &mut self,
        view: ViewKind,
        event: &InteractionEvent,
    ) -> Result<DispatchOutcome> {
        let aesthetics = self.aesthetics.resolve();
        let adapter = self.router.adapter(view)?;
        let inputs = RenderInputs {
            table: &self.table,
            selection: self.store.current(),
            aesthetics,
        };
        let ids = adapter.to_selection(&inputs, event);
        self.store.set_selection(ids, view);
        Ok(self.pump())
    }

    pub fn clear_selection(&mut self) -> DispatchOutcome {
        self.store.clear();
        self.pump()
    }

    pub fn select_all(&mut self) -> DispatchOutcome {
        self.store.select_all();
        self.pump()
    }

    /// Select all entities matching a filter expression. An invalid
    /// expression leaves the selection untouched.
    pub fn filter_by_query(&mut self, expression: &str) -> Result<DispatchOutcome> {
        self.store.filter_by_query(expression)?;
        Ok(self.pump())
    }

    /// The current figure for a view, rendered through the cache.
    ///
    /// Cache keys deliberately exclude the selection, so a cached figure
    /// is restyled with the current selection marks before it is returned.
    pub fn render_view(&mut self, view: ViewKind) -> Result<FigureRequest> {
        let aesthetics = self.aesthetics.resolve();
        let adapter = self.router.adapter(view)?;
        let selection = self.store.current();
        let inputs = RenderInputs {
            table: &self.table,
            selection,
            aesthetics,
        };
        let key = adapter.cache_key(&inputs);
        let mut figure = match self.cache.get(&key) {
            Some(figure) => figure,
            None => {
                let figure = adapter.render(&inputs);
                self.cache.put(key, figure.clone());
                figure
            }
        };
        let patch = adapter.highlight(&figure, selection);
        figure.apply_highlight(&patch);
        self.router.set_figure(view, figure.clone());
        Ok(figure)
    }

    /// Change the grouping attribute. Overrides are kept; figures are
    /// invalidated because trace structure depends on the grouping.
    pub fn set_grouping(&mut self, attr: Option<&str>) -> Result<()> {
        self.aesthetics.set_grouping(attr)?;
        self.router.invalidate_all();
        Ok(())
    }

    pub fn set_group_override(&mut self, group: &str, patch: StylePatch) {
        self.aesthetics.set_group_override(group, patch);
        self.router.invalidate_all();
    }

    pub fn set_entity_override(&mut self, id: &str, patch: StylePatch) {
        self.aesthetics.set_entity_override(id, patch);
        self.router.invalidate_all();
    }

    pub fn clear_overrides(&mut self) {
        self.aesthetics.clear_overrides();
        self.router.invalidate_all();
    }

    /// Switch the scatter view's axes (pass `z` for 3D, `None` for 2D).
    pub fn set_scatter_axes(
        &mut self,
        x: impl Into<String>,
        y: impl Into<String>,
        z: Option<String>,
    ) -> Result<()> {
        let adapter = self
            .router
            .adapter_as_mut::<ScatterAdapter>(ViewKind::Scatter)
            .ok_or(Error::UnknownView(ViewKind::Scatter))?;
        adapter.set_axes(x, y, z);
        self.router.invalidate_figure(ViewKind::Scatter);
        Ok(())
    }

    /// The current selection as an ordered id list.
    pub fn export_selection(&self) -> Vec<String> {
        self.store.current().to_ordered_ids()
    }

    /// Replace the selection from an exported id list.
    pub fn import_selection(&mut self, ids: Vec<String>) -> DispatchOutcome {
        self.store.set_selection(ids, ViewKind::System);
        self.pump()
    }

    pub fn export_aesthetics(&self) -> Result<String> {
        persistence::aesthetics_to_json(&self.aesthetics)
    }

    pub fn import_aesthetics(&mut self, json: &str) -> Result<()> {
        persistence::aesthetics_from_json(&mut self.aesthetics, json)?;
        self.router.invalidate_all();
        Ok(())
    }
}
