//! PcaView crate root: re-exports and module wiring.
//!
//! This crate is the state-synchronization core of an interactive PCA
//! dashboard: four linked views (scatter, map, time histogram, table)
//! over one entity table, kept consistent through a single selection
//! store and a generation-tagged event router.
//!
//! Module map:
//! - `data`: entity table, selection store, filter queries, aesthetics
//! - `adapters`: one [`ViewAdapter`] per view kind
//! - `router`: selection broadcast with loop prevention
//! - `figure`: declarative figure descriptions and highlight patches
//! - `cache`: keyed LRU memoization of rendered figures
//! - `session`: per-session composition root
//! - `persistence` / `config`: saved state and YAML configuration

pub mod adapters;
pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod figure;
pub mod palette;
pub mod persistence;
pub mod router;
pub mod session;

// Public re-exports for a compact external API
pub use adapters::{
    HistogramAdapter, InteractionEvent, MapAdapter, RenderInputs, ScatterAdapter, TableAdapter,
    ViewAdapter,
};
pub use cache::{CacheKey, CacheStats, FigureCache};
pub use config::{DashboardConfig, ViewFlags};
pub use data::aesthetics::{AestheticsManager, AestheticsTable, MarkerSymbol, Style, StylePatch};
pub use data::entity::{AttrKind, AttrValue, Entity, EntityTable, GeoPoint};
pub use data::query::Query;
pub use data::selection::{Selection, SelectionStore, ViewKind};
pub use error::{Error, Result};
pub use figure::{
    AxisSpec, BinSpec, FigureKind, FigureRequest, HighlightPatch, RowSpec, TraceSpec,
};
pub use palette::{ColorScale, Palette, Rgb};
pub use persistence::{aesthetics_from_json, aesthetics_to_json, AestheticsState, SelectionExport};
pub use router::{DispatchOutcome, EventRouter};
pub use session::DashboardSession;
