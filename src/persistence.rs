//! Saving and restoring aesthetics and selections.
//!
//! The on-disk shape is decoupled from the in-memory types through serde
//! mirror structs, so the runtime representation can evolve without
//! breaking saved files. Loading is tolerant: unknown fields are ignored
//! and missing fields fall back to defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::aesthetics::{AestheticsManager, Style, StylePatch};
use crate::error::Result;
use crate::palette::{ColorScale, Palette};

/// Serializable mirror of an [`AestheticsManager`]'s configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AestheticsState {
    pub palette: Palette,
    pub scale: ColorScale,
    pub base: Style,
    pub unselected: Style,
    pub grouping: Option<String>,
    pub group_overrides: BTreeMap<String, StylePatch>,
    pub entity_overrides: BTreeMap<String, StylePatch>,
}

impl Default for AestheticsState {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            scale: ColorScale::default(),
            base: Style::default(),
            unselected: Style::unselected_default(),
            grouping: None,
            group_overrides: BTreeMap::new(),
            entity_overrides: BTreeMap::new(),
        }
    }
}

impl AestheticsState {
    /// Capture the manager's current configuration.
    pub fn capture(manager: &AestheticsManager) -> Self {
        Self {
            palette: manager.palette(),
            scale: manager.scale(),
            base: *manager.base_style(),
            unselected: *manager.unselected_style(),
            grouping: manager.grouping().map(str::to_string),
            group_overrides: manager.group_overrides().clone(),
            entity_overrides: manager.entity_overrides().clone(),
        }
    }

    /// Apply this state to a manager over a (possibly different) table.
    ///
    /// A grouping attribute the table does not have is an error and leaves
    /// the manager unchanged. Overrides referring to entities or groups
    /// that no longer exist are harmless; they simply never match.
    pub fn apply(self, manager: &mut AestheticsManager) -> Result<()> {
        manager.restore(
            self.palette,
            self.scale,
            self.base,
            self.unselected,
            self.grouping,
            self.group_overrides,
            self.entity_overrides,
        )
    }
}

/// Serialize a manager's aesthetics configuration to JSON.
pub fn aesthetics_to_json(manager: &AestheticsManager) -> Result<String> {
    Ok(serde_json::to_string_pretty(&AestheticsState::capture(manager))?)
}

/// Restore a manager's aesthetics configuration from JSON.
pub fn aesthetics_from_json(manager: &mut AestheticsManager, json: &str) -> Result<()> {
    let state: AestheticsState = serde_json::from_str(json)?;
    state.apply(manager)
}

/// An exported selection: the ordered id list, nothing else. Provenance
/// (origin, generation) is session-local and deliberately not saved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionExport {
    pub ids: Vec<String>,
}

impl SelectionExport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
