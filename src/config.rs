//! Session configuration.
//!
//! A [`DashboardConfig`] captures everything needed to reconstruct a
//! session's initial state: initial grouping and axes, preset selection,
//! per-view structural parameters, and which views participate at all.
//! Configs serialize to YAML so deployments can keep them in files.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::entity::AttrKind;
use crate::error::{Error, Result};
use crate::palette::{ColorScale, Palette};

/// Per-view participation switches. Disabled views are never registered;
/// views whose data requirements the table cannot meet are hidden even
/// when enabled here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewFlags {
    pub scatter: bool,
    pub map: bool,
    pub histogram: bool,
    pub table: bool,
}

impl Default for ViewFlags {
    fn default() -> Self {
        Self {
            scatter: true,
            map: true,
            histogram: true,
            table: true,
        }
    }
}

/// Full session configuration. All fields have sensible defaults so a
/// plain `DashboardConfig::default()` yields a working dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Initial grouping attribute. Falls back to the first categorical
    /// attribute if absent or unknown.
    pub grouping: Option<String>,
    /// Loader-supplied kind overrides, e.g. a numeric code column that
    /// should group as categorical. Applied before anything reads the
    /// table; unknown attribute names are logged and skipped.
    pub attr_kinds: BTreeMap<String, AttrKind>,
    /// Initial scatter axes. Fall back to the first principal components.
    pub x_axis: Option<String>,
    pub y_axis: Option<String>,
    /// When set, the scatter view starts in 3D.
    pub z_axis: Option<String>,
    /// Entity ids selected when the session starts. Unknown ids are
    /// dropped like any other selection update.
    pub preset_selection: Vec<String>,
    /// Columns shown by the table view (besides the id column).
    pub table_columns: Vec<String>,
    pub histogram_bins: usize,
    /// Format histogram bucket labels as dates.
    pub date_labels: bool,
    pub palette: Palette,
    pub scale: ColorScale,
    /// Figure cache capacity, in figures.
    pub cache_capacity: usize,
    pub views: ViewFlags,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            grouping: None,
            attr_kinds: BTreeMap::new(),
            x_axis: None,
            y_axis: None,
            z_axis: None,
            preset_selection: Vec::new(),
            table_columns: Vec::new(),
            histogram_bins: crate::adapters::HistogramAdapter::DEFAULT_BINS,
            date_labels: false,
            palette: Palette::default(),
            scale: ColorScale::default(),
            cache_capacity: crate::cache::FigureCache::DEFAULT_CAPACITY,
            views: ViewFlags::default(),
        }
    }
}

impl DashboardConfig {
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let text = self.to_yaml()?;
        std::fs::write(path, text).map_err(Error::Io)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_yaml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_yaml() {
        let config = DashboardConfig::default();
        let yaml = config.to_yaml().unwrap();
        let back = DashboardConfig::from_yaml(&yaml).unwrap();
        assert_eq!(back.histogram_bins, config.histogram_bins);
        assert_eq!(back.cache_capacity, config.cache_capacity);
        assert!(back.views.scatter && back.views.table);
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config = DashboardConfig::from_yaml(
            "grouping: region\nhistogram_bins: 25\nattr_kinds:\n  cluster: Categorical\n",
        )
        .unwrap();
        assert_eq!(config.grouping.as_deref(), Some("region"));
        assert_eq!(config.histogram_bins, 25);
        assert_eq!(config.attr_kinds.get("cluster"), Some(&AttrKind::Categorical));
        assert_eq!(config.palette, Palette::Plotly);
        assert!(config.views.map);
    }

    #[test]
    fn malformed_yaml_is_a_format_error() {
        assert!(DashboardConfig::from_yaml("grouping: [unterminated").is_err());
    }
}
