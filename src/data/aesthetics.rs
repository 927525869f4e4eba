//! Per-entity visual style resolution.
//!
//! The aesthetics manager computes default styles from the active grouping
//! attribute (fixed palette cycle for categorical attributes, continuous
//! color scale for numeric ones) and merges in user overrides. Precedence
//! per style field: entity override > group override > computed default.
//! Overrides persist across grouping changes until explicitly cleared.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::entity::{fnv1a, AttrKind, EntityTable, FNV_OFFSET};
use crate::error::{Error, Result};
use crate::palette::{ColorScale, Palette, Rgb};

/// Marker symbol vocabulary shared by all views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MarkerSymbol {
    #[default]
    Circle,
    Square,
    Diamond,
    Cross,
    TriangleUp,
    TriangleDown,
    Star,
}

impl MarkerSymbol {
    fn tag(self) -> u8 {
        match self {
            MarkerSymbol::Circle => 0,
            MarkerSymbol::Square => 1,
            MarkerSymbol::Diamond => 2,
            MarkerSymbol::Cross => 3,
            MarkerSymbol::TriangleUp => 4,
            MarkerSymbol::TriangleDown => 5,
            MarkerSymbol::Star => 6,
        }
    }
}

/// A fully resolved visual style for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub color: Rgb,
    pub size: f32,
    pub opacity: f32,
    pub symbol: MarkerSymbol,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: Rgb(0x63, 0x6e, 0xfa),
            size: 8.0,
            opacity: 0.8,
            symbol: MarkerSymbol::Circle,
        }
    }
}

impl Style {
    /// The dimmed style applied to points outside the current selection.
    pub fn unselected_default() -> Self {
        Self {
            color: Rgb::GREY,
            size: 6.0,
            opacity: 0.3,
            symbol: MarkerSymbol::Circle,
        }
    }
}

/// A partial style: every field optional. Unset fields fall through the
/// precedence chain independently.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StylePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<MarkerSymbol>,
}

impl StylePatch {
    pub fn color(color: Rgb) -> Self {
        Self {
            color: Some(color),
            ..Default::default()
        }
    }

    pub fn size(size: f32) -> Self {
        Self {
            size: Some(size),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.size.is_none() && self.opacity.is_none() && self.symbol.is_none()
    }

    fn apply_to(&self, style: &mut Style) {
        if let Some(c) = self.color {
            style.color = c;
        }
        if let Some(s) = self.size {
            style.size = s;
        }
        if let Some(o) = self.opacity {
            style.opacity = o;
        }
        if let Some(sym) = self.symbol {
            style.symbol = sym;
        }
    }
}

/// Resolved per-entity styles for the active grouping, plus legend
/// metadata. Produced by [`AestheticsManager::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct AestheticsTable {
    grouping: Option<String>,
    styles: BTreeMap<String, Style>,
    /// Group value → base color, in first-appearance order (legend order).
    group_colors: Vec<(String, Rgb)>,
    unselected: Style,
    fingerprint: u64,
}

impl AestheticsTable {
    pub fn grouping(&self) -> Option<&str> {
        self.grouping.as_deref()
    }

    pub fn style_of(&self, id: &str) -> Option<&Style> {
        self.styles.get(id)
    }

    pub fn unselected(&self) -> &Style {
        &self.unselected
    }

    /// Legend entries: distinct group values with their base colors, in
    /// first-appearance order.
    pub fn group_colors(&self) -> &[(String, Rgb)] {
        &self.group_colors
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Style)> {
        self.styles.iter().map(|(id, s)| (id.as_str(), s))
    }

    /// Stable content hash over every resolved style field. Part of every
    /// cache key: any visible aesthetic change changes the key.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

fn fingerprint_styles(
    grouping: Option<&str>,
    styles: &BTreeMap<String, Style>,
    unselected: &Style,
) -> u64 {
    fn mix(h: &mut u64, style: &Style) {
        fnv1a(h, &[style.color.0, style.color.1, style.color.2]);
        fnv1a(h, &style.size.to_bits().to_le_bytes());
        fnv1a(h, &style.opacity.to_bits().to_le_bytes());
        fnv1a(h, &[style.symbol.tag()]);
    }

    let mut h = FNV_OFFSET;
    if let Some(g) = grouping {
        fnv1a(&mut h, g.as_bytes());
    }
    mix(&mut h, unselected);
    for (id, style) in styles {
        fnv1a(&mut h, id.as_bytes());
        mix(&mut h, style);
    }
    h
}

/// Computes defaults, holds overrides and resolves the aesthetics table.
pub struct AestheticsManager {
    table: Arc<EntityTable>,
    palette: Palette,
    scale: ColorScale,
    base: Style,
    unselected: Style,
    grouping: Option<String>,
    group_overrides: BTreeMap<String, StylePatch>,
    entity_overrides: BTreeMap<String, StylePatch>,
    resolved: Option<AestheticsTable>,
}

impl AestheticsManager {
    pub fn new(table: Arc<EntityTable>, palette: Palette, scale: ColorScale) -> Self {
        Self {
            table,
            palette,
            scale,
            base: Style::default(),
            unselected: Style::unselected_default(),
            grouping: None,
            group_overrides: BTreeMap::new(),
            entity_overrides: BTreeMap::new(),
            resolved: None,
        }
    }

    pub fn grouping(&self) -> Option<&str> {
        self.grouping.as_deref()
    }

    /// Change the active grouping attribute. `None` disables grouping
    /// (every entity gets the base style). Unknown attributes are
    /// rejected; the previous grouping stays active.
    pub fn set_grouping(&mut self, attr: Option<&str>) -> Result<()> {
        if let Some(a) = attr {
            if self.table.attr_kind(a).is_none() {
                return Err(Error::UnknownAttribute(a.to_string()));
            }
        }
        self.grouping = attr.map(str::to_string);
        self.resolved = None;
        Ok(())
    }

    /// Override style fields for every entity whose grouping value equals
    /// `group`. Survives grouping changes until cleared.
    pub fn set_group_override(&mut self, group: &str, patch: StylePatch) {
        if patch.is_empty() {
            self.group_overrides.remove(group);
        } else {
            self.group_overrides.insert(group.to_string(), patch);
        }
        self.resolved = None;
    }

    /// Override style fields for a single entity. Strongest precedence.
    pub fn set_entity_override(&mut self, id: &str, patch: StylePatch) {
        if patch.is_empty() {
            self.entity_overrides.remove(id);
        } else {
            self.entity_overrides.insert(id.to_string(), patch);
        }
        self.resolved = None;
    }

    /// Drop all per-group and per-entity overrides.
    pub fn clear_overrides(&mut self) {
        self.group_overrides.clear();
        self.entity_overrides.clear();
        self.resolved = None;
    }

    pub fn group_overrides(&self) -> &BTreeMap<String, StylePatch> {
        &self.group_overrides
    }

    pub fn entity_overrides(&self) -> &BTreeMap<String, StylePatch> {
        &self.entity_overrides
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn scale(&self) -> ColorScale {
        self.scale
    }

    pub fn base_style(&self) -> &Style {
        &self.base
    }

    pub fn unselected_style(&self) -> &Style {
        &self.unselected
    }

    /// Restore manager state captured by the persistence layer.
    pub(crate) fn restore(
        &mut self,
        palette: Palette,
        scale: ColorScale,
        base: Style,
        unselected: Style,
        grouping: Option<String>,
        group_overrides: BTreeMap<String, StylePatch>,
        entity_overrides: BTreeMap<String, StylePatch>,
    ) -> Result<()> {
        if let Some(ref g) = grouping {
            if self.table.attr_kind(g).is_none() {
                return Err(Error::UnknownAttribute(g.clone()));
            }
        }
        self.palette = palette;
        self.scale = scale;
        self.base = base;
        self.unselected = unselected;
        self.grouping = grouping;
        self.group_overrides = group_overrides;
        self.entity_overrides = entity_overrides;
        self.resolved = None;
        Ok(())
    }

    /// The resolved aesthetics table for the current grouping and
    /// overrides. Recomputed lazily after any change.
    pub fn resolve(&mut self) -> &AestheticsTable {
        if self.resolved.is_none() {
            self.resolved = Some(self.compute());
        }
        self.resolved.as_ref().expect("just computed")
    }

    fn compute(&self) -> AestheticsTable {
        let (defaults, group_colors, group_of) = self.compute_defaults();
        let mut styles = BTreeMap::new();
        for entity in self.table.iter() {
            let mut style = defaults
                .get(&entity.id)
                .copied()
                .unwrap_or(self.base);
            if let Some(group) = group_of.get(&entity.id) {
                if let Some(patch) = self.group_overrides.get(group) {
                    patch.apply_to(&mut style);
                }
            }
            if let Some(patch) = self.entity_overrides.get(&entity.id) {
                patch.apply_to(&mut style);
            }
            styles.insert(entity.id.clone(), style);
        }
        let fingerprint = fingerprint_styles(self.grouping.as_deref(), &styles, &self.unselected);
        debug!(
            "resolved aesthetics for grouping {:?}: {} styles, {} group / {} entity overrides",
            self.grouping,
            styles.len(),
            self.group_overrides.len(),
            self.entity_overrides.len()
        );
        AestheticsTable {
            grouping: self.grouping.clone(),
            styles,
            group_colors,
            unselected: self.unselected,
            fingerprint,
        }
    }

    /// Default style per entity from the grouping attribute alone.
    ///
    /// Categorical: palette colors cycle over distinct values in
    /// first-appearance order, so repeated loads of the same data color
    /// identically. Continuous: scale normalized to observed min/max.
    #[allow(clippy::type_complexity)]
    fn compute_defaults(
        &self,
    ) -> (
        BTreeMap<String, Style>,
        Vec<(String, Rgb)>,
        BTreeMap<String, String>,
    ) {
        let mut defaults = BTreeMap::new();
        let mut group_colors: Vec<(String, Rgb)> = Vec::new();
        let mut group_of = BTreeMap::new();

        let Some(ref grouping) = self.grouping else {
            for e in self.table.iter() {
                defaults.insert(e.id.clone(), self.base);
            }
            return (defaults, group_colors, group_of);
        };

        match self.table.attr_kind(grouping) {
            Some(AttrKind::Categorical) | None => {
                let mut color_of: BTreeMap<String, Rgb> = BTreeMap::new();
                for e in self.table.iter() {
                    let Some(value) = e.attributes.get(grouping) else {
                        // Missing grouping value keeps the base style.
                        defaults.insert(e.id.clone(), self.base);
                        continue;
                    };
                    let key = value.as_key();
                    let color = *color_of.entry(key.clone()).or_insert_with(|| {
                        let c = self.palette.color(group_colors.len());
                        group_colors.push((key.clone(), c));
                        c
                    });
                    let mut style = self.base;
                    style.color = color;
                    defaults.insert(e.id.clone(), style);
                    group_of.insert(e.id.clone(), key);
                }
            }
            Some(AttrKind::Continuous) => {
                let range = self.table.value_range(grouping);
                for e in self.table.iter() {
                    let value = e.attributes.get(grouping).and_then(|v| v.as_number());
                    let mut style = self.base;
                    if let Some(v) = value {
                        let t = match range {
                            Some((lo, hi)) if hi > lo => (v - lo) / (hi - lo),
                            // Constant attribute: everything at midpoint.
                            _ => 0.5,
                        };
                        style.color = self.scale.sample(t);
                        group_of.insert(e.id.clone(), AttrValueKey(v).to_string());
                    }
                    defaults.insert(e.id.clone(), style);
                }
            }
        }
        (defaults, group_colors, group_of)
    }
}

// Group key formatting for continuous values, matching AttrValue::as_key.
struct AttrValueKey(f64);

impl std::fmt::Display for AttrValueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.fract() == 0.0 && self.0.abs() < 1e15 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::entity::Entity;

    fn table() -> Arc<EntityTable> {
        Arc::new(
            EntityTable::new(
                vec![
                    Entity::new("a", vec![]).with_attr("region", "Europe"),
                    Entity::new("b", vec![]).with_attr("region", "Asia"),
                    Entity::new("c", vec![]).with_attr("region", "Europe"),
                ],
                vec![],
            )
            .unwrap(),
        )
    }

    fn manager() -> AestheticsManager {
        AestheticsManager::new(table(), Palette::Plotly, ColorScale::Viridis)
    }

    #[test]
    fn categorical_colors_follow_first_appearance() {
        let mut m = manager();
        m.set_grouping(Some("region")).unwrap();
        let t = m.resolve();
        // Europe appears first, Asia second.
        assert_eq!(t.group_colors()[0].0, "Europe");
        assert_eq!(t.group_colors()[1].0, "Asia");
        assert_eq!(t.style_of("a").unwrap().color, Palette::Plotly.color(0));
        assert_eq!(t.style_of("b").unwrap().color, Palette::Plotly.color(1));
        assert_eq!(t.style_of("c").unwrap().color, Palette::Plotly.color(0));
    }

    #[test]
    fn precedence_entity_over_group_over_default() {
        let mut m = manager();
        m.set_grouping(Some("region")).unwrap();
        m.set_group_override("Europe", StylePatch::color(Rgb(0, 0, 255)));
        m.set_entity_override("a", StylePatch::size(5.0));
        let t = m.resolve();
        let a = t.style_of("a").unwrap();
        // Color from the group override, size from the entity override.
        assert_eq!(a.color, Rgb(0, 0, 255));
        assert_eq!(a.size, 5.0);
        // Other fields still the defaults.
        assert_eq!(a.opacity, Style::default().opacity);
    }

    #[test]
    fn overrides_survive_grouping_change() {
        let mut m = manager();
        m.set_grouping(Some("region")).unwrap();
        m.set_entity_override("b", StylePatch::color(Rgb(1, 2, 3)));
        m.set_grouping(None).unwrap();
        assert_eq!(m.resolve().style_of("b").unwrap().color, Rgb(1, 2, 3));
        m.clear_overrides();
        assert_eq!(
            m.resolve().style_of("b").unwrap().color,
            Style::default().color
        );
    }

    #[test]
    fn unknown_grouping_rejected() {
        let mut m = manager();
        assert!(matches!(
            m.set_grouping(Some("nope")),
            Err(Error::UnknownAttribute(_))
        ));
        assert_eq!(m.grouping(), None);
    }

    #[test]
    fn fingerprint_changes_with_any_style_input() {
        let mut m = manager();
        m.set_grouping(Some("region")).unwrap();
        let fp0 = m.resolve().fingerprint();
        m.set_entity_override("a", StylePatch::size(9.0));
        let fp1 = m.resolve().fingerprint();
        assert_ne!(fp0, fp1);
        // Same inputs, same fingerprint.
        let mut m2 = manager();
        m2.set_grouping(Some("region")).unwrap();
        m2.set_entity_override("a", StylePatch::size(9.0));
        assert_eq!(m2.resolve().fingerprint(), fp1);
    }

    #[test]
    fn continuous_grouping_normalizes_to_range() {
        let table = Arc::new(
            EntityTable::new(
                vec![
                    Entity::new("lo", vec![]).with_attr("year", 1990.0),
                    Entity::new("hi", vec![]).with_attr("year", 2010.0),
                    Entity::new("mid", vec![]).with_attr("year", 2000.0),
                ],
                vec![],
            )
            .unwrap(),
        );
        let mut m = AestheticsManager::new(table, Palette::Plotly, ColorScale::Viridis);
        m.set_grouping(Some("year")).unwrap();
        let t = m.resolve();
        assert_eq!(t.style_of("lo").unwrap().color, ColorScale::Viridis.sample(0.0));
        assert_eq!(t.style_of("hi").unwrap().color, ColorScale::Viridis.sample(1.0));
        assert_eq!(t.style_of("mid").unwrap().color, ColorScale::Viridis.sample(0.5));
    }
}
