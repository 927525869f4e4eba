//! The entity table: one immutable row per sample.
//!
//! Entities are produced by the (external) data-loading collaborator and
//! handed to the dashboard session read-only. Identity is the string id,
//! which must be unique across the table; a duplicate id is the only
//! fatal load error in the crate.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single attribute value: categorical attributes carry text, continuous
/// attributes carry numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Text(String),
    Number(f64),
}

impl AttrValue {
    /// Numeric view of the value, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            AttrValue::Text(_) => None,
        }
    }

    /// Textual form used for grouping keys and comparisons.
    pub fn as_key(&self) -> String {
        match self {
            AttrValue::Text(s) => s.clone(),
            // Trim ".0" so integral numbers group like their text form.
            AttrValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            AttrValue::Number(n) => format!("{n}"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Number(n)
    }
}

/// Whether an attribute is treated as categorical or continuous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrKind {
    Categorical,
    Continuous,
}

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// One sample: id, PC coordinates, annotation attributes and optional
/// geo/time roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub coords: Vec<f64>,
    pub attributes: BTreeMap<String, AttrValue>,
    pub geo: Option<GeoPoint>,
    pub time: Option<f64>,
}

impl Entity {
    pub fn new(id: impl Into<String>, coords: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            coords,
            attributes: BTreeMap::new(),
            geo: None,
            time: None,
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_geo(mut self, lat: f64, lon: f64) -> Self {
        self.geo = Some(GeoPoint { lat, lon });
        self
    }

    pub fn with_time(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }

    /// Value of the named PC axis, looked up through the table's axis names.
    pub fn coord(&self, axis_index: usize) -> Option<f64> {
        self.coords.get(axis_index).copied()
    }
}

/// Immutable-per-load table of entities with typed columns.
///
/// Row order is the input order and is preserved by every view that shows
/// rows (the table adapter in particular).
#[derive(Debug, Clone)]
pub struct EntityTable {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
    pc_names: Vec<String>,
    attr_kinds: BTreeMap<String, AttrKind>,
    fingerprint: u64,
}

impl EntityTable {
    /// Build a table from entities and PC axis names.
    ///
    /// Attribute kinds are derived from the values: an attribute whose
    /// every present value is numeric is continuous, otherwise it is
    /// categorical. Fails with [`Error::DuplicateId`] when two entities
    /// share an id.
    pub fn new(entities: Vec<Entity>, pc_names: Vec<String>) -> Result<Self> {
        let mut index = HashMap::with_capacity(entities.len());
        for (i, e) in entities.iter().enumerate() {
            if index.insert(e.id.clone(), i).is_some() {
                return Err(Error::DuplicateId(e.id.clone()));
            }
        }

        let mut attr_kinds: BTreeMap<String, AttrKind> = BTreeMap::new();
        for e in &entities {
            for (name, value) in &e.attributes {
                let kind = match value {
                    AttrValue::Number(_) => AttrKind::Continuous,
                    AttrValue::Text(_) => AttrKind::Categorical,
                };
                attr_kinds
                    .entry(name.clone())
                    .and_modify(|k| {
                        // A single text value makes the whole column categorical.
                        if kind == AttrKind::Categorical {
                            *k = AttrKind::Categorical;
                        }
                    })
                    .or_insert(kind);
            }
        }

        let fingerprint = fingerprint_entities(&entities, &pc_names, &attr_kinds);
        Ok(Self {
            entities,
            index,
            pc_names,
            attr_kinds,
            fingerprint,
        })
    }

    /// Force an attribute's kind (metadata from the loading collaborator
    /// wins over the derived kind). Reworking a column changes how it
    /// groups, so the fingerprint is recomputed.
    pub fn set_attr_kind(&mut self, attr: &str, kind: AttrKind) -> Result<()> {
        match self.attr_kinds.get_mut(attr) {
            Some(k) => {
                *k = kind;
                self.fingerprint =
                    fingerprint_entities(&self.entities, &self.pc_names, &self.attr_kinds);
                Ok(())
            }
            None => Err(Error::UnknownAttribute(attr.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in input order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.index.get(id).map(|&i| &self.entities[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All ids in input order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.id.as_str())
    }

    /// Names of the PC coordinate axes (e.g. `PC1`, `PC2`, ...).
    pub fn pc_names(&self) -> &[String] {
        &self.pc_names
    }

    /// Index of a PC axis by name.
    pub fn pc_index(&self, name: &str) -> Option<usize> {
        self.pc_names.iter().position(|n| n == name)
    }

    /// All annotation attribute names (sorted).
    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attr_kinds.keys().map(|s| s.as_str())
    }

    pub fn attr_kind(&self, attr: &str) -> Option<AttrKind> {
        self.attr_kinds.get(attr).copied()
    }

    /// True when at least one entity carries geo coordinates.
    pub fn has_geo(&self) -> bool {
        self.entities.iter().any(|e| e.geo.is_some())
    }

    /// True when at least one entity carries a time value.
    pub fn has_time(&self) -> bool {
        self.entities.iter().any(|e| e.time.is_some())
    }

    /// Observed (min, max) of a continuous attribute, ignoring rows where
    /// it is missing or non-numeric.
    pub fn value_range(&self, attr: &str) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for e in &self.entities {
            if let Some(v) = e.attributes.get(attr).and_then(AttrValue::as_number) {
                range = Some(match range {
                    Some((lo, hi)) => (lo.min(v), hi.max(v)),
                    None => (v, v),
                });
            }
        }
        range
    }

    /// Observed (min, max) of the time role across the table.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for t in self.entities.iter().filter_map(|e| e.time) {
            range = Some(match range {
                Some((lo, hi)) => (lo.min(t), hi.max(t)),
                None => (t, t),
            });
        }
        range
    }

    /// Stable content hash of the loaded data. Part of every cache key, so
    /// loading new data implicitly invalidates all cached figures.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

// FNV-1a. DefaultHasher is not stable across processes, which would break
// cache-key sharing between sessions.
pub(crate) const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
pub(crate) const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub(crate) fn fnv1a(hash: &mut u64, bytes: &[u8]) {
    for b in bytes {
        *hash ^= u64::from(*b);
        *hash = hash.wrapping_mul(FNV_PRIME);
    }
}

fn fingerprint_entities(
    entities: &[Entity],
    pc_names: &[String],
    attr_kinds: &BTreeMap<String, AttrKind>,
) -> u64 {
    let mut h = FNV_OFFSET;
    for name in pc_names {
        fnv1a(&mut h, name.as_bytes());
    }
    for (name, kind) in attr_kinds {
        fnv1a(&mut h, name.as_bytes());
        let tag: u8 = match kind {
            AttrKind::Categorical => 0,
            AttrKind::Continuous => 1,
        };
        fnv1a(&mut h, &[tag]);
    }
    for e in entities {
        fnv1a(&mut h, e.id.as_bytes());
        for c in &e.coords {
            fnv1a(&mut h, &c.to_bits().to_le_bytes());
        }
        for (name, value) in &e.attributes {
            fnv1a(&mut h, name.as_bytes());
            match value {
                AttrValue::Text(s) => fnv1a(&mut h, s.as_bytes()),
                AttrValue::Number(n) => fnv1a(&mut h, &n.to_bits().to_le_bytes()),
            }
        }
        if let Some(g) = e.geo {
            fnv1a(&mut h, &g.lat.to_bits().to_le_bytes());
            fnv1a(&mut h, &g.lon.to_bits().to_le_bytes());
        }
        if let Some(t) = e.time {
            fnv1a(&mut h, &t.to_bits().to_le_bytes());
        }
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> EntityTable {
        EntityTable::new(
            vec![
                Entity::new("a", vec![0.1, 0.2]).with_attr("region", "Europe"),
                Entity::new("b", vec![0.3, 0.4])
                    .with_attr("region", "Asia")
                    .with_attr("year", 1999.0),
            ],
            vec!["PC1".into(), "PC2".into()],
        )
        .unwrap()
    }

    #[test]
    fn duplicate_ids_are_fatal() {
        let err = EntityTable::new(
            vec![Entity::new("x", vec![]), Entity::new("x", vec![])],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateId(id) if id == "x"));
    }

    #[test]
    fn derives_attribute_kinds() {
        let t = table();
        assert_eq!(t.attr_kind("region"), Some(AttrKind::Categorical));
        assert_eq!(t.attr_kind("year"), Some(AttrKind::Continuous));
        assert_eq!(t.attr_kind("missing"), None);
    }

    #[test]
    fn mixed_column_is_categorical() {
        let t = EntityTable::new(
            vec![
                Entity::new("a", vec![]).with_attr("v", 1.0),
                Entity::new("b", vec![]).with_attr("v", "two"),
            ],
            vec![],
        )
        .unwrap();
        assert_eq!(t.attr_kind("v"), Some(AttrKind::Categorical));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = table();
        let b = table();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = EntityTable::new(
            vec![Entity::new("a", vec![0.1, 0.2]).with_attr("region", "Africa")],
            vec!["PC1".into(), "PC2".into()],
        )
        .unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn forcing_a_kind_changes_the_fingerprint() {
        let mut t = table();
        let before = t.fingerprint();
        t.set_attr_kind("year", AttrKind::Categorical).unwrap();
        assert_eq!(t.attr_kind("year"), Some(AttrKind::Categorical));
        assert_ne!(t.fingerprint(), before);

        assert!(t.set_attr_kind("missing", AttrKind::Continuous).is_err());
    }

    #[test]
    fn integral_numbers_group_like_text() {
        assert_eq!(AttrValue::Number(2001.0).as_key(), "2001");
        assert_eq!(AttrValue::Number(0.5).as_key(), "0.5");
        assert_eq!(AttrValue::Text("x".into()).as_key(), "x");
    }
}
