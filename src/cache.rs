//! Figure memoization.
//!
//! Figure construction is the expensive step between a state change and a
//! redraw, so it is memoized per view behind a composite [`CacheKey`]
//! capturing every input that affects the rendered figure. New data or
//! changed aesthetics change the fingerprints inside the key, so stale
//! entries are never served; no explicit purge pass is needed.

use std::collections::{HashMap, VecDeque};

use log::{debug, warn};

use crate::data::selection::ViewKind;
use crate::figure::FigureRequest;

/// Composite key over everything that can change a view's figure.
///
/// `params` carries the view's structural parameters (axes, bucket count,
/// columns); selection state is deliberately absent — selection changes go
/// through the highlight path, not figure regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub view: ViewKind,
    pub params: Vec<String>,
    pub grouping: Option<String>,
    pub aesthetics_fp: u64,
    pub data_fp: u64,
}

struct CacheEntry {
    /// Stored alongside the figure so a read can detect slot corruption.
    key: CacheKey,
    figure: FigureRequest,
}

/// Hit/miss counters, exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Bounded least-recently-used figure cache.
pub struct FigureCache {
    capacity: usize,
    entries: HashMap<CacheKey, CacheEntry>,
    // Front = least recently used.
    order: VecDeque<CacheKey>,
    stats: CacheStats,
}

impl FigureCache {
    /// Matches the original dashboard's per-figure memo size.
    pub const DEFAULT_CAPACITY: usize = 32;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Look up a figure. A stored entry whose recorded key does not match
    /// the slot is corrupt: it is evicted and reported as a miss, forcing
    /// regeneration.
    pub fn get(&mut self, key: &CacheKey) -> Option<FigureRequest> {
        match self.entries.get(key) {
            Some(entry) if entry.key == *key => {
                let figure = entry.figure.clone();
                self.stats.hits += 1;
                self.touch(key);
                Some(figure)
            }
            Some(_) => {
                warn!("figure cache corruption for {:?}; regenerating", key.view);
                self.remove(key);
                self.stats.misses += 1;
                None
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Insert a figure, evicting the least-recently-used entry when full.
    pub fn put(&mut self, key: CacheKey, figure: FigureRequest) {
        if self.entries.contains_key(&key) {
            self.touch(&key);
            self.entries.insert(
                key.clone(),
                CacheEntry {
                    key,
                    figure,
                },
            );
            return;
        }
        while self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                self.stats.evictions += 1;
                debug!("evicted cached figure for {:?}", oldest.view);
            } else {
                break;
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                figure,
            },
        );
    }

    fn touch(&mut self, key: &CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    fn remove(&mut self, key: &CacheKey) {
        self.entries.remove(key);
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }
}

impl Default for FigureCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
