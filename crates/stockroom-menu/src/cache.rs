//! Tag-aware LRU cache for built trees.
//!
//! Every entry carries a list of tags. Invalidating a tag drops every entry
//! carrying it, so a permission change can evict all trees that depended on
//! the changed group without knowing their keys.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use crate::error::{MenuError, Result};
use crate::node::TreeViewNode;

/// Tag carried by every tools tree.
pub const TAG_TREE_TOOLS: &str = "tree_tools";

/// Tag carried by every tree that depends on group permissions.
pub const TAG_GROUPS: &str = "groups";

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    /// Entries pushed out by the LRU bound.
    pub evictions: u64,
    /// Entries dropped by tag invalidation.
    pub invalidations: u64,
}

impl TreeCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Entry {
    tree: Vec<TreeViewNode>,
    tags: Vec<String>,
}

struct Inner {
    entries: LruCache<String, Entry>,
    /// tag -> keys carrying it
    tags: HashMap<String, HashSet<String>>,
    stats: TreeCacheStats,
}

impl Inner {
    fn unlink(&mut self, key: &str, tags: &[String]) {
        for tag in tags {
            if let Some(keys) = self.tags.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tags.remove(tag);
                }
            }
        }
    }
}

/// Bounded cache of trees keyed by string.
pub struct TreeCache {
    inner: Mutex<Inner>,
}

impl TreeCache {
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or(MenuError::ZeroCapacity)?;
        Ok(Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                tags: HashMap::new(),
                stats: TreeCacheStats::default(),
            }),
        })
    }

    pub fn get(&self, key: &str) -> Option<Vec<TreeViewNode>> {
        let mut inner = self.inner.lock();
        let tree = inner.entries.get(key).map(|e| e.tree.clone());
        if tree.is_some() {
            inner.stats.hits += 1;
            tracing::debug!(key, "tree cache hit");
        } else {
            inner.stats.misses += 1;
            tracing::debug!(key, "tree cache miss");
        }
        tree
    }

    /// Store `tree` under `key`, replacing any previous entry.
    pub fn insert(&self, key: impl Into<String>, tags: Vec<String>, tree: Vec<TreeViewNode>) {
        let key = key.into();
        let mut inner = self.inner.lock();

        for tag in &tags {
            inner
                .tags
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }

        if let Some((old_key, old)) = inner.entries.push(key.clone(), Entry { tree, tags }) {
            if old_key != key {
                inner.stats.evictions += 1;
                tracing::debug!(key = %old_key, "tree cache eviction");
            }
            // A replaced entry's tags may differ from the new ones.
            let stale: Vec<String> = match inner.entries.peek(&old_key) {
                Some(current) => old
                    .tags
                    .into_iter()
                    .filter(|t| !current.tags.contains(t))
                    .collect(),
                None => old.tags,
            };
            inner.unlink(&old_key, &stale);
        }
        inner.stats.inserts += 1;
    }

    /// Cached tree under `key`, or build, store and return it.
    ///
    /// `build` runs without the lock held; a failed build caches nothing.
    pub fn get_or_insert_with<F>(
        &self,
        key: &str,
        tags: Vec<String>,
        build: F,
    ) -> Result<Vec<TreeViewNode>>
    where
        F: FnOnce() -> Result<Vec<TreeViewNode>>,
    {
        if let Some(tree) = self.get(key) {
            return Ok(tree);
        }
        let tree = build()?;
        self.insert(key, tags, tree.clone());
        Ok(tree)
    }

    /// Drop every entry carrying any of `tags`. Returns how many were dropped.
    pub fn invalidate_tags(&self, tags: &[&str]) -> usize {
        let mut inner = self.inner.lock();
        let keys: HashSet<String> = tags
            .iter()
            .filter_map(|tag| inner.tags.get(*tag))
            .flat_map(|keys| keys.iter().cloned())
            .collect();

        let mut dropped = 0;
        for key in keys {
            if let Some(entry) = inner.entries.pop(&key) {
                inner.unlink(&key, &entry.tags);
                dropped += 1;
            }
        }
        inner.stats.invalidations += dropped as u64;
        if dropped > 0 {
            tracing::debug!(?tags, dropped, "tree cache invalidated");
        }
        dropped
    }

    pub fn remove(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();
        match inner.entries.pop(key) {
            Some(entry) => {
                inner.unlink(key, &entry.tags);
                true
            }
            None => false,
        }
    }

    /// Drop all entries. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.tags.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> TreeCacheStats {
        self.inner.lock().stats
    }
}
