//! Entity Store - ordered Snowflake → entity mapping with an idempotent factory

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::entities::{Entity, FactoryContext};
use crate::error::ModelError;
use crate::value_objects::Snowflake;

/// Shared handle to a cached entity
pub type EntityRef<T> = Arc<RwLock<T>>;

/// Typed entity store
///
/// Holds at most one live instance per ID. `factory` patches an existing instance in place,
/// so every holder of an [`EntityRef`] observes later updates. A patch that fails leaves the
/// cached value untouched.
///
/// Lock order is store first, entity second. Do not call into the store while holding an
/// entity guard from it.
pub struct Store<T: Entity> {
    inner: RwLock<Inner<T>>,
    limit: Option<usize>,
}

struct Inner<T> {
    entries: HashMap<Snowflake, EntityRef<T>>,
    order: VecDeque<Snowflake>,
}

impl<T> Inner<T> {
    fn insert(&mut self, id: Snowflake, handle: EntityRef<T>, limit: Option<usize>) {
        self.entries.insert(id, handle);
        self.order.push_back(id);

        if let Some(limit) = limit {
            while self.order.len() > limit {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
        }
    }

    fn remove(&mut self, id: Snowflake) -> Option<EntityRef<T>> {
        let removed = self.entries.remove(&id)?;
        self.order.retain(|other| *other != id);
        Some(removed)
    }
}

impl<T: Entity> Store<T> {
    /// Create an unbounded store
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            limit: None,
        }
    }

    /// Create a store that evicts its oldest entries beyond `limit`
    #[must_use]
    pub fn bounded(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    /// Get a cached entity
    pub fn get(&self, id: Snowflake) -> Option<EntityRef<T>> {
        self.inner.read().entries.get(&id).cloned()
    }

    /// Check if an entity is cached
    pub fn has(&self, id: Snowflake) -> bool {
        self.inner.read().entries.contains_key(&id)
    }

    /// Insert or replace an entity
    ///
    /// Replacing overwrites the value behind the existing handle and keeps its position.
    pub fn set(&self, id: Snowflake, entity: T) -> &Self {
        let mut inner = self.inner.write();
        if let Some(existing) = inner.entries.get(&id) {
            *existing.write() = entity;
        } else {
            inner.insert(id, Arc::new(RwLock::new(entity)), self.limit);
        }
        self
    }

    /// Return the cached entity patched with `raw`, or build, insert and return a new one
    pub fn factory(&self, raw: &Value, ctx: &FactoryContext) -> Result<EntityRef<T>, ModelError> {
        let id = T::id_of(raw)?;

        // Held across lookup and insert so concurrent callers converge on one instance
        let mut inner = self.inner.write();
        if let Some(existing) = inner.entries.get(&id) {
            let mut next = existing.read().clone();
            next.patch(raw)?;
            *existing.write() = next;
            tracing::trace!(kind = T::KIND, id = %id, "Patched cached entity");
            return Ok(Arc::clone(existing));
        }

        let handle = Arc::new(RwLock::new(T::from_raw(raw, ctx)?));
        inner.insert(id, Arc::clone(&handle), self.limit);
        tracing::trace!(kind = T::KIND, id = %id, "Cached new entity");
        Ok(handle)
    }

    /// Remove an entity, returning its handle
    pub fn delete(&self, id: Snowflake) -> Option<EntityRef<T>> {
        self.inner.write().remove(id)
    }

    /// Number of cached entities
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// IDs in insertion order
    pub fn ids(&self) -> Vec<Snowflake> {
        self.inner.read().order.iter().copied().collect()
    }

    /// Handles in insertion order
    pub fn values(&self) -> Vec<EntityRef<T>> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.entries.get(id).cloned())
            .collect()
    }

    /// Remove every entity
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Keep only the entities matching `keep`; returns how many were removed
    pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) -> usize {
        let mut inner = self.inner.write();
        let doomed: Vec<Snowflake> = inner
            .entries
            .iter()
            .filter(|(_, handle)| !keep(&handle.read()))
            .map(|(id, _)| *id)
            .collect();

        for id in &doomed {
            inner.remove(*id);
        }
        doomed.len()
    }
}

impl<T: Entity> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("kind", &T::KIND)
            .field("len", &self.len())
            .field("limit", &self.limit)
            .finish()
    }
}
