use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

/// Number of networks kept in memory unless configured otherwise.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

struct Entry<V> {
    value: Arc<V>,
    last_used: u64,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    tick: u64,
}

/// Bounded id-keyed cache that evicts the least recently used entry.
///
/// The lock is held only for map operations; callers do their own loading
/// outside it, and [`insert`](Self::insert) resolves races by keeping the
/// first value stored.
pub struct NetworkCache<V> {
    capacity: usize,
    inner: Mutex<Inner<V>>,
}

impl<V> NetworkCache<V> {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                tick: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, id: &str) -> Option<Arc<V>> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.tick += 1;
        let tick = inner.tick;
        inner.entries.get_mut(id).map(|entry| {
            entry.last_used = tick;
            Arc::clone(&entry.value)
        })
    }

    /// Stores `value` unless another value is already cached under `id`, and
    /// returns whichever value ends up cached.
    pub fn insert(&self, id: &str, value: V) -> Arc<V> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.tick += 1;
        let tick = inner.tick;

        if let Some(entry) = inner.entries.get_mut(id) {
            entry.last_used = tick;
            return Arc::clone(&entry.value);
        }

        if inner.entries.len() >= self.capacity {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                debug!("Evicting network '{}' from cache", oldest);
                inner.entries.remove(&oldest);
            }
        }

        let value = Arc::new(value);
        inner.entries.insert(
            id.to_string(),
            Entry {
                value: Arc::clone(&value),
                last_used: tick,
            },
        );
        value
    }

    pub fn remove(&self, id: &str) -> Option<Arc<V>> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.entries.remove(id).map(|entry| entry.value)
    }

    pub fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for NetworkCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
