//! Per-key fill-once cache shared between rendering threads.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

type Slot<V> = Arc<OnceCell<Arc<V>>>;

/// A map from alias to a lazily computed value.
///
/// Each key is filled at most once: concurrent callers asking for the same
/// missing key block on a single fill instead of computing it twice. A fill
/// that fails leaves the key empty so a later call can retry.
pub struct Cache<V> {
    slots: Mutex<HashMap<String, Slot<V>>>,
}

impl<V> Cache<V> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the value for `key`, computing it with `fill` on a miss.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: &str,
        fill: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        // Only the slot lookup holds the map lock; the fill runs outside it
        // so different keys load in parallel.
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key.to_string()).or_default())
        };
        slot.get_or_try_init(|| fill().map(Arc::new)).cloned()
    }

    /// Returns the value for `key` if it has been filled.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let slots = self.slots.lock();
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Number of filled keys.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock();
        slots.values().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached value.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }
}

impl<V> Default for Cache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fill_once() {
        let cache = Cache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let v = cache
                .get_or_try_insert_with("a", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(42)
                })
                .unwrap();
            assert_eq!(*v, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_fill_retries() {
        let cache: Cache<i32> = Cache::new();
        assert!(cache.get_or_try_insert_with("a", || Err("boom")).is_err());
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());

        let v = cache.get_or_try_insert_with("a", || Ok::<_, &str>(7)).unwrap();
        assert_eq!(*v, 7);
    }

    #[test]
    fn test_clear() {
        let cache = Cache::new();
        cache.get_or_try_insert_with("a", || Ok::<_, ()>(1)).unwrap();
        cache.get_or_try_insert_with("b", || Ok::<_, ()>(2)).unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_concurrent_fill_once() {
        let cache = Cache::new();
        let calls = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let v = cache
                        .get_or_try_insert_with("shared", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(10));
                            Ok::<_, ()>(String::from("value"))
                        })
                        .unwrap();
                    assert_eq!(v.as_str(), "value");
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
