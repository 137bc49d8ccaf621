//! Per-namespace locks.
//!
//! Every disk check-then-write sequence for a cache namespace runs under
//! that namespace's lock. Different namespaces never contend. Locks are
//! async mutexes so a holder may await disk I/O on the blocking pool.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Lazily populated table of `cache_namespace -> lock`.
#[derive(Debug, Default)]
pub struct NamespaceLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl NamespaceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `namespace`, creating it on first use.
    pub fn lock_for(&self, namespace: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.get(namespace) {
            return Arc::clone(lock.value());
        }
        Arc::clone(
            self.locks
                .entry(namespace.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_namespace_shares_lock() {
        let locks = NamespaceLocks::new();
        let a = locks.lock_for("earth/bmng");
        let b = locks.lock_for("earth/bmng");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn test_different_namespaces_do_not_share() {
        let locks = NamespaceLocks::new();
        let a = locks.lock_for("earth/bmng");
        let b = locks.lock_for("earth/ned");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_held_lock_does_not_block_other_namespace() {
        let locks = NamespaceLocks::new();
        let a = locks.lock_for("a");
        let _guard = a.lock().await;

        assert!(locks.lock_for("a").try_lock().is_err());
        assert!(locks.lock_for("b").try_lock().is_ok());
    }
}
