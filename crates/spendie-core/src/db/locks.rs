//! Per-owner write locks

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::Result;

/// Registry of one mutex per owner. Writes for the same owner queue up;
/// different owners never contend beyond the registry lookup.
#[derive(Default)]
pub(crate) struct OwnerLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    fn handle(&self, owner: &str) -> Arc<Mutex<()>> {
        // A panic while holding the registry leaves the map intact
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(owner.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub(crate) fn with_lock<T>(&self, owner: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let handle = self.handle(owner);
        let _guard = handle.lock().unwrap_or_else(|e| e.into_inner());
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_same_owner_is_serialized() {
        let locks = Arc::new(OwnerLocks::default());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                let max_seen = max_seen.clone();
                thread::spawn(move || {
                    locks
                        .with_lock("u1", || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(5));
                            inside.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_owners_get_distinct_locks() {
        let locks = OwnerLocks::default();
        let a = locks.handle("a");
        let b = locks.handle("b");
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &locks.handle("a")));
    }
}
