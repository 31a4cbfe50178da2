use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Registry of per-project mutexes. Multi-step transitions hold the
/// project's guard from first read to final pointer update.
#[derive(Debug, Clone, Default)]
pub struct ProjectLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutex guarding `project_id`; the same id always yields the same mutex.
    pub fn handle(&self, project_id: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry(project_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the registry entry once a project is gone.
    pub fn forget(&self, project_id: &str) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.remove(project_id);
    }
}

/// Locks a handle from [`ProjectLocks::handle`]. A guard poisoned by a
/// panicking holder is recovered; the protected state lives on disk.
pub fn acquire(handle: &Mutex<()>) -> MutexGuard<'_, ()> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::{ProjectLocks, acquire};
    use std::sync::Arc;

    #[test]
    fn same_project_shares_one_mutex() {
        let locks = ProjectLocks::new();
        let a = locks.handle("p1");
        let b = locks.handle("p1");
        let c = locks.handle("p2");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn held_guard_blocks_only_its_project() {
        let locks = ProjectLocks::new();
        let a = locks.handle("p1");
        let _guard = acquire(&a);
        assert!(locks.handle("p1").try_lock().is_err());
        assert!(locks.handle("p2").try_lock().is_ok());
    }
}
