use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per session name.
///
/// The remote LRO and the edge write token are single-writer resources, so
/// mutating operations on the same session run one at a time.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(name.to_string()).or_default().clone();
        lock.lock_owned().await
    }

    pub fn is_locked(&self, name: &str) -> bool {
        self.locks
            .get(name)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_name_serializes() {
        let locks = SessionLocks::new();

        let guard = locks.lock("s1").await;
        assert!(locks.is_locked("s1"));
        assert!(!locks.is_locked("s2"));

        let _other = locks.lock("s2").await;
        drop(guard);
        assert!(!locks.is_locked("s1"));
    }
}
