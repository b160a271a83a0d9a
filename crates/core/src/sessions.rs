use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::OwnedMutexGuard;

use crate::domain::order::SessionOrder;
use crate::domain::session::SessionId;

/// In-progress orders keyed by conversation session.
///
/// Handlers take [`SessionStore::lock`] before reading or writing a session's order and keep
/// the returned guard until their reply is composed, so two requests for the same session
/// never interleave. Requests for different sessions do not contend.
#[derive(Debug, Default)]
pub struct SessionStore {
    orders: Mutex<HashMap<SessionId, SessionOrder>>,
    session_locks: Mutex<HashMap<SessionId, Weak<tokio::sync::Mutex<()>>>>,
}

/// Exclusive access to one session for the lifetime of the guard.
#[derive(Debug)]
pub struct SessionLock {
    session_id: SessionId,
    _guard: OwnedMutexGuard<()>,
}

impl SessionLock {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }
}

impl SessionStore {
    const PRUNE_THRESHOLD: usize = 128;

    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, session_id: &SessionId) -> SessionLock {
        let lock = self.session_lock(session_id);
        SessionLock { session_id: session_id.clone(), _guard: lock.lock_owned().await }
    }

    fn session_lock(&self, session_id: &SessionId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = lock_ignoring_poison(&self.session_locks);

        if locks.len() > Self::PRUNE_THRESHOLD {
            locks.retain(|_, weak| weak.strong_count() > 0);
        }

        if let Some(existing) = locks.get(session_id).and_then(Weak::upgrade) {
            return existing;
        }

        let lock = Arc::new(tokio::sync::Mutex::new(()));
        locks.insert(session_id.clone(), Arc::downgrade(&lock));
        lock
    }

    pub fn get(&self, session_id: &SessionId) -> Option<SessionOrder> {
        lock_ignoring_poison(&self.orders).get(session_id).cloned()
    }

    pub fn set(&self, session_id: &SessionId, order: SessionOrder) {
        lock_ignoring_poison(&self.orders).insert(session_id.clone(), order);
    }

    pub fn delete(&self, session_id: &SessionId) -> Option<SessionOrder> {
        lock_ignoring_poison(&self.orders).remove(session_id)
    }

    pub fn exists(&self, session_id: &SessionId) -> bool {
        lock_ignoring_poison(&self.orders).contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        lock_ignoring_poison(&self.orders).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// The maps hold plain data with no cross-entry invariants, so a panic mid-update cannot
// leave them inconsistent.
fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
