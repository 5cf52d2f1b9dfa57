//! Session registry
//!
//! Owns every live [`CallSession`] of a manager. Each session sits behind its
//! own lock; the registry map itself is only held long enough to clone the
//! session's `Arc` out of it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use dring_sdp_core::ActiveMedia;
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::errors::{Result, SessionError};
use crate::session::CallSession;
use crate::types::{AccountId, CallId};

/// Registry entry for one call
pub struct SessionHandle {
    id: CallId,
    account_id: AccountId,
    session: Mutex<CallSession>,
    active: Arc<ArcSwap<ActiveMedia>>,
}

impl SessionHandle {
    fn new(session: CallSession) -> Self {
        Self {
            id: session.id(),
            account_id: session.account_id().to_string(),
            active: session.active_media_handle(),
            session: Mutex::new(session),
        }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Exclusive access to the session
    pub fn lock(&self) -> MutexGuard<'_, CallSession> {
        self.session.lock()
    }

    /// Active media snapshot, readable without the session lock
    pub fn active_media(&self) -> Arc<ActiveMedia> {
        self.active.load_full()
    }
}

#[derive(Debug, Default)]
struct RegistryStats {
    total_created: AtomicUsize,
    total_released: AtomicUsize,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<CallId, Arc<SessionHandle>>,
    stats: RegistryStats,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: CallSession) -> Arc<SessionHandle> {
        let handle = Arc::new(SessionHandle::new(session));
        self.sessions.insert(handle.id(), Arc::clone(&handle));
        self.stats.total_created.fetch_add(1, Ordering::Relaxed);
        debug!("Registered call {} for account {}", handle.id(), handle.account_id());
        handle
    }

    pub fn get(&self, call_id: &CallId) -> Result<Arc<SessionHandle>> {
        self.sessions
            .get(call_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| SessionError::call_not_found(call_id))
    }

    pub fn remove(&self, call_id: &CallId) -> Option<Arc<SessionHandle>> {
        let removed = self.sessions.remove(call_id).map(|(_, handle)| handle);
        if removed.is_some() {
            self.stats.total_released.fetch_add(1, Ordering::Relaxed);
            debug!("Released call {}", call_id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn call_ids(&self) -> Vec<CallId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    pub fn calls_for_account(&self, account_id: &str) -> Vec<CallId> {
        self.sessions
            .iter()
            .filter(|entry| entry.value().account_id() == account_id)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Number of calls registered since creation
    pub fn total_created(&self) -> usize {
        self.stats.total_created.load(Ordering::Relaxed)
    }

    pub fn total_released(&self) -> usize {
        self.stats.total_released.load(Ordering::Relaxed)
    }
}
