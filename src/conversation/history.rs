//! In-memory session history store
//!
//! Each session record sits behind its own async mutex. The map lock is
//! only held to look up, insert or remove a record, so requests for
//! different sessions never wait on each other, while a caller holding a
//! session guard has that session to itself for the whole
//! read-complete-write cycle.
//!
//! A waiter that acquires a record which was removed while it queued
//! retries against the live entry, so it never reads or writes cleared
//! history.

use crate::providers::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Ordered turns of one session, oldest first
pub type History = Vec<Message>;

/// Exclusive handle on one session's history
pub type SessionGuard = OwnedMutexGuard<History>;

/// Process-wide map from session identifier to bounded history
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<Mutex<History>>>>,
    history_cap: usize,
}

impl SessionStore {
    /// Creates an empty store keeping at most `history_cap` turns per session
    pub fn new(history_cap: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            history_cap,
        }
    }

    /// Maximum turns retained per session
    pub fn history_cap(&self) -> usize {
        self.history_cap
    }

    /// Locks a session's history, creating an empty record if needed
    ///
    /// The returned guard serializes all other callers for the same session
    /// until it is dropped. The guard always belongs to the record that was
    /// in the map when the lock was granted.
    pub async fn lock(&self, session_id: &str) -> SessionGuard {
        loop {
            let record = {
                let mut sessions = self.sessions.lock().await;
                sessions
                    .entry(session_id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
                    .clone()
            };
            let guard = record.lock_owned().await;
            if self.is_live(session_id, &guard).await {
                return guard;
            }
            tracing::debug!(session_id, "Session removed while waiting; retrying on live record");
        }
    }

    /// Releases a guard, dropping the session if nothing was ever stored
    ///
    /// Used on failed turns so a request for an unknown session does not
    /// leave an empty record behind.
    pub async fn release_if_empty(&self, session_id: &str, guard: SessionGuard) {
        if !guard.is_empty() {
            return;
        }
        let mut sessions = self.sessions.lock().await;
        let live = sessions
            .get(session_id)
            .is_some_and(|current| Arc::ptr_eq(current, OwnedMutexGuard::mutex(&guard)));
        if live {
            sessions.remove(session_id);
        }
    }

    /// Removes a session; returns whether it existed
    ///
    /// A turn still in flight for the removed session finishes against the
    /// detached record and its result is dropped. Callers queued behind it
    /// move on to a fresh record.
    pub async fn remove(&self, session_id: &str) -> bool {
        self.sessions.lock().await.remove(session_id).is_some()
    }

    /// Copy of a session's history, `None` if the session does not exist
    pub async fn snapshot(&self, session_id: &str) -> Option<History> {
        let record = self.sessions.lock().await.get(session_id).cloned()?;
        let history = record.lock().await;
        Some(history.clone())
    }

    /// Number of live session records
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    async fn is_live(&self, session_id: &str, guard: &SessionGuard) -> bool {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .is_some_and(|current| Arc::ptr_eq(current, OwnedMutexGuard::mutex(guard)))
    }
}

/// Drops the oldest turns until at most `cap` remain
pub fn truncate_front(history: &mut History, cap: usize) {
    if history.len() > cap {
        let excess = history.len() - cap;
        history.drain(..excess);
    }
}
