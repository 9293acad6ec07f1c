//! SessionKey, SessionRecord, and the registry that maps one to the
//! other (§3, §4.D).

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use serde_derive::Serialize;
use sha1::{Digest, Sha1};

use crate::netconf::NetconfSession;

/// Hex SHA-1 of host+port+device session-id. Collision-resistant in
/// practice, not by construction; see `SessionRegistry::insert`.
pub type SessionKey = String;

pub fn compute_session_key(host: &str, port: &str, device_session_id: &str) -> SessionKey {
    let mut hasher = Sha1::new();
    hasher.update(host.as_bytes());
    hasher.update(port.as_bytes());
    hasher.update(device_session_id.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct Hello {
    pub sid: String,
    pub version: String,
    pub host: String,
    pub port: String,
    pub user: String,
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub eventtime: String,
    pub content: String,
}

/// A single pending-notification FIFO, capped at
/// `consts::NOTIFICATION_QUEUE_CAPACITY` with a drop-oldest overflow
/// policy (§9).
#[derive(Default)]
pub struct NotificationQueue {
    events: VecDeque<NotificationEvent>,
    pub dropped: u64,
}

impl NotificationQueue {
    pub fn push(&mut self, event: NotificationEvent) {
        if self.events.len() >= crate::consts::NOTIFICATION_QUEUE_CAPACITY {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<NotificationEvent> {
        self.events.drain(..).collect()
    }
}

/// Mutable state guarded by a `SessionRecord`'s lock: the live
/// handle, the cached hello, the notification queue, and the
/// subscribed/closed flags.
pub struct SessionState {
    pub nc: Option<NetconfSession>,
    pub hello: Option<Hello>,
    pub notifications: NotificationQueue,
    pub subscribed: bool,
    pub closed: bool,
}

pub struct SessionRecord {
    pub state: Mutex<SessionState>,
    pub last_activity: Mutex<Instant>,
}

impl SessionRecord {
    pub fn new(nc: NetconfSession, hello: Hello) -> SessionRecord {
        SessionRecord {
            state: Mutex::new(SessionState {
                nc: Some(nc),
                hello: Some(hello),
                notifications: NotificationQueue::default(),
                subscribed: false,
                closed: false,
            }),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    #[cfg(test)]
    pub fn new_empty_for_test() -> SessionRecord {
        SessionRecord {
            state: Mutex::new(SessionState {
                nc: None,
                hello: None,
                notifications: NotificationQueue::default(),
                subscribed: false,
                closed: false,
            }),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    /// A record standing in for a connected session that never exercises
    /// the real NETCONF transport: `nc` stays `None`, so any handler that
    /// tries to send an RPC on it reports "Invalid session identifier.",
    /// same as a torn-down record would. Handlers that only consult the
    /// cached `hello` (INFO) or operate on the registry entry itself
    /// (DISCONNECT) work normally. Used by the dispatch-loop tests as a
    /// fake NETCONF backend.
    #[cfg(test)]
    pub fn new_with_hello_for_test(hello: Hello) -> SessionRecord {
        SessionRecord {
            state: Mutex::new(SessionState {
                nc: None,
                hello: Some(hello),
                notifications: NotificationQueue::default(),
                subscribed: false,
                closed: false,
            }),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    pub fn touch(&self) {
        let mut last = self.last_activity.lock().unwrap();
        *last = Instant::now();
    }

    pub fn idle_for(&self) -> std::time::Duration {
        self.last_activity.lock().unwrap().elapsed()
    }

    /// Tears the record down in place: frees `nc`, marks closed. The
    /// record must already have been removed from the registry before
    /// this is called (§3 lifecycle: remove, then teardown).
    pub fn teardown(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some(mut nc) = state.nc.take() {
            nc.close();
        }
        state.hello = None;
        state.closed = true;
    }
}

/// SessionKey -> Arc<SessionRecord>, guarded by a reader-writer lock.
/// See §4.D for the operation contract and the registry->record lock
/// ordering rule.
#[derive(Default)]
pub struct SessionRegistry {
    inner: RwLock<HashMap<SessionKey, Arc<SessionRecord>>>,
}

#[derive(Debug)]
pub enum InsertError {
    DuplicateSession,
}

impl SessionRegistry {
    pub fn new() -> SessionRegistry {
        SessionRegistry::default()
    }

    pub fn insert(&self, key: SessionKey, record: Arc<SessionRecord>) -> Result<(), InsertError> {
        let mut map = self.inner.write().unwrap();
        if map.contains_key(&key) {
            return Err(InsertError::DuplicateSession);
        }
        map.insert(key, record);
        Ok(())
    }

    pub fn lookup(&self, key: &str) -> Option<Arc<SessionRecord>> {
        let map = self.inner.read().unwrap();
        map.get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<Arc<SessionRecord>> {
        let mut map = self.inner.write().unwrap();
        map.remove(key)
    }

    /// Write-locks for the duration of the sweep since idle-sweep and
    /// shutdown may remove entries while iterating (§4.D).
    pub fn sweep_idle(&self, timeout: std::time::Duration) -> Vec<Arc<SessionRecord>> {
        let mut map = self.inner.write().unwrap();
        let mut reaped = Vec::new();
        map.retain(|_, record| {
            if record.idle_for() > timeout {
                reaped.push(Arc::clone(record));
                false
            } else {
                true
            }
        });
        reaped
    }

    /// Removes and returns every record, for use at shutdown.
    pub fn drain_all(&self) -> Vec<Arc<SessionRecord>> {
        let mut map = self.inner.write().unwrap();
        map.drain().map(|(_, v)| v).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_is_deterministic() {
        let a = compute_session_key("10.0.0.1", "830", "42");
        let b = compute_session_key("10.0.0.1", "830", "42");
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
    }

    #[test]
    fn session_key_varies_with_inputs() {
        let a = compute_session_key("10.0.0.1", "830", "42");
        let b = compute_session_key("10.0.0.2", "830", "42");
        assert_ne!(a, b);
    }

    #[test]
    fn notification_queue_drops_oldest_on_overflow() {
        let mut q = NotificationQueue::default();
        for i in 0..15 {
            q.push(NotificationEvent { eventtime: format!("t{}", i), content: String::new() });
        }
        assert_eq!(q.dropped, 5);
        let drained = q.drain();
        assert_eq!(drained.len(), 10);
        assert_eq!(drained[0].eventtime, "t5");
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let registry = SessionRegistry::new();
        let key = compute_session_key("10.0.0.1", "830", "1");
        registry.insert(key.clone(), Arc::new(SessionRecord::new_empty_for_test())).unwrap();
        let err = registry.insert(key, Arc::new(SessionRecord::new_empty_for_test()));
        assert!(matches!(err, Err(InsertError::DuplicateSession)));
    }

    #[test]
    fn lookup_after_remove_is_none() {
        let registry = SessionRegistry::new();
        let key = compute_session_key("10.0.0.1", "830", "1");
        registry.insert(key.clone(), Arc::new(SessionRecord::new_empty_for_test())).unwrap();
        assert!(registry.lookup(&key).is_some());
        assert!(registry.remove(&key).is_some());
        assert!(registry.lookup(&key).is_none());
    }

    #[test]
    fn sweep_idle_reaps_only_stale_records() {
        let registry = SessionRegistry::new();
        let fresh_key = compute_session_key("10.0.0.1", "830", "1");
        let stale_key = compute_session_key("10.0.0.2", "830", "2");
        registry.insert(fresh_key.clone(), Arc::new(SessionRecord::new_empty_for_test())).unwrap();

        let stale = Arc::new(SessionRecord::new_empty_for_test());
        *stale.last_activity.lock().unwrap() = Instant::now() - std::time::Duration::from_secs(7200);
        registry.insert(stale_key.clone(), stale).unwrap();

        let reaped = registry.sweep_idle(std::time::Duration::from_secs(3600));
        assert_eq!(reaped.len(), 1);
        assert!(registry.lookup(&fresh_key).is_some());
        assert!(registry.lookup(&stale_key).is_none());
    }
}
