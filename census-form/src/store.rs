//! Durable storage for session snapshots.

use std::sync::Arc;

use dashmap::DashMap;

use crate::session::{SessionId, SessionSnapshot};

/// Persists session snapshots.
///
/// `commit` must be atomic: after it returns, either the whole snapshot is
/// stored or the previous one still is.
pub trait SessionStore: Send + Sync {
    /// The error type for this store.
    type Error: Into<anyhow::Error>;

    /// Replace the stored snapshot of a session.
    fn commit(&self, id: SessionId, snapshot: &SessionSnapshot) -> Result<(), Self::Error>;

    /// Load a session's snapshot, if one is stored.
    fn load(&self, id: SessionId) -> Result<Option<SessionSnapshot>, Self::Error>;

    /// Delete a session's snapshot.
    fn remove(&self, id: SessionId) -> Result<(), Self::Error>;
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    type Error = T::Error;

    fn commit(&self, id: SessionId, snapshot: &SessionSnapshot) -> Result<(), Self::Error> {
        (**self).commit(id, snapshot)
    }

    fn load(&self, id: SessionId) -> Result<Option<SessionSnapshot>, Self::Error> {
        (**self).load(id)
    }

    fn remove(&self, id: SessionId) -> Result<(), Self::Error> {
        (**self).remove(id)
    }
}

/// An in-process store holding snapshots as JSON.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: DashMap<SessionId, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl SessionStore for MemoryStore {
    type Error = serde_json::Error;

    fn commit(&self, id: SessionId, snapshot: &SessionSnapshot) -> Result<(), Self::Error> {
        let json = snapshot.to_json()?;
        self.snapshots.insert(id, json);
        Ok(())
    }

    fn load(&self, id: SessionId) -> Result<Option<SessionSnapshot>, Self::Error> {
        self.snapshots
            .get(&id)
            .map(|json| SessionSnapshot::from_json(&json))
            .transpose()
    }

    fn remove(&self, id: SessionId) -> Result<(), Self::Error> {
        self.snapshots.remove(&id);
        Ok(())
    }
}
