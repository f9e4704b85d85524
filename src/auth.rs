//! Session gate in front of the store.
//!
//! The store never signs anyone in. It only needs to know whether a session
//! is active, and to hear when that changes.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::remote::RemoteStore;
use crate::store::SyncStore;

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: String,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No session and none can arrive anymore
    NotSignedIn,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::NotSignedIn => write!(
                f,
                "Not signed in. Set remote.access_token or remote.api_key in the config, or CLASSPLAN_ACCESS_TOKEN / CLASSPLAN_API_KEY."
            ),
        }
    }
}

impl std::error::Error for AuthError {}

/// Source of the current session.
pub trait AuthProvider: Send + Sync {
    fn current_session(&self) -> Option<AuthSession>;

    /// Receiver updated on every sign-in and sign-out.
    fn subscribe(&self) -> watch::Receiver<Option<AuthSession>>;
}

/// Provider whose session is set explicitly, e.g. from a configured API key.
#[derive(Debug)]
pub struct StaticAuth {
    session: watch::Sender<Option<AuthSession>>,
}

impl StaticAuth {
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self { session }
    }

    pub fn signed_in(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        let auth = Self::new();
        auth.sign_in(user_id, access_token);
        auth
    }

    pub fn sign_in(&self, user_id: impl Into<String>, access_token: impl Into<String>) {
        let session = AuthSession {
            user_id: user_id.into(),
            access_token: access_token.into(),
        };
        tracing::debug!("Signed in as {}", session.user_id);
        self.session.send_replace(Some(session));
    }

    pub fn sign_out(&self) {
        tracing::debug!("Signed out");
        self.session.send_replace(None);
    }
}

impl Default for StaticAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for StaticAuth {
    fn current_session(&self) -> Option<AuthSession> {
        self.session.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.session.subscribe()
    }
}

async fn wait_for_session(
    rx: &mut watch::Receiver<Option<AuthSession>>,
) -> Result<AuthSession, AuthError> {
    loop {
        let current = rx.borrow_and_update().clone();
        if let Some(session) = current {
            return Ok(session);
        }
        rx.changed().await.map_err(|_| AuthError::NotSignedIn)?;
    }
}

impl SyncStore {
    /// Creates a store and runs the initial load once a session is active.
    pub async fn mount(
        remote: Arc<dyn RemoteStore>,
        auth: &dyn AuthProvider,
    ) -> Result<SyncStore, AuthError> {
        let mut rx = auth.subscribe();
        let session = wait_for_session(&mut rx).await?;
        tracing::info!("Mounting store for {}", session.user_id);

        let store = SyncStore::new(remote);
        store.load().await;
        Ok(store)
    }

    /// Reloads on every sign-in and clears the collections on sign-out.
    ///
    /// The task ends when the provider goes away.
    pub fn follow_auth(&self, auth: &dyn AuthProvider) -> JoinHandle<()> {
        let store = self.clone();
        let mut rx = auth.subscribe();
        rx.mark_unchanged();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let signed_in = rx.borrow_and_update().is_some();
                if signed_in {
                    store.load().await;
                } else {
                    tracing::info!("Session ended, clearing local data");
                    store.apply(|snap| {
                        snap.teachers.clear();
                        snap.assistants.clear();
                        snap.courses.clear();
                        snap.sessions.clear();
                        snap.loading = true;
                    });
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Row;
    use crate::remote::{MemoryStore, Table};
    use serde_json::{json, Value};
    use std::time::Duration;

    fn seeded() -> Arc<MemoryStore> {
        let row = match json!({ "id": "c1", "name": "Algebra" }) {
            Value::Object(row) => row,
            _ => Row::new(),
        };
        Arc::new(MemoryStore::new().with_rows(Table::Courses, vec![row]))
    }

    #[tokio::test]
    async fn test_mount_loads_when_signed_in() {
        let auth = StaticAuth::signed_in("u1", "token");

        let store = SyncStore::mount(seeded(), &auth).await.unwrap();

        assert!(!store.is_loading());
        assert_eq!(store.snapshot().courses.len(), 1);
    }

    #[tokio::test]
    async fn test_mount_waits_for_sign_in() {
        let auth = Arc::new(StaticAuth::new());
        let remote = seeded();

        let mount = {
            let auth = auth.clone();
            let remote = remote.clone();
            tokio::spawn(async move { SyncStore::mount(remote, auth.as_ref()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(remote.log().is_empty());

        auth.sign_in("u1", "token");
        let store = mount.await.unwrap().unwrap();
        assert_eq!(store.snapshot().courses.len(), 1);
    }

    #[tokio::test]
    async fn test_mount_fails_when_provider_dropped() {
        let auth = StaticAuth::new();
        let rx = auth.subscribe();

        struct Detached(watch::Receiver<Option<AuthSession>>);
        impl AuthProvider for Detached {
            fn current_session(&self) -> Option<AuthSession> {
                None
            }
            fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
                self.0.clone()
            }
        }
        let detached = Detached(rx);
        drop(auth);

        let result = SyncStore::mount(seeded(), &detached).await;
        assert_eq!(result.unwrap_err(), AuthError::NotSignedIn);
    }

    #[tokio::test]
    async fn test_follow_auth_clears_and_reloads() {
        let auth = StaticAuth::signed_in("u1", "token");
        let store = SyncStore::mount(seeded(), &auth).await.unwrap();
        let mut snapshots = store.subscribe();
        let _task = store.follow_auth(&auth);

        auth.sign_out();
        snapshots.changed().await.unwrap();
        let cleared = snapshots.borrow_and_update().clone();
        assert!(cleared.courses.is_empty());
        assert!(cleared.loading);

        auth.sign_in("u1", "token");
        loop {
            snapshots.changed().await.unwrap();
            if !snapshots.borrow_and_update().loading {
                break;
            }
        }
        assert_eq!(store.snapshot().courses.len(), 1);
    }
}
