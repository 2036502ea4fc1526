//! The credential store.
//!
//! [`CredentialStore`] is the only owner of the access/refresh tokens.
//! It writes them to a session-scoped and/or durable
//! [`KeyValueStore`], reads session first with durable fallback, and
//! broadcasts an argument-less change notification after every
//! mutation so session-aware code can react to login and logout
//! without polling.

use std::sync::Arc;

use portal_models::{CredentialPair, PersistMode, TokenKind};
use strum::IntoEnumIterator;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, MemoryStore};

/// Shared handle to the access/refresh credentials.
///
/// Cloning is cheap; every clone sees the same storage and the same
/// change notifications.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<Inner>,
}

struct Inner {
    session: Arc<dyn KeyValueStore>,
    durable: Arc<dyn KeyValueStore>,
    /// Bumped after every mutation; the value itself carries no meaning.
    changes: watch::Sender<u64>,
    /// Held for the whole refresh exchange so concurrent 401s spend a
    /// rotating refresh token only once.
    renewal: Mutex<()>,
}

impl CredentialStore {
    /// Store over the given session-scoped and durable backends.
    pub fn new(session: Arc<dyn KeyValueStore>, durable: Arc<dyn KeyValueStore>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                session,
                durable,
                changes,
                renewal: Mutex::new(()),
            }),
        }
    }

    /// Store where both scopes live in memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    /// Read one token: session scope first, then durable.
    pub fn get(&self, kind: TokenKind) -> Option<String> {
        let key = kind.storage_key();
        self.inner
            .session
            .get(key)
            .or_else(|| self.inner.durable.get(key))
            .filter(|token| !token.is_empty())
    }

    /// Both tokens as currently visible to readers.
    pub fn credentials(&self) -> CredentialPair {
        CredentialPair {
            access_token: self.get(TokenKind::Access),
            refresh_token: self.get(TokenKind::Refresh),
        }
    }

    /// `true` while an access token is stored.
    pub fn is_authenticated(&self) -> bool {
        self.get(TokenKind::Access).is_some()
    }

    /// Write each present token to the selected scope(s), then notify.
    ///
    /// Absent tokens are left as they are: a refresh response without a
    /// rotated refresh token keeps the old one.  A pair carrying a
    /// refresh token but no access token is refused and nothing changes.
    pub fn set(&self, pair: &CredentialPair, persist: PersistMode) {
        if let Err(e) = pair.validate() {
            warn!(error = %e, "refusing credential pair");
            return;
        }
        for kind in TokenKind::iter() {
            let Some(token) = pair.get(kind) else {
                continue;
            };
            if persist.session() {
                self.inner.session.set(kind.storage_key(), token);
            }
            if persist.durable() {
                self.inner.durable.set(kind.storage_key(), token);
            }
        }
        debug!(%persist, "credentials stored");
        self.notify();
    }

    /// Remove both tokens from both scopes, then notify.
    pub fn clear(&self) {
        for kind in TokenKind::iter() {
            self.inner.session.remove(kind.storage_key());
            self.inner.durable.remove(kind.storage_key());
        }
        debug!("credentials cleared");
        self.notify();
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> CredentialChanges {
        CredentialChanges {
            rx: self.inner.changes.subscribe(),
        }
    }

    /// Serialize refresh exchanges across every clone of this store.
    pub(crate) async fn lock_renewal(&self) -> MutexGuard<'_, ()> {
        self.inner.renewal.lock().await
    }

    fn notify(&self) {
        self.inner.changes.send_modify(|version| *version = version.wrapping_add(1));
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the tokens themselves.
        f.debug_struct("CredentialStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

/// Receiver side of the "credentials changed" notification.
///
/// Notifications that arrive while nobody is waiting are coalesced into
/// one: subscribers are expected to re-read the store, not to count
/// events.
pub struct CredentialChanges {
    rx: watch::Receiver<u64>,
}

impl CredentialChanges {
    /// Wait for the next mutation.  Returns `false` once the store is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Whether a mutation happened since the last [`changed`](Self::changed).
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_store() -> (CredentialStore, Arc<MemoryStore>, Arc<MemoryStore>) {
        let session = Arc::new(MemoryStore::new());
        let durable = Arc::new(MemoryStore::new());
        let store = CredentialStore::new(session.clone(), durable.clone());
        (store, session, durable)
    }

    #[test]
    fn session_scope_wins_over_durable() {
        let (store, session, durable) = split_store();
        durable.set("accessToken", "durable");
        assert_eq!(store.get(TokenKind::Access).as_deref(), Some("durable"));
        session.set("accessToken", "session");
        assert_eq!(store.get(TokenKind::Access).as_deref(), Some("session"));
    }

    #[test]
    fn persist_mode_selects_scopes() {
        let (store, session, durable) = split_store();
        store.set(&CredentialPair::new("a", Some("r".into())), PersistMode::Local);
        assert!(session.is_empty());
        assert_eq!(durable.get("refreshToken").as_deref(), Some("r"));

        store.set(&CredentialPair::new("a2", None), PersistMode::Session);
        assert_eq!(session.get("accessToken").as_deref(), Some("a2"));
        assert!(session.get("refreshToken").is_none());
        // refresh token untouched by a pair that does not carry one
        assert_eq!(store.get(TokenKind::Refresh).as_deref(), Some("r"));
    }

    #[test]
    fn token_kinds_iterate_across_crates() {
        let keys: Vec<_> = TokenKind::iter().map(TokenKind::storage_key).collect();
        assert_eq!(keys, ["accessToken", "refreshToken"]);
    }

    #[test]
    fn clear_empties_both_scopes() {
        let (store, session, durable) = split_store();
        store.set(&CredentialPair::new("a", Some("r".into())), PersistMode::Both);
        store.clear();
        assert!(session.is_empty() && durable.is_empty());
        assert!(!store.is_authenticated());
        assert!(store.credentials().is_empty());
    }

    #[test]
    fn refresh_only_pair_is_refused() {
        let (store, session, durable) = split_store();
        let changes = store.subscribe();
        let orphan = CredentialPair {
            access_token: None,
            refresh_token: Some("r".into()),
        };

        store.set(&orphan, PersistMode::Both);

        assert!(session.is_empty() && durable.is_empty());
        assert!(!changes.has_changed());
    }

    #[tokio::test]
    async fn every_mutation_notifies() {
        let store = CredentialStore::in_memory();
        let mut changes = store.subscribe();
        assert!(!changes.has_changed());

        store.set(&CredentialPair::new("a", None), PersistMode::Both);
        assert!(changes.changed().await);

        store.clear();
        assert!(changes.has_changed());
        assert!(changes.changed().await);

        // clearing an already empty store still notifies
        store.clear();
        assert!(changes.changed().await);
    }

    #[test]
    fn debug_hides_tokens() {
        let store = CredentialStore::in_memory();
        store.set(&CredentialPair::new("secret-token", None), PersistMode::Session);
        let printed = format!("{store:?}");
        assert!(!printed.contains("secret-token"));
    }
}
