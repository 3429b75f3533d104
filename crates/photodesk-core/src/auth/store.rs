//! The credential store: sole owner of the session.
//!
//! The store is created once at startup from `TokenStorage` and handed out
//! as a cheap cloneable handle. Every mutation goes through its methods, and
//! every read sees the latest write; there is no cached snapshot anywhere
//! else.
//!
//! Storage writes happen under the same lock as the in-memory change, so
//! concurrent `set_token`/`logout` calls leave storage agreeing with memory.
//! Persistence is still best-effort: a failed write or delete is logged and
//! the in-memory session changes anyway, so a full disk or a locked keychain
//! can leave the persisted token stale until the next successful write.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::UserProfile;

use super::TokenStorage;

/// Snapshot of the session.
#[derive(Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .finish()
    }
}

/// A borrowed copy of the token together with the session generation it
/// belongs to. Requests keep this so a late 401 can be matched to the
/// session that actually signed it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub generation: u64,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("generation", &self.generation)
            .finish()
    }
}

struct State {
    session: Session,
    generation: u64,
}

struct Inner {
    state: RwLock<State>,
    storage: Box<dyn TokenStorage>,
    authenticated: watch::Sender<bool>,
}

/// Handle to the process session. Clone is cheap and every clone refers to
/// the same session.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<Inner>,
}

impl CredentialStore {
    /// Create the store, restoring a previously persisted token if present.
    /// A storage read failure starts the process logged out.
    pub fn open(storage: Box<dyn TokenStorage>) -> Self {
        let token = match storage.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, backend = %storage.kind(), "Failed to read persisted token");
                None
            }
        };
        debug!(restored = token.is_some(), backend = %storage.kind(), "Credential store opened");

        let generation = u64::from(token.is_some());
        let (authenticated, _) = watch::channel(token.is_some());

        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State {
                    session: Session { token, user: None },
                    generation,
                }),
                storage,
                authenticated,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, authenticated: bool) {
        self.inner.authenticated.send_if_modified(|current| {
            if *current == authenticated {
                false
            } else {
                *current = authenticated;
                true
            }
        });
    }

    /// Clear the session held by `state`. Storage and the signal are updated
    /// before the lock is released, so they always match the last writer.
    fn clear(&self, state: &mut State) {
        state.session = Session::default();
        state.generation += 1;
        if let Err(e) = self.inner.storage.remove() {
            warn!(error = %e, backend = %self.inner.storage.kind(), "Failed to remove persisted token");
        }
        self.publish(false);
    }

    /// Store a new token in memory and in durable storage. The profile is
    /// kept; callers fetch a fresh one afterwards.
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        let mut state = self.write();
        if let Err(e) = self.inner.storage.save(&token) {
            warn!(error = %e, backend = %self.inner.storage.kind(), "Failed to persist token");
        }
        state.session.token = Some(token);
        state.generation += 1;
        self.publish(true);
        debug!(generation = state.generation, "Token set");
    }

    /// Replace the profile. Ignored while logged out, since a profile
    /// without a token would outlive the session it describes.
    pub fn set_user(&self, user: UserProfile) -> bool {
        let mut state = self.write();
        if state.session.token.is_none() {
            warn!(user_id = %user.id, "Ignoring profile received without an active session");
            return false;
        }
        state.session.user = Some(user);
        true
    }

    /// Clear token and profile and remove the persisted token. Calling it
    /// while already logged out does nothing.
    pub fn logout(&self) {
        let mut state = self.write();
        if state.session.token.is_none() && state.session.user.is_none() {
            debug!("Logout while already logged out");
            return;
        }
        self.clear(&mut state);
        info!("Logged out");
    }

    /// Log out only if `generation` still identifies the current session.
    /// Returns whether the session was cleared.
    pub fn invalidate(&self, generation: u64) -> bool {
        let mut state = self.write();
        if state.generation != generation || state.session.token.is_none() {
            debug!(
                stale = generation,
                current = state.generation,
                "Ignoring authorization failure from a superseded session"
            );
            return false;
        }
        warn!(generation, "Session rejected by server");
        self.clear(&mut state);
        true
    }

    /// `true` while a token is present. Computed on every call.
    pub fn is_authenticated(&self) -> bool {
        self.read().session.is_authenticated()
    }

    pub fn token(&self) -> Option<String> {
        self.read().session.token.clone()
    }

    pub fn credential(&self) -> Option<Credential> {
        let state = self.read();
        state.session.token.as_ref().map(|token| Credential {
            token: token.clone(),
            generation: state.generation,
        })
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.read().session.user.clone()
    }

    pub fn session(&self) -> Session {
        self.read().session.clone()
    }

    /// Watch the authenticated signal. The receiver sees every change made
    /// through this store.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.authenticated.subscribe()
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("CredentialStore")
            .field("session", &state.session)
            .field("generation", &state.generation)
            .field("backend", &self.inner.storage.kind())
            .finish()
    }
}
