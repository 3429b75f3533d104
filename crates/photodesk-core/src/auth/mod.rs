//! Authentication state for the photodesk client.
//!
//! This module provides:
//! - `CredentialStore`: the single owner of the session (token + profile)
//! - `TokenStorage`: durable storage for the `access_token` key, backed by a
//!   JSON file, the OS keychain, or memory
//!
//! Only the token is persisted; the profile is re-fetched every session.

pub mod storage;
pub mod store;

pub use storage::{
    open_storage, FileTokenStorage, KeyringTokenStorage, MemoryTokenStorage, StorageError,
    StorageKind, TokenStorage, ACCESS_TOKEN_KEY,
};
pub use store::{Credential, CredentialStore, Session};
