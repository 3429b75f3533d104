//! photodesk core library.
//!
//! Session state, navigation guarding, and the authenticated API gateway
//! for the photodesk client, plus the typed project/photo/item requests
//! built on top of them.
//!
//! ```text
//! feature request -> ApiClient (signs with CredentialStore token) -> server
//!                         |
//!                         +-- 401 -> CredentialStore::invalidate
//! navigate(path) -> Navigator -> NavigationGuard(access, store.is_authenticated())
//! ```

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod models;
pub mod router;
pub mod utils;

pub use api::{ApiClient, ApiError, PhotoUpload, RequestOptions};
pub use app::{AppError, Intent, PhotoDesk, View, Visit};
pub use auth::{CredentialStore, Session, StorageKind, TokenStorage};
pub use config::Config;
pub use router::{Access, Decision, Location, Navigation, NavigationGuard, Navigator, Route, RouteTable};
