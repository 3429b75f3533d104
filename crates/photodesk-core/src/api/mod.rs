//! REST API gateway for the photodesk service.
//!
//! `ApiClient` is the only place requests are built. It signs every call
//! with the current bearer token (unless the call is anonymous), classifies
//! failures into `ApiError`, and clears the session when the server rejects
//! the token that signed a request.
//!
//! Feature wrappers live beside it:
//! - `auth`: register, login, current user
//! - `projects`: project CRUD
//! - `photos`: project-scoped photo upload, listing, download, deletion
//! - `items`: item CRUD

pub mod auth;
pub mod client;
pub mod error;
pub mod items;
pub mod photos;
pub mod projects;

pub use client::{ApiClient, RequestOptions};
pub use error::ApiError;
pub use photos::PhotoUpload;
