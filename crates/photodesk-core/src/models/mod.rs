//! Data models for photodesk entities.
//!
//! This module contains the wire and domain types exchanged with the
//! photodesk API:
//!
//! - `UserProfile` and the auth request/response payloads
//! - `Project`, `ProjectCreate`: project-scoped photo collections
//! - `Photo`: photo metadata within a project
//! - `Item`, `ItemCreate`, `ItemUpdate`: free-standing notes

pub mod item;
pub mod photo;
pub mod project;
pub mod timestamp;
pub mod user;

pub use item::{Item, ItemCreate, ItemUpdate};
pub use photo::{Photo, PhotoList, UploadedPhotos};
pub use project::{Project, ProjectCreate};
pub use user::{LoginRequest, RegisterRequest, TokenResponse, UserProfile};
