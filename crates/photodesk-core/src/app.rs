//! Application facade for photodesk.
//!
//! `PhotoDesk` owns the configuration, the credential store, the API
//! gateway, and the navigator, and implements the flows that touch more
//! than one of them: login, register-then-login, profile restore, and
//! loading a view's data once the guard has admitted it.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::Context;
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::projects::DEFAULT_PAGE_SIZE;
use crate::api::{ApiClient, ApiError, PhotoUpload};
use crate::auth::{open_storage, CredentialStore, TokenStorage};
use crate::config::Config;
use crate::models::{LoginRequest, Photo, Project, RegisterRequest, UserProfile};
use crate::router::{
    default_routes, names, Location, Navigation, NavigationError, Navigator, RouteConfigError,
};

// ============================================================================
// Constants
// ============================================================================

/// Maximum concurrent requests for bulk photo operations.
/// Limits parallel requests to avoid overwhelming the server.
const MAX_CONCURRENT_REQUESTS: usize = 4;

/// Maximum length for email input.
const MAX_EMAIL_LENGTH: usize = 254;

/// Shown when the server rejects a login without saying why.
const INCORRECT_CREDENTIALS: &str = "Incorrect email or password";

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

// ============================================================================
// Errors
// ============================================================================

/// Request intents that must not run twice at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Login,
    Register,
}

impl Intent {
    /// Login and registration both end in `set_token`, so neither may start
    /// while the other is pending.
    fn conflicts_with(self, other: Intent) -> bool {
        matches!(
            (self, other),
            (Intent::Login | Intent::Register, Intent::Login | Intent::Register)
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Login => f.write_str("login"),
            Intent::Register => f.write_str("registration"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error("Invalid route table: {0}")]
    Routes(#[from] RouteConfigError),

    #[error("A {0} request is already in progress")]
    AlreadyInFlight(Intent),

    /// The server refused the email/password pair.
    #[error("{0}")]
    InvalidCredentials(String),

    #[error("Logged out before the login completed")]
    SessionEnded,

    #[error("{0}")]
    InvalidInput(String),

    #[error("File error on {}: {source}", .path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl AppError {
    /// Message suitable for showing next to a form.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api(ApiError::Unauthorized(_)) => "Session expired. Please log in again.".to_string(),
            AppError::Api(ApiError::Network(e)) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            AppError::Api(ApiError::Network(_)) => {
                "Unable to connect to server. Check your connection.".to_string()
            }
            other => other.to_string(),
        }
    }
}

// ============================================================================
// In-flight tracking
// ============================================================================

#[derive(Default)]
struct InFlight {
    active: Mutex<HashSet<Intent>>,
}

impl InFlight {
    fn begin(&self, intent: Intent) -> Result<InFlightGuard<'_>, AppError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(&pending) = active.iter().find(|a| a.conflicts_with(intent)) {
            warn!(%intent, %pending, "Rejecting request while another is in progress");
            return Err(AppError::AlreadyInFlight(pending));
        }
        active.insert(intent);
        Ok(InFlightGuard {
            owner: self,
            intent,
        })
    }
}

struct InFlightGuard<'a> {
    owner: &'a InFlight,
    intent: Intent,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.intent);
    }
}

// ============================================================================
// Views
// ============================================================================

/// Data loaded for an admitted location.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Login,
    Register,
    Projects(Vec<Project>),
    Workspace { project: Project, photos: Vec<Photo> },
    NotFound,
}

/// A completed navigation and the data of the view it landed on.
#[derive(Debug, Clone)]
pub struct Visit {
    pub navigation: Navigation,
    pub view: View,
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct PhotoDesk {
    config: Config,
    store: CredentialStore,
    api: ApiClient,
    navigator: Navigator,
    in_flight: InFlight,
}

impl PhotoDesk {
    /// Create the application with the token storage named by `config`.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let data_dir = config.data_dir().context("Failed to locate data directory")?;
        let storage = open_storage(config.token_storage, &data_dir);
        Ok(Self::with_storage(config, storage)?)
    }

    pub fn with_storage(config: Config, storage: Box<dyn TokenStorage>) -> Result<Self, AppError> {
        let store = CredentialStore::open(storage);
        let api = ApiClient::with_timeout(&config.api_base_url, config.request_timeout(), store.clone())?;
        let navigator = Navigator::new(default_routes()?, store.clone());
        debug!(api = %config.api_base_url, authenticated = store.is_authenticated(), "PhotoDesk created");

        Ok(Self {
            config,
            store,
            api,
            navigator,
            in_flight: InFlight::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn current(&self) -> Option<&Location> {
        self.navigator.current()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    fn validate_credentials(email: &str, password: &str) -> Result<(), AppError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::InvalidInput("Email and password required".to_string()));
        }
        if email.len() > MAX_EMAIL_LENGTH || password.len() > MAX_PASSWORD_LENGTH {
            return Err(AppError::InvalidInput("Email or password too long".to_string()));
        }
        Ok(())
    }

    /// Log in and fetch the profile. Rejected while another login or a
    /// registration is pending.
    ///
    /// If the profile fetch fails for any reason other than Unauthorized,
    /// the token stays stored and the error is returned; `restore_user` can
    /// retry the fetch later.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, AppError> {
        Self::validate_credentials(email, password)?;
        let _guard = self.in_flight.begin(Intent::Login)?;
        self.authenticate(email, password).await
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<UserProfile, AppError> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };

        let token = match self.api.login(&request).await {
            Ok(token) => token,
            // Anonymous request: a 401 here is about the password, not a session
            Err(ApiError::Unauthorized(detail)) => {
                warn!(reason = %detail, "Login rejected");
                let message = if detail.is_empty() {
                    INCORRECT_CREDENTIALS.to_string()
                } else {
                    detail
                };
                return Err(AppError::InvalidCredentials(message));
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                return Err(e.into());
            }
        };
        self.store.set_token(token.access_token);

        let user = self.api.current_user().await?;
        if !self.store.set_user(user.clone()) {
            warn!(user_id = %user.id, "Session ended while the profile was loading");
            return Err(AppError::SessionEnded);
        }
        info!(user_id = %user.id, "Login successful");
        Ok(user)
    }

    /// Create an account, then log in with the same credentials.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<UserProfile, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput("Name required".to_string()));
        }
        Self::validate_credentials(email, password)?;
        let _guard = self.in_flight.begin(Intent::Register)?;

        let request = RegisterRequest {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let created = self.api.register(&request).await?;
        info!(user_id = %created.id, "Registered");

        self.authenticate(&request.email, password).await
    }

    /// Fetch the profile for a restored token if it is not known yet.
    pub async fn restore_user(&self) -> Result<Option<UserProfile>, AppError> {
        if !self.store.is_authenticated() {
            return Ok(None);
        }
        if let Some(user) = self.store.user() {
            return Ok(Some(user));
        }
        let user = self.api.current_user().await?;
        self.store.set_user(user.clone());
        Ok(Some(user))
    }

    pub fn logout(&self) {
        self.store.logout();
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Navigate, then load the admitted view's data. Nothing is requested
    /// for a location the guard did not admit.
    pub async fn navigate(&mut self, path: &str) -> Result<Visit, AppError> {
        let navigation = self.navigator.navigate(path)?;
        let view = self.load_view(&navigation.location).await?;
        Ok(Visit { navigation, view })
    }

    async fn load_view(&self, location: &Location) -> Result<View, AppError> {
        let Some(name) = location.name.as_deref() else {
            return Ok(View::NotFound);
        };
        match name {
            names::LOGIN => Ok(View::Login),
            names::REGISTER => Ok(View::Register),
            names::PROJECTS => {
                let projects = self.api.list_projects(DEFAULT_PAGE_SIZE, 0).await?;
                Ok(View::Projects(projects))
            }
            names::PROJECT_WORKSPACE => {
                let id = location.param("id").unwrap_or_default();
                let (project, photos) = futures::try_join!(
                    self.api.get_project(id),
                    self.api.list_photos(id, DEFAULT_PAGE_SIZE, 0),
                )?;
                Ok(View::Workspace { project, photos })
            }
            _ => Ok(View::NotFound),
        }
    }

    // =========================================================================
    // Bulk photo operations
    // =========================================================================

    /// Read files from disk and upload them into a project in one request.
    pub async fn upload_files(&self, project_id: &str, paths: &[PathBuf]) -> Result<Vec<String>, AppError> {
        let reads = paths.iter().map(|path| async move {
            PhotoUpload::from_path(path).await.map_err(|source| AppError::File {
                path: path.clone(),
                source,
            })
        });
        let uploads = futures::future::try_join_all(reads).await?;
        Ok(self.api.upload_photos(project_id, uploads).await?)
    }

    /// Delete several photos with bounded concurrency. Results keep the
    /// order of `photo_ids`.
    pub async fn delete_photos(
        &self,
        project_id: &str,
        photo_ids: &[String],
    ) -> Vec<(String, Result<(), ApiError>)> {
        stream::iter(photo_ids.iter().cloned())
            .map(|id| async move {
                let result = self.api.delete_photo(project_id, &id).await;
                (id, result)
            })
            .buffered(MAX_CONCURRENT_REQUESTS)
            .collect()
            .await
    }

    /// Write a photo's bytes to `dest`.
    pub async fn save_photo(&self, project_id: &str, photo_id: &str, dest: &Path) -> Result<usize, AppError> {
        let bytes = self.api.download_photo(project_id, photo_id).await?;
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|source| AppError::File {
                path: dest.to_path_buf(),
                source,
            })?;
        Ok(bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStorage;

    fn desk() -> PhotoDesk {
        let config = Config {
            api_base_url: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        PhotoDesk::with_storage(config, Box::new(MemoryTokenStorage::default())).unwrap()
    }

    #[test]
    fn test_in_flight_guard_releases_on_drop() {
        let in_flight = InFlight::default();
        {
            let _guard = in_flight.begin(Intent::Login).unwrap();
            assert!(matches!(
                in_flight.begin(Intent::Login),
                Err(AppError::AlreadyInFlight(Intent::Login))
            ));
            // Registration also logs in, so it waits for the pending login
            assert!(matches!(
                in_flight.begin(Intent::Register),
                Err(AppError::AlreadyInFlight(Intent::Login))
            ));
        }
        assert!(in_flight.begin(Intent::Register).is_ok());
        assert!(in_flight.begin(Intent::Login).is_ok());
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let desk = desk();
        assert!(matches!(desk.login("", "pw").await, Err(AppError::InvalidInput(_))));
        assert!(matches!(desk.login("a@b.c", "").await, Err(AppError::InvalidInput(_))));
        let long = "p".repeat(MAX_PASSWORD_LENGTH + 1);
        assert!(matches!(desk.login("a@b.c", &long).await, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_register_requires_name() {
        let desk = desk();
        assert!(matches!(
            desk.register("  ", "a@b.c", "pw").await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_entry_views_need_no_requests() {
        // The base URL is unreachable, so any request would fail.
        let mut desk = desk();
        let visit = desk.navigate("/projects").await.unwrap();
        assert_eq!(visit.navigation.location.path, "/login");
        assert_eq!(visit.view, View::Login);

        let visit = desk.navigate("/register").await.unwrap();
        assert_eq!(visit.view, View::Register);
    }

    #[tokio::test]
    async fn test_restore_user_when_logged_out() {
        let desk = desk();
        assert_eq!(desk.restore_user().await.unwrap(), None);
    }

    #[test]
    fn test_user_message() {
        assert_eq!(
            AppError::Api(ApiError::Unauthorized(String::new())).user_message(),
            "Session expired. Please log in again."
        );
        assert_eq!(
            AppError::InvalidInput("Name required".to_string()).user_message(),
            "Name required"
        );
    }
}
