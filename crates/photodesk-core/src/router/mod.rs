//! Client-side routing.
//!
//! - `RouteTable`: validated route configuration (fail-closed by default)
//! - `NavigationGuard`: the admission decision taken before every transition
//! - `Navigator`: current location and the `navigate` entry point
//!
//! The default table mirrors the application views: two entry routes
//! (login, register), the project listing, and a project workspace.

pub mod guard;
pub mod navigator;
pub mod route;

pub use guard::{Decision, NavigationGuard};
pub use navigator::{Location, Navigation, NavigationError, Navigator, Redirect, RedirectReason};
pub use route::{Access, Route, RouteConfigError, RouteMatch, RouteSpec, RouteTable};

/// Route names used by the application views.
pub mod names {
    pub const LOGIN: &str = "Login";
    pub const REGISTER: &str = "Register";
    pub const PROJECTS: &str = "Projects";
    pub const PROJECT_WORKSPACE: &str = "ProjectWorkspace";
}

/// Where unauthenticated users are sent.
pub const ENTRY_PATH: &str = "/login";

/// Where authenticated users land when leaving an entry route.
pub const HOME_PATH: &str = "/projects";

/// The application route table.
pub fn default_routes() -> Result<RouteTable, RouteConfigError> {
    RouteTable::new(
        vec![
            Route::view("/login", names::LOGIN).public(),
            Route::view("/register", names::REGISTER).public(),
            Route::view("/projects", names::PROJECTS).protected(),
            Route::view("/projects/:id", names::PROJECT_WORKSPACE).protected(),
            Route::redirect("/", HOME_PATH),
        ],
        ENTRY_PATH,
        HOME_PATH,
    )
}
