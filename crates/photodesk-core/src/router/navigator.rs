//! The navigator: current location plus the `navigate` entry point.
//!
//! Each hop of a navigation reads the credential store at that moment, so a
//! token set or cleared just before `navigate` is always seen. The current
//! location only changes once a target is admitted.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info};

use crate::auth::CredentialStore;

use super::guard::{Decision, NavigationGuard};
use super::route::{normalize_path, Access, RouteTable};

/// Upper bound on redirects followed by a single navigation.
const MAX_REDIRECTS: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Navigation to '{path}' exceeded the redirect limit")]
    TooManyRedirects { path: String },
}

/// An admitted location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    /// Route name, or `None` when no route matched.
    pub name: Option<String>,
    pub params: BTreeMap<String, String>,
}

impl Location {
    pub fn is(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    /// The route table maps the path elsewhere (e.g. `/` to the listing).
    Alias,
    /// Protected target, no session.
    NotAuthenticated,
    /// Entry route requested with a live session.
    AlreadyAuthenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub from: String,
    pub to: String,
    pub reason: RedirectReason,
}

/// Outcome of `navigate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub requested: String,
    pub location: Location,
    pub redirects: Vec<Redirect>,
}

impl Navigation {
    pub fn redirected(&self) -> bool {
        self.location.path != self.requested
    }

    /// Whether the guard (as opposed to a table alias) redirected.
    pub fn guarded(&self) -> bool {
        self.redirects
            .iter()
            .any(|r| r.reason != RedirectReason::Alias)
    }
}

pub struct Navigator {
    table: RouteTable,
    guard: NavigationGuard,
    store: CredentialStore,
    current: Option<Location>,
}

impl Navigator {
    pub fn new(table: RouteTable, store: CredentialStore) -> Self {
        let guard = NavigationGuard::new(table.entry_path(), table.home_path());
        Self {
            table,
            guard,
            store,
            current: None,
        }
    }

    /// Resolve `path` through table redirects and the guard, then make the
    /// admitted location current.
    pub fn navigate(&mut self, path: &str) -> Result<Navigation, NavigationError> {
        let requested = normalize_path(path);
        let mut target = requested.clone();
        let mut redirects = Vec::new();

        for _ in 0..=MAX_REDIRECTS {
            let (access, name, params, alias) = match self.table.resolve(&target) {
                Some(m) => (
                    m.access().unwrap_or(Access::Protected),
                    m.route.name().map(str::to_string),
                    m.params.clone(),
                    m.redirect_to().map(str::to_string),
                ),
                None => (Access::Protected, None, BTreeMap::new(), None),
            };

            if let Some(to) = alias {
                redirects.push(Redirect {
                    from: target,
                    to: to.clone(),
                    reason: RedirectReason::Alias,
                });
                target = to;
                continue;
            }

            let authenticated = self.store.is_authenticated();
            match self.guard.decide(access, authenticated) {
                Decision::Admit => {
                    let location = Location {
                        path: target,
                        name,
                        params,
                    };
                    if redirects.is_empty() {
                        debug!(path = %location.path, "Navigation admitted");
                    } else {
                        info!(requested = %requested, admitted = %location.path, "Navigation redirected");
                    }
                    self.current = Some(location.clone());
                    return Ok(Navigation {
                        requested,
                        location,
                        redirects,
                    });
                }
                Decision::Redirect(to) => {
                    let reason = if access.requires_auth() {
                        RedirectReason::NotAuthenticated
                    } else {
                        RedirectReason::AlreadyAuthenticated
                    };
                    redirects.push(Redirect {
                        from: target,
                        to: to.clone(),
                        reason,
                    });
                    target = to;
                }
            }
        }

        Err(NavigationError::TooManyRedirects { path: requested })
    }

    /// Re-run the guard for the current location, e.g. after a logout.
    /// Returns `None` before the first navigation.
    pub fn revalidate(&mut self) -> Option<Result<Navigation, NavigationError>> {
        let path = self.current.as_ref()?.path.clone();
        Some(self.navigate(&path))
    }

    pub fn current(&self) -> Option<&Location> {
        self.current.as_ref()
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }
}
