//! Route descriptors and the validated route table.
//!
//! A route that does not say whether it requires authentication is
//! protected. The conversion from the optional flag to `Access` happens in
//! exactly one place (`Access::from_requires_auth`) and the table refuses
//! configurations that would let the guard loop or fail open.

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use thiserror::Error;

/// Access level of a view route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Requires an authenticated session.
    Protected,
    /// Entry routes (login, register), for logged-out users only.
    Public,
}

impl Access {
    /// Only an explicit `false` makes a route public.
    pub fn from_requires_auth(requires_auth: Option<bool>) -> Self {
        match requires_auth {
            Some(false) => Access::Public,
            Some(true) | None => Access::Protected,
        }
    }

    pub fn requires_auth(self) -> bool {
        matches!(self, Access::Protected)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteConfigError {
    #[error("Invalid route path '{0}'")]
    InvalidPath(String),

    #[error("Route '{0}' is declared more than once")]
    DuplicatePath(String),

    #[error("Redirect route '{0}' cannot declare requires_auth")]
    RedirectWithAccess(String),

    #[error("Redirect from '{from}' points to unknown route '{to}'")]
    UnknownRedirectTarget { from: String, to: String },

    #[error("Redirect from '{from}' points to another redirect '{to}'")]
    RedirectChain { from: String, to: String },

    #[error("No view route matches '{0}'")]
    MissingRoute(String),

    #[error("Entry route '{0}' must have requires_auth: false")]
    EntryNotPublic(String),

    #[error("Home route '{0}' must require authentication")]
    HomeNotProtected(String),
}

/// Route declaration as it appears in configuration files.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteSpec {
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub requires_auth: Option<bool>,
    #[serde(default)]
    pub redirect: Option<String>,
}

/// A route declaration: either a view or a redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    path: String,
    name: Option<String>,
    requires_auth: Option<bool>,
    redirect: Option<String>,
}

impl Route {
    /// A view route. Protected unless marked `public()`.
    pub fn view(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: Some(name.into()),
            requires_auth: None,
            redirect: None,
        }
    }

    pub fn redirect(path: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            requires_auth: None,
            redirect: Some(to.into()),
        }
    }

    pub fn public(self) -> Self {
        self.requires_auth(Some(false))
    }

    pub fn protected(self) -> Self {
        self.requires_auth(Some(true))
    }

    pub fn requires_auth(mut self, requires_auth: Option<bool>) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn access(&self) -> Access {
        Access::from_requires_auth(self.requires_auth)
    }
}

impl From<RouteSpec> for Route {
    fn from(spec: RouteSpec) -> Self {
        Self {
            path: spec.path,
            name: spec.name,
            requires_auth: spec.requires_auth,
            redirect: spec.redirect,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
enum Target {
    View(Access),
    Redirect(String),
}

#[derive(Debug, Clone)]
struct CompiledRoute {
    route: Route,
    pattern: Vec<Segment>,
    target: Target,
}

/// Result of matching a path against the table.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    /// Normalized path that was matched.
    pub path: String,
    pub params: BTreeMap<String, String>,
    access: Option<Access>,
    redirect: Option<&'a str>,
}

impl RouteMatch<'_> {
    /// Access of a view match; `None` for redirects.
    pub fn access(&self) -> Option<Access> {
        self.access
    }

    pub fn redirect_to(&self) -> Option<&str> {
        self.redirect
    }
}

/// Normalize a navigation target: drop query and fragment, collapse
/// repeated and trailing slashes, always start with `/`.
pub fn normalize_path(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let segments: Vec<&str> = path[..end].split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

fn parse_pattern(path: &str) -> Result<Vec<Segment>, RouteConfigError> {
    if !path.starts_with('/') || path.contains(['?', '#']) {
        return Err(RouteConfigError::InvalidPath(path.to_string()));
    }
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix(':') {
            Some("") => Err(RouteConfigError::InvalidPath(path.to_string())),
            Some(param) => Ok(Segment::Param(param.to_string())),
            None => Ok(Segment::Literal(s.to_string())),
        })
        .collect()
}

/// Shape of a pattern with parameter names erased, for duplicate checks.
fn pattern_key(pattern: &[Segment]) -> String {
    let parts: Vec<&str> = pattern
        .iter()
        .map(|s| match s {
            Segment::Literal(l) => l.as_str(),
            Segment::Param(_) => ":",
        })
        .collect();
    format!("/{}", parts.join("/"))
}

fn match_pattern(pattern: &[Segment], path: &str) -> Option<BTreeMap<String, String>> {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if parts.len() != pattern.len() {
        return None;
    }
    let mut params = BTreeMap::new();
    for (segment, part) in pattern.iter().zip(parts) {
        match segment {
            Segment::Literal(lit) if lit == part => {}
            Segment::Literal(_) => return None,
            Segment::Param(name) => {
                params.insert(name.clone(), part.to_string());
            }
        }
    }
    Some(params)
}

/// Validated, ordered route table. Earlier routes win on overlap.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
    entry_path: String,
    home_path: String,
}

impl RouteTable {
    pub fn new(
        routes: Vec<Route>,
        entry_path: impl Into<String>,
        home_path: impl Into<String>,
    ) -> Result<Self, RouteConfigError> {
        let entry_path = normalize_path(&entry_path.into());
        let home_path = normalize_path(&home_path.into());

        let mut seen = HashSet::new();
        let mut compiled = Vec::with_capacity(routes.len());
        for route in routes {
            let pattern = parse_pattern(&route.path)?;
            if !seen.insert(pattern_key(&pattern)) {
                return Err(RouteConfigError::DuplicatePath(route.path.clone()));
            }
            let target = match route.redirect {
                Some(ref to) => {
                    if route.requires_auth.is_some() {
                        return Err(RouteConfigError::RedirectWithAccess(route.path.clone()));
                    }
                    Target::Redirect(normalize_path(to))
                }
                None => Target::View(route.access()),
            };
            compiled.push(CompiledRoute {
                route,
                pattern,
                target,
            });
        }

        let table = Self {
            routes: compiled,
            entry_path,
            home_path,
        };
        table.validate()?;
        Ok(table)
    }

    pub fn from_specs(
        specs: Vec<RouteSpec>,
        entry_path: impl Into<String>,
        home_path: impl Into<String>,
    ) -> Result<Self, RouteConfigError> {
        Self::new(specs.into_iter().map(Route::from).collect(), entry_path, home_path)
    }

    fn validate(&self) -> Result<(), RouteConfigError> {
        for compiled in &self.routes {
            if let Target::Redirect(ref to) = compiled.target {
                match self.resolve(to) {
                    None => {
                        return Err(RouteConfigError::UnknownRedirectTarget {
                            from: compiled.route.path.clone(),
                            to: to.clone(),
                        })
                    }
                    Some(m) if m.redirect.is_some() => {
                        return Err(RouteConfigError::RedirectChain {
                            from: compiled.route.path.clone(),
                            to: to.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        match self.resolve(&self.entry_path).and_then(|m| m.access) {
            None => return Err(RouteConfigError::MissingRoute(self.entry_path.clone())),
            Some(Access::Protected) => {
                return Err(RouteConfigError::EntryNotPublic(self.entry_path.clone()))
            }
            Some(Access::Public) => {}
        }

        match self.resolve(&self.home_path).and_then(|m| m.access) {
            None => Err(RouteConfigError::MissingRoute(self.home_path.clone())),
            Some(Access::Public) => Err(RouteConfigError::HomeNotProtected(self.home_path.clone())),
            Some(Access::Protected) => Ok(()),
        }
    }

    /// Find the first route matching `path`.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        let path = normalize_path(path);
        self.routes.iter().find_map(|compiled| {
            match_pattern(&compiled.pattern, &path).map(|params| {
                let (access, redirect) = match compiled.target {
                    Target::View(access) => (Some(access), None),
                    Target::Redirect(ref to) => (None, Some(to.as_str())),
                };
                RouteMatch {
                    route: &compiled.route,
                    path: path.clone(),
                    params,
                    access,
                    redirect,
                }
            })
        })
    }

    /// Access level the guard applies to `path`. Redirects report their
    /// target's level; unknown paths are protected.
    pub fn access_for(&self, path: &str) -> Access {
        match self.resolve(path) {
            Some(m) => match (m.access, m.redirect) {
                (Some(access), _) => access,
                (None, Some(to)) => self
                    .resolve(to)
                    .and_then(|t| t.access)
                    .unwrap_or(Access::Protected),
                (None, None) => Access::Protected,
            },
            None => Access::Protected,
        }
    }

    pub fn entry_path(&self) -> &str {
        &self.entry_path
    }

    pub fn home_path(&self) -> &str {
        &self.home_path
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().map(|c| &c.route)
    }
}
