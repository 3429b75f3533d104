//! The navigation guard.
//!
//! A pure function of the target's access level and the current
//! authenticated flag. It keeps no state between calls; the navigator reads
//! the credential store at decision time and passes the flag in.

use tracing::debug;

use super::route::Access;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Admit,
    Redirect(String),
}

impl Decision {
    pub fn is_admit(&self) -> bool {
        matches!(self, Decision::Admit)
    }
}

#[derive(Debug, Clone)]
pub struct NavigationGuard {
    entry_path: String,
    home_path: String,
}

impl NavigationGuard {
    pub fn new(entry_path: impl Into<String>, home_path: impl Into<String>) -> Self {
        Self {
            entry_path: entry_path.into(),
            home_path: home_path.into(),
        }
    }

    /// | access    | authenticated | outcome           |
    /// |-----------|---------------|-------------------|
    /// | Protected | false         | redirect to entry |
    /// | Public    | true          | redirect to home  |
    /// | Protected | true          | admit             |
    /// | Public    | false         | admit             |
    pub fn decide(&self, access: Access, authenticated: bool) -> Decision {
        let decision = match (access, authenticated) {
            (Access::Protected, false) => Decision::Redirect(self.entry_path.clone()),
            (Access::Public, true) => Decision::Redirect(self.home_path.clone()),
            (Access::Protected, true) | (Access::Public, false) => Decision::Admit,
        };
        debug!(?access, authenticated, ?decision, "Guard decision");
        decision
    }

    pub fn entry_path(&self) -> &str {
        &self.entry_path
    }

    pub fn home_path(&self) -> &str {
        &self.home_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> NavigationGuard {
        NavigationGuard::new("/login", "/projects")
    }

    #[test]
    fn test_decision_table() {
        let g = guard();
        assert_eq!(g.decide(Access::Protected, false), Decision::Redirect("/login".into()));
        assert_eq!(g.decide(Access::Public, true), Decision::Redirect("/projects".into()));
        assert_eq!(g.decide(Access::Protected, true), Decision::Admit);
        assert_eq!(g.decide(Access::Public, false), Decision::Admit);
    }

    #[test]
    fn test_omitted_requires_auth_matches_explicit_true() {
        let g = guard();
        for authenticated in [false, true] {
            assert_eq!(
                g.decide(Access::from_requires_auth(None), authenticated),
                g.decide(Access::from_requires_auth(Some(true)), authenticated),
            );
        }
    }

    #[test]
    fn test_never_admits_mismatched_state() {
        let g = guard();
        assert!(!g.decide(Access::Protected, false).is_admit());
        assert!(!g.decide(Access::Public, true).is_admit());
    }
}
