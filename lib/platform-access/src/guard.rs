//! Route guards for role-scoped page trees.

use crate::role::{Role, RouteScope};
use crate::routes::{AUTH_PATH, LOGIN_PATH};
use crate::session::Session;

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session is not settled; show a loading state.
    Loading,
    /// Render the guarded page.
    Render,
    /// Send the visitor elsewhere.
    Redirect(&'static str),
}

/// Access check in front of a page tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    allowed_roles: Vec<Role>,
    unauthenticated_redirect: &'static str,
}

impl RouteGuard {
    /// Creates a guard admitting `allowed_roles` (plus admins).
    ///
    /// An empty set makes a public guard.
    #[must_use]
    pub fn new(allowed_roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed_roles: allowed_roles.into_iter().collect(),
            unauthenticated_redirect: AUTH_PATH,
        }
    }

    /// A guard that performs no check.
    #[must_use]
    pub fn public() -> Self {
        Self::new(std::iter::empty())
    }

    /// A guard admitting any signed-in visitor; anonymous visitors go to
    /// the login page.
    #[must_use]
    pub fn members() -> Self {
        Self::new(Role::ALL).with_unauthenticated_redirect(LOGIN_PATH)
    }

    /// The guard for a role-scoped subtree.
    #[must_use]
    pub fn for_scope(scope: RouteScope) -> Self {
        Self::new(scope.allowed_roles().iter().copied())
    }

    /// The guard for the subtree `path` belongs to.
    #[must_use]
    pub fn for_path(path: &str) -> Self {
        Self::for_scope(RouteScope::of_path(path))
    }

    /// Sets where anonymous visitors are sent.
    #[must_use]
    pub fn with_unauthenticated_redirect(mut self, path: &'static str) -> Self {
        self.unauthenticated_redirect = path;
        self
    }

    /// Returns the admitted roles.
    #[must_use]
    pub fn allowed_roles(&self) -> &[Role] {
        &self.allowed_roles
    }

    /// Returns true if no check is performed.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.allowed_roles.is_empty()
    }

    /// Decides whether `session` may see the guarded page.
    #[must_use]
    pub fn check(&self, session: &Session) -> GuardDecision {
        if !session.is_settled() {
            return GuardDecision::Loading;
        }
        if self.is_public() {
            return GuardDecision::Render;
        }
        match session.effective_role() {
            None => GuardDecision::Redirect(self.unauthenticated_redirect),
            Some(role) if role.is_admin() || self.allowed_roles.contains(&role) => {
                GuardDecision::Render
            }
            Some(role) => GuardDecision::Redirect(role.landing_path()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use agrokart_core::IdentityId;

    fn session(role: Option<Role>, preference: Option<Role>) -> Session {
        let mut session = Session::unsettled(preference);
        let identity =
            Identity::new(IdentityId::from("uid-3"), "devi@example.com", None).with_role(role);
        session.apply_identity(Some(identity));
        session
    }

    fn anonymous(preference: Option<Role>) -> Session {
        let mut session = Session::unsettled(preference);
        session.apply_identity(None);
        session
    }

    fn every_session() -> Vec<Session> {
        let mut sessions = Vec::new();
        for preference in std::iter::once(None).chain(Role::ALL.map(Some)) {
            sessions.push(Session::unsettled(preference));
            sessions.push(anonymous(preference));
            for role in std::iter::once(None).chain(Role::ALL.map(Some)) {
                sessions.push(session(role, preference));
            }
        }
        sessions
    }

    #[test]
    fn public_guard_never_redirects() {
        let guard = RouteGuard::public();
        for session in every_session() {
            assert!(!matches!(guard.check(&session), GuardDecision::Redirect(_)));
        }
    }

    #[test]
    fn unsettled_session_never_redirects() {
        let guards = [
            RouteGuard::public(),
            RouteGuard::members(),
            RouteGuard::for_scope(RouteScope::Vendor),
            RouteGuard::for_scope(RouteScope::Delivery),
            RouteGuard::for_scope(RouteScope::Admin),
        ];
        for preference in std::iter::once(None).chain(Role::ALL.map(Some)) {
            let session = Session::unsettled(preference);
            for guard in &guards {
                assert_eq!(guard.check(&session), GuardDecision::Loading);
            }
        }
    }

    #[test]
    fn anonymous_visitor_goes_to_auth() {
        let vendor = RouteGuard::for_path("/vendor/dashboard");
        assert_eq!(vendor.check(&anonymous(None)), GuardDecision::Redirect("/auth"));
        assert_eq!(
            vendor.check(&anonymous(Some(Role::Vendor))),
            GuardDecision::Redirect("/auth")
        );
        assert_eq!(
            RouteGuard::for_path("/delivery/orders").check(&anonymous(None)),
            GuardDecision::Redirect("/auth")
        );
    }

    #[test]
    fn members_guard_sends_anonymous_to_login() {
        let guard = RouteGuard::members();
        assert_eq!(guard.check(&anonymous(None)), GuardDecision::Redirect("/login"));
        for role in Role::ALL {
            assert_eq!(guard.check(&session(Some(role), None)), GuardDecision::Render);
        }
    }

    #[test]
    fn redirect_table() {
        let vendor = RouteGuard::for_scope(RouteScope::Vendor);
        let delivery = RouteGuard::for_scope(RouteScope::Delivery);

        let customer = session(Some(Role::Customer), None);
        let partner = session(Some(Role::DeliveryPartner), None);
        let seller = session(Some(Role::Vendor), None);

        assert_eq!(vendor.check(&customer), GuardDecision::Redirect("/home"));
        assert_eq!(vendor.check(&partner), GuardDecision::Redirect("/delivery/dashboard"));
        assert_eq!(delivery.check(&seller), GuardDecision::Redirect("/vendor/dashboard"));
        assert_eq!(delivery.check(&customer), GuardDecision::Redirect("/home"));

        assert_eq!(vendor.check(&seller), GuardDecision::Render);
        assert_eq!(delivery.check(&partner), GuardDecision::Render);
    }

    #[test]
    fn admin_is_never_redirected() {
        let admin = session(Some(Role::Admin), None);
        for scope in [RouteScope::Vendor, RouteScope::Delivery, RouteScope::Admin] {
            assert_eq!(RouteGuard::for_scope(scope).check(&admin), GuardDecision::Render);
        }
    }

    #[test]
    fn admin_scope_rejects_other_roles() {
        let guard = RouteGuard::for_path("/admin/dashboard");
        assert_eq!(
            guard.check(&session(Some(Role::Vendor), None)),
            GuardDecision::Redirect("/vendor/dashboard")
        );
    }

    #[test]
    fn preference_applies_only_without_asserted_role() {
        let vendor = RouteGuard::for_scope(RouteScope::Vendor);
        assert_eq!(vendor.check(&session(None, Some(Role::Vendor))), GuardDecision::Render);
        assert_eq!(
            vendor.check(&session(Some(Role::Customer), Some(Role::Vendor))),
            GuardDecision::Redirect("/home")
        );
        // No role anywhere falls back to customer.
        assert_eq!(vendor.check(&session(None, None)), GuardDecision::Redirect("/home"));
    }
}
