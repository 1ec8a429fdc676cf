//! Effective role resolution.
//!
//! The role used for access decisions comes from, in order: the role the
//! backend asserts on the identity, the locally stored preference, and
//! finally `Customer`. Anonymous visitors have no effective role.

use crate::identity::Identity;
use crate::role::Role;

/// Role granted when neither the backend nor the visitor has named one.
pub const DEFAULT_ROLE: Role = Role::Customer;

/// Computes the effective role for a visitor.
///
/// Returns `None` only when there is no identity.
#[must_use]
pub fn resolve_role(identity: Option<&Identity>, preference: Option<Role>) -> Option<Role> {
    let identity = identity?;
    Some(identity.role().or(preference).unwrap_or(DEFAULT_ROLE))
}

/// A stored preference that disagrees with the backend-asserted role.
///
/// The backend role always wins; a divergence means the visitor picked a
/// role on this device that their account does not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDivergence {
    /// Role asserted by the backend, which is the one in effect.
    pub asserted: Role,
    /// Role the visitor selected locally.
    pub preferred: Role,
}

/// Reports whether the preference and the asserted role disagree.
#[must_use]
pub fn role_divergence(identity: Option<&Identity>, preference: Option<Role>) -> Option<RoleDivergence> {
    let asserted = identity?.role()?;
    let preferred = preference?;
    (asserted != preferred).then_some(RoleDivergence {
        asserted,
        preferred,
    })
}
