//! Runtime session state.
//!
//! A session combines the current identity, the stored role preference and
//! a settled flag. It is seeded from storage before the identity provider
//! has reported anything, and becomes settled on the provider's first
//! identity-changed event. Only the auth gate mutates it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::resolver::{RoleDivergence, resolve_role, role_divergence};
use crate::role::Role;

/// The visitor's session as seen by the gate and the route guards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Current identity, if the provider reports one.
    identity: Option<Identity>,
    /// Stored role preference.
    preference: Option<Role>,
    /// True once the provider's first identity callback has been applied.
    settled: bool,
    /// When the session settled.
    settled_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates an unsettled session seeded with the stored preference.
    #[must_use]
    pub fn unsettled(preference: Option<Role>) -> Self {
        Self {
            identity: None,
            preference,
            settled: false,
            settled_at: None,
        }
    }

    /// Returns the current identity.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Returns the stored role preference.
    #[must_use]
    pub fn preference(&self) -> Option<Role> {
        self.preference
    }

    /// Returns true once redirect decisions are safe to make.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Returns when the session settled.
    #[must_use]
    pub fn settled_at(&self) -> Option<DateTime<Utc>> {
        self.settled_at
    }

    /// Returns true if an identity is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Returns the role used for access decisions.
    ///
    /// Always `Some` for a settled session with an identity.
    #[must_use]
    pub fn effective_role(&self) -> Option<Role> {
        resolve_role(self.identity.as_ref(), self.preference)
    }

    /// Returns the preference/backend disagreement, if any.
    #[must_use]
    pub fn role_divergence(&self) -> Option<RoleDivergence> {
        role_divergence(self.identity.as_ref(), self.preference)
    }

    /// Applies an identity-changed event. Returns true if the identity changed.
    pub(crate) fn apply_identity(&mut self, identity: Option<Identity>) -> bool {
        if !self.settled {
            self.settled = true;
            self.settled_at = Some(Utc::now());
        }
        let changed = self.identity != identity;
        self.identity = identity;
        changed
    }

    pub(crate) fn set_preference(&mut self, preference: Option<Role>) {
        self.preference = preference;
    }
}
