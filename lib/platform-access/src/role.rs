//! Marketplace roles and the page scopes they unlock.
//!
//! A visitor acts as exactly one role at a time. Roles are a closed set so
//! that the resolver and the redirect table stay exhaustive.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RoleParseError;

/// Role a visitor acts as on the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Buys produce from the catalog.
    Customer,
    /// Lists and sells produce.
    Vendor,
    /// Delivers orders to customers.
    DeliveryPartner,
    /// Platform operator; may enter every scope.
    Admin,
}

impl Role {
    /// Every role, in display order.
    pub const ALL: [Role; 4] = [
        Role::Customer,
        Role::Vendor,
        Role::DeliveryPartner,
        Role::Admin,
    ];

    /// Parses a stored or server-asserted role string.
    ///
    /// Accepts the four wire names case-insensitively, plus the short
    /// `delivery` alias used by older role pickers.
    ///
    /// # Errors
    ///
    /// Returns `RoleParseError` for any other value.
    pub fn parse(value: &str) -> Result<Self, RoleParseError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "vendor" => Ok(Self::Vendor),
            "delivery_partner" | "delivery" => Ok(Self::DeliveryPartner),
            "admin" => Ok(Self::Admin),
            _ => Err(RoleParseError {
                value: value.to_string(),
            }),
        }
    }

    /// Returns the wire name of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Vendor => "vendor",
            Self::DeliveryPartner => "delivery_partner",
            Self::Admin => "admin",
        }
    }

    /// Returns true if this role bypasses scope checks.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Page a member of this role lands on after login, and where they are
    /// sent when they wander into another role's scope.
    #[must_use]
    pub fn landing_path(&self) -> &'static str {
        match self {
            Self::Customer => "/home",
            Self::Vendor => "/vendor/dashboard",
            Self::DeliveryPartner => "/delivery/dashboard",
            Self::Admin => "/admin/dashboard",
        }
    }

    /// Page that collects registration details for this role.
    ///
    /// Customers and admins register inline on the unified auth screen.
    #[must_use]
    pub fn registration_path(&self) -> &'static str {
        match self {
            Self::Vendor => "/vendor/register",
            Self::DeliveryPartner => "/delivery/register",
            Self::Customer | Self::Admin => "/auth",
        }
    }

    /// Human-readable label for role pickers.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Vendor => "Vendor",
            Self::DeliveryPartner => "Delivery Partner",
            Self::Admin => "Administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Role-scoped page subtree a request path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteScope {
    /// Pages anyone may open.
    Public,
    /// `/vendor/...` pages.
    Vendor,
    /// `/delivery/...` pages.
    Delivery,
    /// `/admin/...` pages.
    Admin,
}

impl RouteScope {
    /// Classifies a request path.
    ///
    /// Login and registration pages inside a role subtree stay public so a
    /// visitor can reach them before holding the role.
    #[must_use]
    pub fn of_path(path: &str) -> Self {
        let path = crate::routes::normalize_path(path);
        if crate::routes::is_auth_bypass_path(path) {
            return Self::Public;
        }
        let first = path.trim_start_matches('/').split('/').next().unwrap_or("");
        match first {
            "vendor" => Self::Vendor,
            "delivery" => Self::Delivery,
            "admin" => Self::Admin,
            _ => Self::Public,
        }
    }

    /// Roles allowed into this scope, not counting the admin override.
    #[must_use]
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Self::Public => &[],
            Self::Vendor => &[Role::Vendor],
            Self::Delivery => &[Role::DeliveryPartner],
            Self::Admin => &[Role::Admin],
        }
    }
}
