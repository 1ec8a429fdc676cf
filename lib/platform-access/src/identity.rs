//! Identity domain type.
//!
//! An `Identity` is the authenticated principal reported by the external
//! identity provider. Agrokart never creates one on its own: identities
//! come out of the provider adapter after a successful registration, login
//! or session restore.

use agrokart_core::IdentityId;
use serde::{Deserialize, Serialize};

use crate::role::Role;

/// An authenticated principal issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-issued unique identifier.
    id: IdentityId,
    /// Name shown in the UI.
    display_name: String,
    /// Email address, stored lower-cased.
    email: String,
    /// Phone number from the provider profile, if any.
    phone: Option<String>,
    /// Role asserted by the backend. Distinct from the local role preference.
    role: Option<Role>,
}

impl Identity {
    /// Creates an identity from provider profile data.
    ///
    /// When the profile carries no display name (or a blank one), the local
    /// part of the email address is used instead.
    #[must_use]
    pub fn new(id: IdentityId, email: &str, display_name: Option<&str>) -> Self {
        let email = email.trim().to_lowercase();
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(|| email_local_part(&email).to_string(), str::to_string);

        Self {
            id,
            display_name,
            email,
            phone: None,
            role: None,
        }
    }

    /// Sets the phone number.
    #[must_use]
    pub fn with_phone(mut self, phone: Option<String>) -> Self {
        self.phone = phone.filter(|p| !p.trim().is_empty());
        self
    }

    /// Sets the server-asserted role.
    #[must_use]
    pub fn with_role(mut self, role: Option<Role>) -> Self {
        self.role = role;
        self
    }

    /// Returns the provider-issued identifier.
    #[must_use]
    pub fn id(&self) -> &IdentityId {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the lower-cased email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the phone number, if known.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// Returns the backend-asserted role, if any.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Returns true if `email` belongs to this identity (case-insensitive).
    #[must_use]
    pub fn has_email(&self, email: &str) -> bool {
        self.email == email.trim().to_lowercase()
    }

    /// Updates the display name. Blank names fall back to the email local part.
    pub fn set_display_name(&mut self, name: &str) {
        let name = name.trim();
        self.display_name = if name.is_empty() {
            email_local_part(&self.email).to_string()
        } else {
            name.to_string()
        };
    }
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(display_name: Option<&str>) -> Identity {
        Identity::new(IdentityId::from("uid-1"), "Asha.Farmer@Example.com", display_name)
    }

    #[test]
    fn email_is_lowercased() {
        let id = identity(None);
        assert_eq!(id.email(), "asha.farmer@example.com");
        assert!(id.has_email("ASHA.FARMER@example.COM"));
        assert!(!id.has_email("other@example.com"));
    }

    #[test]
    fn display_name_from_profile() {
        let id = identity(Some("Asha"));
        assert_eq!(id.display_name(), "Asha");
    }

    #[test]
    fn display_name_falls_back_to_email_local_part() {
        assert_eq!(identity(None).display_name(), "asha.farmer");
        assert_eq!(identity(Some("   ")).display_name(), "asha.farmer");
    }

    #[test]
    fn set_display_name_updates_only_name() {
        let mut id = identity(None).with_role(Some(Role::Vendor));
        id.set_display_name("Asha's Farm");
        assert_eq!(id.display_name(), "Asha's Farm");
        assert_eq!(id.email(), "asha.farmer@example.com");
        assert_eq!(id.role(), Some(Role::Vendor));

        id.set_display_name("");
        assert_eq!(id.display_name(), "asha.farmer");
    }

    #[test]
    fn blank_phone_is_dropped() {
        assert_eq!(identity(None).with_phone(Some(" ".to_string())).phone(), None);
        assert_eq!(
            identity(None)
                .with_phone(Some("+91 98765 43210".to_string()))
                .phone(),
            Some("+91 98765 43210")
        );
    }

    #[test]
    fn identity_serialization_roundtrip() {
        let id = identity(Some("Asha")).with_role(Some(Role::DeliveryPartner));
        let json = serde_json::to_string(&id).expect("serialize");
        let parsed: Identity = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, parsed);
    }
}
