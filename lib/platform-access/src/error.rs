//! Error types for the platform-access crate.
//!
//! Identity provider failures are returned to callers as a typed
//! `IdentityError` so the UI can render field-level messages. Storage and
//! configuration failures are infrastructure errors and travel as
//! rootcause reports.

use std::fmt;

/// Errors from identity provider operations.
///
/// These are kinds, not provider codes: the adapter maps each provider
/// code onto one of these before anything else sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Registration with an email that already has an account.
    EmailInUse,
    /// Email address is empty or malformed.
    InvalidEmail,
    /// Password does not meet the provider's strength rules.
    WeakPassword,
    /// Email/password pair did not match an account.
    InvalidCredentials,
    /// Account exists but has been disabled by an operator.
    AccountDisabled,
    /// The provider could not be reached.
    NetworkUnavailable { reason: String },
    /// Any provider failure without a dedicated kind; carries the raw message.
    Unexpected { message: String },
}

impl IdentityError {
    /// Returns true if the caller should offer a retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkUnavailable { .. })
    }

    /// Inline message shown on the authentication screen.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmailInUse => {
                "This email is already registered. Please log in instead.".to_string()
            }
            Self::InvalidEmail => "Please enter a valid email address.".to_string(),
            Self::WeakPassword => {
                "Password is too weak. Please use at least 6 characters.".to_string()
            }
            Self::InvalidCredentials => "Incorrect email or password.".to_string(),
            Self::AccountDisabled => {
                "This account has been disabled. Please contact support.".to_string()
            }
            Self::NetworkUnavailable { .. } => {
                "Network error. Please check your internet connection and try again.".to_string()
            }
            Self::Unexpected { message } => message.clone(),
        }
    }
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmailInUse => write!(f, "email is already in use"),
            Self::InvalidEmail => write!(f, "invalid email address"),
            Self::WeakPassword => write!(f, "password is too weak"),
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::AccountDisabled => write!(f, "account is disabled"),
            Self::NetworkUnavailable { reason } => {
                write!(f, "identity provider unreachable: {reason}")
            }
            Self::Unexpected { message } => {
                write!(f, "identity provider error: {message}")
            }
        }
    }
}

impl std::error::Error for IdentityError {}

/// A role string that is not one of the known roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleParseError {
    /// The rejected value.
    pub value: String,
}

impl fmt::Display for RoleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: '{}'", self.value)
    }
}

impl std::error::Error for RoleParseError {}

/// Errors from durable key/value storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backing store could not be read.
    ReadFailed { key: String, details: String },
    /// The backing store could not be written.
    WriteFailed { key: String, details: String },
    /// The backing store is not available in this environment.
    Unavailable { details: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed { key, details } => {
                write!(f, "failed to read '{key}': {details}")
            }
            Self::WriteFailed { key, details } => {
                write!(f, "failed to write '{key}': {details}")
            }
            Self::Unavailable { details } => {
                write!(f, "storage unavailable: {details}")
            }
        }
    }
}

impl std::error::Error for StorageError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_errors_are_retryable() {
        assert!(
            IdentityError::NetworkUnavailable {
                reason: "offline".to_string()
            }
            .is_retryable()
        );
        assert!(!IdentityError::InvalidCredentials.is_retryable());
        assert!(!IdentityError::EmailInUse.is_retryable());
    }

    #[test]
    fn unexpected_error_keeps_raw_message() {
        let err = IdentityError::Unexpected {
            message: "TOO_MANY_ATTEMPTS_TRY_LATER".to_string(),
        };
        assert_eq!(err.user_message(), "TOO_MANY_ATTEMPTS_TRY_LATER");
        assert!(err.to_string().contains("TOO_MANY_ATTEMPTS_TRY_LATER"));
    }

    #[test]
    fn network_error_display() {
        let err = IdentityError::NetworkUnavailable {
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("unreachable"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn role_parse_error_display() {
        let err = RoleParseError {
            value: "farmer".to_string(),
        };
        assert!(err.to_string().contains("farmer"));
    }

    #[test]
    fn storage_error_display() {
        let err = StorageError::WriteFailed {
            key: "userRole".to_string(),
            details: "read-only file system".to_string(),
        };
        assert!(err.to_string().contains("userRole"));
        assert!(err.to_string().contains("read-only"));
    }
}
