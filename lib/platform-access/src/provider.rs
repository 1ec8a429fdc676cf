//! Identity provider adapter.
//!
//! The adapter wraps an external authentication service (an
//! [`IdentityBackend`]) and gives the rest of the crate a small contract:
//! register, login, logout, password reset, and an ordered stream of
//! identity-changed events. Backend error codes are translated into
//! [`IdentityError`] kinds here and nowhere else.

use async_trait::async_trait;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use agrokart_core::IdentityId;

use crate::error::IdentityError;
use crate::identity::Identity;
use crate::role::Role;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Provider error codes understood by the adapter.
pub mod codes {
    pub const EMAIL_EXISTS: &str = "EMAIL_EXISTS";
    pub const INVALID_EMAIL: &str = "INVALID_EMAIL";
    pub const MISSING_EMAIL: &str = "MISSING_EMAIL";
    pub const WEAK_PASSWORD: &str = "WEAK_PASSWORD";
    pub const INVALID_LOGIN_CREDENTIALS: &str = "INVALID_LOGIN_CREDENTIALS";
    pub const INVALID_PASSWORD: &str = "INVALID_PASSWORD";
    pub const MISSING_PASSWORD: &str = "MISSING_PASSWORD";
    pub const EMAIL_NOT_FOUND: &str = "EMAIL_NOT_FOUND";
    pub const USER_DISABLED: &str = "USER_DISABLED";
    pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";
    pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
}

/// Account record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendAccount {
    /// Provider-issued user id.
    pub uid: String,
    /// Account email.
    pub email: String,
    /// Profile display name.
    pub display_name: Option<String>,
    /// Profile phone number.
    pub phone: Option<String>,
    /// Role asserted by the backend (custom claim or profile lookup).
    pub role: Option<Role>,
}

impl BackendAccount {
    /// Converts the account into an [`Identity`].
    #[must_use]
    pub fn into_identity(self) -> Identity {
        Identity::new(
            IdentityId::new(self.uid),
            &self.email,
            self.display_name.as_deref(),
        )
        .with_phone(self.phone)
        .with_role(self.role)
    }
}

/// Failure reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The provider answered and refused the request.
    Rejected { code: String, message: String },
    /// The provider could not be reached.
    Network { reason: String },
}

/// Tokens from a successful sign-in or sign-up that have not yet become
/// the provider's active session.
///
/// Nothing is persisted until the credentials are passed to
/// [`IdentityBackend::commit`]; dropping them leaves the provider session
/// as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account the tokens belong to.
    pub account: BackendAccount,
    /// Short-lived token sent with API calls.
    pub access_token: String,
    /// Long-lived token persisted as the provider session.
    pub refresh_token: String,
}

impl BackendError {
    /// Creates a rejection whose message is the code itself.
    #[must_use]
    pub fn rejected(code: &str) -> Self {
        Self::Rejected {
            code: code.to_string(),
            message: code.to_string(),
        }
    }

    /// Returns the provider code, if the provider answered.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected { code, .. } => Some(code),
            Self::Network { .. } => None,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { code, message } if code == message => write!(f, "{code}"),
            Self::Rejected { code, message } => write!(f, "{code}: {message}"),
            Self::Network { reason } => write!(f, "network failure: {reason}"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<BackendError> for IdentityError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Network { reason } => Self::NetworkUnavailable { reason },
            BackendError::Rejected { code, message } => match code.as_str() {
                codes::EMAIL_EXISTS => Self::EmailInUse,
                codes::INVALID_EMAIL | codes::MISSING_EMAIL => Self::InvalidEmail,
                c if c.starts_with(codes::WEAK_PASSWORD) => Self::WeakPassword,
                codes::INVALID_LOGIN_CREDENTIALS
                | codes::INVALID_PASSWORD
                | codes::MISSING_PASSWORD
                | codes::EMAIL_NOT_FOUND => Self::InvalidCredentials,
                codes::USER_DISABLED => Self::AccountDisabled,
                _ => Self::Unexpected { message },
            },
        }
    }
}

/// The external authentication service.
///
/// Implementations own the provider's persistent session (refresh token
/// or equivalent); nothing outside the backend reads or writes it.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait IdentityBackend: Send + Sync {
    /// Restores the persisted provider session, if one exists and is valid.
    async fn restore(&self) -> Result<Option<BackendAccount>, BackendError>;

    /// Creates an account and returns credentials for it without
    /// committing them.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Credentials, BackendError>;

    /// Checks email and password and returns credentials without
    /// committing them.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Credentials, BackendError>;

    /// Makes `credentials` the active, persisted provider session.
    fn commit(&self, credentials: &Credentials);

    /// Updates the signed-in account's display name.
    async fn update_display_name(&self, display_name: &str)
    -> Result<BackendAccount, BackendError>;

    /// Sends a password reset email.
    async fn send_password_reset(&self, email: &str) -> Result<(), BackendError>;

    /// Drops the persisted provider session. Never fails.
    async fn sign_out(&self);
}

/// Ordered stream of identity-changed events.
///
/// The first item is the identity current at subscription time. Events are
/// never coalesced.
pub type IdentityEvents = UnboundedReceiver<Option<Identity>>;

#[derive(Default)]
struct AdapterState {
    current: Option<Identity>,
    restored: bool,
    listeners: Vec<UnboundedSender<Option<Identity>>>,
}

/// Adapter over an [`IdentityBackend`].
pub struct IdentityProviderAdapter {
    backend: Arc<dyn IdentityBackend>,
    state: Mutex<AdapterState>,
}

impl IdentityProviderAdapter {
    /// Creates an adapter over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn IdentityBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(AdapterState::default()),
        }
    }

    /// Returns the identity the adapter currently holds.
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.state.lock().current.clone()
    }

    /// Subscribes to identity-changed events.
    ///
    /// On the first subscription the persisted provider session is
    /// restored; a restore failure is logged and treated as signed out.
    pub async fn subscribe(&self) -> IdentityEvents {
        self.restore_once().await;

        let (tx, rx) = unbounded();
        let mut state = self.state.lock();
        // A fresh receiver is alive, so this send cannot fail.
        let _ = tx.unbounded_send(state.current.clone());
        state.listeners.push(tx);
        rx
    }

    async fn restore_once(&self) {
        if self.state.lock().restored {
            return;
        }

        let restored = match self.backend.restore().await {
            Ok(account) => account.map(BackendAccount::into_identity),
            Err(e) => {
                warn!(error = %e, "Failed to restore identity provider session");
                None
            }
        };

        let mut state = self.state.lock();
        if !state.restored {
            state.restored = true;
            if state.current.is_none() {
                if let Some(identity) = &restored {
                    debug!(identity_id = %identity.id(), "Restored provider session");
                }
                state.current = restored;
            }
        }
    }

    /// Registers a new account and makes it the current identity.
    ///
    /// # Errors
    ///
    /// `EmailInUse`, `InvalidEmail`, `WeakPassword`, `NetworkUnavailable`,
    /// or `Unexpected` with the provider's message.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Identity, IdentityError> {
        let credentials = self.create_account(email, password, display_name).await?;
        Ok(self.commit(&credentials))
    }

    /// Creates an account and returns its credentials. The provider session
    /// and the current identity are left untouched until [`commit`](Self::commit).
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    #[instrument(skip_all, fields(email = %email))]
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Credentials, IdentityError> {
        let email = validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(IdentityError::WeakPassword);
        }

        let display_name = Some(display_name.trim()).filter(|name| !name.is_empty());
        let credentials = self.backend.sign_up(&email, password, display_name).await?;
        info!(uid = %credentials.account.uid, "Created account");
        Ok(credentials)
    }

    /// Signs in and makes the account the current identity.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials`, `AccountDisabled`, `NetworkUnavailable`, or
    /// `Unexpected`.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let credentials = self.authenticate(email, password).await?;
        Ok(self.commit(&credentials))
    }

    /// Checks email and password and returns the account's credentials.
    /// The provider session and the current identity are left untouched
    /// until [`commit`](Self::commit).
    ///
    /// A malformed address reports `InvalidCredentials`, like any other
    /// address without a matching account.
    ///
    /// # Errors
    ///
    /// Same as [`login`](Self::login).
    #[instrument(skip_all, fields(email = %email))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Credentials, IdentityError> {
        let email = validate_email(email).map_err(|_| IdentityError::InvalidCredentials)?;
        self.backend
            .sign_in(&email, password)
            .await
            .map_err(|e| match IdentityError::from(e) {
                IdentityError::InvalidEmail => IdentityError::InvalidCredentials,
                other => other,
            })
    }

    /// Commits credentials as the provider session and publishes the
    /// account as the current identity.
    pub fn commit(&self, credentials: &Credentials) -> Identity {
        self.backend.commit(credentials);
        let identity = credentials.account.clone().into_identity();
        info!(identity_id = %identity.id(), "Signed in");
        self.publish(Some(identity.clone()));
        identity
    }

    /// Signs out locally. Always succeeds.
    #[instrument(skip_all)]
    pub async fn logout(&self) {
        self.backend.sign_out().await;
        if self.state.lock().current.is_some() {
            info!("Signed out");
        }
        self.publish(None);
    }

    /// Requests a password reset email.
    ///
    /// Whether an account exists for `email` is deliberately not revealed:
    /// an unknown address reports success.
    ///
    /// # Errors
    ///
    /// `InvalidEmail`, `NetworkUnavailable`, or `Unexpected`.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn reset_password(&self, email: &str) -> Result<(), IdentityError> {
        let email = validate_email(email)?;
        match self.backend.send_password_reset(&email).await {
            Ok(()) => Ok(()),
            Err(e) if matches!(e.code(), Some(codes::EMAIL_NOT_FOUND | codes::USER_NOT_FOUND)) => {
                debug!("Password reset requested for unknown account");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Updates the current identity's display name.
    ///
    /// # Errors
    ///
    /// `NetworkUnavailable` or `Unexpected`.
    pub async fn update_display_name(&self, display_name: &str) -> Result<Identity, IdentityError> {
        let identity = self
            .backend
            .update_display_name(display_name.trim())
            .await?
            .into_identity();
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    /// Records the new identity and delivers it to every live listener.
    fn publish(&self, identity: Option<Identity>) {
        let mut state = self.state.lock();
        if state.current.is_none() && identity.is_none() {
            return;
        }
        state.current = identity.clone();
        state
            .listeners
            .retain(|tx| tx.unbounded_send(identity.clone()).is_ok());
    }
}

impl fmt::Debug for IdentityProviderAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("IdentityProviderAdapter")
            .field("current", &state.current)
            .field("listeners", &state.listeners.len())
            .finish_non_exhaustive()
    }
}

/// Normalises and checks an email address.
fn validate_email(email: &str) -> Result<String, IdentityError> {
    let email = email.trim().to_lowercase();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(IdentityError::InvalidEmail);
    };
    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@');
    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(IdentityError::InvalidEmail);
    }
    Ok(email)
}
