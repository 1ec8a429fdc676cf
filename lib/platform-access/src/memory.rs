//! In-memory identity backend.
//!
//! Behaves like the hosted provider closely enough to drive the gate in
//! tests and offline development: accounts, disabled accounts, a
//! persisted session, backend-asserted roles and simulated outages.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::provider::{BackendAccount, BackendError, Credentials, IdentityBackend, codes};
use crate::role::Role;

#[derive(Debug, Clone)]
struct StoredAccount {
    uid: String,
    email: String,
    password: String,
    display_name: Option<String>,
    phone: Option<String>,
    role: Option<Role>,
    disabled: bool,
}

impl StoredAccount {
    fn credentials(&self) -> Credentials {
        Credentials {
            account: self.to_backend(),
            access_token: format!("access-{}", self.uid),
            refresh_token: self.email.clone(),
        }
    }

    fn to_backend(&self) -> BackendAccount {
        BackendAccount {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            phone: self.phone.clone(),
            role: self.role,
        }
    }
}

#[derive(Debug)]
struct State {
    accounts: HashMap<String, StoredAccount>,
    signed_in: Option<String>,
    persisted: Option<String>,
    network_available: bool,
    next_uid: u64,
    reset_emails: Vec<String>,
}

/// Identity backend that keeps every account in process memory.
#[derive(Debug)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Creates a backend with no accounts and the network available.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                accounts: HashMap::new(),
                signed_in: None,
                persisted: None,
                network_available: true,
                next_uid: 1,
                reset_emails: Vec::new(),
            }),
        }
    }

    /// Adds an account and returns its uid.
    pub fn add_account(&self, email: &str, password: &str, display_name: Option<&str>) -> String {
        let mut state = self.state.lock();
        let uid = format!("mem-{}", state.next_uid);
        state.next_uid += 1;
        let email = email.to_lowercase();
        state.accounts.insert(
            email.clone(),
            StoredAccount {
                uid: uid.clone(),
                email,
                password: password.to_string(),
                display_name: display_name.map(str::to_string),
                phone: None,
                role: None,
                disabled: false,
            },
        );
        uid
    }

    /// Asserts a role for an account, as the backend profile would.
    pub fn set_role(&self, email: &str, role: Option<Role>) {
        if let Some(account) = self.state.lock().accounts.get_mut(&email.to_lowercase()) {
            account.role = role;
        }
    }

    /// Disables an account.
    pub fn disable_account(&self, email: &str) {
        if let Some(account) = self.state.lock().accounts.get_mut(&email.to_lowercase()) {
            account.disabled = true;
        }
    }

    /// Marks `email` as the persisted provider session, as if signed in
    /// during an earlier page load.
    pub fn set_persisted_session(&self, email: &str) {
        self.state.lock().persisted = Some(email.to_lowercase());
    }

    /// Returns the email of the persisted provider session.
    #[must_use]
    pub fn persisted_session(&self) -> Option<String> {
        self.state.lock().persisted.clone()
    }

    /// Simulates the provider going offline or coming back.
    pub fn set_network_available(&self, available: bool) {
        self.state.lock().network_available = available;
    }

    /// Addresses that received a password reset email.
    #[must_use]
    pub fn reset_emails_sent(&self) -> Vec<String> {
        self.state.lock().reset_emails.clone()
    }

    fn check_network(state: &State) -> Result<(), BackendError> {
        if state.network_available {
            Ok(())
        } else {
            Err(BackendError::Network {
                reason: "provider unreachable".to_string(),
            })
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl IdentityBackend for InMemoryBackend {
    async fn restore(&self) -> Result<Option<BackendAccount>, BackendError> {
        let mut state = self.state.lock();
        let Some(email) = state.persisted.clone() else {
            return Ok(None);
        };
        Self::check_network(&state)?;

        let account = state
            .accounts
            .get(&email)
            .filter(|account| !account.disabled)
            .map(StoredAccount::to_backend);
        match account {
            Some(account) => {
                state.signed_in = Some(email);
                Ok(Some(account))
            }
            None => {
                state.persisted = None;
                Ok(None)
            }
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Credentials, BackendError> {
        {
            let state = self.state.lock();
            Self::check_network(&state)?;
            if state.accounts.contains_key(&email.to_lowercase()) {
                return Err(BackendError::rejected(codes::EMAIL_EXISTS));
            }
        }

        self.add_account(email, password, display_name);
        self.state
            .lock()
            .accounts
            .get(&email.to_lowercase())
            .map(StoredAccount::credentials)
            .ok_or_else(|| BackendError::rejected(codes::USER_NOT_FOUND))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Credentials, BackendError> {
        let state = self.state.lock();
        Self::check_network(&state)?;

        match state.accounts.get(&email.to_lowercase()) {
            Some(account) if account.password == password => {
                if account.disabled {
                    Err(BackendError::rejected(codes::USER_DISABLED))
                } else {
                    Ok(account.credentials())
                }
            }
            _ => Err(BackendError::rejected(codes::INVALID_LOGIN_CREDENTIALS)),
        }
    }

    fn commit(&self, credentials: &Credentials) {
        let mut state = self.state.lock();
        // The refresh token is the account's email.
        state.signed_in = Some(credentials.refresh_token.clone());
        state.persisted = Some(credentials.refresh_token.clone());
    }

    async fn update_display_name(
        &self,
        display_name: &str,
    ) -> Result<BackendAccount, BackendError> {
        let mut state = self.state.lock();
        Self::check_network(&state)?;

        let email = state
            .signed_in
            .clone()
            .ok_or_else(|| BackendError::rejected(codes::TOKEN_EXPIRED))?;
        let account = state
            .accounts
            .get_mut(&email)
            .ok_or_else(|| BackendError::rejected(codes::USER_NOT_FOUND))?;
        account.display_name = Some(display_name.to_string());
        Ok(account.to_backend())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        Self::check_network(&state)?;

        let email = email.to_lowercase();
        if !state.accounts.contains_key(&email) {
            return Err(BackendError::rejected(codes::EMAIL_NOT_FOUND));
        }
        state.reset_emails.push(email);
        Ok(())
    }

    async fn sign_out(&self) {
        let mut state = self.state.lock();
        state.signed_in = None;
        state.persisted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_up_persists_session_only_on_commit() {
        let backend = InMemoryBackend::new();
        let credentials = backend
            .sign_up("Pooja@example.com", "secret1", Some("Pooja"))
            .await
            .unwrap();
        assert_eq!(credentials.account.email, "pooja@example.com");
        assert_eq!(credentials.account.display_name.as_deref(), Some("Pooja"));
        assert_eq!(backend.persisted_session(), None);

        backend.commit(&credentials);
        assert_eq!(backend.persisted_session().as_deref(), Some("pooja@example.com"));

        backend.sign_out().await;
        assert_eq!(backend.persisted_session(), None);
    }

    #[tokio::test]
    async fn restore_returns_asserted_role() {
        let backend = InMemoryBackend::new();
        backend.add_account("vendor@example.com", "secret1", None);
        backend.set_role("vendor@example.com", Some(Role::Vendor));
        backend.set_persisted_session("vendor@example.com");

        let account = backend.restore().await.unwrap().expect("session");
        assert_eq!(account.role, Some(Role::Vendor));
    }

    #[tokio::test]
    async fn restore_drops_session_of_disabled_account() {
        let backend = InMemoryBackend::new();
        backend.add_account("gone@example.com", "secret1", None);
        backend.set_persisted_session("gone@example.com");
        backend.disable_account("gone@example.com");

        assert_eq!(backend.restore().await.unwrap(), None);
        assert_eq!(backend.persisted_session(), None);
    }

    #[tokio::test]
    async fn sign_in_without_commit_keeps_previous_session() {
        let backend = InMemoryBackend::new();
        backend.add_account("first@example.com", "secret1", None);
        backend.add_account("second@example.com", "secret2", None);
        backend.set_persisted_session("first@example.com");

        let credentials = backend.sign_in("second@example.com", "secret2").await.unwrap();
        assert_eq!(credentials.account.email, "second@example.com");
        assert_eq!(backend.persisted_session().as_deref(), Some("first@example.com"));

        let err = backend.sign_in("second@example.com", "wrong").await.unwrap_err();
        assert_eq!(err.code(), Some(codes::INVALID_LOGIN_CREDENTIALS));
    }

    #[tokio::test]
    async fn update_display_name_requires_sign_in() {
        let backend = InMemoryBackend::new();
        let err = backend.update_display_name("Name").await.unwrap_err();
        assert_eq!(err.code(), Some(codes::TOKEN_EXPIRED));
    }
}
