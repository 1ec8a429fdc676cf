//! Firebase Authentication backend.
//!
//! Talks to the Identity Toolkit and Secure Token REST APIs. The refresh
//! token is the provider's persistent session; it lives in the key/value
//! store under a key no other component uses.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::provider::{BackendAccount, BackendError, Credentials, IdentityBackend, codes};
use crate::role::Role;
use crate::storage::KeyValueStore;

/// Storage key for the persisted refresh token.
pub const REFRESH_TOKEN_KEY: &str = "agrokart.identity.refreshToken";

/// Header carrying the ID token on backend profile requests.
const PROFILE_TOKEN_HEADER: &str = "firebase-auth-token";

/// Configuration for the Firebase identity backend.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirebaseConfig {
    /// Web API key of the Firebase project.
    api_key: String,
    /// Identity Toolkit base URL.
    /// Default: "https://identitytoolkit.googleapis.com"
    #[serde(default = "default_auth_base_url")]
    auth_base_url: String,
    /// Secure Token service base URL.
    /// Default: "https://securetoken.googleapis.com"
    #[serde(default = "default_token_base_url")]
    token_base_url: String,
    /// Marketplace API base URL used to look up the account's role when the
    /// ID token carries no role claim (e.g. "https://api.example.com/api").
    #[serde(default)]
    profile_endpoint: Option<String>,
    /// Name of the custom claim holding the backend-asserted role.
    /// Default: "role"
    #[serde(default = "default_role_claim")]
    role_claim: String,
}

fn default_auth_base_url() -> String {
    "https://identitytoolkit.googleapis.com".to_string()
}

fn default_token_base_url() -> String {
    "https://securetoken.googleapis.com".to_string()
}

fn default_role_claim() -> String {
    "role".to_string()
}

impl FirebaseConfig {
    /// Creates a configuration with defaults for optional fields.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            auth_base_url: default_auth_base_url(),
            token_base_url: default_token_base_url(),
            profile_endpoint: None,
            role_claim: default_role_claim(),
        }
    }

    /// Creates a configuration builder for more customization.
    #[must_use]
    pub fn builder(api_key: String) -> FirebaseConfigBuilder {
        FirebaseConfigBuilder::new(api_key)
    }

    /// Returns the web API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the Identity Toolkit base URL.
    #[must_use]
    pub fn auth_base_url(&self) -> &str {
        &self.auth_base_url
    }

    /// Returns the Secure Token service base URL.
    #[must_use]
    pub fn token_base_url(&self) -> &str {
        &self.token_base_url
    }

    /// Returns the profile endpoint, if configured.
    #[must_use]
    pub fn profile_endpoint(&self) -> Option<&str> {
        self.profile_endpoint.as_deref()
    }

    /// Returns the role claim name.
    #[must_use]
    pub fn role_claim(&self) -> &str {
        &self.role_claim
    }

    fn accounts_url(&self, method: &str) -> String {
        format!(
            "{}/v1/accounts:{method}?key={}",
            self.auth_base_url.trim_end_matches('/'),
            self.api_key
        )
    }

    fn token_url(&self) -> String {
        format!(
            "{}/v1/token?key={}",
            self.token_base_url.trim_end_matches('/'),
            self.api_key
        )
    }
}

/// Builder for `FirebaseConfig`.
#[derive(Debug)]
pub struct FirebaseConfigBuilder {
    config: FirebaseConfig,
}

impl FirebaseConfigBuilder {
    /// Creates a builder with default optional fields.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            config: FirebaseConfig::new(api_key),
        }
    }

    /// Sets the Identity Toolkit base URL (useful for the auth emulator).
    #[must_use]
    pub fn auth_base_url(mut self, url: String) -> Self {
        self.config.auth_base_url = url;
        self
    }

    /// Sets the Secure Token service base URL.
    #[must_use]
    pub fn token_base_url(mut self, url: String) -> Self {
        self.config.token_base_url = url;
        self
    }

    /// Sets the marketplace profile endpoint.
    #[must_use]
    pub fn profile_endpoint(mut self, url: String) -> Self {
        self.config.profile_endpoint = Some(url);
        self
    }

    /// Sets the role claim name.
    #[must_use]
    pub fn role_claim(mut self, claim: String) -> Self {
        self.config.role_claim = claim;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> FirebaseConfig {
        self.config
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    id_token: String,
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileResponse {
    id_token: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobRequest<'a> {
    request_type: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    disabled: bool,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Clone)]
struct TokenSession {
    uid: String,
    id_token: String,
    refresh_token: String,
}

impl From<&Credentials> for TokenSession {
    fn from(credentials: &Credentials) -> Self {
        Self {
            uid: credentials.account.uid.clone(),
            id_token: credentials.access_token.clone(),
            refresh_token: credentials.refresh_token.clone(),
        }
    }
}

/// Identity backend over the Firebase Authentication REST API.
pub struct FirebaseBackend {
    config: FirebaseConfig,
    http: reqwest::Client,
    store: Arc<dyn KeyValueStore>,
    session: Mutex<Option<TokenSession>>,
}

impl FirebaseBackend {
    /// Creates a backend that persists its refresh token in `store`.
    #[must_use]
    pub fn new(config: FirebaseConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            store,
            session: Mutex::new(None),
        }
    }

    /// Returns the backend configuration.
    #[must_use]
    pub fn config(&self) -> &FirebaseConfig {
        &self.config
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(network_error)?;
        decode_response(response).await
    }

    async fn load_account(&self, session: &TokenSession) -> Result<BackendAccount, BackendError> {
        let lookup: LookupResponse = self
            .post_json(
                &self.config.accounts_url("lookup"),
                &LookupRequest {
                    id_token: &session.id_token,
                },
            )
            .await?;

        let user = lookup
            .users
            .into_iter()
            .find(|u| u.local_id == session.uid)
            .ok_or_else(|| BackendError::rejected(codes::USER_NOT_FOUND))?;
        if user.disabled {
            return Err(BackendError::rejected(codes::USER_DISABLED));
        }

        let role = self.asserted_role(&session.id_token).await;
        Ok(BackendAccount {
            uid: user.local_id,
            email: user.email.unwrap_or_default(),
            display_name: user.display_name,
            phone: user.phone_number,
            role,
        })
    }

    /// Reads the backend-asserted role: the ID token claim first, then the
    /// marketplace profile endpoint when configured.
    async fn asserted_role(&self, id_token: &str) -> Option<Role> {
        if let Some(role) = role_from_id_token(id_token, &self.config.role_claim) {
            return Some(role);
        }
        let endpoint = self.config.profile_endpoint.as_deref()?;
        let url = format!("{}/auth/me", endpoint.trim_end_matches('/'));

        let response = match self
            .http
            .get(&url)
            .header(PROFILE_TOKEN_HEADER, id_token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Profile lookup failed; no asserted role");
                return None;
            }
        };

        match decode_response::<ProfileResponse>(response).await {
            Ok(profile) => profile.role.and_then(|raw| match Role::parse(&raw) {
                Ok(role) => Some(role),
                Err(e) => {
                    warn!(error = %e, "Profile carries an unknown role");
                    None
                }
            }),
            Err(e) => {
                warn!(error = %e, "Profile lookup rejected; no asserted role");
                None
            }
        }
    }

    fn remember(&self, session: TokenSession) {
        if let Err(e) = self.store.set(REFRESH_TOKEN_KEY, &session.refresh_token) {
            warn!(error = ?e, "Failed to persist provider session");
        }
        *self.session.lock() = Some(session);
    }

    fn forget(&self) {
        *self.session.lock() = None;
        if let Err(e) = self.store.remove(REFRESH_TOKEN_KEY) {
            warn!(error = ?e, "Failed to clear persisted provider session");
        }
    }

    async fn password_flow(
        &self,
        method: &str,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Credentials, BackendError> {
        let response: PasswordResponse = self
            .post_json(
                &self.config.accounts_url(method),
                &PasswordRequest {
                    email,
                    password,
                    display_name,
                    return_secure_token: true,
                },
            )
            .await?;

        let session = TokenSession {
            uid: response.local_id,
            id_token: response.id_token,
            refresh_token: response.refresh_token,
        };
        let account = self.load_account(&session).await?;
        Ok(Credentials {
            account,
            access_token: session.id_token,
            refresh_token: session.refresh_token,
        })
    }
}

impl std::fmt::Debug for FirebaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseBackend")
            .field("auth_base_url", &self.config.auth_base_url)
            .field("signed_in", &self.session.lock().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl IdentityBackend for FirebaseBackend {
    async fn restore(&self) -> Result<Option<BackendAccount>, BackendError> {
        let refresh_token = match self.store.get(REFRESH_TOKEN_KEY) {
            Ok(Some(token)) => token,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(error = ?e, "Failed to read persisted provider session");
                return Ok(None);
            }
        };

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];
        let response = self
            .http
            .post(self.config.token_url())
            .form(&form)
            .send()
            .await
            .map_err(network_error)?;

        let refreshed: RefreshResponse = match decode_response(response).await {
            Ok(refreshed) => refreshed,
            Err(e @ BackendError::Network { .. }) => return Err(e),
            Err(e) => {
                debug!(error = %e, "Persisted provider session rejected");
                self.forget();
                return Ok(None);
            }
        };

        let session = TokenSession {
            uid: refreshed.user_id,
            id_token: refreshed.id_token,
            refresh_token: refreshed.refresh_token,
        };
        match self.load_account(&session).await {
            Ok(account) => {
                self.remember(session);
                Ok(Some(account))
            }
            Err(e @ BackendError::Network { .. }) => Err(e),
            Err(e) => {
                debug!(error = %e, "Restored account is no longer usable");
                self.forget();
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
        self.password_flow("signUp", email, password, display_name).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Credentials, BackendError> {
        self.password_flow("signInWithPassword", email, password, None).await
    }

    fn commit(&self, credentials: &Credentials) {
        self.remember(TokenSession::from(credentials));
    }

    async fn update_display_name(
        &self,
        display_name: &str,
    ) -> Result<BackendAccount, BackendError> {
        let mut session = self
            .session
            .lock()
            .clone()
            .ok_or_else(|| BackendError::rejected(codes::TOKEN_EXPIRED))?;

        let response: UpdateProfileResponse = self
            .post_json(
                &self.config.accounts_url("update"),
                &UpdateProfileRequest {
                    id_token: &session.id_token,
                    display_name,
                    return_secure_token: true,
                },
            )
            .await?;

        if let Some(id_token) = response.id_token {
            session.id_token = id_token;
        }
        if let Some(refresh_token) = response.refresh_token {
            session.refresh_token = refresh_token;
        }
        let account = self.load_account(&session).await?;
        self.remember(session);
        Ok(account)
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), BackendError> {
        let _: serde_json::Value = self
            .post_json(
                &self.config.accounts_url("sendOobCode"),
                &OobRequest {
                    request_type: "PASSWORD_RESET",
                    email,
                },
            )
            .await?;
        Ok(())
    }

    async fn sign_out(&self) {
        self.forget();
    }
}

fn network_error(err: reqwest::Error) -> BackendError {
    BackendError::Network {
        reason: err.to_string(),
    }
}

async fn decode_response<R: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<R, BackendError> {
    let status = response.status();
    let body = response.text().await.map_err(network_error)?;

    if status.is_success() {
        return serde_json::from_str(&body).map_err(|e| BackendError::Rejected {
            code: "UNEXPECTED_RESPONSE".to_string(),
            message: e.to_string(),
        });
    }
    Err(parse_error_body(status.as_u16(), &body))
}

/// Turns a provider error body into a `BackendError`.
///
/// Firebase reports errors as `{"error": {"message": "CODE : detail"}}`.
fn parse_error_body(status: u16, body: &str) -> BackendError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let message = envelope.error.message;
            let code = message
                .split(':')
                .next()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(&message)
                .to_string();
            BackendError::Rejected { code, message }
        }
        Err(_) => BackendError::Rejected {
            code: format!("HTTP_{status}"),
            message: body.to_string(),
        },
    }
}

/// Reads a role custom claim from an unverified ID token payload.
///
/// The token came straight from the provider over TLS; it is decoded only
/// to read claims, never to authorize anything server-side.
fn role_from_id_token(id_token: &str, claim: &str) -> Option<Role> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    Role::parse(claims.get(claim)?.as_str()?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IdentityError;
    use crate::storage::MemoryStore;

    fn token_with_claims(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.signature")
    }

    #[test]
    fn config_defaults() {
        let config = FirebaseConfig::new("key-123".to_string());
        assert_eq!(config.auth_base_url(), "https://identitytoolkit.googleapis.com");
        assert_eq!(config.token_base_url(), "https://securetoken.googleapis.com");
        assert_eq!(config.role_claim(), "role");
        assert_eq!(config.profile_endpoint(), None);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: FirebaseConfig =
            serde_json::from_str(r#"{"api_key": "key-123"}"#).expect("deserialize");
        assert_eq!(config, FirebaseConfig::new("key-123".to_string()));
    }

    #[test]
    fn builder_overrides() {
        let config = FirebaseConfig::builder("key".to_string())
            .auth_base_url("http://localhost:9099/identitytoolkit.googleapis.com/".to_string())
            .token_base_url("http://localhost:9099/securetoken.googleapis.com".to_string())
            .profile_endpoint("http://localhost:5000/api".to_string())
            .role_claim("marketplace_role".to_string())
            .build();

        assert_eq!(
            config.accounts_url("signUp"),
            "http://localhost:9099/identitytoolkit.googleapis.com/v1/accounts:signUp?key=key"
        );
        assert_eq!(
            config.token_url(),
            "http://localhost:9099/securetoken.googleapis.com/v1/token?key=key"
        );
        assert_eq!(config.profile_endpoint(), Some("http://localhost:5000/api"));
        assert_eq!(config.role_claim(), "marketplace_role");
    }

    #[test]
    fn role_claim_is_read_from_token() {
        let token = token_with_claims(&serde_json::json!({"sub": "u1", "role": "vendor"}));
        assert_eq!(role_from_id_token(&token, "role"), Some(Role::Vendor));
        assert_eq!(role_from_id_token(&token, "other"), None);
    }

    #[test]
    fn malformed_tokens_carry_no_role() {
        assert_eq!(role_from_id_token("not-a-jwt", "role"), None);
        assert_eq!(role_from_id_token("a.!!!.c", "role"), None);
        let token = token_with_claims(&serde_json::json!({"role": "farmer"}));
        assert_eq!(role_from_id_token(&token, "role"), None);
    }

    #[test]
    fn error_body_codes() {
        let err = parse_error_body(400, r#"{"error": {"code": 400, "message": "EMAIL_EXISTS"}}"#);
        assert_eq!(IdentityError::from(err), IdentityError::EmailInUse);

        let err = parse_error_body(
            400,
            r#"{"error": {"message": "WEAK_PASSWORD : Password should be at least 6 characters"}}"#,
        );
        assert_eq!(err.code(), Some("WEAK_PASSWORD"));
        assert_eq!(IdentityError::from(err), IdentityError::WeakPassword);

        let err = parse_error_body(502, "<html>bad gateway</html>");
        assert_eq!(err.code(), Some("HTTP_502"));
    }

    #[tokio::test]
    async fn restore_without_persisted_token_is_signed_out() {
        let backend = FirebaseBackend::new(
            FirebaseConfig::new("key".to_string()),
            Arc::new(MemoryStore::new()),
        );
        assert_eq!(backend.restore().await.unwrap(), None);
    }

    #[tokio::test]
    async fn sign_out_clears_persisted_token() {
        let store = Arc::new(MemoryStore::new());
        store.set(REFRESH_TOKEN_KEY, "refresh").unwrap();
        let backend = FirebaseBackend::new(FirebaseConfig::new("key".to_string()), store.clone());

        backend.sign_out().await;
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn commit_persists_refresh_token() {
        let store = Arc::new(MemoryStore::new());
        let backend = FirebaseBackend::new(FirebaseConfig::new("key".to_string()), store.clone());
        let credentials = Credentials {
            account: BackendAccount {
                uid: "uid-1".to_string(),
                email: "asha@example.com".to_string(),
                display_name: None,
                phone: None,
                role: None,
            },
            access_token: "id-token".to_string(),
            refresh_token: "refresh-1".to_string(),
        };

        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap(), None);
        backend.commit(&credentials);
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("refresh-1"));
        assert!(format!("{backend:?}").contains("signed_in: true"));
    }

    #[test]
    fn sign_up_request_carries_display_name() {
        let body = serde_json::to_value(PasswordRequest {
            email: "asha@example.com",
            password: "secret-1",
            display_name: Some("Asha"),
            return_secure_token: true,
        })
        .unwrap();
        assert_eq!(body["displayName"], "Asha");
        assert_eq!(body["returnSecureToken"], true);

        let body = serde_json::to_value(PasswordRequest {
            email: "asha@example.com",
            password: "secret-1",
            display_name: None,
            return_secure_token: true,
        })
        .unwrap();
        assert!(body.get("displayName").is_none());
    }

    #[tokio::test]
    async fn update_display_name_requires_session() {
        let backend = FirebaseBackend::new(
            FirebaseConfig::new("key".to_string()),
            Arc::new(MemoryStore::new()),
        );
        let err = backend.update_display_name("Name").await.unwrap_err();
        assert_eq!(err.code(), Some(codes::TOKEN_EXPIRED));
    }
}
