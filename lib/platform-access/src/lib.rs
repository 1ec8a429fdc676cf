//! Role-based authentication and routing gate for the agrokart storefront.
//!
//! This crate provides:
//! - The closed `Role` set and the route scopes it maps to
//! - An identity provider adapter over pluggable backends (Firebase, in-memory)
//! - The persisted role preference and the role resolver
//! - The `AuthGate` state machine and `RouteGuard` checks
//!
//! # Access Model
//!
//! A visitor's effective role is the role asserted by the backend when one
//! exists, otherwise the role they picked on this device, otherwise
//! `customer`. Admins may open every scope. No redirect is decided before
//! the identity provider has reported for the first time.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use agrokart_platform_access::{
//!     AuthGate, GateState, GuardDecision, IdentityProviderAdapter, InMemoryBackend,
//!     MemoryStore, Role, RolePreferenceStore, RouteGuard, Screen,
//! };
//!
//! # futures::executor::block_on(async {
//! let backend = Arc::new(InMemoryBackend::new());
//! backend.add_account("asha@example.com", "secret-1", Some("Asha"));
//!
//! let adapter = Arc::new(IdentityProviderAdapter::new(backend));
//! let preferences = RolePreferenceStore::new(Arc::new(MemoryStore::new()));
//! let gate = AuthGate::init(adapter, preferences).await;
//!
//! gate.pump();
//! assert_eq!(gate.visit("/vendor/dashboard"), Screen::RoleSelection);
//!
//! gate.select_role(Role::Vendor).unwrap();
//! let outcome = gate.login("asha@example.com", "secret-1").await.unwrap();
//! assert_eq!(outcome.destination(), Some("/vendor/dashboard"));
//! assert_eq!(gate.state(), GateState::Authenticated(Role::Vendor));
//!
//! let guard = RouteGuard::for_path("/vendor/dashboard");
//! assert_eq!(guard.check(&gate.session()), GuardDecision::Render);
//! # });
//! ```

pub mod error;
pub mod firebase;
pub mod gate;
pub mod guard;
pub mod identity;
pub mod memory;
pub mod preference;
pub mod provider;
pub mod resolver;
pub mod role;
pub mod routes;
pub mod session;
pub mod storage;

pub use error::{IdentityError, RoleParseError, StorageError};
pub use firebase::{FirebaseBackend, FirebaseConfig, FirebaseConfigBuilder};
pub use gate::{AttemptOutcome, AuthGate, GateSnapshot, GateState, Screen};
pub use guard::{GuardDecision, RouteGuard};
pub use identity::Identity;
pub use memory::InMemoryBackend;
pub use preference::{ROLE_PREFERENCE_KEY, RolePreferenceStore};
pub use provider::{
    BackendAccount, BackendError, Credentials, IdentityBackend, IdentityEvents,
    IdentityProviderAdapter,
};
pub use resolver::{DEFAULT_ROLE, RoleDivergence, resolve_role, role_divergence};
pub use role::{Role, RouteScope};
pub use routes::{AUTH_BYPASS_PATHS, AUTH_PATH, HOME_PATH, LOGIN_PATH, is_auth_bypass_path};
pub use session::Session;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
