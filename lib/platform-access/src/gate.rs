//! The auth gate.
//!
//! `AuthGate` owns the session and drives the gate state machine from
//! identity-changed events, role selection and the login/register/logout
//! calls made by the UI. It is created once per application shell with
//! [`AuthGate::init`] and released with [`AuthGate::teardown`].
//!
//! Events are consumed in receipt order, either by awaiting
//! [`AuthGate::run`] or by calling [`AuthGate::pump`] to apply whatever is
//! already queued. Neither holds a lock across an await.

use futures::FutureExt;
use futures::StreamExt;
use futures::future::poll_fn;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::task::{Poll, Waker};
use tracing::{debug, info, warn};

use agrokart_core::AuthAttemptId;

use crate::error::{IdentityError, StorageError};
use crate::identity::Identity;
use crate::preference::RolePreferenceStore;
use crate::provider::{Credentials, IdentityEvents, IdentityProviderAdapter};
use crate::role::Role;
use crate::routes::is_auth_bypass_path;
use crate::session::Session;

/// States of the auth gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// The identity provider has not reported yet.
    Loading,
    /// No identity, nothing chosen yet.
    Anonymous,
    /// The visitor must pick a role before continuing.
    AwaitingRoleSelection,
    /// A role is chosen and the visitor is on the authentication screen.
    Authenticating,
    /// Signed in with the given effective role.
    Authenticated(Role),
}

/// What the application shell shows for a visited path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Loading indicator; nothing may redirect yet.
    Loading,
    /// Role picker.
    RoleSelection,
    /// Login/registration form.
    Authentication,
    /// The requested page (still subject to its route guard).
    Page,
}

/// Result of a login or registration call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The attempt won; the visitor is signed in with `role`.
    Completed {
        /// Effective role after sign-in.
        role: Role,
        /// Where to send the visitor next.
        destination: &'static str,
    },
    /// A later attempt or a logout started before this one resolved, so
    /// its result was discarded, or the gate was torn down meanwhile.
    Superseded,
}

impl AttemptOutcome {
    /// Returns the post-login destination of a completed attempt.
    #[must_use]
    pub fn destination(&self) -> Option<&'static str> {
        match self {
            Self::Completed { destination, .. } => Some(*destination),
            Self::Superseded => None,
        }
    }
}

/// Point-in-time copy of the gate for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSnapshot {
    /// Gate state.
    pub state: GateState,
    /// Session the guards decide on.
    pub session: Session,
}

impl Default for GateSnapshot {
    /// The snapshot of a gate that has not heard from the provider yet.
    fn default() -> Self {
        Self {
            state: GateState::Loading,
            session: Session::unsettled(None),
        }
    }
}

struct GateInner {
    state: GateState,
    session: Session,
    attempt: Option<AuthAttemptId>,
    torn_down: bool,
}

impl GateInner {
    fn transition(&mut self, next: GateState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "Auth gate transition");
            self.state = next;
        }
    }

    /// Recomputes the state from the session alone.
    fn recompute(&mut self) {
        let next = match self.session.effective_role() {
            Some(role) => {
                if let Some(divergence) = self.session.role_divergence() {
                    warn!(
                        asserted = %divergence.asserted,
                        preferred = %divergence.preferred,
                        "Stored role preference disagrees with the account's role"
                    );
                }
                GateState::Authenticated(role)
            }
            None => GateState::Anonymous,
        };
        self.transition(next);
    }
}

#[derive(Default)]
struct EventPump {
    events: Option<IdentityEvents>,
    runner: Option<Waker>,
}

/// Role-based authentication gate.
pub struct AuthGate {
    adapter: Arc<IdentityProviderAdapter>,
    preferences: RolePreferenceStore,
    inner: Mutex<GateInner>,
    pump: Mutex<EventPump>,
}

impl AuthGate {
    /// Creates the gate at application start.
    ///
    /// The session is seeded from the stored role preference before any
    /// identity event is applied, and the gate subscribes to the adapter.
    /// The gate starts in `Loading`.
    pub async fn init(
        adapter: Arc<IdentityProviderAdapter>,
        preferences: RolePreferenceStore,
    ) -> Self {
        let preference = match preferences.load() {
            Ok(preference) => preference,
            Err(e) => {
                warn!(error = ?e, "Failed to read role preference; starting without one");
                None
            }
        };
        let events = adapter.subscribe().await;
        debug!(preference = ?preference, "Auth gate initialised");

        Self {
            adapter,
            preferences,
            inner: Mutex::new(GateInner {
                state: GateState::Loading,
                session: Session::unsettled(preference),
                attempt: None,
                torn_down: false,
            }),
            pump: Mutex::new(EventPump {
                events: Some(events),
                runner: None,
            }),
        }
    }

    /// Stops consuming identity events and ends [`run`](Self::run).
    ///
    /// The gate keeps answering queries with its last state. Teardown is
    /// not a logout: the provider session is left alone, and a sign-in
    /// still in flight is committed to the provider when it resolves so
    /// the next gate restores it.
    pub fn teardown(&self) {
        {
            let mut pump = self.pump.lock();
            pump.events = None;
            if let Some(runner) = pump.runner.take() {
                runner.wake();
            }
        }
        self.inner.lock().torn_down = true;
        debug!("Auth gate torn down");
    }

    /// Applies identity events as they arrive until the gate is torn down
    /// or the adapter goes away.
    pub async fn run(&self) {
        while self.next_event().await {}
    }

    /// Waits for the next identity event and applies it. Returns false once
    /// no further events can arrive.
    pub async fn next_event(&self) -> bool {
        poll_fn(|cx| {
            let mut pump = self.pump.lock();
            let Some(events) = pump.events.as_mut() else {
                return Poll::Ready(false);
            };
            match events.poll_next_unpin(cx) {
                Poll::Ready(Some(identity)) => {
                    self.handle_identity_changed(identity);
                    Poll::Ready(true)
                }
                Poll::Ready(None) => {
                    pump.events = None;
                    Poll::Ready(false)
                }
                Poll::Pending => {
                    pump.runner = Some(cx.waker().clone());
                    Poll::Pending
                }
            }
        })
        .await
    }

    /// Applies every identity event already queued. Returns how many were
    /// applied.
    pub fn pump(&self) -> usize {
        let mut pump = self.pump.lock();
        let mut applied = 0;
        while let Some(events) = pump.events.as_mut() {
            match events.next().now_or_never() {
                Some(Some(identity)) => {
                    self.handle_identity_changed(identity);
                    applied += 1;
                }
                Some(None) => pump.events = None,
                None => break,
            }
        }
        // Polling here replaced the runner's waker in the channel.
        if let Some(runner) = pump.runner.take() {
            runner.wake();
        }
        applied
    }

    /// Applies one identity-changed event.
    ///
    /// The first event settles the session. Later events that carry the
    /// identity already held leave the state alone; any other event
    /// recomputes the state from the session.
    pub fn handle_identity_changed(&self, identity: Option<Identity>) {
        let mut inner = self.inner.lock();
        if inner.torn_down {
            debug!("Ignoring identity event after teardown");
            return;
        }
        let first = !inner.session.is_settled();
        let changed = inner.session.apply_identity(identity);
        if first || changed {
            inner.recompute();
        }
    }

    /// Decides what the shell shows for `path`, moving an anonymous
    /// visitor into role selection or authentication as needed.
    pub fn visit(&self, path: &str) -> Screen {
        let mut inner = self.inner.lock();
        if !inner.session.is_settled() {
            return Screen::Loading;
        }
        if is_auth_bypass_path(path) {
            return Screen::Page;
        }
        match inner.state {
            GateState::Loading => Screen::Loading,
            GateState::Anonymous => {
                if inner.session.preference().is_some() {
                    inner.transition(GateState::Authenticating);
                    Screen::Authentication
                } else {
                    inner.transition(GateState::AwaitingRoleSelection);
                    Screen::RoleSelection
                }
            }
            GateState::AwaitingRoleSelection => Screen::RoleSelection,
            GateState::Authenticating => Screen::Authentication,
            GateState::Authenticated(_) => Screen::Page,
        }
    }

    /// Records the visitor's role choice.
    ///
    /// The choice takes effect in the session even if persisting it fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the preference could not be written to storage.
    pub fn select_role(&self, role: Role) -> agrokart_core::Result<(), StorageError> {
        {
            let mut inner = self.inner.lock();
            inner.session.set_preference(Some(role));
            match inner.state {
                GateState::Anonymous | GateState::AwaitingRoleSelection => {
                    inner.transition(GateState::Authenticating);
                }
                GateState::Authenticated(_) => inner.recompute(),
                GateState::Loading | GateState::Authenticating => {}
            }
        }
        info!(role = %role, "Role selected");
        self.preferences.store(role)
    }

    /// Signs in.
    ///
    /// # Errors
    ///
    /// Returns the provider failure; the gate stays where it was.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AttemptOutcome, IdentityError> {
        let attempt = self.begin_attempt();
        let result = self.adapter.authenticate(email, password).await;
        self.finish_attempt(attempt, result)
    }

    /// Registers a new account and signs in.
    ///
    /// # Errors
    ///
    /// Returns the provider failure; the gate stays where it was.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AttemptOutcome, IdentityError> {
        let attempt = self.begin_attempt();
        let result = self
            .adapter
            .create_account(email, password, display_name)
            .await;
        self.finish_attempt(attempt, result)
    }

    /// Signs out, clears the role preference and invalidates any
    /// authentication attempt still in flight. Safe to call repeatedly.
    pub async fn logout(&self) {
        self.inner.lock().attempt = None;
        self.adapter.logout().await;
        if let Err(e) = self.preferences.clear() {
            warn!(error = ?e, "Failed to clear role preference on logout");
        }
        self.pump();

        let mut inner = self.inner.lock();
        inner.session.apply_identity(None);
        inner.session.set_preference(None);
        inner.transition(GateState::Anonymous);
    }

    /// Requests a password reset email. Unknown addresses report success.
    ///
    /// # Errors
    ///
    /// `InvalidEmail`, `NetworkUnavailable`, or `Unexpected`.
    pub async fn reset_password(&self, email: &str) -> Result<(), IdentityError> {
        self.adapter.reset_password(email).await
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> GateState {
        self.inner.lock().state
    }

    /// Returns a copy of the session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.lock().session.clone()
    }

    /// Returns the state and session together.
    #[must_use]
    pub fn snapshot(&self) -> GateSnapshot {
        let inner = self.inner.lock();
        GateSnapshot {
            state: inner.state,
            session: inner.session.clone(),
        }
    }

    /// Returns the identity provider adapter.
    #[must_use]
    pub fn adapter(&self) -> &Arc<IdentityProviderAdapter> {
        &self.adapter
    }

    fn begin_attempt(&self) -> AuthAttemptId {
        let attempt = AuthAttemptId::new();
        let mut inner = self.inner.lock();
        if let Some(previous) = inner.attempt.replace(attempt) {
            debug!(%previous, %attempt, "Superseding in-flight authentication attempt");
        }
        if matches!(
            inner.state,
            GateState::Anonymous | GateState::AwaitingRoleSelection
        ) {
            inner.transition(GateState::Authenticating);
        }
        attempt
    }

    /// Settles an attempt. Only the current attempt commits its
    /// credentials; a superseded one is dropped without touching the
    /// provider session.
    fn finish_attempt(
        &self,
        attempt: AuthAttemptId,
        result: Result<Credentials, IdentityError>,
    ) -> Result<AttemptOutcome, IdentityError> {
        self.pump();

        let outcome = {
            let mut inner = self.inner.lock();
            if inner.attempt != Some(attempt) {
                debug!(%attempt, "Discarding superseded authentication result");
                return Ok(AttemptOutcome::Superseded);
            }
            inner.attempt = None;
            let credentials = result?;

            // Committed under the gate lock so a logout cannot slip in between.
            let identity = self.adapter.commit(&credentials);
            if inner.torn_down {
                debug!(%attempt, "Authentication finished after teardown");
                return Ok(AttemptOutcome::Superseded);
            }

            if inner.session.identity() != Some(&identity) {
                inner.session.apply_identity(Some(identity));
            }
            inner.recompute();
            match inner.state {
                GateState::Authenticated(role) => AttemptOutcome::Completed {
                    role,
                    destination: role.landing_path(),
                },
                // An identity is present, so the role always resolves.
                _ => AttemptOutcome::Superseded,
            }
        };

        // Consume the event the commit just published.
        self.pump();
        Ok(outcome)
    }
}

impl fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("AuthGate")
            .field("state", &inner.state)
            .field("settled", &inner.session.is_settled())
            .field("attempt", &inner.attempt)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;
    use crate::preference::ROLE_PREFERENCE_KEY;
    use crate::storage::{KeyValueStore, MemoryStore};
    use agrokart_core::IdentityId;

    struct Harness {
        backend: Arc<InMemoryBackend>,
        store: Arc<MemoryStore>,
        gate: AuthGate,
    }

    async fn harness() -> Harness {
        let backend = Arc::new(InMemoryBackend::new());
        let store = Arc::new(MemoryStore::new());
        let adapter = Arc::new(IdentityProviderAdapter::new(backend.clone()));
        let gate = AuthGate::init(adapter, RolePreferenceStore::new(store.clone())).await;
        Harness {
            backend,
            store,
            gate,
        }
    }

    fn identity(role: Option<Role>) -> Identity {
        Identity::new(IdentityId::from("uid-1"), "ravi@example.com", Some("Ravi")).with_role(role)
    }

    #[tokio::test]
    async fn starts_loading_until_first_event() {
        let h = harness().await;
        assert_eq!(h.gate.state(), GateState::Loading);
        assert_eq!(h.gate.visit("/home"), Screen::Loading);
        assert_eq!(h.gate.visit("/auth"), Screen::Loading);

        assert_eq!(h.gate.pump(), 1);
        assert_eq!(h.gate.state(), GateState::Anonymous);
        assert!(h.gate.session().is_settled());
    }

    #[tokio::test]
    async fn first_event_with_identity_authenticates() {
        let h = harness().await;
        h.gate.handle_identity_changed(Some(identity(Some(Role::Vendor))));
        assert_eq!(h.gate.state(), GateState::Authenticated(Role::Vendor));
        assert_eq!(h.gate.visit("/vendor/dashboard"), Screen::Page);
    }

    #[tokio::test]
    async fn anonymous_without_preference_awaits_role_selection() {
        let h = harness().await;
        h.gate.pump();
        assert_eq!(h.gate.visit("/home"), Screen::RoleSelection);
        assert_eq!(h.gate.state(), GateState::AwaitingRoleSelection);
    }

    #[tokio::test]
    async fn bypass_paths_render_without_a_role() {
        let h = harness().await;
        h.gate.pump();
        assert_eq!(h.gate.visit("/vendor/register"), Screen::Page);
        assert_eq!(h.gate.visit("/login/"), Screen::Page);
        assert_eq!(h.gate.state(), GateState::Anonymous);
    }

    #[tokio::test]
    async fn stored_preference_goes_straight_to_authentication() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = Arc::new(MemoryStore::new());
        store.set(ROLE_PREFERENCE_KEY, "vendor").unwrap();
        let adapter = Arc::new(IdentityProviderAdapter::new(backend));
        let gate = AuthGate::init(adapter, RolePreferenceStore::new(store)).await;

        assert_eq!(gate.session().preference(), Some(Role::Vendor));
        gate.pump();
        assert_eq!(gate.visit("/vendor/dashboard"), Screen::Authentication);
        assert_eq!(gate.state(), GateState::Authenticating);
    }

    #[tokio::test]
    async fn select_role_persists_and_moves_to_authenticating() {
        let h = harness().await;
        h.gate.pump();
        h.gate.visit("/home");
        h.gate.select_role(Role::DeliveryPartner).unwrap();

        assert_eq!(h.gate.state(), GateState::Authenticating);
        assert_eq!(
            h.store.get(ROLE_PREFERENCE_KEY).unwrap().as_deref(),
            Some("delivery_partner")
        );
    }

    #[tokio::test]
    async fn failed_login_stays_authenticating() {
        let h = harness().await;
        h.backend.add_account("asha@example.com", "secret-1", Some("Asha"));
        h.gate.pump();
        h.gate.select_role(Role::Customer).unwrap();

        let err = h.gate.login("asha@example.com", "wrong-pw").await.unwrap_err();
        assert_eq!(err, IdentityError::InvalidCredentials);
        assert_eq!(h.gate.state(), GateState::Authenticating);

        h.backend.set_network_available(false);
        let err = h.gate.login("asha@example.com", "secret-1").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(h.gate.state(), GateState::Authenticating);
    }

    #[tokio::test]
    async fn login_returns_role_destination() {
        let h = harness().await;
        h.backend.add_account("asha@example.com", "secret-1", None);
        h.backend.set_role("asha@example.com", Some(Role::DeliveryPartner));
        h.gate.pump();

        let outcome = h.gate.login("asha@example.com", "secret-1").await.unwrap();
        assert_eq!(
            outcome,
            AttemptOutcome::Completed {
                role: Role::DeliveryPartner,
                destination: "/delivery/dashboard",
            }
        );
        assert_eq!(h.gate.state(), GateState::Authenticated(Role::DeliveryPartner));
    }

    #[tokio::test]
    async fn login_before_first_event_keeps_event_order() {
        let h = harness().await;
        h.backend.add_account("asha@example.com", "secret-1", None);

        // The queued "signed out" event from subscription is applied first.
        let outcome = h.gate.login("asha@example.com", "secret-1").await.unwrap();
        assert_eq!(outcome.destination(), Some("/home"));
        assert_eq!(h.gate.pump(), 0);
        assert_eq!(h.gate.state(), GateState::Authenticated(Role::Customer));
    }

    #[tokio::test]
    async fn reselecting_role_while_signed_in_recomputes() {
        let h = harness().await;
        h.backend.add_account("asha@example.com", "secret-1", None);
        h.gate.pump();
        h.gate.login("asha@example.com", "secret-1").await.unwrap();
        assert_eq!(h.gate.state(), GateState::Authenticated(Role::Customer));

        h.gate.select_role(Role::Vendor).unwrap();
        assert_eq!(h.gate.state(), GateState::Authenticated(Role::Vendor));

        // A backend-asserted role always wins over the preference.
        h.backend.set_role("asha@example.com", Some(Role::Customer));
        h.gate.login("asha@example.com", "secret-1").await.unwrap();
        assert_eq!(h.gate.state(), GateState::Authenticated(Role::Customer));
        assert!(h.gate.session().role_divergence().is_some());
    }

    #[tokio::test]
    async fn provider_sign_out_collapses_to_anonymous() {
        let h = harness().await;
        h.gate.handle_identity_changed(Some(identity(Some(Role::Admin))));
        h.gate.handle_identity_changed(None);
        assert_eq!(h.gate.state(), GateState::Anonymous);
    }

    #[tokio::test]
    async fn repeated_identity_event_is_a_no_op() {
        let h = harness().await;
        h.gate.handle_identity_changed(None);
        h.gate.select_role(Role::Vendor).unwrap();
        h.gate.handle_identity_changed(None);
        assert_eq!(h.gate.state(), GateState::Authenticating);
    }

    #[tokio::test]
    async fn teardown_stops_event_processing() {
        let h = harness().await;
        h.gate.teardown();
        assert_eq!(h.gate.pump(), 0);
        h.gate.handle_identity_changed(Some(identity(None)));
        assert_eq!(h.gate.state(), GateState::Loading);

        // run returns immediately once torn down
        h.gate.run().await;
    }

    #[tokio::test]
    async fn teardown_keeps_provider_session() {
        let h = harness().await;
        h.backend.add_account("asha@example.com", "secret-1", None);
        h.gate.pump();
        h.gate.login("asha@example.com", "secret-1").await.unwrap();
        assert_eq!(h.gate.state(), GateState::Authenticated(Role::Customer));

        h.gate.teardown();
        assert_eq!(h.backend.persisted_session().as_deref(), Some("asha@example.com"));
        assert!(h.gate.adapter().current().is_some());
    }

    #[tokio::test]
    async fn run_ends_after_teardown() {
        let h = harness().await;
        let gate = &h.gate;
        futures::join!(gate.run(), async {
            gate.teardown();
        });
        assert_eq!(gate.state(), GateState::Anonymous);
    }

    #[tokio::test]
    async fn visit_transition_shows_in_snapshot() {
        let h = harness().await;
        h.gate.pump();
        let before = h.gate.snapshot();
        assert_eq!(before.state, GateState::Anonymous);

        assert_eq!(h.gate.visit("/vendor/dashboard"), Screen::RoleSelection);
        let after = h.gate.snapshot();
        assert_eq!(after.state, GateState::AwaitingRoleSelection);
        assert_ne!(before, after);

        // A repeated visit leaves the snapshot as it was.
        h.gate.visit("/vendor/dashboard");
        assert_eq!(h.gate.snapshot(), after);
    }

    #[tokio::test]
    async fn next_event_applies_one_event() {
        let h = harness().await;
        assert!(h.gate.next_event().await);
        assert_eq!(h.gate.state(), GateState::Anonymous);
        assert_eq!(h.gate.snapshot().state, GateState::Anonymous);
        assert_ne!(h.gate.snapshot(), GateSnapshot::default());
    }

    #[tokio::test]
    async fn reset_password_passthrough() {
        let h = harness().await;
        h.gate.reset_password("nobody@example.com").await.unwrap();
        assert_eq!(
            h.gate.reset_password("not-an-email").await,
            Err(IdentityError::InvalidEmail)
        );
    }
}
