//! Auth gate wiring for the application shell.
//!
//! The gate lives only in the browser. During server rendering, and until
//! the browser gate has been created, the shell sees the default snapshot
//! (loading) and makes no redirect decisions.

use agrokart_platform_access::{AuthGate, FirebaseConfig, GateSnapshot};
use leptos::prelude::*;
use std::sync::Arc;

/// Server function handing the identity provider settings to the browser.
#[server]
pub async fn identity_settings() -> Result<FirebaseConfig, ServerFnError> {
    use axum::Extension;

    let Extension(identity): Extension<Arc<FirebaseConfig>> = leptos_axum::extract().await?;
    Ok(identity.as_ref().clone())
}

/// Shared handle on the gate, provided as context by the app root.
#[derive(Clone, Copy)]
pub struct GateContext {
    /// Latest gate snapshot; everything that renders from auth state reads this.
    pub snapshot: RwSignal<GateSnapshot>,
    /// Set when the gate could not be started.
    pub startup_error: RwSignal<Option<String>>,
    gate: StoredValue<Option<Arc<AuthGate>>>,
}

impl GateContext {
    fn new() -> Self {
        Self {
            snapshot: RwSignal::new(GateSnapshot::default()),
            startup_error: RwSignal::new(None),
            gate: StoredValue::new(None),
        }
    }

    /// Returns the gate once it has been created.
    pub fn gate(&self) -> Option<Arc<AuthGate>> {
        self.gate.try_get_value().flatten()
    }

    /// Copies the gate's current state into the snapshot signal. Leaves
    /// the signal untouched when nothing changed.
    pub fn refresh(&self) {
        if let Some(gate) = self.gate() {
            let next = gate.snapshot();
            if self.snapshot.with_untracked(|current| *current != next) {
                self.snapshot.set(next);
            }
        }
    }
}

/// Creates the gate context and, in the browser, starts the gate.
pub fn provide_gate_context() -> GateContext {
    let ctx = GateContext::new();
    provide_context(ctx);

    #[cfg(feature = "hydrate")]
    start(ctx);

    on_cleanup(move || {
        if let Some(gate) = ctx.gate() {
            gate.teardown();
        }
    });
    ctx
}

/// Returns the gate context provided by the app root.
pub fn use_gate() -> GateContext {
    expect_context::<GateContext>()
}

#[cfg(feature = "hydrate")]
fn start(ctx: GateContext) {
    use crate::browser::BrowserStore;
    use agrokart_platform_access::{
        FirebaseBackend, IdentityProviderAdapter, KeyValueStore, RolePreferenceStore,
    };
    use leptos::task::spawn_local;

    spawn_local(async move {
        let settings = match identity_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load identity settings");
                ctx.startup_error
                    .set(Some("Sign-in is unavailable right now.".to_string()));
                return;
            }
        };

        let store: Arc<dyn KeyValueStore> = Arc::new(BrowserStore);
        let backend = Arc::new(FirebaseBackend::new(settings, store.clone()));
        let adapter = Arc::new(IdentityProviderAdapter::new(backend));
        let gate = Arc::new(AuthGate::init(adapter, RolePreferenceStore::new(store)).await);

        ctx.gate.set_value(Some(gate.clone()));
        while gate.next_event().await {
            ctx.refresh();
        }
    });
}
