//! Account page component.

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::auth::use_gate;

/// Profile details for any signed-in visitor.
#[component]
pub fn AccountPage() -> impl IntoView {
    let ctx = use_gate();

    let on_logout = move |_| {
        let Some(gate) = ctx.gate() else {
            return;
        };
        spawn_local(async move {
            gate.logout().await;
            ctx.refresh();
        });
    };

    view! {
        <div class="account-page">
            <h1>"Your account"</h1>
            {move || {
                ctx.snapshot.with(|s| {
                    let session = &s.session;
                    session.identity().map(|identity| {
                        let role = session.effective_role().map(|r| r.label()).unwrap_or_default();
                        let divergence = session.role_divergence().map(|d| {
                            format!(
                                "Your account is registered as {}. The {} role picked on this device is not active.",
                                d.asserted.label(),
                                d.preferred.label(),
                            )
                        });
                        view! {
                            <dl class="account-details">
                                <dt>"Name"</dt>
                                <dd>{identity.display_name().to_string()}</dd>
                                <dt>"Email"</dt>
                                <dd>{identity.email().to_string()}</dd>
                                <dt>"Phone"</dt>
                                <dd>{identity.phone().unwrap_or("Not provided").to_string()}</dd>
                                <dt>"Role"</dt>
                                <dd>{role}</dd>
                            </dl>
                            {divergence.map(|notice| view! { <p class="notice">{notice}</p> })}
                        }
                    })
                })
            }}
            <button class="secondary-btn" on:click=on_logout>"Log out"</button>
        </div>
    }
}
