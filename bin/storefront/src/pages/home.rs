//! Home page component.

use leptos::prelude::*;

use crate::auth::use_gate;

/// Customer landing page.
#[component]
pub fn HomePage() -> impl IntoView {
    let ctx = use_gate();
    let greeting = move || {
        ctx.snapshot.with(|s| {
            s.session
                .identity()
                .map(|identity| format!("Welcome back, {}!", identity.display_name()))
                .unwrap_or_else(|| "Welcome to Agrokart".to_string())
        })
    };

    view! {
        <div class="home-page">
            <h1>{greeting}</h1>
            <p>"Fresh produce from farms near you, delivered to your door."</p>
        </div>
    }
}
