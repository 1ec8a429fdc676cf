//! Gate and guard components.

use agrokart_platform_access::{GuardDecision, Role, RouteGuard, Screen};
use leptos::prelude::*;
use leptos_router::components::Redirect;
use leptos_router::hooks::use_location;

use crate::auth::use_gate;
use crate::pages::auth::{AuthForm, RoleSelector};

/// Shown while the identity provider has not reported yet.
#[component]
pub fn LoadingScreen() -> impl IntoView {
    let ctx = use_gate();

    view! {
        <div class="loading-screen">
            {move || match ctx.startup_error.get() {
                Some(message) => view! { <p class="error-message">{message}</p> }.into_any(),
                None => view! { <p>"Loading..."</p> }.into_any(),
            }}
        </div>
    }
}

/// Application-shell gate: decides whether the routed page, the role
/// picker or the sign-in form is shown for the current path.
///
/// `visit` can move the gate (an anonymous visitor into role selection or
/// authentication), so the snapshot is refreshed after every visit.
#[component]
pub fn Gatekeeper(children: ChildrenFn) -> impl IntoView {
    let ctx = use_gate();
    let location = use_location();
    let screen = RwSignal::new((Screen::Loading, Role::Customer));

    Effect::new(move |_| {
        ctx.snapshot.track();
        let path = location.pathname.get();
        let Some(gate) = ctx.gate() else {
            return;
        };
        let next = gate.visit(&path);
        ctx.refresh();

        let role = ctx
            .snapshot
            .with_untracked(|s| s.session.preference())
            .unwrap_or(Role::Customer);
        if screen.get_untracked() != (next, role) {
            screen.set((next, role));
        }
    });

    move || match screen.get() {
        (Screen::Loading, _) => view! { <LoadingScreen/> }.into_any(),
        (Screen::RoleSelection, _) => view! { <RoleSelector/> }.into_any(),
        (Screen::Authentication, role) => view! { <AuthForm role=role/> }.into_any(),
        (Screen::Page, _) => children().into_any(),
    }
}

/// Renders `children` only for visitors the guard admits.
#[component]
pub fn RoleGuard(guard: RouteGuard, children: ChildrenFn) -> impl IntoView {
    let ctx = use_gate();
    let decision = Memo::new(move |_| ctx.snapshot.with(|s| guard.check(&s.session)));

    move || match decision.get() {
        GuardDecision::Loading => view! { <LoadingScreen/> }.into_any(),
        GuardDecision::Render => children().into_any(),
        GuardDecision::Redirect(path) => view! { <Redirect path=path/> }.into_any(),
    }
}
