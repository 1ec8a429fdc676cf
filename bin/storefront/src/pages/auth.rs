//! Role selection and sign-in pages.

use agrokart_platform_access::{AttemptOutcome, Role};
use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::components::Redirect;
use leptos_router::hooks::use_navigate;

use crate::auth::use_gate;

/// Roles a visitor may pick. Admin accounts are assigned by the backend.
pub const SELECTABLE_ROLES: [Role; 3] = [Role::Customer, Role::Vendor, Role::DeliveryPartner];

fn role_blurb(role: Role) -> &'static str {
    match role {
        Role::Customer => "Buy fresh produce straight from local farms.",
        Role::Vendor => "List your harvest and sell to nearby buyers.",
        Role::DeliveryPartner => "Pick up and deliver orders in your area.",
        Role::Admin => "Operate the marketplace.",
    }
}

/// Role picker shown to visitors who have not chosen a role yet.
#[component]
pub fn RoleSelector() -> impl IntoView {
    let ctx = use_gate();

    let choose = move |role: Role| {
        let Some(gate) = ctx.gate() else {
            return;
        };
        if let Err(e) = gate.select_role(role) {
            tracing::warn!(error = ?e, role = %role, "Failed to persist role selection");
        }
        ctx.refresh();
    };

    view! {
        <div class="role-selection">
            <h1>"Welcome to Agrokart"</h1>
            <p>"How would you like to use the marketplace?"</p>
            <div class="role-options">
                {SELECTABLE_ROLES
                    .into_iter()
                    .map(|role| {
                        view! {
                            <button class="role-option" on:click=move |_| choose(role)>
                                <span class="role-name">{role.label()}</span>
                                <span class="role-blurb">{role_blurb(role)}</span>
                            </button>
                        }
                    })
                    .collect_view()}
            </div>
        </div>
    }
}

/// Login and registration form.
///
/// Submitting records the form's role as the visitor's preference first,
/// so a fresh account without a backend role resolves to it.
#[component]
pub fn AuthForm(
    role: Role,
    #[prop(optional)] register: bool,
    #[prop(optional)] fixed_role: bool,
) -> impl IntoView {
    let ctx = use_gate();
    let navigate = use_navigate();

    let (role, set_role) = signal(role);
    let (registering, set_registering) = signal(register);
    let email = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let display_name = RwSignal::new(String::new());
    let (message, set_message) = signal(None::<String>);
    let (pending, set_pending) = signal(false);

    let on_submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let Some(gate) = ctx.gate() else {
            return;
        };

        let role = role.get_untracked();
        if gate.session().preference() != Some(role) {
            if let Err(e) = gate.select_role(role) {
                tracing::warn!(error = ?e, role = %role, "Failed to persist role selection");
            }
        }

        let email = email.get_untracked();
        let password = password.get_untracked();
        let display_name = display_name.get_untracked();
        let registering = registering.get_untracked();
        let navigate = navigate.clone();

        set_pending.set(true);
        set_message.set(None);
        spawn_local(async move {
            let result = if registering {
                gate.register(&email, &password, &display_name).await
            } else {
                gate.login(&email, &password).await
            };
            set_pending.set(false);

            match result {
                Ok(AttemptOutcome::Completed { destination, .. }) => {
                    ctx.refresh();
                    navigate(destination, Default::default());
                }
                Ok(AttemptOutcome::Superseded) => {}
                Err(e) => set_message.set(Some(e.user_message())),
            }
        });
    };

    let on_forgot = move |_| {
        let Some(gate) = ctx.gate() else {
            return;
        };
        let email = email.get_untracked();
        spawn_local(async move {
            match gate.reset_password(&email).await {
                Ok(()) => set_message.set(Some(
                    "If an account exists for that address, a reset link is on its way."
                        .to_string(),
                )),
                Err(e) => set_message.set(Some(e.user_message())),
            }
        });
    };

    view! {
        <div class="auth-page">
            <div class="auth-box">
                <h1>
                    {move || {
                        if registering.get() {
                            format!("Create your {} account", role.get().label())
                        } else {
                            format!("Sign in as {}", role.get().label())
                        }
                    }}
                </h1>

                {(!fixed_role)
                    .then(|| {
                        view! {
                            <div class="role-tabs">
                                {SELECTABLE_ROLES
                                    .into_iter()
                                    .map(|option| {
                                        view! {
                                            <button
                                                type="button"
                                                class="role-tab"
                                                class:active=move || role.get() == option
                                                on:click=move |_| set_role.set(option)
                                            >
                                                {option.label()}
                                            </button>
                                        }
                                    })
                                    .collect_view()}
                            </div>
                        }
                    })}

                <form class="auth-form" on:submit=on_submit>
                    {move || {
                        registering
                            .get()
                            .then(|| {
                                view! {
                                    <div class="form-group">
                                        <label for="display-name">"Name"</label>
                                        <input id="display-name" type="text" bind:value=display_name/>
                                    </div>
                                }
                            })
                    }}
                    <div class="form-group">
                        <label for="email">"Email"</label>
                        <input id="email" type="email" required=true bind:value=email/>
                    </div>
                    <div class="form-group">
                        <label for="password">"Password"</label>
                        <input id="password" type="password" required=true bind:value=password/>
                    </div>
                    <button type="submit" class="primary-btn" disabled=move || pending.get()>
                        {move || if registering.get() { "Create account" } else { "Sign in" }}
                    </button>
                </form>

                {move || message.get().map(|m| view! { <p class="form-message">{m}</p> })}

                <div class="auth-links">
                    <button
                        type="button"
                        class="link-button"
                        on:click=move |_| set_registering.update(|r| *r = !*r)
                    >
                        {move || {
                            if registering.get() {
                                "Already have an account? Sign in"
                            } else {
                                "New to Agrokart? Create an account"
                            }
                        }}
                    </button>
                    <button type="button" class="link-button" on:click=on_forgot>
                        "Forgot password?"
                    </button>
                </div>
            </div>
        </div>
    }
}

/// Effective role of a signed-in visitor.
fn signed_in_role() -> Memo<Option<Role>> {
    let ctx = use_gate();
    Memo::new(move |_| {
        ctx.snapshot
            .with(|s| s.session.identity().and(s.session.effective_role()))
    })
}

/// Unified authentication page: role picker, then the sign-in form.
#[component]
pub fn AuthPage() -> impl IntoView {
    let ctx = use_gate();
    let signed_in = signed_in_role();
    let preference = Memo::new(move |_| ctx.snapshot.with(|s| s.session.preference()));

    move || match (signed_in.get(), preference.get()) {
        (Some(role), _) => view! { <Redirect path=role.landing_path()/> }.into_any(),
        (None, Some(role)) => view! { <AuthForm role=role/> }.into_any(),
        (None, None) => view! { <RoleSelector/> }.into_any(),
    }
}

/// Member login page.
#[component]
pub fn LoginPage() -> impl IntoView {
    let ctx = use_gate();
    let signed_in = signed_in_role();
    let role = ctx
        .snapshot
        .with_untracked(|s| s.session.preference())
        .unwrap_or(Role::Customer);

    move || match signed_in.get() {
        Some(current) => view! { <Redirect path=current.landing_path()/> }.into_any(),
        None => view! { <AuthForm role=role/> }.into_any(),
    }
}

/// Login or registration page for one role, e.g. `/vendor/register`.
#[component]
pub fn RoleAuthPage(role: Role, #[prop(optional)] register: bool) -> impl IntoView {
    let signed_in = signed_in_role();

    move || match signed_in.get() {
        Some(current) => view! { <Redirect path=current.landing_path()/> }.into_any(),
        None => view! { <AuthForm role=role register=register fixed_role=true/> }.into_any(),
    }
}
