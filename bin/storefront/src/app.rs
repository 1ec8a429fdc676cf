//! Main Leptos application component and routing.

use agrokart_platform_access::{Role, RouteGuard, RouteScope};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_meta::{Title, provide_meta_context};
use leptos_router::{
    components::{Route, Router, Routes},
    path,
};

use crate::auth::{provide_gate_context, use_gate};
use crate::guard::{Gatekeeper, RoleGuard};
use crate::pages::{
    AccountPage, AdminDashboard, AuthPage, DeliveryDashboard, HomePage, LoginPage, RoleAuthPage,
    VendorDashboard,
};

/// The main application component.
#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();
    provide_gate_context();

    view! {
        <Title text="Agrokart"/>
        <Router>
            <Header/>
            <main class="container">
                <Gatekeeper>
                    <Routes fallback=|| "Page not found.".into_view()>
                        <Route path=path!("/") view=HomePage/>
                        <Route path=path!("/home") view=HomePage/>
                        <Route path=path!("/auth") view=AuthPage/>
                        <Route path=path!("/login") view=LoginPage/>
                        <Route
                            path=path!("/vendor/login")
                            view=|| view! { <RoleAuthPage role=Role::Vendor/> }
                        />
                        <Route
                            path=path!("/vendor/register")
                            view=|| view! { <RoleAuthPage role=Role::Vendor register=true/> }
                        />
                        <Route
                            path=path!("/delivery/login")
                            view=|| view! { <RoleAuthPage role=Role::DeliveryPartner/> }
                        />
                        <Route
                            path=path!("/delivery/register")
                            view=|| view! { <RoleAuthPage role=Role::DeliveryPartner register=true/> }
                        />
                        <Route
                            path=path!("/vendor/dashboard")
                            view=|| view! {
                                <RoleGuard guard=RouteGuard::for_scope(RouteScope::Vendor)>
                                    <VendorDashboard/>
                                </RoleGuard>
                            }
                        />
                        <Route
                            path=path!("/delivery/dashboard")
                            view=|| view! {
                                <RoleGuard guard=RouteGuard::for_scope(RouteScope::Delivery)>
                                    <DeliveryDashboard/>
                                </RoleGuard>
                            }
                        />
                        <Route
                            path=path!("/admin/dashboard")
                            view=|| view! {
                                <RoleGuard guard=RouteGuard::for_scope(RouteScope::Admin)>
                                    <AdminDashboard/>
                                </RoleGuard>
                            }
                        />
                        <Route
                            path=path!("/account")
                            view=|| view! {
                                <RoleGuard guard=RouteGuard::members()>
                                    <AccountPage/>
                                </RoleGuard>
                            }
                        />
                    </Routes>
                </Gatekeeper>
            </main>
        </Router>
    }
}

/// Header component with navigation and user menu.
#[component]
fn Header() -> impl IntoView {
    let ctx = use_gate();
    let account = Memo::new(move |_| {
        ctx.snapshot.with(|s| {
            s.session
                .identity()
                .map(|identity| (identity.display_name().to_string(), s.session.effective_role()))
        })
    });

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
        <header class="header">
            <div class="header-left">
                <a href="/home" class="logo">"Agrokart"</a>
            </div>
            <div class="header-right">
                {move || match account.get() {
                    Some((name, role)) => view! {
                        <div class="user-menu">
                            {role
                                .filter(|r| *r != Role::Customer)
                                .map(|r| view! { <a href=r.landing_path()>"Dashboard"</a> })}
                            <a href="/account" class="user-name">{name}</a>
                            <span class="role-badge">{role.map(|r| r.label())}</span>
                            <button class="logout-button" on:click=on_logout>"Log out"</button>
                        </div>
                    }
                    .into_any(),
                    None => view! { <a href="/auth" class="login-button">"Log in"</a> }.into_any(),
                }}
            </div>
        </header>
    }
}
