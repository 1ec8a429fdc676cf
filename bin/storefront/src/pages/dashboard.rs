//! Role dashboards.
//!
//! Each dashboard is only reachable through its role guard.

use agrokart_platform_access::Role;
use leptos::prelude::*;

use crate::auth::use_gate;

#[component]
fn Dashboard(role: Role, summary: &'static str) -> impl IntoView {
    let ctx = use_gate();
    let name = move || {
        ctx.snapshot.with(|s| {
            s.session
                .identity()
                .map(|identity| identity.display_name().to_string())
                .unwrap_or_default()
        })
    };

    view! {
        <div class="dashboard">
            <h1>{format!("{} dashboard", role.label())}</h1>
            <p class="dashboard-user">{name}</p>
            <p>{summary}</p>
        </div>
    }
}

/// `/vendor/dashboard`
#[component]
pub fn VendorDashboard() -> impl IntoView {
    view! { <Dashboard role=Role::Vendor summary="Manage your listings and incoming orders."/> }
}

/// `/delivery/dashboard`
#[component]
pub fn DeliveryDashboard() -> impl IntoView {
    view! { <Dashboard role=Role::DeliveryPartner summary="See the deliveries assigned to you."/> }
}

/// `/admin/dashboard`
#[component]
pub fn AdminDashboard() -> impl IntoView {
    view! {
        <Dashboard role=Role::Admin summary="Oversee vendors, delivery partners and customers."/>
    }
}
