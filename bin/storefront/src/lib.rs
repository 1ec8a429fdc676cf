//! agrokart web storefront.
//!
//! This crate provides the Leptos application shell that puts the auth
//! gate in front of the marketplace's role-scoped page trees.

#![allow(non_snake_case)]

pub mod app;
pub mod auth;
pub mod guard;
pub mod pages;

#[cfg(feature = "hydrate")]
pub mod browser;

#[cfg(feature = "ssr")]
pub mod config;

#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    use crate::app::App;
    console_error_panic_hook::set_once();
    leptos::mount::hydrate_body(App);
}
