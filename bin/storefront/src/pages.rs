//! Page components for the application.
//!
//! Each page is a Leptos component that renders a specific route.

pub mod account;
pub mod auth;
pub mod dashboard;
pub mod home;

// Re-export all page components for convenient access
pub use account::AccountPage;
pub use auth::{AuthPage, LoginPage, RoleAuthPage};
pub use dashboard::{AdminDashboard, DeliveryDashboard, VendorDashboard};
pub use home::HomePage;
