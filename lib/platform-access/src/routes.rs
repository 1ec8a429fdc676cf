//! Well-known storefront paths.

/// Unified role-selection and authentication screen.
pub const AUTH_PATH: &str = "/auth";

/// Standalone login page used by member-only pages.
pub const LOGIN_PATH: &str = "/login";

/// Customer landing page.
pub const HOME_PATH: &str = "/home";

/// Paths the app shell renders without a settled role.
///
/// These are the login and registration pages of every role; gating them
/// behind role selection would make them unreachable.
pub const AUTH_BYPASS_PATHS: [&str; 6] = [
    "/login",
    "/auth",
    "/vendor/login",
    "/vendor/register",
    "/delivery/login",
    "/delivery/register",
];

/// Strips trailing slashes, keeping the root path intact.
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Returns true if `path` is in the auth-bypass set.
#[must_use]
pub fn is_auth_bypass_path(path: &str) -> bool {
    AUTH_BYPASS_PATHS.contains(&normalize_path(path))
}
