//! Navigation-path normalization
//!
//! The host application's router pushes raw pathnames (`/settings/profile`)
//! on every navigation change; placement ids embed the normalized token
//! (`settings-profile`).

/// Route used before the host router has reported anything.
pub const INITIAL_ROUTE: &str = "unknown";

/// Normalize a router pathname into a route token.
///
/// Leading separators are stripped, internal separators become `-`, and an
/// empty path (the root screen) maps to `"index"`.
pub fn normalize_route(pathname: &str) -> String {
    let trimmed = pathname.trim_start_matches('/');
    if trimmed.is_empty() {
        return "index".to_string();
    }
    trimmed.replace('/', "-")
}
