//! Guest-only Route Lists
//!
//! Screens for visitors who are not signed in yet. A signed-in member landing on
//! one of these is sent back to the site root.

/// Where unauthenticated visitors are sent when they hit a member-only page.
pub const LOGIN_PATH: &str = "/login";

pub const GUEST_ONLY_PREFIXES: &[&str] = &[
    LOGIN_PATH,
    "/signup",
    "/forgot-password",
    "/reset-password",
    "/verify",
    "/success",
];
