//! Member-only Route Lists
//!
//! Pages that only make sense for a signed-in member: conversations, bids,
//! collections, the member's own profile and gallery, and account settings.
//! Unauthenticated visitors are redirected to the login screen.

pub const AUTH_ONLY_PREFIXES: &[&str] = &[
    "/chat",
    "/messages",
    "/bids",
    "/collections",
    "/profile",
    "/gallery",
    "/billing",
    "/edit-profile",
    "/security",
];
