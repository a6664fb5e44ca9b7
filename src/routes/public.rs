//! Public Route Lists
//!
//! Paths every visitor may reach, signed in or not.
//!
//! Bypass entries are never inspected by the guard at all: framework bundles, the
//! API surface (which enforces its own authentication), uploaded media and any
//! static file. Public entries are real pages that happen to be open: the artist
//! directory, community pages, the shop and product pages, and the informational
//! pages.

/// Prefixes skipped before any classification.
pub const BYPASS_PREFIXES: &[&str] = &["/_next", "/api", "/media"];

/// File extensions served as static assets. Compared case-insensitively.
pub const ASSET_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "avif", "css", "js", "map", "woff",
    "woff2",
];

/// Page prefixes open to everyone.
pub const PUBLIC_PREFIXES: &[&str] = &[
    "/artists",
    "/community",
    "/contact",
    "/faq",
    "/about",
    "/shop",
    "/product",
];
