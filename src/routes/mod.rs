//! Router Module Index
//!
//! Organizes the marketplace's page paths into access-segregated lists, mirroring
//! the audiences the front-end serves: anonymous visitors, signed-in members and
//! administrators. The lists are read-only for the life of the process and are
//! consulted by the access guard on every request.
//!
//! The gateway's own endpoints (health, session, API docs) live in `gateway`.

/// Framework assets and pages open to everyone.
pub mod public;

/// Pages meant only for visitors who are not signed in.
pub mod guest;

/// Pages that require a signed-in member.
pub mod authenticated;

/// Administrator sign-in and dashboard paths.
pub mod admin;

/// Endpoints served by the gateway itself.
pub mod gateway;

/// Redirect target for signed-in visitors on guest pages and for non-admins in the admin area.
pub const SITE_ROOT: &str = "/";

/// RouteCategory
///
/// The access class of a request path. Exactly one category applies per path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteCategory {
    /// Internal framework assets, API calls, media and static files. Never inspected.
    Bypass,
    /// Open to every visitor regardless of authentication.
    Public,
    /// The administrator sign-in screen.
    AdminLogin,
    /// Everything else under the admin root.
    AdminArea,
    /// Login, signup and account recovery screens.
    GuestOnly,
    /// Member-only pages.
    AuthOnly,
    /// Not listed anywhere; open by default.
    Unclassified,
}

impl RouteCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteCategory::Bypass => "bypass",
            RouteCategory::Public => "public",
            RouteCategory::AdminLogin => "admin_login",
            RouteCategory::AdminArea => "admin_area",
            RouteCategory::GuestOnly => "guest_only",
            RouteCategory::AuthOnly => "auth_only",
            RouteCategory::Unclassified => "unclassified",
        }
    }
}

/// RouteTable
///
/// Static mapping from access class to the path prefixes that belong to it, plus the
/// fixed redirect targets the guard may emit.
#[derive(Debug, Clone, Copy)]
pub struct RouteTable {
    pub bypass_prefixes: &'static [&'static str],
    pub asset_extensions: &'static [&'static str],
    pub public_prefixes: &'static [&'static str],
    pub admin_login: &'static str,
    pub admin_root: &'static str,
    pub guest_only_prefixes: &'static [&'static str],
    pub auth_only_prefixes: &'static [&'static str],
    pub login_path: &'static str,
    pub site_root: &'static str,
}

/// The marketplace front-end's route layout.
pub const MARKETPLACE_ROUTES: RouteTable = RouteTable {
    bypass_prefixes: public::BYPASS_PREFIXES,
    asset_extensions: public::ASSET_EXTENSIONS,
    public_prefixes: public::PUBLIC_PREFIXES,
    admin_login: admin::ADMIN_LOGIN,
    admin_root: admin::ADMIN_ROOT,
    guest_only_prefixes: guest::GUEST_ONLY_PREFIXES,
    auth_only_prefixes: authenticated::AUTH_ONLY_PREFIXES,
    login_path: guest::LOGIN_PATH,
    site_root: SITE_ROOT,
};

impl Default for RouteTable {
    fn default() -> Self {
        MARKETPLACE_ROUTES
    }
}

impl RouteTable {
    /// classify
    ///
    /// Maps a request path to its category. Lists are checked in a fixed order and the
    /// first match wins: bypass, public, admin login (exact), admin area (prefix),
    /// guest-only, auth-only. Anything left over is `Unclassified`.
    pub fn classify(&self, path: &str) -> RouteCategory {
        if self.is_bypassed(path) {
            return RouteCategory::Bypass;
        }
        if matches_prefix(path, self.public_prefixes) {
            return RouteCategory::Public;
        }
        if path == self.admin_login {
            return RouteCategory::AdminLogin;
        }
        if path.starts_with(self.admin_root) {
            return RouteCategory::AdminArea;
        }
        if matches_prefix(path, self.guest_only_prefixes) {
            return RouteCategory::GuestOnly;
        }
        if matches_prefix(path, self.auth_only_prefixes) {
            return RouteCategory::AuthOnly;
        }
        RouteCategory::Unclassified
    }

    fn is_bypassed(&self, path: &str) -> bool {
        matches_prefix(path, self.bypass_prefixes) || self.has_asset_extension(path)
    }

    fn has_asset_extension(&self, path: &str) -> bool {
        // Only the final segment can carry an extension.
        let file_name = path.rsplit('/').next().unwrap_or(path);
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self
                .asset_extensions
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext)),
            _ => false,
        }
    }
}

fn matches_prefix(path: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| path.starts_with(prefix))
}
