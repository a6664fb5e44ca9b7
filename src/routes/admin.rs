//! Admin Route Paths
//!
//! The moderation dashboards live under a single root. The sign-in screen sits
//! under the same root but is matched exactly and handled on its own, so that an
//! unauthenticated administrator can still reach it.

/// Root of every administrator page. Also the landing page after admin sign-in.
pub const ADMIN_ROOT: &str = "/admin";

/// The administrator sign-in screen.
pub const ADMIN_LOGIN: &str = "/admin/login";
