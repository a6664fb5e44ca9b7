use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;

use crate::{
    AppState,
    auth::{Credential, TokenValidator, read_cookie},
    routes::{RouteCategory, RouteTable},
};

/// AccessDecision
///
/// Outcome of the access policy for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Continue,
    RedirectTo(&'static str),
}

/// decide
///
/// Applies the access policy to a classified path and the live credential (if any):
///
/// - bypass, public and unclassified paths always continue;
/// - the admin sign-in screen sends a signed-in admin to the admin root;
/// - the admin area sends visitors to the admin sign-in and non-admins to the site root;
/// - guest-only screens send any signed-in member to the site root;
/// - member-only pages send visitors to the login screen.
///
/// `session` must already be filtered for expiry.
pub fn decide(
    routes: &RouteTable,
    category: RouteCategory,
    session: Option<&Credential>,
) -> AccessDecision {
    match category {
        RouteCategory::Bypass | RouteCategory::Public | RouteCategory::Unclassified => {
            AccessDecision::Continue
        }
        RouteCategory::AdminLogin => match session {
            Some(credential) if credential.is_admin() => {
                AccessDecision::RedirectTo(routes.admin_root)
            }
            _ => AccessDecision::Continue,
        },
        RouteCategory::AdminArea => match session {
            None => AccessDecision::RedirectTo(routes.admin_login),
            Some(credential) if !credential.is_admin() => {
                AccessDecision::RedirectTo(routes.site_root)
            }
            Some(_) => AccessDecision::Continue,
        },
        RouteCategory::GuestOnly => match session {
            Some(_) => AccessDecision::RedirectTo(routes.site_root),
            None => AccessDecision::Continue,
        },
        RouteCategory::AuthOnly => match session {
            None => AccessDecision::RedirectTo(routes.login_path),
            Some(_) => AccessDecision::Continue,
        },
    }
}

/// evaluate
///
/// The whole guard as a pure function of (path, token, now).
pub fn evaluate(
    routes: &RouteTable,
    validator: &TokenValidator,
    path: &str,
    token: Option<&str>,
    now: i64,
) -> AccessDecision {
    let category = routes.classify(path);
    if category == RouteCategory::Bypass {
        return AccessDecision::Continue;
    }
    let session = validator.authenticate(token, now);
    decide(routes, category, session.as_ref())
}

/// access_guard
///
/// Middleware run on every request. Reads the access token cookie, applies the policy
/// and either answers with a temporary redirect or passes the request on. When the
/// request continues with a live credential, the credential is attached to the request
/// extensions for the `AuthUser` extractor.
pub async fn access_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let category = state.routes.classify(&path);

    if category == RouteCategory::Bypass {
        return next.run(request).await;
    }

    let token = read_cookie(request.headers(), &state.config.cookie_name);
    let now = Utc::now().timestamp();
    let session = state.validator.authenticate(token.as_deref(), now);

    match decide(&state.routes, category, session.as_ref()) {
        AccessDecision::Continue => {
            if let Some(credential) = session {
                request.extensions_mut().insert(credential);
            }
            next.run(request).await
        }
        AccessDecision::RedirectTo(target) => {
            tracing::debug!(
                path = %path,
                category = category.as_str(),
                authenticated = session.is_some(),
                redirect_to = target,
                "access guard redirect"
            );
            Redirect::temporary(target).into_response()
        }
    }
}
