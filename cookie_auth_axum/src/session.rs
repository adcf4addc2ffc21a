use axum::response::{IntoResponse, Response};
use http::{StatusCode, request::Parts};
use serde_json::Value;

use cookie_auth::RequestContext;

/// Rejection for routes that expect an authenticated request.
#[derive(Debug)]
pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
    }
}

/// Authenticated request identity, available as an axum extractor on routes
/// behind [`require_auth`](crate::require_auth) or
/// [`require_auth_or_redirect`](crate::require_auth_or_redirect).
///
/// # Example
///
/// ```no_run
/// use cookie_auth_axum::AuthSession;
///
/// async fn private(session: AuthSession) -> String {
///     format!("credentials: {}", session.credentials)
/// }
/// ```
#[derive(Clone, Debug)]
pub struct AuthSession {
    /// Credentials produced by the session validator, or the raw session
    /// value when the validator supplied none.
    pub credentials: Value,
    /// Raw session value, retained for diagnostics and audit.
    pub artifacts: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthSession>().cloned().ok_or_else(|| {
            tracing::debug!("No authenticated session on this request");
            AuthRejection
        })
    }
}

/// The per-request cookie decorator: lets handlers set the session cookie on
/// login and clear it on logout through the same sink the scheme uses.
///
/// Requires [`bind_cookie_auth`](crate::bind_cookie_auth) on the route.
pub struct CookieAuth(pub RequestContext);

impl<S> axum::extract::FromRequestParts<S> for CookieAuth
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .map(CookieAuth)
            .ok_or_else(|| {
                tracing::error!("Request context missing; is the cookie auth binder installed?");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "authentication misconfigured",
                )
            })
    }
}
