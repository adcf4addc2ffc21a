//! cookie-auth-axum - Axum integration for the cookie-auth session scheme
//!
//! Wires the framework-agnostic [`cookie_auth`] core into an axum pipeline:
//! a binder middleware that attaches the per-request cookie context, the
//! authentication middlewares (401 and redirect flavors), and extractors for
//! the authenticated identity and the cookie decorator.

mod error;
mod middleware;
mod session;

pub use error::IntoResponseError;
pub use middleware::{bind_cookie_auth, require_auth, require_auth_or_redirect};
pub use session::{AuthSession, CookieAuth};

// Re-export the core surface integrators configure against.
pub use cookie_auth::{
    AppendNext, AuthRequest, CookieAuthOptions, CookieOptions, CookieScheme, ValidateSession,
    ValidationError, session_from_headers,
};
