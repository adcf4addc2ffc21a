//! cookie-auth - Cookie-based session authentication for Rust web applications
//!
//! This crate provides the framework-agnostic decision core: validation of
//! the scheme configuration, the per-request authenticate state machine, and
//! the policy separating recoverable authentication failures from fatal
//! system errors. It operates on plain `http` types; framework glue
//! (request binding, response conversion) lives in companion crates such as
//! cookie-auth-axum.

mod config;
mod context;
mod cookie;
mod errors;
mod scheme;
mod types;

pub use config::{AppendNext, CookieAuthOptions, CookieOptions, SameSite, Settings};
pub use context::{RequestContext, ResponseCookies};
pub use errors::{AuthError, BoxError, ConfigError, CookieError, ValidationError, Verdict, classify};
pub use scheme::{AuthRequest, CookieScheme, ValidateSession};
pub use types::{AuthOutcome, Unauthorized, ValidationResult};

pub use cookie::session_from_headers;
