use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderMap, Method, Uri};
use serde_json::Value;

use crate::config::{CookieAuthOptions, Settings};
use crate::context::RequestContext;
use crate::cookie::session_from_headers;
use crate::errors::{AuthError, ConfigError, ValidationError, Verdict, classify};
use crate::types::{AuthOutcome, Unauthorized, ValidationResult};

/// The slice of the request visible to the scheme and the validator.
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
}

/// Integrator-supplied session validation.
///
/// Called at most once per request with the session value read from the
/// cookie, typically performing a store lookup or token introspection. The
/// returned JSON must be an object with a boolean `valid` and an optional
/// `credentials` payload; the payload itself is opaque to this crate.
#[async_trait]
pub trait ValidateSession: Send + Sync {
    async fn validate(
        &self,
        request: &AuthRequest<'_>,
        session: &str,
    ) -> Result<Value, ValidationError>;
}

/// The cookie authentication scheme. Owns the immutable settings and decides
/// one request per [`authenticate`](Self::authenticate) call.
#[derive(Clone, Debug)]
pub struct CookieScheme {
    settings: Arc<Settings>,
}

impl CookieScheme {
    /// Validate options and construct the scheme. Fails with a
    /// [`ConfigError`] that should abort startup.
    pub fn new(
        options: CookieAuthOptions,
        validate: Arc<dyn ValidateSession>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            settings: Arc::new(Settings::new(options, validate)?),
        })
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Decide one request: session lookup, external validation, outcome
    /// classification, optional keep-alive renewal.
    ///
    /// Single pass, no retries; the validator call is the only suspension
    /// point. Recoverable failures come back as
    /// [`AuthOutcome::Unauthenticated`]; an `Err` is fatal and must reach
    /// the host's generic error path.
    pub async fn authenticate(
        &self,
        request: &AuthRequest<'_>,
        ctx: &RequestContext,
    ) -> Result<AuthOutcome, AuthError> {
        let settings = &self.settings;

        let Some(session) = session_from_headers(request.headers, &settings.cookie_name) else {
            return Ok(unauthenticated(Unauthorized::missing_credentials(), None));
        };

        match settings.validate.validate(request, &session).await {
            Ok(raw) => {
                let result = ValidationResult::try_from(raw)?;

                if !result.valid {
                    tracing::debug!("Session validator rejected the session");
                    return Ok(unauthenticated(
                        Unauthorized::invalid_cookie(None),
                        Some(session),
                    ));
                }

                let credentials = result
                    .credentials
                    .filter(|credentials| !credentials.is_null())
                    .unwrap_or_else(|| Value::String(session.clone()));

                if settings.keep_alive {
                    // Sliding renewal: same value, fresh Max-Age.
                    ctx.set(&session)?;
                }

                Ok(AuthOutcome::Authenticated {
                    credentials,
                    artifacts: session,
                })
            }
            Err(err) => match classify(&err) {
                Verdict::Fatal => {
                    tracing::error!("Session validator failed fatally: {err}");
                    Err(AuthError::Validation(err))
                }
                Verdict::PassThrough => Ok(unauthenticated(
                    Unauthorized::pass_through(err),
                    Some(session),
                )),
                Verdict::Recoverable => {
                    tracing::debug!("Session validation failed: {err}");
                    Ok(unauthenticated(
                        Unauthorized::invalid_cookie(Some(err)),
                        Some(session),
                    ))
                }
            },
        }
    }
}

fn unauthenticated(error: Unauthorized, session: Option<String>) -> AuthOutcome {
    // The session doubles as fallback credentials when present.
    let credentials = session.as_ref().map(|s| Value::String(s.clone()));
    AuthOutcome::Unauthenticated {
        error,
        credentials,
        artifacts: session,
    }
}
