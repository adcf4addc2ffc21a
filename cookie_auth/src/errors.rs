use thiserror::Error;

/// Boxed error payload carried by validator failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Setup-time configuration errors. Raised once at registration; request
/// handling never re-checks these rules.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cookie name must not be empty")]
    EmptyCookieName,

    #[error("requestDecoratorName must not be empty")]
    EmptyDecoratorName,

    #[error("cookie ignoreErrors cannot be disabled")]
    IgnoreErrorsDisabled,

    #[error("keepAlive requires a cookie ttl of at least 1 second")]
    KeepAliveWithoutTtl,
}

/// Error returned by the integrator's session validator.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The validator itself decided the request is unauthorized. Passed
    /// through to the outcome unchanged instead of being re-wrapped.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The credentials could not be validated. Recoverable: mapped to an
    /// unauthorized outcome with this error kept as diagnostic data.
    #[error("validation failed: {0}")]
    Failed(#[source] BoxError),

    /// Infrastructure failure unrelated to the presented credentials.
    /// Propagates to the host's generic error path, never converted to 401.
    #[error("system failure: {0}")]
    System(#[source] BoxError),
}

/// Cookie header construction errors.
#[derive(Debug, Error, Clone)]
pub enum CookieError {
    #[error("cookie value contains invalid characters: {0}")]
    InvalidValue(String),
}

/// Fatal errors raised by [`CookieScheme::authenticate`](crate::CookieScheme::authenticate).
///
/// Recoverable cases are values ([`AuthOutcome::Unauthenticated`](crate::AuthOutcome)),
/// never errors; anything surfacing here must reach the host's generic
/// error path.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The validator returned a value violating the `{valid, credentials?}`
    /// contract. A bug in the integration, not an authentication failure.
    #[error("invalid return from session validator: {0}")]
    ContractViolation(String),

    /// A system-classified validator failure, propagated unchanged.
    #[error(transparent)]
    Validation(ValidationError),

    #[error("cookie error: {0}")]
    Cookie(#[from] CookieError),
}

/// Classification of an error raised by the session validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Propagate unchanged to the host's error path.
    Fatal,
    /// Already an unauthorized error; pass through without re-wrapping.
    PassThrough,
    /// Map to an unauthorized outcome, retaining the error as diagnostics.
    Recoverable,
}

/// Sort a validator error into exactly one verdict.
pub fn classify(err: &ValidationError) -> Verdict {
    match err {
        ValidationError::System(_) => Verdict::Fatal,
        ValidationError::Unauthorized(_) => Verdict::PassThrough,
        ValidationError::Failed(_) => Verdict::Recoverable,
    }
}
