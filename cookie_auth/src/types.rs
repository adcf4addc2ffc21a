use std::fmt;

use serde_json::Value;

use crate::errors::{AuthError, ValidationError};

/// Contract of the session validator's return value: a JSON object with a
/// required boolean `valid` and an optional opaque `credentials` payload.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub valid: bool,
    pub credentials: Option<Value>,
}

impl TryFrom<Value> for ValidationResult {
    type Error = AuthError;

    /// Enforce the `{valid, credentials?}` shape. A violation is a bug in
    /// the integration, surfaced as [`AuthError::ContractViolation`].
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(map) = value else {
            return Err(AuthError::ContractViolation(
                "session validator must return an object".to_string(),
            ));
        };

        let valid = match map.get("valid") {
            Some(Value::Bool(valid)) => *valid,
            Some(_) => {
                return Err(AuthError::ContractViolation(
                    "`valid` must be a boolean".to_string(),
                ));
            }
            None => {
                return Err(AuthError::ContractViolation(
                    "session validator return must have a `valid` property".to_string(),
                ));
            }
        };

        Ok(Self {
            valid,
            credentials: map.get("credentials").cloned(),
        })
    }
}

/// Terminal unauthorized error carried by an unauthenticated outcome.
#[derive(Debug)]
pub struct Unauthorized {
    pub message: String,
    /// Authentication scheme advertised with the error, when known.
    pub scheme: Option<&'static str>,
    /// Original validator error, retained as diagnostic data.
    pub data: Option<ValidationError>,
}

impl Unauthorized {
    pub(crate) fn missing_credentials() -> Self {
        Self {
            message: "Missing credentials".to_string(),
            scheme: Some("cookie"),
            data: None,
        }
    }

    pub(crate) fn invalid_cookie(data: Option<ValidationError>) -> Self {
        Self {
            message: "Invalid cookie".to_string(),
            scheme: None,
            data,
        }
    }

    /// Carry an explicitly-unauthorized validator error through unchanged.
    pub(crate) fn pass_through(err: ValidationError) -> Self {
        let message = match &err {
            ValidationError::Unauthorized(message) => message.clone(),
            other => other.to_string(),
        };
        Self {
            message,
            scheme: None,
            data: Some(err),
        }
    }
}

impl fmt::Display for Unauthorized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Unauthorized {}

/// Terminal result of the authenticate state machine.
#[derive(Debug)]
pub enum AuthOutcome {
    /// The session validated; request processing continues with these
    /// credentials bound to the request's identity.
    Authenticated {
        credentials: Value,
        /// Raw session value, retained for diagnostics and audit.
        artifacts: String,
    },
    /// The request could not be authenticated; maps to a 401-class response.
    Unauthenticated {
        error: Unauthorized,
        credentials: Option<Value>,
        artifacts: Option<String>,
    },
}
