use http::StatusCode;

use cookie_auth::{AuthError, CookieError};

/// Helper trait for converting errors to a standard response error format.
pub trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;
}

/// Fatal scheme errors all surface on the host's generic error path; none
/// of them may be downgraded to a 401.
impl<T> IntoResponseError<T> for Result<T, AuthError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }
}

impl<T> IntoResponseError<T> for Result<T, CookieError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_maps_to_internal_error() {
        let result: Result<(), AuthError> =
            Err(AuthError::ContractViolation("missing `valid`".to_string()));

        let response_error = result.into_response_error();
        assert!(response_error.is_err());
        if let Err((status, message)) = response_error {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(message.contains("missing `valid`"));
        }
    }

    #[test]
    fn test_cookie_error_maps_to_internal_error() {
        let result: Result<(), CookieError> =
            Err(CookieError::InvalidValue("bad\nvalue".to_string()));

        let response_error = result.into_response_error();
        assert!(response_error.is_err());
        if let Err((status, _)) = response_error {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
