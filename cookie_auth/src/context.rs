use std::sync::{Arc, Mutex, PoisonError};

use http::HeaderMap;

use crate::config::Settings;
use crate::cookie::{clear_cookie_header, set_cookie_header};
use crate::errors::CookieError;

/// Deferred Set-Cookie headers for one request.
///
/// The scheme and route handlers write here; once the request is done the
/// host merges the accumulated headers into the response. Cloning shares the
/// same sink. Never shared across requests.
#[derive(Clone, Debug, Default)]
pub struct ResponseCookies(Arc<Mutex<HeaderMap>>);

impl ResponseCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the accumulated headers for merging into the response.
    pub fn take(&self) -> HeaderMap {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn is_empty(&self) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    fn with<R>(&self, f: impl FnOnce(&mut HeaderMap) -> R) -> R {
        f(&mut self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Per-request cookie control, created by the host's binder before the
/// authentication phase and dropped with the request.
///
/// The response-mutation handle is only reliably available at that early
/// pipeline stage; capturing it here lets code running after authentication
/// (a logout handler clearing the session, a login handler setting it) reuse
/// the same sink the scheme writes its keep-alive renewal to.
#[derive(Clone, Debug)]
pub struct RequestContext {
    settings: Arc<Settings>,
    cookies: ResponseCookies,
}

impl RequestContext {
    pub fn new(settings: Arc<Settings>, cookies: ResponseCookies) -> Self {
        Self { settings, cookies }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn response_cookies(&self) -> &ResponseCookies {
        &self.cookies
    }

    /// Write or overwrite the session cookie.
    pub fn set(&self, session: &str) -> Result<(), CookieError> {
        tracing::debug!(cookie = %self.settings.cookie_name, "Setting session cookie");
        self.cookies
            .with(|headers| set_cookie_header(headers, &self.settings, session))
    }

    /// Remove the session cookie.
    pub fn clear(&self) -> Result<(), CookieError> {
        tracing::debug!(cookie = %self.settings.cookie_name, "Clearing session cookie");
        self.cookies
            .with(|headers| clear_cookie_header(headers, &self.settings))
    }
}

#[cfg(test)]
mod tests {
    use http::header::SET_COOKIE;
    use serde_json::json;

    use super::*;
    use crate::config::CookieAuthOptions;
    use crate::errors::ValidationError;
    use crate::scheme::{AuthRequest, ValidateSession};

    struct NoopValidator;

    #[async_trait::async_trait]
    impl ValidateSession for NoopValidator {
        async fn validate(
            &self,
            _request: &AuthRequest<'_>,
            _session: &str,
        ) -> Result<serde_json::Value, ValidationError> {
            Ok(json!({ "valid": true }))
        }
    }

    fn context() -> RequestContext {
        let settings =
            Settings::new(CookieAuthOptions::default(), Arc::new(NoopValidator)).unwrap();
        RequestContext::new(Arc::new(settings), ResponseCookies::new())
    }

    #[test]
    fn test_set_then_clear_accumulates_headers() {
        let ctx = context();
        assert!(ctx.response_cookies().is_empty());

        ctx.set("abc123").unwrap();
        ctx.clear().unwrap();

        let headers = ctx.response_cookies().take();
        let cookies: Vec<_> = headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("sid=abc123;"));
        assert!(cookies[1].starts_with("sid=;"));
    }

    #[test]
    fn test_take_drains_the_sink() {
        let ctx = context();
        ctx.set("abc123").unwrap();

        assert!(!ctx.response_cookies().is_empty());
        let _ = ctx.response_cookies().take();
        assert!(ctx.response_cookies().is_empty());
    }

    #[test]
    fn test_clones_share_one_sink() {
        let ctx = context();
        let handler_view = ctx.clone();
        handler_view.set("abc123").unwrap();

        assert!(!ctx.response_cookies().is_empty());
    }
}
