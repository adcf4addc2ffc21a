use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::errors::ConfigError;
use crate::scheme::ValidateSession;

const DEFAULT_COOKIE_NAME: &str = "sid";
const DEFAULT_DECORATOR_NAME: &str = "cookieAuth";
const DEFAULT_NEXT_PARAM: &str = "next";

/// Raw, unvalidated scheme options as supplied at registration.
///
/// Every field is optional; [`Settings::new`] applies defaults and rejects
/// illegal combinations. The struct deserializes from camelCase JSON so
/// option files map one-to-one onto it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CookieAuthOptions {
    pub cookie: CookieOptions,
    pub keep_alive: bool,
    pub request_decorator_name: Option<String>,
    pub append_next: Option<AppendNext>,
    /// Where to send unauthenticated browsers; None disables redirects.
    pub redirect_to: Option<String>,
}

/// Cookie definition, passed through to the Set-Cookie builder.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CookieOptions {
    pub name: Option<String>,
    /// Cookie lifetime in seconds (Max-Age). None issues a browser-session
    /// cookie.
    pub ttl: Option<i64>,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    /// Malformed cookies are treated as absent. Must stay enabled; an
    /// explicit false fails validation.
    pub ignore_errors: Option<bool>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            name: None,
            ttl: None,
            path: "/".to_string(),
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            ignore_errors: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// `appendNext` accepts either a bare flag or a parameter description.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AppendNext {
    Flag(bool),
    Param {
        name: Option<String>,
        #[serde(default)]
        raw: bool,
    },
}

/// Immutable, validated scheme settings.
///
/// Built once at registration and shared read-only across requests; nothing
/// here is re-validated on the request path.
#[derive(Clone)]
pub struct Settings {
    pub cookie_name: String,
    pub cookie: CookieOptions,
    pub keep_alive: bool,
    pub request_decorator_name: String,
    /// Query parameter carrying the original URL through a login redirect;
    /// empty when disabled.
    pub append_next: String,
    /// Skip percent-encoding of the original URL when appending it.
    pub append_next_raw: bool,
    pub redirect_to: Option<String>,
    pub(crate) validate: Arc<dyn ValidateSession>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("cookie_name", &self.cookie_name)
            .field("cookie", &self.cookie)
            .field("keep_alive", &self.keep_alive)
            .field("request_decorator_name", &self.request_decorator_name)
            .field("append_next", &self.append_next)
            .field("append_next_raw", &self.append_next_raw)
            .field("redirect_to", &self.redirect_to)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Validate raw options into settings.
    ///
    /// All shape violations surface here, at registration, as a
    /// [`ConfigError`] that should abort startup.
    pub fn new(
        options: CookieAuthOptions,
        validate: Arc<dyn ValidateSession>,
    ) -> Result<Self, ConfigError> {
        let mut cookie = options.cookie;

        let cookie_name = match cookie.name.take() {
            Some(name) if name.is_empty() => return Err(ConfigError::EmptyCookieName),
            Some(name) => name,
            None => DEFAULT_COOKIE_NAME.to_string(),
        };

        if cookie.ignore_errors == Some(false) {
            return Err(ConfigError::IgnoreErrorsDisabled);
        }
        cookie.ignore_errors = Some(true);

        // keepAlive re-issues the cookie with the configured Max-Age, so it
        // is meaningless without a positive ttl.
        if options.keep_alive && !cookie.ttl.is_some_and(|ttl| ttl >= 1) {
            return Err(ConfigError::KeepAliveWithoutTtl);
        }

        let request_decorator_name = match options.request_decorator_name {
            Some(name) if name.is_empty() => return Err(ConfigError::EmptyDecoratorName),
            Some(name) => name,
            None => DEFAULT_DECORATOR_NAME.to_string(),
        };

        let (append_next, append_next_raw) = match options.append_next {
            None | Some(AppendNext::Flag(false)) => (String::new(), false),
            Some(AppendNext::Flag(true)) => (DEFAULT_NEXT_PARAM.to_string(), false),
            Some(AppendNext::Param { name, raw }) => (
                name.filter(|name| !name.is_empty())
                    .unwrap_or_else(|| DEFAULT_NEXT_PARAM.to_string()),
                raw,
            ),
        };

        Ok(Self {
            cookie_name,
            cookie,
            keep_alive: options.keep_alive,
            request_decorator_name,
            append_next,
            append_next_raw,
            redirect_to: options.redirect_to,
            validate,
        })
    }
}
