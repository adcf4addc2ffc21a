use http::HeaderMap;
use http::header::{COOKIE, SET_COOKIE};

use crate::config::Settings;
use crate::errors::CookieError;

/// Look up the session cookie in the request headers.
///
/// Malformed Cookie headers count as an absent session, never an error: a
/// client presenting garbage is simply unauthenticated.
pub fn session_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let cookie_header = headers.get(COOKIE)?;
    let Ok(cookie_str) = cookie_header.to_str() else {
        tracing::debug!("Ignoring malformed cookie header");
        return None;
    };

    let session = cookie_str.split(';').map(|s| s.trim()).find_map(|s| {
        let mut parts = s.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some(k), Some(v)) if k == cookie_name => Some(strip_quotes(v).to_string()),
            _ => None,
        }
    });

    if session.is_none() {
        tracing::debug!("No session cookie '{}' found", cookie_name);
    }

    session
}

/// RFC 6265 allows a cookie value to be wrapped in a DQUOTE pair; the
/// quotes are not part of the value.
fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Append a Set-Cookie header carrying the session value, with the
/// configured attributes and Max-Age.
pub(crate) fn set_cookie_header(
    headers: &mut HeaderMap,
    settings: &Settings,
    value: &str,
) -> Result<(), CookieError> {
    append_cookie(headers, settings, value, settings.cookie.ttl)
}

/// Append a Set-Cookie header that removes the session cookie.
pub(crate) fn clear_cookie_header(
    headers: &mut HeaderMap,
    settings: &Settings,
) -> Result<(), CookieError> {
    append_cookie(headers, settings, "", Some(0))
}

fn append_cookie(
    headers: &mut HeaderMap,
    settings: &Settings,
    value: &str,
    max_age: Option<i64>,
) -> Result<(), CookieError> {
    let cookie_def = &settings.cookie;
    let mut cookie = format!(
        "{}={}; SameSite={}; Path={}",
        settings.cookie_name, value, cookie_def.same_site, cookie_def.path
    );
    if cookie_def.secure {
        cookie.push_str("; Secure");
    }
    if cookie_def.http_only {
        cookie.push_str("; HttpOnly");
    }
    if let Some(max_age) = max_age {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }

    tracing::trace!("Set-Cookie: {cookie}");
    headers.append(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| CookieError::InvalidValue(value.to_string()))?,
    );
    Ok(())
}
