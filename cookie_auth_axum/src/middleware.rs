use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header::SET_COOKIE};

use cookie_auth::{
    AuthOutcome, AuthRequest, CookieScheme, RequestContext, ResponseCookies, Settings,
    Unauthorized,
};

/// Attach the per-request cookie context before the authentication phase.
///
/// Must wrap every route that uses the scheme, including unauthenticated
/// ones (login sets the cookie, logout clears it). After the inner service
/// runs, the Set-Cookie headers accumulated in the context are merged into
/// the response.
pub async fn bind_cookie_auth(
    State(scheme): State<CookieScheme>,
    mut req: Request,
    next: Next,
) -> Response {
    let cookies = ResponseCookies::new();
    let ctx = RequestContext::new(scheme.settings().clone(), cookies.clone());
    tracing::trace!(
        decorator = %scheme.settings().request_decorator_name,
        "Binding cookie auth context"
    );
    req.extensions_mut().insert(ctx);

    let mut response = next.run(req).await;
    merge_cookie_headers(response.headers_mut(), &cookies);
    response
}

/// Authentication checker with 401 response.
pub async fn require_auth(State(scheme): State<CookieScheme>, req: Request, next: Next) -> Response {
    authenticate_request(scheme, req, next, false).await
}

/// Authentication checker that redirects unauthenticated GET requests to
/// the configured login page, carrying the original URL in the `next`
/// query parameter when appendNext is enabled.
pub async fn require_auth_or_redirect(
    State(scheme): State<CookieScheme>,
    req: Request,
    next: Next,
) -> Response {
    authenticate_request(scheme, req, next, true).await
}

async fn authenticate_request(
    scheme: CookieScheme,
    mut req: Request,
    next: Next,
    redirect_on_error: bool,
) -> Response {
    let Some(ctx) = req.extensions().get::<RequestContext>().cloned() else {
        tracing::error!("Request context missing; is the cookie auth binder installed?");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "authentication misconfigured",
        )
            .into_response();
    };

    let outcome = {
        let request = AuthRequest {
            method: req.method(),
            uri: req.uri(),
            headers: req.headers(),
        };
        scheme.authenticate(&request, &ctx).await
    };

    match outcome {
        Ok(AuthOutcome::Authenticated {
            credentials,
            artifacts,
        }) => {
            req.extensions_mut().insert(super::session::AuthSession {
                credentials,
                artifacts,
            });
            next.run(req).await
        }
        Ok(AuthOutcome::Unauthenticated { error, .. }) => {
            tracing::debug!("Unauthenticated: {}", error.message);
            if redirect_on_error && req.method() == Method::GET {
                if let Some(location) = login_redirect(scheme.settings(), req.uri()) {
                    return Redirect::temporary(&location).into_response();
                }
            }
            unauthorized_response(&error)
        }
        Err(err) => {
            tracing::error!("Authentication failed fatally: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

/// Merge the deferred Set-Cookie headers into the response.
fn merge_cookie_headers(target: &mut HeaderMap, cookies: &ResponseCookies) {
    let deferred = cookies.take();
    for value in deferred.get_all(SET_COOKIE) {
        target.append(SET_COOKIE, value.clone());
    }
}

fn unauthorized_response(error: &Unauthorized) -> Response {
    let mut response = (StatusCode::UNAUTHORIZED, error.message.clone()).into_response();
    if let Some(scheme) = error.scheme {
        if let Ok(value) = HeaderValue::from_str(scheme) {
            response
                .headers_mut()
                .insert(http::header::WWW_AUTHENTICATE, value);
        }
    }
    response
}

/// Build the login redirect target, appending the original URL under the
/// configured parameter when appendNext is enabled.
fn login_redirect(settings: &Settings, uri: &Uri) -> Option<String> {
    let redirect_to = settings.redirect_to.as_deref()?;
    if settings.append_next.is_empty() {
        return Some(redirect_to.to_string());
    }

    let current = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let next = if settings.append_next_raw {
        current.to_string()
    } else {
        urlencoding::encode(current).into_owned()
    };
    let separator = if redirect_to.contains('?') { '&' } else { '?' };

    Some(format!(
        "{redirect_to}{separator}{}={next}",
        settings.append_next
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{Router, body::Body, routing::get};
    use http::header::{COOKIE, LOCATION};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::session::{AuthSession, CookieAuth};
    use cookie_auth::{
        AppendNext, CookieAuthOptions, CookieOptions, ValidateSession, ValidationError,
    };

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

    fn settings(options: CookieAuthOptions) -> Arc<Settings> {
        CookieScheme::new(options, Arc::new(NoopValidator))
            .unwrap()
            .settings()
            .clone()
    }

    fn redirect_options(append_next: Option<AppendNext>) -> CookieAuthOptions {
        CookieAuthOptions {
            redirect_to: Some("/login".to_string()),
            append_next,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_redirect_without_target() {
        let settings = settings(CookieAuthOptions::default());
        let uri: Uri = "/private".parse().unwrap();
        assert_eq!(login_redirect(&settings, &uri), None);
    }

    #[test]
    fn test_redirect_without_append_next() {
        let settings = settings(redirect_options(None));
        let uri: Uri = "/private".parse().unwrap();
        assert_eq!(
            login_redirect(&settings, &uri),
            Some("/login".to_string())
        );
    }

    #[test]
    fn test_redirect_appends_encoded_next() {
        let settings = settings(redirect_options(Some(AppendNext::Flag(true))));
        let uri: Uri = "/private?tab=keys".parse().unwrap();
        assert_eq!(
            login_redirect(&settings, &uri),
            Some("/login?next=%2Fprivate%3Ftab%3Dkeys".to_string())
        );
    }

    #[test]
    fn test_redirect_appends_raw_next() {
        let settings = settings(redirect_options(Some(AppendNext::Param {
            name: Some("dest".to_string()),
            raw: true,
        })));
        let uri: Uri = "/private".parse().unwrap();
        assert_eq!(
            login_redirect(&settings, &uri),
            Some("/login?dest=/private".to_string())
        );
    }

    #[test]
    fn test_redirect_target_with_existing_query() {
        let settings = settings(CookieAuthOptions {
            redirect_to: Some("/login?mode=full".to_string()),
            append_next: Some(AppendNext::Flag(true)),
            ..Default::default()
        });
        let uri: Uri = "/private".parse().unwrap();
        assert_eq!(
            login_redirect(&settings, &uri),
            Some("/login?mode=full&next=%2Fprivate".to_string())
        );
    }

    #[test]
    fn test_unauthorized_response_carries_scheme() {
        let error = Unauthorized {
            message: "Missing credentials".to_string(),
            scheme: Some("cookie"),
            data: None,
        };
        let response = unauthorized_response(&error);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response
                .headers()
                .get(http::header::WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok()),
            Some("cookie")
        );
    }

    async fn private(session: AuthSession) -> String {
        session.artifacts
    }

    async fn login(CookieAuth(ctx): CookieAuth) -> &'static str {
        ctx.set("abc123").unwrap();
        "ok"
    }

    /// Login route plus a protected route, wired the way an application
    /// would: binder outermost, redirect middleware on the protected route.
    fn test_app(options: CookieAuthOptions) -> Router {
        let scheme = CookieScheme::new(options, Arc::new(NoopValidator)).unwrap();

        let protected = Router::new()
            .route("/private", get(private).post(private))
            .route_layer(axum::middleware::from_fn_with_state(
                scheme.clone(),
                require_auth_or_redirect,
            ));

        Router::new()
            .route("/login", get(login))
            .merge(protected)
            .layer(axum::middleware::from_fn_with_state(scheme, bind_cookie_auth))
    }

    /// An unauthenticated GET on a protected route is redirected to the
    /// login page with the original URL in the `next` parameter.
    #[tokio::test]
    async fn test_unauthenticated_get_redirects_to_login() {
        let app = test_app(redirect_options(Some(AppendNext::Flag(true))));

        let response = app
            .oneshot(http::Request::builder().uri("/private").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/login?next=%2Fprivate")
        );
    }

    /// Redirects are for browsers navigating; an unauthenticated non-GET
    /// request gets a plain 401 even with a redirect target configured.
    #[tokio::test]
    async fn test_unauthenticated_post_is_401() {
        let app = test_app(redirect_options(Some(AppendNext::Flag(true))));

        let response = app
            .oneshot(
                http::Request::builder()
                    .method(Method::POST)
                    .uri("/private")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    /// A Set-Cookie written through the context by an inner handler ends up
    /// on the final response via the binder.
    #[tokio::test]
    async fn test_handler_cookie_reaches_response() {
        let app = test_app(CookieAuthOptions::default());

        let response = app
            .oneshot(http::Request::builder().uri("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(cookie.starts_with("sid=abc123;"));
    }

    /// An authenticated request reaches the handler with the session bound,
    /// and the keep-alive renewal rides on the final response.
    #[tokio::test]
    async fn test_authenticated_request_passes_through() {
        let app = test_app(CookieAuthOptions {
            keep_alive: true,
            cookie: CookieOptions {
                ttl: Some(600),
                ..Default::default()
            },
            redirect_to: Some("/login".to_string()),
            ..Default::default()
        });

        let response = app
            .oneshot(
                http::Request::builder()
                    .uri("/private")
                    .header(COOKIE, "sid=abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(cookie.starts_with("sid=abc123;"));
        assert!(cookie.contains("Max-Age=600"));

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"abc123");
    }

    #[test]
    fn test_merge_cookie_headers() {
        let settings = settings(CookieAuthOptions::default());
        let cookies = ResponseCookies::new();
        let ctx = RequestContext::new(settings, cookies.clone());
        ctx.set("abc123").unwrap();
        ctx.clear().unwrap();

        let mut target = HeaderMap::new();
        merge_cookie_headers(&mut target, &cookies);

        let merged: Vec<_> = target
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(merged.len(), 2);
        assert!(merged[0].starts_with("sid=abc123;"));
        assert!(merged[1].starts_with("sid=;"));
        assert!(cookies.is_empty());
    }
}
