use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::State,
    response::{Html, Redirect},
};
use chrono::{DateTime, Utc};
use http::{HeaderMap, StatusCode};
use serde::Deserialize;
use serde_json::json;

use cookie_auth_axum::{
    AuthRequest, AuthSession, CookieAuth, IntoResponseError, ValidateSession, ValidationError,
    session_from_headers,
};

#[derive(Clone, Debug)]
pub(crate) struct SessionRecord {
    pub(crate) user: String,
    pub(crate) created_at: DateTime<Utc>,
}

/// In-memory session store shared by the login handlers and the validator.
#[derive(Clone, Default)]
pub(crate) struct SessionStore(Arc<Mutex<HashMap<String, SessionRecord>>>);

impl SessionStore {
    pub(crate) fn insert(&self, sid: String, user: String) {
        self.0.lock().unwrap().insert(
            sid,
            SessionRecord {
                user,
                created_at: Utc::now(),
            },
        );
    }

    pub(crate) fn get(&self, sid: &str) -> Option<SessionRecord> {
        self.0.lock().unwrap().get(sid).cloned()
    }

    pub(crate) fn remove(&self, sid: &str) {
        self.0.lock().unwrap().remove(sid);
    }
}

/// Session validator backed by the in-memory store.
pub(crate) struct StoreValidator {
    store: SessionStore,
}

impl StoreValidator {
    pub(crate) fn new(store: SessionStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl ValidateSession for StoreValidator {
    async fn validate(
        &self,
        _request: &AuthRequest<'_>,
        session: &str,
    ) -> Result<serde_json::Value, ValidationError> {
        match self.store.get(session) {
            Some(record) => Ok(json!({
                "valid": true,
                "credentials": { "user": record.user, "loggedInAt": record.created_at },
            })),
            None => Ok(json!({ "valid": false })),
        }
    }
}

pub(crate) async fn index() -> Html<&'static str> {
    Html(
        r#"<h1>demo-cookie</h1>
<ul>
  <li><a href="/login">Login</a></li>
  <li><a href="/private">Private page</a></li>
  <li><a href="/logout">Logout</a></li>
</ul>"#,
    )
}

pub(crate) async fn login_form() -> Html<&'static str> {
    Html(
        r#"<h1>Login</h1>
<form method="post" action="/login">
  <input type="text" name="username" placeholder="username" required>
  <button type="submit">Login</button>
</form>"#,
    )
}

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    username: String,
}

pub(crate) async fn login(
    State(store): State<SessionStore>,
    CookieAuth(ctx): CookieAuth,
    Form(form): Form<LoginForm>,
) -> Result<Redirect, (StatusCode, String)> {
    let sid = uuid::Uuid::new_v4().to_string();
    store.insert(sid.clone(), form.username.clone());
    ctx.set(&sid).into_response_error()?;
    tracing::info!(user = %form.username, "Logged in");
    Ok(Redirect::to("/private"))
}

pub(crate) async fn logout(
    State(store): State<SessionStore>,
    CookieAuth(ctx): CookieAuth,
    headers: HeaderMap,
) -> Result<Redirect, (StatusCode, String)> {
    if let Some(sid) = session_from_headers(&headers, &ctx.settings().cookie_name) {
        store.remove(&sid);
    }
    ctx.clear().into_response_error()?;
    tracing::info!("Logged out");
    Ok(Redirect::to("/"))
}

pub(crate) async fn private(session: AuthSession) -> Html<String> {
    Html(format!(
        r#"<h1>Private</h1>
<p>credentials: {}</p>
<p>session: {}</p>
<p><a href="/logout">Logout</a></p>"#,
        session.credentials, session.artifacts
    ))
}
