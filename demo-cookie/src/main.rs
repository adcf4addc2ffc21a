mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cookie_auth_axum::{
    AppendNext, CookieAuthOptions, CookieOptions, CookieScheme, bind_cookie_auth,
    require_auth_or_redirect,
};

use crate::handlers::{SessionStore, StoreValidator};

fn init_tracing(app_name: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        #[cfg(debug_assertions)]
        {
            format!("cookie_auth_axum=trace,cookie_auth=trace,{app_name}=trace,info").into()
        }

        #[cfg(not(debug_assertions))]
        {
            "info".into()
        }
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing("demo_cookie");

    let store = SessionStore::default();

    let options = CookieAuthOptions {
        cookie: CookieOptions {
            ttl: Some(600),
            // Local demo over plain HTTP.
            secure: false,
            ..Default::default()
        },
        keep_alive: true,
        append_next: Some(AppendNext::Flag(true)),
        redirect_to: Some("/login".to_string()),
        ..Default::default()
    };
    let scheme = CookieScheme::new(options, Arc::new(StoreValidator::new(store.clone())))
        .expect("invalid cookie auth configuration");

    let protected = Router::new()
        .route("/private", get(handlers::private))
        .route_layer(middleware::from_fn_with_state(
            scheme.clone(),
            require_auth_or_redirect,
        ));

    let app = Router::new()
        .route("/", get(handlers::index))
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .merge(protected)
        .layer(middleware::from_fn_with_state(scheme, bind_cookie_auth))
        .with_state(store);

    let port: u16 = std::env::var("DEMO_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
