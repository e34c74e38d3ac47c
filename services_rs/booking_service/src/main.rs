mod catalog;
mod config;
mod db;
mod error;
mod gateway;
mod handlers;
mod models;
mod state;
mod uploads;

use axum::extract::MatchedPath;
use axum::http::{header, header::HeaderName, Method, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use catalog::CatalogClient;
use config::Config;
use gateway::GatewayClient;
use state::AppState;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use trekora_common::host_guard::AllowedHostsLayer;
use trekora_common::request_id::RequestIdLayer;
use trekora_common::security_headers::SecurityHeadersLayer;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let pool = match db::connect(&cfg.db_url).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "db connect failed");
            std::process::exit(2);
        }
    };
    if let Err(e) = db::ensure_schema(&pool, &cfg.db_schema, cfg.duplicate_guard).await {
        tracing::error!(error = %e, "db ensure_schema failed");
        std::process::exit(2);
    }

    let http = match reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.gateway_timeout_secs))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "http client init failed");
            std::process::exit(2);
        }
    };

    let gateway = match (&cfg.gateway_key_id, &cfg.gateway_key_secret) {
        (Some(key_id), Some(key_secret)) => Some(GatewayClient::new(
            http.clone(),
            cfg.gateway_base_url.clone(),
            key_id.clone(),
            key_secret.clone(),
        )),
        _ => None,
    };
    if gateway.is_none() {
        tracing::warn!("payment gateway credentials not set; payment routes disabled");
    }

    let state = AppState {
        pool,
        db_schema: cfg.db_schema.clone(),
        env_name: cfg.env_name.clone(),
        default_currency: cfg.default_currency.clone(),
        upload_dir: cfg.upload_dir.clone(),
        require_admin_secret: cfg.require_admin_secret,
        admin_secret: cfg.admin_secret.clone(),
        gateway,
        catalog: CatalogClient::new(http.clone(), cfg.catalog_base_url.clone()),
    };

    let cors = if cfg.allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(bookings_cors_allowed_headers())
            .allow_credentials(false)
    } else {
        let origins: Vec<axum::http::HeaderValue> = cfg
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(bookings_cors_allowed_headers())
            .allow_credentials(false)
            .allow_origin(AllowOrigin::list(origins))
    };

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/bookings",
            get(handlers::list_bookings).post(handlers::create_booking),
        )
        .route("/bookings/email/:email", get(handlers::bookings_by_email))
        .route(
            "/bookings/:booking_id",
            get(handlers::get_booking).delete(handlers::cancel_booking),
        )
        .route("/payments/create-order", post(handlers::create_order))
        .route("/payments/verify-payment", post(handlers::verify_payment))
        // Ensure unknown routes return 404, not middleware fallback details.
        .fallback(|| async { StatusCode::NOT_FOUND })
        .with_state(state)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(cfg.max_body_bytes))
        .layer(AllowedHostsLayer::new(cfg.allowed_hosts.clone()))
        .layer(SecurityHeadersLayer::from_env(&cfg.env_name))
        // Avoid logging sensitive query parameters. We log the matched route
        // template when available, otherwise just the path (no query string).
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str)
                    .unwrap_or_else(|| req.uri().path());
                tracing::span!(
                    tracing::Level::INFO,
                    "http_request",
                    method = %req.method(),
                    path = %path
                )
            }),
        )
        .layer(RequestIdLayer::new());

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], cfg.port)));
    tracing::info!(%addr, "starting trekora_booking_service");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

fn bookings_cors_allowed_headers() -> Vec<HeaderName> {
    vec![
        header::ACCEPT,
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        HeaderName::from_static("x-request-id"),
        // The admin back office is a browser app; its secret header must
        // survive CORS preflight.
        HeaderName::from_static("x-admin-secret"),
    ]
}

#[cfg(test)]
mod router_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn ok_handler() -> &'static str {
        "ok"
    }

    #[tokio::test]
    async fn unknown_routes_return_404() {
        let app = Router::new()
            .route("/health", get(ok_handler))
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(AllowedHostsLayer::new(vec![]))
            .layer(SecurityHeadersLayer::new(true, false))
            .layer(RequestIdLayer::new());

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/does_not_exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(resp.headers().get("x-request-id").is_some());
    }

    #[test]
    fn cors_whitelist_excludes_proxy_and_internal_headers() {
        let headers = bookings_cors_allowed_headers();
        let has = |name: &str| {
            headers
                .iter()
                .any(|h| h.as_str().eq_ignore_ascii_case(name))
        };

        assert!(has("content-type"));
        assert!(has("x-request-id"));
        assert!(has("x-admin-secret"));

        assert!(!has("x-forwarded-for"));
        assert!(!has("x-forwarded-host"));
        assert!(!has("x-real-ip"));
        assert!(!has("cookie"));
    }
}
