use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Rejects requests whose Host header is not on the allowlist. Rules:
/// `*` matches everything, a leading dot matches the bare domain and any
/// subdomain, anything else is an exact match. An empty allowlist disables
/// the guard.
#[derive(Clone)]
pub struct AllowedHostsLayer {
    allowed: Vec<String>,
}

impl AllowedHostsLayer {
    pub fn new(allowed_hosts: Vec<String>) -> Self {
        let allowed = allowed_hosts
            .into_iter()
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        Self { allowed }
    }
}

fn host_matches(host: &str, rule: &str) -> bool {
    match rule {
        "*" => true,
        r if r.starts_with('.') => host == &r[1..] || host.ends_with(r),
        r => host == r,
    }
}

impl<S> Layer<S> for AllowedHostsLayer {
    type Service = AllowedHostsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AllowedHostsService {
            inner,
            allowed: self.allowed.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AllowedHostsService<S> {
    inner: S,
    allowed: Vec<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
}

impl<S, B> Service<Request<B>> for AllowedHostsService<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let allowed = self.allowed.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if allowed.is_empty() {
                return inner.call(req).await;
            }

            let host = req
                .headers()
                .get("host")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .split(':')
                .next()
                .unwrap_or("")
                .trim()
                .to_lowercase();

            if host.is_empty() || !allowed.iter().any(|rule| host_matches(&host, rule)) {
                let body = axum::Json(ErrorBody {
                    success: false,
                    error: "invalid host",
                });
                return Ok((StatusCode::BAD_REQUEST, body).into_response());
            }

            inner.call(req).await
        })
    }
}
