use axum::http::{HeaderMap, HeaderValue, Request};
use axum::response::Response;
use std::env;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Baseline hardening headers for every response. HSTS defaults on only in
/// production-like environments (local traffic is plain http).
#[derive(Clone, Debug)]
pub struct SecurityHeadersLayer {
    enabled: bool,
    hsts_enabled: bool,
    csp_value: Option<String>,
}

impl SecurityHeadersLayer {
    pub fn new(enabled: bool, hsts_enabled: bool) -> Self {
        Self {
            enabled,
            hsts_enabled,
            csp_value: Some(default_csp_header_value().to_string()),
        }
    }

    pub fn with_csp(mut self, csp_value: Option<String>) -> Self {
        self.csp_value = csp_value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        self
    }

    pub fn from_env(env_name: &str) -> Self {
        let env_lower = env_name.trim().to_ascii_lowercase();
        let prod_like = matches!(env_lower.as_str(), "prod" | "production" | "staging");

        let enabled = parse_bool_env("SECURITY_HEADERS_ENABLED", true);
        let hsts_enabled = parse_bool_env("HSTS_ENABLED", prod_like);
        let csp = if parse_bool_env("CSP_ENABLED", true) {
            Some(
                env::var("CSP_HEADER_VALUE")
                    .ok()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| default_csp_header_value().to_string()),
            )
        } else {
            None
        };

        Self::new(enabled, hsts_enabled).with_csp(csp)
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersService {
            inner,
            enabled: self.enabled,
            hsts_enabled: self.hsts_enabled,
            csp_value: self.csp_value.clone(),
        }
    }
}

#[derive(Clone)]
pub struct SecurityHeadersService<S> {
    inner: S,
    enabled: bool,
    hsts_enabled: bool,
    csp_value: Option<String>,
}

impl<S, B> Service<Request<B>> for SecurityHeadersService<S>
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
        let enabled = self.enabled;
        let hsts_enabled = self.hsts_enabled;
        let csp_value = self.csp_value.clone();
        let mut inner = self.inner.clone();
        Box::pin(async move {
            let mut resp = inner.call(req).await?;
            if enabled {
                add_security_headers(resp.headers_mut(), hsts_enabled, csp_value.as_deref());
            }
            Ok(resp)
        })
    }
}

fn default_csp_header_value() -> &'static str {
    // This service only serves JSON; lock the document policy down hard.
    "default-src 'none'; base-uri 'none'; frame-ancestors 'none'; form-action 'none'"
}

fn parse_bool_env(key: &str, default: bool) -> bool {
    let raw = env::var(key).unwrap_or_default();
    let v = raw.trim().to_ascii_lowercase();
    if v.is_empty() {
        return default;
    }
    !matches!(v.as_str(), "0" | "false" | "no" | "off")
}

fn add_security_headers(headers: &mut HeaderMap, hsts_enabled: bool, csp_value: Option<&str>) {
    set_if_absent(headers, "x-content-type-options", "nosniff");
    set_if_absent(headers, "x-frame-options", "DENY");
    set_if_absent(headers, "referrer-policy", "no-referrer");
    set_if_absent(
        headers,
        "permissions-policy",
        "camera=(), microphone=(), geolocation=()",
    );
    if hsts_enabled {
        set_if_absent(
            headers,
            "strict-transport-security",
            "max-age=31536000; includeSubDomains",
        );
    }
    if let Some(csp) = csp_value {
        set_if_absent(headers, "content-security-policy", csp);
    }
}

fn set_if_absent(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if headers.contains_key(name) {
        return;
    }
    if let Ok(v) = HeaderValue::from_str(value) {
        headers.insert(name, v);
    }
}
