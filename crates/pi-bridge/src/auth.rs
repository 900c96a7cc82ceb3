//! HTTP Basic gate for the dashboard front-end.
//!
//! When a password is configured and the service is not running in
//! development, every page request must carry `Authorization: Basic ...`
//! whose password matches. The username is not checked. API routes and
//! static assets always pass through.

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, Response, StatusCode},
    response::IntoResponse,
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;
use std::task::{Context, Poll};
use subtle::ConstantTimeEq;
use tower::{Layer, Service};

use pi_core::config::Environment;

pub const REALM: &str = "Secure Area";

const ASSET_PREFIXES: &[&str] = &["/_next/", "/static/", "/assets/"];

/// Paths that skip the gate: the JSON API and anything that looks like a
/// static asset.
pub fn is_exempt_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/") || is_asset_path(path)
}

pub fn is_asset_path(path: &str) -> bool {
    if path == "/favicon.ico" || ASSET_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return true;
    }
    path.rsplit('/')
        .next()
        .is_some_and(|last| last.contains('.') && !last.starts_with('.'))
}

/// Extract the password from a `Basic` authorization header value.
fn basic_password(value: &HeaderValue) -> Option<String> {
    let encoded = value.to_str().ok()?.strip_prefix("Basic ")?;
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (_user, password) = credentials.split_once(':')?;
    Some(password.to_string())
}

fn unauthorized() -> Response<Body> {
    (
        StatusCode::UNAUTHORIZED,
        [(
            header::WWW_AUTHENTICATE,
            format!("Basic realm=\"{REALM}\""),
        )],
        "Authentication required",
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// BasicAuthLayer
// ---------------------------------------------------------------------------

/// A [`tower::Layer`] that wraps services with [`BasicAuthMiddleware`].
#[derive(Clone)]
pub struct BasicAuthLayer {
    /// `None` = gate disabled.
    password: Option<Arc<String>>,
}

impl BasicAuthLayer {
    /// The gate is active only outside development and with a non-empty
    /// password.
    pub fn new(password: Option<String>, environment: Environment) -> Self {
        let password = password
            .filter(|p| !p.is_empty())
            .filter(|_| !environment.is_development());
        Self {
            password: password.map(Arc::new),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.password.is_some()
    }
}

impl<S> Layer<S> for BasicAuthLayer {
    type Service = BasicAuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BasicAuthMiddleware {
            inner,
            password: self.password.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// BasicAuthMiddleware
// ---------------------------------------------------------------------------

/// The middleware service produced by [`BasicAuthLayer`].
#[derive(Clone)]
pub struct BasicAuthMiddleware<S> {
    inner: S,
    password: Option<Arc<String>>,
}

impl<S> Service<Request<Body>> for BasicAuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let password = self.password.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let expected = match password {
                Some(p) if !is_exempt_path(req.uri().path()) => p,
                _ => return inner.call(req).await,
            };

            let provided = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(basic_password);

            match provided {
                Some(ref pw) if bool::from(pw.as_bytes().ct_eq(expected.as_bytes())) => {
                    inner.call(req).await
                }
                _ => {
                    tracing::debug!(path = %req.uri().path(), "basic auth rejected");
                    Ok(unauthorized())
                }
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
