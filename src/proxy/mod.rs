use crate::error::{GatewayError, Result};
use crate::fallback::fallback_response;
use crate::rate_limit::RateLimitKey;
use crate::router::{RouteMatch, Router};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::HOST, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Proxy handler state
#[derive(Clone)]
pub struct ProxyState {
    pub router: Arc<Router>,
    pub client: reqwest::Client,
}

impl ProxyState {
    /// Create a new proxy state
    pub fn new(router: Router, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            router: Arc::new(router),
            client,
        })
    }
}

/// Route matching middleware
///
/// Resolves the route before any per-route layer runs, so unknown paths and
/// disallowed methods get 404/405 regardless of later policies. The match is
/// stored in request extensions for [`proxy_handler`].
pub async fn route_match_middleware(
    State(state): State<ProxyState>,
    mut request: Request,
    next: Next,
) -> Response {
    let matched = state.router.match_route(request.uri().path(), request.method());

    match matched {
        Ok(route_match) => {
            debug!(
                route = %route_match.route.pattern,
                description = %route_match.route.description,
                params = ?route_match.params,
                "Route matched"
            );
            request.extensions_mut().insert(route_match);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Main proxy handler that forwards requests to backend services
///
/// When the backend cannot be reached and the route has fallback enabled, the
/// client gets the fallback response instead of a 502/504.
pub async fn proxy_handler(State(state): State<ProxyState>, mut req: Request) -> Result<Response> {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let path = uri.path();
    let seller_key = req.extensions().get::<RateLimitKey>().map(|k| k.to_string());

    info!(
        method = %method,
        path = %path,
        rate_limit_key = seller_key.as_deref().unwrap_or("-"),
        "Incoming request"
    );

    let route_match = match req.extensions_mut().remove::<RouteMatch>() {
        Some(route_match) => route_match,
        None => state.router.match_route(path, &method)?,
    };

    let mut backend_url = route_match.build_backend_url();
    if let Some(q) = uri.query() {
        backend_url.push('?');
        backend_url.push_str(q);
    }

    debug!(backend_url = %backend_url, "Forwarding to backend");

    let headers = req.headers().clone();
    let body_bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|e| GatewayError::Proxy(format!("Failed to read request body: {}", e)))?
        .to_bytes();

    let started = Instant::now();
    let response = send_request(&state.client, method, headers, body_bytes, &backend_url).await;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    match response {
        Ok(resp) => {
            info!(
                status = %resp.status(),
                backend = %route_match.route.backend,
                latency_ms,
                "Request completed"
            );
            Ok(resp)
        }
        Err(e) if e.is_upstream_unavailable() && route_match.route.fallback => {
            warn!(
                error = %e,
                backend = %route_match.route.backend,
                latency_ms,
                "Backend unavailable, serving fallback response"
            );
            Ok(fallback_response())
        }
        Err(e) => {
            warn!(
                error = %e,
                backend = %route_match.route.backend,
                latency_ms,
                "Request failed"
            );
            Err(e)
        }
    }
}

/// Send request to the backend service
async fn send_request(
    client: &reqwest::Client,
    method: Method,
    headers: HeaderMap,
    body_bytes: Bytes,
    backend_url: &str,
) -> Result<Response> {
    let mut backend_req = client.request(method, backend_url).body(body_bytes);

    // The client sets Host for the backend itself
    for (name, value) in headers.iter() {
        if *name != HOST && !is_hop_by_hop_header(name.as_str()) {
            backend_req = backend_req.header(name, value);
        }
    }

    let backend_response = backend_req.send().await.map_err(|e| {
        if e.is_timeout() {
            GatewayError::Timeout(format!("Backend request timed out: {}", e))
        } else if e.is_connect() {
            GatewayError::Backend(format!("Failed to connect to backend: {}", e))
        } else {
            GatewayError::Proxy(format!("Backend request failed: {}", e))
        }
    })?;

    let status = backend_response.status();
    let mut response_builder = http::Response::builder().status(status);

    for (name, value) in backend_response.headers().iter() {
        if !is_hop_by_hop_header(name.as_str()) {
            response_builder = response_builder.header(name, value);
        }
    }

    let body_bytes = backend_response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            GatewayError::Timeout(format!("Backend response timed out: {}", e))
        } else {
            GatewayError::Proxy(format!("Failed to read backend response: {}", e))
        }
    })?;

    response_builder
        .body(Body::from(body_bytes))
        .map_err(|e| GatewayError::Internal(format!("Failed to build response: {}", e)))
}

/// Check if a header is a hop-by-hop header that should not be forwarded
fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
    )
}
