pub mod config;
pub mod error;
pub mod fallback;
pub mod proxy;
pub mod rate_limit;
pub mod router;

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::fallback::{fallback_handler, FALLBACK_PATH};
use crate::proxy::{proxy_handler, route_match_middleware, ProxyState};
use crate::rate_limit::{rate_limit_middleware, RateLimitMiddleware, RateLimiter};
use crate::router::Router;
use axum::{
    middleware::from_fn_with_state,
    routing::{any, get},
    Router as AxumRouter,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Path answering gateway-level liveness checks
pub const HEALTH_PATH: &str = "/health";

/// Build the gateway application
///
/// Proxied routes are matched first, then run the seller key middleware;
/// `/fallback` and `/health` are served by the gateway itself. `limiter` is the external rate limiter
/// resolved keys are handed to, if any.
pub fn build_app(
    config: &GatewayConfig,
    limiter: Option<Arc<dyn RateLimiter>>,
) -> Result<AxumRouter> {
    config.validate()?;

    let router = Router::new(config.routes.clone())?;
    info!("Loaded {} routes", router.routes().len());

    let proxy_state = ProxyState::new(router, Duration::from_secs(config.server.timeout_secs))?;

    // `/*path` does not match the bare root, so `/` is registered on its own
    let mut proxied = AxumRouter::new()
        .route("/", any(proxy_handler))
        .route("/*path", any(proxy_handler));

    let rate_limiting = &config.rate_limiting;
    if rate_limiting.enabled {
        let mut middleware = RateLimitMiddleware::new(Arc::new(rate_limiting.resolver()?))
            .with_empty_key_policy(rate_limiting.empty_key_policy()?);
        if let Some(limiter) = limiter {
            middleware = middleware.with_limiter(limiter);
        }

        info!(
            header = %rate_limiting.header,
            deny_empty_key = rate_limiting.deny_empty_key,
            "Seller rate limit keys enabled"
        );
        proxied = proxied.route_layer(from_fn_with_state(middleware, rate_limit_middleware));
    } else if limiter.is_some() {
        warn!("Rate limiter supplied but rate limiting is disabled; ignoring it");
    }

    // Added last so it wraps the key middleware: 404/405 win over key policies
    proxied = proxied.route_layer(from_fn_with_state(
        proxy_state.clone(),
        route_match_middleware,
    ));

    Ok(AxumRouter::new()
        .route(FALLBACK_PATH, any(fallback_handler))
        .route(HEALTH_PATH, get(health_handler))
        .merge(proxied.with_state(proxy_state))
        .layer(TraceLayer::new_for_http()))
}

/// Initialize the gateway server
pub async fn init_gateway(
    config: GatewayConfig,
    limiter: Option<Arc<dyn RateLimiter>>,
) -> Result<()> {
    info!("Starting API Gateway");
    info!(
        "Server listening on {}:{}",
        config.server.host, config.server.port
    );

    let app = build_app(&config, limiter)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Gateway ready to accept connections");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::GatewayError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}

async fn health_handler() -> &'static str {
    "OK"
}

/// Initialize tracing/logging
///
/// `RUST_LOG` controls filtering; `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "seller_gateway=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}
