use crate::error::{GatewayError, Result};
use crate::rate_limit::middleware::EmptyKeyPolicy;
use crate::rate_limit::resolver::{SellerKeyResolver, SELLER_ID_HEADER};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment variables overriding file settings
/// (e.g. `GATEWAY__SERVER__PORT=9090`)
pub const ENV_PREFIX: &str = "GATEWAY";

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Route definitions
    pub routes: Vec<RouteConfig>,
    /// Seller rate-limit key configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Route configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Route path pattern (e.g., "/api/users/:id")
    pub path: String,
    /// Backend service URL
    pub backend: String,
    /// Allowed HTTP methods (if empty, all methods allowed)
    #[serde(default)]
    pub methods: Vec<String>,
    /// Whether to strip the prefix when forwarding
    #[serde(default)]
    pub strip_prefix: bool,
    /// Route description
    #[serde(default)]
    pub description: String,
    /// Answer with the fallback response when the backend is unreachable
    #[serde(default = "default_true")]
    pub fallback: bool,
}

/// Seller key resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Resolve keys for proxied requests
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Header carrying the seller identifier
    #[serde(default = "default_seller_header")]
    pub header: String,
    /// Reject requests that resolve to no key
    #[serde(default)]
    pub deny_empty_key: bool,
    /// Status used when rejecting keyless requests
    #[serde(default = "default_empty_key_status")]
    pub empty_key_status: u16,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout() -> u64 {
    30
}

fn default_seller_header() -> String {
    SELLER_ID_HEADER.to_string()
}

fn default_empty_key_status() -> u16 {
    403
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            header: default_seller_header(),
            deny_empty_key: false,
            empty_key_status: default_empty_key_status(),
        }
    }
}

impl RateLimitingConfig {
    /// Build the resolver for the configured header
    pub fn resolver(&self) -> Result<SellerKeyResolver> {
        SellerKeyResolver::new(&self.header)
    }

    /// Policy for requests without a seller key
    pub fn empty_key_policy(&self) -> Result<EmptyKeyPolicy> {
        if !self.deny_empty_key {
            return Ok(EmptyKeyPolicy::Allow);
        }

        let status = StatusCode::from_u16(self.empty_key_status)
            .ok()
            .filter(|s| s.is_client_error() || s.is_server_error())
            .ok_or_else(|| {
                GatewayError::Config(format!(
                    "Empty key status must be a 4xx or 5xx code, got {}",
                    self.empty_key_status
                ))
            })?;

        Ok(EmptyKeyPolicy::Deny(status))
    }
}

impl GatewayConfig {
    /// Load configuration from a YAML file, applying `GATEWAY__*` overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GatewayError::Config(format!(
                "Failed to read config file: {} does not exist",
                path.display()
            )));
        }

        config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Yaml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| GatewayError::Config(format!("Failed to load config: {}", e)))
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| GatewayError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for route in &self.routes {
            if route.path.is_empty() {
                return Err(GatewayError::InvalidRoute(
                    "Route path cannot be empty".to_string(),
                ));
            }

            if route.backend.is_empty() {
                return Err(GatewayError::InvalidRoute(format!(
                    "Backend URL cannot be empty for route: {}",
                    route.path
                )));
            }

            if !route.backend.starts_with("http://") && !route.backend.starts_with("https://") {
                return Err(GatewayError::InvalidRoute(format!(
                    "Backend URL must start with http:// or https:// for route: {}",
                    route.path
                )));
            }

            for method in &route.methods {
                let method_upper = method.to_uppercase();
                if !["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"]
                    .contains(&method_upper.as_str())
                {
                    return Err(GatewayError::InvalidRoute(format!(
                        "Invalid HTTP method '{}' for route: {}",
                        method, route.path
                    )));
                }
            }
        }

        self.rate_limiting.resolver()?;
        self.rate_limiting.empty_key_policy()?;

        Ok(())
    }

    /// Create a default configuration for testing
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig::default(),
            routes: vec![],
            rate_limiting: RateLimitingConfig::default(),
        }
    }
}
