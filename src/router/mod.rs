use crate::config::RouteConfig;
use crate::error::{GatewayError, Result};
use http::Method;
use matchit::Router as MatchitRouter;
use std::collections::HashMap;

/// Route information
#[derive(Debug, Clone)]
pub struct Route {
    /// Path pattern as configured
    pub pattern: String,
    /// Backend service URL
    pub backend: String,
    /// Allowed HTTP methods (empty means all methods allowed)
    pub methods: Vec<Method>,
    /// Whether to strip the prefix when forwarding
    pub strip_prefix: bool,
    /// Literal part of the pattern before its first parameter
    pub prefix: String,
    /// Route description
    pub description: String,
    /// Answer with the fallback response when the backend is unreachable
    pub fallback: bool,
}

/// Gateway router for matching incoming requests to backend services
#[derive(Debug, Clone)]
pub struct Router {
    matcher: MatchitRouter<Route>,
    patterns: Vec<String>,
}

impl Router {
    /// Create a new router from route configurations
    pub fn new(routes: Vec<RouteConfig>) -> Result<Self> {
        let mut matcher = MatchitRouter::new();
        let mut patterns = Vec::with_capacity(routes.len());

        for route_config in routes {
            let methods = route_config
                .methods
                .iter()
                .map(|m| {
                    Method::from_bytes(m.to_uppercase().as_bytes())
                        .map_err(|_| GatewayError::InvalidMethod(m.clone()))
                })
                .collect::<Result<Vec<_>>>()?;

            let route = Route {
                prefix: static_prefix(&route_config.path),
                pattern: route_config.path.clone(),
                backend: route_config.backend,
                methods,
                strip_prefix: route_config.strip_prefix,
                description: route_config.description,
                fallback: route_config.fallback,
            };

            // Convert path syntax from :param to {param} and *path to {*path}
            let matchit_path = convert_path_syntax(&route_config.path);

            matcher
                .insert(&matchit_path, route)
                .map_err(|e| GatewayError::InvalidRoute(format!("Failed to insert route: {}", e)))?;
            patterns.push(route_config.path);
        }

        Ok(Self { matcher, patterns })
    }

    /// Match a request path and method to a route
    pub fn match_route(&self, path: &str, method: &Method) -> Result<RouteMatch> {
        let matched = self
            .matcher
            .at(path)
            .map_err(|_| GatewayError::RouteNotFound(path.to_string()))?;

        let route = matched.value;

        if !route.methods.is_empty() && !route.methods.contains(method) {
            return Err(GatewayError::InvalidMethod(format!(
                "Method {} not allowed for path {}",
                method, path
            )));
        }

        let params: HashMap<String, String> = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Ok(RouteMatch {
            route: route.clone(),
            params,
            matched_path: path.to_string(),
        })
    }

    /// Configured route patterns, in insertion order
    pub fn routes(&self) -> &[String] {
        &self.patterns
    }
}

/// Result of matching a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route
    pub route: Route,
    /// Path parameters extracted from the URL
    pub params: HashMap<String, String>,
    /// The original matched path
    pub matched_path: String,
}

impl RouteMatch {
    /// Build the backend URL for the matched path
    pub fn build_backend_url(&self) -> String {
        let backend = self.route.backend.trim_end_matches('/');
        let path = if self.route.strip_prefix {
            match self.matched_path.strip_prefix(&self.route.prefix) {
                Some("") => "/",
                Some(rest) => rest,
                None => self.matched_path.as_str(),
            }
        } else {
            self.matched_path.as_str()
        };

        if path.starts_with('/') {
            format!("{}{}", backend, path)
        } else {
            format!("{}/{}", backend, path)
        }
    }
}

/// Convert path syntax from Express-style (:param, *path) to matchit syntax ({param}, {*path})
fn convert_path_syntax(path: &str) -> String {
    let mut result = String::new();
    let mut chars = path.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ':' | '*' => {
                result.push('{');
                if ch == '*' {
                    result.push('*');
                }
                while let Some(next_ch) = chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
                    result.push(next_ch);
                }
                result.push('}');
            }
            _ => result.push(ch),
        }
    }

    result
}

/// Literal part of a pattern before the first parameter, without a trailing slash
fn static_prefix(pattern: &str) -> String {
    let end = pattern.find([':', '*']).unwrap_or(pattern.len());
    pattern[..end].trim_end_matches('/').to_string()
}
