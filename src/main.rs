use seller_gateway::{config::GatewayConfig, init_gateway, init_tracing};
use std::env;
use std::process;

#[tokio::main]
async fn main() {
    // Initialize tracing
    init_tracing();

    // Get config file path from command line or use default
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "config/gateway.yaml".to_string());

    // Load configuration
    let config = match GatewayConfig::from_file(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", config_path, e);
            eprintln!("Usage: seller-gateway [config_file]");
            process::exit(1);
        }
    };

    // Start the gateway; no external limiter is wired in by default
    if let Err(e) = init_gateway(config, None).await {
        eprintln!("Gateway error: {}", e);
        process::exit(1);
    }
}
