//! # Lightning-Checkout RS
//!
//! Trusted backend for the lightning-checkout payment orchestration
//! engine: token issuance, order creation, idempotent confirmation, and
//! settlement webhooks.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export MERCHANT_ID=merchant_...
//! export MERCHANT_SECRET=...
//! export WEBHOOK_SECRET=...
//!
//! # Run the server
//! lightning-checkout
//! ```

use checkout_api::{routes, state::{ApiConfig, AppState}};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let config = ApiConfig::from_env()?;
    let addr = config.socket_addr()?;
    let is_prod = config.is_production();

    info!("Environment: {}", config.environment);

    let state = AppState::new(config);
    let app = routes::create_router(state);

    info!("🚀 Lightning-Checkout starting on http://{}", addr);

    if !is_prod {
        info!("📝 Health: http://{}/health", addr);
        info!("🎫 Token: POST http://{}/api/v1/gateway-token", addr);
        info!("💳 Confirm: POST http://{}/api/v1/confirm", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  ⚡ Lightning-Checkout RS ⚡
  ━━━━━━━━━━━━━━━━━━━━━━━━━━
  Payment orchestration backend
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
