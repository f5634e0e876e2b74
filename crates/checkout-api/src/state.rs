//! # Application State
//!
//! Shared state for the trusted backend. This is the only place in the
//! workspace that holds merchant secret material; nothing here is ever
//! shipped to the payer's browser.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Backend configuration
#[derive(Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Processor token-issuance endpoint
    pub processor_token_url: String,
    /// Processor order API base URL
    pub processor_order_url: String,
    /// Merchant public identifier
    pub merchant_id: String,
    /// Merchant secret; server-held, never logged
    pub merchant_secret: String,
    /// HMAC key for settlement webhook signatures
    pub webhook_secret: String,
}

impl ApiConfig {
    /// Load from environment variables.
    ///
    /// Required env vars:
    /// - `MERCHANT_ID`
    /// - `MERCHANT_SECRET`
    /// - `WEBHOOK_SECRET`
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let merchant_id = std::env::var("MERCHANT_ID")
            .map_err(|_| anyhow::anyhow!("MERCHANT_ID not set"))?;
        let merchant_secret = std::env::var("MERCHANT_SECRET")
            .map_err(|_| anyhow::anyhow!("MERCHANT_SECRET not set"))?;
        let webhook_secret = std::env::var("WEBHOOK_SECRET")
            .map_err(|_| anyhow::anyhow!("WEBHOOK_SECRET not set"))?;

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            processor_token_url: std::env::var("PROCESSOR_TOKEN_URL").unwrap_or_else(|_| {
                "https://api.sandbox.processor.example/client_token".to_string()
            }),
            processor_order_url: std::env::var("PROCESSOR_ORDER_URL")
                .unwrap_or_else(|_| "https://api.sandbox.processor.example".to_string()),
            merchant_id,
            merchant_secret,
            webhook_secret,
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("processor_token_url", &self.processor_token_url)
            .field("processor_order_url", &self.processor_order_url)
            .field("merchant_id", &self.merchant_id)
            .field("merchant_secret", &"****")
            .field("webhook_secret", &"****")
            .finish()
    }
}

/// A confirmed transaction, keyed by its unique reference
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    pub reference: String,
    pub transaction_id: String,
    pub payer_id: String,
    pub plan_type: String,
    pub canonical_amount: f64,
    /// Set by the processor settlement webhook
    pub settled: bool,
    pub created_at: DateTime<Utc>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub http: reqwest::Client,
    /// Transaction store keyed by reference. The application's real
    /// record store is an external collaborator; this map stands at the
    /// same seam.
    pub transactions: Arc<RwLock<HashMap<String, TransactionRecord>>>,
}

impl AppState {
    pub fn new(config: ApiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            config,
            http,
            transactions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Basic authorization header value for processor calls
    pub fn merchant_auth_header(&self) -> String {
        use base64::engine::general_purpose::STANDARD as BASE64;
        use base64::Engine;

        let credentials = format!(
            "{}:{}",
            self.config.merchant_id, self.config.merchant_secret
        );
        format!("Basic {}", BASE64.encode(credentials.as_bytes()))
    }
}
