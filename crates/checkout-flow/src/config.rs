//! # Gateway Configuration
//!
//! Public-side configuration for the checkout pipelines. Only publicly
//! exposable values live here: the trusted backend base URL and the
//! per-processor client keys. Merchant secrets belong to `checkout-api`
//! and never reach this crate.

use checkout_core::{CheckoutError, CheckoutResult};
use std::env;

/// Sandbox or live processing, derived from the client-key prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Sandbox,
    Live,
}

/// Client-side gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the trusted backend (token, order, confirm endpoints)
    pub backend_base_url: String,

    /// Public client key for the hosted-widget processor
    /// (sandbox_... or production_...)
    pub widget_client_key: String,

    /// Public client id for the redirect-order processor
    pub redirect_client_id: String,

    /// Sandbox vs live mode
    pub environment: Environment,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `CHECKOUT_BACKEND_URL`
    /// - `WIDGET_CLIENT_KEY`
    /// - `REDIRECT_CLIENT_ID`
    pub fn from_env() -> CheckoutResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let backend_base_url = env::var("CHECKOUT_BACKEND_URL").map_err(|_| {
            CheckoutError::Configuration("CHECKOUT_BACKEND_URL not set".to_string())
        })?;

        let widget_client_key = env::var("WIDGET_CLIENT_KEY")
            .map_err(|_| CheckoutError::Configuration("WIDGET_CLIENT_KEY not set".to_string()))?;

        let redirect_client_id = env::var("REDIRECT_CLIENT_ID")
            .map_err(|_| CheckoutError::Configuration("REDIRECT_CLIENT_ID not set".to_string()))?;

        Self::new(backend_base_url, widget_client_key, redirect_client_id)
    }

    /// Create config with explicit values, validating the key format
    pub fn new(
        backend_base_url: impl Into<String>,
        widget_client_key: impl Into<String>,
        redirect_client_id: impl Into<String>,
    ) -> CheckoutResult<Self> {
        let widget_client_key: String = widget_client_key.into();

        let environment = if widget_client_key.starts_with("sandbox_") {
            Environment::Sandbox
        } else if widget_client_key.starts_with("production_") {
            Environment::Live
        } else {
            return Err(CheckoutError::Configuration(
                "WIDGET_CLIENT_KEY must start with sandbox_ or production_".to_string(),
            ));
        };

        Ok(Self {
            backend_base_url: backend_base_url.into(),
            widget_client_key,
            redirect_client_id: redirect_client_id.into(),
            environment,
        })
    }

    pub fn is_sandbox(&self) -> bool {
        self.environment == Environment::Sandbox
    }

    pub fn is_live(&self) -> bool {
        self.environment == Environment::Live
    }
}
