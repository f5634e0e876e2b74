//! # Token Acquisition
//!
//! Obtains the short-lived widget authorization credential from the
//! trusted backend and re-encodes it into the transport encoding the
//! widget SDK accepts. The processor's token-issuance endpoint (and the
//! merchant secret it requires) is only ever reached by `checkout-api`;
//! this client never sees secret material.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use checkout_core::{CheckoutError, CheckoutResult, TokenCredential};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Anything that can mint a fresh widget credential
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Produce a fresh single-use credential. Implementations must not
    /// cache: one credential per initialization attempt.
    async fn acquire(&self) -> CheckoutResult<TokenCredential>;
}

#[derive(Debug, Deserialize)]
struct TokenDocument {
    client_token: String,
}

/// Client for the trusted backend's token endpoint
pub struct TokenClient {
    client: reqwest::Client,
    base_url: String,
}

impl TokenClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for TokenClient {
    #[instrument(skip(self))]
    async fn acquire(&self) -> CheckoutResult<TokenCredential> {
        let url = format!("{}/api/v1/gateway-token", self.base_url);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| CheckoutError::Network(format!("token endpoint unreachable: {e}")))?;

        let status = response.status();
        if status.is_server_error() {
            // Transient upstream trouble; the initialization retry
            // budget covers it
            return Err(CheckoutError::Network(format!(
                "token endpoint returned HTTP {status}"
            )));
        }
        if !status.is_success() {
            // 4xx means misconfigured merchant credentials or request;
            // retrying cannot help
            return Err(CheckoutError::Token {
                message: format!("token endpoint rejected request: HTTP {status}"),
            });
        }

        let document: TokenDocument =
            response.json().await.map_err(|e| CheckoutError::Token {
                message: format!("malformed token document: {e}"),
            })?;

        if document.client_token.is_empty() {
            return Err(CheckoutError::Token {
                message: "token document carried an empty credential".to_string(),
            });
        }

        debug!("client token obtained and encoded");

        // The SDK accepts an opaque base64 string, not the raw payload
        Ok(TokenCredential::new(
            BASE64.encode(document.client_token.as_bytes()),
        ))
    }
}
