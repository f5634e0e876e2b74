//! # Payment Request Coordinator
//!
//! Produces the single payment artifact of a checkout attempt.
//!
//! Two protocols, selected by the session's `GatewayKind`:
//! - hosted widget: ask the ready widget to validate and hand back a
//!   nonce;
//! - redirect order: create an order through the trusted backend, hand
//!   control to the processor's approval UI, then capture.
//!
//! Whatever the protocol, exactly one artifact is produced per
//! successful path, and nothing here is retried automatically.

use crate::widget::WidgetLifecycleManager;
use checkout_core::{
    ApprovalDriver, ApprovalOutcome, CheckoutError, CheckoutResult, LocalizedAmount,
    PaymentArtifact, WidgetSdk,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    /// Settlement amount in minor units; major amounts never cross
    /// the processor boundary
    amount_minor_units: i64,
    currency: &'a str,
    payer_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    order_id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    approval_url: Option<String>,
}

/// A created redirect order awaiting payer approval
#[derive(Debug, Clone)]
pub struct PendingOrder {
    pub order_id: String,
    pub approval_url: Option<String>,
}

/// Client for the trusted backend's order endpoint
pub struct OrderClient {
    client: reqwest::Client,
    base_url: String,
}

impl OrderClient {
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

    /// Create a redirect order for the localized amount
    #[instrument(skip(self, amount), fields(currency = %amount.currency))]
    pub async fn create_order(
        &self,
        amount: &LocalizedAmount,
        payer_id: &str,
    ) -> CheckoutResult<PendingOrder> {
        let url = format!("{}/api/v1/orders", self.base_url);
        let request = CreateOrderRequest {
            amount_minor_units: amount.minor_units,
            currency: amount.currency.as_str(),
            payer_id,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CheckoutError::OrderCreation {
                message: format!("order endpoint unreachable: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CheckoutError::OrderCreation {
                message: format!("order endpoint returned HTTP {status}: {body}"),
            });
        }

        let order: CreateOrderResponse =
            response
                .json()
                .await
                .map_err(|e| CheckoutError::OrderCreation {
                    message: format!("malformed order response: {e}"),
                })?;

        if order.order_id.is_empty() {
            return Err(CheckoutError::OrderCreation {
                message: "order response carried no order id".to_string(),
            });
        }

        info!(
            order_id = %order.order_id,
            status = order.status.as_deref().unwrap_or("unknown"),
            "redirect order created"
        );

        Ok(PendingOrder {
            order_id: order.order_id,
            approval_url: order.approval_url,
        })
    }
}

/// Drives the artifact-producing step of either protocol
pub struct PaymentRequestCoordinator;

impl PaymentRequestCoordinator {
    /// Hosted-widget protocol: ask the ready widget for its nonce.
    ///
    /// A `Validation` failure means the payer has not completed the
    /// widget's required fields; they must correct input and resubmit.
    /// The widget stays live and nothing is retried here.
    pub async fn request_artifact<S: WidgetSdk>(
        widget: &WidgetLifecycleManager<S>,
    ) -> CheckoutResult<PaymentArtifact> {
        widget.request_artifact().await
    }

    /// Redirect-order protocol: payer approval then capture.
    ///
    /// `Cancelled` during approval is a terminal outcome, not a failure,
    /// and no capture or confirmation follows it.
    #[instrument(skip(driver), fields(order_id = %order.order_id))]
    pub async fn approve_and_capture(
        driver: &dyn ApprovalDriver,
        order: &PendingOrder,
    ) -> CheckoutResult<PaymentArtifact> {
        match driver.await_approval(&order.order_id).await {
            ApprovalOutcome::Approved => {}
            ApprovalOutcome::Cancelled => {
                info!("payer cancelled during approval");
                return Err(CheckoutError::Cancelled);
            }
            ApprovalOutcome::Failed(detail) => {
                warn!(detail = %detail, "processor reported approval failure");
                return Err(CheckoutError::GatewayDeclined { reason: detail });
            }
        }

        let capture_id = driver
            .capture_order(&order.order_id)
            .await
            .map_err(|err| match err {
                // Preserve decline/cancel semantics from the driver;
                // everything else is a capture failure
                CheckoutError::GatewayDeclined { .. } | CheckoutError::Cancelled => err,
                other => CheckoutError::Capture {
                    order_id: order.order_id.clone(),
                    message: other.to_string(),
                },
            })?;

        info!(capture_id = %capture_id, "order captured");
        Ok(PaymentArtifact::captured_order(capture_id))
    }
}
