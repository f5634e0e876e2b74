//! # Reconciliation Client
//!
//! Sends the payment artifact to the backend confirmation endpoint and
//! interprets the result idempotently. Confirmation is keyed by a
//! reference derived from the artifact; repeating a confirmation with
//! the same reference must never double-credit the payer, and two
//! *different* successful confirmations for one reference inside a
//! session is a fatal mismatch.
//!
//! Confirmation failures are never retried automatically: money may
//! already have moved at the processor, so the payer is directed to a
//! recovery path instead.

use checkout_core::{CheckoutError, CheckoutResult, PaymentArtifact, PaymentSession};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info, instrument};

#[derive(Debug, Serialize)]
struct ConfirmRequest<'a> {
    reference: &'a str,
    artifact: &'a str,
    canonical_amount: f64,
    payer_id: &'a str,
    plan_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct ConfirmResponse {
    success: bool,
    #[serde(default)]
    transaction_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// A successful backend confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub reference: String,
    pub transaction_id: String,
}

/// Client for the backend confirmation endpoint
pub struct ReconciliationClient {
    client: reqwest::Client,
    base_url: String,
    /// Successful confirmations observed this session, by reference
    observed: HashMap<String, String>,
}

impl ReconciliationClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into(),
            observed: HashMap::new(),
        }
    }

    /// Confirm a payment artifact against the backend of record.
    ///
    /// Consumes the artifact; it is single-use. Only a returned
    /// `Confirmation` permits marking the payer as paid.
    #[instrument(skip_all, fields(session = %session.id))]
    pub async fn confirm(
        &mut self,
        artifact: PaymentArtifact,
        session: &PaymentSession,
    ) -> CheckoutResult<Confirmation> {
        let reference = artifact.reference();
        let value = artifact.into_value();

        let request = ConfirmRequest {
            reference: &reference,
            artifact: &value,
            canonical_amount: session.canonical_amount,
            payer_id: &session.payer_id,
            plan_type: &session.plan_type,
        };

        let url = format!("{}/api/v1/confirm", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CheckoutError::Confirmation {
                message: format!("confirmation endpoint unreachable: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckoutError::Confirmation {
                message: format!("confirmation endpoint returned HTTP {status}"),
            });
        }

        let body: ConfirmResponse =
            response
                .json()
                .await
                .map_err(|e| CheckoutError::Confirmation {
                    message: format!("malformed confirmation response: {e}"),
                })?;

        if !body.success {
            let detail = body.error.unwrap_or_else(|| "unspecified".to_string());
            error!(reference = %reference, detail = %detail, "confirmation rejected");
            return Err(CheckoutError::Confirmation { message: detail });
        }

        let transaction_id = body.transaction_id.ok_or_else(|| {
            CheckoutError::Confirmation {
                message: "success response carried no transaction id".to_string(),
            }
        })?;

        if let Some(first) = self.observed.get(&reference) {
            if first != &transaction_id {
                return Err(CheckoutError::ConfirmationMismatch {
                    reference,
                    first: first.clone(),
                    second: transaction_id,
                });
            }
        } else {
            self.observed
                .insert(reference.clone(), transaction_id.clone());
        }

        info!(reference = %reference, transaction_id = %transaction_id, "payment confirmed");

        Ok(Confirmation {
            reference,
            transaction_id,
        })
    }
}
