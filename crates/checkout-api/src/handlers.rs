//! # Request Handlers
//!
//! Axum handlers for the trusted backend boundary: client-token
//! issuance, redirect-order creation, idempotent payment confirmation,
//! and the processor settlement webhook.
//!
//! Merchant credentials live only on this side of the boundary; the
//! browser core receives short-lived public material and nothing else.

use crate::state::{AppState, TransactionRecord};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> (StatusCode, Json<Self>) {
        let response = Self {
            error: error.into(),
            code,
        };
        (
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(response),
        )
    }
}

/// Token issued to the browser core
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub client_token: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub amount_minor_units: i64,
    pub currency: String,
    pub payer_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub reference: String,
    pub artifact: String,
    pub canonical_amount: f64,
    pub payer_id: String,
    pub plan_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SettlementEvent {
    reference: String,
    event: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "lightning-checkout",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Issue a short-lived widget client token.
///
/// Calls the processor's token-issuance endpoint with the server-held
/// merchant credentials and hands only the embedded credential payload
/// back to the browser.
#[instrument(skip(state))]
pub async fn issue_gateway_token(
    State(state): State<AppState>,
) -> Result<Json<TokenResponse>, (StatusCode, Json<ErrorResponse>)> {
    let response = state
        .http
        .post(&state.config.processor_token_url)
        .header("Authorization", state.merchant_auth_header())
        .json(&serde_json::json!({ "merchant_id": state.config.merchant_id }))
        .send()
        .await
        .map_err(|e| {
            error!(error = %e, "processor token endpoint unreachable");
            ErrorResponse::new("Token issuance unavailable", 502)
        })?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if !status.is_success() {
        error!(status = %status, "processor token issuance failed");
        return Err(ErrorResponse::new(
            format!("Processor rejected token request: HTTP {status}"),
            502,
        ));
    }

    let document: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
        error!(error = %e, "malformed processor token document");
        ErrorResponse::new("Malformed processor token document", 502)
    })?;

    let client_token = document
        .get("client_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            ErrorResponse::new("Processor token document missing credential", 502)
        })?;

    info!("client token issued");

    Ok(Json(TokenResponse {
        client_token: client_token.to_string(),
    }))
}

/// Create a redirect order with the processor.
///
/// Obtains a client-credentials bearer token, then creates a CAPTURE
/// order for the settlement amount.
#[instrument(skip(state, request), fields(currency = %request.currency))]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.amount_minor_units <= 0 {
        return Err(ErrorResponse::new("Amount must be positive", 400));
    }
    let currency = checkout_core::Currency::parse(&request.currency)
        .ok_or_else(|| ErrorResponse::new(format!("Unsupported currency: {}", request.currency), 400))?;

    // Step 1: client-credentials grant
    let auth_url = format!("{}/v1/oauth2/token", state.config.processor_order_url);
    let auth_response = state
        .http
        .post(&auth_url)
        .header("Authorization", state.merchant_auth_header())
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await
        .map_err(|e| {
            error!(error = %e, "processor auth unreachable");
            ErrorResponse::new("Processor authentication unavailable", 502)
        })?;

    if !auth_response.status().is_success() {
        error!(status = %auth_response.status(), "processor auth failed");
        return Err(ErrorResponse::new("Processor authentication failed", 502));
    }

    let auth_body: serde_json::Value = auth_response
        .json()
        .await
        .map_err(|_| ErrorResponse::new("Malformed processor auth response", 502))?;

    let access_token = auth_body
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ErrorResponse::new("No access token from processor", 502))?;

    // Step 2: create the order. The processor takes major units; the
    // minor-unit wire amount converts exactly.
    let major = currency.from_minor_units(request.amount_minor_units);
    let value = if currency.decimal_places() == 0 {
        format!("{}", major.round() as i64)
    } else {
        format!("{major:.2}")
    };

    let order_payload = serde_json::json!({
        "intent": "CAPTURE",
        "purchase_units": [{
            "amount": {
                "currency_code": currency.as_str(),
                "value": value
            },
            "custom_id": request.payer_id
        }]
    });

    let order_url = format!("{}/v2/checkout/orders", state.config.processor_order_url);
    let order_response = state
        .http
        .post(&order_url)
        .header("Authorization", format!("Bearer {access_token}"))
        .header("Processor-Request-Id", Uuid::new_v4().to_string())
        .json(&order_payload)
        .send()
        .await
        .map_err(|e| {
            error!(error = %e, "processor order endpoint unreachable");
            ErrorResponse::new("Order creation unavailable", 502)
        })?;

    let status = order_response.status();
    let body = order_response.text().await.unwrap_or_default();

    if !status.is_success() {
        error!(status = %status, body = %body, "processor order creation failed");
        return Err(ErrorResponse::new("Order creation failed", 502));
    }

    let order: serde_json::Value = serde_json::from_str(&body)
        .map_err(|_| ErrorResponse::new("Malformed processor order response", 502))?;

    let order_id = order
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ErrorResponse::new("Processor order response missing id", 502))?;

    let approval_url = order
        .get("links")
        .and_then(|links| links.as_array())
        .and_then(|links| {
            links.iter().find(|link| {
                link.get("rel").and_then(|r| r.as_str()) == Some("approve")
            })
        })
        .and_then(|link| link.get("href"))
        .and_then(|href| href.as_str())
        .map(String::from);

    info!(order_id = %order_id, "redirect order created");

    Ok(Json(CreateOrderResponse {
        order_id: order_id.to_string(),
        status: order
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("CREATED")
            .to_string(),
        approval_url,
    }))
}

/// Confirm a payment artifact, idempotently.
///
/// The reference uniquely keys the transaction: the first confirmation
/// records it and credits the payer once; any repeat returns the stored
/// result unchanged. A repeat carrying a different amount for the same
/// reference is rejected outright.
#[instrument(skip(state, request), fields(reference = %request.reference))]
pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(request): Json<ConfirmRequest>,
) -> Json<ConfirmResponse> {
    if request.reference.is_empty() || request.artifact.is_empty() {
        return Json(ConfirmResponse {
            success: false,
            transaction_id: None,
            error: Some("Missing reference or artifact".to_string()),
        });
    }

    let mut transactions = state.transactions.write().await;

    if let Some(existing) = transactions.get(&request.reference) {
        if (existing.canonical_amount - request.canonical_amount).abs() > f64::EPSILON {
            warn!(
                reference = %request.reference,
                "duplicate confirmation with diverging amount rejected"
            );
            return Json(ConfirmResponse {
                success: false,
                transaction_id: None,
                error: Some("Reference already confirmed with a different amount".to_string()),
            });
        }

        info!(
            reference = %request.reference,
            transaction_id = %existing.transaction_id,
            "duplicate confirmation replayed"
        );
        return Json(ConfirmResponse {
            success: true,
            transaction_id: Some(existing.transaction_id.clone()),
            error: None,
        });
    }

    let record = TransactionRecord {
        reference: request.reference.clone(),
        transaction_id: format!("txn_{}", Uuid::new_v4()),
        payer_id: request.payer_id,
        plan_type: request.plan_type,
        canonical_amount: request.canonical_amount,
        settled: false,
        created_at: Utc::now(),
    };

    info!(
        reference = %record.reference,
        transaction_id = %record.transaction_id,
        "payment confirmed"
    );

    let transaction_id = record.transaction_id.clone();
    transactions.insert(record.reference.clone(), record);

    Json(ConfirmResponse {
        success: true,
        transaction_id: Some(transaction_id),
        error: None,
    })
}

/// Processor settlement webhook.
///
/// The payload is only trusted after its HMAC-SHA256 signature over the
/// raw body verifies against the shared webhook secret.
#[instrument(skip(state, headers, body))]
pub async fn processor_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let signature = headers
        .get("x-processor-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ErrorResponse::new("Missing signature header", 400))?;

    let expected = compute_hmac_sha256(&state.config.webhook_secret, &body);
    if !constant_time_compare(signature, &expected) {
        warn!("settlement webhook signature mismatch");
        return Err(ErrorResponse::new("Signature verification failed", 401));
    }

    let event: SettlementEvent = serde_json::from_slice(&body)
        .map_err(|e| ErrorResponse::new(format!("Malformed webhook payload: {e}"), 400))?;

    if event.event != "settlement.confirmed" {
        info!(event = %event.event, "ignoring non-settlement webhook event");
        return Ok(StatusCode::OK);
    }

    let mut transactions = state.transactions.write().await;
    match transactions.get_mut(&event.reference) {
        Some(record) => {
            record.settled = true;
            info!(reference = %event.reference, "transaction settled");
            Ok(StatusCode::OK)
        }
        None => {
            warn!(reference = %event.reference, "settlement for unknown reference");
            Err(ErrorResponse::new("Unknown reference", 404))
        }
    }
}

// =============================================================================
// Webhook Signature Verification
// =============================================================================

fn compute_hmac_sha256(secret: &str, message: &[u8]) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::create_router;
    use crate::state::ApiConfig;
    use axum_test::TestServer;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_state(processor_url: &str) -> AppState {
        AppState::new(ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            processor_token_url: format!("{processor_url}/client_token"),
            processor_order_url: processor_url.to_string(),
            merchant_id: "merchant-1".to_string(),
            merchant_secret: "s3cret".to_string(),
            webhook_secret: "whsec_test".to_string(),
        })
    }

    fn confirm_body(reference: &str, amount: f64) -> serde_json::Value {
        serde_json::json!({
            "reference": reference,
            "artifact": "nonce-raw",
            "canonical_amount": amount,
            "payer_id": "payer-1",
            "plan_type": "activation"
        })
    }

    #[tokio::test]
    async fn test_token_issuance_passes_through_credential() {
        let processor = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/client_token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "client_token": "tok-xyz" })),
            )
            .mount(&processor)
            .await;

        let server = TestServer::new(create_router(test_state(&processor.uri()))).unwrap();
        let response = server.post("/api/v1/gateway-token").await;

        response.assert_status_ok();
        response.assert_json(&serde_json::json!({ "client_token": "tok-xyz" }));
    }

    #[tokio::test]
    async fn test_token_issuance_upstream_failure() {
        let processor = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/client_token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&processor)
            .await;

        let server = TestServer::new(create_router(test_state(&processor.uri()))).unwrap();
        let response = server.post("/api/v1/gateway-token").await;

        response.assert_status(StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_create_order_round_trip() {
        let processor = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "bearer-1" })),
            )
            .mount(&processor)
            .await;

        Mock::given(method("POST"))
            .and(path("/v2/checkout/orders"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "ORDER-7",
                "status": "CREATED",
                "links": [
                    { "rel": "self", "href": "https://processor.example/orders/ORDER-7" },
                    { "rel": "approve", "href": "https://processor.example/approve/ORDER-7" }
                ]
            })))
            .mount(&processor)
            .await;

        let server = TestServer::new(create_router(test_state(&processor.uri()))).unwrap();
        let response = server
            .post("/api/v1/orders")
            .json(&serde_json::json!({
                "amount_minor_units": 1500,
                "currency": "USD",
                "payer_id": "payer-1"
            }))
            .await;

        response.assert_status_ok();
        response.assert_json(&serde_json::json!({
            "order_id": "ORDER-7",
            "status": "CREATED",
            "approval_url": "https://processor.example/approve/ORDER-7"
        }));
    }

    #[tokio::test]
    async fn test_create_order_rejects_unsupported_currency() {
        let server = TestServer::new(create_router(test_state("http://127.0.0.1:1"))).unwrap();
        let response = server
            .post("/api/v1/orders")
            .json(&serde_json::json!({
                "amount_minor_units": 1500,
                "currency": "XYZ",
                "payer_id": "payer-1"
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_confirmation_is_idempotent() {
        let state = test_state("http://127.0.0.1:1");
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let first: ConfirmResponse = server
            .post("/api/v1/confirm")
            .json(&confirm_body("ref-1", 15.00))
            .await
            .json();
        let second: ConfirmResponse = server
            .post("/api/v1/confirm")
            .json(&confirm_body("ref-1", 15.00))
            .await
            .json();

        assert!(first.success && second.success);
        // Replay resolves to the same transaction, credited once
        assert_eq!(first.transaction_id, second.transaction_id);
        assert_eq!(state.transactions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_confirmation_amount_divergence_rejected() {
        let server = TestServer::new(create_router(test_state("http://127.0.0.1:1"))).unwrap();

        let first: ConfirmResponse = server
            .post("/api/v1/confirm")
            .json(&confirm_body("ref-1", 15.00))
            .await
            .json();
        let second: ConfirmResponse = server
            .post("/api/v1/confirm")
            .json(&confirm_body("ref-1", 25.00))
            .await
            .json();

        assert!(first.success);
        assert!(!second.success);
        assert!(second.error.is_some());
    }

    #[tokio::test]
    async fn test_settlement_webhook_requires_valid_signature() {
        let state = test_state("http://127.0.0.1:1");
        let server = TestServer::new(create_router(state.clone())).unwrap();

        server
            .post("/api/v1/confirm")
            .json(&confirm_body("ref-1", 15.00))
            .await;

        let payload =
            serde_json::json!({ "reference": "ref-1", "event": "settlement.confirmed" })
                .to_string();
        let signature = compute_hmac_sha256("whsec_test", payload.as_bytes());

        let signature_header = axum::http::HeaderName::from_static("x-processor-signature");
        let response = server
            .post("/webhook/processor")
            .add_header(
                signature_header.clone(),
                axum::http::HeaderValue::from_str(&signature).unwrap(),
            )
            .bytes(payload.clone().into_bytes().into())
            .await;
        response.assert_status_ok();
        assert!(state.transactions.read().await["ref-1"].settled);

        let response = server
            .post("/webhook/processor")
            .add_header(
                signature_header,
                axum::http::HeaderValue::from_static("deadbeef"),
            )
            .bytes(payload.into_bytes().into())
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc123", "abc123"));
        assert!(!constant_time_compare("abc123", "abc124"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
