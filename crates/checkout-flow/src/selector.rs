//! # Gateway Selector
//!
//! The thin coordinator over the whole checkout: picks the pipeline for
//! the session's `GatewayKind`, drives localization, initialization,
//! artifact collection, and confirmation, and is the only place that
//! advances `PaymentSession` state. Every component below it just
//! returns outcomes.

use crate::config::GatewayConfig;
use crate::coordinator::{OrderClient, PaymentRequestCoordinator, PendingOrder};
use crate::localizer::CurrencyLocalizer;
use crate::rates::{load_rate_table, ExchangeRateClient};
use crate::reconcile::ReconciliationClient;
use crate::token::{CredentialSource, TokenClient};
use crate::widget::WidgetLifecycleManager;
use checkout_core::{
    ApprovalDriver, CheckoutError, CheckoutResult, GatewayKind, MountPoint, PayerLocale,
    PaymentSession, SessionState, WidgetSdk,
};
use tracing::{error, info, instrument, warn};

/// Terminal result of a checkout attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Succeeded {
        transaction_id: String,
    },
    Failed {
        /// The single payer-facing message
        message: String,
        /// Full technical detail, for diagnostics only
        detail: String,
    },
    Cancelled,
}

/// Coordinates one of the two processor pipelines for a session
pub struct GatewaySelector<S: WidgetSdk> {
    localizer: CurrencyLocalizer,
    credentials: Box<dyn CredentialSource>,
    widget: WidgetLifecycleManager<S>,
    orders: OrderClient,
    approval: Box<dyn ApprovalDriver>,
    reconciliation: ReconciliationClient,
    pending_order: Option<PendingOrder>,
}

impl<S: WidgetSdk> GatewaySelector<S> {
    pub fn new(
        localizer: CurrencyLocalizer,
        credentials: Box<dyn CredentialSource>,
        widget: WidgetLifecycleManager<S>,
        orders: OrderClient,
        approval: Box<dyn ApprovalDriver>,
        reconciliation: ReconciliationClient,
    ) -> Self {
        Self {
            localizer,
            credentials,
            widget,
            orders,
            approval,
            reconciliation,
            pending_order: None,
        }
    }

    /// Wire the full pipeline against the trusted backend named by the
    /// gateway configuration. The widget SDK and approval driver stay
    /// injected; everything else talks to `config.backend_base_url`.
    pub fn from_config(config: &GatewayConfig, sdk: S, approval: Box<dyn ApprovalDriver>) -> Self {
        Self::new(
            CurrencyLocalizer::new(ExchangeRateClient::new(load_rate_table())),
            Box::new(TokenClient::new(config.backend_base_url.clone())),
            WidgetLifecycleManager::new(sdk),
            OrderClient::new(config.backend_base_url.clone()),
            approval,
            ReconciliationClient::new(config.backend_base_url.clone()),
        )
    }

    /// Take the session from `Idle` to `Ready`: localize the amount,
    /// then initialize the widget (hosted) or create the order
    /// (redirect). Initialization retries happen inside the lifecycle
    /// manager; an error here means the budget is already exhausted.
    #[instrument(skip_all, fields(session = %session.id, gateway = ?session.gateway))]
    pub async fn prepare(
        &mut self,
        session: &mut PaymentSession,
        mount: &dyn MountPoint,
        hints: &PayerLocale,
    ) -> CheckoutResult<()> {
        session.advance(SessionState::Initializing)?;

        let settlement = self
            .localizer
            .localize(session.canonical_amount, hints)
            .await;
        info!(
            currency = %settlement.currency,
            minor_units = settlement.minor_units,
            "amount localized"
        );
        session.settlement = Some(settlement);

        match session.gateway {
            GatewayKind::HostedWidget => {
                let result = self
                    .widget
                    .initialize(self.credentials.as_ref(), mount)
                    .await;
                session.retry.attempt = self.widget.last_attempts();
                result?;
                session.retry.reset();
            }
            GatewayKind::RedirectOrder => {
                let pending = self
                    .orders
                    .create_order(&settlement, &session.payer_id)
                    .await?;
                self.pending_order = Some(pending);
            }
        }

        session.advance(SessionState::Ready)
    }

    /// Take a `Ready` session to a terminal state.
    ///
    /// `Ok(outcome)` is always terminal. `Err(Validation)` is the one
    /// non-terminal exit: the payer has not completed the widget's
    /// required fields, the session stays `Ready`, and an explicit
    /// resubmit is required.
    #[instrument(skip_all, fields(session = %session.id))]
    pub async fn submit(
        &mut self,
        session: &mut PaymentSession,
    ) -> CheckoutResult<CheckoutOutcome> {
        let artifact = match session.gateway {
            GatewayKind::HostedWidget => {
                let artifact = match PaymentRequestCoordinator::request_artifact(&self.widget).await
                {
                    Ok(artifact) => artifact,
                    Err(err @ CheckoutError::Validation { .. }) => {
                        // Payer must act; the widget stays live
                        warn!(error = %err, "artifact request needs payer action");
                        return Err(err);
                    }
                    Err(err) => return Ok(self.fail(session, err)),
                };
                session.advance(SessionState::Submitting)?;
                artifact
            }
            GatewayKind::RedirectOrder => {
                let order = self.pending_order.take().ok_or_else(|| {
                    CheckoutError::InvalidTransition {
                        from: session.state.to_string(),
                        to: "submitting".to_string(),
                    }
                })?;
                session.advance(SessionState::Submitting)?;

                match PaymentRequestCoordinator::approve_and_capture(
                    self.approval.as_ref(),
                    &order,
                )
                .await
                {
                    Ok(artifact) => artifact,
                    Err(CheckoutError::Cancelled) => {
                        // Terminal by payer choice; no confirmation call
                        session.advance(SessionState::Cancelled)?;
                        return Ok(CheckoutOutcome::Cancelled);
                    }
                    Err(err) => return Ok(self.fail(session, err)),
                }
            }
        };

        match self.reconciliation.confirm(artifact, session).await {
            Ok(confirmation) => {
                session.advance(SessionState::Succeeded)?;
                info!(transaction_id = %confirmation.transaction_id, "checkout succeeded");
                Ok(CheckoutOutcome::Succeeded {
                    transaction_id: confirmation.transaction_id,
                })
            }
            // Never auto-retried: the artifact is spent and money may
            // have moved at the processor
            Err(err) => Ok(self.fail(session, err)),
        }
    }

    /// One-shot convenience: prepare then submit
    pub async fn checkout(
        &mut self,
        session: &mut PaymentSession,
        mount: &dyn MountPoint,
        hints: &PayerLocale,
    ) -> CheckoutResult<CheckoutOutcome> {
        if let Err(err) = self.prepare(session, mount, hints).await {
            return Ok(self.fail(session, err));
        }
        self.submit(session).await
    }

    /// Unconditional cleanup for UI unmount: tear the widget down and
    /// cancel the session if it has not already reached a terminal
    /// state.
    pub async fn abandon(&mut self, session: &mut PaymentSession, mount: &dyn MountPoint) {
        self.widget.teardown(mount).await;
        self.pending_order = None;
        if !session.is_terminal() {
            // Cancelled is reachable from every live state
            let _ = session.advance(SessionState::Cancelled);
        }
    }

    fn fail(&self, session: &mut PaymentSession, err: CheckoutError) -> CheckoutOutcome {
        error!(
            class = ?err.classify(),
            detail = %err,
            "checkout failed"
        );
        if !session.is_terminal() {
            if let Err(transition_err) = session.advance(SessionState::Failed) {
                error!(error = %transition_err, "could not mark session failed");
            }
        }
        CheckoutOutcome::Failed {
            message: err.user_message().to_string(),
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::ExchangeRateClient;
    use async_trait::async_trait;
    use checkout_core::{
        ApprovalOutcome, PaymentArtifact, RateTable, RetryPolicy, TokenCredential, WidgetHandle,
    };
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StaticMount;

    impl MountPoint for StaticMount {
        fn container_id(&self) -> &str {
            "checkout-container"
        }
        fn clear(&self) {}
    }

    struct FakeHandle {
        validation_failures: Arc<AtomicU32>,
    }

    #[async_trait]
    impl WidgetHandle for FakeHandle {
        async fn request_payment_artifact(&self) -> CheckoutResult<PaymentArtifact> {
            if self.validation_failures.load(Ordering::SeqCst) > 0 {
                self.validation_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(CheckoutError::Validation {
                    message: "no payment method selected".to_string(),
                });
            }
            Ok(PaymentArtifact::widget_nonce("nonce-1"))
        }

        async fn teardown(&mut self) -> CheckoutResult<()> {
            Ok(())
        }
    }

    struct FakeSdk {
        failures_before_success: u32,
        creates: AtomicU32,
        validation_failures: Arc<AtomicU32>,
    }

    impl FakeSdk {
        fn reliable() -> Self {
            Self {
                failures_before_success: 0,
                creates: AtomicU32::new(0),
                validation_failures: Arc::new(AtomicU32::new(0)),
            }
        }

        fn broken() -> Self {
            Self {
                failures_before_success: u32::MAX,
                creates: AtomicU32::new(0),
                validation_failures: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    #[async_trait]
    impl WidgetSdk for FakeSdk {
        async fn create(
            &self,
            _credential: TokenCredential,
            _mount: &dyn MountPoint,
        ) -> CheckoutResult<Box<dyn WidgetHandle>> {
            let n = self.creates.fetch_add(1, Ordering::SeqCst);
            if n < self.failures_before_success {
                return Err(CheckoutError::WidgetInit {
                    attempt: 0,
                    message: "sdk attach failed".to_string(),
                });
            }
            Ok(Box::new(FakeHandle {
                validation_failures: Arc::clone(&self.validation_failures),
            }))
        }
    }

    struct ScriptedApproval {
        outcome: ApprovalOutcome,
    }

    #[async_trait]
    impl ApprovalDriver for ScriptedApproval {
        async fn await_approval(&self, _order_id: &str) -> ApprovalOutcome {
            self.outcome.clone()
        }

        async fn capture_order(&self, order_id: &str) -> CheckoutResult<String> {
            Ok(format!("capture-{order_id}"))
        }
    }

    async fn mock_backend(server: &MockServer, confirm_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/api/v1/gateway-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "client_token": "tok-123" })),
            )
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/v1/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "order_id": "ORDER-1", "status": "CREATED"
            })))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/v1/confirm"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true, "transaction_id": "txn-1"
            })))
            .expect(confirm_calls)
            .mount(server)
            .await;
    }

    fn selector(
        base_url: &str,
        sdk: FakeSdk,
        approval: ApprovalOutcome,
    ) -> GatewaySelector<FakeSdk> {
        let rates = ExchangeRateClient::new(RateTable::builtin())
            .with_urls("http://127.0.0.1:1/primary", "http://127.0.0.1:1/fallback");
        let widget = WidgetLifecycleManager::new(sdk).with_policy(RetryPolicy::new(
            3,
            Duration::from_millis(1),
            Duration::from_millis(5),
        ));

        GatewaySelector::new(
            CurrencyLocalizer::new(rates),
            Box::new(crate::token::TokenClient::new(base_url)),
            widget,
            OrderClient::new(base_url),
            Box::new(ScriptedApproval { outcome: approval }),
            ReconciliationClient::new(base_url),
        )
    }

    fn hosted_session() -> PaymentSession {
        PaymentSession::new(GatewayKind::HostedWidget, 15.00, "payer-1", "activation")
    }

    #[tokio::test]
    async fn test_hosted_widget_happy_path() {
        let server = MockServer::start().await;
        mock_backend(&server, 1).await;

        let mut selector = selector(&server.uri(), FakeSdk::reliable(), ApprovalOutcome::Approved);
        let mut session = hosted_session();

        let outcome = selector
            .checkout(&mut session, &StaticMount, &PayerLocale::default())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CheckoutOutcome::Succeeded {
                transaction_id: "txn-1".into()
            }
        );
        assert_eq!(session.state, SessionState::Succeeded);

        // USD at rate 1: $15.00 -> 1500 minor units
        let settlement = session.settlement.unwrap();
        assert_eq!(settlement.minor_units, 1500);
        assert_eq!(settlement.rate, 1.0);
        // First-attempt initialization left no retry debt
        assert_eq!(session.retry.attempt, 0);
    }

    #[tokio::test]
    async fn test_redirect_cancel_makes_no_confirmation_call() {
        let server = MockServer::start().await;
        mock_backend(&server, 0).await; // confirm must never be hit

        let mut selector = selector(&server.uri(), FakeSdk::reliable(), ApprovalOutcome::Cancelled);
        let mut session =
            PaymentSession::new(GatewayKind::RedirectOrder, 15.00, "payer-1", "activation");

        let outcome = selector
            .checkout(&mut session, &StaticMount, &PayerLocale::default())
            .await
            .unwrap();

        assert_eq!(outcome, CheckoutOutcome::Cancelled);
        assert_eq!(session.state, SessionState::Cancelled);
    }

    #[tokio::test]
    async fn test_redirect_approval_and_capture() {
        let server = MockServer::start().await;
        mock_backend(&server, 1).await;

        let mut selector = selector(&server.uri(), FakeSdk::reliable(), ApprovalOutcome::Approved);
        let mut session =
            PaymentSession::new(GatewayKind::RedirectOrder, 15.00, "payer-1", "activation");

        let outcome = selector
            .checkout(&mut session, &StaticMount, &PayerLocale::default())
            .await
            .unwrap();

        assert!(matches!(outcome, CheckoutOutcome::Succeeded { .. }));
    }

    #[tokio::test]
    async fn test_exhausted_initialization_fails_terminally() {
        let server = MockServer::start().await;
        mock_backend(&server, 0).await;

        let mut selector = selector(&server.uri(), FakeSdk::broken(), ApprovalOutcome::Approved);
        let mut session = hosted_session();

        let outcome = selector
            .checkout(&mut session, &StaticMount, &PayerLocale::default())
            .await
            .unwrap();

        match outcome {
            CheckoutOutcome::Failed { message, detail } => {
                // Payer sees the concise message, not SDK internals
                assert!(!message.contains("sdk attach failed"));
                assert!(detail.contains("sdk attach failed"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(session.state, SessionState::Failed);
        // The retry budget was consumed, never exceeded
        assert_eq!(session.retry.attempt, 3);
    }

    #[tokio::test]
    async fn test_validation_failure_keeps_session_ready() {
        let server = MockServer::start().await;
        mock_backend(&server, 1).await;

        let sdk = FakeSdk::reliable();
        sdk.validation_failures.store(1, Ordering::SeqCst);

        let mut selector = selector(&server.uri(), sdk, ApprovalOutcome::Approved);
        let mut session = hosted_session();

        selector
            .prepare(&mut session, &StaticMount, &PayerLocale::default())
            .await
            .unwrap();

        // Incomplete payer input: non-terminal, session stays Ready
        let err = selector.submit(&mut session).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation { .. }));
        assert_eq!(session.state, SessionState::Ready);

        // Explicit payer resubmission succeeds on the same session
        let outcome = selector.submit(&mut session).await.unwrap();
        assert!(matches!(outcome, CheckoutOutcome::Succeeded { .. }));
        assert_eq!(session.state, SessionState::Succeeded);
    }

    #[tokio::test]
    async fn test_abandon_cancels_live_session() {
        let server = MockServer::start().await;
        mock_backend(&server, 0).await;

        let mut selector = selector(&server.uri(), FakeSdk::reliable(), ApprovalOutcome::Approved);
        let mut session = hosted_session();

        selector
            .prepare(&mut session, &StaticMount, &PayerLocale::default())
            .await
            .unwrap();
        selector.abandon(&mut session, &StaticMount).await;

        assert_eq!(session.state, SessionState::Cancelled);
        assert!(!selector.widget.is_ready());
    }
}
