//! # Widget Lifecycle Manager
//!
//! Owns the create/ready/teardown state machine for the processor-hosted
//! payment widget. At most one live widget handle exists per mount point:
//! a new initialization first releases any prior widget, and the mount
//! container is cleared before the SDK attaches (stale content from a
//! previous attempt makes SDKs error).
//!
//! Initialization failures are retried here with bounded exponential
//! backoff and surface to the caller only after the budget is exhausted.
//! An initialization future that the UI drops on unmount simply never
//! applies its result; calling [`WidgetLifecycleManager::teardown`]
//! afterwards clears the in-flight guard and the mount.

use crate::token::CredentialSource;
use checkout_core::{
    CheckoutError, CheckoutResult, MountPoint, PaymentArtifact, RetryPolicy, WidgetHandle,
    WidgetSdk,
};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Widget lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    Uninitialized,
    Initializing,
    Ready,
    TornDown,
}

impl std::fmt::Display for WidgetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WidgetState::Uninitialized => "uninitialized",
            WidgetState::Initializing => "initializing",
            WidgetState::Ready => "ready",
            WidgetState::TornDown => "torn_down",
        };
        write!(f, "{name}")
    }
}

/// Manages exactly one hosted widget bound to a UI mount point
pub struct WidgetLifecycleManager<S: WidgetSdk> {
    sdk: S,
    policy: RetryPolicy,
    creation_timeout: Duration,
    state: WidgetState,
    handle: Option<Box<dyn WidgetHandle>>,
    in_flight: bool,
    last_attempts: u32,
}

impl<S: WidgetSdk> WidgetLifecycleManager<S> {
    pub fn new(sdk: S) -> Self {
        Self {
            sdk,
            policy: RetryPolicy::default(),
            creation_timeout: Duration::from_secs(30),
            state: WidgetState::Uninitialized,
            handle: None,
            in_flight: false,
            last_attempts: 0,
        }
    }

    /// Builder: override the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builder: override the widget creation timeout
    pub fn with_creation_timeout(mut self, timeout: Duration) -> Self {
        self.creation_timeout = timeout;
        self
    }

    pub fn state(&self) -> WidgetState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == WidgetState::Ready && self.handle.is_some()
    }

    /// Automatic retries consumed by the most recent `initialize` call
    pub fn last_attempts(&self) -> u32 {
        self.last_attempts
    }

    /// Create the widget on the mount point, retrying with bounded
    /// backoff. A fresh credential is acquired for every attempt;
    /// credentials are single-use and never cached across attempts.
    #[instrument(skip_all, fields(mount = mount.container_id()))]
    pub async fn initialize(
        &mut self,
        credentials: &dyn CredentialSource,
        mount: &dyn MountPoint,
    ) -> CheckoutResult<()> {
        if self.in_flight {
            return Err(CheckoutError::WidgetInit {
                attempt: 0,
                message: "initialization already in flight for this mount point".to_string(),
            });
        }

        self.in_flight = true;
        let result = self.initialize_inner(credentials, mount).await;
        self.in_flight = false;
        result
    }

    async fn initialize_inner(
        &mut self,
        credentials: &dyn CredentialSource,
        mount: &dyn MountPoint,
    ) -> CheckoutResult<()> {
        // Exactly one live widget per mount point: release any prior
        // handle to completion before the new attach.
        self.release_handle().await;
        self.state = WidgetState::Initializing;

        let mut attempt: u32 = 0;
        loop {
            mount.clear();

            match self.try_create(credentials, mount, attempt).await {
                Ok(handle) => {
                    self.handle = Some(handle);
                    self.state = WidgetState::Ready;
                    self.last_attempts = attempt;
                    info!(attempts = attempt + 1, "widget ready");
                    return Ok(());
                }
                Err(err) if err.is_retryable() && self.policy.allows_retry(attempt) => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        error = %err,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "widget initialization failed, backing off"
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    self.state = WidgetState::Uninitialized;
                    self.last_attempts = attempt;
                    error!(error = %err, attempts = attempt + 1, "widget initialization exhausted");
                    return Err(err);
                }
            }
        }
    }

    async fn try_create(
        &self,
        credentials: &dyn CredentialSource,
        mount: &dyn MountPoint,
        attempt: u32,
    ) -> CheckoutResult<Box<dyn WidgetHandle>> {
        let credential = credentials.acquire().await?;

        match tokio::time::timeout(self.creation_timeout, self.sdk.create(credential, mount)).await
        {
            Ok(result) => result.map_err(|err| match err {
                CheckoutError::WidgetInit { message, .. } => {
                    CheckoutError::WidgetInit { attempt, message }
                }
                other => other,
            }),
            Err(_) => Err(CheckoutError::Timeout {
                operation: "widget creation".to_string(),
            }),
        }
    }

    /// Ask the ready widget for a payment artifact
    pub async fn request_artifact(&self) -> CheckoutResult<PaymentArtifact> {
        match &self.handle {
            Some(handle) => handle.request_payment_artifact().await,
            None => Err(CheckoutError::InvalidTransition {
                from: self.state.to_string(),
                to: "submitting".to_string(),
            }),
        }
    }

    /// Release the widget and leave the mount point empty.
    ///
    /// Idempotent and safe from any state; invoked unconditionally on UI
    /// unmount. A teardown failure inside the SDK is logged, never
    /// propagated.
    pub async fn teardown(&mut self, mount: &dyn MountPoint) {
        self.in_flight = false;
        self.release_handle().await;
        mount.clear();
        self.state = WidgetState::TornDown;
    }

    async fn release_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(err) = handle.teardown().await {
                warn!(error = %err, "widget teardown failed");
            }
        }
    }
}
