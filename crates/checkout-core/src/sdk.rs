//! # Processor SDK Ports
//!
//! The processor's widget and approval UI are injected behind these
//! traits. The orchestration core never touches an ambient global SDK
//! object, so a fake implementation satisfies the same interface in
//! tests.

use crate::error::CheckoutResult;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Short-lived widget authorization credential.
///
/// Single-use: acquired fresh for every initialization attempt and
/// consumed by value when the widget is created. Holds the transport
/// encoding the widget SDK expects. Never persisted, never serialized,
/// and `Debug` is redacted so it cannot leak into logs.
pub struct TokenCredential {
    encoded: String,
}

impl TokenCredential {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self {
            encoded: encoded.into(),
        }
    }

    /// The opaque encoded string handed to the widget SDK
    pub fn transport(&self) -> &str {
        &self.encoded
    }
}

impl std::fmt::Debug for TokenCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenCredential(****)")
    }
}

/// Where a payment artifact came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Nonce returned by a ready hosted widget
    WidgetNonce,
    /// Order id of a captured redirect-flow order
    CapturedOrder,
}

/// Single-use reference representing payer consent to charge.
///
/// Exactly one artifact exists per successful submission; it is consumed
/// by value when handed to the reconciliation client, so it cannot be
/// submitted twice from safe code.
pub struct PaymentArtifact {
    value: String,
    source: ArtifactSource,
}

impl PaymentArtifact {
    pub fn widget_nonce(nonce: impl Into<String>) -> Self {
        Self {
            value: nonce.into(),
            source: ArtifactSource::WidgetNonce,
        }
    }

    pub fn captured_order(order_id: impl Into<String>) -> Self {
        Self {
            value: order_id.into(),
            source: ArtifactSource::CapturedOrder,
        }
    }

    pub fn source(&self) -> ArtifactSource {
        self.source
    }

    /// The unique confirmation reference derived from this artifact.
    ///
    /// Both sides of the confirmation exchange can derive it, and it can
    /// appear in logs without exposing the raw nonce.
    pub fn reference(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.value.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Consume the artifact, yielding the raw value for transmission
    pub fn into_value(self) -> String {
        self.value
    }
}

impl std::fmt::Debug for PaymentArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PaymentArtifact({:?}, ref={})",
            self.source,
            &self.reference()[..12]
        )
    }
}

/// The single empty container element the UI layer provides.
///
/// The core's only obligation back to the UI is to leave the container
/// empty on teardown and populated only while a widget is live.
pub trait MountPoint: Send + Sync {
    /// Identifier of the container element
    fn container_id(&self) -> &str;

    /// Remove all prior content. Stale content from a previous attempt
    /// causes widget SDKs to error during attach.
    fn clear(&self);
}

/// A live widget bound to a mount point
#[async_trait]
pub trait WidgetHandle: Send {
    /// Ask the widget to validate payer input and return a payment
    /// artifact. Incomplete input is a `Validation` error: the payer
    /// must act, and it is never retried automatically.
    async fn request_payment_artifact(&self) -> CheckoutResult<PaymentArtifact>;

    /// Release the widget. Idempotent; must leave the mount point empty.
    async fn teardown(&mut self) -> CheckoutResult<()>;
}

/// Factory port for the processor's hosted widget SDK
#[async_trait]
pub trait WidgetSdk: Send + Sync {
    /// Create a widget bound to the mount point. Consumes the
    /// credential: one credential, one creation attempt.
    async fn create(
        &self,
        credential: TokenCredential,
        mount: &dyn MountPoint,
    ) -> CheckoutResult<Box<dyn WidgetHandle>>;
}

/// Outcome of the payer-approval step of a redirect-order flow.
/// The approval UI itself belongs to the external processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    Approved,
    /// Payer backed out. A terminal `Cancelled`, not a failure
    Cancelled,
    Failed(String),
}

/// Port over the processor's own client library for redirect-style
/// flows: the payer-approval UI and the capture that finalizes an
/// approved order.
#[async_trait]
pub trait ApprovalDriver: Send + Sync {
    async fn await_approval(&self, order_id: &str) -> ApprovalOutcome;

    /// Finalize an approved order. Returns the capture id.
    async fn capture_order(&self, order_id: &str) -> CheckoutResult<String>;
}
