//! # checkout-core
//!
//! Core types and traits for the lightning-checkout orchestration engine.
//!
//! This crate provides:
//! - `PaymentSession` and the monotonic checkout state machine
//! - `Currency`, the versioned `RateTable`, and settlement resolution
//! - `RetryPolicy` for bounded widget-initialization backoff
//! - `CheckoutError` with retryable / user-actionable / fatal classification
//! - The injected SDK ports (`WidgetSdk`, `MountPoint`, `ApprovalDriver`)
//!   plus the single-use `TokenCredential` and `PaymentArtifact` types
//!
//! No I/O happens here; the remote pipelines live in `checkout-flow`.

pub mod currency;
pub mod error;
pub mod retry;
pub mod sdk;
pub mod session;

// Re-exports for convenience
pub use currency::{
    currency_for_country, currency_for_timezone, resolve_currency, Currency, PayerLocale,
    RateTable, RATE_TABLE_VERSION,
};
pub use error::{CheckoutError, CheckoutResult, ErrorClass};
pub use retry::{RetryPolicy, RetryState};
pub use sdk::{
    ApprovalDriver, ApprovalOutcome, ArtifactSource, MountPoint, PaymentArtifact, TokenCredential,
    WidgetHandle, WidgetSdk,
};
pub use session::{GatewayKind, LocalizedAmount, PaymentSession, SessionState};
