//! # Checkout Error Types
//!
//! Typed error handling for the lightning-checkout orchestration engine.
//! All checkout operations return `Result<T, CheckoutError>`.
//!
//! Every failure carries its full technical detail in `Display` for
//! diagnostics; the payer only ever sees the short text returned by
//! [`CheckoutError::user_message`].

use thiserror::Error;

/// Core error type for all checkout operations
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Client token could not be acquired from the trusted backend
    #[error("Token acquisition failed: {message}")]
    Token { message: String },

    /// Widget creation/initialization failed (retryable, bounded)
    #[error("Widget initialization failed on attempt {attempt}: {message}")]
    WidgetInit { attempt: u32, message: String },

    /// Payer has not completed the widget's required fields
    #[error("Payment details incomplete: {message}")]
    Validation { message: String },

    /// Processor rejected the payment
    #[error("Payment declined by processor: {reason}")]
    GatewayDeclined { reason: String },

    /// Redirect-order creation failed at the trusted backend
    #[error("Order creation failed: {message}")]
    OrderCreation { message: String },

    /// Capture after payer approval failed
    #[error("Order capture failed for {order_id}: {message}")]
    Capture { order_id: String, message: String },

    /// Backend confirmation endpoint rejected the artifact
    #[error("Payment confirmation failed: {message}")]
    Confirmation { message: String },

    /// Two different successful confirmations observed for one reference
    #[error(
        "Confirmation mismatch for reference {reference}: first transaction {first}, then {second}"
    )]
    ConfirmationMismatch {
        reference: String,
        first: String,
        second: String,
    },

    /// A bounded operation exceeded its deadline
    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },

    /// Payer cancelled: terminal outcome, not a failure
    #[error("Payment cancelled by payer")]
    Cancelled,

    /// Illegal session state transition (programming invariant)
    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Network/HTTP error communicating with a remote endpoint
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification of a checkout failure.
///
/// Drives both the automatic-retry decision and which payer-facing
/// message is shown. Retries apply only to widget initialization;
/// submission and confirmation are never retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient; safe to retry automatically up to the policy cap
    Retryable,
    /// The payer must act (fix input, retry explicitly, or they cancelled)
    UserActionable,
    /// No safe automatic recovery; direct the payer to support
    Fatal,
}

impl CheckoutError {
    /// Classify this error for retry and messaging decisions
    pub fn classify(&self) -> ErrorClass {
        match self {
            CheckoutError::WidgetInit { .. }
            | CheckoutError::Timeout { .. }
            | CheckoutError::Network(_) => ErrorClass::Retryable,
            CheckoutError::Validation { .. }
            | CheckoutError::GatewayDeclined { .. }
            | CheckoutError::Cancelled => ErrorClass::UserActionable,
            CheckoutError::Configuration(_)
            | CheckoutError::Token { .. }
            | CheckoutError::OrderCreation { .. }
            | CheckoutError::Capture { .. }
            | CheckoutError::Confirmation { .. }
            | CheckoutError::ConfirmationMismatch { .. }
            | CheckoutError::InvalidTransition { .. }
            | CheckoutError::Serialization(_) => ErrorClass::Fatal,
        }
    }

    /// Returns true if this error may be retried automatically
    pub fn is_retryable(&self) -> bool {
        self.classify() == ErrorClass::Retryable
    }

    /// The single concise message shown to the payer.
    ///
    /// Technical detail stays in `Display`; none of it leaks here.
    pub fn user_message(&self) -> &'static str {
        match self {
            CheckoutError::Validation { .. } => "Please fill in your payment information.",
            CheckoutError::GatewayDeclined { .. } => {
                "Your payment was declined. Please try another payment method."
            }
            CheckoutError::Cancelled => "Payment was cancelled.",
            CheckoutError::WidgetInit { .. } | CheckoutError::Timeout { .. } => {
                "The payment form could not be loaded. Please try again."
            }
            CheckoutError::Network(_) => {
                "A network problem interrupted the payment. Please try again."
            }
            CheckoutError::ConfirmationMismatch { .. } | CheckoutError::Confirmation { .. } => {
                "Your payment could not be confirmed. Please contact support before retrying."
            }
            _ => "Payment could not be completed. Please contact support.",
        }
    }
}

/// Result type alias for checkout operations
pub type CheckoutResult<T> = Result<T, CheckoutError>;
