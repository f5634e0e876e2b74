//! # checkout-flow
//!
//! The payment orchestration pipelines for lightning-checkout-rs.
//!
//! This crate provides:
//! - `CurrencyLocalizer` / `ExchangeRateClient` for settlement localization
//!   with live rates and a versioned static fallback
//! - `TokenClient` for widget credential acquisition from the trusted backend
//! - `WidgetLifecycleManager` for the create/ready/teardown state machine
//!   with bounded retry for the hosted widget
//! - `PaymentRequestCoordinator` / `OrderClient` for artifact collection in
//!   both the hosted-widget and redirect-order protocols
//! - `ReconciliationClient` for idempotent backend confirmation
//! - `GatewaySelector`, the coordinator that drives a `PaymentSession`
//!   end to end
//!
//! ## Example
//!
//! ```rust,ignore
//! use checkout_core::{GatewayKind, PayerLocale, PaymentSession};
//! use checkout_flow::{CheckoutOutcome, GatewaySelector};
//!
//! let mut session = PaymentSession::new(GatewayKind::HostedWidget, 15.00, payer_id, "activation");
//!
//! match selector.checkout(&mut session, &mount, &hints).await? {
//!     CheckoutOutcome::Succeeded { transaction_id } => mark_paid(transaction_id),
//!     CheckoutOutcome::Failed { message, .. } => show(message),
//!     CheckoutOutcome::Cancelled => (),
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod localizer;
pub mod rates;
pub mod reconcile;
pub mod selector;
pub mod token;
pub mod widget;

// Re-exports for convenience
pub use config::{Environment, GatewayConfig};
pub use coordinator::{OrderClient, PaymentRequestCoordinator, PendingOrder};
pub use localizer::CurrencyLocalizer;
pub use rates::{load_rate_table, ExchangeRateClient};
pub use reconcile::{Confirmation, ReconciliationClient};
pub use selector::{CheckoutOutcome, GatewaySelector};
pub use token::{CredentialSource, TokenClient};
pub use widget::{WidgetLifecycleManager, WidgetState};
