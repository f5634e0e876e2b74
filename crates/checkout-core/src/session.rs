//! # Payment Session
//!
//! One [`PaymentSession`] per checkout attempt. The session is owned by
//! the coordinating caller; pipeline components return outcomes and only
//! the caller advances the state, which moves monotonically toward one
//! of the terminal states. A fresh attempt always means a fresh session;
//! ids are never reused.

use crate::currency::Currency;
use crate::error::{CheckoutError, CheckoutResult};
use crate::retry::RetryState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which pipeline applies for the chosen processor.
///
/// A closed enum: an unknown processor is unrepresentable, not a
/// runtime branch miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    /// Processor-hosted widget mounted into the page
    HostedWidget,
    /// Order-create / payer-approve / capture handshake
    RedirectOrder,
}

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Initializing,
    Ready,
    Submitting,
    Succeeded,
    Failed,
    Cancelled,
}

impl SessionState {
    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Succeeded | SessionState::Failed | SessionState::Cancelled
        )
    }

    fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        match (*self, next) {
            (Idle, Initializing) => true,
            (Initializing, Ready) => true,
            (Ready, Submitting) => true,
            (Submitting, Succeeded) => true,
            // Any non-terminal state may fail or be cancelled (unmount)
            (s, Failed) | (s, Cancelled) if !s.is_terminal() => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Initializing => "initializing",
            SessionState::Ready => "ready",
            SessionState::Submitting => "submitting",
            SessionState::Succeeded => "succeeded",
            SessionState::Failed => "failed",
            SessionState::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// The payer-currency amount computed by the currency localizer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalizedAmount {
    pub currency: Currency,
    /// USD -> settlement conversion rate applied
    pub rate: f64,
    /// Settlement amount in major units
    pub major: f64,
    /// Settlement amount in minor units, the only form a processor sees
    pub minor_units: i64,
}

/// One checkout attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    pub id: Uuid,
    pub gateway: GatewayKind,
    /// Major-unit amount in the canonical currency (USD)
    pub canonical_amount: f64,
    /// Set once the localizer has run
    pub settlement: Option<LocalizedAmount>,
    pub state: SessionState,
    pub retry: RetryState,
    pub payer_id: String,
    pub plan_type: String,
    pub created_at: DateTime<Utc>,
}

impl PaymentSession {
    pub fn new(
        gateway: GatewayKind,
        canonical_amount: f64,
        payer_id: impl Into<String>,
        plan_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            gateway,
            canonical_amount,
            settlement: None,
            state: SessionState::Idle,
            retry: RetryState::default(),
            payer_id: payer_id.into(),
            plan_type: plan_type.into(),
            created_at: Utc::now(),
        }
    }

    /// Advance the session state.
    ///
    /// Transitions are monotonic; an illegal move (e.g. `Submitting`
    /// back to `Initializing`) is a programming-invariant violation and
    /// returns [`CheckoutError::InvalidTransition`].
    pub fn advance(&mut self, next: SessionState) -> CheckoutResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(CheckoutError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
