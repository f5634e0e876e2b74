//! # checkout-api
//!
//! The trusted backend boundary for lightning-checkout-rs. Merchant
//! secret material lives exclusively here; the browser-side pipelines in
//! `checkout-flow` only ever talk to these endpoints.

pub mod handlers;
pub mod routes;
pub mod state;
