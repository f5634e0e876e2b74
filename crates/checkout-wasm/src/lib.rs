//! # checkout-wasm
//!
//! WebAssembly bindings for lightning-checkout-rs.
//!
//! This crate exposes the browser-safe pieces of `checkout-core` to the
//! checkout UI:
//! - settlement currency resolution from payer hints
//! - minor-unit conversion and dual-currency display strings
//! - mount container validation
//!
//! No credential or merchant material crosses this boundary.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { resolve_settlement_currency, format_dual_currency } from 'lightning-checkout-wasm';
//!
//! await init();
//!
//! const currency = resolve_settlement_currency('GH', navigator.language, tz);
//! document.querySelector('#price').textContent = format_dual_currency(15.00, currency);
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use checkout_core::{resolve_currency, Currency, PayerLocale, RateTable};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Settlement amount as exposed to the UI layer
#[derive(Debug, Serialize)]
pub struct WasmLocalizedAmount {
    pub currency: String,
    pub rate: f64,
    pub major: f64,
    pub minor_units: i64,
}

/// Resolve the payer's settlement currency from profile hints.
/// Returns the ISO 4217 code; unresolvable hints fall back to "USD".
#[wasm_bindgen]
pub fn resolve_settlement_currency(
    country: Option<String>,
    locale: Option<String>,
    timezone: Option<String>,
) -> String {
    let hints = PayerLocale {
        country,
        locale,
        timezone,
    };
    resolve_currency(&hints).as_str().to_string()
}

/// Localize a canonical USD amount using the static rate table.
/// Returns `{ currency, rate, major, minor_units }`.
#[wasm_bindgen]
pub fn localize_amount(usd_major: f64, currency_code: &str) -> Result<JsValue, JsValue> {
    let currency = parse_currency(currency_code)?;
    let rate = RateTable::builtin().rate(currency);
    let major = usd_major * rate;

    let amount = WasmLocalizedAmount {
        currency: currency.as_str().to_string(),
        rate,
        major,
        minor_units: currency.to_minor_units(major),
    };

    serde_wasm_bindgen::to_value(&amount).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Convert a major-unit amount to minor units (half-up)
#[wasm_bindgen]
pub fn to_minor_units(major: f64, currency_code: &str) -> Result<i64, JsValue> {
    Ok(parse_currency(currency_code)?.to_minor_units(major))
}

/// Dual-currency display for a canonical USD amount,
/// e.g. `"$15.00 (GH₵156.75)"`. USD renders without the echo.
#[wasm_bindgen]
pub fn format_dual_currency(usd_major: f64, currency_code: &str) -> Result<String, JsValue> {
    let currency = parse_currency(currency_code)?;
    let usd_display = Currency::USD.format(usd_major);

    if currency == Currency::USD {
        return Ok(usd_display);
    }

    let rate = RateTable::builtin().rate(currency);
    Ok(format!(
        "{usd_display} ({})",
        currency.format(usd_major * rate)
    ))
}

/// Validate a widget mount container id
#[wasm_bindgen]
pub fn validate_mount_id(container_id: &str) -> bool {
    !container_id.is_empty()
        && container_id.len() <= 100
        && container_id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn parse_currency(code: &str) -> Result<Currency, JsValue> {
    Currency::parse(code)
        .ok_or_else(|| JsValue::from_str(&format!("Unsupported currency: {code}")))
}
