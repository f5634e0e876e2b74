//! # Currency Types
//!
//! Settlement currencies, minor-unit conversion, and the versioned static
//! rate table used when the live conversion services are unreachable.
//!
//! Amounts sent to a processor are always minor-unit integers; the
//! canonical (USD, major-unit) amount is never transmitted directly.

use crate::error::{CheckoutError, CheckoutResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Version stamp shared by the compiled-in rate table and
/// `config/rates.toml`. A file with a different version is rejected so
/// the two copies cannot silently diverge.
pub const RATE_TABLE_VERSION: &str = "2025-02";

/// Supported settlement currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    JPY,
    CNY,
    INR,
    BRL,
    MXN,
    ZAR,
    NGN,
    KES,
    GHS,
    EGP,
    SGD,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
            Currency::JPY => "JPY",
            Currency::CNY => "CNY",
            Currency::INR => "INR",
            Currency::BRL => "BRL",
            Currency::MXN => "MXN",
            Currency::ZAR => "ZAR",
            Currency::NGN => "NGN",
            Currency::KES => "KES",
            Currency::GHS => "GHS",
            Currency::EGP => "EGP",
            Currency::SGD => "SGD",
        }
    }

    /// Parse an ISO 4217 code (case-insensitive)
    pub fn parse(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "CAD" => Some(Currency::CAD),
            "AUD" => Some(Currency::AUD),
            "JPY" => Some(Currency::JPY),
            "CNY" => Some(Currency::CNY),
            "INR" => Some(Currency::INR),
            "BRL" => Some(Currency::BRL),
            "MXN" => Some(Currency::MXN),
            "ZAR" => Some(Currency::ZAR),
            "NGN" => Some(Currency::NGN),
            "KES" => Some(Currency::KES),
            "GHS" => Some(Currency::GHS),
            "EGP" => Some(Currency::EGP),
            "SGD" => Some(Currency::SGD),
            _ => None,
        }
    }

    /// Returns the number of decimal places for this currency
    /// (JPY has 0 decimals, the rest of the supported set has 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Convert a major-unit amount to minor units (cents, kobo, pesewas),
    /// rounding half-up. Fractional minor units never reach a processor.
    pub fn to_minor_units(&self, major: f64) -> i64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (major * multiplier).round() as i64
    }

    /// Convert from minor units back to a major-unit amount
    pub fn from_minor_units(&self, minor: i64) -> f64 {
        let divisor = 10_f64.powi(self.decimal_places() as i32);
        minor as f64 / divisor
    }

    /// Currency symbol for display
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::CAD => "C$",
            Currency::AUD => "A$",
            Currency::JPY => "¥",
            Currency::CNY => "CN¥",
            Currency::INR => "₹",
            Currency::BRL => "R$",
            Currency::MXN => "MX$",
            Currency::ZAR => "R",
            Currency::NGN => "₦",
            Currency::KES => "KSh",
            Currency::GHS => "GH₵",
            Currency::EGP => "E£",
            Currency::SGD => "S$",
        }
    }

    /// Format a major-unit amount for display (e.g. "GH₵156.75")
    pub fn format(&self, major: f64) -> String {
        if self.decimal_places() == 0 {
            format!("{}{}", self.symbol(), major.round() as i64)
        } else {
            format!("{}{:.2}", self.symbol(), major)
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::USD
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static USD-base conversion rates, versioned.
///
/// This is the authoritative fallback when both live rate services fail;
/// conversion must never block checkout, so lookups are infallible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTable {
    pub version: String,
    rates: HashMap<Currency, f64>,
}

impl RateTable {
    /// The compiled-in table (rates as of February 2025)
    pub fn builtin() -> Self {
        let rates = [
            (Currency::USD, 1.0),
            (Currency::EUR, 0.9270),
            (Currency::GBP, 0.7530),
            (Currency::CAD, 1.4350),
            (Currency::AUD, 1.6180),
            (Currency::JPY, 156.20),
            (Currency::CNY, 7.2850),
            (Currency::INR, 85.40),
            (Currency::BRL, 6.1250),
            (Currency::MXN, 20.450),
            (Currency::ZAR, 18.750),
            (Currency::NGN, 1529.01),
            (Currency::KES, 129.85),
            (Currency::GHS, 10.45),
            (Currency::EGP, 49.850),
            (Currency::SGD, 1.3685),
        ]
        .into_iter()
        .collect();

        Self {
            version: RATE_TABLE_VERSION.to_string(),
            rates,
        }
    }

    /// Load a table from TOML, rejecting any version that differs from
    /// the compiled-in one.
    pub fn from_toml(toml_str: &str) -> CheckoutResult<Self> {
        let table: RateTable = toml::from_str(toml_str)
            .map_err(|e| CheckoutError::Configuration(format!("invalid rate table: {e}")))?;

        if table.version != RATE_TABLE_VERSION {
            return Err(CheckoutError::Configuration(format!(
                "rate table version {} does not match compiled version {}",
                table.version, RATE_TABLE_VERSION
            )));
        }

        Ok(table)
    }

    /// USD -> target conversion rate. Unknown entries fall back to 1.0
    /// rather than failing: conversion never blocks checkout.
    pub fn rate(&self, currency: Currency) -> f64 {
        if currency == Currency::USD {
            return 1.0;
        }
        self.rates.get(&currency).copied().unwrap_or(1.0)
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Map a payer-profile country code to its settlement currency
pub fn currency_for_country(country: &str) -> Option<Currency> {
    match country.to_ascii_uppercase().as_str() {
        "US" => Some(Currency::USD),
        "CA" => Some(Currency::CAD),
        "GB" => Some(Currency::GBP),
        "AU" => Some(Currency::AUD),
        "DE" | "FR" | "IT" | "ES" | "NL" | "BE" => Some(Currency::EUR),
        "JP" => Some(Currency::JPY),
        "CN" => Some(Currency::CNY),
        "IN" => Some(Currency::INR),
        "BR" => Some(Currency::BRL),
        "MX" => Some(Currency::MXN),
        "ZA" => Some(Currency::ZAR),
        "NG" => Some(Currency::NGN),
        "KE" => Some(Currency::KES),
        "GH" => Some(Currency::GHS),
        "EG" => Some(Currency::EGP),
        "SG" => Some(Currency::SGD),
        _ => None,
    }
}

/// Infer a country from a BCP 47 locale tag (e.g. "en-GB", "pt-BR")
pub fn country_for_locale(locale: &str) -> Option<&'static str> {
    let lower = locale.to_ascii_lowercase();
    if lower.starts_with("en-us") {
        Some("US")
    } else if lower.starts_with("en-ca") {
        Some("CA")
    } else if lower.starts_with("en-gb") {
        Some("GB")
    } else if lower.starts_with("en-au") {
        Some("AU")
    } else if lower.starts_with("de") {
        Some("DE")
    } else if lower.starts_with("fr") {
        Some("FR")
    } else if lower.starts_with("es") {
        Some("ES")
    } else if lower.starts_with("it") {
        Some("IT")
    } else if lower.starts_with("nl") {
        Some("NL")
    } else if lower.starts_with("ja") {
        Some("JP")
    } else if lower.starts_with("zh") {
        Some("CN")
    } else if lower.starts_with("pt") {
        Some("BR")
    } else {
        None
    }
}

/// Infer a settlement currency from an IANA timezone name.
/// Covers the markets the original gateway set supports directly.
pub fn currency_for_timezone(timezone: &str) -> Option<Currency> {
    match timezone {
        "Africa/Lagos" => Some(Currency::NGN),
        "Africa/Accra" => Some(Currency::GHS),
        "Africa/Johannesburg" => Some(Currency::ZAR),
        "Africa/Nairobi" => Some(Currency::KES),
        "Africa/Cairo" => Some(Currency::EGP),
        "Europe/London" => Some(Currency::GBP),
        "America/New_York" => Some(Currency::USD),
        _ => None,
    }
}

/// Hints available for resolving a payer's settlement currency
#[derive(Debug, Clone, Default)]
pub struct PayerLocale {
    /// Country code from the payer profile (highest precedence)
    pub country: Option<String>,
    /// Browser locale tag
    pub locale: Option<String>,
    /// IANA timezone
    pub timezone: Option<String>,
}

/// Resolve the settlement currency for a payer.
///
/// Resolution order: explicit profile country, then locale, then
/// timezone, then USD. Never fails.
pub fn resolve_currency(hints: &PayerLocale) -> Currency {
    if let Some(country) = hints.country.as_deref() {
        if let Some(currency) = currency_for_country(country) {
            return currency;
        }
    }
    if let Some(locale) = hints.locale.as_deref() {
        if let Some(currency) = country_for_locale(locale).and_then(currency_for_country) {
            return currency;
        }
    }
    if let Some(tz) = hints.timezone.as_deref() {
        if let Some(currency) = currency_for_timezone(tz) {
            return currency;
        }
    }
    Currency::USD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units_rounding() {
        assert_eq!(Currency::USD.to_minor_units(15.00), 1500);
        assert_eq!(Currency::USD.to_minor_units(0.125), 13); // half-up
        assert_eq!(Currency::JPY.to_minor_units(1000.0), 1000);
        assert_eq!(Currency::USD.from_minor_units(1099), 10.99);
    }

    #[test]
    fn test_localized_minor_units_from_rate_table() {
        let table = RateTable::builtin();

        let ghs = 15.00 * table.rate(Currency::GHS);
        assert_eq!(Currency::GHS.to_minor_units(ghs), 15675); // GH₵156.75

        let ngn = 15.00 * table.rate(Currency::NGN);
        assert_eq!(Currency::NGN.to_minor_units(ngn), 2293515); // ₦22,935.15
    }

    #[test]
    fn test_rate_table_version_check() {
        let good = r#"
version = "2025-02"

[rates]
NGN = 1529.01
GHS = 10.45
"#;
        let table = RateTable::from_toml(good).unwrap();
        assert_eq!(table.rate(Currency::NGN), 1529.01);
        assert_eq!(table.rate(Currency::USD), 1.0);

        let stale = r#"
version = "2024-11"

[rates]
NGN = 1600.0
"#;
        assert!(RateTable::from_toml(stale).is_err());
    }

    #[test]
    fn test_resolution_order() {
        // Profile country wins over everything else
        let hints = PayerLocale {
            country: Some("GH".into()),
            locale: Some("en-GB".into()),
            timezone: Some("Africa/Lagos".into()),
        };
        assert_eq!(resolve_currency(&hints), Currency::GHS);

        // Locale beats timezone
        let hints = PayerLocale {
            country: None,
            locale: Some("pt-BR".into()),
            timezone: Some("Africa/Nairobi".into()),
        };
        assert_eq!(resolve_currency(&hints), Currency::BRL);

        // Timezone heuristic as the last hint
        let hints = PayerLocale {
            country: None,
            locale: None,
            timezone: Some("Africa/Accra".into()),
        };
        assert_eq!(resolve_currency(&hints), Currency::GHS);

        // Unknown everything defaults to USD
        assert_eq!(resolve_currency(&PayerLocale::default()), Currency::USD);
    }

    #[test]
    fn test_format() {
        assert_eq!(Currency::GHS.format(156.75), "GH₵156.75");
        assert_eq!(Currency::JPY.format(2343.0), "¥2343");
    }
}
