//! # Currency Localizer
//!
//! Turns the canonical USD amount of a checkout into the payer's
//! settlement currency and minor-unit amount.

use crate::rates::ExchangeRateClient;
use checkout_core::{resolve_currency, Currency, LocalizedAmount, PayerLocale};
use tracing::{debug, instrument};

/// Localizes canonical amounts for a payer
pub struct CurrencyLocalizer {
    rates: ExchangeRateClient,
}

impl CurrencyLocalizer {
    pub fn new(rates: ExchangeRateClient) -> Self {
        Self { rates }
    }

    /// Resolve the payer's settlement currency from profile hints.
    /// Falls back to USD; never fails.
    pub fn resolve(&self, hints: &PayerLocale) -> Currency {
        resolve_currency(hints)
    }

    /// Convert a canonical USD major-unit amount into the payer's
    /// settlement currency.
    ///
    /// The minor-unit amount is the only form ever sent to a processor.
    #[instrument(skip(self, hints))]
    pub async fn localize(&self, usd_major: f64, hints: &PayerLocale) -> LocalizedAmount {
        let currency = self.resolve(hints);
        self.localize_to(usd_major, currency).await
    }

    /// Convert a canonical USD amount into a specific currency
    pub async fn localize_to(&self, usd_major: f64, currency: Currency) -> LocalizedAmount {
        let rate = self.rates.usd_rate(currency).await;
        let major = usd_major * rate;
        let minor_units = currency.to_minor_units(major);

        debug!(
            %currency,
            rate,
            minor_units,
            "localized canonical amount {usd_major} USD"
        );

        LocalizedAmount {
            currency,
            rate,
            major,
            minor_units,
        }
    }
}
