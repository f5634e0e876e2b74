//! # Exchange Rate Client
//!
//! USD-base conversion rates for settlement localization. A live rate
//! service is tried first, then a secondary live service, then the
//! versioned static table. Lookups are infallible: currency conversion
//! must never block checkout.

use checkout_core::{Currency, RateTable};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// How long live rates stay fresh
const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Per-request timeout for either live service
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

struct CachedRates {
    rates: HashMap<String, f64>,
    fetched_at: Instant,
}

/// Resolves USD -> settlement conversion rates
pub struct ExchangeRateClient {
    client: reqwest::Client,
    primary_url: String,
    fallback_url: String,
    table: RateTable,
    cache: RwLock<Option<CachedRates>>,
}

impl ExchangeRateClient {
    pub fn new(table: RateTable) -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            primary_url: "https://cdn.jsdelivr.net/gh/fawazahmed0/currency-api@1/latest/currencies"
                .to_string(),
            fallback_url: "https://api.exchangerate-api.com/v4/latest".to_string(),
            table,
            cache: RwLock::new(None),
        }
    }

    /// Builder: override the live service URLs (for testing)
    pub fn with_urls(
        mut self,
        primary_url: impl Into<String>,
        fallback_url: impl Into<String>,
    ) -> Self {
        self.primary_url = primary_url.into();
        self.fallback_url = fallback_url.into();
        self
    }

    /// USD -> target conversion rate. Never fails: on any live-service
    /// problem the versioned static table answers instead.
    #[instrument(skip(self))]
    pub async fn usd_rate(&self, currency: Currency) -> f64 {
        if currency == Currency::USD {
            return 1.0;
        }

        if let Some(rate) = self.cached_rate(currency).await {
            return rate;
        }

        match self.fetch_live_rates().await {
            Some(rates) => {
                let rate = rates
                    .get(currency.as_str())
                    .copied()
                    .unwrap_or_else(|| self.table.rate(currency));

                let mut cache = self.cache.write().await;
                *cache = Some(CachedRates {
                    rates,
                    fetched_at: Instant::now(),
                });

                rate
            }
            None => {
                warn!(
                    currency = %currency,
                    version = %self.table.version,
                    "live rate services unavailable, using static table"
                );
                self.table.rate(currency)
            }
        }
    }

    async fn cached_rate(&self, currency: Currency) -> Option<f64> {
        let cache = self.cache.read().await;
        let cached = cache.as_ref()?;
        if cached.fetched_at.elapsed() >= CACHE_TTL {
            return None;
        }
        cached.rates.get(currency.as_str()).copied()
    }

    async fn fetch_live_rates(&self) -> Option<HashMap<String, f64>> {
        if let Some(rates) = self.fetch_primary().await {
            return Some(rates);
        }
        self.fetch_fallback().await
    }

    /// Primary service: `GET {base}/usd.json` -> `{"usd": {"ghs": 10.45, ...}}`
    async fn fetch_primary(&self) -> Option<HashMap<String, f64>> {
        let url = format!("{}/usd.json", self.primary_url);

        let response = match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                warn!(status = %resp.status(), "primary rate service error");
                return None;
            }
            Err(err) => {
                warn!(error = %err, "primary rate service unreachable");
                return None;
            }
        };

        let body: serde_json::Value = response.json().await.ok()?;
        let rates = body.get("usd")?.as_object()?;

        debug!(count = rates.len(), "primary rate service responded");
        Some(uppercase_keys(rates))
    }

    /// Fallback service: `GET {base}/USD` -> `{"rates": {"GHS": 10.45, ...}}`
    async fn fetch_fallback(&self) -> Option<HashMap<String, f64>> {
        let url = format!("{}/USD", self.fallback_url);

        let response = match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            _ => {
                warn!("fallback rate service unreachable");
                return None;
            }
        };

        let body: serde_json::Value = response.json().await.ok()?;
        let rates = body.get("rates")?.as_object()?;

        debug!(count = rates.len(), "fallback rate service responded");
        Some(uppercase_keys(rates))
    }
}

/// Load the static rate table from `config/rates.toml`, falling back to
/// the compiled-in copy. The file must carry the same version as the
/// compiled table; a mismatched file is ignored, keeping a single
/// authoritative fallback source.
pub fn load_rate_table() -> RateTable {
    let config_paths = [
        "config/rates.toml",
        "../config/rates.toml",
        "../../config/rates.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            match RateTable::from_toml(&content) {
                Ok(table) => {
                    tracing::info!("Loaded rate table {} from {}", table.version, path);
                    return table;
                }
                Err(err) => {
                    warn!(error = %err, path, "ignoring invalid rate table file");
                }
            }
        }
    }

    RateTable::builtin()
}

fn uppercase_keys(map: &serde_json::Map<String, serde_json::Value>) -> HashMap<String, f64> {
    map.iter()
        .filter_map(|(code, value)| value.as_f64().map(|rate| (code.to_ascii_uppercase(), rate)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server_uri: &str) -> ExchangeRateClient {
        ExchangeRateClient::new(RateTable::builtin()).with_urls(
            format!("{server_uri}/primary"),
            format!("{server_uri}/fallback"),
        )
    }

    #[tokio::test]
    async fn test_primary_service_preferred() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/primary/usd.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "usd": { "ghs": 11.0, "ngn": 1600.0 }
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        assert_eq!(client.usd_rate(Currency::GHS).await, 11.0);
        // Second lookup is served from cache (expect(1) above)
        assert_eq!(client.usd_rate(Currency::NGN).await, 1600.0);
    }

    #[tokio::test]
    async fn test_fallback_service_on_primary_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/primary/usd.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/fallback/USD"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "rates": { "GHS": 10.8 } })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        assert_eq!(client.usd_rate(Currency::GHS).await, 10.8);
    }

    #[tokio::test]
    async fn test_static_table_when_both_services_fail() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        // Falls back to the February 2025 table without erroring
        assert_eq!(client.usd_rate(Currency::GHS).await, 10.45);
        assert_eq!(client.usd_rate(Currency::NGN).await, 1529.01);
    }

    #[test]
    fn test_load_rate_table_matches_compiled_version() {
        let table = load_rate_table();
        assert_eq!(table.version, checkout_core::RATE_TABLE_VERSION);
        assert_eq!(table.rate(Currency::GHS), 10.45);
    }

    #[tokio::test]
    async fn test_usd_short_circuits() {
        // No server at all: USD never touches the network
        let client = ExchangeRateClient::new(RateTable::builtin())
            .with_urls("http://127.0.0.1:1/primary", "http://127.0.0.1:1/fallback");
        assert_eq!(client.usd_rate(Currency::USD).await, 1.0);
    }
}
