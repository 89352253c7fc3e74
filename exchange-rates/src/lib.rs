//! Live Exchange Rate Provider
//!
//! Fetches the USD→EUR pair from an exchangerate-api style endpoint and applies
//! a fixed surcharge multiplier before handing the rate to the caller.
//!
//! The provider never falls back on its own: every failure (including a missing
//! credential) is reported as a [`RateFetchError`] so the caller's resolution
//! chain decides what to use instead.
//!
//! # Example
//! ```no_run
//! use exchange_rates::{ExchangeRateApi, RateProvider, RateSettings};
//!
//! # async fn run() -> Result<(), exchange_rates::RateFetchError> {
//! let api = ExchangeRateApi::new(
//!     "https://v6.exchangerate-api.com/v6",
//!     Some("my-key".to_string()),
//!     RateSettings::default(),
//! );
//! let rate = api.fetch_live().await?; // api rate × 1.006
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Multiplier applied to every live rate (0.6% margin).
pub const DEFAULT_SURCHARGE: f64 = 1.006;

/// Rate used when neither a live nor a cached rate is available.
pub const DEFAULT_FALLBACK_RATE: f64 = 0.86;

/// Upper bound on a single live fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default base URL of the rate source.
pub const DEFAULT_API_URL: &str = "https://v6.exchangerate-api.com/v6";

// ─────────────────────────────────────────────────────────────────────────────
// Currency
// ─────────────────────────────────────────────────────────────────────────────

/// Currencies the invoice deals in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    USD,
    EUR,
}

impl CurrencyCode {
    pub fn code(&self) -> &'static str {
        match self {
            CurrencyCode::USD => "USD",
            CurrencyCode::EUR => "EUR",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CurrencyCode::USD => "$",
            CurrencyCode::EUR => "€",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USD" => Ok(CurrencyCode::USD),
            "EUR" => Ok(CurrencyCode::EUR),
            _ => Err(format!("Unknown currency: {}", s)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors & Port
// ─────────────────────────────────────────────────────────────────────────────

/// Why a live rate could not be obtained.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RateFetchError {
    #[error("No exchange rate API key configured")]
    MissingCredential,

    #[error("Rate request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate source returned HTTP {0}")]
    Status(u16),

    #[error("Malformed rate response: {0}")]
    Malformed(String),

    #[error("Rate response is missing a usable conversion_rate")]
    MissingRate,
}

/// Port for live exchange rate sources.
#[async_trait::async_trait]
pub trait RateProvider: Send + Sync + 'static {
    /// Fetches today's base→quote rate with the surcharge already applied.
    async fn fetch_live(&self) -> Result<f64, RateFetchError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Tunables for rate handling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSettings {
    pub surcharge: f64,
    pub timeout: Duration,
}

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            surcharge: DEFAULT_SURCHARGE,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Applies the surcharge multiplier to a raw API rate.
pub fn apply_surcharge(raw_rate: f64, surcharge: f64) -> f64 {
    raw_rate * surcharge
}

// ─────────────────────────────────────────────────────────────────────────────
// exchangerate-api client
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PairResponse {
    conversion_rate: Option<f64>,
}

/// HTTP client for the `/{key}/pair/{base}/{quote}` endpoint.
pub struct ExchangeRateApi {
    base_url: String,
    api_key: Option<String>,
    base: CurrencyCode,
    quote: CurrencyCode,
    settings: RateSettings,
    http: reqwest::Client,
}

impl ExchangeRateApi {
    /// Creates a USD→EUR client. An empty key counts as not configured.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, settings: RateSettings) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base: CurrencyCode::USD,
            quote: CurrencyCode::EUR,
            settings,
            http: reqwest::Client::new(),
        }
    }

    pub fn settings(&self) -> &RateSettings {
        &self.settings
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn pair_url(&self, api_key: &str) -> String {
        format!(
            "{}/{}/pair/{}/{}",
            self.base_url, api_key, self.base, self.quote
        )
    }
}

#[async_trait::async_trait]
impl RateProvider for ExchangeRateApi {
    async fn fetch_live(&self) -> Result<f64, RateFetchError> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("No exchange rate API key configured, skipping live fetch");
            return Err(RateFetchError::MissingCredential);
        };

        let resp = self
            .http
            .get(self.pair_url(api_key))
            .timeout(self.settings.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RateFetchError::Timeout(self.settings.timeout)
                } else {
                    // The request URL embeds the API key.
                    RateFetchError::Network(e.without_url().to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RateFetchError::Status(status.as_u16()));
        }

        let body: PairResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                RateFetchError::Timeout(self.settings.timeout)
            } else {
                RateFetchError::Malformed(e.to_string())
            }
        })?;

        match body.conversion_rate {
            Some(raw) if raw.is_finite() && raw > 0.0 => {
                let rate = apply_surcharge(raw, self.settings.surcharge);
                tracing::debug!(raw, rate, "Fetched live exchange rate");
                Ok(rate)
            }
            _ => Err(RateFetchError::MissingRate),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use axum::{Json, Router, http::StatusCode, routing::get};

    /// Serves `router` on an ephemeral port and returns its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: &str, key: Option<&str>) -> ExchangeRateApi {
        ExchangeRateApi::new(base_url, key.map(String::from), RateSettings::default())
    }

    #[test]
    fn test_apply_surcharge() {
        assert_eq!(apply_surcharge(1.0, DEFAULT_SURCHARGE), 1.006);
        assert_eq!(apply_surcharge(0.9, DEFAULT_SURCHARGE), 0.9 * 1.006);
    }

    #[test]
    fn test_default_settings() {
        let settings = RateSettings::default();
        assert_eq!(settings.surcharge, 1.006);
        assert_eq!(DEFAULT_FALLBACK_RATE, 0.86);
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_currency_code_parse_and_display() {
        assert_eq!("usd".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!(CurrencyCode::EUR.to_string(), "EUR");
        assert_eq!(CurrencyCode::EUR.symbol(), "€");
        assert!("GBP".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_pair_url() {
        let api = client("http://rates.local/v6/", Some("k1"));
        assert_eq!(api.pair_url("k1"), "http://rates.local/v6/k1/pair/USD/EUR");
    }

    #[tokio::test]
    async fn test_missing_credential_fails_fast() {
        // Unroutable base: any network attempt would surface as Network, not MissingCredential.
        let api = client("http://127.0.0.1:9", None);
        assert_eq!(api.fetch_live().await, Err(RateFetchError::MissingCredential));

        let api = client("http://127.0.0.1:9", Some("   "));
        assert!(!api.has_credential());
        assert_eq!(api.fetch_live().await, Err(RateFetchError::MissingCredential));
    }

    #[tokio::test]
    async fn test_fetch_live_applies_surcharge() {
        let router = Router::new().route(
            "/v6/{key}/pair/USD/EUR",
            get(|| async { Json(serde_json::json!({ "result": "success", "conversion_rate": 0.92 })) }),
        );
        let base = serve(router).await;

        let rate = client(&format!("{}/v6", base), Some("secret"))
            .fetch_live()
            .await
            .unwrap();
        assert_eq!(rate, 0.92 * 1.006);
    }

    #[tokio::test]
    async fn test_fetch_live_non_2xx() {
        let router = Router::new().route(
            "/{key}/pair/USD/EUR",
            get(|| async { (StatusCode::FORBIDDEN, "invalid key") }),
        );
        let base = serve(router).await;

        let result = client(&base, Some("bad")).fetch_live().await;
        assert_eq!(result, Err(RateFetchError::Status(403)));
    }

    #[tokio::test]
    async fn test_fetch_live_missing_rate_field() {
        let router = Router::new().route(
            "/{key}/pair/USD/EUR",
            get(|| async { Json(serde_json::json!({ "result": "error" })) }),
        );
        let base = serve(router).await;

        let result = client(&base, Some("k")).fetch_live().await;
        assert_eq!(result, Err(RateFetchError::MissingRate));
    }

    #[tokio::test]
    async fn test_fetch_live_timeout() {
        let router = Router::new().route(
            "/{key}/pair/USD/EUR",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(serde_json::json!({ "conversion_rate": 1.0 }))
            }),
        );
        let base = serve(router).await;

        let settings = RateSettings {
            timeout: Duration::from_millis(100),
            ..RateSettings::default()
        };
        let api = ExchangeRateApi::new(base, Some("k".into()), settings);
        assert_eq!(
            api.fetch_live().await,
            Err(RateFetchError::Timeout(Duration::from_millis(100)))
        );
    }
}
