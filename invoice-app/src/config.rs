//! Configuration loading from environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use chrono::NaiveTime;

use exchange_rates::{DEFAULT_API_URL, DEFAULT_FALLBACK_RATE, DEFAULT_SURCHARGE};
use invoice_hex::outbound::{BillingProfile, DEFAULT_TELEGRAM_API, Envelope, Party};

/// Invoice content and numbering.
pub struct InvoiceSettings {
    pub start_number: u64,
    pub amount_usd: f64,
    pub tax_rate: f64,
    pub description: String,
}

pub struct ExchangeRateSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub surcharge: f64,
    pub fallback_rate: f64,
}

pub struct MailSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub envelope: Envelope,
}

pub struct TelegramSettings {
    pub api_url: String,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

/// Local times of the two monthly jobs.
pub struct ScheduleSettings {
    pub invoice_at: NaiveTime,
    pub precache_at: NaiveTime,
}

/// Application configuration.
pub struct Config {
    pub port: u16,
    pub app_env: String,
    pub data_dir: PathBuf,
    pub invoice: InvoiceSettings,
    pub company: Party,
    pub client: Party,
    pub exchange_rate: ExchangeRateSettings,
    pub mail: MailSettings,
    pub telegram: TelegramSettings,
    pub trigger_token: Option<String>,
    pub schedule: ScheduleSettings,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let vars = Vars(&get);

        let invoice = InvoiceSettings {
            start_number: vars.parse("INVOICE_START_NUMBER", 1000)?,
            amount_usd: vars.parse("INVOICE_AMOUNT_USD", 1000.0)?,
            tax_rate: vars.parse("INVOICE_TAX_RATE", 0.0)?,
            description: vars.text("INVOICE_DESCRIPTION", "Monthly Service"),
        };
        anyhow::ensure!(
            invoice.amount_usd.is_finite() && invoice.amount_usd > 0.0,
            "INVOICE_AMOUNT_USD must be positive, got {}",
            invoice.amount_usd
        );
        anyhow::ensure!(
            invoice.tax_rate.is_finite() && invoice.tax_rate >= 0.0,
            "INVOICE_TAX_RATE must not be negative, got {}",
            invoice.tax_rate
        );

        let exchange_rate = ExchangeRateSettings {
            api_url: vars.text("EXCHANGE_RATE_API_URL", DEFAULT_API_URL),
            api_key: vars.optional("EXCHANGE_RATE_API_KEY"),
            surcharge: vars.parse("EXCHANGE_RATE_SURCHARGE", DEFAULT_SURCHARGE)?,
            fallback_rate: vars.parse("EXCHANGE_RATE_FALLBACK", DEFAULT_FALLBACK_RATE)?,
        };
        for (key, value) in [
            ("EXCHANGE_RATE_SURCHARGE", exchange_rate.surcharge),
            ("EXCHANGE_RATE_FALLBACK", exchange_rate.fallback_rate),
        ] {
            anyhow::ensure!(
                value.is_finite() && value > 0.0,
                "{} must be positive, got {}",
                key,
                value
            );
        }

        Ok(Self {
            port: vars.parse("PORT", 3000)?,
            app_env: vars.text("APP_ENV", "development"),
            data_dir: PathBuf::from(vars.text("DATA_DIR", "data")),
            invoice,
            company: Party {
                name: vars.text("COMPANY_NAME", "Your Company"),
                address: vars.text("COMPANY_ADDRESS", ""),
                city: vars.text("COMPANY_CITY", ""),
                email: vars.text("COMPANY_EMAIL", ""),
                phone: vars.text("COMPANY_PHONE", ""),
                contact: String::new(),
            },
            client: Party {
                name: vars.text("CLIENT_NAME", "Client Company"),
                address: vars.text("CLIENT_ADDRESS", ""),
                city: vars.text("CLIENT_CITY", ""),
                email: vars.text("CLIENT_EMAIL", ""),
                phone: String::new(),
                contact: vars.text("CLIENT_CONTACT", ""),
            },
            exchange_rate,
            mail: MailSettings {
                api_url: vars.text("MAIL_API_URL", ""),
                api_key: vars.optional("MAIL_API_KEY"),
                envelope: Envelope {
                    from: vars.text("EMAIL_FROM", ""),
                    to: vars.list("EMAIL_TO"),
                    cc: vars.list("EMAIL_CC"),
                },
            },
            telegram: TelegramSettings {
                api_url: vars.text("TELEGRAM_API_URL", DEFAULT_TELEGRAM_API),
                bot_token: vars.optional("TELEGRAM_BOT_TOKEN"),
                chat_id: vars.optional("TELEGRAM_CHAT_ID"),
            },
            trigger_token: vars.optional("TRIGGER_TOKEN"),
            schedule: ScheduleSettings {
                invoice_at: vars.time("INVOICE_RUN_AT", "09:00")?,
                precache_at: vars.time("PRECACHE_RUN_AT", "08:00")?,
            },
            otlp_endpoint: vars.optional("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn billing_profile(&self) -> BillingProfile {
        BillingProfile {
            company: self.company.clone(),
            client: self.client.clone(),
            description: self.invoice.description.clone(),
            tax_rate: self.invoice.tax_rate,
        }
    }

    /// Rendered invoices live next to the state files.
    pub fn invoice_dir(&self) -> PathBuf {
        self.data_dir.join("invoices")
    }
}

/// Typed accessors over a key lookup. Blank values count as unset.
struct Vars<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn text(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.optional(key) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
            None => Ok(default),
        }
    }

    fn time(&self, key: &str, default: &str) -> anyhow::Result<NaiveTime> {
        let raw = self.text(key, default);
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .with_context(|| format!("{} must be HH:MM, got {:?}", key, raw))
    }

    /// Comma-separated addresses.
    fn list(&self, key: &str) -> Vec<String> {
        self.optional(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.port, 3000);
        assert!(!config.is_production());
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.invoice_dir(), PathBuf::from("data/invoices"));
        assert_eq!(config.invoice.start_number, 1000);
        assert_eq!(config.invoice.amount_usd, 1000.0);
        assert_eq!(config.invoice.description, "Monthly Service");
        assert_eq!(config.exchange_rate.surcharge, 1.006);
        assert_eq!(config.exchange_rate.fallback_rate, 0.86);
        assert_eq!(config.exchange_rate.api_key, None);
        assert_eq!(config.exchange_rate.api_url, DEFAULT_API_URL);
        assert_eq!(config.company.name, "Your Company");
        assert_eq!(config.client.name, "Client Company");
        assert!(config.mail.envelope.to.is_empty());
        assert_eq!(config.trigger_token, None);
        assert_eq!(config.schedule.invoice_at, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(config.schedule.precache_at, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(config.otlp_endpoint, None);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PORT", "8080"),
            ("APP_ENV", "Production"),
            ("INVOICE_START_NUMBER", "2000"),
            ("INVOICE_AMOUNT_USD", "2500.50"),
            ("INVOICE_TAX_RATE", "0.21"),
            ("EXCHANGE_RATE_API_KEY", " abc "),
            ("EXCHANGE_RATE_SURCHARGE", "1.01"),
            ("EMAIL_TO", "a@x.test, b@x.test,"),
            ("EMAIL_CC", "c@x.test"),
            ("TRIGGER_TOKEN", "tok"),
            ("INVOICE_RUN_AT", "17:30"),
            ("CLIENT_CONTACT", "Jordan"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert!(config.is_production());
        assert_eq!(config.invoice.start_number, 2000);
        assert_eq!(config.invoice.amount_usd, 2500.5);
        assert_eq!(config.exchange_rate.api_key.as_deref(), Some("abc"));
        assert_eq!(config.exchange_rate.surcharge, 1.01);
        assert_eq!(config.mail.envelope.to, vec!["a@x.test", "b@x.test"]);
        assert_eq!(config.mail.envelope.cc, vec!["c@x.test"]);
        assert_eq!(config.trigger_token.as_deref(), Some("tok"));
        assert_eq!(config.schedule.invoice_at, NaiveTime::from_hms_opt(17, 30, 0).unwrap());

        let profile = config.billing_profile();
        assert_eq!(profile.tax_rate, 0.21);
        assert_eq!(profile.client.contact, "Jordan");
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = load(&[("TRIGGER_TOKEN", "  "), ("PORT", "")]).unwrap();
        assert_eq!(config.trigger_token, None);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(load(&[("PORT", "http")]).is_err());
        assert!(load(&[("INVOICE_START_NUMBER", "-1")]).is_err());
        assert!(load(&[("INVOICE_AMOUNT_USD", "0")]).is_err());
        assert!(load(&[("INVOICE_TAX_RATE", "-0.1")]).is_err());
        assert!(load(&[("EXCHANGE_RATE_FALLBACK", "0")]).is_err());
        assert!(load(&[("INVOICE_RUN_AT", "9am")]).is_err());
    }
}
