//! Telegram Bot API notifier.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use invoice_types::{InvoiceRecord, Notifier, NotifyError};

use super::format_amount;

pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
    /// Shown as "Sent to" in the run summary
    recipient: String,
}

impl TelegramNotifier {
    /// Returns `None` unless both the bot token and the chat id are set.
    pub fn from_config(
        api_base: impl Into<String>,
        token: Option<String>,
        chat_id: Option<String>,
        recipient: impl Into<String>,
    ) -> Option<Self> {
        let token = token.filter(|t| !t.trim().is_empty())?;
        let chat_id = chat_id.filter(|c| !c.trim().is_empty())?;
        Some(Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
            chat_id,
            recipient: recipient.into(),
        })
    }

    fn summary(&self, invoice: &InvoiceRecord, delivered: bool) -> String {
        let (status, closing) = if delivered {
            ("✅ Sent successfully", "✅ Invoice delivered successfully!")
        } else {
            ("❌ Failed to send", "⚠️ Please check email configuration")
        };

        format!(
            "📧 *Monthly Invoice Sent*\n\n\
             📅 *Date:* {}\n\
             🔢 *Invoice Number:* {}\n\n\
             💵 *Amount USD:* ${}\n\
             💶 *Amount EUR:* €{}\n\n\
             📊 *Exchange Rate:* 1 USD = {:.4} EUR\n\
             📆 *Rate Date:* {}\n\n\
             ✉️ *Email Status:* {}\n\
             📬 *Sent to:* {}\n\n\
             {}",
            invoice.month_label(),
            invoice.number(),
            format_amount(invoice.amount_base(), 2),
            format_amount(invoice.amount_converted(), 2),
            invoice.rate(),
            invoice.rate_date(),
            status,
            self.recipient,
            closing,
        )
    }

    async fn send(&self, text: &str, parse_mode: Option<&'static str>) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let resp = self
            .client
            .post(&url)
            .timeout(NOTIFY_TIMEOUT)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
                parse_mode,
            })
            .send()
            .await
            // reqwest errors embed the URL, which carries the bot token.
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        if !resp.status().is_success() {
            return Err(NotifyError::Rejected(resp.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, invoice: &InvoiceRecord, delivered: bool) -> Result<(), NotifyError> {
        self.send(&self.summary(invoice, delivered), Some("Markdown"))
            .await?;
        tracing::info!("Telegram notification sent successfully");
        Ok(())
    }

    async fn send_test(&self) -> Result<(), NotifyError> {
        self.send("🔔 Invoice automation system connected successfully!", None)
            .await?;
        tracing::info!("Telegram test message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
    use chrono::NaiveDate;
    use invoice_types::{RateOrigin, RateResolution};
    use serde_json::Value;

    type Captured = Arc<Mutex<Vec<Value>>>;

    async fn bot_api(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let router = Router::new()
            .route(
                "/bottest-token/sendMessage",
                post(
                    move |State(captured): State<Captured>, Json(body): Json<Value>| async move {
                        captured.lock().unwrap().push(body);
                        (status, Json(serde_json::json!({ "ok": status.is_success() })))
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{}/", addr), captured)
    }

    fn notifier(api_base: &str) -> TelegramNotifier {
        TelegramNotifier::from_config(
            api_base,
            Some("test-token".into()),
            Some("42".into()),
            "ap@client.test",
        )
        .unwrap()
    }

    fn invoice() -> InvoiceRecord {
        let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let resolution = RateResolution {
            rate: 1.006,
            origin: RateOrigin::CacheToday,
            rate_date: NaiveDate::from_ymd_opt(2025, 1, 30).unwrap(),
        };
        InvoiceRecord::build(1001, date, 1000.0, &resolution).unwrap()
    }

    #[test]
    fn test_from_config_requires_token_and_chat() {
        assert!(TelegramNotifier::from_config(DEFAULT_TELEGRAM_API, None, Some("1".into()), "").is_none());
        assert!(
            TelegramNotifier::from_config(DEFAULT_TELEGRAM_API, Some("t".into()), Some(" ".into()), "")
                .is_none()
        );
        assert!(
            TelegramNotifier::from_config(DEFAULT_TELEGRAM_API, Some("t".into()), Some("1".into()), "")
                .is_some()
        );
    }

    #[test]
    fn test_summary_reflects_delivery() {
        let n = notifier("http://unused");
        let ok = n.summary(&invoice(), true);
        assert!(ok.contains("*Invoice Number:* 1001"));
        assert!(ok.contains("$1,000.00"));
        assert!(ok.contains("€1,006.00"));
        assert!(ok.contains("1 USD = 1.0060 EUR"));
        assert!(ok.contains("*Rate Date:* 2025-01-30"));
        assert!(ok.contains("*Sent to:* ap@client.test"));
        assert!(ok.contains("✅ Sent successfully"));

        let failed = n.summary(&invoice(), false);
        assert!(failed.contains("❌ Failed to send"));
        assert!(failed.contains("Please check email configuration"));
    }

    #[tokio::test]
    async fn test_notify_posts_markdown_message() {
        let (base, captured) = bot_api(StatusCode::OK).await;

        notifier(&base).notify(&invoice(), true).await.unwrap();

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0]["chat_id"], "42");
        assert_eq!(captured[0]["parse_mode"], "Markdown");
        assert!(captured[0]["text"].as_str().unwrap().contains("Monthly Invoice Sent"));
    }

    #[tokio::test]
    async fn test_send_test_plain_text() {
        let (base, captured) = bot_api(StatusCode::OK).await;

        notifier(&base).send_test().await.unwrap();

        let captured = captured.lock().unwrap();
        assert!(captured[0].get("parse_mode").is_none());
    }

    #[tokio::test]
    async fn test_rejected_status() {
        let (base, _) = bot_api(StatusCode::BAD_REQUEST).await;
        let err = notifier(&base).send_test().await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected(400)));
    }
}
