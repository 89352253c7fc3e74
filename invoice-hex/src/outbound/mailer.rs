//! Invoice delivery through an HTTP mail relay.
//!
//! The relay accepts a JSON message with base64 attachments and a bearer
//! key. Any 2xx answer counts as accepted.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Serialize;

use invoice_types::{DeliveryError, InvoiceDelivery, InvoiceRecord, RenderedInvoice};

use super::{BillingProfile, format_amount};

pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Sender and recipients of the invoice mail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
}

#[derive(Debug, Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: &'a [String],
    #[serde(skip_serializing_if = "no_addresses")]
    cc: &'a [String],
    subject: String,
    html: String,
    attachments: Vec<Attachment<'a>>,
}

#[derive(Debug, Serialize)]
struct Attachment<'a> {
    filename: &'a str,
    content: String,
    content_type: &'a str,
}

pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    envelope: Envelope,
    profile: BillingProfile,
    timeout: Duration,
}

impl HttpMailer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        envelope: Envelope,
        profile: BillingProfile,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            envelope,
            profile,
            timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn ensure_configured(&self) -> Result<(), DeliveryError> {
        if self.endpoint.trim().is_empty() {
            return Err(DeliveryError::NotConfigured("mail relay URL is empty".into()));
        }
        if self.envelope.to.is_empty() {
            return Err(DeliveryError::NotConfigured("no recipient address".into()));
        }
        Ok(())
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.timeout(self.timeout);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn subject(invoice: &InvoiceRecord) -> String {
        format!("Invoice #{} - {}", invoice.number(), invoice.month_label())
    }

    fn html_body(&self, invoice: &InvoiceRecord) -> String {
        let month = escape_html(&invoice.month_label());
        let contact = if self.profile.client.contact.is_empty() {
            "Client".to_string()
        } else {
            escape_html(&self.profile.client.contact)
        };
        let company = &self.profile.company;

        let rows = [
            ("Invoice Number:", invoice.number().to_string()),
            ("Date:", invoice.date().format("%Y-%m-%d").to_string()),
            (
                "Amount (USD):",
                format!("${}", format_amount(invoice.amount_base(), 2)),
            ),
            (
                "Amount (EUR):",
                format!("€{}", format_amount(invoice.amount_converted(), 2)),
            ),
            (
                "Exchange Rate:",
                format!("1 USD = {:.4} EUR", invoice.rate()),
            ),
        ]
        .iter()
        .map(|(label, value)| {
            format!(
                "<tr><td style=\"padding: 8px; border: 1px solid #ddd;\"><strong>{}</strong></td>\
                 <td style=\"padding: 8px; border: 1px solid #ddd;\">{}</td></tr>",
                label, value
            )
        })
        .collect::<String>();

        format!(
            "<div style=\"font-family: Arial, sans-serif; max-width: 600px;\">\
             <h2>Invoice for {month}</h2>\
             <p>Dear {contact},</p>\
             <p>Please find attached the invoice for our monthly services.</p>\
             <table style=\"border-collapse: collapse; width: 100%; margin: 20px 0;\">{rows}</table>\
             <p><strong>Payment Terms:</strong> Net 30 days</p>\
             <p>Please include the invoice number with your payment.</p>\
             <p>Thank you for your continued business!</p>\
             <hr style=\"margin: 30px 0;\">\
             <p style=\"color: #666; font-size: 12px;\">{}<br>{}<br>{}</p>\
             </div>",
            escape_html(&company.name),
            escape_html(&company.email),
            escape_html(&company.phone),
        )
    }
}

#[async_trait]
impl InvoiceDelivery for HttpMailer {
    #[tracing::instrument(skip_all, fields(invoice_number = invoice.number()))]
    async fn deliver(
        &self,
        invoice: &InvoiceRecord,
        artifact: &RenderedInvoice,
    ) -> Result<(), DeliveryError> {
        self.ensure_configured()?;

        let bytes = tokio::fs::read(&artifact.path)
            .await
            .map_err(|e| DeliveryError::Attachment(format!("{}: {}", artifact.path.display(), e)))?;

        let mail = OutgoingMail {
            from: &self.envelope.from,
            to: &self.envelope.to,
            cc: &self.envelope.cc,
            subject: Self::subject(invoice),
            html: self.html_body(invoice),
            attachments: vec![Attachment {
                filename: &artifact.file_name,
                content: STANDARD.encode(&bytes),
                content_type: artifact.content_type,
            }],
        };

        let resp = self
            .request(self.client.post(&self.endpoint))
            .json(&mail)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(
            recipients = %self.envelope.to.join(", "),
            "Invoice email sent successfully"
        );
        Ok(())
    }

    /// Reachability probe: any HTTP answer from the relay counts.
    async fn verify(&self) -> bool {
        if let Err(e) = self.ensure_configured() {
            tracing::warn!("Email connection failed: {}", e);
            return false;
        }
        match self.request(self.client.get(&self.endpoint)).send().await {
            Ok(resp) => {
                tracing::info!(status = resp.status().as_u16(), "Mail relay reachable");
                true
            }
            Err(e) => {
                tracing::warn!("Email connection failed: {}", e);
                false
            }
        }
    }
}

fn no_addresses(list: &&[String]) -> bool {
    list.is_empty()
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use chrono::NaiveDate;
    use invoice_types::{RateOrigin, RateResolution};
    use serde_json::Value;

    use crate::outbound::Party;

    type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn relay(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let router = Router::new()
            .route(
                "/send",
                post(
                    move |State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(String::from);
                        captured.lock().unwrap().push((auth, body));
                        (status, "relay says hi")
                    },
                ),
            )
            .with_state(captured.clone());
        (format!("{}/send", serve(router).await), captured)
    }

    fn invoice() -> InvoiceRecord {
        let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let resolution = RateResolution {
            rate: 0.92,
            origin: RateOrigin::Live,
            rate_date: date,
        };
        InvoiceRecord::build(1001, date, 1000.0, &resolution).unwrap()
    }

    fn envelope() -> Envelope {
        Envelope {
            from: "billing@acme.test".into(),
            to: vec!["ap@client.test".into()],
            cc: vec![],
        }
    }

    fn profile() -> BillingProfile {
        BillingProfile {
            company: Party {
                name: "Acme & Co".into(),
                ..Party::default()
            },
            client: Party {
                contact: "Jordan".into(),
                ..Party::default()
            },
            ..BillingProfile::default()
        }
    }

    fn artifact(dir: &tempfile::TempDir) -> RenderedInvoice {
        let path = dir.path().join("invoice_1001_2025-01-31.pdf");
        std::fs::write(&path, b"%PDF-1.4 test").unwrap();
        RenderedInvoice {
            path,
            file_name: "invoice_1001_2025-01-31.pdf".into(),
            content_type: "application/pdf",
        }
    }

    #[tokio::test]
    async fn test_deliver_posts_message_with_attachment() {
        let (url, captured) = relay(StatusCode::ACCEPTED).await;
        let dir = tempfile::tempdir().unwrap();
        let mailer = HttpMailer::new(url, Some("relay-key".into()), envelope(), profile());

        mailer.deliver(&invoice(), &artifact(&dir)).await.unwrap();

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        let (auth, body) = &captured[0];
        assert_eq!(auth.as_deref(), Some("Bearer relay-key"));
        assert_eq!(body["subject"], "Invoice #1001 - January 2025");
        assert_eq!(body["from"], "billing@acme.test");
        assert_eq!(body["to"][0], "ap@client.test");
        assert!(body.get("cc").is_none());

        let html = body["html"].as_str().unwrap();
        assert!(html.contains("Dear Jordan,"));
        assert!(html.contains("Acme &amp; Co"));
        assert!(html.contains("€920.00"));
        assert!(html.contains("1 USD = 0.9200 EUR"));

        let attachment = &body["attachments"][0];
        assert_eq!(attachment["filename"], "invoice_1001_2025-01-31.pdf");
        assert_eq!(attachment["content_type"], "application/pdf");
        let decoded = STANDARD
            .decode(attachment["content"].as_str().unwrap())
            .unwrap();
        assert_eq!(decoded, b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn test_deliver_rejected_status() {
        let (url, _) = relay(StatusCode::INTERNAL_SERVER_ERROR).await;
        let dir = tempfile::tempdir().unwrap();
        let mailer = HttpMailer::new(url, None, envelope(), profile());

        let err = mailer.deliver(&invoice(), &artifact(&dir)).await.unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::Rejected { status: 500, ref message } if message == "relay says hi"
        ));
    }

    #[tokio::test]
    async fn test_deliver_requires_recipient() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = HttpMailer::new(
            "http://127.0.0.1:9/send",
            None,
            Envelope::default(),
            profile(),
        );

        let err = mailer.deliver(&invoice(), &artifact(&dir)).await.unwrap_err();
        assert!(matches!(err, DeliveryError::NotConfigured(_)));
        assert!(!mailer.verify().await);
    }

    #[tokio::test]
    async fn test_deliver_missing_artifact() {
        let (url, captured) = relay(StatusCode::OK).await;
        let mailer = HttpMailer::new(url, None, envelope(), profile());
        let missing = RenderedInvoice {
            path: "/nonexistent/invoice.pdf".into(),
            file_name: "invoice.pdf".into(),
            content_type: "application/pdf",
        };

        let err = mailer.deliver(&invoice(), &missing).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Attachment(_)));
        assert!(captured.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verify_reachable_relay() {
        // GET on a POST-only route still answers (405), which is enough.
        let (url, _) = relay(StatusCode::OK).await;
        let mailer = HttpMailer::new(url, None, envelope(), profile());
        assert!(mailer.verify().await);
    }

    #[tokio::test]
    async fn test_verify_unreachable_relay() {
        let mailer = HttpMailer::new("http://127.0.0.1:9/send", None, envelope(), profile())
            .with_timeout(Duration::from_millis(200));
        assert!(!mailer.verify().await);
    }
}
