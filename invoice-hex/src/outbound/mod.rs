//! Outbound Adapters
//!
//! Renderer, mail relay and chat notifier implementations of the
//! collaborator ports.

mod mailer;
mod pdf;
mod telegram;

pub use mailer::{Envelope, HttpMailer};
pub use pdf::PdfRenderer;
pub use telegram::{DEFAULT_TELEGRAM_API, TelegramNotifier};

/// Contact block printed on the invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Party {
    pub name: String,
    pub address: String,
    pub city: String,
    pub email: String,
    pub phone: String,
    /// Attention line (client side only)
    pub contact: String,
}

/// Static invoice content that does not change between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingProfile {
    pub company: Party,
    pub client: Party,
    pub description: String,
    /// Fraction, e.g. `0.21`; zero omits the tax line
    pub tax_rate: f64,
}

impl Default for BillingProfile {
    fn default() -> Self {
        Self {
            company: Party::default(),
            client: Party::default(),
            description: "Monthly Service".to_string(),
            tax_rate: 0.0,
        }
    }
}

/// Formats `value` with `decimals` places and comma thousands separators.
pub(crate) fn format_amount(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}
