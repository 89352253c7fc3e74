//! Single-page text PDF renderer.
//!
//! Writes a PDF 1.4 document using the built-in Helvetica faces with
//! WinAnsi encoding, so no font embedding is needed.

use std::path::PathBuf;

use async_trait::async_trait;

use invoice_types::{CurrencyCode, InvoiceRecord, InvoiceRenderer, RenderError, RenderedInvoice};

use super::{BillingProfile, format_amount};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const CONTENT_TYPE: &str = "application/pdf";

// ─────────────────────────────────────────────────────────────────────────────
// Page model
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum Face {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Ink {
    Black,
    Gray,
}

enum Op {
    Text {
        x: f32,
        top: f32,
        size: f32,
        face: Face,
        ink: Ink,
        text: String,
    },
    Rule {
        top: f32,
    },
}

/// Drawing operations, positioned from the top-left like a screen layout.
#[derive(Default)]
struct Page {
    ops: Vec<Op>,
}

impl Page {
    fn put(&mut self, x: f32, top: f32, size: f32, face: Face, ink: Ink, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        self.ops.push(Op::Text {
            x,
            top,
            size,
            face,
            ink,
            text,
        });
    }

    fn text(&mut self, x: f32, top: f32, size: f32, text: impl Into<String>) {
        self.put(x, top, size, Face::Regular, Ink::Black, text);
    }

    fn bold(&mut self, x: f32, top: f32, size: f32, text: impl Into<String>) {
        self.put(x, top, size, Face::Bold, Ink::Black, text);
    }

    fn note(&mut self, x: f32, top: f32, size: f32, text: impl Into<String>) {
        self.put(x, top, size, Face::Regular, Ink::Gray, text);
    }

    fn rule(&mut self, top: f32) {
        self.ops.push(Op::Rule { top });
    }

    fn content_stream(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for op in &self.ops {
            match op {
                Op::Text {
                    x,
                    top,
                    size,
                    face,
                    ink,
                    text,
                } => {
                    let font = match face {
                        Face::Regular => "F1",
                        Face::Bold => "F2",
                    };
                    let gray = match ink {
                        Ink::Black => "0",
                        Ink::Gray => "0.5",
                    };
                    let baseline = PAGE_HEIGHT - top - size;
                    out.extend_from_slice(
                        format!("BT /{} {} Tf {} g {:.1} {:.1} Td (", font, size, gray, x, baseline)
                            .as_bytes(),
                    );
                    out.extend(escape(&win_ansi(text)));
                    out.extend_from_slice(b") Tj ET\n");
                }
                Op::Rule { top } => {
                    let y = PAGE_HEIGHT - top;
                    out.extend_from_slice(
                        format!("0 G 1 w 50 {:.1} m 550 {:.1} l S\n", y, y).as_bytes(),
                    );
                }
            }
        }
        out
    }
}

/// Maps text to WinAnsi (CP1252) bytes; unmapped characters become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            '\u{20}'..='\u{7e}' => ch as u8,
            '€' => 0x80,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '\u{a0}'..='\u{ff}' => ch as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Escapes string delimiters for a PDF literal string.
fn escape(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        if matches!(b, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out
}

/// Wraps a content stream into a complete one-page document with an xref table.
fn encode_document(content: &[u8]) -> Vec<u8> {
    let font = |name: &str| {
        format!(
            "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
            name
        )
        .into_bytes()
    };
    let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
    stream.extend_from_slice(content);
    stream.extend_from_slice(b"\nendstream");

    let objects: Vec<Vec<u8>> = vec![
        b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
             /Resources << /Font << /F1 4 0 R /F2 5 0 R >> >> /Contents 6 0 R >>",
            PAGE_WIDTH, PAGE_HEIGHT
        )
        .into_bytes(),
        font("Helvetica"),
        font("Helvetica-Bold"),
        stream,
    ];

    let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Invoice layout
// ─────────────────────────────────────────────────────────────────────────────

fn layout(invoice: &InvoiceRecord, profile: &BillingProfile) -> Page {
    let usd = CurrencyCode::USD.symbol();
    let eur = CurrencyCode::EUR.symbol();
    let mut page = Page::default();

    page.bold(50.0, 50.0, 24.0, "INVOICE");
    page.text(400.0, 50.0, 10.0, format!("Invoice #: {}", invoice.number()));
    page.text(
        400.0,
        65.0,
        10.0,
        format!("Date: {}", invoice.date().format("%B %-d, %Y")),
    );

    let company = &profile.company;
    page.text(50.0, 120.0, 12.0, "From:");
    for (i, line) in [
        &company.name,
        &company.address,
        &company.city,
        &company.email,
        &company.phone,
    ]
    .into_iter()
    .enumerate()
    {
        page.text(50.0, 140.0 + 15.0 * i as f32, 10.0, line.as_str());
    }

    let client = &profile.client;
    let attention = if client.contact.is_empty() {
        String::new()
    } else {
        format!("Attn: {}", client.contact)
    };
    page.text(300.0, 120.0, 12.0, "Bill To:");
    for (i, line) in [
        client.name.as_str(),
        client.address.as_str(),
        client.city.as_str(),
        attention.as_str(),
        client.email.as_str(),
    ]
    .into_iter()
    .enumerate()
    {
        page.text(300.0, 140.0 + 15.0 * i as f32, 10.0, line);
    }

    page.rule(240.0);
    page.text(50.0, 260.0, 12.0, "Description");
    page.text(350.0, 260.0, 12.0, "Amount (USD)");
    page.text(450.0, 260.0, 12.0, "Amount (EUR)");
    page.rule(280.0);

    page.text(
        50.0,
        300.0,
        10.0,
        format!("Fee for {} — {}", invoice.month_label(), profile.description),
    );
    page.text(
        350.0,
        300.0,
        10.0,
        format!("{}{}", usd, format_amount(invoice.amount_base(), 0)),
    );
    page.text(
        450.0,
        300.0,
        10.0,
        format!("{}{}", eur, format_amount(invoice.amount_converted(), 2)),
    );
    page.note(
        350.0,
        320.0,
        8.0,
        format!("Exchange rate: 1 USD = {:.4} EUR", invoice.rate()),
    );
    page.note(350.0, 332.0, 8.0, format!("Rate date: {}", invoice.rate_date()));

    let mut total_eur = invoice.amount_converted();
    if profile.tax_rate > 0.0 {
        let tax_usd = invoice.amount_base() * profile.tax_rate;
        let tax_eur = invoice.amount_converted() * profile.tax_rate;
        page.text(
            50.0,
            360.0,
            10.0,
            format!("Tax ({:.0}%)", profile.tax_rate * 100.0),
        );
        page.text(350.0, 360.0, 10.0, format!("{}{:.2}", usd, tax_usd));
        page.text(450.0, 360.0, 10.0, format!("{}{:.2}", eur, tax_eur));
        total_eur += tax_eur;
    }

    page.rule(400.0);
    page.bold(50.0, 420.0, 14.0, "TOTAL");
    page.bold(450.0, 420.0, 14.0, format!("{}{}", eur, format_amount(total_eur, 2)));

    page.note(230.0, 700.0, 8.0, "Thank you for your business!");
    page
}

// ─────────────────────────────────────────────────────────────────────────────
// Renderer
// ─────────────────────────────────────────────────────────────────────────────

/// Writes `invoice_{number}_{date}.pdf` into the output directory.
pub struct PdfRenderer {
    output_dir: PathBuf,
    profile: BillingProfile,
}

impl PdfRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, profile: BillingProfile) -> Self {
        Self {
            output_dir: output_dir.into(),
            profile,
        }
    }

    /// Renders the document bytes without touching the filesystem.
    pub fn render_bytes(&self, invoice: &InvoiceRecord) -> Vec<u8> {
        encode_document(&layout(invoice, &self.profile).content_stream())
    }
}

#[async_trait]
impl InvoiceRenderer for PdfRenderer {
    async fn render(&self, invoice: &InvoiceRecord) -> Result<RenderedInvoice, RenderError> {
        let bytes = self.render_bytes(invoice);
        let file_name = format!("{}.pdf", invoice.file_stem());
        let path = self.output_dir.join(&file_name);

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| RenderError::Io(format!("{}: {}", self.output_dir.display(), e)))?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| RenderError::Io(format!("{}: {}", path.display(), e)))?;

        Ok(RenderedInvoice {
            path,
            file_name,
            content_type: CONTENT_TYPE,
        })
    }
}
