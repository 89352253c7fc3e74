//! # Invoice Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the file stores and the exchange-rate client
//! - Create the invoice processor with its renderer, mailer and notifier
//! - Start the month-end scheduler (production only) and the HTTP server

mod config;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::global;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exchange_rates::{DEFAULT_FETCH_TIMEOUT, ExchangeRateApi, RateSettings};
use invoice_hex::{
    InvoiceProcessor, InvoiceSequence, Outbound, RateResolver,
    inbound::HttpServer,
    outbound::{HttpMailer, PdfRenderer, TelegramNotifier},
};
use invoice_repo::build_stores;
use invoice_types::{Clock, Notifier, SystemClock};

use crate::scheduler::Scheduler;

const STARTUP_CHECK_DELAY: Duration = Duration::from_secs(2);

fn init_tracer(endpoint: &str) -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("invoice-automation"), provider))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::from_env()?;

    // OpenTelemetry export only when a collector is configured
    let otel = config
        .otlp_endpoint
        .as_deref()
        .map(init_tracer)
        .transpose()?;
    let telemetry = otel
        .as_ref()
        .map(|(tracer, _)| tracing_opentelemetry::layer().with_tracer(tracer.clone()));

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,invoice_app=debug,invoice_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    tracing::info!("Starting invoice server on port {}", config.port);
    tracing::info!("Environment: {}", config.app_env);
    tracing::info!("Using data directory: {}", config.data_dir.display());

    // Stores and rate source
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let stores = build_stores(&config.data_dir, config.invoice.start_number, clock.clone());

    let provider = ExchangeRateApi::new(
        config.exchange_rate.api_url.clone(),
        config.exchange_rate.api_key.clone(),
        RateSettings {
            surcharge: config.exchange_rate.surcharge,
            timeout: DEFAULT_FETCH_TIMEOUT,
        },
    );
    if !provider.has_credential() {
        tracing::warn!("EXCHANGE_RATE_API_KEY not set, live rates disabled");
    }

    // Collaborators
    let profile = config.billing_profile();
    let notifier = TelegramNotifier::from_config(
        config.telegram.api_url.clone(),
        config.telegram.bot_token.clone(),
        config.telegram.chat_id.clone(),
        config.client.email.clone(),
    )
    .map(|n| Arc::new(n) as Arc<dyn Notifier>);
    if notifier.is_none() {
        tracing::info!("Telegram not configured, notifications disabled");
    }

    let outbound = Outbound {
        renderer: Arc::new(PdfRenderer::new(config.invoice_dir(), profile.clone())),
        delivery: Arc::new(HttpMailer::new(
            config.mail.api_url.clone(),
            config.mail.api_key.clone(),
            config.mail.envelope.clone(),
            profile,
        )),
        notifier,
    };

    // Create the invoice processor
    let processor = InvoiceProcessor::new(
        RateResolver::new(
            stores.rate_cache,
            provider,
            clock.clone(),
            config.exchange_rate.fallback_rate,
        ),
        InvoiceSequence::new(stores.sequence),
        outbound,
        clock,
        config.invoice.amount_usd,
    );

    if config.trigger_token.is_none() {
        tracing::warn!("TRIGGER_TOKEN not set, protected endpoints will reject every request");
    }
    let server = HttpServer::from_processor(processor, config.trigger_token.clone());
    let state = server.state();

    if config.is_production() {
        let scheduler = Scheduler::new(
            state.clone(),
            config.schedule.precache_at,
            config.schedule.invoice_at,
        );
        tokio::spawn(scheduler.run());
    } else {
        tracing::info!("Development mode - scheduler not started");
        tracing::info!("Use the /trigger endpoint to process invoices manually");
    }

    // Initial connection test once the listener is up
    tokio::spawn(async move {
        tokio::time::sleep(STARTUP_CHECK_DELAY).await;
        let report = state.processor.test_connections().await;
        tracing::info!(
            delivery_ok = report.delivery_ok,
            rate = report.exchange_rate.rate,
            origin = %report.exchange_rate.origin,
            notifier_ok = ?report.notifier_ok,
            "Startup connection test finished"
        );
    });

    // Create and run the HTTP server
    let addr = format!("0.0.0.0:{}", config.port);
    server.run(&addr).await?;

    // Ensure traces are flushed before exit
    if let Some((_, provider)) = otel {
        let _ = provider.shutdown();
    }
    Ok(())
}
