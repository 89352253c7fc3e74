//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use invoice_types::{
    AppError, HealthResponse, RateCacheStore, RateProvider, SequenceStore, TriggerResponse,
};

use crate::InvoiceProcessor;

pub const SERVICE_NAME: &str = "invoice-automation";

/// Application state shared across handlers.
pub struct AppState<C: RateCacheStore, P: RateProvider, S: SequenceStore> {
    pub processor: InvoiceProcessor<C, P, S>,
    /// `None` rejects every protected endpoint
    pub trigger_token: Option<String>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::RunInProgress => StatusCode::CONFLICT,
            AppError::Delivery(_) => StatusCode::BAD_GATEWAY,
            AppError::Domain(_) | AppError::Render(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.0.to_string(),
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".into(),
        service: SERVICE_NAME.into(),
        timestamp: Utc::now(),
    })
}

/// Runs the monthly invoice now.
#[tracing::instrument(skip(state))]
pub async fn trigger<C: RateCacheStore, P: RateProvider, S: SequenceStore>(
    State(state): State<Arc<AppState<C, P, S>>>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Manual invoice trigger received");
    let invoice = state.processor.process_invoice().await?;
    Ok(Json(TriggerResponse {
        success: true,
        message: "Invoice processed successfully".into(),
        invoice,
    }))
}

/// Fetches and caches a live rate. Always 200; the body says whether it worked.
#[tracing::instrument(skip(state))]
pub async fn precache<C: RateCacheStore, P: RateProvider, S: SequenceStore>(
    State(state): State<Arc<AppState<C, P, S>>>,
) -> impl IntoResponse {
    Json(state.processor.pre_cache_exchange_rate().await)
}

#[tracing::instrument(skip(state))]
pub async fn test_connections<C: RateCacheStore, P: RateProvider, S: SequenceStore>(
    State(state): State<Arc<AppState<C, P, S>>>,
) -> impl IntoResponse {
    Json(state.processor.test_connections().await)
}

#[tracing::instrument(skip(state))]
pub async fn status<C: RateCacheStore, P: RateProvider, S: SequenceStore>(
    State(state): State<Arc<AppState<C, P, S>>>,
) -> impl IntoResponse {
    Json(state.processor.status().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use invoice_types::{DeliveryError, DomainError, RenderError};

    fn status_of(err: AppError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(status_of(AppError::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AppError::RunInProgress), StatusCode::CONFLICT);
        assert_eq!(
            status_of(DeliveryError::Transport("down".into()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(RenderError::Io("disk full".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(DomainError::InvalidRate(0.0).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
