//! Exchange rate resolution policy.
//!
//! Every resolution ends in a usable rate. The chain is fixed:
//! today's cache → live fetch → any cache → configured fallback constant.

use std::sync::Arc;

use invoice_types::{
    CachedRate, Clock, PreCacheOutcome, RateCacheStore, RateOrigin, RateProvider, RateResolution,
};

/// Decides where today's rate comes from.
pub struct RateResolver<C: RateCacheStore, P: RateProvider> {
    cache: C,
    provider: P,
    clock: Arc<dyn Clock>,
    fallback_rate: f64,
}

impl<C: RateCacheStore, P: RateProvider> RateResolver<C, P> {
    pub fn new(cache: C, provider: P, clock: Arc<dyn Clock>, fallback_rate: f64) -> Self {
        Self {
            cache,
            provider,
            clock,
            fallback_rate,
        }
    }

    /// Returns a reference to the underlying cache store.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn fallback_rate(&self) -> f64 {
        self.fallback_rate
    }

    /// Resolves today's rate. Never fails.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_rate(&self) -> RateResolution {
        let today = self.clock.today();

        if let Some(cached) = self.cache.load().await.filter(|c| c.is_from(today)) {
            tracing::info!(rate = cached.rate, "Using cached exchange rate from today");
            return RateResolution::from_cache(&cached, RateOrigin::CacheToday);
        }

        match self.provider.fetch_live().await {
            Ok(rate) => {
                self.store(rate).await;
                tracing::info!(rate, "Fetched and cached new exchange rate");
                RateResolution::live(rate, today)
            }
            Err(e) => {
                tracing::warn!("Live exchange rate unavailable: {}", e);
                // Re-read: a concurrent pre-cache may have landed meanwhile.
                match self.cache.load().await {
                    Some(cached) => {
                        let origin = if cached.is_from(today) {
                            RateOrigin::CacheToday
                        } else {
                            RateOrigin::CacheStale
                        };
                        tracing::info!(
                            rate = cached.rate,
                            date = %cached.fetched_date,
                            "Using cached exchange rate"
                        );
                        RateResolution::from_cache(&cached, origin)
                    }
                    None => {
                        tracing::warn!(
                            rate = self.fallback_rate,
                            "No cached rate available, using fallback rate"
                        );
                        RateResolution::fallback(self.fallback_rate, today)
                    }
                }
            }
        }
    }

    /// Fetches and caches a live rate ahead of billing day.
    ///
    /// Advisory: failures come back as [`PreCacheOutcome::Failed`], never as errors.
    #[tracing::instrument(skip(self))]
    pub async fn pre_cache_rate(&self) -> PreCacheOutcome {
        match self.provider.fetch_live().await {
            Ok(rate) => {
                let date = self
                    .store(rate)
                    .await
                    .map(|c| c.fetched_date)
                    .unwrap_or_else(|| self.clock.today());
                tracing::info!(rate, "Successfully pre-cached exchange rate");
                PreCacheOutcome::Cached { rate, date }
            }
            Err(e) => {
                tracing::error!("Failed to pre-cache exchange rate: {}", e);
                PreCacheOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Best-effort cache write; a failed write is logged and dropped.
    async fn store(&self, rate: f64) -> Option<CachedRate> {
        match self.cache.save(rate).await {
            Ok(cached) => Some(cached),
            Err(e) => {
                tracing::error!("Error saving exchange cache: {}", e);
                None
            }
        }
    }
}
