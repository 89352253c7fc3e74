//! Month-end scheduler.
//!
//! Pre-caches the exchange rate and then runs the invoice on the last day of
//! every month, at configured local wall-clock times.

use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};

use invoice_hex::inbound::AppState;
use invoice_types::{RateCacheStore, RateProvider, SequenceStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    PreCache,
    Invoice,
}

impl Job {
    fn name(&self) -> &'static str {
        match self {
            Job::PreCache => "precache",
            Job::Invoice => "invoice",
        }
    }
}

pub fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.succ_opt().is_none_or(|next| next.day() == 1)
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// First month-end occurrence of `at` strictly after `after`.
pub fn next_month_end(after: NaiveDateTime, at: NaiveTime) -> Option<NaiveDateTime> {
    let this_month = last_day_of_month(after.year(), after.month())?.and_time(at);
    if this_month > after {
        return Some(this_month);
    }
    let first_of_next = last_day_of_month(after.year(), after.month())?.succ_opt()?;
    Some(last_day_of_month(first_of_next.year(), first_of_next.month())?.and_time(at))
}

/// The job that fires next; pre-cache wins a tie.
pub fn next_job(
    after: NaiveDateTime,
    precache_at: NaiveTime,
    invoice_at: NaiveTime,
) -> Option<(Job, NaiveDateTime)> {
    let precache = next_month_end(after, precache_at)?;
    let invoice = next_month_end(after, invoice_at)?;
    if precache <= invoice {
        Some((Job::PreCache, precache))
    } else {
        Some((Job::Invoice, invoice))
    }
}

pub struct Scheduler<C: RateCacheStore, P: RateProvider, S: SequenceStore> {
    state: Arc<AppState<C, P, S>>,
    precache_at: NaiveTime,
    invoice_at: NaiveTime,
}

impl<C: RateCacheStore, P: RateProvider, S: SequenceStore> Scheduler<C, P, S> {
    pub fn new(state: Arc<AppState<C, P, S>>, precache_at: NaiveTime, invoice_at: NaiveTime) -> Self {
        Self {
            state,
            precache_at,
            invoice_at,
        }
    }

    /// Runs forever. Job failures are logged and the loop moves on.
    pub async fn run(self) {
        tracing::info!(
            precache_at = %self.precache_at,
            invoice_at = %self.invoice_at,
            "Month-end jobs scheduled"
        );

        let mut last_fired: Option<NaiveDateTime> = None;
        loop {
            let now = Local::now().naive_local();
            // Never fire the same slot twice if the wall clock lags the timer.
            let after = last_fired.map_or(now, |fired| fired.max(now));
            let Some((job, at)) = next_job(after, self.precache_at, self.invoice_at) else {
                tracing::error!("No future month-end slot could be computed, scheduler stopped");
                return;
            };

            tracing::info!(job = job.name(), at = %at, "Next scheduled job");
            let wait = (at - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            last_fired = Some(at);

            self.fire(job).await;
        }
    }

    async fn fire(&self, job: Job) {
        let processor = &self.state.processor;
        match job {
            Job::PreCache => {
                tracing::info!("Running scheduled exchange rate pre-cache...");
                let outcome = processor.pre_cache_exchange_rate().await;
                tracing::info!(cached = outcome.is_cached(), "Scheduled pre-cache finished");
            }
            Job::Invoice => {
                let today = Local::now().date_naive();
                if !is_last_day_of_month(today) {
                    tracing::warn!(%today, "Woke up outside month end, skipping invoice run");
                    return;
                }
                tracing::info!("Running scheduled invoice generation...");
                if let Err(e) = processor.process_invoice().await {
                    tracing::error!("Scheduled invoice generation failed: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2025, 1), Some(date(2025, 1, 31)));
        assert_eq!(last_day_of_month(2025, 2), Some(date(2025, 2, 28)));
        assert_eq!(last_day_of_month(2024, 2), Some(date(2024, 2, 29)));
        assert_eq!(last_day_of_month(2025, 4), Some(date(2025, 4, 30)));
        assert_eq!(last_day_of_month(2025, 12), Some(date(2025, 12, 31)));
    }

    #[test]
    fn test_is_last_day_of_month() {
        assert!(is_last_day_of_month(date(2025, 2, 28)));
        assert!(is_last_day_of_month(date(2024, 12, 31)));
        assert!(!is_last_day_of_month(date(2024, 2, 28)));
        assert!(!is_last_day_of_month(date(2025, 1, 30)));
    }

    #[test]
    fn test_next_month_end_same_month() {
        let now = date(2025, 1, 15).and_time(at(12, 0));
        assert_eq!(next_month_end(now, at(9, 0)), Some(date(2025, 1, 31).and_time(at(9, 0))));
    }

    #[test]
    fn test_next_month_end_after_slot_rolls_over() {
        let now = date(2025, 1, 31).and_time(at(9, 0));
        assert_eq!(next_month_end(now, at(9, 0)), Some(date(2025, 2, 28).and_time(at(9, 0))));

        let new_year = date(2025, 12, 31).and_time(at(10, 0));
        assert_eq!(
            next_month_end(new_year, at(9, 0)),
            Some(date(2026, 1, 31).and_time(at(9, 0)))
        );
    }

    #[test]
    fn test_next_job_order_on_billing_day() {
        let morning = date(2025, 1, 31).and_time(at(7, 0));
        assert_eq!(
            next_job(morning, at(8, 0), at(9, 0)),
            Some((Job::PreCache, date(2025, 1, 31).and_time(at(8, 0))))
        );

        let after_precache = date(2025, 1, 31).and_time(at(8, 0));
        assert_eq!(
            next_job(after_precache, at(8, 0), at(9, 0)),
            Some((Job::Invoice, date(2025, 1, 31).and_time(at(9, 0))))
        );

        let after_invoice = date(2025, 1, 31).and_time(at(9, 0));
        assert_eq!(
            next_job(after_invoice, at(8, 0), at(9, 0)),
            Some((Job::PreCache, date(2025, 2, 28).and_time(at(8, 0))))
        );
    }
}
