//! In-process traffic simulation.
//!
//! Drives a [`RateLimiter`] with synthetic request patterns and counts the
//! outcomes. Time is supplied by a [`ManualClock`] so multi-minute
//! scenarios finish instantly.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info};

use crate::error::AdmissionError;
use crate::ratelimit::{Decision, ManualClock, RateLimitPolicy, RateLimiter, TenantId};

/// Outcome counts for one simulated run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimulationReport {
    pub admitted: usize,
    pub denied: usize,
    pub errors: usize,
}

impl SimulationReport {
    fn record(&mut self, result: &Result<Decision, AdmissionError>) {
        match result {
            Ok(decision) if decision.is_admitted() => self.admitted += 1,
            Ok(_) => self.denied += 1,
            Err(_) => self.errors += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.admitted + self.denied + self.errors
    }
}

/// Send `requests` checks one after another.
pub fn sequential(limiter: &RateLimiter, tenant: &TenantId, requests: usize) -> SimulationReport {
    let mut report = SimulationReport::default();
    for _ in 0..requests {
        report.record(&limiter.check(tenant));
    }
    report
}

/// Send `requests` checks at once, each from its own task.
pub async fn concurrent(
    limiter: Arc<RateLimiter>,
    tenant: TenantId,
    requests: usize,
) -> SimulationReport {
    let tasks = (0..requests).map(|_| {
        let limiter = Arc::clone(&limiter);
        let tenant = tenant.clone();
        tokio::spawn(async move { limiter.check(&tenant) })
    });

    let mut report = SimulationReport::default();
    for joined in join_all(tasks).await {
        match joined {
            Ok(result) => report.record(&result),
            Err(_) => report.errors += 1,
        }
    }
    report
}

/// Send `batches` concurrent batches, advancing `clock` by `gap_ms` between them.
pub async fn sliding_window(
    limiter: Arc<RateLimiter>,
    clock: &ManualClock,
    tenant: TenantId,
    per_batch: usize,
    batches: usize,
    gap_ms: u64,
) -> Vec<SimulationReport> {
    let mut reports = Vec::with_capacity(batches);
    for batch in 0..batches {
        if batch > 0 {
            clock.advance(gap_ms);
        }
        let report = concurrent(Arc::clone(&limiter), tenant.clone(), per_batch).await;
        debug!(batch = batch + 1, admitted = report.admitted, denied = report.denied, "Batch finished");
        reports.push(report);
    }
    reports
}

/// Run the standard scenario suite against a fresh limiter.
///
/// Returns one labelled report per scenario step.
pub async fn run_suite(policy: RateLimitPolicy, start_millis: u64) -> Vec<(String, SimulationReport)> {
    let clock = Arc::new(ManualClock::new(start_millis));
    let limiter = Arc::new(RateLimiter::with_clock(policy, clock.clone()));
    let max = policy.max_requests() as usize;
    let tenant = |id: &str| TenantId::parse(id).expect("scenario tenant ids are non-empty");
    let mut results = Vec::new();

    results.push((
        "basic".to_string(),
        sequential(&limiter, &tenant("tenant1"), 5),
    ));
    results.push((
        "exceed".to_string(),
        sequential(&limiter, &tenant("tenant2"), max + 5),
    ));
    results.push((
        "isolation".to_string(),
        sequential(&limiter, &tenant("tenant3"), 5),
    ));
    results.push((
        "concurrent".to_string(),
        concurrent(Arc::clone(&limiter), tenant("tenant4"), max / 2).await,
    ));

    let per_batch = (max * 2 / 5).max(1);
    let gap_ms = policy.window_duration_ms() / 3;
    let batches = sliding_window(Arc::clone(&limiter), &clock, tenant("tenant5"), per_batch, 3, gap_ms).await;
    for (i, report) in batches.into_iter().enumerate() {
        results.push((format!("sliding_window[{}]", i + 1), report));
    }

    let burst = (max * 3 / 5).max(1);
    results.push((
        "burst[1]".to_string(),
        concurrent(Arc::clone(&limiter), tenant("tenant6"), burst).await,
    ));
    clock.advance(1_000);
    results.push((
        "burst[2]".to_string(),
        concurrent(Arc::clone(&limiter), tenant("tenant6"), burst).await,
    ));

    for (name, report) in &results {
        info!(
            scenario = %name,
            admitted = report.admitted,
            denied = report.denied,
            errors = report.errors,
            "Scenario finished"
        );
    }
    results
}
