use {
    anyhow::{Context, Result, ensure},
    std::{str::FromStr, sync::Arc, time::Duration},
    tokio::{
        sync::{Mutex, OwnedSemaphorePermit, Semaphore},
        time::Instant,
    },
};

/// The request budget a limiter enforces against one endpoint class.
///
/// The realized throughput is always slightly below `requests_per_second`
/// which leaves some headroom against the remote quota.
#[derive(Debug, Clone, PartialEq)]
pub struct RateBudget {
    requests_per_second: f64,
    max_concurrent: Option<usize>,
}

impl RateBudget {
    pub fn new(requests_per_second: f64, max_concurrent: Option<usize>) -> Result<Self> {
        ensure!(
            requests_per_second.is_finite() && requests_per_second > 0.,
            "requests per second must be a positive number"
        );
        if let Some(max_concurrent) = max_concurrent {
            ensure!(max_concurrent > 0, "max concurrent requests must be > 0");
        }
        Ok(Self {
            requests_per_second,
            max_concurrent,
        })
    }

    /// Minimum wall-clock gap between two admitted requests.
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs_f64(1. / self.requests_per_second)
    }

    pub fn max_concurrent(&self) -> Option<usize> {
        self.max_concurrent
    }
}

impl Default for RateBudget {
    fn default() -> Self {
        Self {
            requests_per_second: 1.,
            max_concurrent: None,
        }
    }
}

impl FromStr for RateBudget {
    type Err = anyhow::Error;

    fn from_str(config: &str) -> Result<Self> {
        let mut parts = config.split(',');
        let requests_per_second = parts
            .next()
            .context("rate budget is empty")?
            .parse()
            .context("parsing requests_per_second")?;
        let max_concurrent = parts
            .next()
            .map(|part| part.parse().context("parsing max_concurrent"))
            .transpose()?;
        ensure!(parts.next().is_none(), "extraneous rate budget parameters");
        Self::new(requests_per_second, max_concurrent)
    }
}

/// Spaces admissions of concurrent callers so that the gap between any two
/// admitted requests is at least the budget's minimum interval, and bounds
/// the number of requests in flight when the budget asks for it.
///
/// ```text
/// let _permit = limiter.acquire().await;
/// // issue the request; dropping the permit frees the concurrency slot
/// ```
pub struct RateLimiter {
    name: String,
    min_interval: Duration,
    // Only locked inside `acquire`. Spacing computation, the wait itself and
    // the clock update happen under this single lock so the minimum-interval
    // property holds across concurrent callers.
    last_admission: Mutex<Instant>,
    slots: Option<Arc<Semaphore>>,
}

/// Scoped admission to issue one request. Releasing the permit only frees
/// the concurrency slot; it does not affect the spacing clock.
#[must_use = "dropping the permit immediately frees the concurrency slot"]
pub struct Permit {
    _slot: Option<OwnedSemaphorePermit>,
}

impl RateLimiter {
    pub fn from_budget(budget: RateBudget, name: String) -> Self {
        Self {
            name,
            min_interval: budget.min_interval(),
            last_admission: Mutex::new(Instant::now()),
            slots: budget
                .max_concurrent()
                .map(|slots| Arc::new(Semaphore::new(slots))),
        }
    }

    /// Suspends the caller until it may issue a request without busting the
    /// budget. Cancellation while suspended releases any slot already held.
    pub async fn acquire(&self) -> Permit {
        let slot = match &self.slots {
            Some(slots) => Some(
                slots
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed"),
            ),
            None => None,
        };
        {
            let mut last_admission = self.last_admission.lock().await;
            let wait = self.min_interval.saturating_sub(last_admission.elapsed());
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
            *last_admission = Instant::now();
        }
        Metrics::get()
            .rate_limiter_admissions
            .with_label_values(&[&self.name])
            .inc();
        Permit { _slot: slot }
    }
}

#[derive(prometheus_metric_storage::MetricStorage)]
struct Metrics {
    /// Number of admitted requests per rate limiter.
    #[metric(labels("limiter"))]
    rate_limiter_admissions: prometheus::IntCounterVec,
}

impl Metrics {
    fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }
}
