//! Prometheus metrics for the search layer.
//!
//! Every metric lives in a crate-owned registry so hosting applications can
//! merge it into their own exposition endpoint through [`gather_metrics`].
//! Recording is infallible; a missing registration only means the series is
//! not exported.
//!
//! # Example
//! ```no_run
//! use catalog_search::metrics::{init_metrics, gather_metrics};
//!
//! init_metrics().ok();
//! println!("{}", gather_metrics());
//! ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, Histogram, HistogramOpts, Opts, Registry};

const NAMESPACE: &str = "catalog_search";

lazy_static! {
    /// Registry for all search layer metrics
    pub static ref SEARCH_REGISTRY: Registry = Registry::new();

    /// Searches dispatched by outcome
    ///
    /// Labels: outcome (success, degraded, config_error)
    pub static ref SEARCHES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("searches_total", "Total number of dispatched searches")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create SEARCHES_TOTAL metric");

    /// Full search round trip duration in seconds
    pub static ref SEARCH_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "search_duration_seconds",
            "Search round trip duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])
    ).expect("Failed to create SEARCH_DURATION_SECONDS metric");

    /// Spelling classifications computed (cache misses only)
    ///
    /// Labels: spelling_type
    pub static ref SPELLING_CLASSIFICATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            "spelling_classifications_total",
            "Total number of computed spelling classifications"
        )
        .namespace(NAMESPACE),
        &["spelling_type"]
    ).expect("Failed to create SPELLING_CLASSIFICATIONS_TOTAL metric");

    /// Term statistics probes sent to the engine
    ///
    /// Labels: outcome (success, failure)
    pub static ref SPELLING_PROBES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("spelling_probes_total", "Total number of term statistics probes")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create SPELLING_PROBES_TOTAL metric");

    /// Optimizers applied to assembled documents
    ///
    /// Labels: model (constant_score, popularity)
    pub static ref OPTIMIZERS_APPLIED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("optimizers_applied_total", "Total number of applied optimizers")
            .namespace(NAMESPACE),
        &["model"]
    ).expect("Failed to create OPTIMIZERS_APPLIED_TOTAL metric");
}

/// Register all metrics with [`SEARCH_REGISTRY`]
///
/// Fails with `AlreadyReg` when called twice.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    SEARCH_REGISTRY.register(Box::new(SEARCHES_TOTAL.clone()))?;
    SEARCH_REGISTRY.register(Box::new(SEARCH_DURATION_SECONDS.clone()))?;
    SEARCH_REGISTRY.register(Box::new(SPELLING_CLASSIFICATIONS_TOTAL.clone()))?;
    SEARCH_REGISTRY.register(Box::new(SPELLING_PROBES_TOTAL.clone()))?;
    SEARCH_REGISTRY.register(Box::new(OPTIMIZERS_APPLIED_TOTAL.clone()))?;

    tracing::debug!("Search metrics registered");
    Ok(())
}

/// Render all registered metrics in the Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = SEARCH_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

pub(crate) fn record_search(outcome: &str, elapsed: std::time::Duration) {
    SEARCHES_TOTAL.with_label_values(&[outcome]).inc();
    SEARCH_DURATION_SECONDS.observe(elapsed.as_secs_f64());
}
