//! Optional metrics instrumentation for strata.
//!
//! When the `observe` feature is enabled, key operations emit counters and
//! histograms via the [`metrics`] crate. A downstream application must
//! install a metrics recorder (e.g. `metrics-exporter-prometheus`) to
//! collect the data.
//!
//! When the feature is **not** enabled every function in this module is a
//! zero-cost no-op.

/// Record an effective push (counter with `action` label).
///
/// - `strata.push.total` – incremented on every insert/update
#[inline]
pub fn record_push(action: &'static str) {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("strata.push.total", "action" => action).increment(1);
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = action;
    }
}

/// Record a read query (counter + latency histogram, `kind` label).
///
/// - `strata.query.total` – counter
/// - `strata.query.duration_seconds` – histogram of query latency
#[inline]
pub fn record_query(kind: &'static str, duration: std::time::Duration) {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("strata.query.total", "kind" => kind).increment(1);
        metrics::histogram!("strata.query.duration_seconds", "kind" => kind)
            .record(duration.as_secs_f64());
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = (kind, duration);
    }
}
