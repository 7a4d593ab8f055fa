use std::time::Duration;

#[cfg(feature = "metrics")]
pub use metrics_exporter_prometheus::PrometheusHandle;

/// Install the Prometheus recorder and return the handle for scraping.
#[cfg(feature = "metrics")]
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
    Ok(handle)
}

/// Records one descriptor build.
#[cfg(feature = "metrics")]
pub(crate) fn record_descriptor_build(type_name: &'static str, elapsed: Duration) {
    metrics::counter!("rowmap.descriptor.builds", "type" => type_name).increment(1);
    metrics::histogram!("rowmap.descriptor.build_ms", "type" => type_name)
        .record(elapsed.as_secs_f64() * 1000.0);
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record_descriptor_build(_type_name: &'static str, _elapsed: Duration) {}
