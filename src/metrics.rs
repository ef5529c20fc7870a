// src/metrics.rs
use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const ENV_METRICS_ADDR: &str = "METRICS_ADDR";

/// Parse `METRICS_ADDR` (e.g. `0.0.0.0:9000`); blank or unset means no exporter.
pub fn metrics_addr_from_env() -> Result<Option<SocketAddr>> {
    match std::env::var(ENV_METRICS_ADDR) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid {ENV_METRICS_ADDR} {v:?}")),
        _ => Ok(None),
    }
}

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
/// Must be called from inside the Tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;
    crate::ingest::ensure_metrics_described();
    tracing::info!(target: "watch", %addr, "metrics exporter listening");
    Ok(())
}
