//! Metric names and the optional Prometheus exporter.

use std::net::{Ipv4Addr, SocketAddr};

use crate::error::{Error, Result};

pub const CONNECTIONS_ACCEPTED: &str = "nio_lab_connections_accepted_total";
pub const CONNECTIONS_OPEN: &str = "nio_lab_connections_open_current";
pub const BYTES_READ: &str = "nio_lab_bytes_read_total";
pub const BYTES_WRITTEN: &str = "nio_lab_bytes_written_total";
pub const ROUNDS: &str = "nio_lab_rounds_total";
pub const FILE_BYTES_COPIED: &str = "nio_lab_file_bytes_copied_total";

/// Installs the global recorder and serves it at `http://127.0.0.1:{port}/metrics`.
///
/// Until this is called every counter is a no-op.
pub fn install_prometheus(port: u16) -> Result<SocketAddr> {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| Error::Metrics(e.to_string()))?;
    log::info!("metrics enabled at http://{addr}/metrics");

    Ok(addr)
}
