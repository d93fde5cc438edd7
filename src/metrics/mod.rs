//! Prometheus metrics, grouped by service area.
//!
//! Each area declares its metrics in a dedicated submodule. The recorder is
//! installed once at startup; the rendered snapshot is served by the HTTP
//! server at `/metrics`.

pub mod exporter;
pub mod interactors;
pub mod registry;
pub mod search;

pub use exporter::ExporterMetrics;
pub use interactors::InteractorMetrics;
pub use search::SearchMetrics;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder and describes every metric. Idempotent.
pub fn init_metrics() {
    INIT.call_once(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_err() {
                warn!("Prometheus handle was already set");
            }
            registry::register_all_metrics();
            info!("Prometheus recorder installed");
        }
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
        }
    });
}

/// Text exposition of the current metric values, if the recorder is installed.
pub fn render() -> Option<String> {
    HANDLE.get().map(PrometheusHandle::render)
}

/// Metrics owned by one area of the service.
pub trait AreaMetrics {
    fn register_metrics();

    fn area_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
}

#[derive(Debug, Clone)]
pub enum MetricType {
    Counter,
    Histogram,
    Gauge,
}

/// Builds `content_service_{area}_{name}` metric names, `_total` for counters.
macro_rules! area_metric {
    (counter, $area:literal, $name:literal) => {
        concat!("content_service_", $area, "_", $name, "_total")
    };
    (histogram, $area:literal, $name:literal) => {
        concat!("content_service_", $area, "_", $name)
    };
    (gauge, $area:literal, $name:literal) => {
        concat!("content_service_", $area, "_", $name)
    };
}

pub(crate) use area_metric;
