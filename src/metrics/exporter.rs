//! Export cache metrics.

use crate::metrics::{area_metric, AreaMetrics, MetricDoc, MetricType};

pub struct ExporterMetrics;

impl ExporterMetrics {
    pub fn record_cache_hit() {
        ::metrics::counter!(area_metric!(counter, "exporter", "cache_hits")).increment(1);
    }

    pub fn record_cache_miss() {
        ::metrics::counter!(area_metric!(counter, "exporter", "cache_misses")).increment(1);
    }

    /// One pass of the disk cache checker over `folder`.
    pub fn record_cache_check(folder: &str, size_bytes: u64, evicted_files: usize) {
        ::metrics::gauge!(area_metric!(gauge, "exporter", "cache_size_bytes"), "folder" => folder.to_string())
            .set(size_bytes as f64);
        ::metrics::counter!(area_metric!(counter, "exporter", "cache_evictions"), "folder" => folder.to_string())
            .increment(evicted_files as u64);
    }
}

impl AreaMetrics for ExporterMetrics {
    fn register_metrics() {
        use metrics::{describe_counter, describe_gauge};

        describe_counter!(
            area_metric!(counter, "exporter", "cache_hits"),
            "Exports served from the disk cache"
        );
        describe_counter!(
            area_metric!(counter, "exporter", "cache_misses"),
            "Exports generated and written to the disk cache"
        );
        describe_counter!(
            area_metric!(counter, "exporter", "cache_evictions"),
            "Files evicted from cache folders"
        );
        describe_gauge!(
            area_metric!(gauge, "exporter", "cache_size_bytes"),
            "Cache folder size after the last check"
        );
    }

    fn area_name() -> &'static str {
        "exporter"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: area_metric!(counter, "exporter", "cache_hits"),
                metric_type: MetricType::Counter,
                help: "Exports served from the disk cache",
            },
            MetricDoc {
                name: area_metric!(counter, "exporter", "cache_misses"),
                metric_type: MetricType::Counter,
                help: "Exports generated and written to the disk cache",
            },
            MetricDoc {
                name: area_metric!(counter, "exporter", "cache_evictions"),
                metric_type: MetricType::Counter,
                help: "Files evicted from cache folders",
            },
            MetricDoc {
                name: area_metric!(gauge, "exporter", "cache_size_bytes"),
                metric_type: MetricType::Gauge,
                help: "Cache folder size after the last check",
            },
        ]
    }
}
