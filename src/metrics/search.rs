//! Search metrics: query volume, latency and empty results.

use crate::metrics::{area_metric, AreaMetrics, MetricDoc, MetricType};

pub struct SearchMetrics;

impl SearchMetrics {
    pub fn record_query(operation: &'static str, duration_secs: f64, found: usize) {
        ::metrics::counter!(area_metric!(counter, "search", "queries"), "operation" => operation)
            .increment(1);
        ::metrics::histogram!(area_metric!(histogram, "search", "query_duration_seconds"))
            .record(duration_secs);
        if found == 0 {
            ::metrics::counter!(area_metric!(counter, "search", "empty_results")).increment(1);
        }
    }

    pub fn record_backend_error(operation: &'static str) {
        ::metrics::counter!(area_metric!(counter, "search", "backend_errors"), "operation" => operation)
            .increment(1);
    }
}

impl AreaMetrics for SearchMetrics {
    fn register_metrics() {
        use metrics::{describe_counter, describe_histogram};

        describe_counter!(
            area_metric!(counter, "search", "queries"),
            "Search requests sent to the search backend"
        );
        describe_counter!(
            area_metric!(counter, "search", "empty_results"),
            "Search requests that matched nothing"
        );
        describe_counter!(
            area_metric!(counter, "search", "backend_errors"),
            "Failed calls to the search backend"
        );
        describe_histogram!(
            area_metric!(histogram, "search", "query_duration_seconds"),
            "Search backend round trip time"
        );
    }

    fn area_name() -> &'static str {
        "search"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: area_metric!(counter, "search", "queries"),
                metric_type: MetricType::Counter,
                help: "Search requests sent to the search backend",
            },
            MetricDoc {
                name: area_metric!(counter, "search", "empty_results"),
                metric_type: MetricType::Counter,
                help: "Search requests that matched nothing",
            },
            MetricDoc {
                name: area_metric!(counter, "search", "backend_errors"),
                metric_type: MetricType::Counter,
                help: "Failed calls to the search backend",
            },
            MetricDoc {
                name: area_metric!(histogram, "search", "query_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Search backend round trip time",
            },
        ]
    }
}
