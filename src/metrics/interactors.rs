//! Interactor metrics: uploads, token lookups and PSICQUIC traffic.

use crate::metrics::{area_metric, AreaMetrics, MetricDoc, MetricType};

pub struct InteractorMetrics;

impl InteractorMetrics {
    pub fn record_upload(format: &'static str, interactions: usize) {
        ::metrics::counter!(area_metric!(counter, "interactors", "uploads"), "format" => format)
            .increment(1);
        ::metrics::histogram!(area_metric!(histogram, "interactors", "upload_interactions"))
            .record(interactions as f64);
    }

    pub fn record_upload_rejected() {
        ::metrics::counter!(area_metric!(counter, "interactors", "uploads_rejected")).increment(1);
    }

    pub fn record_token_lookup(hit: bool) {
        let outcome = if hit { "hit" } else { "miss" };
        ::metrics::counter!(area_metric!(counter, "interactors", "token_lookups"), "outcome" => outcome)
            .increment(1);
    }

    pub fn record_registry_refresh(resources: usize) {
        ::metrics::counter!(area_metric!(counter, "interactors", "registry_refreshes")).increment(1);
        ::metrics::gauge!(area_metric!(gauge, "interactors", "psicquic_resources"))
            .set(resources as f64);
    }

    pub fn record_registry_refresh_error() {
        ::metrics::counter!(area_metric!(counter, "interactors", "registry_refresh_errors"))
            .increment(1);
    }

    pub fn record_psicquic_query(duration_secs: f64) {
        ::metrics::histogram!(area_metric!(histogram, "interactors", "psicquic_query_duration_seconds"))
            .record(duration_secs);
    }
}

impl AreaMetrics for InteractorMetrics {
    fn register_metrics() {
        use metrics::{describe_counter, describe_gauge, describe_histogram};

        describe_counter!(
            area_metric!(counter, "interactors", "uploads"),
            "Custom interaction uploads stored under a token"
        );
        describe_counter!(
            area_metric!(counter, "interactors", "uploads_rejected"),
            "Custom interaction uploads that could not be parsed"
        );
        describe_counter!(
            area_metric!(counter, "interactors", "token_lookups"),
            "Token lookups by outcome"
        );
        describe_counter!(
            area_metric!(counter, "interactors", "registry_refreshes"),
            "Successful PSICQUIC registry refreshes"
        );
        describe_counter!(
            area_metric!(counter, "interactors", "registry_refresh_errors"),
            "Failed PSICQUIC registry refreshes"
        );
        describe_gauge!(
            area_metric!(gauge, "interactors", "psicquic_resources"),
            "Active PSICQUIC resources in the registry"
        );
        describe_histogram!(
            area_metric!(histogram, "interactors", "upload_interactions"),
            "Interactions parsed per upload"
        );
        describe_histogram!(
            area_metric!(histogram, "interactors", "psicquic_query_duration_seconds"),
            "PSICQUIC query round trip time"
        );
    }

    fn area_name() -> &'static str {
        "interactors"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: area_metric!(counter, "interactors", "uploads"),
                metric_type: MetricType::Counter,
                help: "Custom interaction uploads stored under a token",
            },
            MetricDoc {
                name: area_metric!(counter, "interactors", "uploads_rejected"),
                metric_type: MetricType::Counter,
                help: "Custom interaction uploads that could not be parsed",
            },
            MetricDoc {
                name: area_metric!(counter, "interactors", "token_lookups"),
                metric_type: MetricType::Counter,
                help: "Token lookups by outcome",
            },
            MetricDoc {
                name: area_metric!(counter, "interactors", "registry_refreshes"),
                metric_type: MetricType::Counter,
                help: "Successful PSICQUIC registry refreshes",
            },
            MetricDoc {
                name: area_metric!(counter, "interactors", "registry_refresh_errors"),
                metric_type: MetricType::Counter,
                help: "Failed PSICQUIC registry refreshes",
            },
            MetricDoc {
                name: area_metric!(gauge, "interactors", "psicquic_resources"),
                metric_type: MetricType::Gauge,
                help: "Active PSICQUIC resources in the registry",
            },
            MetricDoc {
                name: area_metric!(histogram, "interactors", "upload_interactions"),
                metric_type: MetricType::Histogram,
                help: "Interactions parsed per upload",
            },
            MetricDoc {
                name: area_metric!(histogram, "interactors", "psicquic_query_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "PSICQUIC query round trip time",
            },
        ]
    }
}
