//! Registers every area's metrics and reports name clashes.

use crate::metrics::{AreaMetrics, MetricDoc};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();

    register_area_metrics::<super::search::SearchMetrics>(&mut all_metrics);
    register_area_metrics::<super::interactors::InteractorMetrics>(&mut all_metrics);
    register_area_metrics::<super::exporter::ExporterMetrics>(&mut all_metrics);

    info!("Registered {} metrics", all_metrics.len());
}

fn register_area_metrics<T: AreaMetrics>(all_metrics: &mut HashMap<&'static str, MetricDoc>) {
    T::register_metrics();
    for doc in T::metrics_documentation() {
        if all_metrics.contains_key(doc.name) {
            warn!(
                "Metric '{}' registered twice (area '{}')",
                doc.name,
                T::area_name()
            );
            continue;
        }
        debug!("{} ({:?}): {}", doc.name, doc.metric_type, doc.help);
        all_metrics.insert(doc.name, doc);
    }
}

/// Area part of a metric name, e.g. `content_service_search_queries_total` -> `search`.
pub fn area_of(metric_name: &str) -> Option<&str> {
    let rest = metric_name.strip_prefix("content_service_")?;
    rest.find('_').map(|end| &rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{ExporterMetrics, InteractorMetrics, SearchMetrics};

    #[test]
    fn test_area_of() {
        assert_eq!(area_of("content_service_search_queries_total"), Some("search"));
        assert_eq!(area_of("content_service_exporter_cache_size_bytes"), Some("exporter"));
        assert_eq!(area_of("other_metric"), None);
    }

    #[test]
    fn test_documented_names_belong_to_their_area() {
        for doc in SearchMetrics::metrics_documentation() {
            assert_eq!(area_of(doc.name), Some(SearchMetrics::area_name()));
        }
        for doc in InteractorMetrics::metrics_documentation() {
            assert_eq!(area_of(doc.name), Some(InteractorMetrics::area_name()));
        }
        for doc in ExporterMetrics::metrics_documentation() {
            assert_eq!(area_of(doc.name), Some(ExporterMetrics::area_name()));
        }
    }
}
