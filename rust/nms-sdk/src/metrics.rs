//! Usage metrics overlay: named queries, response parsing, display formatting.

use crate::model::{MetricSample, SubscriberMetrics};
use serde_json::Value;
use std::collections::HashMap;

/// Label carrying the subscriber id on usage series.
pub const SUBSCRIBER_LABEL: &str = "IMSI";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsQuery {
    CurrentUsage,
    DailyAverage,
}

impl MetricsQuery {
    pub fn expression(&self) -> &'static str {
        match self {
            MetricsQuery::CurrentUsage => "sum(ue_reported_usage) by (IMSI)",
            MetricsQuery::DailyAverage => "avg(avg_over_time(ue_reported_usage[24h])) by (IMSI)",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MetricsQuery::CurrentUsage => "current_usage",
            MetricsQuery::DailyAverage => "daily_avg",
        }
    }

    fn apply(&self, metrics: &mut SubscriberMetrics, display: String) {
        match self {
            MetricsQuery::CurrentUsage => metrics.current_usage = Some(display),
            MetricsQuery::DailyAverage => metrics.daily_avg = Some(display),
        }
    }
}

/// Extract `(IMSI, value)` pairs from an instant-vector query response.
/// Series without the subscriber label or a value are skipped.
pub fn parse_vector_response(body: &Value) -> Vec<MetricSample> {
    let results = body
        .get("data")
        .and_then(|d| d.get("result"))
        .and_then(Value::as_array);

    let Some(results) = results else {
        return Vec::new();
    };

    results
        .iter()
        .filter_map(|series| {
            let key = series
                .get("metric")?
                .get(SUBSCRIBER_LABEL)?
                .as_str()?
                .to_string();
            let value = series.get("value")?.get(1)?.as_str()?.to_string();
            Some(MetricSample { key, value })
        })
        .collect()
}

/// Human readable byte count, e.g. `1.50 MB`. Unparseable values pass through.
pub fn format_usage(raw: &str) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let Ok(mut value) = raw.trim().parse::<f64>() else {
        return raw.to_string();
    };
    if !value.is_finite() {
        return raw.to_string();
    }

    let mut unit = 0;
    while value.abs() >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", value.round(), UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

/// Fold one query's samples into the overlay being built.
pub fn merge_samples(
    overlay: &mut HashMap<String, SubscriberMetrics>,
    query: &MetricsQuery,
    samples: Vec<MetricSample>,
) {
    for sample in samples {
        let entry = overlay.entry(sample.key).or_default();
        query.apply(entry, format_usage(&sample.value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_vector_response() {
        let body = json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {"metric": {"IMSI": "IMSI001010000000001"}, "value": [1700000000.0, "1500000"]},
                    {"metric": {"IMSI": "IMSI001010000000002"}, "value": [1700000000.0, "42"]},
                    {"metric": {}, "value": [1700000000.0, "7"]}
                ]
            }
        });

        let samples = parse_vector_response(&body);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].key, "IMSI001010000000001");
        assert_eq!(samples[0].value, "1500000");
    }

    #[test]
    fn test_parse_unexpected_shape_is_empty() {
        assert!(parse_vector_response(&json!({"status": "error"})).is_empty());
        assert!(parse_vector_response(&json!([])).is_empty());
    }

    #[test]
    fn test_format_usage() {
        assert_eq!(format_usage("42"), "42 B");
        assert_eq!(format_usage("1500000"), "1.50 MB");
        assert_eq!(format_usage("2000000000"), "2.00 GB");
        assert_eq!(format_usage("NaN"), "NaN");
        assert_eq!(format_usage("n/a"), "n/a");
    }

    #[test]
    fn test_merge_samples_across_queries() {
        let mut overlay = HashMap::new();
        merge_samples(
            &mut overlay,
            &MetricsQuery::CurrentUsage,
            vec![MetricSample {
                key: "IMSI001010000000001".to_string(),
                value: "1500".to_string(),
            }],
        );
        merge_samples(
            &mut overlay,
            &MetricsQuery::DailyAverage,
            vec![MetricSample {
                key: "IMSI001010000000001".to_string(),
                value: "500".to_string(),
            }],
        );

        let metrics = &overlay["IMSI001010000000001"];
        assert_eq!(metrics.current_usage.as_deref(), Some("1.50 KB"));
        assert_eq!(metrics.daily_avg.as_deref(), Some("500 B"));
    }
}
