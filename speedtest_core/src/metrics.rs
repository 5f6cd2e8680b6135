use std::collections::BTreeMap;

use crate::result::{LatencyStats, SpeedTestResult, Transfer};

pub const PING_LATENCY: &str = "speedtest_ping_latency";
pub const DOWNLOAD_BANDWIDTH: &str = "speedtest_download_bandwidth";
pub const DOWNLOAD_LATENCY: &str = "speedtest_download_latency";
pub const UPLOAD_BANDWIDTH: &str = "speedtest_upload_bandwidth";
pub const UPLOAD_LATENCY: &str = "speedtest_upload_latency";
pub const PACKET_LOSS: &str = "speedtest_packet_loss";

/// A single measurement, plus labels that only apply to this measurement
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricValue {
    pub value: f64,
    pub labels: BTreeMap<String, String>,
}

impl MetricValue {
    pub fn new(value: f64) -> Self {
        MetricValue {
            value,
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, name: &str, value: String) -> Self {
        self.labels.insert(name.to_string(), value);
        self
    }
}

/// Measurements keyed by metric name
pub type Metrics = BTreeMap<String, Vec<MetricValue>>;

/// Maps a speedtest result onto its metric series.
///
/// Every metric is always present, even when the measurement is zero.
pub fn build_metrics(result: &SpeedTestResult) -> Metrics {
    let ping = &result.ping;
    let mut metrics = Metrics::new();
    metrics.insert(
        PING_LATENCY.into(),
        vec![MetricValue::new(ping.latency)
            .with_label("jitter", format!("{:.2}", ping.jitter))
            .with_label("low", format!("{:.2}", ping.low))
            .with_label("high", format!("{:.2}", ping.high))],
    );
    metrics.insert(
        DOWNLOAD_BANDWIDTH.into(),
        vec![bandwidth(&result.download)],
    );
    metrics.insert(
        DOWNLOAD_LATENCY.into(),
        vec![latency(&result.download.latency)],
    );
    metrics.insert(UPLOAD_BANDWIDTH.into(), vec![bandwidth(&result.upload)]);
    metrics.insert(UPLOAD_LATENCY.into(), vec![latency(&result.upload.latency)]);
    metrics.insert(
        PACKET_LOSS.into(),
        vec![MetricValue::new(result.packet_loss)],
    );
    metrics
}

fn bandwidth(transfer: &Transfer) -> MetricValue {
    MetricValue::new(transfer.bandwidth as f64)
        .with_label("bytes", transfer.bytes.to_string())
        .with_label("elapsed", transfer.elapsed.to_string())
}

fn latency(stats: &LatencyStats) -> MetricValue {
    MetricValue::new(stats.iqm)
        .with_label("jitter", format!("{:.2}", stats.jitter))
        .with_label("low", format!("{:.2}", stats.low))
        .with_label("high", format!("{:.2}", stats.high))
        .with_label("iqm", format!("{:.2}", stats.iqm))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::labels::{parse_labels, static_labels};

    const ALL_METRICS: [&str; 6] = [
        PING_LATENCY,
        DOWNLOAD_BANDWIDTH,
        DOWNLOAD_LATENCY,
        UPLOAD_BANDWIDTH,
        UPLOAD_LATENCY,
        PACKET_LOSS,
    ];

    fn names(metrics: &Metrics) -> Vec<&str> {
        let mut names = metrics.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    fn expected_names() -> Vec<&'static str> {
        let mut names = ALL_METRICS.to_vec();
        names.sort_unstable();
        names
    }

    #[test]
    fn always_builds_every_metric() {
        let zero = SpeedTestResult::default();
        let mut extreme = SpeedTestResult::default();
        extreme.ping.latency = -1.0;
        extreme.download.bandwidth = i64::MAX;
        extreme.upload.bandwidth = i64::MIN;
        extreme.upload.latency.iqm = f64::MAX;
        extreme.packet_loss = f64::INFINITY;

        for result in &[zero, extreme] {
            let metrics = build_metrics(result);
            assert_eq!(names(&metrics), expected_names());
            assert!(metrics.values().all(|values| values.len() == 1));
        }
    }

    #[test]
    fn formats_side_labels() {
        let mut result = SpeedTestResult::default();
        result.download.bandwidth = 5000000;
        result.download.bytes = 62500000;
        result.download.elapsed = 10000;
        result.upload.latency.iqm = 20.456;
        result.upload.latency.jitter = 3.0;
        result.upload.latency.low = 0.004;
        result.upload.latency.high = 99.999;
        result.packet_loss = 0.5;

        let metrics = build_metrics(&result);

        let download = &metrics[DOWNLOAD_BANDWIDTH][0];
        assert_eq!(download.value, 5000000.0);
        assert_eq!(download.labels["bytes"], "62500000");
        assert_eq!(download.labels["elapsed"], "10000");
        assert_eq!(download.labels.len(), 2);

        let upload = &metrics[UPLOAD_LATENCY][0];
        assert_eq!(upload.value, 20.456);
        assert_eq!(upload.labels["iqm"], "20.46");
        assert_eq!(upload.labels["jitter"], "3.00");
        assert_eq!(upload.labels["low"], "0.00");
        assert_eq!(upload.labels["high"], "100.00");

        let packet_loss = &metrics[PACKET_LOSS][0];
        assert_eq!(packet_loss.value, 0.5);
        assert!(packet_loss.labels.is_empty());
    }

    #[test]
    fn maps_a_full_result() {
        let result = SpeedTestResult::from_json(
            br#"{
                "ping": {"latency": 12.3, "jitter": 1.1, "low": 10.0, "high": 15.0},
                "download": {"bandwidth": 5000000, "bytes": 62500000, "elapsed": 10000},
                "upload": {"bandwidth": 5000000, "bytes": 62500000, "elapsed": 10000},
                "packetLoss": 0.01,
                "isp": "Acme",
                "server": {"id": 42, "name": "SrvA"},
                "result": {"id": "abc", "url": "http://x"}
            }"#,
        )
        .unwrap();
        let extra = parse_labels("env=prod").unwrap();

        let metrics = build_metrics(&result);
        assert_eq!(metrics.len(), 6);

        let ping = &metrics[PING_LATENCY][0];
        assert_eq!(ping.value, 12.3);
        assert_eq!(ping.labels.len(), 3);
        assert_eq!(ping.labels["jitter"], "1.10");
        assert_eq!(ping.labels["low"], "10.00");
        assert_eq!(ping.labels["high"], "15.00");

        let labels = static_labels(&result, &extra);
        assert!(labels.contains(&("isp".to_string(), "Acme".to_string())));
        assert!(labels.contains(&("server_id".to_string(), "42".to_string())));
        assert!(labels.contains(&("env".to_string(), "prod".to_string())));
    }
}
