//! Prometheus metrics for the Hunter console.
//!
//! # Panics
//!
//! Registration uses `expect()`: a failure means duplicate metric names, a
//! programming error that should crash at first use rather than silently
//! drop metrics. It never happens at steady state.

use hunter_core::ConnectionState;
use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, register_int_gauge_vec,
    Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Connection state machine current state (1 = active, 0 = inactive).
pub static CONNECTION_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "hunter_connection_state",
        "Stream connection state (1=active, 0=inactive)",
        &["state"]
    )
    .expect("register hunter_connection_state")
});

/// Stream connections opened.
pub static CONNECTIONS_OPENED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "hunter_connections_opened_total",
        "Stream connections opened"
    )
    .expect("register hunter_connections_opened_total")
});

/// Stream closes by disposition (unauthorized/failed).
pub static CLOSES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "hunter_closes_total",
        "Stream closes reported by the remote or transport",
        &["disposition"]
    )
    .expect("register hunter_closes_total")
});

/// Routed frames by kind.
pub static FRAMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "hunter_frames_total",
        "Inbound frames by routed kind",
        &["kind"]
    )
    .expect("register hunter_frames_total")
});

/// Frames that were not valid JSON.
pub static PARSE_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "hunter_parse_errors_total",
        "Inbound frames that failed to parse"
    )
    .expect("register hunter_parse_errors_total")
});

/// Detections received. Unlabelled: the venue name comes from the remote.
pub static DETECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("hunter_detections_total", "Detections received")
        .expect("register hunter_detections_total")
});

/// Bounded store occupancy.
/// Labels: store (logs/detections)
pub static STORE_LEN: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "hunter_store_len",
        "Entries currently held by each bounded store",
        &["store"]
    )
    .expect("register hunter_store_len")
});

/// Credential submissions by result (accepted/empty).
pub static SUBMISSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "hunter_credential_submissions_total",
        "Viewer key submissions",
        &["result"]
    )
    .expect("register hunter_credential_submissions_total")
});

/// Connected dashboard WebSocket clients.
pub static DASHBOARD_CLIENTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "hunter_dashboard_clients",
        "Connected dashboard WebSocket clients"
    )
    .expect("register hunter_dashboard_clients")
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Set the active connection state. All other states are reset to 0.
    pub fn connection_state_set(state: ConnectionState) {
        for s in ConnectionState::ALL {
            CONNECTION_STATE.with_label_values(&[s.as_str()]).set(0);
        }
        CONNECTION_STATE.with_label_values(&[state.as_str()]).set(1);
    }

    pub fn connection_opened() {
        CONNECTIONS_OPENED_TOTAL.inc();
    }

    pub fn connection_closed(disposition: &str) {
        CLOSES_TOTAL.with_label_values(&[disposition]).inc();
    }

    pub fn frame_routed(kind: &str) {
        FRAMES_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn parse_error() {
        PARSE_ERRORS_TOTAL.inc();
    }

    pub fn detection() {
        DETECTIONS_TOTAL.inc();
    }

    /// Record bounded store lengths.
    pub fn store_lengths(logs: usize, detections: usize) {
        STORE_LEN.with_label_values(&["logs"]).set(logs as i64);
        STORE_LEN
            .with_label_values(&["detections"])
            .set(detections as i64);
    }

    pub fn credential_submitted(result: &str) {
        SUBMISSIONS_TOTAL.with_label_values(&[result]).inc();
    }

    pub fn dashboard_client_connected() {
        DASHBOARD_CLIENTS.inc();
    }

    pub fn dashboard_client_disconnected() {
        DASHBOARD_CLIENTS.dec();
    }

    /// Prometheus text exposition of the default registry.
    pub fn render() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_is_one_hot() {
        Metrics::connection_state_set(ConnectionState::Connecting);
        Metrics::connection_state_set(ConnectionState::Connected);

        let active: Vec<_> = ConnectionState::ALL
            .iter()
            .filter(|s| CONNECTION_STATE.with_label_values(&[s.as_str()]).get() == 1)
            .collect();
        assert_eq!(active, vec![&ConnectionState::Connected]);
    }

    #[test]
    fn test_detections_are_a_single_series() {
        for _ in 0..50 {
            Metrics::detection();
        }
        let family = prometheus::gather()
            .into_iter()
            .find(|f| f.get_name() == "hunter_detections_total")
            .unwrap();
        assert_eq!(family.get_metric().len(), 1);
        assert!(family.get_metric()[0].get_label().is_empty());
        assert!(DETECTIONS_TOTAL.get() >= 50);
    }

    #[test]
    fn test_render_includes_recorded_metrics() {
        Metrics::frame_routed("news");
        Metrics::detection();
        Metrics::store_lengths(3, 1);

        let text = Metrics::render().unwrap();
        assert!(text.contains("hunter_frames_total{kind=\"news\"}"));
        assert!(text.contains("hunter_detections_total "));
        assert!(text.contains("hunter_store_len{store=\"logs\"} 3"));
    }
}
