//! Prometheus metrics for the Text Lab server.
//!
//! Provides metrics collection and a Prometheus-compatible `/metrics` endpoint.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

const COMMITS_TOTAL: &str = "textlab_commits_total";
const POINTER_EVENTS_TOTAL: &str = "textlab_pointer_events_total";
const HISTORY_STEPS_TOTAL: &str = "textlab_history_steps_total";
const DRAFT_REQUESTS_TOTAL: &str = "textlab_draft_requests_total";
const REJECTED_CANDIDATES_TOTAL: &str = "textlab_rejected_candidates_total";
const EXPORTS_TOTAL: &str = "textlab_exports_total";
const VALIDATION_FAILURES_TOTAL: &str = "textlab_validation_failures_total";
const SCENE_ELEMENTS: &str = "textlab_scene_elements";

/// Initialize metrics and return the Prometheus handle.
///
/// # Errors
///
/// Returns an error if the Prometheus recorder cannot be installed
/// (e.g., if another recorder is already installed).
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Record a history commit.
///
/// # Arguments
///
/// * `operation` - Operation that committed (add, update, gesture, ...)
pub fn record_commit(operation: &'static str) {
    counter!(COMMITS_TOTAL, "operation" => operation).increment(1);
}

/// Record an undo or redo that moved the history cursor.
pub fn record_history_step(direction: &'static str) {
    counter!(HISTORY_STEPS_TOTAL, "direction" => direction).increment(1);
}

/// Record a pointer event and its outcome.
pub fn record_pointer_event(outcome: &'static str) {
    counter!(POINTER_EVENTS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a draft request.
///
/// # Arguments
///
/// * `service` - Layout service name ("gemini" or "sample")
/// * `outcome` - "ready", "failed", "stale", "rejected" or "abandoned"
pub fn record_draft_request(service: &'static str, outcome: &'static str) {
    counter!(
        DRAFT_REQUESTS_TOTAL,
        "service" => service,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record AI candidates dropped by validation.
pub fn record_rejected_candidates(count: usize) {
    if count > 0 {
        counter!(REJECTED_CANDIDATES_TOTAL).increment(count as u64);
    }
}

/// Record an export.
pub fn record_export(format: &'static str, success: bool) {
    counter!(
        EXPORTS_TOTAL,
        "format" => format,
        "success" => success.to_string()
    )
    .increment(1);
}

/// Record an input validation failure.
///
/// # Arguments
///
/// * `validation_type` - Type of validation that failed (session_id, element_id, prompt, etc.)
pub fn record_validation_failure(validation_type: &'static str) {
    counter!(VALIDATION_FAILURES_TOTAL, "type" => validation_type).increment(1);
}

/// Update the element count of a session's committed scene.
#[allow(clippy::cast_precision_loss)]
pub fn set_scene_elements(session_id: &str, count: usize) {
    gauge!(SCENE_ELEMENTS, "session" => session_id.to_string()).set(count as f64);
}
