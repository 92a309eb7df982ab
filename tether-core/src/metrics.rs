// ABOUTME: Counters for relay, outbound send and task-queue activity
// ABOUTME: Thin wrappers over the `metrics` facade; no-ops until a recorder is installed

use metrics::counter;

/// Inbound event relayed to the router as a full message
pub fn record_inbound_relayed(platform: &str) {
    counter!("tether_inbound_relayed_total", "platform" => platform.to_string()).increment(1);
}

/// Inbound event catalogued as metadata only (unregistered conversation)
pub fn record_inbound_catalogued(platform: &str) {
    counter!("tether_inbound_catalogued_total", "platform" => platform.to_string()).increment(1);
}

/// Inbound event dropped before translation (`reason`: bot, no_context, empty)
pub fn record_inbound_dropped(platform: &str, reason: &'static str) {
    counter!(
        "tether_inbound_dropped_total",
        "platform" => platform.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// One outbound chunk delivered
pub fn record_chunk_sent(platform: &str) {
    counter!("tether_outbound_chunks_total", "platform" => platform.to_string()).increment(1);
}

/// Outbound send abandoned (`kind`: disconnected, resolution, transport)
pub fn record_send_failure(platform: &str, kind: &'static str) {
    counter!(
        "tether_outbound_failures_total",
        "platform" => platform.to_string(),
        "kind" => kind
    )
    .increment(1);
}

/// Task file published by a producer
pub fn record_task_written() {
    counter!("tether_tasks_written_total").increment(1);
}

/// Due task file consumed
pub fn record_task_taken() {
    counter!("tether_tasks_taken_total").increment(1);
}

/// Task file that failed to parse and was set aside
pub fn record_task_invalid() {
    counter!("tether_tasks_invalid_total").increment(1);
}
