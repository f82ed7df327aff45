//! Metrics facade helpers, one per broker counter.

use metrics::{counter, gauge};

pub fn record_message_sent() {
    counter!("broker_messages_total").increment(1);
}

pub fn record_pipe_created() {
    counter!("broker_pipes_total").increment(1);
}

pub fn record_queue_event() {
    counter!("broker_queue_events_total").increment(1);
}

pub fn record_active_connections(count: u64) {
    gauge!("broker_active_connections").set(count as f64);
}
