use tracing::trace;

// Trace-based counters; the Prometheus handle only renders what a recorder
// has seen, so these stay as structured events for now.

pub fn inc_requests(route: &'static str) {
    trace!(
        target = "catalog.metrics",
        route = route,
        "requests_total_inc"
    );
}

pub fn dispatch_elapsed(outcome: &'static str, elapsed_ms: u128) {
    trace!(
        target = "catalog.metrics",
        outcome = outcome,
        elapsed_ms = elapsed_ms as u64,
        "dispatch_elapsed"
    );
}

pub fn queue_depth(depth: usize) {
    trace!(
        target = "catalog.metrics",
        depth = depth as u64,
        "queue_depth"
    );
}
