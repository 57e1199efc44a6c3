//! # Metrics Collection
//!
//! Counters emitted through the `metrics` facade.

use metrics::counter;

/// Records gantry's counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn new() -> Self {
        Self
    }

    /// A storage-touching backend call (`get`, `publish`, ...).
    pub fn record_backend_operation(&self, backend: &'static str, operation: &'static str) {
        counter!("gantry_backend_operations_total", "backend" => backend, "operation" => operation)
            .increment(1);
    }

    /// An object created by access provisioning (`namespace`, `user`, `role`, `permission`).
    pub fn record_provisioning_create(&self, backend: &'static str, kind: &'static str) {
        counter!("gantry_provisioning_creates_total", "backend" => backend, "kind" => kind)
            .increment(1);
    }

    /// Writes applied by one synchronization pass.
    pub fn record_sync_writes(&self, direction: &'static str, writes: u64) {
        counter!("gantry_sync_writes_total", "direction" => direction).increment(writes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter() {
        let recorder = MetricsRecorder::new();
        recorder.record_backend_operation("etcd", "get");
        recorder.record_provisioning_create("nacos", "user");
        recorder.record_sync_writes("backend_to_mirror", 0);
    }
}
