//! Latest-value telemetry hub

use super::readings::TelemetrySnapshot;
use std::sync::Arc;
use tokio::sync::watch;

/// Shares the most recent telemetry snapshot with any number of readers
///
/// Readers only ever see the latest value; intermediate snapshots published
/// between two reads are skipped.
#[derive(Clone)]
pub struct SensorHub {
    tx: Arc<watch::Sender<TelemetrySnapshot>>,
}

impl SensorHub {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(TelemetrySnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn publish(&self, snapshot: TelemetrySnapshot) {
        self.tx.send_replace(snapshot);
    }

    pub fn latest(&self) -> TelemetrySnapshot {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.tx.subscribe()
    }
}

impl Default for SensorHub {
    fn default() -> Self {
        Self::new()
    }
}
