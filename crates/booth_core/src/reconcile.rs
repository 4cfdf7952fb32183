use std::sync::Arc;

use anyhow::Result;
use device_store::DeviceStore;
use remote_store::{RemoteStore, StoreError};
use tracing::{info, warn};

use crate::ConnectivityProbe;

/// Outcome of one flush pass over the pending-entry queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Entries inserted remotely and cleared from the pending set.
    pub synced: usize,
    /// Entries rejected on the email unique constraint; recorded as
    /// permanently failed and surfaced, not silently dropped.
    pub duplicates: usize,
    /// Entries left pending for a later flush (transient store errors,
    /// or everything when offline).
    pub still_pending: usize,
}

/// Replays locally queued entries against the remote store. Runs when the
/// confirmation view loads and on manual request.
///
/// Each record is an independent business entity, so flushing is
/// per-record: one failure never re-queues or loses its neighbors.
pub struct QueueReconciler {
    remote: Arc<dyn RemoteStore>,
    device: DeviceStore,
    probe: Arc<dyn ConnectivityProbe>,
}

impl QueueReconciler {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        device: DeviceStore,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        Self {
            remote,
            device,
            probe,
        }
    }

    pub async fn flush(&self) -> Result<FlushReport> {
        let mut report = FlushReport::default();

        if !self.probe.is_online().await {
            report.still_pending = self.device.pending_count().await? as usize;
            return Ok(report);
        }

        let pending = self.device.pending_entries().await?;
        if pending.is_empty() {
            return Ok(report);
        }

        for record in pending {
            match self.remote.insert_entrant(&record.entry).await {
                Ok(()) => {
                    self.device.mark_synced(record.queue_id).await?;
                    report.synced += 1;
                }
                Err(StoreError::UniqueViolation) => {
                    self.device
                        .mark_sync_failed(record.queue_id, "duplicate email")
                        .await?;
                    warn!(
                        queue_id = record.queue_id,
                        email = %record.entry.email,
                        "queued entry conflicts with an existing email; dropped from retry set"
                    );
                    report.duplicates += 1;
                }
                Err(StoreError::Other(message)) => {
                    // Transient failure: the record stays pending.
                    warn!(
                        queue_id = record.queue_id,
                        email = %record.entry.email,
                        %message,
                        "queued entry sync failed; will retry on next flush"
                    );
                    report.still_pending += 1;
                }
            }
        }

        info!(
            synced = report.synced,
            duplicates = report.duplicates,
            still_pending = report.still_pending,
            "queue flush finished"
        );
        Ok(report)
    }
}
