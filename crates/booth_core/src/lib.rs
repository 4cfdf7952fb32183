use async_trait::async_trait;
use remote_store::RestRemoteStore;

pub mod admin;
pub mod draw;
pub mod entry;
pub mod reconcile;

pub use admin::AdminGate;
pub use draw::{DrawState, DrawingFlow, COUNTDOWN_START};
pub use entry::{EntryFlow, EntryForm, EntryOutcome};
pub use reconcile::{FlushReport, QueueReconciler};

/// Connectivity is polled at submission and flush time; it gates which
/// persistence path is taken but never blocks input.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Probe that treats any HTTP answer from the remote endpoint as online.
pub struct StoreReachabilityProbe(pub std::sync::Arc<RestRemoteStore>);

#[async_trait]
impl ConnectivityProbe for StoreReachabilityProbe {
    async fn is_online(&self) -> bool {
        self.0.probe().await
    }
}

/// Probe for environments without a connectivity signal.
pub struct AlwaysOnline;

#[async_trait]
impl ConnectivityProbe for AlwaysOnline {
    async fn is_online(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
