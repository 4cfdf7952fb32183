use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use device_store::DeviceStore;
use remote_store::{RemoteStore, StoreError};
use shared::{domain::NewEntrant, error::BoothError};
use tracing::{info, warn};

use crate::ConnectivityProbe;

/// Raw form fields as captured at the booth. Email and phone format are
/// input-level concerns; this layer only enforces presence.
#[derive(Debug, Clone, Default)]
pub struct EntryForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
}

impl EntryForm {
    /// All fields are required and must be non-empty after trimming.
    pub fn validate(&self) -> Result<NewEntrant, BoothError> {
        let field = |label: &str, value: &str| -> Result<String, BoothError> {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(BoothError::validation(label));
            }
            Ok(trimmed.to_string())
        };

        Ok(NewEntrant {
            name: field("name", &self.name)?,
            email: field("email", &self.email)?,
            phone: field("phone", &self.phone)?,
            company: field("company", &self.company)?,
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    /// The entry reached the remote store.
    SubmittedOnline,
    /// Connectivity was down; the entry is in the local queue.
    QueuedOffline,
    /// This device already submitted; the flow redirects without
    /// accepting further input.
    AlreadyEntered,
}

/// The entry submission component. The submission marker is only set
/// after the entry is durably recorded (remote-confirmed or locally
/// queued), never before and never on failure.
pub struct EntryFlow {
    remote: Arc<dyn RemoteStore>,
    device: DeviceStore,
    probe: Arc<dyn ConnectivityProbe>,
}

impl EntryFlow {
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

    /// True once this device holds the submission marker.
    pub async fn already_entered(&self) -> Result<bool> {
        self.device.submission_marker().await
    }

    pub async fn submit(&self, form: &EntryForm) -> Result<EntryOutcome> {
        if self.device.submission_marker().await? {
            return Ok(EntryOutcome::AlreadyEntered);
        }

        let entry = form.validate()?;

        if self.probe.is_online().await {
            match self.remote.insert_entrant(&entry).await {
                Ok(()) => {
                    self.device.set_submission_marker().await?;
                    info!(email = %entry.email, "entry submitted online");
                    Ok(EntryOutcome::SubmittedOnline)
                }
                Err(StoreError::UniqueViolation) => Err(BoothError::DuplicateEntry.into()),
                Err(StoreError::Other(message)) => {
                    warn!(email = %entry.email, %message, "online submit failed; retry allowed");
                    Err(BoothError::Remote(message).into())
                }
            }
        } else {
            let queue_id = self.device.enqueue_entry_and_mark_submitted(&entry).await?;
            info!(email = %entry.email, queue_id, "offline; entry queued locally");
            Ok(EntryOutcome::QueuedOffline)
        }
    }
}
