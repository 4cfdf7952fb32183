use shared::error::BoothError;

/// Session-scoped gate in front of the drawing flow.
///
/// The comparison is intentionally minimal and process-local: a matching
/// secret unlocks the gate for the lifetime of this value, a mismatch
/// re-prompts with no lockout. Replacing this with a server-side check
/// only requires swapping this type at the call site.
pub struct AdminGate {
    secret: String,
    unlocked: bool,
}

impl AdminGate {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            unlocked: false,
        }
    }

    pub fn unlock(&mut self, candidate: &str) -> Result<(), BoothError> {
        if candidate == self.secret {
            self.unlocked = true;
            Ok(())
        } else {
            Err(BoothError::Auth)
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }
}
