use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row identity assigned by the remote store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntrantId(pub Uuid);

/// A person who submitted contact details for the drawing.
///
/// Created by the entry flow; the drawing flow is the only mutator
/// (`is_winner` flips false -> true on confirmation). Rows are never
/// deleted by this application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    pub id: EntrantId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub created_at: DateTime<Utc>,
    pub is_winner: bool,
    pub disqualified: bool,
}

impl Entrant {
    /// Eligibility filter used by the drawing flow.
    pub fn is_eligible(&self) -> bool {
        !self.is_winner && !self.disqualified
    }
}

/// Insert payload for the `entrants` table. The remote store assigns the
/// id and defaults `is_winner` / `disqualified` to false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntrant {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub created_at: DateTime<Utc>,
}
