use std::{sync::Arc, time::Duration};

use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};
use remote_store::RemoteStore;
use shared::{domain::Entrant, error::BoothError};
use tracing::{info, warn};

pub const COUNTDOWN_START: u8 = 3;
const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Drawing state machine: `Idle -> Counting -> Revealed -> (confirm |
/// draw again -> Idle)`.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawState {
    Idle,
    Counting { remaining: u8 },
    Revealed { winner: Entrant },
}

/// Operator-driven prize drawing over the eligible entrant pool.
///
/// The countdown is cosmetic delay before commitment, not a cancellable
/// operation: once started it always ends in `Revealed`. Selection is
/// uniform over the list as of draw time.
pub struct DrawingFlow {
    remote: Arc<dyn RemoteStore>,
    entrants: Vec<Entrant>,
    state: DrawState,
    rng: StdRng,
}

impl DrawingFlow {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self::with_rng(remote, StdRng::from_entropy())
    }

    /// Deterministic construction for fairness tests.
    pub fn with_rng(remote: Arc<dyn RemoteStore>, rng: StdRng) -> Self {
        Self {
            remote,
            entrants: Vec::new(),
            state: DrawState::Idle,
            rng,
        }
    }

    pub fn state(&self) -> &DrawState {
        &self.state
    }

    pub fn entrants(&self) -> &[Entrant] {
        &self.entrants
    }

    /// Re-fetches the eligible list. Only meaningful while `Idle`; calls
    /// in other states are ignored so an in-progress draw keeps operating
    /// on its snapshot of the pool.
    pub async fn refresh(&mut self) -> Result<()> {
        if !matches!(self.state, DrawState::Idle) {
            warn!("refresh ignored outside Idle state");
            return Ok(());
        }
        self.fetch_eligible().await
    }

    async fn fetch_eligible(&mut self) -> Result<()> {
        let mut entrants = self
            .remote
            .eligible_entrants()
            .await
            .map_err(|err| BoothError::remote(err.to_string()))?;
        // The store query filters too; rows that still fail the
        // eligibility check are dropped rather than drawn.
        entrants.retain(|e| e.is_eligible());
        info!(eligible = entrants.len(), "entrant pool loaded");
        self.entrants = entrants;
        Ok(())
    }

    /// The draw action is enabled exactly when the pool is non-empty and
    /// no draw is in progress.
    pub fn can_draw(&self) -> bool {
        matches!(self.state, DrawState::Idle) && !self.entrants.is_empty()
    }

    /// Begins the countdown. A guarded no-op (returns false) when the
    /// pool is empty or a draw is already underway, so an emptied pool
    /// disables rather than errors.
    pub fn start_draw(&mut self) -> bool {
        if !self.can_draw() {
            return false;
        }
        self.state = DrawState::Counting {
            remaining: COUNTDOWN_START,
        };
        true
    }

    /// Advances the countdown by one step; the final step performs the
    /// uniform selection and transitions to `Revealed`. No-op outside
    /// `Counting`.
    pub fn tick(&mut self) -> &DrawState {
        if let DrawState::Counting { remaining } = self.state {
            if remaining > 1 {
                self.state = DrawState::Counting {
                    remaining: remaining - 1,
                };
            } else {
                let index = self.rng.gen_range(0..self.entrants.len());
                let winner = self.entrants[index].clone();
                info!(entrant_id = %winner.id.0, pool = self.entrants.len(), "winner selected");
                self.state = DrawState::Revealed { winner };
            }
        }
        &self.state
    }

    /// Drives a full draw on a one-second tick, invoking `on_tick` with
    /// each displayed countdown value (3, 2, 1). Returns false without
    /// side effects when the draw action is disabled.
    pub async fn run_countdown(&mut self, mut on_tick: impl FnMut(u8) + Send) -> bool {
        if !self.start_draw() {
            return false;
        }
        while let DrawState::Counting { remaining } = self.state {
            on_tick(remaining);
            tokio::time::sleep(COUNTDOWN_TICK).await;
            self.tick();
        }
        true
    }

    /// Commits the revealed winner remotely, then returns to `Idle` and
    /// re-fetches the pool. If the update itself fails the state stays
    /// `Revealed` so the operator can retry or discard. A re-fetch
    /// failure after a recorded win is not a confirmation failure: the
    /// winner is dropped from the local list and the stale pool stands
    /// until the next refresh.
    pub async fn confirm(&mut self) -> Result<Entrant> {
        let DrawState::Revealed { winner } = &self.state else {
            anyhow::bail!("confirm is only valid in the Revealed state");
        };
        let winner = winner.clone();

        if let Err(err) = self.remote.mark_winner(winner.id).await {
            warn!(entrant_id = %winner.id.0, %err, "winner confirmation failed; staying revealed");
            return Err(BoothError::remote(err.to_string()).into());
        }

        info!(entrant_id = %winner.id.0, "winner confirmed");
        self.state = DrawState::Idle;
        self.entrants.retain(|e| e.id != winner.id);
        if let Err(err) = self.fetch_eligible().await {
            warn!(entrant_id = %winner.id.0, %err, "pool refresh after confirmation failed; keeping local list");
        }
        Ok(winner)
    }

    /// Discards the revealed selection without any remote mutation and
    /// without re-fetching. Returns false outside `Revealed`.
    pub fn draw_again(&mut self) -> bool {
        if matches!(self.state, DrawState::Revealed { .. }) {
            self.state = DrawState::Idle;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
#[path = "tests/draw_tests.rs"]
mod tests;
