// Keeper mutations and read models over the store.
//
// Every mutation runs under a per-roster lock: load a fresh snapshot,
// validate, re-run the cascade over the roster's complete keeper set, and
// persist the result. Two requests for the same roster can never interleave
// their read-modify-write. A cascade with conflicts is never persisted, so
// stored final costs always come from a conflict-free pass.

use std::collections::HashMap;
use std::sync::Arc;

use keeper_core::cascade::resolve_records;
use keeper_core::eligibility::{evaluate, KeeperEvaluation};
use keeper_core::model::{KeeperRecord, KeeperType, PlayerId, RosterId, Season};
use keeper_core::selection::{self, Actor, KeeperRejection};
use keeper_core::trade::{TradeContext, TradeError};
use keeper_core::{
    build_board, CascadeResult, DraftBoard, KeeperSettings, PickLedger, TradeAnalysis, TradeProposal,
    TradeValueWeights,
};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::db::{Database, Snapshot};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Rejected(#[from] KeeperRejection),

    #[error("unknown roster: {0}")]
    UnknownRoster(RosterId),

    #[error("unknown player: {0}")]
    UnknownPlayer(PlayerId),

    #[error(transparent)]
    Trade(#[from] TradeError),

    #[error("keeper store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

pub struct KeeperService {
    db: Arc<Database>,
    settings: KeeperSettings,
    weights: TradeValueWeights,
    roster_locks: Mutex<HashMap<RosterId, Arc<Mutex<()>>>>,
}

impl KeeperService {
    pub fn new(db: Arc<Database>, settings: KeeperSettings, weights: TradeValueWeights) -> Self {
        Self {
            db,
            settings,
            weights,
            roster_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &KeeperSettings {
        &self.settings
    }

    fn season(&self) -> Season {
        self.settings.current_season
    }

    async fn lock_roster(&self, roster_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.roster_locks.lock().await;
            locks.entry(roster_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    fn snapshot_for(&self, roster_id: &str) -> Result<Snapshot, ServiceError> {
        let snapshot = self.db.load_snapshot(self.season())?;
        if snapshot.roster(roster_id).is_none() {
            return Err(ServiceError::UnknownRoster(roster_id.to_string()));
        }
        Ok(snapshot)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Eligibility and cost for one player on one roster.
    pub async fn evaluate_player(&self, roster_id: &str, player_id: &str) -> Result<KeeperEvaluation, ServiceError> {
        let snapshot = self.snapshot_for(roster_id)?;
        if !snapshot.players.contains_key(player_id) {
            return Err(ServiceError::UnknownPlayer(player_id.to_string()));
        }
        let facts = snapshot.facts_for(player_id);
        Ok(evaluate(
            &self.settings,
            roster_id,
            self.season(),
            &facts,
            &snapshot.roster_keepers(roster_id),
        ))
    }

    /// Run a full cascade for every roster, then build the board from the
    /// fresh results.
    pub async fn draft_board(&self) -> Result<DraftBoard, ServiceError> {
        let rosters = self.db.load_snapshot(self.season())?.rosters;
        let mut cascades = Vec::with_capacity(rosters.len());
        for roster in &rosters {
            cascades.push(self.recalculate_roster(&roster.id).await?);
        }

        let snapshot = self.db.load_snapshot(self.season())?;
        let ledger = self.ledger(&snapshot);
        Ok(build_board(&ledger, &cascades, &snapshot.player_names()))
    }

    pub async fn analyze_trade(&self, proposal: &TradeProposal) -> Result<TradeAnalysis, ServiceError> {
        let snapshot = self.db.load_snapshot(self.season())?;
        let ctx = TradeContext {
            settings: &self.settings,
            weights: &self.weights,
            rosters: &snapshot.rosters,
            players: &snapshot.players,
            facts: &snapshot.facts,
            keepers: &snapshot.keepers,
        };
        Ok(keeper_core::analyze_trade(&ctx, proposal)?)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub async fn add_keeper(
        &self,
        roster_id: &str,
        player_id: &str,
        keeper_type: KeeperType,
    ) -> Result<CascadeResult, ServiceError> {
        let _guard = self.lock_roster(roster_id).await;
        let snapshot = self.snapshot_for(roster_id)?;
        let player = snapshot
            .players
            .get(player_id)
            .ok_or_else(|| ServiceError::UnknownPlayer(player_id.to_string()))?;

        let mut keepers = snapshot.roster_keepers(roster_id);
        let facts = snapshot.facts_for(player_id);
        let evaluation = evaluate(&self.settings, roster_id, self.season(), &facts, &keepers);
        selection::validate_add(&self.settings, roster_id, &snapshot.keepers, player, keeper_type, &evaluation)?;

        let record = selection::build_keeper(&roster_id.to_string(), self.season(), keeper_type, &evaluation)
            .ok_or_else(|| KeeperRejection::Ineligible {
                player_id: player_id.to_string(),
                reason: format!("no {} cost available", keeper_type.label()),
            })?;
        info!(
            "adding {} keeper '{}' to roster '{}' at round {}",
            keeper_type.label(),
            player_id,
            roster_id,
            record.base_cost
        );
        keepers.push(record);

        let (keepers, cascade) = self.plan(&snapshot, roster_id, keepers);
        if cascade.has_errors {
            let reason = cascade
                .conflicts
                .iter()
                .find(|c| c.player_id == player_id)
                .or_else(|| cascade.conflicts.first())
                .map(|c| c.message.clone())
                .unwrap_or_default();
            warn!("rejected keeper '{}' on roster '{}': {}", player_id, roster_id, reason);
            return Err(KeeperRejection::NoRoundAvailable {
                player_id: player_id.to_string(),
                reason,
            }
            .into());
        }
        self.store(roster_id, &keepers, cascade)
    }

    pub async fn remove_keeper(&self, roster_id: &str, player_id: &str, actor: Actor) -> Result<CascadeResult, ServiceError> {
        let _guard = self.lock_roster(roster_id).await;
        let snapshot = self.snapshot_for(roster_id)?;

        let mut keepers = snapshot.roster_keepers(roster_id);
        selection::validate_remove(&keepers, player_id, actor)?;
        self.db.delete_keeper(player_id, roster_id, self.season())?;
        keepers.retain(|k| k.player_id != player_id);
        info!("removed keeper '{}' from roster '{}'", player_id, roster_id);

        self.cascade_and_store(&snapshot, roster_id, keepers)
    }

    /// Flip the commissioner lock on a keeper. Returns the new state.
    pub async fn toggle_lock(&self, roster_id: &str, player_id: &str, actor: Actor) -> Result<bool, ServiceError> {
        let _guard = self.lock_roster(roster_id).await;
        let snapshot = self.snapshot_for(roster_id)?;

        let keepers = snapshot.roster_keepers(roster_id);
        let locked = selection::validate_lock_toggle(&keepers, player_id, actor)?;
        self.db.set_locked(player_id, roster_id, self.season(), locked)?;
        info!(
            "keeper '{}' on roster '{}' is now {}",
            player_id,
            roster_id,
            if locked { "locked" } else { "unlocked" }
        );
        Ok(locked)
    }

    /// Refresh costs from current facts and re-run the cascade.
    pub async fn recalculate_roster(&self, roster_id: &str) -> Result<CascadeResult, ServiceError> {
        let _guard = self.lock_roster(roster_id).await;
        let snapshot = self.snapshot_for(roster_id)?;
        let keepers = snapshot.roster_keepers(roster_id);
        self.cascade_and_store(&snapshot, roster_id, keepers)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ledger(&self, snapshot: &Snapshot) -> PickLedger {
        PickLedger::build(
            self.season(),
            self.settings.draft_rounds,
            &snapshot.rosters,
            &snapshot.traded_picks,
        )
    }

    /// Re-derive each keeper's pre-cascade cost from the snapshot's facts.
    fn refresh_costs(&self, snapshot: &Snapshot, roster_id: &str, keepers: &mut [KeeperRecord]) {
        let current = keepers.to_vec();
        for keeper in keepers.iter_mut() {
            let facts = snapshot.facts_for(&keeper.player_id);
            let evaluation = evaluate(&self.settings, roster_id, self.season(), &facts, &current);
            keeper.years_kept = evaluation.eligibility.years_kept;
            keeper.acquisition_type = evaluation.eligibility.acquisition_type;
            match keeper.keeper_type {
                KeeperType::Franchise => keeper.base_cost = keeper_core::eligibility::FRANCHISE_ROUND,
                KeeperType::Regular => match evaluation.cost.regular {
                    Some(cost) => keeper.base_cost = cost.final_cost,
                    None => warn!(
                        "keeper '{}' on roster '{}' is no longer eligible as REGULAR; keeping stored cost {}",
                        keeper.player_id, roster_id, keeper.base_cost
                    ),
                },
            }
        }
    }

    /// Refresh costs and run the cascade without touching the store.
    fn plan(&self, snapshot: &Snapshot, roster_id: &str, mut keepers: Vec<KeeperRecord>) -> (Vec<KeeperRecord>, CascadeResult) {
        self.refresh_costs(snapshot, roster_id, &mut keepers);
        let owned = self.ledger(snapshot).owned_rounds(roster_id);
        let cascade = resolve_records(&self.settings, roster_id, self.season(), &keepers, &owned);
        cascade.apply_to(&mut keepers);
        (keepers, cascade)
    }

    fn store(&self, roster_id: &str, keepers: &[KeeperRecord], cascade: CascadeResult) -> Result<CascadeResult, ServiceError> {
        self.db.replace_roster_keepers(roster_id, self.season(), keepers)?;
        Ok(cascade)
    }

    /// Persist the cascade only when every keeper got a round; otherwise the
    /// stored costs stay as they were and the conflicts are returned.
    fn cascade_and_store(
        &self,
        snapshot: &Snapshot,
        roster_id: &str,
        keepers: Vec<KeeperRecord>,
    ) -> Result<CascadeResult, ServiceError> {
        let (keepers, cascade) = self.plan(snapshot, roster_id, keepers);
        if cascade.has_errors {
            warn!(
                "roster '{}' has {} keeper conflict(s); stored costs left unchanged",
                roster_id,
                cascade.conflicts.len()
            );
            return Ok(cascade);
        }
        self.store(roster_id, &keepers, cascade)
    }
}
