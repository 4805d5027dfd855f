// Cascade resolution: turn a roster's desired keeper costs into a
// conflict-free assignment of owned draft rounds.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::eligibility::FRANCHISE_ROUND;
use crate::model::{KeeperRecord, KeeperType, PlayerId, Round, RosterId, Season};
use crate::settings::KeeperSettings;

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// One keeper going into the cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeCandidate {
    pub player_id: PlayerId,
    pub keeper_type: KeeperType,
    /// Escalated cost for REGULAR keepers; ignored for FRANCHISE keepers.
    pub desired_round: Round,
}

impl From<&KeeperRecord> for CascadeCandidate {
    fn from(k: &KeeperRecord) -> Self {
        CascadeCandidate {
            player_id: k.player_id.clone(),
            keeper_type: k.keeper_type,
            desired_round: k.base_cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeAssignment {
    pub player_id: PlayerId,
    #[serde(rename = "type")]
    pub keeper_type: KeeperType,
    /// The round the keeper asked for.
    pub base_cost: Round,
    /// The round the keeper was given.
    pub final_cost: Round,
    pub is_cascaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    /// No owned, unclaimed round at or after the desired round.
    NoAvailableRound,
    /// More than one FRANCHISE keeper competes for round 1.
    DuplicateFranchise,
    /// The roster holds no round 1 pick for its franchise keeper.
    FranchiseRoundNotOwned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeConflict {
    pub player_id: PlayerId,
    pub kind: ConflictKind,
    pub desired_round: Round,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeResult {
    pub roster_id: RosterId,
    pub season: Season,
    pub keepers: Vec<CascadeAssignment>,
    pub conflicts: Vec<CascadeConflict>,
    pub has_errors: bool,
}

impl CascadeResult {
    pub fn assignment_for(&self, player_id: &str) -> Option<&CascadeAssignment> {
        self.keepers.iter().find(|a| a.player_id == player_id)
    }

    /// Write each assigned final cost back onto the matching records.
    /// Records with no assignment (conflicts) are left untouched.
    pub fn apply_to(&self, records: &mut [KeeperRecord]) {
        for record in records.iter_mut() {
            if let Some(a) = self.assignment_for(&record.player_id) {
                record.final_cost = a.final_cost;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Sort order for regular keepers: desired round ascending, then player id.
/// Player id is the tie-break so the result never depends on input order.
fn cascade_order(a: &CascadeCandidate, b: &CascadeCandidate) -> std::cmp::Ordering {
    a.desired_round
        .cmp(&b.desired_round)
        .then_with(|| a.player_id.cmp(&b.player_id))
}

/// Assign every keeper on one roster a distinct round it owns.
///
/// Franchise keepers take round 1 first (lowest player id wins if there are
/// several; the rest are conflicts). A franchise keeper on a roster without
/// its round 1 pick is a conflict and gets no round. Regular keepers are then placed in
/// cascade order: the desired round if it is owned and free, otherwise the
/// next owned and free round up to `undrafted_round`. Keepers that cannot be
/// placed are reported as conflicts, never dropped.
pub fn resolve(
    settings: &KeeperSettings,
    roster_id: &str,
    season: Season,
    candidates: &[CascadeCandidate],
    owned_rounds: &BTreeSet<Round>,
) -> CascadeResult {
    let mut franchise: Vec<&CascadeCandidate> = candidates
        .iter()
        .filter(|c| c.keeper_type == KeeperType::Franchise)
        .collect();
    franchise.sort_by(|a, b| a.player_id.cmp(&b.player_id));

    let mut regular: Vec<&CascadeCandidate> = candidates
        .iter()
        .filter(|c| c.keeper_type == KeeperType::Regular)
        .collect();
    regular.sort_by(|a, b| cascade_order(a, b));

    let mut claimed: BTreeSet<Round> = BTreeSet::new();
    let mut keepers = Vec::with_capacity(candidates.len());
    let mut conflicts = Vec::new();

    for (i, c) in franchise.iter().enumerate() {
        if i > 0 {
            conflicts.push(CascadeConflict {
                player_id: c.player_id.clone(),
                kind: ConflictKind::DuplicateFranchise,
                desired_round: FRANCHISE_ROUND,
                message: format!(
                    "Round {} is already taken by franchise keeper {}",
                    FRANCHISE_ROUND, franchise[0].player_id
                ),
            });
            continue;
        }
        if !owned_rounds.contains(&FRANCHISE_ROUND) {
            conflicts.push(CascadeConflict {
                player_id: c.player_id.clone(),
                kind: ConflictKind::FranchiseRoundNotOwned,
                desired_round: FRANCHISE_ROUND,
                message: format!("Franchise keeper needs a round {} pick, which this roster has traded away", FRANCHISE_ROUND),
            });
            continue;
        }
        claimed.insert(FRANCHISE_ROUND);
        keepers.push(CascadeAssignment {
            player_id: c.player_id.clone(),
            keeper_type: KeeperType::Franchise,
            base_cost: FRANCHISE_ROUND,
            final_cost: FRANCHISE_ROUND,
            is_cascaded: false,
            reason: None,
        });
    }

    let ceiling = settings.undrafted_round.min(settings.draft_rounds);

    for c in regular {
        let desired = settings.clamp_cost(c.desired_round);
        let slot = (desired..=ceiling).find(|r| owned_rounds.contains(r) && !claimed.contains(r));

        match slot {
            Some(round) => {
                claimed.insert(round);
                let is_cascaded = round != desired;
                let reason = is_cascaded.then(|| {
                    let why = if owned_rounds.contains(&desired) {
                        "already claimed by another keeper"
                    } else {
                        "pick not owned"
                    };
                    format!("Round {desired} {why}; moved to round {round}")
                });
                debug!(
                    "roster '{}': keeper '{}' desired round {} -> round {}",
                    roster_id, c.player_id, desired, round
                );
                keepers.push(CascadeAssignment {
                    player_id: c.player_id.clone(),
                    keeper_type: KeeperType::Regular,
                    base_cost: desired,
                    final_cost: round,
                    is_cascaded,
                    reason,
                });
            }
            None => {
                warn!(
                    "roster '{}': no owned round available for keeper '{}' at or after round {}",
                    roster_id, c.player_id, desired
                );
                conflicts.push(CascadeConflict {
                    player_id: c.player_id.clone(),
                    kind: ConflictKind::NoAvailableRound,
                    desired_round: desired,
                    message: format!(
                        "No owned, unclaimed round between {desired} and {ceiling}; roster has more keepers than available picks"
                    ),
                });
            }
        }
    }

    info!(
        "cascade for roster '{}' season {}: {} assigned, {} cascaded, {} conflicts",
        roster_id,
        season,
        keepers.len(),
        keepers.iter().filter(|k| k.is_cascaded).count(),
        conflicts.len()
    );

    CascadeResult {
        roster_id: roster_id.to_string(),
        season,
        has_errors: !conflicts.is_empty(),
        keepers,
        conflicts,
    }
}

/// Convenience wrapper running the cascade straight off keeper records.
pub fn resolve_records(
    settings: &KeeperSettings,
    roster_id: &str,
    season: Season,
    records: &[KeeperRecord],
    owned_rounds: &BTreeSet<Round>,
) -> CascadeResult {
    let candidates: Vec<CascadeCandidate> = records
        .iter()
        .filter(|k| k.roster_id == roster_id && k.season == season)
        .map(CascadeCandidate::from)
        .collect();
    resolve(settings, roster_id, season, &candidates, owned_rounds)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
