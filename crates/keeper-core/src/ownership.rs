// Draft pick ownership: which roster holds each season/round pick after
// pick trades.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::warn;

use crate::model::{Round, RosterId, RosterRef, Season, TradedPick};

/// A single pick held by a roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedPick {
    pub round: Round,
    pub original_owner_id: RosterId,
}

/// Per-roster view of pick movement for a season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterPickSummary {
    pub roster_id: RosterId,
    pub owned_rounds: BTreeSet<Round>,
    /// `(round, current owner)` for each of this roster's own picks held elsewhere.
    pub traded_away: Vec<(Round, RosterId)>,
    /// `(round, original owner)` for each pick acquired from another roster.
    pub acquired: Vec<(Round, RosterId)>,
}

/// Current owner of every `(round, original owner)` pick in one season.
#[derive(Debug, Clone)]
pub struct PickLedger {
    season: Season,
    draft_rounds: Round,
    rosters: Vec<RosterRef>,
    owners: BTreeMap<(Round, RosterId), RosterId>,
}

impl PickLedger {
    /// Start from every roster owning its own pick in rounds `1..=draft_rounds`,
    /// then apply the season's pick trades. Records for other seasons, rounds
    /// outside the draft, or unknown rosters are skipped. When several records
    /// name the same pick, the last one wins.
    pub fn build(season: Season, draft_rounds: Round, rosters: &[RosterRef], traded: &[TradedPick]) -> Self {
        let mut owners = BTreeMap::new();
        for roster in rosters {
            for round in 1..=draft_rounds {
                owners.insert((round, roster.id.clone()), roster.id.clone());
            }
        }

        let known = |id: &str| rosters.iter().any(|r| r.id == id);
        let mut seen: BTreeSet<(Round, RosterId)> = BTreeSet::new();

        for tp in traded.iter().filter(|tp| tp.season == season) {
            if tp.round == 0 || tp.round > draft_rounds {
                warn!(
                    "ignoring traded pick for round {} (draft has {} rounds)",
                    tp.round, draft_rounds
                );
                continue;
            }
            if !known(&tp.original_owner_id) || !known(&tp.current_owner_id) {
                warn!(
                    "ignoring traded pick round {} between unknown rosters '{}' -> '{}'",
                    tp.round, tp.original_owner_id, tp.current_owner_id
                );
                continue;
            }
            let key = (tp.round, tp.original_owner_id.clone());
            if !seen.insert(key.clone()) {
                warn!(
                    "duplicate traded pick record for round {} of '{}'; using latest owner '{}'",
                    tp.round, tp.original_owner_id, tp.current_owner_id
                );
            }
            owners.insert(key, tp.current_owner_id.clone());
        }

        PickLedger {
            season,
            draft_rounds,
            rosters: rosters.to_vec(),
            owners,
        }
    }

    pub fn season(&self) -> Season {
        self.season
    }

    pub fn draft_rounds(&self) -> Round {
        self.draft_rounds
    }

    pub fn rosters(&self) -> &[RosterRef] {
        &self.rosters
    }

    /// Look up a roster's reference data.
    pub fn roster(&self, roster_id: &str) -> Option<&RosterRef> {
        self.rosters.iter().find(|r| r.id == roster_id)
    }

    /// Current holder of `original_owner`'s pick in `round`.
    pub fn current_owner(&self, round: Round, original_owner: &str) -> Option<&RosterId> {
        self.owners.get(&(round, original_owner.to_string()))
    }

    /// All picks currently held by `roster_id`, ordered by round then
    /// original owner.
    pub fn picks_owned_by(&self, roster_id: &str) -> Vec<OwnedPick> {
        self.owners
            .iter()
            .filter(|(_, current)| current.as_str() == roster_id)
            .map(|((round, original), _)| OwnedPick {
                round: *round,
                original_owner_id: original.clone(),
            })
            .collect()
    }

    /// Rounds in which `roster_id` holds at least one pick.
    pub fn owned_rounds(&self, roster_id: &str) -> BTreeSet<Round> {
        self.picks_owned_by(roster_id).into_iter().map(|p| p.round).collect()
    }

    pub fn owns(&self, roster_id: &str, round: Round) -> bool {
        self.owners
            .iter()
            .any(|((r, _), current)| *r == round && current == roster_id)
    }

    /// Pick movement summary for one roster.
    pub fn summary(&self, roster_id: &str) -> RosterPickSummary {
        let mut traded_away = Vec::new();
        let mut acquired = Vec::new();
        for ((round, original), current) in &self.owners {
            if original == roster_id && current != roster_id {
                traded_away.push((*round, current.clone()));
            } else if current == roster_id && original != roster_id {
                acquired.push((*round, original.clone()));
            }
        }
        RosterPickSummary {
            roster_id: roster_id.to_string(),
            owned_rounds: self.owned_rounds(roster_id),
            traded_away,
            acquired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rosters() -> Vec<RosterRef> {
        vec![
            RosterRef { id: "r1".into(), name: "Gridiron Gang".into() },
            RosterRef { id: "r2".into(), name: "Blitz Brigade".into() },
            RosterRef { id: "r3".into(), name: "Hail Marys".into() },
        ]
    }

    fn traded(season: Season, round: Round, from: &str, to: &str) -> TradedPick {
        TradedPick {
            season,
            round,
            original_owner_id: from.into(),
            current_owner_id: to.into(),
        }
    }

    #[test]
    fn untraded_rosters_own_every_round() {
        let ledger = PickLedger::build(2024, 5, &rosters(), &[]);
        for r in rosters() {
            assert_eq!(ledger.owned_rounds(&r.id), (1..=5).collect());
        }
    }

    #[test]
    fn traded_pick_moves_round() {
        let ledger = PickLedger::build(2024, 5, &rosters(), &[traded(2024, 2, "r1", "r2")]);
        assert!(!ledger.owns("r1", 2));
        assert!(ledger.owns("r2", 2));
        assert_eq!(ledger.current_owner(2, "r1"), Some(&"r2".to_string()));

        let r2_round2: Vec<_> = ledger.picks_owned_by("r2").into_iter().filter(|p| p.round == 2).collect();
        assert_eq!(r2_round2.len(), 2);
    }

    #[test]
    fn other_seasons_are_ignored() {
        let ledger = PickLedger::build(2024, 5, &rosters(), &[traded(2025, 1, "r1", "r3")]);
        assert!(ledger.owns("r1", 1));
    }

    #[test]
    fn out_of_range_and_unknown_rosters_are_ignored() {
        let ledger = PickLedger::build(
            2024,
            5,
            &rosters(),
            &[traded(2024, 9, "r1", "r2"), traded(2024, 3, "r1", "ghost")],
        );
        assert_eq!(ledger.owned_rounds("r1"), (1..=5).collect());
    }

    #[test]
    fn later_record_wins_for_same_pick() {
        let ledger = PickLedger::build(
            2024,
            5,
            &rosters(),
            &[traded(2024, 4, "r1", "r2"), traded(2024, 4, "r1", "r3")],
        );
        assert_eq!(ledger.current_owner(4, "r1"), Some(&"r3".to_string()));
        assert!(ledger.picks_owned_by("r2").iter().all(|p| p.original_owner_id != "r1"));
    }

    #[test]
    fn pick_returned_to_original_owner() {
        let ledger = PickLedger::build(
            2024,
            5,
            &rosters(),
            &[traded(2024, 3, "r2", "r1"), traded(2024, 3, "r2", "r2")],
        );
        assert!(ledger.owns("r2", 3));
        assert!(ledger.summary("r2").traded_away.is_empty());
    }

    #[test]
    fn summary_lists_movement() {
        let ledger = PickLedger::build(
            2024,
            5,
            &rosters(),
            &[traded(2024, 2, "r1", "r2"), traded(2024, 5, "r3", "r1")],
        );
        let s = ledger.summary("r1");
        assert_eq!(s.traded_away, vec![(2, "r2".to_string())]);
        assert_eq!(s.acquired, vec![(5, "r3".to_string())]);
        assert_eq!(s.owned_rounds, [1, 3, 4, 5].into_iter().collect());
    }
}
