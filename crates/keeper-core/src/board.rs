// Draft board: round x roster grid of keeper, traded, and available cells.

use std::collections::HashMap;

use serde::Serialize;

use crate::cascade::CascadeResult;
use crate::model::{KeeperType, PlayerId, Round, RosterId, RosterRef, Season};
use crate::ownership::PickLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Keeper,
    Traded,
    Available,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardKeeper {
    pub player_id: PlayerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    #[serde(rename = "type")]
    pub keeper_type: KeeperType,
    pub is_cascaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSlot {
    pub roster_id: RosterId,
    pub status: SlotStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keeper: Option<BoardKeeper>,
    /// Holder of this roster's own pick when it has been traded away.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traded_to: Option<RosterRef>,
    /// Original owner of an acquired pick this roster holds in the round.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired_from: Option<RosterRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardRound {
    pub round: Round,
    pub slots: Vec<BoardSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftBoard {
    pub season: Season,
    pub rounds: Vec<BoardRound>,
}

impl DraftBoard {
    pub fn slot(&self, round: Round, roster_id: &str) -> Option<&BoardSlot> {
        self.rounds
            .iter()
            .find(|r| r.round == round)
            .and_then(|r| r.slots.iter().find(|s| s.roster_id == roster_id))
    }
}

/// Compose pick ownership and cascade output into the board. Rosters appear
/// in the ledger's order. A keeper landing in a round always shows as a
/// keeper cell; otherwise the cell is available when the roster holds any
/// pick in the round and traded when it holds none.
pub fn build_board(
    ledger: &PickLedger,
    cascades: &[CascadeResult],
    player_names: &HashMap<PlayerId, String>,
) -> DraftBoard {
    let by_roster: HashMap<&str, &CascadeResult> =
        cascades.iter().map(|c| (c.roster_id.as_str(), c)).collect();

    let rounds = (1..=ledger.draft_rounds())
        .map(|round| BoardRound {
            round,
            slots: ledger
                .rosters()
                .iter()
                .map(|roster| build_slot(ledger, round, roster, by_roster.get(roster.id.as_str()).copied(), player_names))
                .collect(),
        })
        .collect();

    DraftBoard {
        season: ledger.season(),
        rounds,
    }
}

fn build_slot(
    ledger: &PickLedger,
    round: Round,
    roster: &RosterRef,
    cascade: Option<&CascadeResult>,
    player_names: &HashMap<PlayerId, String>,
) -> BoardSlot {
    let acquired_from = ledger
        .picks_owned_by(&roster.id)
        .into_iter()
        .find(|p| p.round == round && p.original_owner_id != roster.id)
        .and_then(|p| ledger.roster(&p.original_owner_id).cloned());

    let keeper = cascade
        .and_then(|c| c.keepers.iter().find(|k| k.final_cost == round))
        .map(|k| BoardKeeper {
            player_id: k.player_id.clone(),
            player_name: player_names.get(&k.player_id).cloned(),
            keeper_type: k.keeper_type,
            is_cascaded: k.is_cascaded,
        });

    if keeper.is_some() {
        return BoardSlot {
            roster_id: roster.id.clone(),
            status: SlotStatus::Keeper,
            keeper,
            traded_to: None,
            acquired_from,
        };
    }

    if ledger.owns(&roster.id, round) {
        return BoardSlot {
            roster_id: roster.id.clone(),
            status: SlotStatus::Available,
            keeper: None,
            traded_to: None,
            acquired_from,
        };
    }

    BoardSlot {
        roster_id: roster.id.clone(),
        status: SlotStatus::Traded,
        keeper: None,
        traded_to: ledger
            .current_owner(round, &roster.id)
            .and_then(|owner| ledger.roster(owner).cloned()),
        acquired_from: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::resolve;
    use crate::cascade::CascadeCandidate;
    use crate::model::TradedPick;
    use crate::settings::tests::test_settings;

    fn rosters() -> Vec<RosterRef> {
        vec![
            RosterRef { id: "r1".into(), name: "Gridiron Gang".into() },
            RosterRef { id: "r2".into(), name: "Blitz Brigade".into() },
        ]
    }

    fn ledger_with_round2_traded() -> PickLedger {
        PickLedger::build(
            2024,
            15,
            &rosters(),
            &[TradedPick {
                season: 2024,
                round: 2,
                original_owner_id: "r1".into(),
                current_owner_id: "r2".into(),
            }],
        )
    }

    #[test]
    fn scenario_c_traded_round_shows_new_owner() {
        let ledger = ledger_with_round2_traded();
        let board = build_board(&ledger, &[], &HashMap::new());

        let slot = board.slot(2, "r1").unwrap();
        assert_eq!(slot.status, SlotStatus::Traded);
        assert_eq!(slot.traded_to.as_ref().unwrap().name, "Blitz Brigade");

        let r2 = board.slot(2, "r2").unwrap();
        assert_eq!(r2.status, SlotStatus::Available);
        assert_eq!(r2.acquired_from.as_ref().unwrap().id, "r1");
    }

    #[test]
    fn keepers_land_in_their_final_round() {
        let s = test_settings();
        let ledger = ledger_with_round2_traded();
        let owned = ledger.owned_rounds("r1");
        let cascade = resolve(
            &s,
            "r1",
            2024,
            &[CascadeCandidate {
                player_id: "p1".into(),
                keeper_type: KeeperType::Regular,
                desired_round: 2,
            }],
            &owned,
        );
        let mut names = HashMap::new();
        names.insert("p1".to_string(), "Breece Hall".to_string());

        let board = build_board(&ledger, &[cascade], &names);
        assert_eq!(board.slot(2, "r1").unwrap().status, SlotStatus::Traded);

        let slot = board.slot(3, "r1").unwrap();
        assert_eq!(slot.status, SlotStatus::Keeper);
        let keeper = slot.keeper.as_ref().unwrap();
        assert_eq!(keeper.player_name.as_deref(), Some("Breece Hall"));
        assert!(keeper.is_cascaded);
    }

    #[test]
    fn franchise_keeper_never_claims_a_traded_round_one() {
        let s = test_settings();
        let ledger = PickLedger::build(
            2024,
            15,
            &rosters(),
            &[TradedPick {
                season: 2024,
                round: 1,
                original_owner_id: "r1".into(),
                current_owner_id: "r2".into(),
            }],
        );
        let cascade = resolve(
            &s,
            "r1",
            2024,
            &[CascadeCandidate {
                player_id: "f1".into(),
                keeper_type: KeeperType::Franchise,
                desired_round: 1,
            }],
            &ledger.owned_rounds("r1"),
        );
        assert!(cascade.has_errors);

        let board = build_board(&ledger, &[cascade], &HashMap::new());
        let slot = board.slot(1, "r1").unwrap();
        assert_eq!(slot.status, SlotStatus::Traded);
        assert!(slot.keeper.is_none());
        assert_eq!(slot.traded_to.as_ref().unwrap().id, "r2");
    }

    #[test]
    fn board_covers_every_round_and_roster() {
        let ledger = ledger_with_round2_traded();
        let board = build_board(&ledger, &[], &HashMap::new());
        assert_eq!(board.season, 2024);
        assert_eq!(board.rounds.len(), 15);
        assert!(board.rounds.iter().all(|r| r.slots.len() == 2));
        let available = board
            .rounds
            .iter()
            .flat_map(|r| &r.slots)
            .filter(|s| s.status == SlotStatus::Available)
            .count();
        assert_eq!(available, 29);
    }
}
