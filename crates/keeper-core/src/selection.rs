// Keeper selection rules: limit checks and lifecycle guards applied before a
// keeper is added, removed, or locked.

use thiserror::Error;

use crate::eligibility::KeeperEvaluation;
use crate::model::{KeeperRecord, KeeperType, Player, PlayerId, RosterId, Season};
use crate::settings::KeeperSettings;

/// A structured rejection of a keeper mutation. The `Display` output is the
/// user-facing reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeeperRejection {
    #[error("{player_id} is already a keeper for this season")]
    DuplicateKeeper { player_id: PlayerId },

    #[error("{player_id} is already kept by roster {roster_id} this season")]
    KeptByOtherRoster { player_id: PlayerId, roster_id: RosterId },

    #[error("{player_id} is not on roster {roster_id}")]
    NotOnRoster { player_id: PlayerId, roster_id: RosterId },

    #[error("{player_id} is not eligible to be kept: {reason}")]
    Ineligible { player_id: PlayerId, reason: String },

    #[error("{player_id} can only be kept with a franchise tag")]
    FranchiseOnly { player_id: PlayerId },

    #[error("no franchise tags remaining ({max} allowed)")]
    FranchiseLimitReached { max: u8 },

    #[error("roster already has the maximum of {max} keepers")]
    KeeperLimitReached { max: u8 },

    #[error("roster already has the maximum of {max} regular keepers")]
    RegularLimitReached { max: u8 },

    #[error("no owned draft round is left for {player_id}: {reason}")]
    NoRoundAvailable { player_id: PlayerId, reason: String },

    #[error("{player_id} is not a keeper on this roster")]
    NotAKeeper { player_id: PlayerId },

    #[error("{player_id} is locked by the commissioner and cannot be changed")]
    Locked { player_id: PlayerId },

    #[error("only the commissioner can lock or unlock keepers")]
    NotCommissioner,
}

/// Who is asking for the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Owner,
    Commissioner,
}

/// Check whether `player` may be added as `keeper_type` to `roster_id`.
/// `season_keepers` holds every roster's keepers for the season.
pub fn validate_add(
    settings: &KeeperSettings,
    roster_id: &str,
    season_keepers: &[KeeperRecord],
    player: &Player,
    keeper_type: KeeperType,
    evaluation: &KeeperEvaluation,
) -> Result<(), KeeperRejection> {
    let player_id = player.id.as_str();
    if let Some(kept) = season_keepers.iter().find(|k| k.player_id == player_id) {
        if kept.roster_id == roster_id {
            return Err(KeeperRejection::DuplicateKeeper {
                player_id: player_id.to_string(),
            });
        }
        return Err(KeeperRejection::KeptByOtherRoster {
            player_id: player_id.to_string(),
            roster_id: kept.roster_id.clone(),
        });
    }

    if player.roster_id.as_deref() != Some(roster_id) {
        return Err(KeeperRejection::NotOnRoster {
            player_id: player_id.to_string(),
            roster_id: roster_id.to_string(),
        });
    }

    let existing: Vec<&KeeperRecord> = season_keepers.iter().filter(|k| k.roster_id == roster_id).collect();

    let eligibility = &evaluation.eligibility;
    if !eligibility.is_eligible {
        return Err(KeeperRejection::Ineligible {
            player_id: player_id.to_string(),
            reason: eligibility
                .reason
                .clone()
                .unwrap_or_else(|| "not eligible".to_string()),
        });
    }

    if existing.len() >= usize::from(settings.max_keepers) {
        return Err(KeeperRejection::KeeperLimitReached {
            max: settings.max_keepers,
        });
    }

    match keeper_type {
        KeeperType::Franchise => {
            if evaluation.cost.franchise.is_none() {
                return Err(KeeperRejection::FranchiseLimitReached {
                    max: settings.max_franchise_tags,
                });
            }
        }
        KeeperType::Regular => {
            if evaluation.cost.regular.is_none() {
                return Err(KeeperRejection::FranchiseOnly {
                    player_id: player_id.to_string(),
                });
            }
            let regulars = existing
                .iter()
                .filter(|k| k.keeper_type == KeeperType::Regular)
                .count();
            if regulars >= usize::from(settings.max_regular_keepers) {
                return Err(KeeperRejection::RegularLimitReached {
                    max: settings.max_regular_keepers,
                });
            }
        }
    }

    Ok(())
}

/// Build the keeper record for an accepted selection. `final_cost` starts at
/// the pre-cascade cost and is rewritten by the next cascade pass.
pub fn build_keeper(
    roster_id: &RosterId,
    season: Season,
    keeper_type: KeeperType,
    evaluation: &KeeperEvaluation,
) -> Option<KeeperRecord> {
    let cost = evaluation.cost.cost_for(keeper_type)?;
    Some(KeeperRecord {
        player_id: evaluation.eligibility.player_id.clone(),
        roster_id: roster_id.clone(),
        season,
        keeper_type,
        base_cost: cost,
        final_cost: cost,
        years_kept: evaluation.eligibility.years_kept,
        acquisition_type: evaluation.eligibility.acquisition_type,
        is_locked: false,
    })
}

/// Check that `player_id` can be removed from `existing`.
pub fn validate_remove(existing: &[KeeperRecord], player_id: &str, actor: Actor) -> Result<(), KeeperRejection> {
    let keeper = existing
        .iter()
        .find(|k| k.player_id == player_id)
        .ok_or_else(|| KeeperRejection::NotAKeeper {
            player_id: player_id.to_string(),
        })?;
    if keeper.is_locked && actor != Actor::Commissioner {
        return Err(KeeperRejection::Locked {
            player_id: player_id.to_string(),
        });
    }
    Ok(())
}

/// Check that `actor` may flip the lock on `player_id`. Returns the new
/// lock state.
pub fn validate_lock_toggle(existing: &[KeeperRecord], player_id: &str, actor: Actor) -> Result<bool, KeeperRejection> {
    if actor != Actor::Commissioner {
        return Err(KeeperRejection::NotCommissioner);
    }
    existing
        .iter()
        .find(|k| k.player_id == player_id)
        .map(|k| !k.is_locked)
        .ok_or_else(|| KeeperRejection::NotAKeeper {
            player_id: player_id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::evaluate;
    use crate::model::{AcquisitionType, DraftPickRecord, PlayerFacts, Position};
    use crate::settings::tests::test_settings;

    fn keeper(id: &str, keeper_type: KeeperType) -> KeeperRecord {
        KeeperRecord {
            player_id: id.into(),
            roster_id: "r1".into(),
            season: 2024,
            keeper_type,
            base_cost: 5,
            final_cost: 5,
            years_kept: 0,
            acquisition_type: AcquisitionType::Drafted,
            is_locked: false,
        }
    }

    fn player(id: &str) -> Player {
        Player {
            id: id.into(),
            name: format!("Player {id}"),
            position: Position::RunningBack,
            team: None,
            age: Some(25),
            experience: None,
            roster_id: Some("r1".into()),
        }
    }

    fn fresh_eval(player: &str, existing: &[KeeperRecord]) -> KeeperEvaluation {
        let mut facts = PlayerFacts::new(player);
        facts.draft_picks.push(DraftPickRecord {
            player_id: player.into(),
            roster_id: "r1".into(),
            season: 2023,
            round: 6,
        });
        evaluate(&test_settings(), "r1", 2024, &facts, existing)
    }

    fn franchise_only_eval(player: &str) -> KeeperEvaluation {
        let mut facts = PlayerFacts::new(player);
        facts.draft_picks.push(DraftPickRecord {
            player_id: player.into(),
            roster_id: "r1".into(),
            season: 2021,
            round: 6,
        });
        for season in [2022, 2023] {
            facts.keeper_history.push(KeeperRecord {
                season,
                player_id: player.into(),
                ..keeper(player, KeeperType::Regular)
            });
        }
        evaluate(&test_settings(), "r1", 2024, &facts, &[])
    }

    #[test]
    fn accepts_first_regular_keeper() {
        let s = test_settings();
        let eval = fresh_eval("p1", &[]);
        assert!(validate_add(&s, "r1", &[], &player("p1"), KeeperType::Regular, &eval).is_ok());
        let record = build_keeper(&"r1".to_string(), 2024, KeeperType::Regular, &eval).unwrap();
        assert_eq!(record.base_cost, 5);
        assert_eq!(record.final_cost, 5);
        assert!(!record.is_locked);
    }

    #[test]
    fn rejects_duplicate() {
        let s = test_settings();
        let existing = vec![keeper("p1", KeeperType::Regular)];
        let eval = fresh_eval("p1", &existing);
        let err = validate_add(&s, "r1", &existing, &player("p1"), KeeperType::Regular, &eval).unwrap_err();
        assert_eq!(err, KeeperRejection::DuplicateKeeper { player_id: "p1".into() });
    }

    #[test]
    fn rejects_player_kept_by_another_roster() {
        let s = test_settings();
        let elsewhere = KeeperRecord {
            roster_id: "r2".into(),
            ..keeper("p1", KeeperType::Regular)
        };
        let existing = vec![elsewhere];
        let eval = fresh_eval("p1", &[]);
        let err = validate_add(&s, "r1", &existing, &player("p1"), KeeperType::Regular, &eval).unwrap_err();
        assert_eq!(
            err,
            KeeperRejection::KeptByOtherRoster {
                player_id: "p1".into(),
                roster_id: "r2".into(),
            }
        );
    }

    #[test]
    fn rejects_player_not_on_roster() {
        let s = test_settings();
        let eval = fresh_eval("p1", &[]);
        let mut traded_away = player("p1");
        traded_away.roster_id = Some("r2".into());
        let err = validate_add(&s, "r1", &[], &traded_away, KeeperType::Regular, &eval).unwrap_err();
        assert_eq!(
            err,
            KeeperRejection::NotOnRoster {
                player_id: "p1".into(),
                roster_id: "r1".into(),
            }
        );

        let mut free_agent = player("p1");
        free_agent.roster_id = None;
        assert!(matches!(
            validate_add(&s, "r1", &[], &free_agent, KeeperType::Regular, &eval),
            Err(KeeperRejection::NotOnRoster { .. })
        ));
    }

    #[test]
    fn rejects_over_total_limit() {
        let s = test_settings();
        let existing: Vec<_> = ["a", "b", "c", "d"].iter().map(|id| keeper(id, KeeperType::Regular)).collect();
        let eval = fresh_eval("p1", &existing);
        let err = validate_add(&s, "r1", &existing, &player("p1"), KeeperType::Franchise, &eval).unwrap_err();
        assert_eq!(err, KeeperRejection::KeeperLimitReached { max: 4 });
    }

    #[test]
    fn rejects_over_regular_limit() {
        let s = test_settings();
        let existing: Vec<_> = ["a", "b", "c"].iter().map(|id| keeper(id, KeeperType::Regular)).collect();
        let eval = fresh_eval("p1", &existing);
        let err = validate_add(&s, "r1", &existing, &player("p1"), KeeperType::Regular, &eval).unwrap_err();
        assert_eq!(err, KeeperRejection::RegularLimitReached { max: 3 });
        // The fourth slot is still open for a franchise tag.
        assert!(validate_add(&s, "r1", &existing, &player("p1"), KeeperType::Franchise, &eval).is_ok());
    }

    #[test]
    fn rejects_second_franchise_tag() {
        let s = test_settings();
        let existing = vec![keeper("f", KeeperType::Franchise)];
        let eval = fresh_eval("p1", &existing);
        let err = validate_add(&s, "r1", &existing, &player("p1"), KeeperType::Franchise, &eval).unwrap_err();
        assert_eq!(err, KeeperRejection::FranchiseLimitReached { max: 1 });
    }

    #[test]
    fn franchise_only_player_cannot_be_regular() {
        let s = test_settings();
        let eval = franchise_only_eval("p1");
        let err = validate_add(&s, "r1", &[], &player("p1"), KeeperType::Regular, &eval).unwrap_err();
        assert_eq!(err, KeeperRejection::FranchiseOnly { player_id: "p1".into() });
        assert!(validate_add(&s, "r1", &[], &player("p1"), KeeperType::Franchise, &eval).is_ok());
        assert!(build_keeper(&"r1".to_string(), 2024, KeeperType::Regular, &eval).is_none());
    }

    #[test]
    fn ineligible_player_rejected_with_reason() {
        let s = test_settings();
        let existing = vec![keeper("f", KeeperType::Franchise)];
        let mut eval = franchise_only_eval("p1");
        eval.eligibility.is_eligible = false;
        eval.eligibility.reason = Some("all franchise tags are in use".into());
        let err = validate_add(&s, "r1", &existing, &player("p1"), KeeperType::Franchise, &eval).unwrap_err();
        assert!(err.to_string().contains("all franchise tags are in use"));
    }

    #[test]
    fn locked_keeper_only_removable_by_commissioner() {
        let mut locked = keeper("p1", KeeperType::Regular);
        locked.is_locked = true;
        let existing = vec![locked];
        assert_eq!(
            validate_remove(&existing, "p1", Actor::Owner).unwrap_err(),
            KeeperRejection::Locked { player_id: "p1".into() }
        );
        assert!(validate_remove(&existing, "p1", Actor::Commissioner).is_ok());
        assert!(matches!(
            validate_remove(&existing, "p2", Actor::Owner),
            Err(KeeperRejection::NotAKeeper { .. })
        ));
    }

    #[test]
    fn lock_toggle_requires_commissioner() {
        let existing = vec![keeper("p1", KeeperType::Regular)];
        assert_eq!(
            validate_lock_toggle(&existing, "p1", Actor::Owner).unwrap_err(),
            KeeperRejection::NotCommissioner
        );
        assert_eq!(validate_lock_toggle(&existing, "p1", Actor::Commissioner), Ok(true));
    }
}
