// Keeper eligibility and base/escalated cost for one player on one roster.
//
// Derives how the roster acquired the player, whether a post-deadline trade
// wiped the player's keeper value, how many consecutive seasons the player
// has been kept, and from that the franchise and regular keeper costs.

use serde::Serialize;
use tracing::debug;

use crate::model::{
    AcquisitionType, KeeperRecord, KeeperType, PlayerFacts, PlayerId, Round, Season,
    TransactionType,
};
use crate::settings::KeeperSettings;

/// A player drafted by another roster still counts as DRAFTED when this
/// roster acquired the player no more than this many seasons after that draft.
pub const DRAFTED_ACQUISITION_WINDOW: Season = 1;

/// The fixed cost of a franchise tag.
pub const FRANCHISE_ROUND: Round = 1;

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResult {
    pub player_id: PlayerId,
    pub is_eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Seasons this roster has kept the player (carried across a pre-deadline trade).
    pub years_kept: u8,
    /// Unbroken run of seasons kept, ending with the previous season.
    pub consecutive_years: u8,
    pub acquisition_type: AcquisitionType,
    pub is_post_deadline_trade: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostPair {
    pub base_cost: Round,
    pub final_cost: Round,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostResult {
    pub player_id: PlayerId,
    /// Present when a franchise slot is still open.
    pub franchise: Option<CostPair>,
    /// Present when the player may still be kept as a REGULAR keeper;
    /// `final_cost` is the escalated cost.
    pub regular: Option<CostPair>,
}

impl CostResult {
    /// Pre-cascade cost for keeping the player as `keeper_type`.
    pub fn cost_for(&self, keeper_type: KeeperType) -> Option<Round> {
        match keeper_type {
            KeeperType::Franchise => self.franchise.map(|c| c.final_cost),
            KeeperType::Regular => self.regular.map(|c| c.final_cost),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeeperEvaluation {
    pub eligibility: EligibilityResult,
    pub cost: CostResult,
}

// ---------------------------------------------------------------------------
// Acquisition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquisition {
    pub acquisition_type: AcquisitionType,
    pub is_post_deadline_trade: bool,
    /// Draft round the base cost derives from, when there is one.
    pub draft_round: Option<Round>,
}

/// Work out how `roster_id` came to hold the player.
///
/// A post-deadline trade onto the roster overrides every other rule. After
/// that: a pick owned by this roster, or a pick elsewhere followed by an
/// acquisition within [`DRAFTED_ACQUISITION_WINDOW`] seasons, is DRAFTED at
/// that pick's round. Otherwise the latest inbound transaction decides, with
/// trades carrying the player's original draft round. No record at all
/// defaults to WAIVER.
pub fn determine_acquisition(settings: &KeeperSettings, roster_id: &str, facts: &PlayerFacts) -> Acquisition {
    let inbound = facts.latest_inbound(roster_id);

    if let Some(txn) = inbound {
        if txn.kind == TransactionType::Trade && settings.is_post_deadline(txn.season, txn.timestamp) {
            return Acquisition {
                acquisition_type: AcquisitionType::Trade,
                is_post_deadline_trade: true,
                draft_round: None,
            };
        }
    }

    if let Some(pick) = facts.most_recent_pick() {
        let drafted_here = pick.roster_id == roster_id;
        let acquired_soon_after = inbound.is_some_and(|t| {
            t.season >= pick.season && t.season - pick.season <= DRAFTED_ACQUISITION_WINDOW
        });
        if drafted_here || acquired_soon_after {
            return Acquisition {
                acquisition_type: AcquisitionType::Drafted,
                is_post_deadline_trade: false,
                draft_round: Some(pick.round),
            };
        }
    }

    let (acquisition_type, draft_round) = match inbound.map(|t| t.kind) {
        Some(TransactionType::Trade) => (
            AcquisitionType::Trade,
            facts.original_pick().map(|p| p.round),
        ),
        Some(TransactionType::FreeAgent) => (AcquisitionType::FreeAgent, None),
        Some(TransactionType::Waiver) | None => (AcquisitionType::Waiver, None),
    };

    Acquisition {
        acquisition_type,
        is_post_deadline_trade: false,
        draft_round,
    }
}

/// Base cost before consecutive-year escalation.
pub fn base_cost(settings: &KeeperSettings, acquisition: &Acquisition) -> Round {
    if acquisition.is_post_deadline_trade {
        return settings.undrafted_round;
    }
    match (acquisition.acquisition_type, acquisition.draft_round) {
        (AcquisitionType::Drafted | AcquisitionType::Trade, Some(round)) => settings.drafted_base_cost(round),
        _ => settings.undrafted_round,
    }
}

/// `(years_kept, consecutive_years)` ending with `season - 1`.
///
/// A pre-deadline trade keeps the player's history, so seasons kept by any
/// roster count. Otherwise only this roster's seasons do. A post-deadline
/// trade resets both counts.
pub fn keeper_years(roster_id: &str, season: Season, facts: &PlayerFacts, acquisition: &Acquisition) -> (u8, u8) {
    if acquisition.is_post_deadline_trade {
        return (0, 0);
    }
    let follow_player = acquisition.acquisition_type == AcquisitionType::Trade;
    let seasons = facts.seasons_kept(roster_id, season, follow_player);

    let mut consecutive: u8 = 0;
    let mut s = season - 1;
    while seasons.contains(&s) {
        consecutive = consecutive.saturating_add(1);
        s -= 1;
    }
    let years_kept = u8::try_from(seasons.len()).unwrap_or(u8::MAX);
    (years_kept, consecutive)
}

/// Number of FRANCHISE keepers in `keepers` other than `player_id`.
pub fn franchise_count(keepers: &[KeeperRecord], player_id: &str) -> u8 {
    let n = keepers
        .iter()
        .filter(|k| k.keeper_type == KeeperType::Franchise && k.player_id != player_id)
        .count();
    u8::try_from(n).unwrap_or(u8::MAX)
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate one player on one roster for `season`.
///
/// `roster_keepers` is the roster's current keeper set for that season; it
/// is only used to count franchise tags already in use.
pub fn evaluate(
    settings: &KeeperSettings,
    roster_id: &str,
    season: Season,
    facts: &PlayerFacts,
    roster_keepers: &[KeeperRecord],
) -> KeeperEvaluation {
    let acquisition = determine_acquisition(settings, roster_id, facts);
    let base = base_cost(settings, &acquisition);
    let (years_kept, consecutive_years) = keeper_years(roster_id, season, facts, &acquisition);
    let escalated = settings.escalated_cost(base, consecutive_years);

    let franchise_in_use = franchise_count(roster_keepers, &facts.player_id);
    let franchise_open = franchise_in_use < settings.max_franchise_tags;
    let regular_open = consecutive_years < settings.regular_keeper_max_years;

    let reason = match (regular_open, franchise_open) {
        (true, _) => None,
        (false, true) => Some(format!(
            "Kept {} consecutive years (regular keeper limit is {}); eligible only as a franchise tag",
            consecutive_years, settings.regular_keeper_max_years
        )),
        (false, false) => Some(format!(
            "Kept {} consecutive years (regular keeper limit is {}) and all {} franchise tags are in use",
            consecutive_years, settings.regular_keeper_max_years, settings.max_franchise_tags
        )),
    };

    debug!(
        "evaluated player '{}' on roster '{}': {} base={} escalated={} consecutive={} post_deadline={}",
        facts.player_id,
        roster_id,
        acquisition.acquisition_type.label(),
        base,
        escalated,
        consecutive_years,
        acquisition.is_post_deadline_trade
    );

    KeeperEvaluation {
        eligibility: EligibilityResult {
            player_id: facts.player_id.clone(),
            is_eligible: regular_open || franchise_open,
            reason,
            years_kept,
            consecutive_years,
            acquisition_type: acquisition.acquisition_type,
            is_post_deadline_trade: acquisition.is_post_deadline_trade,
        },
        cost: CostResult {
            player_id: facts.player_id.clone(),
            franchise: franchise_open.then_some(CostPair {
                base_cost: FRANCHISE_ROUND,
                final_cost: FRANCHISE_ROUND,
            }),
            regular: regular_open.then_some(CostPair {
                base_cost: base,
                final_cost: escalated,
            }),
        },
    }
}

/// Evaluate every player in `facts` for the same roster.
pub fn evaluate_roster(
    settings: &KeeperSettings,
    roster_id: &str,
    season: Season,
    facts: &[PlayerFacts],
    roster_keepers: &[KeeperRecord],
) -> Vec<KeeperEvaluation> {
    facts
        .iter()
        .map(|f| evaluate(settings, roster_id, season, f, roster_keepers))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
