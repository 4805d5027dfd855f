// Trade Value Calculator.
//
// Projects each traded player's keeper cost onto the receiving roster with
// the same eligibility rules the keeper screens use, values players and
// picks, and reports a fairness score plus a list of plain facts. It never
// recommends accepting or rejecting a trade.

pub mod value;

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::eligibility::evaluate;
use crate::model::{KeeperRecord, Player, PlayerFacts, PlayerId, Position, Round, RosterId, RosterRef, Season};
use crate::settings::KeeperSettings;

pub use value::{AgeCurve, PickCurve, TradeValueWeights};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeError {
    #[error("unknown roster: {0}")]
    UnknownRoster(RosterId),

    #[error("unknown player: {0}")]
    UnknownPlayer(PlayerId),

    #[error("both sides of the trade are roster {0}")]
    SameRoster(RosterId),

    #[error("trade moves no players or picks")]
    EmptyTrade,
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A draft pick offered in a trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradePick {
    pub season: Season,
    pub round: Round,
    /// Roster whose pick this originally was; defaults to the giving roster.
    #[serde(default)]
    pub original_owner_id: Option<RosterId>,
}

/// What one roster gives up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeSide {
    pub roster_id: RosterId,
    #[serde(default)]
    pub players: Vec<PlayerId>,
    #[serde(default)]
    pub picks: Vec<TradePick>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeProposal {
    pub team1: TradeSide,
    pub team2: TradeSide,
    /// Fantasy season in which the trade is made; its deadline applies.
    pub season: Season,
    pub trade_date: DateTime<Utc>,
}

/// Snapshot of league facts a trade is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct TradeContext<'a> {
    pub settings: &'a KeeperSettings,
    pub weights: &'a TradeValueWeights,
    pub rosters: &'a [RosterRef],
    pub players: &'a HashMap<PlayerId, Player>,
    pub facts: &'a HashMap<PlayerId, PlayerFacts>,
    /// Keeper records for `settings.current_season`, all rosters.
    pub keepers: &'a [KeeperRecord],
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProjection {
    pub player_id: PlayerId,
    pub player_name: String,
    pub position: Position,
    pub from_roster_id: RosterId,
    pub to_roster_id: RosterId,
    /// Currently a keeper on the giving roster.
    pub is_keeper: bool,
    pub pre_trade_cost: Option<Round>,
    pub post_trade_cost: Option<Round>,
    pub pre_trade_years: u8,
    pub post_trade_years: u8,
    pub keeper_reset: bool,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickProjection {
    pub season: Season,
    pub round: Round,
    pub original_owner_id: RosterId,
    pub seasons_out: u32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamTradeSummary {
    pub roster_id: RosterId,
    pub roster_name: String,
    pub value_given: f64,
    pub value_received: f64,
    pub net_value: f64,
    /// Received minus given, per position; zero entries omitted.
    pub position_changes: BTreeMap<Position, i32>,
    /// Current keepers received minus current keepers given.
    pub keeper_slot_delta: i32,
    /// Pick value received minus pick value given.
    pub draft_capital_delta: f64,
    pub players_given: Vec<PlayerProjection>,
    pub players_received: Vec<PlayerProjection>,
    pub picks_given: Vec<PickProjection>,
    pub picks_received: Vec<PickProjection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeAnalysis {
    pub team1: TeamTradeSummary,
    pub team2: TeamTradeSummary,
    /// 100 when both sides give equal value, falling toward 0 as they diverge.
    pub fairness_score: f64,
    /// Value given by team 1 minus value given by team 2.
    pub value_differential: f64,
    pub facts: Vec<String>,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// `100 - 200 * |a - b| / (a + b)`, clamped to `[0, 100]`. A trade of
/// nothing for nothing is even.
pub fn fairness_score(value_given1: f64, value_given2: f64) -> f64 {
    let total = value_given1 + value_given2;
    if total <= 0.0 {
        return 100.0;
    }
    (100.0 - 200.0 * (value_given1 - value_given2).abs() / total).clamp(0.0, 100.0)
}

fn project_player(
    ctx: &TradeContext<'_>,
    proposal: &TradeProposal,
    player_id: &str,
    from: &str,
    to: &str,
) -> Result<PlayerProjection, TradeError> {
    let player = ctx
        .players
        .get(player_id)
        .ok_or_else(|| TradeError::UnknownPlayer(player_id.to_string()))?;
    let empty = PlayerFacts::new(player_id);
    let facts = ctx.facts.get(player_id).unwrap_or(&empty);
    let settings = ctx.settings;

    let giver_keepers: Vec<KeeperRecord> = ctx
        .keepers
        .iter()
        .filter(|k| k.roster_id == from && k.season == settings.current_season)
        .cloned()
        .collect();
    let is_keeper = giver_keepers.iter().any(|k| k.player_id == player_id);

    let pre = evaluate(settings, from, settings.current_season, facts, &giver_keepers);
    let pre_trade_cost = pre.cost.regular.map(|c| c.final_cost);
    let pre_trade_years = pre.eligibility.consecutive_years;

    let keeper_reset = settings.is_post_deadline(proposal.season, proposal.trade_date);
    let (post_trade_cost, post_trade_years) = if keeper_reset {
        (Some(settings.undrafted_round), 0)
    } else {
        (pre_trade_cost, pre_trade_years)
    };

    let value = ctx.weights.player_value(player.position, player.age, post_trade_cost, settings.undrafted_round);

    debug!(
        "projected '{}' {} -> {}: cost {:?} -> {:?}, years {} -> {}, value {:.1}",
        player_id, from, to, pre_trade_cost, post_trade_cost, pre_trade_years, post_trade_years, value
    );

    Ok(PlayerProjection {
        player_id: player_id.to_string(),
        player_name: player.name.clone(),
        position: player.position,
        from_roster_id: from.to_string(),
        to_roster_id: to.to_string(),
        is_keeper,
        pre_trade_cost,
        post_trade_cost,
        pre_trade_years,
        post_trade_years,
        keeper_reset,
        value,
    })
}

fn project_pick(ctx: &TradeContext<'_>, pick: &TradePick, giver: &str) -> PickProjection {
    let seasons_out = u32::try_from(pick.season - ctx.settings.current_season).unwrap_or(0);
    PickProjection {
        season: pick.season,
        round: pick.round,
        original_owner_id: pick.original_owner_id.clone().unwrap_or_else(|| giver.to_string()),
        seasons_out,
        value: ctx.weights.pick_value(pick.round, seasons_out),
    }
}

struct SideProjection {
    players: Vec<PlayerProjection>,
    picks: Vec<PickProjection>,
}

impl SideProjection {
    fn total(&self) -> f64 {
        self.player_value() + self.pick_value()
    }

    fn player_value(&self) -> f64 {
        self.players.iter().map(|p| p.value).sum()
    }

    fn pick_value(&self) -> f64 {
        self.picks.iter().map(|p| p.value).sum()
    }

    fn keepers(&self) -> i32 {
        i32::try_from(self.players.iter().filter(|p| p.is_keeper).count()).unwrap_or(i32::MAX)
    }
}

fn project_side(
    ctx: &TradeContext<'_>,
    proposal: &TradeProposal,
    side: &TradeSide,
    receiver: &str,
) -> Result<SideProjection, TradeError> {
    let players = side
        .players
        .iter()
        .map(|id| project_player(ctx, proposal, id, &side.roster_id, receiver))
        .collect::<Result<Vec<_>, _>>()?;
    let picks = side
        .picks
        .iter()
        .map(|p| project_pick(ctx, p, &side.roster_id))
        .collect();
    Ok(SideProjection { players, picks })
}

fn summarize(roster: &RosterRef, given: &SideProjection, received: &SideProjection) -> TeamTradeSummary {
    let mut position_changes: BTreeMap<Position, i32> = BTreeMap::new();
    for p in &received.players {
        *position_changes.entry(p.position).or_default() += 1;
    }
    for p in &given.players {
        *position_changes.entry(p.position).or_default() -= 1;
    }
    position_changes.retain(|_, delta| *delta != 0);

    let value_given = given.total();
    let value_received = received.total();
    TeamTradeSummary {
        roster_id: roster.id.clone(),
        roster_name: roster.name.clone(),
        value_given,
        value_received,
        net_value: value_received - value_given,
        position_changes,
        keeper_slot_delta: received.keepers() - given.keepers(),
        draft_capital_delta: received.pick_value() - given.pick_value(),
        players_given: given.players.clone(),
        players_received: received.players.clone(),
        picks_given: given.picks.clone(),
        picks_received: received.picks.clone(),
    }
}

fn player_facts(
    settings: &KeeperSettings,
    proposal: &TradeProposal,
    summary: &TeamTradeSummary,
    out: &mut Vec<String>,
) {
    for p in &summary.players_received {
        if p.keeper_reset {
            out.push(format!(
                "{} was traded after the {} trade deadline: keeper cost resets to round {} and years kept reset to 0",
                p.player_name, proposal.season, settings.undrafted_round
            ));
        } else if let Some(cost) = p.post_trade_cost {
            out.push(format!(
                "{} keeps a round {} keeper cost with {} consecutive years kept",
                p.player_name, cost, p.post_trade_years
            ));
        } else {
            out.push(format!("{} can only be kept with a franchise tag", p.player_name));
        }
    }
}

fn team_facts(summary: &TeamTradeSummary, out: &mut Vec<String>) {
    for (pos, delta) in &summary.position_changes {
        let verb = if *delta > 0 { "gains" } else { "loses" };
        out.push(format!("{} {} {} {}", summary.roster_name, verb, delta.abs(), pos));
    }
    if summary.keeper_slot_delta != 0 {
        let verb = if summary.keeper_slot_delta > 0 { "takes on" } else { "frees" };
        out.push(format!(
            "{} {} {} keeper slot(s)",
            summary.roster_name,
            verb,
            summary.keeper_slot_delta.abs()
        ));
    }
    if !summary.picks_given.is_empty() || !summary.picks_received.is_empty() {
        out.push(format!(
            "{} draft capital changes by {:+.1}",
            summary.roster_name, summary.draft_capital_delta
        ));
    }
}

/// Score a proposed two-team trade.
pub fn analyze_trade(ctx: &TradeContext<'_>, proposal: &TradeProposal) -> Result<TradeAnalysis, TradeError> {
    let lookup = |id: &str| {
        ctx.rosters
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| TradeError::UnknownRoster(id.to_string()))
    };
    let roster1 = lookup(&proposal.team1.roster_id)?;
    let roster2 = lookup(&proposal.team2.roster_id)?;
    if roster1.id == roster2.id {
        return Err(TradeError::SameRoster(roster1.id.clone()));
    }
    let side_empty = |s: &TradeSide| s.players.is_empty() && s.picks.is_empty();
    if side_empty(&proposal.team1) && side_empty(&proposal.team2) {
        return Err(TradeError::EmptyTrade);
    }

    let given1 = project_side(ctx, proposal, &proposal.team1, &roster2.id)?;
    let given2 = project_side(ctx, proposal, &proposal.team2, &roster1.id)?;

    let team1 = summarize(roster1, &given1, &given2);
    let team2 = summarize(roster2, &given2, &given1);
    let fairness = fairness_score(team1.value_given, team2.value_given);
    let differential = team1.value_given - team2.value_given;

    let mut facts = Vec::new();
    player_facts(ctx.settings, proposal, &team1, &mut facts);
    player_facts(ctx.settings, proposal, &team2, &mut facts);
    team_facts(&team1, &mut facts);
    team_facts(&team2, &mut facts);
    if differential.abs() < 0.05 {
        facts.push("Both sides give equal value".to_string());
    } else {
        let favored = if differential > 0.0 { &team2.roster_name } else { &team1.roster_name };
        facts.push(format!("Value differential of {:.1} in favor of {}", differential.abs(), favored));
    }

    debug!(
        "trade {} <-> {}: given {:.1} / {:.1}, fairness {:.1}",
        roster1.id, roster2.id, team1.value_given, team2.value_given, fairness
    );

    Ok(TradeAnalysis {
        team1,
        team2,
        fairness_score: fairness,
        value_differential: differential,
        facts,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
