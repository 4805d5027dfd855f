// Domain model: players, rosters, historical facts, and keeper records.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type PlayerId = String;
pub type RosterId = String;
pub type Season = i32;
pub type Round = u8;

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// Football positions that can be rostered and kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "QB")]
    Quarterback,
    #[serde(rename = "RB")]
    RunningBack,
    #[serde(rename = "WR")]
    WideReceiver,
    #[serde(rename = "TE")]
    TightEnd,
    #[serde(rename = "K")]
    Kicker,
    #[serde(rename = "DEF")]
    Defense,
}

impl Position {
    /// Parse a position abbreviation (case-insensitive). "DST" and "D/ST"
    /// are accepted as aliases for team defense.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" => Some(Position::RunningBack),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "K" | "PK" => Some(Position::Kicker),
            "DEF" | "DST" | "D/ST" => Some(Position::Defense),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Kicker => "K",
            Position::Defense => "DEF",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Immutable player reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    /// NFL team abbreviation, if the player is currently signed.
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub age: Option<u8>,
    /// Years of professional experience.
    #[serde(default)]
    pub experience: Option<u8>,
    /// Fantasy roster the player is currently on; `None` for free agents.
    #[serde(default)]
    pub roster_id: Option<RosterId>,
}

/// A fantasy roster (one team in the league).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterRef {
    pub id: RosterId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Historical facts
// ---------------------------------------------------------------------------

/// A player selected in a season's draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPickRecord {
    pub player_id: PlayerId,
    pub roster_id: RosterId,
    pub season: Season,
    pub round: Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Trade,
    Waiver,
    FreeAgent,
}

impl TransactionType {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::Trade => "TRADE",
            TransactionType::Waiver => "WAIVER",
            TransactionType::FreeAgent => "FREE_AGENT",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "TRADE" => Some(TransactionType::Trade),
            "WAIVER" => Some(TransactionType::Waiver),
            "FREE_AGENT" => Some(TransactionType::FreeAgent),
            _ => None,
        }
    }
}

/// A completed transaction that moved a player onto a roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// The league season in which the transaction was processed.
    pub season: Season,
    pub timestamp: DateTime<Utc>,
    pub player_id: PlayerId,
    /// Roster that received the player.
    pub to_roster_id: RosterId,
    /// Roster that gave the player up (trades only).
    #[serde(default)]
    pub from_roster_id: Option<RosterId>,
}

/// A transfer of a season/round draft pick between rosters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradedPick {
    pub season: Season,
    pub round: Round,
    pub original_owner_id: RosterId,
    pub current_owner_id: RosterId,
}

// ---------------------------------------------------------------------------
// Keepers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeeperType {
    Franchise,
    Regular,
}

impl KeeperType {
    pub fn label(&self) -> &'static str {
        match self {
            KeeperType::Franchise => "FRANCHISE",
            KeeperType::Regular => "REGULAR",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "FRANCHISE" => Some(KeeperType::Franchise),
            "REGULAR" => Some(KeeperType::Regular),
            _ => None,
        }
    }
}

/// How a roster obtained a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcquisitionType {
    Drafted,
    Trade,
    Waiver,
    FreeAgent,
}

impl AcquisitionType {
    pub fn label(&self) -> &'static str {
        match self {
            AcquisitionType::Drafted => "DRAFTED",
            AcquisitionType::Trade => "TRADE",
            AcquisitionType::Waiver => "WAIVER",
            AcquisitionType::FreeAgent => "FREE_AGENT",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "DRAFTED" => Some(AcquisitionType::Drafted),
            "TRADE" => Some(AcquisitionType::Trade),
            "WAIVER" => Some(AcquisitionType::Waiver),
            "FREE_AGENT" => Some(AcquisitionType::FreeAgent),
            _ => None,
        }
    }
}

/// A player retained by a roster for a season. Unique on
/// `(player_id, roster_id, season)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeeperRecord {
    pub player_id: PlayerId,
    pub roster_id: RosterId,
    pub season: Season,
    #[serde(rename = "type")]
    pub keeper_type: KeeperType,
    /// Round cost before cascade adjustment: the escalated cost for REGULAR
    /// keepers, always 1 for FRANCHISE keepers.
    pub base_cost: Round,
    /// Round actually consumed after the cascade pass.
    pub final_cost: Round,
    pub years_kept: u8,
    pub acquisition_type: AcquisitionType,
    pub is_locked: bool,
}

// ---------------------------------------------------------------------------
// Per-player fact bundle
// ---------------------------------------------------------------------------

/// Everything the engine needs to know about one player's history,
/// pre-fetched by the caller in a single read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerFacts {
    pub player_id: PlayerId,
    #[serde(default)]
    pub draft_picks: Vec<DraftPickRecord>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Keeper records for this player across all rosters and seasons.
    #[serde(default)]
    pub keeper_history: Vec<KeeperRecord>,
}

impl PlayerFacts {
    pub fn new(player_id: impl Into<PlayerId>) -> Self {
        PlayerFacts {
            player_id: player_id.into(),
            ..Default::default()
        }
    }

    /// The latest draft selection of this player (highest season).
    pub fn most_recent_pick(&self) -> Option<&DraftPickRecord> {
        self.draft_picks.iter().max_by_key(|p| p.season)
    }

    /// The first draft selection of this player (lowest season).
    pub fn original_pick(&self) -> Option<&DraftPickRecord> {
        self.draft_picks.iter().min_by_key(|p| p.season)
    }

    /// The most recent transaction that landed this player on `roster_id`.
    pub fn latest_inbound(&self, roster_id: &str) -> Option<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.to_roster_id == roster_id)
            .max_by_key(|t| t.timestamp)
    }

    /// Seasons before `before_season` in which the player was kept, either by
    /// `roster_id` only or, with `any_roster`, by any roster.
    pub fn seasons_kept(&self, roster_id: &str, before_season: Season, any_roster: bool) -> BTreeSet<Season> {
        self.keeper_history
            .iter()
            .filter(|k| k.season < before_season)
            .filter(|k| any_roster || k.roster_id == roster_id)
            .map(|k| k.season)
            .collect()
    }
}
