// League keeper rules: the validated settings struct every calculation
// receives by value.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::model::{Round, Season};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("invalid keeper setting `{field}`: {message}")]
    Invalid { field: String, message: String },
}

impl SettingsError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        SettingsError::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            SettingsError::Invalid { field, .. } => field,
        }
    }
}

// ---------------------------------------------------------------------------
// Trade deadlines
// ---------------------------------------------------------------------------

/// A calendar month/day used as the fallback deadline for seasons without an
/// explicit date. Parsed from `"MM-DD"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub fn parse(s: &str) -> Result<Self, SettingsError> {
        let (m, d) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| SettingsError::invalid("deadline_fallback", format!("expected MM-DD, got `{s}`")))?;
        let month = m
            .parse::<u32>()
            .map_err(|_| SettingsError::invalid("deadline_fallback", format!("bad month in `{s}`")))?;
        let day = d
            .parse::<u32>()
            .map_err(|_| SettingsError::invalid("deadline_fallback", format!("bad day in `{s}`")))?;
        let md = MonthDay { month, day };
        md.validate()?;
        Ok(md)
    }

    /// The date in `year`. Feb 29 falls back to Feb 28 in non-leap years.
    pub fn in_year(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
            .or_else(|| NaiveDate::from_ymd_opt(year, self.month, self.day.saturating_sub(1)))
    }

    fn validate(&self) -> Result<(), SettingsError> {
        // 2000 is a leap year, so any real month/day is representable.
        if NaiveDate::from_ymd_opt(2000, self.month, self.day).is_none() {
            return Err(SettingsError::invalid(
                "deadline_fallback",
                format!("{:02}-{:02} is not a calendar date", self.month, self.day),
            ));
        }
        Ok(())
    }
}

/// Per-season trade deadlines after which acquired players lose their
/// keeper value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeDeadlines {
    #[serde(default)]
    pub by_season: BTreeMap<Season, NaiveDate>,
    #[serde(default)]
    pub fallback: Option<MonthDay>,
}

// ---------------------------------------------------------------------------
// KeeperSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeeperSettings {
    pub max_keepers: u8,
    pub max_franchise_tags: u8,
    pub max_regular_keepers: u8,
    /// Consecutive years a player may be kept as a REGULAR keeper before only
    /// the franchise tag remains.
    pub regular_keeper_max_years: u8,
    /// Cost assigned to undrafted, waiver and free-agent players.
    pub undrafted_round: Round,
    /// Best (lowest) round any keeper can cost.
    pub minimum_round: Round,
    pub cost_reduction_per_year: u8,
    pub draft_rounds: Round,
    /// The season keepers are being selected for.
    pub current_season: Season,
    #[serde(default)]
    pub trade_deadlines: TradeDeadlines,
}

impl KeeperSettings {
    /// Check the rule invariants. Misconfiguration is always reported, never
    /// papered over with defaults.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.draft_rounds == 0 {
            return Err(SettingsError::invalid("draft_rounds", "must be greater than 0"));
        }
        if self.minimum_round == 0 {
            return Err(SettingsError::invalid("minimum_round", "must be at least 1"));
        }
        if self.minimum_round > self.undrafted_round {
            return Err(SettingsError::invalid(
                "minimum_round",
                format!(
                    "must be <= undrafted_round ({}), got {}",
                    self.undrafted_round, self.minimum_round
                ),
            ));
        }
        if self.undrafted_round > self.draft_rounds {
            return Err(SettingsError::invalid(
                "undrafted_round",
                format!(
                    "must be <= draft_rounds ({}), got {}",
                    self.draft_rounds, self.undrafted_round
                ),
            ));
        }
        if self.max_franchise_tags > self.max_keepers {
            return Err(SettingsError::invalid(
                "max_franchise_tags",
                format!("must be <= max_keepers ({})", self.max_keepers),
            ));
        }
        if self.max_regular_keepers > self.max_keepers {
            return Err(SettingsError::invalid(
                "max_regular_keepers",
                format!("must be <= max_keepers ({})", self.max_keepers),
            ));
        }
        if self.regular_keeper_max_years == 0 {
            return Err(SettingsError::invalid("regular_keeper_max_years", "must be at least 1"));
        }
        if let Some(md) = &self.trade_deadlines.fallback {
            md.validate()?;
        }
        Ok(())
    }

    /// Deadline for `season`: the explicit date if configured, otherwise the
    /// fallback month/day in that season's calendar year.
    pub fn deadline_for(&self, season: Season) -> Option<NaiveDate> {
        self.trade_deadlines
            .by_season
            .get(&season)
            .copied()
            .or_else(|| self.trade_deadlines.fallback.and_then(|md| md.in_year(season)))
    }

    /// Whether a trade processed at `timestamp` in `season` landed after that
    /// season's deadline. Seasons without a deadline never reset.
    pub fn is_post_deadline(&self, season: Season, timestamp: DateTime<Utc>) -> bool {
        match self.deadline_for(season) {
            Some(deadline) => timestamp.date_naive() > deadline,
            None => {
                warn!("no trade deadline configured for season {season}; treating trade as pre-deadline");
                false
            }
        }
    }

    /// Clamp a raw round cost into `[minimum_round, undrafted_round]`.
    pub fn clamp_cost(&self, round: Round) -> Round {
        round.clamp(self.minimum_round, self.undrafted_round)
    }

    /// Base cost for a player drafted in `draft_round`.
    pub fn drafted_base_cost(&self, draft_round: Round) -> Round {
        self.clamp_cost(draft_round.saturating_sub(self.cost_reduction_per_year))
    }

    /// Cost after `consecutive_years` of escalation, floored at `minimum_round`.
    pub fn escalated_cost(&self, base_cost: Round, consecutive_years: u8) -> Round {
        self.clamp_cost(base_cost.saturating_sub(consecutive_years))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    /// A typical 12-team setup used across the crate's tests.
    pub(crate) fn test_settings() -> KeeperSettings {
        let mut by_season = BTreeMap::new();
        by_season.insert(2023, NaiveDate::from_ymd_opt(2023, 11, 15).unwrap());
        KeeperSettings {
            max_keepers: 4,
            max_franchise_tags: 1,
            max_regular_keepers: 3,
            regular_keeper_max_years: 2,
            undrafted_round: 10,
            minimum_round: 1,
            cost_reduction_per_year: 1,
            draft_rounds: 15,
            current_season: 2024,
            trade_deadlines: TradeDeadlines {
                by_season,
                fallback: Some(MonthDay { month: 11, day: 20 }),
            },
        }
    }

    #[test]
    fn valid_settings_pass() {
        assert!(test_settings().validate().is_ok());
    }

    #[test]
    fn rejects_minimum_above_undrafted() {
        let mut s = test_settings();
        s.minimum_round = 11;
        assert_eq!(s.validate().unwrap_err().field(), "minimum_round");
    }

    #[test]
    fn rejects_undrafted_above_draft_rounds() {
        let mut s = test_settings();
        s.undrafted_round = 16;
        assert_eq!(s.validate().unwrap_err().field(), "undrafted_round");
    }

    #[test]
    fn rejects_zero_rounds_and_zero_minimum() {
        let mut s = test_settings();
        s.draft_rounds = 0;
        assert_eq!(s.validate().unwrap_err().field(), "draft_rounds");

        let mut s = test_settings();
        s.minimum_round = 0;
        assert_eq!(s.validate().unwrap_err().field(), "minimum_round");
    }

    #[test]
    fn rejects_slot_limits_above_max_keepers() {
        let mut s = test_settings();
        s.max_franchise_tags = 5;
        assert_eq!(s.validate().unwrap_err().field(), "max_franchise_tags");

        let mut s = test_settings();
        s.max_regular_keepers = 5;
        assert_eq!(s.validate().unwrap_err().field(), "max_regular_keepers");
    }

    #[test]
    fn rejects_bad_fallback_date() {
        let mut s = test_settings();
        s.trade_deadlines.fallback = Some(MonthDay { month: 2, day: 30 });
        assert_eq!(s.validate().unwrap_err().field(), "deadline_fallback");
    }

    #[test]
    fn month_day_parse() {
        assert_eq!(MonthDay::parse("11-20").unwrap(), MonthDay { month: 11, day: 20 });
        assert!(MonthDay::parse("1120").is_err());
        assert!(MonthDay::parse("13-01").is_err());
        assert!(MonthDay::parse("ab-cd").is_err());
    }

    #[test]
    fn leap_day_fallback_in_common_year() {
        let md = MonthDay { month: 2, day: 29 };
        assert_eq!(md.in_year(2023), NaiveDate::from_ymd_opt(2023, 2, 28));
        assert_eq!(md.in_year(2024), NaiveDate::from_ymd_opt(2024, 2, 29));
    }

    #[test]
    fn explicit_deadline_wins_over_fallback() {
        let s = test_settings();
        assert_eq!(s.deadline_for(2023), NaiveDate::from_ymd_opt(2023, 11, 15));
        assert_eq!(s.deadline_for(2022), NaiveDate::from_ymd_opt(2022, 11, 20));
    }

    #[test]
    fn no_deadline_means_never_post_deadline() {
        let mut s = test_settings();
        s.trade_deadlines = TradeDeadlines::default();
        let ts = Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap();
        assert!(s.deadline_for(2023).is_none());
        assert!(!s.is_post_deadline(2023, ts));
    }

    #[test]
    fn deadline_day_itself_is_not_post_deadline() {
        let s = test_settings();
        let on_deadline = Utc.with_ymd_and_hms(2023, 11, 15, 23, 59, 0).unwrap();
        let day_after = Utc.with_ymd_and_hms(2023, 11, 16, 0, 1, 0).unwrap();
        assert!(!s.is_post_deadline(2023, on_deadline));
        assert!(s.is_post_deadline(2023, day_after));
    }

    #[test]
    fn cost_helpers_respect_bounds() {
        let s = test_settings();
        assert_eq!(s.drafted_base_cost(5), 4);
        assert_eq!(s.drafted_base_cost(1), 1);
        // Late-round picks never cost more than an undrafted player.
        assert_eq!(s.drafted_base_cost(15), 10);
        assert_eq!(s.escalated_cost(4, 1), 3);
        assert_eq!(s.escalated_cost(2, 5), 1);
    }
}
