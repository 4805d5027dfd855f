// Numeric value model for trade analysis: position base values, an age
// curve, a keeper-cost bonus and a discounted draft-pick curve.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Position, Round};
use crate::settings::SettingsError;

/// Age curve. Players younger than `peak_age` earn a bonus per year below the
/// peak (capped at `max_youth_bonus`); older players lose `decline_per_year`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeCurve {
    pub peak_age: u8,
    pub youth_bonus_per_year: f64,
    pub max_youth_bonus: f64,
    pub decline_per_year: f64,
}

impl Default for AgeCurve {
    fn default() -> Self {
        AgeCurve {
            peak_age: 26,
            youth_bonus_per_year: 2.0,
            max_youth_bonus: 10.0,
            decline_per_year: 3.0,
        }
    }
}

/// Draft pick curve: `round_one_value * round_decay^(round-1) * year_discount^seasons_out`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickCurve {
    pub round_one_value: f64,
    pub round_decay: f64,
    pub year_discount: f64,
}

impl Default for PickCurve {
    fn default() -> Self {
        PickCurve {
            round_one_value: 40.0,
            round_decay: 0.75,
            year_discount: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeValueWeights {
    pub positions: BTreeMap<Position, f64>,
    pub age: AgeCurve,
    /// Value per round a keeper's cost sits below the undrafted round.
    pub keeper_bonus_per_round: f64,
    pub picks: PickCurve,
}

impl Default for TradeValueWeights {
    fn default() -> Self {
        let positions = [
            (Position::Quarterback, 30.0),
            (Position::RunningBack, 35.0),
            (Position::WideReceiver, 35.0),
            (Position::TightEnd, 20.0),
            (Position::Kicker, 5.0),
            (Position::Defense, 5.0),
        ]
        .into_iter()
        .collect();
        TradeValueWeights {
            positions,
            age: AgeCurve::default(),
            keeper_bonus_per_round: 3.0,
            picks: PickCurve::default(),
        }
    }
}

impl TradeValueWeights {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if let Some((pos, v)) = self.positions.iter().find(|(_, v)| !v.is_finite() || **v < 0.0) {
            return Err(SettingsError::invalid(
                "positions",
                format!("{pos} value must be a non-negative number, got {v}"),
            ));
        }
        if !(self.picks.round_decay > 0.0 && self.picks.round_decay < 1.0) {
            return Err(SettingsError::invalid(
                "picks.round_decay",
                format!("must be between 0 and 1 (exclusive), got {}", self.picks.round_decay),
            ));
        }
        if !(self.picks.year_discount > 0.0 && self.picks.year_discount <= 1.0) {
            return Err(SettingsError::invalid(
                "picks.year_discount",
                format!("must be in (0, 1], got {}", self.picks.year_discount),
            ));
        }
        if self.picks.round_one_value < 0.0 || self.keeper_bonus_per_round < 0.0 {
            return Err(SettingsError::invalid(
                "keeper_bonus",
                "pick and keeper bonus values must be non-negative",
            ));
        }
        Ok(())
    }

    pub fn base_position_value(&self, position: Position) -> f64 {
        self.positions.get(&position).copied().unwrap_or(0.0)
    }

    /// Unknown ages are neutral.
    pub fn age_modifier(&self, age: Option<u8>) -> f64 {
        let Some(age) = age else {
            return 0.0;
        };
        let curve = &self.age;
        if age <= curve.peak_age {
            let years_young = f64::from(curve.peak_age - age);
            (years_young * curve.youth_bonus_per_year).min(curve.max_youth_bonus)
        } else {
            -f64::from(age - curve.peak_age) * curve.decline_per_year
        }
    }

    /// Bonus for a keeper costing `cost`; no bonus without a regular cost.
    pub fn keeper_value_bonus(&self, cost: Option<Round>, undrafted_round: Round) -> f64 {
        match cost {
            Some(cost) => f64::from(undrafted_round.saturating_sub(cost)) * self.keeper_bonus_per_round,
            None => 0.0,
        }
    }

    /// Position value plus age and keeper adjustments, floored at zero so an
    /// aging player never counts as negative value.
    pub fn player_value(&self, position: Position, age: Option<u8>, cost: Option<Round>, undrafted_round: Round) -> f64 {
        (self.base_position_value(position) + self.age_modifier(age) + self.keeper_value_bonus(cost, undrafted_round))
            .max(0.0)
    }

    /// Value of a pick in `round`, `seasons_out` drafts into the future.
    pub fn pick_value(&self, round: Round, seasons_out: u32) -> f64 {
        let steps = i32::from(round.max(1)) - 1;
        let years = i32::try_from(seasons_out).unwrap_or(i32::MAX);
        self.picks.round_one_value * self.picks.round_decay.powi(steps) * self.picks.year_discount.powi(years)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(TradeValueWeights::default().validate().is_ok());
    }

    #[test]
    fn rejects_decay_out_of_range() {
        let mut w = TradeValueWeights::default();
        w.picks.round_decay = 1.0;
        assert_eq!(w.validate().unwrap_err().field(), "picks.round_decay");

        let mut w = TradeValueWeights::default();
        w.picks.year_discount = 0.0;
        assert_eq!(w.validate().unwrap_err().field(), "picks.year_discount");
    }

    #[test]
    fn youth_rewarded_and_capped() {
        let w = TradeValueWeights::default();
        assert_eq!(w.age_modifier(Some(26)), 0.0);
        assert_eq!(w.age_modifier(Some(24)), 4.0);
        assert_eq!(w.age_modifier(Some(20)), 10.0);
        assert_eq!(w.age_modifier(Some(29)), -9.0);
        assert_eq!(w.age_modifier(None), 0.0);
    }

    #[test]
    fn cheaper_keepers_are_worth_more() {
        let w = TradeValueWeights::default();
        assert_eq!(w.keeper_value_bonus(Some(10), 10), 0.0);
        assert_eq!(w.keeper_value_bonus(Some(4), 10), 18.0);
        assert!(w.keeper_value_bonus(Some(2), 10) > w.keeper_value_bonus(Some(3), 10));
        assert_eq!(w.keeper_value_bonus(None, 10), 0.0);
    }

    #[test]
    fn player_value_never_negative() {
        let w = TradeValueWeights::default();
        // 5 for a kicker, -42 for fourteen years past peak.
        assert_eq!(w.player_value(Position::Kicker, Some(40), None, 10), 0.0);
        assert_eq!(w.player_value(Position::Quarterback, Some(26), Some(10), 10), 30.0);
        assert_eq!(w.player_value(Position::TightEnd, Some(24), Some(8), 10), 30.0);
    }

    #[test]
    fn pick_value_decreases_with_round_and_distance() {
        let w = TradeValueWeights::default();
        assert_eq!(w.pick_value(1, 0), 40.0);
        assert_eq!(w.pick_value(2, 0), 30.0);
        assert!((w.pick_value(1, 1) - 32.0).abs() < 1e-9);
        for round in 1..15 {
            assert!(w.pick_value(round + 1, 0) < w.pick_value(round, 0));
        }
    }
}
