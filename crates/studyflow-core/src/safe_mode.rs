//! Safe-mode evaluator.
//!
//! Turns recent wellbeing inputs into a severity tier. Each input is mapped to
//! a risk in `[0, 1]`:
//!
//! ```text
//! sleep      = (9 - avg_sleep) / 5
//! stress     = avg_stress / 10
//! load       = weekly_load / 40
//! streak     = 1 - streak / 7
//! rest_ratio = 1 - rest_ratio / 0.25
//! ```
//!
//! and the composite score is `100 * Σ weight * risk`.
//!
//! ## Tiers
//!
//! | Tier | Min score | Sleep below | Stress from | Load above |
//! |------|-----------|-------------|-------------|------------|
//! | Critical | 80 | 5 | 8 | 35 |
//! | Alert | 60 | 6 | 7 | 30 |
//! | Watch | 40 | 6.5 | 6 | 25 |
//!
//! A tier is entered when the score reaches its minimum and at least one
//! bound is violated. Tiers are tried from most to least severe; the first
//! match wins.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metrics;
use crate::state::AppState;
use crate::storage::{Command, SafeModeConfig, TierTable, TierThresholds, Weights};

/// Sleep hours considered risk-free.
const SLEEP_TARGET: f64 = 9.0;
/// Sleep deficit (hours) at which the sleep risk saturates.
const SLEEP_SPAN: f64 = 5.0;
const STRESS_MAX: f64 = 10.0;
/// Weekly non-rest slots at which the load risk saturates.
const LOAD_SATURATION: f64 = 40.0;
/// Streak length (days) that cancels the streak risk.
const STREAK_TARGET: f64 = 7.0;
/// Rest ratio that cancels the rest risk.
const REST_TARGET: f64 = 0.25;

/// Severity of an active safe mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Watch,
    Alert,
    Critical,
}

impl Tier {
    /// Most severe first.
    pub const BY_SEVERITY: [Tier; 3] = [Tier::Critical, Tier::Alert, Tier::Watch];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Watch => "watch",
            Tier::Alert => "alert",
            Tier::Critical => "critical",
        }
    }

    fn thresholds(self, table: &TierTable) -> &TierThresholds {
        match self {
            Tier::Watch => &table.watch,
            Tier::Alert => &table.alert,
            Tier::Critical => &table.critical,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw inputs to one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafeModeInputs {
    pub avg_sleep: f64,
    pub avg_stress: f64,
    pub weekly_load: usize,
    pub streak: u32,
    pub rest_ratio: f64,
}

impl SafeModeInputs {
    /// Gather inputs from the current state, averaging the last `window` logs.
    pub fn from_state(state: &AppState, window: usize) -> Self {
        let recent = metrics::recent_stats(state, window);
        Self {
            avg_sleep: recent.avg_sleep,
            avg_stress: recent.avg_stress,
            weekly_load: metrics::weekly_load(state),
            streak: state.gamification.streak,
            rest_ratio: metrics::rest_ratio(state),
        }
    }
}

/// Result of evaluating a set of inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeModeEvaluation {
    pub tier: Option<Tier>,
    pub active: bool,
    /// Composite score, 0 to 100.
    pub score: f64,
    /// One entry per violated bound of the matched tier.
    pub reasons: Vec<String>,
}

impl SafeModeEvaluation {
    /// Command persisting this evaluation into the state document.
    pub fn to_command(&self) -> Command {
        Command::RecordSafeMode {
            active: self.active,
            score: self.score,
            reasons: self.reasons.clone(),
        }
    }
}

/// Weighted tier evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct SafeModeEvaluator {
    weights: Weights,
    thresholds: TierTable,
}

impl Default for SafeModeEvaluator {
    fn default() -> Self {
        Self::from_config(&SafeModeConfig::default())
    }
}

impl SafeModeEvaluator {
    pub fn new(weights: Weights, thresholds: TierTable) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    pub fn from_config(config: &SafeModeConfig) -> Self {
        Self::new(config.weights, config.thresholds)
    }

    /// Composite score in `[0, 100]`.
    pub fn score(&self, inputs: &SafeModeInputs) -> f64 {
        let w = &self.weights;
        let weighted = w.sleep * sleep_risk(inputs.avg_sleep)
            + w.stress * stress_risk(inputs.avg_stress)
            + w.load * load_risk(inputs.weekly_load)
            + w.streak * streak_risk(inputs.streak)
            + w.rest_ratio * rest_risk(inputs.rest_ratio);
        (weighted * 100.0).clamp(0.0, 100.0)
    }

    /// Evaluate inputs against the tier table.
    pub fn evaluate(&self, inputs: &SafeModeInputs) -> SafeModeEvaluation {
        let score = self.score(inputs);

        for tier in Tier::BY_SEVERITY {
            let bounds = tier.thresholds(&self.thresholds);
            if score < bounds.score {
                continue;
            }
            let reasons = violations(inputs, bounds);
            if !reasons.is_empty() {
                return SafeModeEvaluation {
                    tier: Some(tier),
                    active: true,
                    score,
                    reasons,
                };
            }
        }

        SafeModeEvaluation {
            tier: None,
            active: false,
            score,
            reasons: Vec::new(),
        }
    }

    /// Evaluate straight from the state document.
    pub fn evaluate_state(&self, state: &AppState, window: usize) -> SafeModeEvaluation {
        self.evaluate(&SafeModeInputs::from_state(state, window))
    }
}

fn violations(inputs: &SafeModeInputs, bounds: &TierThresholds) -> Vec<String> {
    let mut reasons = Vec::new();
    if inputs.avg_sleep < bounds.sleep_min {
        reasons.push(format!(
            "sleep: average {:.1}h is below {}h",
            inputs.avg_sleep, bounds.sleep_min
        ));
    }
    if inputs.avg_stress >= bounds.stress_min {
        reasons.push(format!(
            "stress: average {:.1}/10 is at or above {}",
            inputs.avg_stress, bounds.stress_min
        ));
    }
    if inputs.weekly_load > bounds.load_max as usize {
        reasons.push(format!(
            "load: {} slots this week exceeds {}",
            inputs.weekly_load, bounds.load_max
        ));
    }
    reasons
}

fn sleep_risk(avg_sleep: f64) -> f64 {
    ((SLEEP_TARGET - avg_sleep) / SLEEP_SPAN).clamp(0.0, 1.0)
}

fn stress_risk(avg_stress: f64) -> f64 {
    (avg_stress / STRESS_MAX).clamp(0.0, 1.0)
}

fn load_risk(weekly_load: usize) -> f64 {
    (weekly_load as f64 / LOAD_SATURATION).clamp(0.0, 1.0)
}

fn streak_risk(streak: u32) -> f64 {
    (1.0 - f64::from(streak) / STREAK_TARGET).clamp(0.0, 1.0)
}

fn rest_risk(rest_ratio: f64) -> f64 {
    (1.0 - rest_ratio / REST_TARGET).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DailyLog, Day, Slot, SlotKey, SlotType};
    use chrono::{NaiveDate, Utc};

    fn inputs(sleep: f64, stress: f64, load: usize, streak: u32, rest: f64) -> SafeModeInputs {
        SafeModeInputs {
            avg_sleep: sleep,
            avg_stress: stress,
            weekly_load: load,
            streak,
            rest_ratio: rest,
        }
    }

    #[test]
    fn exhausted_student_is_critical() {
        let evaluation = SafeModeEvaluator::default().evaluate(&inputs(4.0, 9.0, 40, 0, 0.1));

        assert_eq!(evaluation.tier, Some(Tier::Critical));
        assert!(evaluation.active);
        assert!((evaluation.score - 93.0).abs() < 1e-9);
        assert!(evaluation.reasons.iter().any(|r| r.contains("sleep")));
        assert!(evaluation.reasons.iter().any(|r| r.contains("load")));
        assert!(evaluation.reasons.iter().any(|r| r.contains("stress")));
    }

    #[test]
    fn rested_student_is_inactive() {
        let evaluation = SafeModeEvaluator::default().evaluate(&inputs(8.5, 2.0, 10, 7, 0.3));

        assert_eq!(evaluation.tier, None);
        assert!(!evaluation.active);
        assert!(evaluation.reasons.is_empty());
        assert!(evaluation.score < 40.0);
    }

    #[test]
    fn high_score_without_violation_falls_through() {
        // Score ~62 but every bound of every tier is respected.
        let evaluation = SafeModeEvaluator::default().evaluate(&inputs(7.0, 5.9, 25, 0, 0.0));
        assert!(evaluation.score >= 60.0);
        assert_eq!(evaluation.tier, None);
    }

    #[test]
    fn score_gates_tier_even_with_violations() {
        // Short sleep alone, but a healthy week otherwise.
        let evaluation = SafeModeEvaluator::default().evaluate(&inputs(4.5, 1.0, 0, 7, 0.5));
        assert!(evaluation.score < 40.0);
        assert!(!evaluation.active);
    }

    #[test]
    fn first_matching_tier_wins() {
        // Critical score reached but only alert-level bounds are violated.
        let evaluation = SafeModeEvaluator::default().evaluate(&inputs(5.2, 7.9, 34, 0, 0.0));
        assert!(evaluation.score >= 80.0, "score {}", evaluation.score);
        assert_eq!(evaluation.tier, Some(Tier::Alert));
        assert_eq!(evaluation.reasons.len(), 3);
    }

    #[test]
    fn risks_are_clamped() {
        let evaluator = SafeModeEvaluator::default();
        assert!((evaluator.score(&inputs(0.0, 20.0, 500, 0, 0.0)) - 100.0).abs() < 1e-9);
        assert_eq!(evaluator.score(&inputs(12.0, 0.0, 0, 30, 1.0)), 0.0);
    }

    #[test]
    fn evaluation_is_repeatable() {
        let evaluator = SafeModeEvaluator::default();
        let i = inputs(5.8, 7.2, 31, 2, 0.05);
        assert_eq!(evaluator.evaluate(&i), evaluator.evaluate(&i));
    }

    #[test]
    fn inputs_from_empty_state_are_neutral() {
        let state = AppState::default();
        let i = SafeModeInputs::from_state(&state, 7);
        assert_eq!(i, inputs(7.0, 5.0, 0, 0, 0.0));

        // 0.3*0.4 + 0.3*0.5 + 0 + 0.1 + 0.1 = 0.47
        let evaluation = SafeModeEvaluator::default().evaluate(&i);
        assert!((evaluation.score - 47.0).abs() < 1e-9);
        assert!(!evaluation.active);
    }

    #[test]
    fn evaluate_state_reads_logs_and_timetable() {
        let mut state = AppState::default();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        state.logs.push(DailyLog::new(date, 9.0, 4.0));
        for day in Day::ALL {
            for hour in 6..12 {
                let key = SlotKey::new(day, hour);
                state
                    .timetable
                    .insert(key.to_string(), Slot::new(SlotType::Class, Utc::now()));
            }
        }

        let evaluation = SafeModeEvaluator::default().evaluate_state(&state, 7);
        assert_eq!(evaluation.tier, Some(Tier::Critical));
        assert_eq!(
            evaluation.to_command(),
            Command::RecordSafeMode {
                active: true,
                score: evaluation.score,
                reasons: evaluation.reasons.clone(),
            }
        );
    }

    #[test]
    fn custom_weights_change_score() {
        let weights = Weights {
            sleep: 1.0,
            stress: 0.0,
            load: 0.0,
            streak: 0.0,
            rest_ratio: 0.0,
        };
        let evaluator = SafeModeEvaluator::new(weights, TierTable::default());
        assert_eq!(evaluator.score(&inputs(6.5, 10.0, 40, 0, 0.0)), 50.0);
    }
}
