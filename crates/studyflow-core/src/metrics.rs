//! Derived metrics over the application state.
//!
//! All functions are pure reads of an [`AppState`]; they never fail and never
//! touch storage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::state::AppState;

/// Stress assumed when there are no journal entries yet.
pub const NEUTRAL_STRESS: f64 = 5.0;
/// Sleep hours assumed when there are no journal entries yet.
pub const NEUTRAL_SLEEP: f64 = 7.0;

/// Averages over the most recent journal entries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecentStats {
    pub avg_stress: f64,
    pub avg_sleep: f64,
    /// Number of entries actually averaged.
    pub count: usize,
}

impl RecentStats {
    /// Baseline reported for users without any entries.
    pub fn neutral() -> Self {
        Self {
            avg_stress: NEUTRAL_STRESS,
            avg_sleep: NEUTRAL_SLEEP,
            count: 0,
        }
    }
}

/// Number of scheduled slots that are not rest.
pub fn weekly_load(state: &AppState) -> usize {
    state
        .timetable
        .values()
        .filter(|slot| !slot.slot_type.is_rest())
        .count()
}

/// Number of rest slots.
pub fn rest_count(state: &AppState) -> usize {
    state
        .timetable
        .values()
        .filter(|slot| slot.slot_type.is_rest())
        .count()
}

/// Share of slots that are rest, in `[0, 1]`. Zero for an empty timetable.
pub fn rest_ratio(state: &AppState) -> f64 {
    let total = state.timetable.len();
    if total == 0 {
        return 0.0;
    }
    rest_count(state) as f64 / total as f64
}

/// Mean stress and sleep over the last `window` journal entries.
///
/// Uses fewer entries when the journal is shorter, and
/// [`RecentStats::neutral`] when it is empty.
pub fn recent_stats(state: &AppState, window: usize) -> RecentStats {
    let start = state.logs.len().saturating_sub(window);
    let recent = &state.logs[start..];
    if recent.is_empty() {
        return RecentStats::neutral();
    }

    let n = recent.len() as f64;
    RecentStats {
        avg_stress: recent.iter().map(|l| l.stress).sum::<f64>() / n,
        avg_sleep: recent.iter().map(|l| l.sleep).sum::<f64>() / n,
        count: recent.len(),
    }
}

/// Everything the weekly summary shows, computed in one pass of the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyOverview {
    pub total_slots: usize,
    pub weekly_load: usize,
    pub rest_ratio: f64,
    /// Slot count per type name.
    pub by_type: BTreeMap<String, usize>,
    pub recent: RecentStats,
    pub streak: u32,
}

impl WeeklyOverview {
    pub fn from_state(state: &AppState, window: usize) -> Self {
        let mut by_type = BTreeMap::new();
        for slot in state.timetable.values() {
            *by_type.entry(slot.slot_type.to_string()).or_insert(0) += 1;
        }
        Self {
            total_slots: state.timetable.len(),
            weekly_load: weekly_load(state),
            rest_ratio: rest_ratio(state),
            by_type,
            recent: recent_stats(state, window),
            streak: state.gamification.streak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DailyLog, Day, Slot, SlotKey, SlotType};
    use chrono::{NaiveDate, Utc};
    use proptest::prelude::*;

    fn with_slots(types: &[SlotType]) -> AppState {
        let mut state = AppState::default();
        for (i, t) in types.iter().enumerate() {
            let key = SlotKey::new(Day::ALL[i % 7], 6 + (i / 7) as u8);
            state
                .timetable
                .insert(key.to_string(), Slot::new(t.clone(), Utc::now()));
        }
        state
    }

    fn log(stress: f64, sleep: f64) -> DailyLog {
        DailyLog::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), stress, sleep)
    }

    #[test]
    fn load_and_rest_ratio() {
        let state = with_slots(&[
            SlotType::Class,
            SlotType::Rest,
            SlotType::Revision,
            SlotType::Rest,
            SlotType::Other("music".into()),
        ]);
        assert_eq!(weekly_load(&state), 3);
        assert_eq!(rest_count(&state), 2);
        assert!((rest_ratio(&state) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn rest_ratio_on_empty_timetable_is_zero() {
        assert_eq!(rest_ratio(&AppState::default()), 0.0);
        assert_eq!(weekly_load(&AppState::default()), 0);
    }

    #[test]
    fn recent_stats_without_logs_is_neutral() {
        let stats = recent_stats(&AppState::default(), 7);
        assert_eq!(
            stats,
            RecentStats {
                avg_stress: 5.0,
                avg_sleep: 7.0,
                count: 0
            }
        );
    }

    #[test]
    fn recent_stats_averages_short_journal() {
        let mut state = AppState::default();
        state.logs = vec![log(4.0, 6.0), log(8.0, 5.0)];
        let stats = recent_stats(&state, 7);
        assert_eq!(
            stats,
            RecentStats {
                avg_stress: 6.0,
                avg_sleep: 5.5,
                count: 2
            }
        );
    }

    #[test]
    fn recent_stats_uses_suffix_of_journal() {
        let mut state = AppState::default();
        state.logs = vec![log(10.0, 2.0), log(2.0, 8.0), log(4.0, 6.0)];
        let stats = recent_stats(&state, 2);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.avg_stress, 3.0);
        assert_eq!(stats.avg_sleep, 7.0);
    }

    #[test]
    fn recent_stats_with_zero_window_is_neutral() {
        let mut state = AppState::default();
        state.logs = vec![log(9.0, 3.0)];
        assert_eq!(recent_stats(&state, 0), RecentStats::neutral());
    }

    #[test]
    fn overview_groups_by_type() {
        let state = with_slots(&[SlotType::Class, SlotType::Class, SlotType::Meal]);
        let overview = WeeklyOverview::from_state(&state, 7);
        assert_eq!(overview.total_slots, 3);
        assert_eq!(overview.by_type["class"], 2);
        assert_eq!(overview.by_type["meal"], 1);
        assert_eq!(overview.recent.count, 0);
    }

    fn slot_type_strategy() -> impl Strategy<Value = SlotType> {
        prop_oneof![
            Just(SlotType::Class),
            Just(SlotType::Revision),
            Just(SlotType::Rest),
            Just(SlotType::Sport),
            Just(SlotType::Social),
            Just(SlotType::Admin),
            Just(SlotType::Meal),
            "[a-z]{3,8}".prop_map(SlotType::from),
        ]
    }

    proptest! {
        #[test]
        fn load_plus_rest_is_total(types in proptest::collection::vec(slot_type_strategy(), 0..100)) {
            let state = with_slots(&types);
            prop_assert_eq!(weekly_load(&state) + rest_count(&state), state.timetable.len());
            let ratio = rest_ratio(&state);
            prop_assert!((0.0..=1.0).contains(&ratio));
        }
    }
}
