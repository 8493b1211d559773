//! Quiet-hours window for notifications and sounds.
//!
//! A window with `start > end` wraps past midnight (23..7 covers 23:00 to
//! 06:59). A window with `start < end` stays within one day, and
//! `start == end` never matches.

use chrono::{DateTime, TimeZone, Timelike};

use crate::state::Settings;
use crate::storage::QuietHoursConfig;

/// Whether `hour` (0-23) falls inside the configured quiet window.
///
/// Always false when the user has disabled quiet hours.
pub fn is_quiet_hour(settings: &Settings, window: &QuietHoursConfig, hour: u32) -> bool {
    if !settings.quiet_hours {
        return false;
    }
    in_window(window, hour)
}

/// [`is_quiet_hour`] evaluated at a point in time, in that time's zone.
pub fn is_quiet_at<Tz: TimeZone>(
    settings: &Settings,
    window: &QuietHoursConfig,
    at: &DateTime<Tz>,
) -> bool {
    is_quiet_hour(settings, window, at.hour())
}

fn in_window(window: &QuietHoursConfig, hour: u32) -> bool {
    let start = u32::from(window.start);
    let end = u32::from(window.end);
    if start > end {
        hour >= start || hour < end
    } else {
        start <= hour && hour < end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Utc};

    fn window(start: u8, end: u8) -> QuietHoursConfig {
        QuietHoursConfig { start, end }
    }

    #[test]
    fn default_window_wraps_midnight() {
        let settings = Settings::default();
        let w = QuietHoursConfig::default();
        let quiet: Vec<u32> = (0..24).filter(|h| is_quiet_hour(&settings, &w, *h)).collect();
        assert_eq!(quiet, vec![0, 1, 2, 3, 4, 5, 6, 23]);
    }

    #[test]
    fn same_day_window() {
        let settings = Settings::default();
        let w = window(13, 15);
        assert!(!is_quiet_hour(&settings, &w, 12));
        assert!(is_quiet_hour(&settings, &w, 13));
        assert!(is_quiet_hour(&settings, &w, 14));
        assert!(!is_quiet_hour(&settings, &w, 15));
        assert!(!is_quiet_hour(&settings, &w, 23));
    }

    #[test]
    fn empty_window_never_matches() {
        let settings = Settings::default();
        let w = window(8, 8);
        assert!((0..24).all(|h| !is_quiet_hour(&settings, &w, h)));
    }

    #[test]
    fn disabled_setting_short_circuits() {
        let settings = Settings {
            quiet_hours: false,
            ..Settings::default()
        };
        assert!(!is_quiet_hour(&settings, &QuietHoursConfig::default(), 2));
    }

    #[test]
    fn uses_local_hour_of_timestamp() {
        let settings = Settings::default();
        let w = QuietHoursConfig::default();
        // 21:30 UTC is 23:30 at UTC+2.
        let utc = Utc.with_ymd_and_hms(2024, 5, 1, 21, 30, 0).unwrap();
        assert!(!is_quiet_at(&settings, &w, &utc));
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        assert!(is_quiet_at(&settings, &w, &utc.with_timezone(&offset)));
    }
}
