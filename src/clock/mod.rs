//! Market-hours gating for the polling loop.
//!
//! [`MarketClock::evaluate`] is a pure function of the wall clock and the
//! static calendar: it never fails and never performs I/O. Skipping cycles
//! while the exchange is closed is the loop's primary cost control, so the
//! clock runs before anything that would touch the network.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

/// The exchange's local timezone. All session boundaries and calendar
/// lookups are evaluated in this zone.
pub const EXCHANGE_TZ: Tz = chrono_tz::America::New_York;

/// Regular session open, exchange-local. Inclusive boundary.
const SESSION_OPEN: NaiveTime = match NaiveTime::from_hms_opt(9, 30, 0) {
    Some(t) => t,
    None => panic!("invalid session open"),
};

/// Regular session close, exchange-local. Exclusive boundary.
const SESSION_CLOSE: NaiveTime = match NaiveTime::from_hms_opt(16, 0, 0) {
    Some(t) => t,
    None => panic!("invalid session close"),
};

/// US equity market holidays, observed dates. Static data: dates already
/// shifted for weekends where the exchange observes them, no computed
/// shifting here.
const MARKET_HOLIDAYS: &[(i32, u32, u32)] = &[
    // 2024
    (2024, 1, 1),   // New Year's Day
    (2024, 1, 15),  // Martin Luther King Jr. Day
    (2024, 2, 19),  // Presidents' Day
    (2024, 3, 29),  // Good Friday
    (2024, 5, 27),  // Memorial Day
    (2024, 6, 19),  // Juneteenth
    (2024, 7, 4),   // Independence Day
    (2024, 9, 2),   // Labor Day
    (2024, 11, 28), // Thanksgiving Day
    (2024, 12, 25), // Christmas Day
    // 2025
    (2025, 1, 1),   // New Year's Day
    (2025, 1, 20),  // Martin Luther King Jr. Day
    (2025, 2, 17),  // Presidents' Day
    (2025, 4, 18),  // Good Friday
    (2025, 5, 26),  // Memorial Day
    (2025, 6, 19),  // Juneteenth
    (2025, 7, 4),   // Independence Day
    (2025, 9, 1),   // Labor Day
    (2025, 11, 27), // Thanksgiving Day
    (2025, 12, 25), // Christmas Day
    // 2026
    (2026, 1, 1),   // New Year's Day
    (2026, 1, 19),  // Martin Luther King Jr. Day
    (2026, 2, 16),  // Presidents' Day
    (2026, 4, 3),   // Good Friday
    (2026, 5, 25),  // Memorial Day
    (2026, 6, 19),  // Juneteenth
    (2026, 7, 3),   // Independence Day (observed)
    (2026, 9, 7),   // Labor Day
    (2026, 11, 26), // Thanksgiving Day
    (2026, 12, 25), // Christmas Day
];

/// Whether the market is open at a given instant, and if not, why.
///
/// Derived fresh every cycle, never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketState {
    /// Regular trading session.
    Open,
    /// Saturday or Sunday at the exchange.
    ClosedWeekend,
    /// Exchange holiday.
    ClosedHoliday,
    /// Weekday before the session open.
    ClosedBeforeHours,
    /// Weekday at or after the session close.
    ClosedAfterHours,
    /// Test-mode override: treated as open regardless of the calendar.
    OverrideTestMode,
}

impl MarketState {
    /// True when the cycle should proceed to fetch quotes.
    pub fn is_pollable(&self) -> bool {
        matches!(self, Self::Open | Self::OverrideTestMode)
    }

    /// Human-readable reason for logging cycle summaries.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Open => "market open: regular trading hours",
            Self::ClosedWeekend => "market closed: weekend",
            Self::ClosedHoliday => "market closed: holiday",
            Self::ClosedBeforeHours => "market closed: before opening hours",
            Self::ClosedAfterHours => "market closed: after closing hours",
            Self::OverrideTestMode => "test mode: market hours bypassed",
        }
    }
}

/// Gating configuration, fixed for the process lifetime.
#[derive(Clone, Copy, Debug)]
pub struct HoursConfig {
    /// When false, the clock reports open unconditionally.
    pub enforce: bool,
    /// Escape hatch for non-production runs; bypasses every other check.
    pub test_mode: bool,
}

/// Pure market-hours state machine for the US equity session.
#[derive(Clone, Debug, Default)]
pub struct MarketClock;

impl MarketClock {
    pub fn new() -> Self {
        Self
    }

    /// Classify an instant against the exchange calendar.
    ///
    /// The open boundary is inclusive (09:30:00 is open) and the close
    /// boundary is exclusive (16:00:00 is after hours).
    pub fn evaluate(&self, now: DateTime<Utc>, config: &HoursConfig) -> MarketState {
        if config.test_mode {
            return MarketState::OverrideTestMode;
        }
        if !config.enforce {
            return MarketState::Open;
        }

        let local = now.with_timezone(&EXCHANGE_TZ);

        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return MarketState::ClosedWeekend;
        }
        if is_holiday(local.date_naive()) {
            return MarketState::ClosedHoliday;
        }

        let time = local.time();
        if time < SESSION_OPEN {
            MarketState::ClosedBeforeHours
        } else if time >= SESSION_CLOSE {
            MarketState::ClosedAfterHours
        } else {
            MarketState::Open
        }
    }
}

fn is_holiday(date: NaiveDate) -> bool {
    let key = (date.year(), date.month(), date.day());
    MARKET_HOLIDAYS.iter().any(|&entry| entry == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ENFORCED: HoursConfig = HoursConfig {
        enforce: true,
        test_mode: false,
    };

    fn clock() -> MarketClock {
        MarketClock::new()
    }

    /// Build a UTC instant from exchange-local wall time.
    fn eastern(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        EXCHANGE_TZ
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn weekday_session_is_open() {
        // Tuesday 2026-03-10, 10:00 Eastern
        let state = clock().evaluate(eastern(2026, 3, 10, 10, 0), &ENFORCED);
        assert_eq!(state, MarketState::Open);
        assert!(state.is_pollable());
    }

    #[test]
    fn weekend_is_closed_all_day() {
        // Saturday and Sunday, including mid-session wall times
        for (d, h) in [(14, 10), (15, 12), (14, 0), (15, 23)] {
            let state = clock().evaluate(eastern(2026, 3, d, h, 0), &ENFORCED);
            assert_eq!(state, MarketState::ClosedWeekend, "day {} hour {}", d, h);
        }
    }

    #[test]
    fn holidays_are_closed() {
        // Christmas 2025, and the observed Independence Day 2026 (July 4 is
        // a Saturday, the exchange closes Friday July 3)
        for (y, m, d) in [(2025, 12, 25), (2026, 7, 3), (2024, 3, 29)] {
            let state = clock().evaluate(eastern(y, m, d, 11, 0), &ENFORCED);
            assert_eq!(state, MarketState::ClosedHoliday, "{}-{}-{}", y, m, d);
        }
    }

    #[test]
    fn before_and_after_hours() {
        assert_eq!(
            clock().evaluate(eastern(2026, 3, 10, 9, 29), &ENFORCED),
            MarketState::ClosedBeforeHours
        );
        assert_eq!(
            clock().evaluate(eastern(2026, 3, 10, 16, 30), &ENFORCED),
            MarketState::ClosedAfterHours
        );
    }

    #[test]
    fn open_boundary_inclusive_close_boundary_exclusive() {
        assert_eq!(
            clock().evaluate(eastern(2026, 3, 10, 9, 30), &ENFORCED),
            MarketState::Open
        );
        assert_eq!(
            clock().evaluate(eastern(2026, 3, 10, 16, 0), &ENFORCED),
            MarketState::ClosedAfterHours
        );
    }

    #[test]
    fn winter_offset_is_handled() {
        // Wednesday 2026-01-14 is EST (UTC-5): 14:30 UTC is exactly 09:30.
        let state = clock().evaluate(
            Utc.with_ymd_and_hms(2026, 1, 14, 14, 30, 0).unwrap(),
            &ENFORCED,
        );
        assert_eq!(state, MarketState::Open);
    }

    #[test]
    fn test_mode_overrides_everything() {
        let config = HoursConfig {
            enforce: true,
            test_mode: true,
        };
        // Saturday, a holiday, and midnight: all overridden
        for now in [
            eastern(2026, 3, 14, 10, 0),
            eastern(2025, 12, 25, 11, 0),
            eastern(2026, 3, 10, 3, 0),
        ] {
            let state = clock().evaluate(now, &config);
            assert_eq!(state, MarketState::OverrideTestMode);
            assert!(state.is_pollable());
        }
    }

    #[test]
    fn enforcement_off_is_always_open() {
        let config = HoursConfig {
            enforce: false,
            test_mode: false,
        };
        let state = clock().evaluate(eastern(2026, 3, 14, 10, 0), &config);
        assert_eq!(state, MarketState::Open);
    }
}
