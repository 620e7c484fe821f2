//! Session clock and cycle scheduling.
//!
//! [`SessionClock`] decides whether notifications should go out at a given
//! instant. The watch loop sleeps until the next boundary of the bar grid so
//! each cycle sees the candle that just closed.

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Offset, Utc, Weekday};

use smclab_core::BarSpec;

use crate::config::{offset_secs, parse_time_of_day, ConfigError, SessionConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClock {
    enabled: bool,
    offset: FixedOffset,
    open: NaiveTime,
    close: NaiveTime,
    weekdays_only: bool,
}

impl SessionClock {
    /// A clock that never gates anything.
    pub fn always_live() -> Self {
        Self {
            enabled: false,
            offset: Utc.fix(),
            open: NaiveTime::MIN,
            close: NaiveTime::MIN,
            weekdays_only: false,
        }
    }

    pub fn new(
        offset: FixedOffset,
        open: NaiveTime,
        close: NaiveTime,
        weekdays_only: bool,
    ) -> Self {
        Self {
            enabled: true,
            offset,
            open,
            close,
            weekdays_only,
        }
    }

    /// Session window in local time at `utc_offset_hours`.
    pub fn from_config(config: &SessionConfig, utc_offset_hours: i32) -> Result<Self, ConfigError> {
        if !config.enabled {
            return Ok(Self::always_live());
        }
        let offset = FixedOffset::east_opt(offset_secs(utc_offset_hours)?).ok_or_else(|| {
            ConfigError::Invalid(format!("utc offset out of range: {utc_offset_hours}h"))
        })?;
        Ok(Self::new(
            offset,
            parse_time_of_day("session.open", &config.open)?,
            parse_time_of_day("session.close", &config.close)?,
            config.weekdays_only,
        ))
    }

    /// Whether `now` falls inside `[open, close)` local time. A window whose
    /// close is earlier than its open wraps past midnight.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return true;
        }
        let local = now.with_timezone(&self.offset);
        if self.weekdays_only && matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let t = local.time();
        if self.open <= self.close {
            t >= self.open && t < self.close
        } else {
            t >= self.open || t < self.close
        }
    }
}

/// Time left until the next grid boundary strictly after `now`.
pub fn until_next_boundary(bars: &BarSpec, now: DateTime<Utc>) -> std::time::Duration {
    (bars.next_boundary(now).with_timezone(&Utc) - now)
        .to_std()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn kst_clock() -> SessionClock {
        let config = SessionConfig {
            enabled: true,
            ..SessionConfig::default()
        };
        SessionClock::from_config(&config, 9).unwrap()
    }

    fn kst(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn disabled_clock_is_always_live() {
        let clock = SessionClock::from_config(&SessionConfig::default(), 9).unwrap();
        assert_eq!(clock, SessionClock::always_live());
        // Sunday 03:00 KST
        assert!(clock.is_live(kst(2024, 3, 10, 3, 0)));
    }

    #[test]
    fn session_window_is_half_open() {
        let clock = kst_clock();
        // Monday 2024-03-04
        assert!(!clock.is_live(kst(2024, 3, 4, 8, 59)));
        assert!(clock.is_live(kst(2024, 3, 4, 9, 0)));
        assert!(clock.is_live(kst(2024, 3, 4, 13, 0)));
        assert!(clock.is_live(kst(2024, 3, 4, 15, 29)));
        assert!(!clock.is_live(kst(2024, 3, 4, 15, 30)));
    }

    #[test]
    fn weekends_are_closed() {
        let clock = kst_clock();
        // Saturday 2024-03-09 at 10:00 KST
        assert!(!clock.is_live(kst(2024, 3, 9, 10, 0)));

        let every_day = SessionClock::from_config(
            &SessionConfig {
                enabled: true,
                weekdays_only: false,
                ..SessionConfig::default()
            },
            9,
        )
        .unwrap();
        assert!(every_day.is_live(kst(2024, 3, 9, 10, 0)));
    }

    #[test]
    fn local_time_not_utc_decides() {
        let clock = kst_clock();
        // 01:00 UTC Monday is 10:00 KST Monday.
        let t = Utc.with_ymd_and_hms(2024, 3, 4, 1, 0, 0).unwrap();
        assert!(clock.is_live(t));
        // 23:00 UTC Friday is 08:00 KST Saturday.
        let t = Utc.with_ymd_and_hms(2024, 3, 8, 23, 0, 0).unwrap();
        assert!(!clock.is_live(t));
    }

    #[test]
    fn out_of_range_offset_is_a_config_error() {
        let config = SessionConfig {
            enabled: true,
            ..SessionConfig::default()
        };
        assert!(matches!(
            SessionClock::from_config(&config, 1_000_000),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn overnight_window_wraps() {
        let clock = SessionClock::new(
            FixedOffset::east_opt(0).unwrap(),
            NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
            false,
        );
        assert!(clock.is_live(Utc.with_ymd_and_hms(2024, 3, 4, 23, 0, 0).unwrap()));
        assert!(clock.is_live(Utc.with_ymd_and_hms(2024, 3, 5, 1, 59, 0).unwrap()));
        assert!(!clock.is_live(Utc.with_ymd_and_hms(2024, 3, 5, 2, 0, 0).unwrap()));
        assert!(!clock.is_live(Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()));
    }

    #[test]
    fn sleeps_until_next_four_hour_boundary() {
        let bars = BarSpec::daily_anchor(
            Duration::hours(4),
            9 * 3600,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        )
        .unwrap();
        // 10:30 KST -> next boundary 13:00 KST.
        let wait = until_next_boundary(&bars, kst(2024, 3, 4, 10, 30));
        assert_eq!(wait, std::time::Duration::from_secs(150 * 60));
        // Exactly on a boundary waits a full bar.
        let wait = until_next_boundary(&bars, kst(2024, 3, 4, 13, 0));
        assert_eq!(wait, std::time::Duration::from_secs(4 * 3600));
        // 23:00 KST -> 01:00 KST next day.
        let wait = until_next_boundary(&bars, kst(2024, 3, 4, 23, 0));
        assert_eq!(wait, std::time::Duration::from_secs(2 * 3600));
    }

    proptest::proptest! {
        #[test]
        fn wait_lands_on_the_grid(secs in 0i64..10 * 365 * 86_400, bar_hours in 1i64..=12) {
            let bars = BarSpec::daily_anchor(
                Duration::hours(bar_hours),
                9 * 3600,
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            )
            .unwrap();
            let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs);
            let wait = until_next_boundary(&bars, now);

            proptest::prop_assert!(wait > std::time::Duration::ZERO);
            proptest::prop_assert!(wait.as_secs() as i64 <= bar_hours * 3600);
            let wake = now + Duration::seconds(wait.as_secs() as i64);
            let offset = (wake - bars.anchor().with_timezone(&Utc)).num_seconds();
            proptest::prop_assert_eq!(offset.rem_euclid(bar_hours * 3600), 0);
        }
    }
}
