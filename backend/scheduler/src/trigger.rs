//! When a scheduled cycle fires.

use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Days, NaiveTime, TimeZone};

/// Trigger for the scheduled loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Every day at this local wall-clock time.
    DailyAt(NaiveTime),
    /// One cycle right away, then stop.
    Now,
}

impl Trigger {
    /// Parse `"HH:MM"` or `"now"` (case-insensitive).
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("now") {
            return Ok(Self::Now);
        }
        match NaiveTime::parse_from_str(raw, "%H:%M") {
            Ok(time) => Ok(Self::DailyAt(time)),
            Err(_) => bail!("invalid schedule time '{raw}': expected HH:MM or 'now'"),
        }
    }

    pub fn is_one_shot(&self) -> bool {
        matches!(self, Self::Now)
    }

    /// The first fire time strictly after `now`.
    ///
    /// A wall-clock time skipped by a DST transition falls back to the first
    /// valid instant after it.
    pub fn next_fire<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let Self::DailyAt(time) = self else {
            return Some(now.clone());
        };
        let tz = now.timezone();
        let mut day = now.date_naive();
        for _ in 0..3 {
            let naive = day.and_time(*time);
            let candidate = tz
                .from_local_datetime(&naive)
                .earliest()
                .or_else(|| tz.from_local_datetime(&(naive + chrono::Duration::hours(1))).earliest());
            if let Some(candidate) = candidate {
                if candidate > *now {
                    return Some(candidate);
                }
            }
            day = day.checked_add_days(Days::new(1))?;
        }
        None
    }

    /// How long to wait from `now` until the next fire.
    pub fn delay_from<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Duration {
        self.next_fire(now)
            .and_then(|next| (next - now.clone()).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn parses_times_and_now() {
        assert_eq!(Trigger::parse("09:30").unwrap(), Trigger::DailyAt(NaiveTime::from_hms_opt(9, 30, 0).unwrap()));
        assert_eq!(Trigger::parse(" NOW ").unwrap(), Trigger::Now);
        assert!(Trigger::parse("24:00").is_err());
        assert!(Trigger::parse("").is_err());
    }

    #[test]
    fn later_today_fires_today() {
        let trigger = Trigger::parse("09:00").unwrap();
        assert_eq!(trigger.next_fire(&at(8, 0)), Some(at(9, 0)));
        assert_eq!(trigger.delay_from(&at(8, 0)), Duration::from_secs(3600));
    }

    #[test]
    fn passed_or_exact_time_fires_tomorrow() {
        let trigger = Trigger::parse("09:00").unwrap();
        let tomorrow = Utc.with_ymd_and_hms(2026, 3, 11, 9, 0, 0).unwrap();
        assert_eq!(trigger.next_fire(&at(9, 0)), Some(tomorrow));
        assert_eq!(trigger.next_fire(&at(23, 59)), Some(tomorrow));
    }

    #[test]
    fn now_fires_immediately() {
        assert_eq!(Trigger::Now.delay_from(&at(12, 0)), Duration::ZERO);
        assert!(Trigger::Now.is_one_shot());
    }
}
