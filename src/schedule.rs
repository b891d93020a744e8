//! Five-field cron schedules for `photosync watch`.
//!
//! `minute hour day-of-month month day-of-week`. Each field is a comma list
//! of `*`, `N` or `A-B`, any of them optionally stepped with `/S`. Day of week
//! runs 0-7, where both 0 and 7 are Sunday. When both day fields are
//! restricted, a day matches if either one does, as in classic cron.
//!
//! Month and weekday names and the `@hourly` style macros are not supported.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("expected five cron fields, got {0}")]
    FieldCount(usize),
    #[error("invalid {field} field '{value}'")]
    InvalidField { field: &'static str, value: String },
}

/// Values allowed by one field, as a bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldSet {
    bits: u64,
    /// False when the field starts with `*`.
    restricted: bool,
}

impl FieldSet {
    fn contains(self, value: u32) -> bool {
        self.bits & (1 << value) != 0
    }
}

fn parse_field(
    spec: &str,
    field: &'static str,
    min: u32,
    max: u32,
) -> Result<FieldSet, ScheduleError> {
    let invalid = || ScheduleError::InvalidField {
        field,
        value: spec.to_string(),
    };

    let mut bits = 0u64;
    for part in spec.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => (range, Some(step.parse::<u32>().map_err(|_| invalid())?)),
            None => (part, None),
        };
        let (lo, hi) = if range == "*" {
            (min, max)
        } else if let Some((a, b)) = range.split_once('-') {
            (
                a.parse::<u32>().map_err(|_| invalid())?,
                b.parse::<u32>().map_err(|_| invalid())?,
            )
        } else {
            let n = range.parse::<u32>().map_err(|_| invalid())?;
            // `N/S` steps from N to the end of the range
            (n, if step.is_some() { max } else { n })
        };
        let step = step.unwrap_or(1);
        if step == 0 || lo < min || hi > max || lo > hi {
            return Err(invalid());
        }
        for value in (lo..=hi).step_by(step as usize) {
            bits |= 1 << value;
        }
    }

    Ok(FieldSet {
        bits,
        restricted: !spec.starts_with('*'),
    })
}

/// A parsed cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    expr: String,
    minutes: FieldSet,
    hours: FieldSet,
    days: FieldSet,
    months: FieldSet,
    weekdays: FieldSet,
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, day, month, weekday] = fields[..] else {
            return Err(ScheduleError::FieldCount(fields.len()));
        };

        let mut weekdays = parse_field(weekday, "day-of-week", 0, 7)?;
        if weekdays.contains(7) {
            weekdays.bits |= 1;
        }

        Ok(Self {
            expr: fields.join(" "),
            minutes: parse_field(minute, "minute", 0, 59)?,
            hours: parse_field(hour, "hour", 0, 23)?,
            days: parse_field(day, "day-of-month", 1, 31)?,
            months: parse_field(month, "month", 1, 12)?,
            weekdays,
        })
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

impl Schedule {
    fn matches_day(&self, date: NaiveDate) -> bool {
        let dom = self.days.contains(date.day());
        let dow = self.weekdays.contains(date.weekday().num_days_from_sunday());
        if self.days.restricted && self.weekdays.restricted {
            dom || dow
        } else {
            dom && dow
        }
    }

    /// First minute strictly after `after` that the schedule fires on.
    ///
    /// Searches five years ahead; `None` for expressions that never fire,
    /// such as February 30th.
    pub fn next_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let limit = after + Duration::days(5 * 366);
        let mut t =
            after.date().and_hms_opt(after.hour(), after.minute(), 0)? + Duration::minutes(1);

        while t <= limit {
            if !self.months.contains(t.month()) {
                let (year, month) = if t.month() == 12 {
                    (t.year() + 1, 1)
                } else {
                    (t.year(), t.month() + 1)
                };
                t = NaiveDate::from_ymd_opt(year, month, 1)?.and_time(NaiveTime::MIN);
            } else if !self.matches_day(t.date()) {
                t = t.date().succ_opt()?.and_time(NaiveTime::MIN);
            } else if !self.hours.contains(t.hour()) {
                t = t.date().and_hms_opt(t.hour(), 0, 0)? + Duration::hours(1);
            } else if !self.minutes.contains(t.minute()) {
                t += Duration::minutes(1);
            } else {
                return Some(t);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn next(expr: &str, after: NaiveDateTime) -> Option<NaiveDateTime> {
        expr.parse::<Schedule>().unwrap().next_after(after)
    }

    #[test]
    fn default_schedule_fires_on_the_hour() {
        assert_eq!(
            next("0 */1 * * *", at(2024, 1, 1, 10, 15, 42)),
            Some(at(2024, 1, 1, 11, 0, 0))
        );
    }

    #[test]
    fn next_is_strictly_after() {
        assert_eq!(
            next("0 * * * *", at(2024, 1, 1, 10, 0, 0)),
            Some(at(2024, 1, 1, 11, 0, 0))
        );
    }

    #[test]
    fn stepped_minutes() {
        assert_eq!(
            next("*/15 * * * *", at(2024, 1, 1, 10, 7, 30)),
            Some(at(2024, 1, 1, 10, 15, 0))
        );
        assert_eq!(
            next("5/20 * * * *", at(2024, 1, 1, 10, 46, 0)),
            Some(at(2024, 1, 1, 11, 5, 0))
        );
    }

    #[test]
    fn weekday_and_sunday_as_seven() {
        // 2024-01-07 is a Sunday
        assert_eq!(
            next("30 2 * * 1", at(2024, 1, 7, 12, 0, 0)),
            Some(at(2024, 1, 8, 2, 30, 0))
        );
        assert_eq!(
            next("0 0 * * 7", at(2024, 1, 1, 0, 0, 0)),
            Some(at(2024, 1, 7, 0, 0, 0))
        );
    }

    #[test]
    fn restricted_day_fields_match_either() {
        // Friday the 5th comes before the 13th
        assert_eq!(
            next("0 0 13 * 5", at(2024, 1, 1, 0, 0, 0)),
            Some(at(2024, 1, 5, 0, 0, 0))
        );
    }

    #[test]
    fn rolls_over_months_and_years() {
        assert_eq!(
            next("0 0 1 1 *", at(2024, 3, 1, 0, 0, 0)),
            Some(at(2025, 1, 1, 0, 0, 0))
        );
        assert_eq!(
            next("15 8 * 2,6 *", at(2024, 2, 29, 9, 0, 0)),
            Some(at(2024, 6, 1, 8, 15, 0))
        );
    }

    #[test]
    fn impossible_date_never_fires() {
        assert_eq!(next("0 0 30 2 *", at(2024, 1, 1, 0, 0, 0)), None);
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert_eq!("hourly".parse::<Schedule>(), Err(ScheduleError::FieldCount(1)));
        for bad in [
            "60 * * * *",
            "*/0 * * * *",
            "5-1 * * * *",
            "a * * * *",
            "0 24 * * *",
            "0 0 0 * *",
            "0 0 * 13 *",
            "0 0 * * 8",
            "1,,2 * * * *",
        ] {
            assert!(
                matches!(bad.parse::<Schedule>(), Err(ScheduleError::InvalidField { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn displays_normalized_expression() {
        let schedule: Schedule = "0   */2 * *  *".parse().unwrap();
        assert_eq!(schedule.to_string(), "0 */2 * * *");
    }
}
