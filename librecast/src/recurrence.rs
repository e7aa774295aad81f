//! Recurrence resolution for repeating schedules.
//!
//! Turns a `ScheduleFrequency` rule plus a start instant into the next N
//! occurrence instants, computed in the rule's timezone and returned in UTC.

use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{RecastError, Result};
use crate::types::{IntervalUnit, ScheduleFrequency, Weekday};

/// Safety valve for rule/constraint combinations with no solution.
const MAX_ITERATIONS: usize = 10_000;

/// Compute the next `count` occurrences of `freq` at or after `start`.
///
/// Returned instants are strictly increasing and expressed in UTC.
///
/// # Errors
///
/// Returns `InvalidInput` for a zero interval or count, a malformed
/// time-of-day entry, an out-of-range day-of-month, or an unknown timezone.
/// Returns `NotFound` when the iteration ceiling is reached without a
/// solution.
pub fn resolve(
    start: DateTime<Utc>,
    freq: &ScheduleFrequency,
    count: usize,
) -> Result<Vec<DateTime<Utc>>> {
    if freq.every == 0 {
        return Err(RecastError::InvalidInput("amount must be > 0".to_string()));
    }
    if count == 0 {
        return Err(RecastError::InvalidInput("count must be > 0".to_string()));
    }

    let tz: Tz = freq.time_zone.parse().map_err(|_| {
        RecastError::InvalidInput(format!("invalid time zone: '{}'", freq.time_zone))
    })?;

    let mut cursor = start.with_timezone(&tz);
    let rule = Rule::normalize(freq, &cursor)?;

    let mut occurrences = Vec::with_capacity(count);
    for _ in 0..MAX_ITERATIONS {
        let mut candidates = rule.candidates(&cursor);
        candidates.retain(|c| *c >= cursor);

        match candidates.into_iter().min() {
            Some(best) => {
                occurrences.push(best.with_timezone(&Utc));
                if occurrences.len() == count {
                    return Ok(occurrences);
                }
                // One-minute hop so the next loop pass cannot re-select
                // the instant just accepted.
                cursor = best + Duration::minutes(1);
            }
            None => {
                cursor = rule
                    .advance(&cursor)
                    .ok_or_else(|| RecastError::NotFound("no occurrence found".to_string()))?;
            }
        }
    }

    Err(RecastError::NotFound("no occurrence found".to_string()))
}

/// A frequency with its defaults filled in, ready for candidate generation.
///
/// Normalization happens once at resolver entry: missing weekday /
/// day-of-month constraints default to the start instant's own weekday and
/// day, and the field not gated by `unit` is dropped entirely.
struct Rule {
    every: u32,
    unit: IntervalUnit,
    times: Vec<Option<NaiveTime>>,
    days_of_week: Vec<Weekday>,
    days_of_month: Vec<u32>,
    tz: Tz,
}

impl Rule {
    fn normalize(freq: &ScheduleFrequency, start_local: &DateTime<Tz>) -> Result<Self> {
        let times = if freq.times_of_day.is_empty() {
            vec![None]
        } else {
            freq.times_of_day
                .iter()
                .map(|s| {
                    NaiveTime::parse_from_str(s, "%H:%M").map(Some).map_err(|_| {
                        RecastError::InvalidInput(format!("invalid time of day: '{}'", s))
                    })
                })
                .collect::<Result<Vec<_>>>()?
        };

        let days_of_week = match freq.unit {
            IntervalUnit::Week if freq.days_of_week.is_empty() => {
                vec![Weekday::from(start_local.weekday())]
            }
            IntervalUnit::Week => freq.days_of_week.clone(),
            _ => Vec::new(),
        };

        let days_of_month = match freq.unit {
            IntervalUnit::Month if freq.days_of_month.is_empty() => vec![start_local.day()],
            IntervalUnit::Month => {
                for day in &freq.days_of_month {
                    if *day == 0 || *day > 31 {
                        return Err(RecastError::InvalidInput(format!(
                            "invalid day of month: {}",
                            day
                        )));
                    }
                }
                freq.days_of_month.clone()
            }
            _ => Vec::new(),
        };

        Ok(Self {
            every: freq.every,
            unit: freq.unit,
            times,
            days_of_week,
            days_of_month,
            tz: start_local.timezone(),
        })
    }

    /// All instants reachable from `cursor` in one structural step.
    /// Candidates earlier than the cursor are filtered by the caller.
    fn candidates(&self, cursor: &DateTime<Tz>) -> Vec<DateTime<Tz>> {
        let mut out = Vec::new();
        let fallback = cursor.time();

        match self.unit {
            IntervalUnit::Minute | IntervalUnit::Hour => {
                let step = match self.unit {
                    IntervalUnit::Minute => Duration::minutes(i64::from(self.every)),
                    _ => Duration::hours(i64::from(self.every)),
                };
                if let Some(base) = cursor.checked_add_signed(step) {
                    for tod in &self.times {
                        match tod {
                            None => out.push(base),
                            Some(t) => {
                                out.extend(self.local(base.date_naive(), *t));
                            }
                        }
                    }
                }
            }
            IntervalUnit::Day => {
                for tod in &self.times {
                    // "Later today": only meaningful with an explicit time.
                    if let Some(t) = tod {
                        out.extend(self.local(cursor.date_naive(), *t));
                    }
                    if let Some(date) = cursor
                        .date_naive()
                        .checked_add_days(Days::new(u64::from(self.every)))
                    {
                        out.extend(self.local(date, tod.unwrap_or(fallback)));
                    }
                }
            }
            IntervalUnit::Week => {
                let current = cursor.weekday().num_days_from_sunday();
                for day in &self.days_of_week {
                    let mut ahead = u64::from((day.num_from_sunday() + 7 - current) % 7);
                    if ahead == 0 {
                        // Weekly recurrence never re-fires same-day.
                        ahead = u64::from(self.every) * 7;
                    }
                    for tod in &self.times {
                        if let Some(date) =
                            cursor.date_naive().checked_add_days(Days::new(ahead))
                        {
                            out.extend(self.local(date, tod.unwrap_or(fallback)));
                        }
                    }
                }
            }
            IntervalUnit::Month => {
                for dom in &self.days_of_month {
                    for tod in &self.times {
                        let time = tod.unwrap_or(fallback);
                        if let Some(date) = cursor.date_naive().with_day(*dom) {
                            out.extend(self.local(date, time));
                        }
                        if let Some(date) = first_of_month(cursor.date_naive())
                            .checked_add_months(Months::new(self.every))
                            .and_then(|base| base.with_day(*dom))
                        {
                            out.extend(self.local(date, time));
                        }
                    }
                }
            }
            IntervalUnit::Year => {
                if let Some(date) = cursor
                    .date_naive()
                    .checked_add_months(Months::new(self.every * 12))
                {
                    for tod in &self.times {
                        out.extend(self.local(date, tod.unwrap_or(fallback)));
                    }
                }
            }
        }

        out
    }

    /// Structural advance when no candidate qualified: move the cursor one
    /// interval forward with no time override.
    fn advance(&self, cursor: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        match self.unit {
            IntervalUnit::Minute => {
                cursor.checked_add_signed(Duration::minutes(i64::from(self.every)))
            }
            IntervalUnit::Hour => cursor.checked_add_signed(Duration::hours(i64::from(self.every))),
            IntervalUnit::Day => self.advance_days(cursor, u64::from(self.every)),
            IntervalUnit::Week => self.advance_days(cursor, u64::from(self.every) * 7),
            IntervalUnit::Month => cursor
                .date_naive()
                .checked_add_months(Months::new(self.every))
                .and_then(|date| self.local(date, cursor.time()))
                .or_else(|| cursor.checked_add_signed(Duration::days(i64::from(self.every) * 30))),
            IntervalUnit::Year => cursor
                .date_naive()
                .checked_add_months(Months::new(self.every * 12))
                .and_then(|date| self.local(date, cursor.time()))
                .or_else(|| cursor.checked_add_signed(Duration::days(i64::from(self.every) * 365))),
        }
    }

    /// Advance by whole local days, preserving the clock time across DST
    /// transitions where possible.
    fn advance_days(&self, cursor: &DateTime<Tz>, days: u64) -> Option<DateTime<Tz>> {
        cursor
            .date_naive()
            .checked_add_days(Days::new(days))
            .and_then(|date| self.local(date, cursor.time()))
            .or_else(|| cursor.checked_add_signed(Duration::days(days as i64)))
    }

    /// Resolve a local date+time in the rule's zone. Spring-forward gaps
    /// yield no instant; fall-back ambiguity takes the earlier mapping.
    fn local(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
        self.tz.from_local_datetime(&date.and_time(time)).earliest()
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).expect("day 1 is valid for every month")
}
