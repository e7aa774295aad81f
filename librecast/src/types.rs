//! Core types for Recast

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{RecastError, Result};

/// A backed-up or drafted post waiting in a group's queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedPost {
    pub id: String,
    /// Which schedule group this post belongs to.
    pub group: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Set once the post has been republished by a schedule.
    pub republished_at: Option<DateTime<Utc>>,
    pub metadata: Option<String>,
}

impl QueuedPost {
    pub fn new(group: String, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            group,
            content,
            created_at: Utc::now(),
            republished_at: None,
            metadata: None,
        }
    }
}

/// Calendar granularity of a recurrence interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

/// Canonical weekday names accepted in schedule rules (case-sensitive).
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Day of the week, Sunday through Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// Days counted from Sunday (0) to Saturday (6).
    pub fn num_from_sunday(self) -> u32 {
        match self {
            Weekday::Sunday => 0,
            Weekday::Monday => 1,
            Weekday::Tuesday => 2,
            Weekday::Wednesday => 3,
            Weekday::Thursday => 4,
            Weekday::Friday => 5,
            Weekday::Saturday => 6,
        }
    }

    pub fn name(self) -> &'static str {
        WEEKDAY_NAMES[self.num_from_sunday() as usize]
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Sun => Weekday::Sunday,
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
        }
    }
}

impl From<Weekday> for String {
    fn from(day: Weekday) -> Self {
        day.name().to_string()
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Weekday {
    type Err = RecastError;

    /// Case-sensitive match against the canonical Sunday–Saturday set.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Sunday" => Ok(Weekday::Sunday),
            "Monday" => Ok(Weekday::Monday),
            "Tuesday" => Ok(Weekday::Tuesday),
            "Wednesday" => Ok(Weekday::Wednesday),
            "Thursday" => Ok(Weekday::Thursday),
            "Friday" => Ok(Weekday::Friday),
            "Saturday" => Ok(Weekday::Saturday),
            other => Err(RecastError::InvalidInput(format!(
                "unrecognized day of week: '{}' (expected one of {})",
                other,
                WEEKDAY_NAMES.join(", ")
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Weekday {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct WeekdayVisitor;

        impl serde::de::Visitor<'_> for WeekdayVisitor {
            type Value = Weekday;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a weekday name (Sunday through Saturday)")
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Weekday, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(|e| E::custom(format!("{}", e)))
            }
        }

        // Non-string entries fall through to the visitor's type error,
        // which names the offending value.
        deserializer.deserialize_any(WeekdayVisitor)
    }
}

/// An immutable recurrence rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleFrequency {
    /// How many units between occurrences; must be > 0.
    pub every: u32,
    pub unit: IntervalUnit,
    /// "HH:MM" entries, local to `time_zone`. Empty means structural
    /// advance only.
    #[serde(default)]
    pub times_of_day: Vec<String>,
    /// Meaningful only when `unit` is `week`.
    #[serde(default)]
    pub days_of_week: Vec<Weekday>,
    /// Meaningful only when `unit` is `month`; entries 1-31.
    #[serde(default)]
    pub days_of_month: Vec<u32>,
    /// IANA zone name.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

impl ScheduleFrequency {
    pub fn new(every: u32, unit: IntervalUnit) -> Self {
        Self {
            every,
            unit,
            times_of_day: Vec::new(),
            days_of_week: Vec::new(),
            days_of_month: Vec::new(),
            time_zone: default_time_zone(),
        }
    }
}

/// A persisted repeating schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub name: String,
    /// Which queued posts this schedule draws from.
    pub group: String,
    /// Target account identifiers.
    #[serde(default)]
    pub accounts: Vec<String>,
    pub frequency: ScheduleFrequency,
    pub is_active: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Bootstrap-set to "now" the first time the evaluator sees it unset,
    /// then updated after every due tick.
    pub last_triggered: Option<DateTime<Utc>>,
    /// Informational cache of the next computed occurrence.
    pub next_trigger: Option<DateTime<Utc>>,
    /// Explicit ordering of queued post ids, when the user has reordered.
    pub post_order: Option<Vec<String>>,
}

impl Schedule {
    pub fn new(name: String, group: String, frequency: ScheduleFrequency) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            group,
            accounts: Vec::new(),
            frequency,
            is_active: true,
            start_time: None,
            end_time: None,
            last_triggered: None,
            next_trigger: None,
            post_order: None,
        }
    }
}
