//! Reservation and room models

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Id;

/// Rehearsal room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub capacity: u32,
}

/// Reservation entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Id,
    pub band: Id,
    pub room: Id,
    #[serde(with = "wall_clock")]
    pub start_time: NaiveDateTime,
    #[serde(with = "wall_clock")]
    pub end_time: NaiveDateTime,
    #[serde(default)]
    pub guests: Vec<Id>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Reservation {
    /// True when `[start, end)` intersects this reservation
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start_time < end && start < self.end_time
    }
}

/// New reservation payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReservation {
    pub band: Id,
    pub room: Id,
    #[serde(with = "wall_clock")]
    pub start_time: NaiveDateTime,
    #[serde(with = "wall_clock")]
    pub end_time: NaiveDateTime,
    pub guests: Vec<Id>,
}

/// Wall-clock timestamps
///
/// Written without an offset so the backend applies its own time zone.
/// Read from the same form or from RFC 3339, converted to local time.
pub mod wall_clock {
    use chrono::{DateTime, Local, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        if let Ok(value) = NaiveDateTime::parse_from_str(raw, FORMAT) {
            return Some(value);
        }
        if let Ok(value) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(value);
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|value| value.with_timezone(&Local).naive_local())
    }
}
