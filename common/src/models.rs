use crate::errors::ScheduleError;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use uuid::Uuid;

// ============================================================================
// Time of day
// ============================================================================

/// A wall-clock time of day at minute precision, stored as minutes since midnight.
///
/// Parses from and renders to `HH:MM`. The hour may be written with one or two
/// digits (`8:05` and `08:05` are the same value); the minute always has two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MinuteOfDay(u16);

impl MinuteOfDay {
    pub const MINUTES_PER_DAY: u16 = 24 * 60;

    /// Build from a raw minute count, rejecting values past 23:59
    pub fn new(minutes: u32) -> Result<Self, ScheduleError> {
        if minutes >= u32::from(Self::MINUTES_PER_DAY) {
            return Err(ScheduleError::MinuteOutOfRange(minutes));
        }
        Ok(Self(minutes as u16))
    }

    /// Build from an hour/minute pair
    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, ScheduleError> {
        if hour >= 24 || minute >= 60 {
            return Err(ScheduleError::InvalidTime {
                input: format!("{}:{:02}", hour, minute),
                reason: "hour must be 0-23 and minute 0-59".to_string(),
            });
        }
        Ok(Self((hour * 60 + minute) as u16))
    }

    /// Truncate any wall-clock time to its minute of day
    pub fn from_time<T: Timelike>(time: &T) -> Self {
        Self((time.hour() * 60 + time.minute()) as u16)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Absolute distance in minutes within the same day.
    ///
    /// Does not wrap around midnight: 23:59 and 00:00 are 1439 minutes apart.
    pub fn distance(self, other: MinuteOfDay) -> u16 {
        self.0.abs_diff(other.0)
    }
}

fn time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{1,2}):(\d{2})$").expect("Invalid regex pattern"))
}

impl FromStr for MinuteOfDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ScheduleError::InvalidTime {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let captures = time_pattern()
            .captures(s.trim())
            .ok_or_else(|| invalid("expected HH:MM"))?;

        let hour: u32 = captures[1].parse().map_err(|_| invalid("hour is not a number"))?;
        let minute: u32 = captures[2]
            .parse()
            .map_err(|_| invalid("minute is not a number"))?;

        if hour >= 24 {
            return Err(invalid("hour must be between 00 and 23"));
        }
        if minute >= 60 {
            return Err(invalid("minute must be between 00 and 59"));
        }

        Ok(Self((hour * 60 + minute) as u16))
    }
}

impl fmt::Display for MinuteOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for MinuteOfDay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MinuteOfDay {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Medicine catalog
// ============================================================================

fn not_available() -> String {
    "N/A".to_string()
}

/// A medicine as reported by the dispenser catalog.
///
/// Missing fields are normalized on deserialization: quantity and total
/// dispensed default to zero, identifier and dosage to `"N/A"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    #[serde(rename = "rfidId", default = "not_available")]
    pub id: String,
    pub name: String,
    #[serde(default = "not_available")]
    pub dosage: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub last_dispensed: Option<String>,
    #[serde(default)]
    pub total_dispensed: u32,
}

impl Medicine {
    pub fn new(id: impl Into<String>, name: impl Into<String>, dosage: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            dosage: dosage.into(),
            quantity: 0,
            last_dispensed: None,
            total_dispensed: 0,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }
}

// ============================================================================
// Reminder models
// ============================================================================

/// Daily reminder schedule for one medicine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationSchedule {
    pub medicine_id: String,
    pub medicine_name: String,
    pub dosage: String,
    pub times: BTreeSet<MinuteOfDay>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// De-duplication key for a single daily reminder firing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub medicine_id: String,
    pub scheduled: MinuteOfDay,
    pub date: NaiveDate,
}

impl AlertKey {
    pub fn new(medicine_id: &str, scheduled: MinuteOfDay, date: NaiveDate) -> Self {
        Self {
            medicine_id: medicine_id.to_string(),
            scheduled,
            date,
        }
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.medicine_id,
            self.scheduled.minutes(),
            self.date
        )
    }
}

/// Payload delivered to alert subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    pub id: String,
    pub medicine_id: String,
    pub medicine_name: String,
    pub dosage: String,
    pub scheduled_time: MinuteOfDay,
    pub timestamp: DateTime<Utc>,
}

impl AlertPayload {
    pub fn for_schedule(
        key: &AlertKey,
        schedule: &MedicationSchedule,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: key.to_string(),
            medicine_id: schedule.medicine_id.clone(),
            medicine_name: schedule.medicine_name.clone(),
            dosage: schedule.dosage.clone(),
            scheduled_time: key.scheduled,
            timestamp,
        }
    }
}

/// One medication-taken event. `scheduled_time` is `None` for manual entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeLogEntry {
    pub id: Uuid,
    pub medicine_id: String,
    pub medicine_name: String,
    pub dosage: String,
    pub scheduled_time: Option<MinuteOfDay>,
    pub taken_at: DateTime<Utc>,
}

/// A reminder still ahead today
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingMedication {
    pub medicine_id: String,
    pub medicine_name: String,
    pub dosage: String,
    pub time: MinuteOfDay,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_parse_and_format() {
        let t: MinuteOfDay = "08:05".parse().unwrap();
        assert_eq!(t.minutes(), 485);
        assert_eq!(t.to_string(), "08:05");
    }

    #[test]
    fn test_parse_single_digit_hour() {
        let t: MinuteOfDay = "7:30".parse().unwrap();
        assert_eq!(t.to_string(), "07:30");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let t: MinuteOfDay = " 20:00 ".parse().unwrap();
        assert_eq!(t.minutes(), 1200);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for input in ["", "8", "08:5", "24:00", "12:60", "ab:cd", "08:00:00", "-1:00", "123:00"] {
            assert!(
                input.parse::<MinuteOfDay>().is_err(),
                "expected '{}' to be rejected",
                input
            );
        }
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(MinuteOfDay::new(1439).is_ok());
        assert_eq!(
            MinuteOfDay::new(1440),
            Err(ScheduleError::MinuteOutOfRange(1440))
        );
    }

    #[test]
    fn test_from_time_truncates_seconds() {
        let time = NaiveTime::from_hms_opt(14, 7, 59).unwrap();
        assert_eq!(MinuteOfDay::from_time(&time).to_string(), "14:07");
    }

    #[test]
    fn test_distance_does_not_wrap_midnight() {
        let late = MinuteOfDay::from_hm(23, 59).unwrap();
        let early = MinuteOfDay::from_hm(0, 0).unwrap();
        assert_eq!(late.distance(early), 1439);
    }

    #[test]
    fn test_minute_of_day_serializes_as_string() {
        let t = MinuteOfDay::from_hm(9, 0).unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"09:00\"");
        let back: MinuteOfDay = serde_json::from_str("\"09:00\"").unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_alert_key_display() {
        let key = AlertKey::new(
            "22",
            MinuteOfDay::from_hm(8, 0).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        );
        assert_eq!(key.to_string(), "22-480-2024-03-01");
    }

    #[test]
    fn test_medicine_defaults_are_normalized() {
        let medicine: Medicine = serde_json::from_str(r#"{"name": "Aspirin"}"#).unwrap();
        assert_eq!(medicine.id, "N/A");
        assert_eq!(medicine.dosage, "N/A");
        assert_eq!(medicine.quantity, 0);
        assert_eq!(medicine.total_dispensed, 0);
        assert!(medicine.last_dispensed.is_none());
    }

    #[test]
    fn test_medicine_reads_rfid_id() {
        let medicine: Medicine = serde_json::from_str(
            r#"{"name": "Ibuprofen", "rfidId": "12", "dosage": "200mg", "quantity": 1}"#,
        )
        .unwrap();
        assert_eq!(medicine.id, "12");
        assert_eq!(medicine.quantity, 1);
    }
}
