use std::{borrow::Cow, fmt};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use serde_with::{serde_as, DefaultOnError};

/// An absolute point in time, or the empty sentinel when the wall-clock
/// input could not be resolved.
///
/// Stored as RFC 3339 with millisecond precision and a `Z` suffix, or `""`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Instant(Option<DateTime<Utc>>);

impl Instant {
    pub const EMPTY: Instant = Instant(None);

    pub fn new(at: DateTime<Utc>) -> Self {
        Self(Some(at.trunc_subsecs(3)))
    }

    pub fn parse(raw: &str) -> Self {
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|at| Self::new(at.with_timezone(&Utc)))
            .unwrap_or_default()
    }

    pub fn get(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl From<Option<DateTime<Utc>>> for Instant {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map(Self::new).unwrap_or_default()
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(at) => f.write_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => Ok(()),
        }
    }
}

impl Serialize for Instant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Instant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Instant::parse).unwrap_or_default())
    }
}

/// A wall-clock pair as typed by the user plus the instant it resolved to.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stamp {
    #[serde_as(as = "DefaultOnError")]
    pub date: String,
    #[serde_as(as = "DefaultOnError")]
    pub time: String,
    #[serde_as(as = "DefaultOnError")]
    pub instant: Instant,
}

/// One leg of the itinerary.
///
/// Every field falls back to its empty value when the stored record is
/// missing it or holds the wrong type, so hand-edited or stale storage still
/// loads and renders.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Trip {
    #[serde_as(as = "DefaultOnError")]
    pub train: String,
    #[serde_as(as = "DefaultOnError")]
    pub origin: String,
    #[serde_as(as = "DefaultOnError")]
    pub destination: String,
    #[serde_as(as = "DefaultOnError")]
    pub depart: Stamp,
    #[serde_as(as = "DefaultOnError")]
    pub arrive: Stamp,
    #[serde_as(as = "DefaultOnError")]
    pub notes: String,
    #[serde_as(as = "DefaultOnError")]
    pub created_at: Instant,
}

/// One element of the itinerary as held in memory and in storage.
///
/// Elements that do not survive a `Trip` round trip unchanged are kept as
/// the stored JSON so that saving never rewrites what the user had.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Trip(Trip),
    Raw(Value),
}

impl Record {
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<Trip>(value.clone()) {
            Ok(trip) if serde_json::to_value(&trip).ok().as_ref() == Some(&value) => {
                Record::Trip(trip)
            }
            _ => Record::Raw(value),
        }
    }

    /// Lenient view for display: missing or mistyped fields read as empty.
    pub fn view(&self) -> Cow<'_, Trip> {
        match self {
            Record::Trip(trip) => Cow::Borrowed(trip),
            Record::Raw(value) => {
                Cow::Owned(serde_json::from_value(value.clone()).unwrap_or_default())
            }
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Record::Raw(_))
    }
}

impl From<Trip> for Record {
    fn from(trip: Trip) -> Self {
        Record::Trip(trip)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Record::from_value)
    }
}

/// Raw values of the eight input fields, exactly as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TripForm {
    pub train: String,
    pub origin: String,
    pub destination: String,
    pub depart_date: String,
    pub depart_time: String,
    pub arrive_date: String,
    pub arrive_time: String,
    pub notes: String,
}
