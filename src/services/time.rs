use std::str::FromStr;

use chrono::{
    DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::error::AppError;

pub const DEFAULT_DISPLAY_TZ: Tz = chrono_tz::America::Los_Angeles;

const DISPLAY_FORMAT: &str = "%a, %b %d, %-I:%M %p";
const TOKEN_FORMAT: &str = "%Y%m%d-%H%M%S";
const TIME_FORMATS: [&str; 3] = ["%H:%M", "%H:%M:%S", "%H:%M:%S%.f"];

/// Zone used to resolve typed wall-clock pairs into instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputZone {
    /// Whatever timezone the host environment runs in.
    #[default]
    Local,
    Fixed(Tz),
}

impl FromStr for InputZone {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "" | "local" => Ok(InputZone::Local),
            name => parse_tz(name).map(InputZone::Fixed),
        }
    }
}

/// Parsing and display zones. They are deliberately independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeZones {
    pub input: InputZone,
    pub display: Tz,
}

impl Default for TimeZones {
    fn default() -> Self {
        Self {
            input: InputZone::Local,
            display: DEFAULT_DISPLAY_TZ,
        }
    }
}

pub fn parse_tz(name: &str) -> Result<Tz, AppError> {
    Tz::from_str(name.trim())
        .map_err(|err| AppError::Config(format!("unknown timezone {name:?}: {err}")))
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Resolves a typed `(date, time)` pair in `zone` to an absolute instant.
///
/// Returns `None` when either side is blank, does not parse, or names a
/// wall-clock moment that does not exist in the zone (spring-forward gap).
/// A repeated moment (fall-back fold) resolves to the earlier instant.
pub fn to_instant(date: &str, time: &str, zone: InputZone) -> Option<DateTime<Utc>> {
    let date = date.trim();
    let time = time.trim();
    if date.is_empty() || time.is_empty() {
        return None;
    }

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(time, format).ok())?;
    let wall = NaiveDateTime::new(date, time);

    match zone {
        InputZone::Local => earliest(Local.from_local_datetime(&wall)),
        InputZone::Fixed(tz) => earliest(tz.from_local_datetime(&wall)),
    }
}

fn earliest<Z: TimeZone>(resolved: LocalResult<DateTime<Z>>) -> Option<DateTime<Utc>> {
    resolved.earliest().map(|at| at.with_timezone(&Utc))
}

/// Renders an instant in the display zone, e.g. `Mon, Jan 05, 3:07 PM`.
pub fn format_for_display(instant: Option<DateTime<Utc>>, tz: Tz) -> String {
    instant
        .map(|at| at.with_timezone(&tz).format(DISPLAY_FORMAT).to_string())
        .unwrap_or_default()
}

/// Sortable `YYYYMMDD-HHMMSS` token in the display zone.
pub fn timestamp_token(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format(TOKEN_FORMAT).to_string()
}
