//! Clock and timestamp handling.
//!
//! Every time-based decision (status resolution, retention, reminder
//! thresholds) reads "now" from a [`Clock`] pinned to one canonical
//! timezone. Stored timestamps are [`Stamp`]s, which may or may not carry an
//! offset; naive values are read as wall-clock time in the canonical zone.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Mutex;

/// Default canonical timezone name.
pub const DEFAULT_TIMEZONE: &str = "Europe/Kyiv";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Source of the current time in the canonical timezone.
pub trait Clock: Send + Sync {
    /// Current instant, expressed in [`Clock::timezone`].
    fn now(&self) -> DateTime<Tz>;

    /// The canonical timezone all comparisons are made in.
    fn timezone(&self) -> Tz;
}

/// Wall clock backed by the system time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    fn timezone(&self) -> Tz {
        self.tz
    }
}

/// Clock that only moves when told to. Used by tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Tz>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Tz>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: DateTime<Tz>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }

    /// Move the clock forward (or backward, for a negative delta).
    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Tz> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn timezone(&self) -> Tz {
        self.now().timezone()
    }
}

/// Parse an IANA timezone name such as `Europe/Kyiv`.
pub fn parse_timezone(name: &str) -> crate::Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| crate::PrepError::Config(format!("unknown timezone '{name}': {e}")))
}

/// Interpret a naive wall-clock time in `tz`.
///
/// Ambiguous times (DST fold) take the earlier instant; nonexistent times
/// (DST gap) are shifted forward by one hour.
pub fn localize(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(naive + TimeDelta::hours(1)))
                .earliest()
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

/// A stored timestamp, with or without an explicit UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    /// Carries its own offset (RFC 3339).
    Zoned(DateTime<FixedOffset>),
    /// Wall-clock time in the canonical timezone.
    Naive(NaiveDateTime),
}

impl Stamp {
    /// Stamp an instant produced by a [`Clock`].
    pub fn at<T: TimeZone>(instant: &DateTime<T>) -> Self {
        Self::Zoned(instant.fixed_offset())
    }

    /// Resolve to an absolute instant in `tz`.
    pub fn resolve(&self, tz: Tz) -> DateTime<Tz> {
        match self {
            Self::Zoned(dt) => dt.with_timezone(&tz),
            Self::Naive(naive) => localize(tz, *naive),
        }
    }

    /// Parse either an RFC 3339 timestamp or a naive ISO-8601 date-time.
    pub fn parse(raw: &str) -> std::result::Result<Self, String> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Self::Zoned(dt));
        }
        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Ok(Self::Naive(naive));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Ok(Self::Naive(date.and_time(chrono::NaiveTime::MIN)));
        }
        Err(format!("unrecognised timestamp '{raw}'"))
    }
}

impl std::fmt::Display for Stamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zoned(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Naive(naive) => write!(f, "{}", naive.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

impl Serialize for Stamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Stamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
