//! Record version markers.
//!
//! A [`Version`] is the last-modified timestamp of a persisted record. It is
//! the only revision marker a record carries: stores stamp it on every
//! accepted write and clients present it back as the base version of their
//! next edit. Versions are held at millisecond precision so they survive a
//! round trip through an integer column unchanged.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A millisecond-precision UTC last-modified timestamp.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(DateTime<Utc>);

impl Version {
    /// Current time, truncated to milliseconds.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// From milliseconds since the Unix epoch.
    ///
    /// Returns `None` when the value is outside chrono's representable range.
    pub fn from_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }

    /// From a DateTime, truncated to milliseconds.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::from_millis(dt.timestamp_millis()).unwrap_or(Self(dt))
    }

    /// Milliseconds since the Unix epoch.
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Get the inner DateTime.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// ISO 8601 string.
    pub fn to_iso8601(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Absolute distance between two versions in milliseconds.
    pub fn distance_millis(&self, other: &Version) -> u64 {
        self.as_millis().abs_diff(other.as_millis())
    }

    /// Whether two versions are equal within `tolerance`.
    ///
    /// The comparison is symmetric and inclusive: a difference of exactly
    /// `tolerance` still counts as the same version.
    pub fn matches(&self, other: &Version, tolerance: Duration) -> bool {
        u128::from(self.distance_millis(other)) <= tolerance.as_millis()
    }

    /// The version a store stamps when it accepts a write on top of `previous`.
    ///
    /// Always strictly greater than `previous`, even when the clock has not
    /// advanced (or has gone backwards) since the previous write.
    pub fn next_after(previous: &Version) -> Self {
        let now = Self::now();
        if now > *previous {
            now
        } else {
            Self::from_millis(previous.as_millis().saturating_add(1)).unwrap_or(now)
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_iso8601())
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({})", self)
    }
}
