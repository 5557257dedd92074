//! Millisecond-precision timestamp type
//!
//! Every STAMP carries the time its version was authored. Times are
//! milliseconds since the Unix epoch, signed so that the sentinel
//! `Timestamp::PREMUNDANE` (before any real edit) sorts below every real time.
//!
//! ## Usage
//!
//! Never expose raw arithmetic. Use explicit constructors:
//!
//! ```
//! use termstore_core::Timestamp;
//!
//! let now = Timestamp::now();
//! let from_secs = Timestamp::from_secs(1000);
//! let from_millis = Timestamp::from_millis(1_000_000);
//! assert!(from_secs == from_millis);
//! assert!(now < Timestamp::LATEST);
//! ```
//!
//! Concurrent edits may carry equal times, and times are not monotonic per
//! author; ordering between versions is decided by the coordinate, not here.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Millisecond-precision timestamp
///
/// ## Invariants
///
/// - Timestamps are always in milliseconds
/// - Timestamps are comparable and totally ordered
/// - `LATEST` is the ceiling meaning "no time limit"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Ceiling that admits every real time
    pub const LATEST: Timestamp = Timestamp(i64::MAX);

    /// Time of content that predates any recorded edit
    pub const PREMUNDANE: Timestamp = Timestamp(i64::MIN + 1);

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a timestamp for the current moment
    ///
    /// Returns epoch if the system clock is before the Unix epoch.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_millis() as i64)
    }

    /// Create a timestamp from milliseconds since epoch
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    /// Create a timestamp from seconds since epoch
    #[inline]
    pub const fn from_secs(secs: i64) -> Self {
        Timestamp(secs.saturating_mul(1_000))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get milliseconds since Unix epoch
    #[inline]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// True for the `LATEST` ceiling
    #[inline]
    pub const fn is_latest(&self) -> bool {
        self.0 == i64::MAX
    }

    /// Check if this timestamp is before another
    #[inline]
    pub fn is_before(&self, other: Timestamp) -> bool {
        self.0 < other.0
    }

    /// Check if this timestamp is after another
    #[inline]
    pub fn is_after(&self, other: Timestamp) -> bool {
        self.0 > other.0
    }

    /// Add a duration, saturating at `LATEST`
    pub fn saturating_add(&self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_add(duration.as_millis() as i64))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_latest() {
            return f.write_str("latest");
        }
        if *self == Timestamp::PREMUNDANE {
            return f.write_str("premundane");
        }
        match Utc.timestamp_millis_opt(self.0).single() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            None => write!(f, "{}ms", self.0),
        }
    }
}

// ============================================================================
// From Implementations
// ============================================================================

impl From<i64> for Timestamp {
    /// Create from raw milliseconds
    fn from(millis: i64) -> Self {
        Timestamp::from_millis(millis)
    }
}

impl From<Timestamp> for i64 {
    /// Extract raw milliseconds
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

// ============================================================================
// Tests
// ============================================================================
