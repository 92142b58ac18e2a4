//! Upstream data categories served through the fetch proxy.
//!
//! Each category maps to one upstream path segment. The category also carries
//! the volatility-based default TTL used by [`crate::domain::TtlPolicy`] and
//! whether it belongs to the default replay preload set.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

/// Telemetry data category exposed by the upstream API.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DataCategory {
    /// Session metadata (practice, qualifying, race).
    Sessions,
    /// Driver roster for a session.
    Drivers,
    /// Lap timing records including mini-sector segment codes.
    Laps,
    /// High-frequency car telemetry samples (speed, gear, throttle, DRS).
    CarData,
    /// Gaps to the leader and to the car ahead.
    Intervals,
    /// Race-control messages (flags, penalties, safety car).
    RaceControl,
    /// Tyre stints.
    Stints,
    /// Running order changes.
    Position,
    /// Pit stop records.
    Pit,
    /// Track-side weather samples.
    Weather,
    /// On-track car coordinates.
    Location,
}

impl DataCategory {
    /// Every category in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Sessions,
        Self::Drivers,
        Self::Laps,
        Self::CarData,
        Self::Intervals,
        Self::RaceControl,
        Self::Stints,
        Self::Position,
        Self::Pit,
        Self::Weather,
        Self::Location,
    ];

    /// Upstream path segment, also used as the category component of cache keys.
    ///
    /// # Examples
    /// ```
    /// use paddock::domain::DataCategory;
    ///
    /// assert_eq!(DataCategory::CarData.as_str(), "car_data");
    /// ```
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sessions => "sessions",
            Self::Drivers => "drivers",
            Self::Laps => "laps",
            Self::CarData => "car_data",
            Self::Intervals => "intervals",
            Self::RaceControl => "race_control",
            Self::Stints => "stints",
            Self::Position => "position",
            Self::Pit => "pit",
            Self::Weather => "weather",
            Self::Location => "location",
        }
    }

    /// Default time-to-live reflecting how quickly the category changes.
    ///
    /// Reference data (sessions, drivers) lives for a day; live timing data
    /// (intervals, race control, position) expires within a minute.
    #[must_use]
    pub const fn default_ttl(self) -> Duration {
        let seconds = match self {
            Self::Sessions | Self::Drivers => 24 * HOUR,
            Self::CarData | Self::Location => HOUR,
            Self::Laps | Self::Stints | Self::Pit | Self::Weather => 5 * MINUTE,
            Self::RaceControl | Self::Position => MINUTE,
            Self::Intervals => 30,
        };
        Duration::from_secs(seconds)
    }

    /// Whether the category is fetched by a default replay preload.
    ///
    /// The session index itself is not session-scoped, so it is excluded.
    #[must_use]
    pub const fn preloaded_by_default(self) -> bool {
        !matches!(self, Self::Sessions)
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognised category name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown data category: {name}")]
pub struct UnknownCategoryError {
    name: String,
}

impl UnknownCategoryError {
    /// The rejected input.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}

impl FromStr for DataCategory {
    type Err = UnknownCategoryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownCategoryError {
                name: trimmed.to_owned(),
            })
    }
}
