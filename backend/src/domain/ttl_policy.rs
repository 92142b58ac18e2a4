//! Category-to-TTL table consulted on every cache write.

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use super::{DataCategory, UnknownCategoryError};

/// Errors raised while parsing TTL override lists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TtlPolicyError {
    /// An entry was not of the form `category=seconds`.
    #[error("TTL override {entry:?} must look like `category=seconds`")]
    Malformed {
        /// Offending entry.
        entry: String,
    },
    /// The category name is not recognised.
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategoryError),
    /// The TTL exceeds [`MAX_TTL`].
    #[error("TTL for {category} must not exceed {max} seconds, got {seconds}")]
    TooLong {
        /// Category being overridden.
        category: DataCategory,
        /// Rejected value.
        seconds: u64,
        /// Largest accepted value.
        max: u64,
    },
    /// The TTL is not a positive integer number of seconds.
    #[error("TTL for {category} must be a positive number of seconds, got {value:?}")]
    InvalidSeconds {
        /// Category being overridden.
        category: DataCategory,
        /// Rejected value.
        value: String,
    },
}

/// Longest TTL accepted from configuration (30 days).
pub const MAX_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Fixed TTL table: category defaults plus configured overrides.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use paddock::domain::{DataCategory, TtlPolicy};
///
/// let policy = TtlPolicy::parse_overrides("laps=30").expect("valid overrides");
/// assert_eq!(policy.ttl_for(DataCategory::Laps), Duration::from_secs(30));
/// assert_eq!(
///     policy.ttl_for(DataCategory::Drivers),
///     DataCategory::Drivers.default_ttl()
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TtlPolicy {
    overrides: BTreeMap<DataCategory, Duration>,
}

impl TtlPolicy {
    /// Replace the TTL for one category.
    #[must_use]
    pub fn with_override(mut self, category: DataCategory, ttl: Duration) -> Self {
        self.overrides.insert(category, ttl);
        self
    }

    /// Parse a comma-separated `category=seconds` list on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`TtlPolicyError`] for malformed entries, unknown categories,
    /// zero or non-numeric durations, and durations above [`MAX_TTL`].
    pub fn parse_overrides(raw: &str) -> Result<Self, TtlPolicyError> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .try_fold(Self::default(), |policy, entry| {
                let (category, ttl) = parse_entry(entry)?;
                Ok(policy.with_override(category, ttl))
            })
    }

    /// TTL applied when caching `category`.
    #[must_use]
    pub fn ttl_for(&self, category: DataCategory) -> Duration {
        self.overrides
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_ttl())
    }
}

fn parse_entry(entry: &str) -> Result<(DataCategory, Duration), TtlPolicyError> {
    let Some((name, seconds)) = entry.split_once('=') else {
        return Err(TtlPolicyError::Malformed {
            entry: entry.to_owned(),
        });
    };
    let category: DataCategory = name.parse()?;
    match seconds.trim().parse::<u64>() {
        Ok(secs) if secs > MAX_TTL.as_secs() => Err(TtlPolicyError::TooLong {
            category,
            seconds: secs,
            max: MAX_TTL.as_secs(),
        }),
        Ok(secs) if secs > 0 => Ok((category, Duration::from_secs(secs))),
        _ => Err(TtlPolicyError::InvalidSeconds {
            category,
            value: seconds.trim().to_owned(),
        }),
    }
}
