//! Query parameters accepted by the fetch proxy.
//!
//! Parameters are split into the identifiers the cache key scheme knows about
//! (session, driver, lap) and free-form filters, which are kept sorted so the
//! same logical request always renders the same query and the same key.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SESSION_KEY_PARAM: &str = "session_key";
const DRIVER_NUMBER_PARAM: &str = "driver_number";
const LAP_NUMBER_PARAM: &str = "lap_number";

/// Upstream session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(u32);

impl SessionKey {
    /// Wrap a raw session key.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionKey {
    type Err = FetchParamsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_number(SESSION_KEY_PARAM, raw).map(Self)
    }
}

/// Validation errors raised while building [`FetchParams`] from raw pairs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchParamsError {
    /// A reserved identifier was not a non-negative integer.
    #[error("{name} must be a non-negative integer, got {value:?}")]
    InvalidNumber {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: String,
    },
    /// A filter name was blank.
    #[error("filter names must not be blank")]
    BlankFilterName,
}

/// Parameters for one category fetch.
///
/// # Examples
/// ```
/// use paddock::domain::{FetchParams, SessionKey};
///
/// let params = FetchParams::for_session(SessionKey::new(9158))
///     .with_driver(44)
///     .with_filter("speed>=", "315");
/// let pairs = params.query_pairs();
/// assert_eq!(pairs[0], ("session_key".to_owned(), "9158".to_owned()));
/// assert_eq!(pairs[1], ("driver_number".to_owned(), "44".to_owned()));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FetchParams {
    session_key: Option<SessionKey>,
    driver_number: Option<u32>,
    lap_number: Option<u32>,
    filters: BTreeMap<String, String>,
}

impl FetchParams {
    /// Parameters not scoped to a session, e.g. the session index.
    #[must_use]
    pub fn unscoped() -> Self {
        Self::default()
    }

    /// Parameters scoped to one session.
    #[must_use]
    pub fn for_session(session_key: SessionKey) -> Self {
        Self {
            session_key: Some(session_key),
            ..Self::default()
        }
    }

    /// Scope to `session_key`, replacing any previous session.
    #[must_use]
    pub fn with_session(mut self, session_key: SessionKey) -> Self {
        self.session_key = Some(session_key);
        self
    }

    /// Restrict to one driver.
    #[must_use]
    pub fn with_driver(mut self, driver_number: u32) -> Self {
        self.driver_number = Some(driver_number);
        self
    }

    /// Restrict to one lap.
    #[must_use]
    pub fn with_lap(mut self, lap_number: u32) -> Self {
        self.lap_number = Some(lap_number);
        self
    }

    /// Add a free-form upstream filter. Later values replace earlier ones.
    #[must_use]
    pub fn with_filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(name.into(), value.into());
        self
    }

    /// Build parameters from raw query pairs, routing the reserved names to
    /// their typed fields.
    ///
    /// # Errors
    ///
    /// Returns [`FetchParamsError`] when a reserved identifier is not numeric
    /// or a filter name is blank.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, FetchParamsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::default();
        for (name, value) in pairs {
            let name = name.as_ref().trim();
            let value = value.as_ref();
            match name {
                SESSION_KEY_PARAM => params.session_key = Some(value.parse()?),
                DRIVER_NUMBER_PARAM => {
                    params.driver_number = Some(parse_number(DRIVER_NUMBER_PARAM, value)?);
                }
                LAP_NUMBER_PARAM => {
                    params.lap_number = Some(parse_number(LAP_NUMBER_PARAM, value)?);
                }
                "" => return Err(FetchParamsError::BlankFilterName),
                other => {
                    params.filters.insert(other.to_owned(), value.to_owned());
                }
            }
        }
        Ok(params)
    }

    /// Session scope, if any.
    #[must_use]
    pub const fn session_key(&self) -> Option<SessionKey> {
        self.session_key
    }

    /// Driver restriction, if any.
    #[must_use]
    pub const fn driver_number(&self) -> Option<u32> {
        self.driver_number
    }

    /// Lap restriction, if any.
    #[must_use]
    pub const fn lap_number(&self) -> Option<u32> {
        self.lap_number
    }

    /// Free-form filters in sorted order.
    #[must_use]
    pub fn filters(&self) -> &BTreeMap<String, String> {
        &self.filters
    }

    /// Render the upstream query pairs in a stable order: identifiers first,
    /// then filters sorted by name.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let identifiers = [
            (SESSION_KEY_PARAM, self.session_key.map(SessionKey::get)),
            (DRIVER_NUMBER_PARAM, self.driver_number),
            (LAP_NUMBER_PARAM, self.lap_number),
        ];
        identifiers
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name.to_owned(), v.to_string())))
            .chain(
                self.filters
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone())),
            )
            .collect()
    }
}

fn parse_number(name: &'static str, raw: &str) -> Result<u32, FetchParamsError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| FetchParamsError::InvalidNumber {
            name,
            value: raw.to_owned(),
        })
}
