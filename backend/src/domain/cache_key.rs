//! Cache key type and the deterministic key scheme used by the fetch proxy.
//!
//! Keys are positional so session and category prefixes can be invalidated
//! with a single prefix delete:
//!
//! ```text
//! <namespace>:<session|->:<category>:<driver|->:<lap|->:<filters fingerprint|->
//! ```
//!
//! Filters are rendered as sorted, length-prefixed `name=value` pairs and
//! hashed with SHA-256, so arbitrary filter values never leak delimiters into
//! the key and cannot impersonate a different filter set.

use sha2::{Digest, Sha256};
use thiserror::Error;

use super::{DataCategory, FetchParams, SessionKey};

const ABSENT: &str = "-";
const DEFAULT_NAMESPACE: &str = "paddock:v1";
/// Number of digest bytes kept in the filters fingerprint.
const FINGERPRINT_BYTES: usize = 16;

/// Cache key used to store and retrieve upstream responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Construct a cache key after validating that it is non-empty and trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheKeyValidationError`] for blank or padded input.
    pub fn new(value: impl Into<String>) -> Result<Self, CacheKeyValidationError> {
        let raw = value.into();
        validate(&raw)?;
        Ok(Self(raw))
    }

    /// Borrow the underlying key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Validation errors returned when constructing [`CacheKey`] or a
/// [`CacheKeyScheme`] namespace.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheKeyValidationError {
    /// Key is empty after trimming whitespace.
    #[error("cache key must not be empty")]
    Empty,
    /// Key contains leading or trailing whitespace.
    #[error("cache key must not contain surrounding whitespace")]
    ContainsWhitespace,
}

fn validate(raw: &str) -> Result<(), CacheKeyValidationError> {
    if raw.trim().is_empty() {
        return Err(CacheKeyValidationError::Empty);
    }
    if raw.trim() != raw {
        return Err(CacheKeyValidationError::ContainsWhitespace);
    }
    Ok(())
}

/// Builds cache keys and invalidation prefixes under one namespace.
///
/// # Examples
/// ```
/// use paddock::domain::{CacheKeyScheme, DataCategory, FetchParams, SessionKey};
///
/// let scheme = CacheKeyScheme::default();
/// let key = scheme.key_for(
///     DataCategory::Laps,
///     &FetchParams::for_session(SessionKey::new(9158)).with_driver(44),
/// );
/// assert_eq!(key.as_str(), "paddock:v1:9158:laps:44:-:-");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyScheme {
    namespace: String,
}

impl Default for CacheKeyScheme {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_owned(),
        }
    }
}

impl CacheKeyScheme {
    /// Build a scheme rooted at a custom namespace (e.g. `paddock:staging`).
    ///
    /// # Errors
    ///
    /// Returns [`CacheKeyValidationError`] for blank or padded namespaces.
    pub fn new(namespace: impl Into<String>) -> Result<Self, CacheKeyValidationError> {
        let namespace = namespace.into();
        validate(&namespace)?;
        Ok(Self { namespace })
    }

    /// Namespace shared by every key.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    /// Deterministic key for one category fetch.
    #[must_use]
    pub fn key_for(&self, category: DataCategory, params: &FetchParams) -> CacheKey {
        let session = render_optional(params.session_key().map(SessionKey::get));
        let driver = render_optional(params.driver_number());
        let lap = render_optional(params.lap_number());
        let fingerprint = filters_fingerprint(params).unwrap_or_else(|| ABSENT.to_owned());
        CacheKey(format!(
            "{namespace}:{session}:{category}:{driver}:{lap}:{fingerprint}",
            namespace = self.namespace,
        ))
    }

    /// Prefix covering every cached category for one session.
    #[must_use]
    pub fn session_prefix(&self, session_key: SessionKey) -> String {
        format!("{}:{session_key}:", self.namespace)
    }

    /// Prefix covering one category of one session.
    #[must_use]
    pub fn category_prefix(&self, session_key: SessionKey, category: DataCategory) -> String {
        format!("{}:{session_key}:{category}:", self.namespace)
    }
}

fn render_optional(value: Option<u32>) -> String {
    value.map_or_else(|| ABSENT.to_owned(), |v| v.to_string())
}

fn filters_fingerprint(params: &FetchParams) -> Option<String> {
    if params.filters().is_empty() {
        return None;
    }
    let canonical = params
        .filters()
        .iter()
        .map(|(name, value)| format!("{}:{name}={}:{value}", name.len(), value.len()))
        .collect::<Vec<_>>()
        .join("&");
    let digest = Sha256::digest(canonical.as_bytes());
    Some(hex::encode(digest.iter().take(FINGERPRINT_BYTES).copied().collect::<Vec<_>>()))
}
