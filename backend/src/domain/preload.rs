//! Replay preload: warm every category of one session concurrently.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::{DataCategory, FetchParams, FetchSource, ResilientFetchProxy, SessionKey};

/// Per-category outcome of one preload.
///
/// A category whose fetch failed, or which was answered by the breaker
/// fallback, maps to an empty list and is listed in `failed_categories`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreloadResult {
    /// Preloaded session.
    pub session_key: Option<SessionKey>,
    /// Records per requested category.
    pub categories: BTreeMap<DataCategory, Vec<Value>>,
    /// Categories that could not be fetched from cache or upstream.
    pub failed_categories: BTreeSet<DataCategory>,
}

impl PreloadResult {
    /// Records for `category`; empty when not requested or failed.
    pub fn records(&self, category: DataCategory) -> &[Value] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether every requested category was fetched.
    pub fn is_complete(&self) -> bool {
        self.failed_categories.is_empty()
    }

    /// Record counts suitable for an HTTP response.
    pub fn summary(&self) -> PreloadSummary {
        PreloadSummary {
            session_key: self.session_key.map(SessionKey::get),
            record_counts: self
                .categories
                .iter()
                .map(|(category, records)| (*category, records.len()))
                .collect(),
            failed_categories: self.failed_categories.iter().copied().collect(),
        }
    }
}

/// Compact view of a [`PreloadResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreloadSummary {
    /// Preloaded session.
    #[schema(example = 9158)]
    pub session_key: Option<u32>,
    /// Number of records fetched per category.
    #[schema(value_type = Object, example = json!({"laps": 1140, "pit": 38}))]
    pub record_counts: BTreeMap<DataCategory, usize>,
    /// Categories that came back empty because they were unavailable.
    pub failed_categories: Vec<DataCategory>,
}

/// Fans out one fetch per category and waits for all of them.
pub struct PreloadOrchestrator {
    proxy: Arc<ResilientFetchProxy>,
    categories: Vec<DataCategory>,
}

impl PreloadOrchestrator {
    /// Orchestrator over the default replay category set.
    pub fn new(proxy: Arc<ResilientFetchProxy>) -> Self {
        Self {
            proxy,
            categories: DataCategory::ALL
                .into_iter()
                .filter(|category| category.preloaded_by_default())
                .collect(),
        }
    }

    /// Replace the category set. Duplicates are ignored.
    #[must_use]
    pub fn with_categories(mut self, categories: impl IntoIterator<Item = DataCategory>) -> Self {
        let unique: BTreeSet<DataCategory> = categories.into_iter().collect();
        self.categories = unique.into_iter().collect();
        self
    }

    /// Categories fetched by [`Self::preload`].
    pub fn categories(&self) -> &[DataCategory] {
        &self.categories
    }

    /// Fetch every configured category for `session_key`.
    ///
    /// All fetches start before any is awaited. Failures never abort the
    /// other categories; they are recorded as empty results.
    pub async fn preload(&self, session_key: SessionKey) -> PreloadResult {
        let params = FetchParams::for_session(session_key);
        let fetches = self.categories.iter().map(|&category| {
            let params = &params;
            async move {
                let outcome = self.proxy.fetch_with_status(category, params).await;
                (category, outcome)
            }
        });

        let mut result = PreloadResult {
            session_key: Some(session_key),
            ..PreloadResult::default()
        };
        for (category, outcome) in join_all(fetches).await {
            let records = match outcome {
                Ok(outcome) if outcome.source == FetchSource::Fallback => {
                    result.failed_categories.insert(category);
                    outcome.records
                }
                Ok(outcome) => outcome.records,
                Err(error) => {
                    warn!(%session_key, %category, %error, "preload category failed");
                    result.failed_categories.insert(category);
                    Vec::new()
                }
            };
            result.categories.insert(category, records);
        }

        info!(
            %session_key,
            categories = result.categories.len(),
            failed = result.failed_categories.len(),
            "session preload settled"
        );
        result
    }
}
