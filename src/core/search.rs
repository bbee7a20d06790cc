//! Provides the query side of the catalog: matching, truncation and result metadata.
//!
//! Result ids are the stringified positions of entries in the catalog snapshot
//! that was current when the query ran. They are only meaningful within one
//! catalog generation.

use super::catalog::CatalogSnapshot;
use super::{CatalogError, ScriptEntry};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Display data for one search result. Rendering the icon is left to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultMeta {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
}

/// Holds the current catalog snapshot and answers queries against it.
///
/// Every query works on one snapshot taken at its start, so a concurrent
/// catalog swap is observed either completely or not at all.
#[derive(Debug, Default)]
pub struct SearchEngine {
    snapshot: RwLock<Arc<CatalogSnapshot>>,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the catalog snapshot used by subsequent queries.
    pub fn update_scripts(&self, snapshot: CatalogSnapshot) {
        *self.snapshot.write() = Arc::new(snapshot);
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.snapshot.read().clone()
    }

    /// Returns the ids of all entries matching `terms`, in catalog order.
    ///
    /// The terms are joined with spaces and matched case-insensitively as a
    /// substring of the name, the description or the folder of the script.
    pub fn initial_result_set(
        &self,
        terms: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, CatalogError> {
        ensure_not_cancelled(cancel)?;

        let snapshot = self.snapshot();
        let query = terms.join(" ").to_lowercase();
        tracing::debug!(query = %query, total = snapshot.entries.len(), "Searching scripts");

        let mut results = Vec::new();
        for (index, entry) in snapshot.entries.iter().enumerate() {
            ensure_not_cancelled(cancel)?;
            if Self::matches_query(entry, &query) {
                results.push(index.to_string());
            }
        }

        ensure_not_cancelled(cancel)?;
        tracing::debug!(query = %query, matches = results.len(), "Search finished");
        Ok(results)
    }

    /// Refines a previous search. The previous ids are not used as a
    /// candidate set; the search simply runs again with the new terms.
    pub fn subsearch_result_set(
        &self,
        _previous_results: &[String],
        terms: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, CatalogError> {
        self.initial_result_set(terms, cancel)
    }

    /// Keeps the first `max_results` ids, preserving their order.
    pub fn filter_results(mut results: Vec<String>, max_results: usize) -> Vec<String> {
        results.truncate(max_results);
        results
    }

    /// Builds display data for `ids`. Ids that are not a valid index into the
    /// current snapshot are dropped rather than reported as errors.
    pub fn result_metas(
        &self,
        ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<ResultMeta>, CatalogError> {
        ensure_not_cancelled(cancel)?;

        let snapshot = self.snapshot();
        let mut metas = Vec::with_capacity(ids.len());
        for id in ids {
            ensure_not_cancelled(cancel)?;
            let Some(entry) = snapshot.get(id) else {
                tracing::debug!(id = %id, total = snapshot.entries.len(), "Dropping invalid result id");
                continue;
            };
            metas.push(ResultMeta {
                id: id.clone(),
                name: entry.name.clone(),
                description: entry.display_description(),
                icon: entry.icon.clone(),
            });
        }

        ensure_not_cancelled(cancel)?;
        Ok(metas)
    }

    /// Checks a single entry against an already lower-cased query.
    pub fn matches_query(entry: &ScriptEntry, query_lower: &str) -> bool {
        entry.name.to_lowercase().contains(query_lower)
            || entry.description.to_lowercase().contains(query_lower)
            || entry
                .directory()
                .is_some_and(|dir| dir.to_lowercase().contains(query_lower))
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<(), CatalogError> {
    if cancel.is_cancelled() {
        Err(CatalogError::Cancelled)
    } else {
        Ok(())
    }
}
