use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{FilterFragment, FilterState, HistoryKind, SearchHistoryEntry};

/// Most recent entries kept
pub const MAX_HISTORY_ENTRIES: usize = 20;

/// Capped, deduplicated, frequency-counting search log (newest first)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHistory {
    entries: Vec<SearchHistoryEntry>,
}

impl SearchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap stored entries, enforcing the cap
    pub fn from_entries(mut entries: Vec<SearchHistoryEntry>) -> Self {
        entries.truncate(MAX_HISTORY_ENTRIES);
        Self { entries }
    }

    pub fn entries(&self) -> &[SearchHistoryEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<SearchHistoryEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a plain free-text search
    pub fn record(&mut self, query: &str, now: DateTime<Utc>) {
        self.upsert(query, HistoryKind::Text, None, now);
    }

    /// Record an architect/prefecture search along with the facets needed to replay it
    pub fn record_facet(&mut self, kind: HistoryKind, label: &str, fragment: FilterFragment, now: DateTime<Utc>) {
        if kind == HistoryKind::Text {
            self.record(label, now);
            return;
        }
        self.upsert(label, kind, Some(fragment), now);
    }

    fn upsert(&mut self, query: &str, kind: HistoryKind, fragment: Option<FilterFragment>, now: DateTime<Utc>) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }

        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.query == query && e.effective_kind() == kind)
        {
            entry.count = entry.count.saturating_add(1);
            entry.searched_at = now;
            if fragment.is_some() {
                entry.filters = fragment;
            }
            return;
        }

        self.entries.insert(
            0,
            SearchHistoryEntry {
                query: query.to_string(),
                searched_at: now,
                count: 1,
                kind: (kind != HistoryKind::Text).then_some(kind),
                filters: fragment,
            },
        );
        self.entries.truncate(MAX_HISTORY_ENTRIES);
    }

    /// Most frequent first, most recent breaking ties
    pub fn popular(&self, limit: usize) -> Vec<&SearchHistoryEntry> {
        let mut ranked: Vec<&SearchHistoryEntry> = self.entries.iter().collect();
        ranked.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| b.searched_at.cmp(&a.searched_at))
        });
        ranked.truncate(limit);
        ranked
    }

    /// Free-text entries containing `input`; facet entries never take part
    pub fn text_suggestions(&self, input: &str) -> Vec<&SearchHistoryEntry> {
        let needle = input.trim().to_lowercase();
        let mut matched: Vec<&SearchHistoryEntry> = self
            .entries
            .iter()
            .filter(|e| e.effective_kind() == HistoryKind::Text)
            .filter(|e| needle.is_empty() || e.query.to_lowercase().contains(&needle))
            .collect();
        matched.sort_by(|a, b| b.count.cmp(&a.count));
        matched
    }
}

impl SearchHistoryEntry {
    /// Filter state that re-runs this search on top of `base`
    pub fn replay(&self, base: &FilterState) -> FilterState {
        let mut filters = base.clone();
        match self.effective_kind() {
            HistoryKind::Text => {
                filters.query = self.query.clone();
            }
            HistoryKind::Architect | HistoryKind::Prefecture => {
                filters.query.clear();
                let fragment = self.filters.clone().unwrap_or_default();
                if self.effective_kind() == HistoryKind::Architect {
                    filters.architects = if fragment.architects.is_empty() {
                        std::iter::once(self.query.clone()).collect()
                    } else {
                        fragment.architects
                    };
                } else {
                    filters.prefectures = if fragment.prefectures.is_empty() {
                        std::iter::once(self.query.clone()).collect()
                    } else {
                        fragment.prefectures
                    };
                }
            }
        }
        filters
    }
}
