use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{FilterFragment, HistoryKind};

/// Paging and language options that ride along with the filter query string
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchOptions {
    #[validate(range(min = 1, max = 100))]
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub lang: Option<String>,
    #[validate(length(min = 1, max = 128))]
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
    /// The URL filter encoding leaves residential exclusion on; this turns it off
    #[serde(rename = "includeResidential", default)]
    pub include_residential: bool,
}

/// Language selector for read endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageQuery {
    #[serde(default)]
    pub lang: Option<String>,
}

fn default_page_size() -> usize {
    20
}

/// Request to record a history entry for a session
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordHistoryRequest {
    #[validate(length(min = 1, max = 200))]
    pub query: String,
    #[serde(default)]
    pub kind: Option<HistoryKind>,
    #[serde(default)]
    pub filters: Option<FilterFragment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_history_validation() {
        let ok = RecordHistoryRequest {
            query: "安藤忠雄".to_string(),
            kind: Some(HistoryKind::Architect),
            filters: None,
        };
        assert!(ok.validate().is_ok());

        let empty = RecordHistoryRequest {
            query: String::new(),
            kind: None,
            filters: None,
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_search_options_page_size_range() {
        let options = SearchOptions {
            page_size: 500,
            lang: None,
            session_id: None,
            include_residential: false,
        };
        assert!(options.validate().is_err());
    }
}
