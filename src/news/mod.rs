//! News Feed
//!
//! Curated crypto news with per-article votes. There is no fallback content:
//! an empty list is the degraded state and renders as "no data".

mod feed;
mod time_ago;

pub use feed::{NewsError, NewsFeed};
pub use time_ago::format_time_ago;

use crate::backend::dto::string_or_number;
use crate::dashboard::LoadingState;
use serde::{Deserialize, Serialize};

/// Article as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub source: String,

    /// Either an absolute timestamp or an already relative phrase
    #[serde(rename = "time", default)]
    pub published_at_display: String,
}

/// Everything the news section renders
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NewsFeedView {
    pub articles: Vec<NewsArticle>,
    pub loading_state: LoadingState,
}

impl NewsFeedView {
    /// Loaded, but nothing to show
    pub fn is_empty(&self) -> bool {
        self.loading_state == LoadingState::Ready && self.articles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_article_from_backend_payload() {
        let article: NewsArticle = serde_json::from_value(json!({
            "id": 4521,
            "title": "ETF inflows hit record",
            "url": "https://news.example/etf",
            "source": "CoinDesk",
            "time": "2 hours ago"
        }))
        .unwrap();

        assert_eq!(article.id, "4521");
        assert_eq!(article.published_at_display, "2 hours ago");
    }

    #[test]
    fn test_empty_view() {
        let mut view = NewsFeedView::default();
        assert!(!view.is_empty());
        view.loading_state = LoadingState::Ready;
        assert!(view.is_empty());
    }
}
