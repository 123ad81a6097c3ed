//! News feed fetcher

use super::{NewsArticle, NewsFeedView};
use crate::backend::BackendApi;
use crate::dashboard::{LoadingState, Outcome};
use crate::feedback::{FeedbackEngine, FeedbackError, SubjectKey, VoteDirection, VoteOutcome};
use crate::session::{Session, SessionMachine};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NewsError {
    #[error("News is only available to onboarded users")]
    NotAvailable,
}

/// Loads the article list and routes article votes through the feedback engine
pub struct NewsFeed {
    backend: BackendApi,
    session: Arc<SessionMachine>,
    feedback: Arc<FeedbackEngine>,
    view: RwLock<NewsFeedView>,
}

impl NewsFeed {
    pub fn new(
        backend: BackendApi,
        session: Arc<SessionMachine>,
        feedback: Arc<FeedbackEngine>,
    ) -> Self {
        Self {
            backend,
            session,
            feedback,
            view: RwLock::new(NewsFeedView::default()),
        }
    }

    pub async fn view(&self) -> NewsFeedView {
        self.view.read().await.clone()
    }

    pub async fn reset(&self) {
        *self.view.write().await = NewsFeedView::default();
    }

    /// Fetch the articles and the user's previous article votes concurrently
    pub async fn load(&self) -> Result<Outcome<NewsFeedView>, NewsError> {
        let session = self
            .session
            .dashboard_session()
            .await
            .ok_or(NewsError::NotAvailable)?;

        self.view.write().await.loading_state = LoadingState::Loading;

        let (articles, ()) = tokio::join!(
            self.fetch_articles(&session),
            self.feedback.preload_articles(&session),
        );

        if !self.session.is_current(session.generation) {
            tracing::debug!("Session ended while loading news, discarding");
            return Ok(Outcome::Discarded);
        }

        let mut view = self.view.write().await;
        *view = NewsFeedView {
            articles,
            loading_state: LoadingState::Ready,
        };
        tracing::info!(articles = view.articles.len(), "News loaded");
        Ok(Outcome::Applied(view.clone()))
    }

    async fn fetch_articles(&self, session: &Session) -> Vec<NewsArticle> {
        match self.backend.fetch_news(&session.token).await {
            Ok(articles) => articles,
            Err(e) => {
                tracing::warn!(error = %e, "News fetch failed");
                if e.is_unauthorized() {
                    self.session.on_unauthorized_for(session.generation).await;
                }
                Vec::new()
            }
        }
    }

    pub async fn vote_article(
        &self,
        article_id: &str,
        direction: VoteDirection,
    ) -> Result<VoteOutcome, FeedbackError> {
        self.feedback
            .submit_vote(SubjectKey::article(article_id), direction)
            .await
    }

    pub async fn article_vote(&self, article_id: &str) -> Option<VoteDirection> {
        self.feedback.vote(&SubjectKey::article(article_id)).await
    }
}
