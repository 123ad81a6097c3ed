//! Advisor Client
//!
//! Wires the session machine, feedback engine, dashboard aggregator and news
//! feed around one backend gateway and one market-data gateway.

use crate::backend::BackendApi;
use crate::config::Config;
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::dashboard::{
    DashboardAggregator, DashboardError, DashboardSettings, DashboardViewModel, MarketData,
    Outcome,
};
use crate::feedback::{FeedbackEngine, Section, VoteDirection};
use crate::gateway::{GatewayError, HttpGateway, RemoteGateway};
use crate::news::{NewsError, NewsFeed, NewsFeedView};
use crate::session::{LifecycleKind, SessionMachine};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to create HTTP gateway: {0}")]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Dashboard(#[from] DashboardError),

    #[error(transparent)]
    News(#[from] NewsError),
}

/// Everything shown after entering the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub dashboard: DashboardViewModel,
    pub news: NewsFeedView,
    pub section_votes: HashMap<Section, VoteDirection>,
}

/// Façade over the client components
pub struct AdvisorClient {
    session: Arc<SessionMachine>,
    feedback: Arc<FeedbackEngine>,
    dashboard: Arc<DashboardAggregator>,
    news: Arc<NewsFeed>,
}

impl AdvisorClient {
    pub fn new(
        backend_gateway: Arc<dyn RemoteGateway>,
        market_gateway: Arc<dyn RemoteGateway>,
        store: Arc<dyn CredentialStore>,
        settings: DashboardSettings,
    ) -> Self {
        let backend = BackendApi::new(backend_gateway);
        let session = Arc::new(SessionMachine::new(backend.clone(), store));
        let feedback = Arc::new(FeedbackEngine::new(backend.clone(), Arc::clone(&session)));
        let dashboard = Arc::new(DashboardAggregator::new(
            backend.clone(),
            MarketData::new(market_gateway),
            Arc::clone(&session),
            Arc::clone(&feedback),
            settings,
        ));
        let news = Arc::new(NewsFeed::new(backend, Arc::clone(&session), Arc::clone(&feedback)));

        Self {
            session,
            feedback,
            dashboard,
            news,
        }
    }

    /// Build a client with HTTP gateways and a file credential store
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let backend = HttpGateway::new(config.backend_gateway())?;
        let market = HttpGateway::new(config.price_gateway())?;
        let store = FileCredentialStore::new(config.credentials.resolved_path());

        tracing::debug!(
            backend = %backend.base_url(),
            prices = %market.base_url(),
            credentials = %store.path().display(),
            "Client configured"
        );

        Ok(Self::new(
            Arc::new(backend),
            Arc::new(market),
            Arc::new(store),
            config.dashboard_settings(),
        ))
    }

    pub fn session(&self) -> &Arc<SessionMachine> {
        &self.session
    }

    pub fn feedback(&self) -> &Arc<FeedbackEngine> {
        &self.feedback
    }

    pub fn dashboard(&self) -> &Arc<DashboardAggregator> {
        &self.dashboard
    }

    pub fn news(&self) -> &Arc<NewsFeed> {
        &self.news
    }

    /// Aggregate the dashboard, preload section votes and load news concurrently
    pub async fn enter_dashboard(&self) -> Result<Outcome<DashboardSnapshot>, ClientError> {
        let session = self
            .session
            .dashboard_session()
            .await
            .ok_or(DashboardError::NotAvailable)?;

        let (dashboard, (), news) = tokio::join!(
            self.dashboard.load(),
            self.feedback.preload_sections(&session),
            self.news.load(),
        );

        let (Outcome::Applied(dashboard), Outcome::Applied(news)) = (dashboard?, news?) else {
            return Ok(Outcome::Discarded);
        };
        if !self.session.is_current(session.generation) {
            return Ok(Outcome::Discarded);
        }

        Ok(Outcome::Applied(DashboardSnapshot {
            dashboard,
            news,
            section_votes: self.feedback.section_votes().await,
        }))
    }

    /// End the session and forget everything shown for it
    pub async fn logout(&self) {
        self.session.logout().await;
        self.reset_views().await;
    }

    async fn reset_views(&self) {
        tokio::join!(self.dashboard.reset(), self.news.reset(), self.feedback.reset());
    }

    /// Reset the views whenever the session ends, including on authorization
    /// rejections raised by a fetcher
    pub fn spawn_lifecycle_watcher(self: &Arc<Self>) -> JoinHandle<()> {
        let client = Arc::clone(self);
        let mut events = self.session.subscribe();

        tokio::spawn(async move {
            while events.changed().await.is_ok() {
                let kind = *events.borrow_and_update();
                tracing::debug!(state = %kind, "Lifecycle changed");
                if kind == LifecycleKind::Unauthenticated {
                    client.reset_views().await;
                }
            }
        })
    }
}
