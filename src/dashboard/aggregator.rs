//! Dashboard aggregator
//!
//! Fans out to the price, insight and meme fetchers concurrently and applies
//! their combined result to the view model in one step.

use super::fallback::{self, PLACEHOLDER_IMAGE_URL};
use super::prices::{provider_ids, MarketData};
use super::{DashboardViewModel, LoadingState, Meme, Outcome, PriceQuote};
use crate::backend::BackendApi;
use crate::feedback::{FeedbackEngine, Section, SubjectKey};
use crate::session::{Session, SessionMachine};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Tunables for dashboard aggregation
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    /// Provider ids quoted when the user selected no interests
    pub default_basket: Vec<String>,
    /// Shown in place of a meme image that failed to load
    pub placeholder_image_url: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            default_basket: fallback::DEFAULT_PRICE_BASKET
                .iter()
                .map(|id| id.to_string())
                .collect(),
            placeholder_image_url: PLACEHOLDER_IMAGE_URL.to_string(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DashboardError {
    #[error("The dashboard is only available to onboarded users")]
    NotAvailable,
}

/// Builds and holds the dashboard view
pub struct DashboardAggregator {
    backend: BackendApi,
    market: MarketData,
    session: Arc<SessionMachine>,
    feedback: Arc<FeedbackEngine>,
    settings: DashboardSettings,
    view: RwLock<DashboardViewModel>,
}

impl DashboardAggregator {
    pub fn new(
        backend: BackendApi,
        market: MarketData,
        session: Arc<SessionMachine>,
        feedback: Arc<FeedbackEngine>,
        settings: DashboardSettings,
    ) -> Self {
        Self {
            backend,
            market,
            session,
            feedback,
            settings,
            view: RwLock::new(DashboardViewModel::default()),
        }
    }

    /// Snapshot of the current view
    pub async fn view(&self) -> DashboardViewModel {
        self.view.read().await.clone()
    }

    /// Forget everything shown for the previous session
    pub async fn reset(&self) {
        *self.view.write().await = DashboardViewModel::default();
    }

    /// Run a full aggregation cycle
    ///
    /// Never fails because of a source: each fetcher substitutes fallback
    /// content. The result is discarded when the session ends mid-cycle.
    pub async fn load(&self) -> Result<Outcome<DashboardViewModel>, DashboardError> {
        let session = self
            .session
            .dashboard_session()
            .await
            .ok_or(DashboardError::NotAvailable)?;

        self.view.write().await.loading_state = LoadingState::Loading;
        tracing::debug!(user_id = %session.profile.user_id, "Loading dashboard");

        let (prices, ai_insight, meme) = tokio::join!(
            self.fetch_prices(&session),
            self.fetch_insight(&session),
            self.fetch_meme(&session),
        );

        if !self.session.is_current(session.generation) {
            tracing::debug!("Session ended while loading dashboard, discarding");
            return Ok(Outcome::Discarded);
        }

        let mut view = self.view.write().await;
        *view = DashboardViewModel {
            prices,
            ai_insight,
            meme: Some(meme),
            loading_state: LoadingState::Ready,
            ai_insight_refreshing: false,
            last_updated: Some(Utc::now()),
        };
        tracing::info!(
            user_id = %session.profile.user_id,
            quotes = view.prices.len(),
            "Dashboard loaded"
        );
        Ok(Outcome::Applied(view.clone()))
    }

    /// Fetch a new AI insight without touching prices or meme
    ///
    /// Clears the user's vote on the AI section once the new insight is shown.
    pub async fn refresh_insight(&self) -> Result<Outcome<String>, DashboardError> {
        let session = self
            .session
            .dashboard_session()
            .await
            .ok_or(DashboardError::NotAvailable)?;

        self.view.write().await.ai_insight_refreshing = true;
        let insight = self.fetch_insight(&session).await;

        if !self.session.is_current(session.generation) {
            self.view.write().await.ai_insight_refreshing = false;
            return Ok(Outcome::Discarded);
        }

        {
            let mut view = self.view.write().await;
            view.ai_insight = insight.clone();
            view.ai_insight_refreshing = false;
        }
        self.feedback
            .clear_vote(&SubjectKey::Section(Section::Ai))
            .await;

        Ok(Outcome::Applied(insight))
    }

    /// Replace the current meme image after it failed to render
    ///
    /// Returns whether the view changed.
    pub async fn on_meme_image_error(&self) -> bool {
        let placeholder = &self.settings.placeholder_image_url;
        let mut view = self.view.write().await;
        match view.meme.as_mut() {
            Some(meme) if &meme.url != placeholder => {
                tracing::debug!(url = %meme.url, "Meme image failed to load, using placeholder");
                meme.url = placeholder.clone();
                true
            }
            _ => false,
        }
    }

    async fn fetch_prices(&self, session: &Session) -> Vec<PriceQuote> {
        let ids = provider_ids(
            &session.profile.crypto_interests,
            &self.settings.default_basket,
        );

        match self.market.fetch_quotes(&ids).await {
            Ok(quotes) if !quotes.is_empty() => quotes,
            Ok(_) => {
                tracing::warn!(ids = ?ids, "Price provider knew none of the requested coins, using fallback");
                fallback::fallback_prices()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Price fetch failed, using fallback");
                fallback::fallback_prices()
            }
        }
    }

    async fn fetch_insight(&self, session: &Session) -> String {
        let result = self
            .backend
            .fetch_ai_insight(&session.token, &session.profile.user_id)
            .await;

        match result {
            Ok(insight) => insight,
            Err(e) => {
                tracing::warn!(error = %e, "AI insight fetch failed, using fallback");
                if e.is_unauthorized() {
                    self.session.on_unauthorized_for(session.generation).await;
                }
                fallback::fallback_insight(
                    session.profile.investor_type.as_deref(),
                    &mut rand::thread_rng(),
                )
            }
        }
    }

    async fn fetch_meme(&self, session: &Session) -> Meme {
        match self.backend.fetch_meme(&session.token).await {
            Ok(meme) => meme,
            Err(e) => {
                tracing::warn!(error = %e, "Meme fetch failed, using fallback");
                if e.is_unauthorized() {
                    self.session.on_unauthorized_for(session.generation).await;
                }
                fallback::fallback_meme(&mut rand::thread_rng())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use crate::feedback::{VoteDirection, VoteOutcome};
    use crate::gateway::scripted::ScriptedGateway;
    use crate::gateway::Method;
    use crate::session::{LifecycleKind, UserProfile};
    use serde_json::json;

    const INSIGHT: &str = "/api/auth/ai-insight/1";
    const MEME: &str = "/api/auth/crypto-meme";
    const DEFAULT_PRICES: &str =
        "/simple/price?ids=bitcoin,ethereum,cardano,solana&vs_currencies=usd&include_24hr_change=true";

    struct Fixture {
        aggregator: DashboardAggregator,
        session: Arc<SessionMachine>,
        feedback: Arc<FeedbackEngine>,
        backend: Arc<ScriptedGateway>,
        market: Arc<ScriptedGateway>,
    }

    fn fixture(profile: UserProfile) -> Fixture {
        let backend_gw = ScriptedGateway::new();
        let market_gw = ScriptedGateway::new();
        let backend = BackendApi::new(backend_gw.clone());
        let store = Arc::new(MemoryCredentialStore::with_credentials("tok", profile));
        let session = Arc::new(SessionMachine::new(backend.clone(), store));
        let feedback = Arc::new(FeedbackEngine::new(backend.clone(), session.clone()));
        let aggregator = DashboardAggregator::new(
            backend,
            MarketData::new(market_gw.clone()),
            session.clone(),
            feedback.clone(),
            DashboardSettings::default(),
        );
        Fixture {
            aggregator,
            session,
            feedback,
            backend: backend_gw,
            market: market_gw,
        }
    }

    fn onboarded(investor_type: Option<&str>) -> UserProfile {
        let mut profile = UserProfile::new("1", "ada@example.com", "Ada");
        profile.onboarding_completed = true;
        profile.investor_type = investor_type.map(str::to_string);
        profile
    }

    #[tokio::test]
    async fn test_load_from_all_sources() {
        let mut profile = onboarded(Some("HODLer"));
        profile.crypto_interests = ["Bitcoin".to_string()].into_iter().collect();
        let f = fixture(profile);
        f.market.ok(
            Method::Get,
            "/simple/price?ids=bitcoin&vs_currencies=usd&include_24hr_change=true",
            json!({ "bitcoin": { "usd": 61000.5, "usd_24h_change": 1.0 } }),
        );
        f.backend.ok(Method::Get, INSIGHT, json!({ "insight": "Buy the dip" }));
        f.backend.ok(
            Method::Get,
            MEME,
            json!({ "url": "https://i.redd.it/m.jpg", "title": "Moon", "score": 7 }),
        );

        let view = f.aggregator.load().await.unwrap().applied().unwrap();

        assert_eq!(view.loading_state, LoadingState::Ready);
        assert_eq!(view.prices, vec![PriceQuote::new("Bitcoin", "$61,000.5", 1.0)]);
        assert_eq!(view.ai_insight, "Buy the dip");
        assert_eq!(view.meme.unwrap().title, "Moon");
        assert!(view.last_updated.is_some());
        assert_eq!(f.aggregator.view().await.ai_insight, "Buy the dip");
    }

    #[tokio::test]
    async fn test_all_sources_failing_uses_fallbacks() {
        let f = fixture(onboarded(Some("Day Trader")));
        f.market.unreachable(Method::Get, DEFAULT_PRICES);
        f.backend.status(Method::Get, INSIGHT, 500, json!({ "error": "down" }));
        f.backend.ok(Method::Get, MEME, json!("<html>not json</html>"));

        let view = f.aggregator.load().await.unwrap().applied().unwrap();

        assert!(view.is_ready());
        assert_eq!(view.prices, fallback::fallback_prices());
        assert!(fallback::InsightArchetype::DayTrader
            .messages()
            .contains(&view.ai_insight.as_str()));
        assert_eq!(view.meme.unwrap().source, "Static");
        assert_eq!(f.session.kind().await, LifecycleKind::Dashboard);
    }

    #[tokio::test]
    async fn test_empty_insight_uses_fallback() {
        let f = fixture(onboarded(None));
        f.market.ok(Method::Get, DEFAULT_PRICES, json!({}));
        f.backend.ok(Method::Get, INSIGHT, json!({ "insight": "" }));
        f.backend.unreachable(Method::Get, MEME);

        let view = f.aggregator.load().await.unwrap().applied().unwrap();

        assert!(fallback::InsightArchetype::Hodler
            .messages()
            .contains(&view.ai_insight.as_str()));
        // Provider answered but knew none of the coins
        assert_eq!(view.prices, fallback::fallback_prices());
    }

    #[tokio::test]
    async fn test_unauthorized_fetch_ends_session_and_discards() {
        let f = fixture(onboarded(None));
        f.market.unreachable(Method::Get, DEFAULT_PRICES);
        f.backend.status(Method::Get, INSIGHT, 401, json!({ "error": "expired" }));
        f.backend.status(Method::Get, MEME, 401, json!({ "error": "expired" }));

        let outcome = f.aggregator.load().await.unwrap();

        assert!(outcome.is_discarded());
        assert_eq!(f.session.kind().await, LifecycleKind::Unauthenticated);
        assert!(!f.aggregator.view().await.is_ready());
    }

    #[tokio::test]
    async fn test_price_provider_rejection_keeps_session() {
        let f = fixture(onboarded(None));
        f.market.status(Method::Get, DEFAULT_PRICES, 401, serde_json::Value::Null);
        f.backend.ok(Method::Get, INSIGHT, json!({ "insight": "Steady" }));
        f.backend.unreachable(Method::Get, MEME);

        let view = f.aggregator.load().await.unwrap().applied().unwrap();

        assert_eq!(view.prices, fallback::fallback_prices());
        assert_eq!(f.session.kind().await, LifecycleKind::Dashboard);
    }

    #[tokio::test]
    async fn test_load_requires_dashboard() {
        let mut profile = onboarded(None);
        profile.onboarding_completed = false;
        let f = fixture(profile);

        assert_eq!(f.aggregator.load().await.unwrap_err(), DashboardError::NotAvailable);
        assert!(f.backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_insight_clears_ai_vote() {
        let f = fixture(onboarded(None));
        f.market.unreachable(Method::Get, DEFAULT_PRICES);
        f.backend.ok(Method::Get, INSIGHT, json!({ "insight": "First" }));
        f.backend.ok(Method::Get, INSIGHT, json!({ "insight": "Second" }));
        f.backend.unreachable(Method::Get, MEME);
        f.backend.ok(Method::Post, "/api/auth/feedback", json!({}));

        f.aggregator.load().await.unwrap();
        let before = f.aggregator.view().await;
        assert_eq!(before.ai_insight, "First");

        let ai = SubjectKey::Section(Section::Ai);
        let prices = SubjectKey::Section(Section::Prices);
        f.feedback.submit_vote(ai.clone(), VoteDirection::Up).await.unwrap();
        assert_eq!(
            f.feedback.submit_vote(prices.clone(), VoteDirection::Down).await.unwrap(),
            VoteOutcome::Recorded(VoteDirection::Down)
        );

        let refreshed = f.aggregator.refresh_insight().await.unwrap();
        assert_eq!(refreshed, Outcome::Applied("Second".to_string()));

        let after = f.aggregator.view().await;
        assert_eq!(after.ai_insight, "Second");
        assert!(!after.ai_insight_refreshing);
        assert_eq!(after.prices, before.prices);
        assert_eq!(after.meme, before.meme);
        assert!(f.feedback.vote(&ai).await.is_none());
        assert_eq!(f.feedback.vote(&prices).await, Some(VoteDirection::Down));
    }

    #[tokio::test]
    async fn test_ai_vote_in_flight_does_not_attach_to_new_insight() {
        let f = fixture(onboarded(None));
        f.backend.ok(Method::Get, INSIGHT, json!({ "insight": "New" }));
        f.backend.ok(Method::Post, "/api/auth/feedback", json!({}));
        let gate = f.backend.gate(Method::Post, "/api/auth/feedback");
        let ai = SubjectKey::Section(Section::Ai);

        let vote = tokio::spawn({
            let feedback = f.feedback.clone();
            let ai = ai.clone();
            async move { feedback.submit_vote(ai, VoteDirection::Up).await }
        });
        while f.backend.requests_to(Method::Post, "/api/auth/feedback").is_empty() {
            tokio::task::yield_now().await;
        }

        let refreshed = f.aggregator.refresh_insight().await.unwrap();
        assert_eq!(refreshed, Outcome::Applied("New".to_string()));

        gate.add_permits(1);
        assert_eq!(vote.await.unwrap().unwrap(), VoteOutcome::Discarded);
        assert!(f.feedback.vote(&ai).await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_insight_in_flight_flag() {
        let f = fixture(onboarded(None));
        f.backend.ok(Method::Get, INSIGHT, json!({ "insight": "Later" }));
        let gate = f.backend.gate(Method::Get, INSIGHT);
        let aggregator = Arc::new(f.aggregator);

        let refresh = tokio::spawn({
            let aggregator = aggregator.clone();
            async move { aggregator.refresh_insight().await }
        });
        while f.backend.requests_to(Method::Get, INSIGHT).is_empty() {
            tokio::task::yield_now().await;
        }
        assert!(aggregator.view().await.ai_insight_refreshing);

        gate.add_permits(1);
        refresh.await.unwrap().unwrap();
        assert!(!aggregator.view().await.ai_insight_refreshing);
    }

    #[tokio::test]
    async fn test_meme_image_error_substitutes_placeholder() {
        let f = fixture(onboarded(None));
        assert!(!f.aggregator.on_meme_image_error().await);

        f.market.unreachable(Method::Get, DEFAULT_PRICES);
        f.backend.unreachable(Method::Get, INSIGHT);
        f.backend.ok(Method::Get, MEME, json!({ "url": "https://broken/img.png" }));
        f.aggregator.load().await.unwrap();

        assert!(f.aggregator.on_meme_image_error().await);
        assert_eq!(
            f.aggregator.view().await.meme.unwrap().url,
            PLACEHOLDER_IMAGE_URL
        );
        assert!(!f.aggregator.on_meme_image_error().await);
    }
}
