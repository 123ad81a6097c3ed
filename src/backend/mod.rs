//! Backend API
//!
//! Typed calls to the Crypto Advisor backend on top of a [`RemoteGateway`].
//! Every call returns a [`RemoteError`] on failure so callers can tell an
//! authorization rejection from an ordinary domain or transport failure.

pub(crate) mod dto;

pub use dto::RegisteredUser;

use crate::dashboard::Meme;
use crate::feedback::{SubjectKey, VoteDirection};
use crate::gateway::{GatewayRequest, RemoteError, RemoteGateway};
use crate::news::NewsArticle;
use crate::session::{Credentials, OnboardingPreferences, RegistrationForm, UserProfile};
use chrono::{DateTime, SecondsFormat, Utc};
use dto::{
    ArticleVoteRequest, InsightResponse, LoginRequest, LoginResponse, RawVoteMap,
    RegisterRequest, SectionVoteRequest,
};
use std::collections::HashMap;
use std::sync::Arc;

const API_PREFIX: &str = "/api/auth";

/// Token and profile returned by a successful login
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub token: String,
    pub profile: UserProfile,
}

/// A vote ready to be sent to the backend
#[derive(Debug, Clone, PartialEq)]
pub struct VoteSubmission {
    pub user_id: String,
    pub subject: SubjectKey,
    pub direction: VoteDirection,
    pub timestamp: DateTime<Utc>,
}

/// Typed client for the backend endpoints
#[derive(Clone)]
pub struct BackendApi {
    gateway: Arc<dyn RemoteGateway>,
}

impl BackendApi {
    pub fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
        Self { gateway }
    }

    fn path(suffix: &str) -> String {
        format!("{}{}", API_PREFIX, suffix)
    }

    /// Exchange credentials for a session token and profile
    pub async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthenticatedUser, RemoteError> {
        let body = serde_json::to_value(LoginRequest {
            email: &credentials.email,
            password: &credentials.password,
        })
        .map_err(|e| RemoteError::Malformed(e.to_string()))?;

        let response = self
            .gateway
            .request(GatewayRequest::post(Self::path("/login"), body))
            .await?;
        let status = response.status;
        let login: LoginResponse = response.decode()?;

        // Accepted credentials without a token still leave the user logged out
        match login.token {
            Some(token) if !token.trim().is_empty() => Ok(AuthenticatedUser {
                token,
                profile: login.profile,
            }),
            _ => Err(RemoteError::Domain {
                status,
                message: None,
            }),
        }
    }

    /// Create an account; does not establish a session
    pub async fn register(&self, form: &RegistrationForm) -> Result<RegisteredUser, RemoteError> {
        let body = serde_json::to_value(RegisterRequest {
            email: &form.email,
            name: &form.name,
            password: &form.password,
        })
        .map_err(|e| RemoteError::Malformed(e.to_string()))?;

        self.gateway
            .request(GatewayRequest::post(Self::path("/register"), body))
            .await?
            .decode()
    }

    /// Persist onboarding answers for a user
    pub async fn save_onboarding(
        &self,
        token: &str,
        user_id: &str,
        preferences: &OnboardingPreferences,
    ) -> Result<(), RemoteError> {
        let body = serde_json::to_value(preferences)
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;
        let path = Self::path(&format!("/onboarding/{}", urlencoding::encode(user_id)));

        self.gateway
            .request(GatewayRequest::put(path, body).auth(Some(token)))
            .await?
            .ensure_success()
    }

    /// Personalized insight text for a user
    pub async fn fetch_ai_insight(&self, token: &str, user_id: &str) -> Result<String, RemoteError> {
        let path = Self::path(&format!("/ai-insight/{}", urlencoding::encode(user_id)));
        let response: InsightResponse = self
            .gateway
            .request(GatewayRequest::get(path).auth(Some(token)))
            .await?
            .decode()?;

        response
            .insight
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| RemoteError::Malformed("insight response was empty".to_string()))
    }

    pub async fn fetch_meme(&self, token: &str) -> Result<Meme, RemoteError> {
        self.gateway
            .request(GatewayRequest::get(Self::path("/crypto-meme")).auth(Some(token)))
            .await?
            .decode()
    }

    pub async fn fetch_news(&self, token: &str) -> Result<Vec<NewsArticle>, RemoteError> {
        self.gateway
            .request(GatewayRequest::get(Self::path("/crypto-news")).auth(Some(token)))
            .await?
            .decode()
    }

    /// Send a section or article vote to its endpoint
    pub async fn submit_vote(&self, token: &str, vote: &VoteSubmission) -> Result<(), RemoteError> {
        let timestamp = vote.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        let request = match &vote.subject {
            SubjectKey::Section(section) => GatewayRequest::post(
                Self::path("/feedback"),
                serde_json::to_value(SectionVoteRequest {
                    user_id: &vote.user_id,
                    section: section.as_str(),
                    vote: vote.direction.as_str(),
                    timestamp,
                })
                .map_err(|e| RemoteError::Malformed(e.to_string()))?,
            ),
            SubjectKey::Article(article_id) => GatewayRequest::post(
                Self::path("/article-feedback"),
                serde_json::to_value(ArticleVoteRequest {
                    user_id: &vote.user_id,
                    article_id,
                    vote: vote.direction.as_str(),
                    timestamp,
                })
                .map_err(|e| RemoteError::Malformed(e.to_string()))?,
            ),
        };

        self.gateway
            .request(request.auth(Some(token)))
            .await?
            .ensure_success()
    }

    /// Previously cast section votes, keyed by section
    pub async fn fetch_section_votes(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<HashMap<SubjectKey, VoteDirection>, RemoteError> {
        let path = Self::path(&format!("/feedback/{}", urlencoding::encode(user_id)));
        let raw: RawVoteMap = self
            .gateway
            .request(GatewayRequest::get(path).auth(Some(token)))
            .await?
            .decode()?;

        Ok(raw
            .into_iter()
            .filter_map(|(section, vote)| {
                let key = SubjectKey::Section(section.parse().ok()?);
                Some((key, vote.parse().ok()?))
            })
            .collect())
    }

    /// Previously cast article votes, keyed by article id
    pub async fn fetch_article_votes(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<HashMap<SubjectKey, VoteDirection>, RemoteError> {
        let path = Self::path(&format!("/article-feedback/{}", urlencoding::encode(user_id)));
        let raw: RawVoteMap = self
            .gateway
            .request(GatewayRequest::get(path).auth(Some(token)))
            .await?
            .decode()?;

        Ok(raw
            .into_iter()
            .filter_map(|(article_id, vote)| {
                Some((SubjectKey::Article(article_id), vote.parse().ok()?))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::Section;
    use crate::gateway::scripted::ScriptedGateway;
    use crate::gateway::Method;
    use chrono::TimeZone;
    use serde_json::json;

    fn api(gateway: &Arc<ScriptedGateway>) -> BackendApi {
        BackendApi::new(gateway.clone())
    }

    #[tokio::test]
    async fn test_authenticate() {
        let gateway = ScriptedGateway::new();
        gateway.ok(
            Method::Post,
            "/api/auth/login",
            json!({
                "token": "tok-1",
                "userId": 1,
                "email": "ada@example.com",
                "name": "Ada",
                "onboardingCompleted": false
            }),
        );

        let user = api(&gateway)
            .authenticate(&Credentials::new("ada@example.com", "secret"))
            .await
            .unwrap();

        assert_eq!(user.token, "tok-1");
        assert_eq!(user.profile.user_id, "1");
        assert!(!user.profile.onboarding_completed);

        let sent = gateway.requests_to(Method::Post, "/api/auth/login");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body.as_ref().unwrap()["email"], "ada@example.com");
        assert!(sent[0].auth_token.is_none());
    }

    #[tokio::test]
    async fn test_authenticate_without_token_is_rejected() {
        let gateway = ScriptedGateway::new();
        gateway.ok(
            Method::Post,
            "/api/auth/login",
            json!({ "userId": 1, "email": "a@b.c", "name": "A" }),
        );

        let err = api(&gateway)
            .authenticate(&Credentials::new("a@b.c", "pw"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RemoteError::Domain {
                status: 200,
                message: None
            }
        );
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_empty_insight_is_malformed() {
        let gateway = ScriptedGateway::new();
        gateway.ok(Method::Get, "/api/auth/ai-insight/1", json!({ "insight": "  " }));

        let err = api(&gateway).fetch_ai_insight("tok", "1").await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_submit_vote_routes_by_subject() {
        let gateway = ScriptedGateway::new();
        gateway.ok(Method::Post, "/api/auth/feedback", json!({ "message": "ok" }));
        gateway.ok(Method::Post, "/api/auth/article-feedback", json!({ "message": "ok" }));
        let backend = api(&gateway);
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        backend
            .submit_vote(
                "tok",
                &VoteSubmission {
                    user_id: "1".to_string(),
                    subject: SubjectKey::Section(Section::Meme),
                    direction: VoteDirection::Up,
                    timestamp,
                },
            )
            .await
            .unwrap();
        backend
            .submit_vote(
                "tok",
                &VoteSubmission {
                    user_id: "1".to_string(),
                    subject: SubjectKey::Article("a-1".to_string()),
                    direction: VoteDirection::Down,
                    timestamp,
                },
            )
            .await
            .unwrap();

        let section = gateway.requests_to(Method::Post, "/api/auth/feedback");
        let body = section[0].body.as_ref().unwrap();
        assert_eq!(body["section"], "meme");
        assert_eq!(body["vote"], "up");
        assert_eq!(body["timestamp"], "2024-05-01T12:00:00.000Z");
        assert_eq!(section[0].auth_token.as_deref(), Some("tok"));

        let article = gateway.requests_to(Method::Post, "/api/auth/article-feedback");
        let body = article[0].body.as_ref().unwrap();
        assert_eq!(body["articleId"], "a-1");
        assert_eq!(body["vote"], "down");
    }

    #[tokio::test]
    async fn test_fetch_votes_skips_unknown_entries() {
        let gateway = ScriptedGateway::new();
        gateway.ok(
            Method::Get,
            "/api/auth/feedback/1",
            json!({ "prices": "up", "ai": "down", "weather": "up", "meme": "sideways" }),
        );
        gateway.ok(
            Method::Get,
            "/api/auth/article-feedback/1",
            json!({ "a-1": "down", "a-2": "up" }),
        );
        let backend = api(&gateway);

        let sections = backend.fetch_section_votes("tok", "1").await.unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(
            sections.get(&SubjectKey::Section(Section::Prices)),
            Some(&VoteDirection::Up)
        );
        assert_eq!(
            sections.get(&SubjectKey::Section(Section::Ai)),
            Some(&VoteDirection::Down)
        );

        let articles = backend.fetch_article_votes("tok", "1").await.unwrap();
        assert_eq!(
            articles.get(&SubjectKey::Article("a-1".to_string())),
            Some(&VoteDirection::Down)
        );
    }

    #[tokio::test]
    async fn test_register_domain_error() {
        let gateway = ScriptedGateway::new();
        gateway.status(
            Method::Post,
            "/api/auth/register",
            400,
            json!({ "error": "Email already registered" }),
        );

        let err = api(&gateway)
            .register(&RegistrationForm::new("a@b.c", "A", "pw"))
            .await
            .unwrap_err();
        assert_eq!(err.server_message(), Some("Email already registered"));
    }
}
