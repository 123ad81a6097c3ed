//! Wire-level request/response bodies for the backend.

use crate::session::UserProfile;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password: &'a str,
}

/// Login response: a token plus the flattened profile fields
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(flatten)]
    pub profile: UserProfile,
}

/// Profile of a newly registered account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InsightResponse {
    #[serde(default)]
    pub insight: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SectionVoteRequest<'a> {
    pub user_id: &'a str,
    pub section: &'a str,
    pub vote: &'a str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ArticleVoteRequest<'a> {
    pub user_id: &'a str,
    pub article_id: &'a str,
    pub vote: &'a str,
    pub timestamp: String,
}

/// Vote map as returned by the vote-state endpoints: subject -> "up" | "down"
pub(crate) type RawVoteMap = HashMap<String, String>;

/// Identifiers arrive as JSON numbers from some endpoints and strings from others
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number identifier, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_login_response_flattens_profile() {
        let response: LoginResponse = serde_json::from_value(json!({
            "message": "Login successful",
            "token": "tok-1",
            "userId": 42,
            "email": "ada@example.com",
            "name": "Ada",
            "onboardingCompleted": true
        }))
        .unwrap();

        assert_eq!(response.token.as_deref(), Some("tok-1"));
        assert_eq!(response.profile.user_id, "42");
        assert_eq!(response.profile.name, "Ada");
        assert!(response.profile.onboarding_completed);
        assert!(response.profile.crypto_interests.is_empty());
    }

    #[test]
    fn test_registered_user_string_id() {
        let user: RegisteredUser = serde_json::from_value(json!({
            "userId": "u-7",
            "email": "bob@example.com",
            "name": "Bob"
        }))
        .unwrap();
        assert_eq!(user.user_id, "u-7");
    }

    #[test]
    fn test_vote_request_uses_camel_case() {
        let body = serde_json::to_value(ArticleVoteRequest {
            user_id: "1",
            article_id: "a-9",
            vote: "down",
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        })
        .unwrap();
        assert_eq!(body["articleId"], "a-9");
        assert_eq!(body["userId"], "1");
    }
}
