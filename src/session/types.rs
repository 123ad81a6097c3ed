//! Session data model

use crate::backend::dto::string_or_number;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Profile of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub investor_type: Option<String>,
    #[serde(default)]
    pub crypto_interests: BTreeSet<String>,
    #[serde(default)]
    pub content_preferences: BTreeSet<String>,
    #[serde(default, deserialize_with = "bool_or_null")]
    pub onboarding_completed: bool,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            name: name.into(),
            investor_type: None,
            crypto_interests: BTreeSet::new(),
            content_preferences: BTreeSet::new(),
            onboarding_completed: false,
        }
    }

    /// Merge onboarding answers and mark onboarding as done
    pub fn complete_onboarding(&mut self, preferences: &OnboardingPreferences) {
        self.crypto_interests
            .extend(preferences.crypto_interests.iter().cloned());
        self.content_preferences
            .extend(preferences.content_preferences.iter().cloned());
        if let Some(investor_type) = &preferences.investor_type {
            self.investor_type = Some(investor_type.clone());
        }
        self.onboarding_completed = true;
    }
}

fn bool_or_null<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Login form
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration form
#[derive(Clone, PartialEq, Eq)]
pub struct RegistrationForm {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl RegistrationForm {
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Answers collected by the onboarding questionnaire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingPreferences {
    pub crypto_interests: BTreeSet<String>,
    pub investor_type: Option<String>,
    pub content_preferences: BTreeSet<String>,
}

/// An established session
///
/// `generation` identifies the session instance; results fetched under an
/// older generation are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub profile: UserProfile,
    pub generation: u64,
}

/// Top-level application state
///
/// A token and profile exist only inside `Onboarding` and `Dashboard`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Unauthenticated,
    /// Account created; the user must still log in
    RegistrationPending,
    Onboarding(Session),
    Dashboard(Session),
}

impl LifecycleState {
    /// State for a freshly established session
    pub(crate) fn for_session(session: Session) -> Self {
        if session.profile.onboarding_completed {
            LifecycleState::Dashboard(session)
        } else {
            LifecycleState::Onboarding(session)
        }
    }

    pub fn kind(&self) -> LifecycleKind {
        match self {
            LifecycleState::Unauthenticated => LifecycleKind::Unauthenticated,
            LifecycleState::RegistrationPending => LifecycleKind::RegistrationPending,
            LifecycleState::Onboarding(_) => LifecycleKind::Onboarding,
            LifecycleState::Dashboard(_) => LifecycleKind::Dashboard,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            LifecycleState::Onboarding(session) | LifecycleState::Dashboard(session) => {
                Some(session)
            }
            _ => None,
        }
    }
}

/// Lifecycle state without the session payload, as published to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LifecycleKind {
    Unauthenticated,
    RegistrationPending,
    Onboarding,
    Dashboard,
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleKind::Unauthenticated => "unauthenticated",
            LifecycleKind::RegistrationPending => "registration pending",
            LifecycleKind::Onboarding => "onboarding",
            LifecycleKind::Dashboard => "dashboard",
        };
        f.write_str(name)
    }
}
