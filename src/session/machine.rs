//! Session State Machine
//!
//! Owns the application lifecycle: rehydration from the credential store,
//! login, registration, onboarding and logout. Components observe it instead
//! of sharing a global "current user".

use super::{
    Credentials, LifecycleKind, LifecycleState, OnboardingPreferences, RegistrationForm,
    Session, SessionError,
};
use crate::backend::{BackendApi, RegisteredUser};
use crate::credentials::CredentialStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// Owner of the top-level application state
pub struct SessionMachine {
    backend: BackendApi,
    store: Arc<dyn CredentialStore>,
    state: RwLock<LifecycleState>,
    generation: AtomicU64,
    events: watch::Sender<LifecycleKind>,
}

impl SessionMachine {
    /// Create the machine, rehydrating any session persisted by an earlier run
    pub fn new(backend: BackendApi, store: Arc<dyn CredentialStore>) -> Self {
        let generation = AtomicU64::new(0);

        let initial = match store.load() {
            Ok(Some(stored)) => {
                let session = Session {
                    token: stored.token,
                    profile: stored.profile,
                    generation: generation.fetch_add(1, Ordering::SeqCst) + 1,
                };
                tracing::info!(
                    user_id = %session.profile.user_id,
                    onboarding_completed = session.profile.onboarding_completed,
                    "Rehydrated session from credential store"
                );
                LifecycleState::for_session(session)
            }
            Ok(None) => LifecycleState::Unauthenticated,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable stored credentials");
                LifecycleState::Unauthenticated
            }
        };

        let (events, _) = watch::channel(initial.kind());

        Self {
            backend,
            store,
            state: RwLock::new(initial),
            generation,
            events,
        }
    }

    /// Snapshot of the current state
    pub async fn state(&self) -> LifecycleState {
        self.state.read().await.clone()
    }

    pub async fn kind(&self) -> LifecycleKind {
        self.state.read().await.kind()
    }

    /// Receive lifecycle changes as they happen
    pub fn subscribe(&self) -> watch::Receiver<LifecycleKind> {
        self.events.subscribe()
    }

    /// Session in `Onboarding` or `Dashboard`, if any
    pub async fn active_session(&self) -> Option<Session> {
        self.state.read().await.session().cloned()
    }

    /// Session only while the dashboard is displayed
    pub async fn dashboard_session(&self) -> Option<Session> {
        match &*self.state.read().await {
            LifecycleState::Dashboard(session) => Some(session.clone()),
            _ => None,
        }
    }

    /// Whether results fetched under `generation` may still be applied
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn set_state(&self, state: &mut LifecycleState, next: LifecycleState) {
        let kind = next.kind();
        *state = next;
        self.events.send_replace(kind);
    }

    fn invalid(action: &'static str, state: &LifecycleState) -> SessionError {
        SessionError::InvalidTransition {
            action,
            state: state.kind(),
        }
    }

    /// Authenticate and establish a session
    pub async fn login(&self, credentials: &Credentials) -> Result<LifecycleKind, SessionError> {
        {
            let state = self.state.read().await;
            if !matches!(*state, LifecycleState::Unauthenticated) {
                return Err(Self::invalid("log in", &state));
            }
        }

        let user = self.backend.authenticate(credentials).await.map_err(|e| {
            tracing::warn!(email = %credentials.email, error = %e, "Login failed");
            SessionError::from_remote(&e, "Login failed")
        })?;

        let mut state = self.state.write().await;
        if !matches!(*state, LifecycleState::Unauthenticated) {
            return Err(Self::invalid("log in", &state));
        }

        if let Err(e) = self.store.save(&user.token, &user.profile) {
            tracing::warn!(error = %e, "Failed to persist credentials; session will not survive restart");
        }

        let session = Session {
            token: user.token,
            profile: user.profile,
            generation: self.next_generation(),
        };
        tracing::info!(
            user_id = %session.profile.user_id,
            onboarding_completed = session.profile.onboarding_completed,
            "Logged in"
        );
        self.set_state(&mut state, LifecycleState::for_session(session));
        Ok(state.kind())
    }

    /// Create an account; the user still has to log in afterwards
    pub async fn register(&self, form: &RegistrationForm) -> Result<RegisteredUser, SessionError> {
        {
            let state = self.state.read().await;
            if !matches!(*state, LifecycleState::Unauthenticated) {
                return Err(Self::invalid("register", &state));
            }
        }

        let user = self.backend.register(form).await.map_err(|e| {
            tracing::warn!(email = %form.email, error = %e, "Registration failed");
            SessionError::from_remote(&e, "Registration failed")
        })?;

        let mut state = self.state.write().await;
        if !matches!(*state, LifecycleState::Unauthenticated) {
            return Err(Self::invalid("register", &state));
        }
        tracing::info!(user_id = %user.user_id, "Registered new account");
        self.set_state(&mut state, LifecycleState::RegistrationPending);
        Ok(user)
    }

    /// Leave the registration success screen
    pub async fn back_to_login(&self) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        match *state {
            LifecycleState::RegistrationPending => {
                self.set_state(&mut state, LifecycleState::Unauthenticated);
                Ok(())
            }
            LifecycleState::Unauthenticated => Ok(()),
            _ => Err(Self::invalid("return to login", &state)),
        }
    }

    /// Save onboarding answers and move on to the dashboard
    pub async fn complete_onboarding(
        &self,
        preferences: &OnboardingPreferences,
    ) -> Result<(), SessionError> {
        let session = match &*self.state.read().await {
            LifecycleState::Onboarding(session) => session.clone(),
            other => return Err(Self::invalid("complete onboarding", other)),
        };

        if let Err(e) = self
            .backend
            .save_onboarding(&session.token, &session.profile.user_id, preferences)
            .await
        {
            tracing::warn!(user_id = %session.profile.user_id, error = %e, "Saving onboarding failed");
            if e.is_unauthorized() {
                self.on_unauthorized_for(session.generation).await;
                return Err(SessionError::Unauthorized);
            }
            return Err(SessionError::from_remote(&e, "Failed to save preferences"));
        }

        let mut state = self.state.write().await;
        let mut session = match &*state {
            LifecycleState::Onboarding(current) if current.generation == session.generation => {
                current.clone()
            }
            other => return Err(Self::invalid("complete onboarding", other)),
        };

        session.profile.complete_onboarding(preferences);
        if let Err(e) = self.store.save(&session.token, &session.profile) {
            tracing::warn!(error = %e, "Failed to persist updated profile");
        }

        tracing::info!(user_id = %session.profile.user_id, "Onboarding completed");
        self.set_state(&mut state, LifecycleState::Dashboard(session));
        Ok(())
    }

    /// End the session unconditionally
    pub async fn logout(&self) {
        let mut state = self.state.write().await;
        self.clear_store();
        self.next_generation();
        tracing::info!(previous = %state.kind(), "Logged out");
        self.set_state(&mut state, LifecycleState::Unauthenticated);
    }

    /// End the session after an authorization rejection
    ///
    /// Returns whether this call performed the transition; repeated or
    /// concurrent calls after the first are no-ops.
    pub async fn on_unauthorized(&self) -> bool {
        let mut state = self.state.write().await;
        self.end_rejected_session(&mut state)
    }

    /// Like [`on_unauthorized`](Self::on_unauthorized), but ignored when the
    /// rejection belongs to a session that has already ended
    pub async fn on_unauthorized_for(&self, generation: u64) -> bool {
        let mut state = self.state.write().await;
        if !self.is_current(generation) {
            tracing::debug!(generation, "Ignoring authorization rejection from a stale session");
            return false;
        }
        self.end_rejected_session(&mut state)
    }

    fn end_rejected_session(&self, state: &mut LifecycleState) -> bool {
        if matches!(*state, LifecycleState::Unauthenticated) {
            return false;
        }
        self.clear_store();
        self.next_generation();
        tracing::warn!(previous = %state.kind(), "Authorization rejected, session ended");
        self.set_state(state, LifecycleState::Unauthenticated);
        true
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Failed to clear stored credentials");
        }
    }
}
