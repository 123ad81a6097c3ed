//! Vote engine with per-subject submission locks.

use super::{FeedbackError, Section, SubjectKey, VoteDirection, VoteOutcome};
use crate::backend::{BackendApi, VoteSubmission};
use crate::gateway::RemoteError;
use crate::session::{LifecycleState, Session, SessionMachine};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

type PendingSet = Arc<Mutex<HashSet<SubjectKey>>>;

fn lock_pending(pending: &PendingSet) -> std::sync::MutexGuard<'_, HashSet<SubjectKey>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Holds a subject's pending flag; released on drop, whatever the outcome
struct PendingGuard {
    pending: PendingSet,
    key: SubjectKey,
}

impl PendingGuard {
    fn acquire(pending: &PendingSet, key: &SubjectKey) -> Option<Self> {
        if !lock_pending(pending).insert(key.clone()) {
            return None;
        }
        Some(Self {
            pending: Arc::clone(pending),
            key: key.clone(),
        })
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        lock_pending(&self.pending).remove(&self.key);
    }
}

/// Local vote records
///
/// Every local write or clear stamps the subject with the next value of
/// `clock`. A submission only lands if its subject's stamp is unchanged, and
/// a preload never overwrites a subject stamped after the preload started.
#[derive(Default)]
struct VoteBook {
    votes: HashMap<SubjectKey, VoteDirection>,
    revisions: HashMap<SubjectKey, u64>,
    clock: u64,
}

impl VoteBook {
    fn revision(&self, key: &SubjectKey) -> Option<u64> {
        self.revisions.get(key).copied()
    }

    fn touch(&mut self, key: &SubjectKey) {
        self.clock += 1;
        self.revisions.insert(key.clone(), self.clock);
    }
}

/// Records votes locally and on the backend
pub struct FeedbackEngine {
    backend: BackendApi,
    session: Arc<SessionMachine>,
    book: RwLock<VoteBook>,
    pending: PendingSet,
}

impl FeedbackEngine {
    pub fn new(backend: BackendApi, session: Arc<SessionMachine>) -> Self {
        Self {
            backend,
            session,
            book: RwLock::new(VoteBook::default()),
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Submit a vote for a subject
    ///
    /// A second submission for the same subject while the first is in flight
    /// returns [`VoteOutcome::AlreadyPending`] without contacting the backend.
    /// Voting requires the dashboard; during onboarding it is not available.
    pub async fn submit_vote(
        &self,
        key: SubjectKey,
        direction: VoteDirection,
    ) -> Result<VoteOutcome, FeedbackError> {
        let Some(_guard) = PendingGuard::acquire(&self.pending, &key) else {
            tracing::debug!(subject = %key, "Vote already in flight, ignoring");
            return Ok(VoteOutcome::AlreadyPending);
        };

        let session = match self.session.state().await {
            LifecycleState::Dashboard(session) => session,
            LifecycleState::Onboarding(_) => return Err(FeedbackError::NotAvailable),
            LifecycleState::Unauthenticated | LifecycleState::RegistrationPending => {
                return Err(FeedbackError::NotAuthenticated)
            }
        };

        let revision = self.book.read().await.revision(&key);
        let submission = VoteSubmission {
            user_id: session.profile.user_id.clone(),
            subject: key.clone(),
            direction,
            timestamp: Utc::now(),
        };

        match self.backend.submit_vote(&session.token, &submission).await {
            Ok(()) => {
                if !self.session.is_current(session.generation) {
                    tracing::debug!(subject = %key, "Session ended before vote completed, discarding");
                    return Ok(VoteOutcome::Discarded);
                }
                let mut book = self.book.write().await;
                if book.revision(&key) != revision {
                    tracing::debug!(subject = %key, "Subject replaced while vote was in flight, discarding");
                    return Ok(VoteOutcome::Discarded);
                }
                book.votes.insert(key.clone(), direction);
                book.touch(&key);
                tracing::info!(subject = %key, vote = %direction, "Vote recorded");
                Ok(VoteOutcome::Recorded(direction))
            }
            Err(e) if e.is_unauthorized() => {
                self.session.on_unauthorized_for(session.generation).await;
                Err(FeedbackError::Unauthorized)
            }
            Err(e) => {
                tracing::warn!(subject = %key, error = %e, "Vote submission failed");
                Err(FeedbackError::Remote(e))
            }
        }
    }

    /// Whether a submission for the subject is in flight
    pub fn is_pending(&self, key: &SubjectKey) -> bool {
        lock_pending(&self.pending).contains(key)
    }

    /// Recorded vote for a subject, if any
    pub async fn vote(&self, key: &SubjectKey) -> Option<VoteDirection> {
        self.book.read().await.votes.get(key).copied()
    }

    /// Snapshot of every recorded vote
    pub async fn votes(&self) -> HashMap<SubjectKey, VoteDirection> {
        self.book.read().await.votes.clone()
    }

    /// Forget the vote for a subject (a replaced insight is a new subject)
    ///
    /// A submission for the subject still in flight is discarded when it
    /// completes.
    pub async fn clear_vote(&self, key: &SubjectKey) {
        let mut book = self.book.write().await;
        book.touch(key);
        if book.votes.remove(key).is_some() {
            tracing::debug!(subject = %key, "Cleared vote");
        }
    }

    /// Drop every recorded vote
    pub async fn reset(&self) {
        let mut book = self.book.write().await;
        book.votes.clear();
        book.revisions.clear();
    }

    /// Load the user's section votes, replacing the local section records
    pub async fn preload_sections(&self, session: &Session) {
        let since = self.book.read().await.clock;
        let result = self
            .backend
            .fetch_section_votes(&session.token, &session.profile.user_id)
            .await;
        self.apply_preload(session, since, result, |key| {
            matches!(key, SubjectKey::Section(_))
        })
        .await;
    }

    /// Load the user's article votes, replacing the local article records
    pub async fn preload_articles(&self, session: &Session) {
        let since = self.book.read().await.clock;
        let result = self
            .backend
            .fetch_article_votes(&session.token, &session.profile.user_id)
            .await;
        self.apply_preload(session, since, result, |key| {
            matches!(key, SubjectKey::Article(_))
        })
        .await;
    }

    /// Replace a namespace with the server's records, except for subjects
    /// written locally after `since`
    async fn apply_preload(
        &self,
        session: &Session,
        since: u64,
        result: Result<HashMap<SubjectKey, VoteDirection>, RemoteError>,
        in_namespace: impl Fn(&SubjectKey) -> bool,
    ) {
        let loaded = match result {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load previous votes");
                if e.is_unauthorized() {
                    self.session.on_unauthorized_for(session.generation).await;
                }
                HashMap::new()
            }
        };

        if !self.session.is_current(session.generation) {
            tracing::debug!("Session ended before votes loaded, discarding");
            return;
        }

        let mut guard = self.book.write().await;
        let book = &mut *guard;
        let revisions = &book.revisions;
        let newer = |key: &SubjectKey| revisions.get(key).is_some_and(|rev| *rev > since);

        book.votes.retain(|key, _| !in_namespace(key) || newer(key));
        let mut kept = 0;
        for (key, vote) in loaded {
            if newer(&key) {
                kept += 1;
                continue;
            }
            book.votes.insert(key, vote);
        }
        tracing::debug!(
            total = book.votes.len(),
            kept_local = kept,
            "Loaded previous votes"
        );
    }

    /// Votes on the three dashboard sections
    pub async fn section_votes(&self) -> HashMap<Section, VoteDirection> {
        self.book
            .read()
            .await
            .votes
            .iter()
            .filter_map(|(key, vote)| match key {
                SubjectKey::Section(section) => Some((*section, *vote)),
                SubjectKey::Article(_) => None,
            })
            .collect()
    }
}
