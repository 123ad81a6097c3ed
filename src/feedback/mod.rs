//! Feedback Subsystem
//!
//! Optimistic like/dislike votes on dashboard sections and news articles.
//!
//! - Votes are last-write-wins per subject, not counts
//! - At most one submission per subject is in flight; other subjects are
//!   never blocked
//! - An authorization rejection ends the session

mod engine;

pub use engine::FeedbackEngine;

use crate::gateway::RemoteError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Votable dashboard section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Prices,
    Ai,
    Meme,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Prices, Section::Ai, Section::Meme];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Prices => "prices",
            Section::Ai => "ai",
            Section::Meme => "meme",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = ParseVoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prices" => Ok(Section::Prices),
            "ai" => Ok(Section::Ai),
            "meme" => Ok(Section::Meme),
            other => Err(ParseVoteError::UnknownSection(other.to_string())),
        }
    }
}

/// Subject a vote applies to
///
/// Sections and articles live in separate namespaces, so an article whose id
/// happens to be "prices" never shares a record with the prices section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubjectKey {
    Section(Section),
    Article(String),
}

impl SubjectKey {
    pub fn article(id: impl Into<String>) -> Self {
        SubjectKey::Article(id.into())
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKey::Section(section) => write!(f, "section:{}", section),
            SubjectKey::Article(id) => write!(f, "article:{}", id),
        }
    }
}

impl From<Section> for SubjectKey {
    fn from(section: Section) -> Self {
        SubjectKey::Section(section)
    }
}

/// Like or dislike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteDirection {
    type Err = ParseVoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "like" => Ok(VoteDirection::Up),
            "down" | "dislike" => Ok(VoteDirection::Down),
            other => Err(ParseVoteError::UnknownDirection(other.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseVoteError {
    #[error("unknown section '{0}' (expected prices, ai or meme)")]
    UnknownSection(String),

    #[error("unknown vote '{0}' (expected up or down)")]
    UnknownDirection(String),
}

/// Result of a vote submission that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Accepted by the backend and recorded locally
    Recorded(VoteDirection),
    /// A submission for the same subject is still in flight; nothing was sent
    AlreadyPending,
    /// Accepted, but the session ended or the subject was replaced before
    /// the reply arrived
    Discarded,
}

/// Errors from vote submission
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeedbackError {
    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Voting is only available on the dashboard")]
    NotAvailable,

    #[error("Session expired, please log in again")]
    Unauthorized,

    #[error("Vote not recorded: {0}")]
    Remote(RemoteError),
}
