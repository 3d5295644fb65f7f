//! Typed GitHub webhook payloads and their decoders.
//!
//! Only the fields the relay formats are modelled; everything else in the
//! payload is ignored. Optional string fields tolerate both absence and
//! `null`, since GitHub sends either depending on the event.

use serde::{Deserialize, Deserializer};
use std::fmt;

/// Event types the relay knows how to forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Push,
    PullRequest,
}

impl EventKind {
    /// Maps an `X-GitHub-Event` header value to a supported kind.
    pub fn from_header(value: &str) -> Option<Self> {
        match value {
            "push" => Some(Self::Push),
            "pull_request" => Some(Self::PullRequest),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::PullRequest => "pull_request",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid {kind} payload: {source}")]
pub struct ParseError {
    pub kind: EventKind,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub commits: Vec<Commit>,
    pub repository: Repository,
}

impl PushEvent {
    /// Branch name for `refs/heads/<branch>` refs, `None` for tags and other refs.
    pub fn branch(&self) -> Option<&str> {
        self.reference.strip_prefix("refs/heads/")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestAction {
    Opened,
    Synchronize,
    Closed,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaseRef {
    #[serde(rename = "ref")]
    pub reference: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadRef {
    #[serde(rename = "ref", default, deserialize_with = "null_as_default")]
    pub reference: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(rename = "html_url", default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: String,
    /// Only meaningful once the action is `closed`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub merged: bool,
    pub base: BaseRef,
    #[serde(default, deserialize_with = "null_as_default")]
    pub head: HeadRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: PullRequestAction,
    pub pull_request: PullRequest,
    pub repository: Repository,
}

impl PullRequestEvent {
    pub fn base_ref(&self) -> &str {
        &self.pull_request.base.reference
    }

    pub fn head_ref(&self) -> &str {
        &self.pull_request.head.reference
    }
}

pub fn parse_push(payload: &[u8]) -> Result<PushEvent, ParseError> {
    serde_json::from_slice(payload).map_err(|source| ParseError {
        kind: EventKind::Push,
        source,
    })
}

pub fn parse_pull_request(payload: &[u8]) -> Result<PullRequestEvent, ParseError> {
    serde_json::from_slice(payload).map_err(|source| ParseError {
        kind: EventKind::PullRequest,
        source,
    })
}

fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Option::unwrap_or_default)
}
