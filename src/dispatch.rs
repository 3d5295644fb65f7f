//! Turns one inbound webhook into at most one chat notification.

use std::{fmt, sync::Arc};
use tracing::{info, warn};

use crate::{
    config::{Config, ConfigStore},
    event::{self, EventKind, ParseError},
    format,
    notify::{Notify, TransportError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnsupportedEventType,
    BranchFiltered,
    UnsupportedAction,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnsupportedEventType => "unsupported event type",
            Self::BranchFiltered => "branch filtered",
            Self::UnsupportedAction => "unsupported action",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Terminal result of handling one event.
#[derive(Debug)]
pub enum Outcome {
    Success,
    Ignored(IgnoreReason),
    Error(DispatchError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

pub struct Dispatcher<N> {
    config: Arc<ConfigStore>,
    notifier: N,
}

impl<N: Notify> Dispatcher<N> {
    pub fn new(config: Arc<ConfigStore>, notifier: N) -> Self {
        Self { config, notifier }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// `event_type` is the `X-GitHub-Event` header value.
    pub async fn handle(&self, event_type: &str, payload: &[u8]) -> Outcome {
        let outcome = match EventKind::from_header(event_type) {
            Some(EventKind::Push) => self.handle_push(payload).await,
            Some(EventKind::PullRequest) => self.handle_pull_request(payload).await,
            None => {
                if event_type == "ping" {
                    info!("Received ping event - webhook is configured correctly!");
                } else {
                    info!("Unhandled event type: {}", event_type);
                }
                Outcome::Ignored(IgnoreReason::UnsupportedEventType)
            }
        };

        match &outcome {
            Outcome::Success => {}
            Outcome::Ignored(reason) => info!("Ignored {} event: {}", event_type, reason),
            Outcome::Error(err) => warn!("Failed to relay {} event: {}", event_type, err),
        }
        outcome
    }

    async fn handle_push(&self, payload: &[u8]) -> Outcome {
        let event = match event::parse_push(payload) {
            Ok(event) => event,
            Err(err) => return Outcome::Error(err.into()),
        };
        let snapshot = self.config.current();
        let config = &snapshot.config;

        if !event.branch().is_some_and(|branch| config.watches_branch(branch)) {
            return Outcome::Ignored(IgnoreReason::BranchFiltered);
        }
        info!(
            "Processing push event for repository {} ({} commits on {})",
            event.repository.name,
            event.commits.len(),
            event.reference
        );

        let message = format::format_push(&event);
        self.send(config, &event.repository.name, &message).await
    }

    async fn handle_pull_request(&self, payload: &[u8]) -> Outcome {
        let event = match event::parse_pull_request(payload) {
            Ok(event) => event,
            Err(err) => return Outcome::Error(err.into()),
        };
        let snapshot = self.config.current();
        let config = &snapshot.config;

        if !config.watches_branch(event.base_ref()) {
            return Outcome::Ignored(IgnoreReason::BranchFiltered);
        }
        let Some(message) = format::format_pull_request(&event) else {
            return Outcome::Ignored(IgnoreReason::UnsupportedAction);
        };
        info!(
            "Processing pull request {:?} in {} ({:?})",
            event.pull_request.title, event.repository.name, event.action
        );

        self.send(config, &event.repository.name, &message).await
    }

    async fn send(&self, config: &Config, repository: &str, message: &str) -> Outcome {
        let destination = config.destinations.resolve(repository);
        match self.notifier.notify(destination, message).await {
            Ok(()) => {
                info!(
                    "Relayed event for {} to group {}",
                    repository,
                    config.destinations.group_of(repository).unwrap_or("default")
                );
                Outcome::Success
            }
            Err(err) => Outcome::Error(err.into()),
        }
    }
}
