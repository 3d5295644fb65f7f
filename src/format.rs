use crate::event::{PullRequestAction, PullRequestEvent, PushEvent};

const SHORT_ID_LEN: usize = 7;

/// First seven characters of a commit id, or the whole id if it is shorter.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

pub fn format_push(event: &PushEvent) -> String {
    let branch = event.branch().unwrap_or(&event.reference);
    let mut message = format!(
        "[{}] push to {} ({})",
        event.repository.name, branch, event.repository.url
    );
    for commit in &event.commits {
        message.push_str(&format!(
            "\n- {}: {} ({})",
            short_id(&commit.id),
            commit.message,
            commit.url
        ));
    }
    message
}

/// Returns `None` for actions the relay does not announce.
pub fn format_pull_request(event: &PullRequestEvent) -> Option<String> {
    let pr = &event.pull_request;
    let headline = match pr.number {
        Some(number) => format!("#{} {}", number, pr.title),
        None => pr.title.clone(),
    };
    let branches = format!("{} -> {}", event.head_ref(), event.base_ref());

    let message = match event.action {
        PullRequestAction::Opened => format!(
            "[{}] new PR: {}\n{}\n{}",
            event.repository.name, headline, branches, pr.url
        ),
        PullRequestAction::Synchronize if pr.head.sha.is_empty() => format!(
            "[{}] PR updated: {}\n{}\n{}",
            event.repository.name, headline, branches, pr.url
        ),
        PullRequestAction::Synchronize => format!(
            "[{}] PR updated: {}\n{} @ {}\n{}",
            event.repository.name,
            headline,
            branches,
            short_id(&pr.head.sha),
            pr.url
        ),
        PullRequestAction::Closed if pr.merged => format!(
            "[{}] PR merged: {}\n{}\n{}",
            event.repository.name, headline, branches, pr.url
        ),
        PullRequestAction::Closed => format!(
            "[{}] PR closed: {}\n{}\n{}",
            event.repository.name, headline, branches, pr.url
        ),
        PullRequestAction::Other => return None,
    };
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{BaseRef, Commit, HeadRef, PullRequest, Repository};

    fn push(reference: &str, commits: Vec<Commit>) -> PushEvent {
        PushEvent {
            reference: reference.to_string(),
            commits,
            repository: Repository {
                name: "api".to_string(),
                url: "https://github.com/acme/api".to_string(),
            },
        }
    }

    fn commit(id: &str, message: &str) -> Commit {
        Commit {
            id: id.to_string(),
            message: message.to_string(),
            url: format!("https://github.com/acme/api/commit/{id}"),
        }
    }

    fn pull_request(action: PullRequestAction, merged: bool) -> PullRequestEvent {
        PullRequestEvent {
            action,
            pull_request: PullRequest {
                number: Some(7),
                title: "Add relay".to_string(),
                url: "https://github.com/acme/api/pull/7".to_string(),
                state: "open".to_string(),
                merged,
                base: BaseRef {
                    reference: "main".to_string(),
                },
                head: HeadRef {
                    reference: "feature/relay".to_string(),
                    sha: "0123456789abcdef".to_string(),
                },
            },
            repository: Repository {
                name: "api".to_string(),
                url: String::new(),
            },
        }
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("1234567890abcdef"), "1234567");
        assert_eq!(short_id("1234567"), "1234567");
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id(""), "");
        assert_eq!(short_id("ääääääää"), "äääääää");
    }

    #[test]
    fn test_short_id_is_prefix() {
        for id in ["", "a", "abcdef", "abcdefg", "abcdefgh", "0123456789abcdef0123456789abcdef01234567"] {
            let short = short_id(id);
            assert_eq!(short.chars().count(), id.chars().count().min(7));
            assert!(id.starts_with(short));
        }
    }

    #[test]
    fn test_format_push() {
        let event = push(
            "refs/heads/main",
            vec![
                commit("1111111aaaa", "first change"),
                commit("2222222bbbb", "second change"),
            ],
        );
        assert_eq!(
            format_push(&event),
            "[api] push to main (https://github.com/acme/api)\n\
             - 1111111: first change (https://github.com/acme/api/commit/1111111aaaa)\n\
             - 2222222: second change (https://github.com/acme/api/commit/2222222bbbb)"
        );
    }

    #[test]
    fn test_format_push_without_commits() {
        let event = push("refs/heads/dev", Vec::new());
        assert_eq!(
            format_push(&event),
            "[api] push to dev (https://github.com/acme/api)"
        );
    }

    #[test]
    fn test_format_push_short_commit_id() {
        let event = push("refs/heads/main", vec![commit("abc", "tiny")]);
        assert!(format_push(&event).contains("\n- abc: tiny ("));
    }

    #[test]
    fn test_format_is_deterministic() {
        let event = push("refs/heads/main", vec![commit("1111111aaaa", "first")]);
        assert_eq!(format_push(&event), format_push(&event));

        let event = pull_request(PullRequestAction::Opened, false);
        assert_eq!(format_pull_request(&event), format_pull_request(&event));
    }

    #[test]
    fn test_format_pull_request_opened() {
        let message = format_pull_request(&pull_request(PullRequestAction::Opened, false)).unwrap();
        assert_eq!(
            message,
            "[api] new PR: #7 Add relay\nfeature/relay -> main\nhttps://github.com/acme/api/pull/7"
        );
    }

    #[test]
    fn test_format_pull_request_synchronize() {
        let message =
            format_pull_request(&pull_request(PullRequestAction::Synchronize, false)).unwrap();
        assert_eq!(
            message,
            "[api] PR updated: #7 Add relay\nfeature/relay -> main @ 0123456\nhttps://github.com/acme/api/pull/7"
        );

        let mut event = pull_request(PullRequestAction::Synchronize, false);
        event.pull_request.head.sha.clear();
        event.pull_request.number = None;
        assert_eq!(
            format_pull_request(&event).unwrap(),
            "[api] PR updated: Add relay\nfeature/relay -> main\nhttps://github.com/acme/api/pull/7"
        );
    }

    #[test]
    fn test_format_pull_request_closed() {
        let merged = format_pull_request(&pull_request(PullRequestAction::Closed, true)).unwrap();
        assert!(merged.starts_with("[api] PR merged: #7 Add relay"));

        let closed = format_pull_request(&pull_request(PullRequestAction::Closed, false)).unwrap();
        assert!(closed.starts_with("[api] PR closed: #7 Add relay"));
    }

    #[test]
    fn test_format_pull_request_other_action() {
        assert_eq!(
            format_pull_request(&pull_request(PullRequestAction::Other, false)),
            None
        );
    }
}
