use serde::Deserialize;
use std::fmt;

/// Chat webhook URL a notification is posted to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Destination(String);

impl Destination {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Group {
    pub name: String,
    pub repositories: Vec<String>,
    pub destination: Destination,
}

/// Repository name to destination lookup, with a fallback for unknown names.
#[derive(Debug, Clone, Deserialize)]
pub struct DestinationTable {
    pub default: Destination,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl DestinationTable {
    pub fn new(default: Destination, groups: Vec<Group>) -> Self {
        Self { default, groups }
    }

    /// First group listing `repository` wins; anything else goes to the default.
    pub fn resolve(&self, repository: &str) -> &Destination {
        self.groups
            .iter()
            .find(|group| group.repositories.iter().any(|name| name == repository))
            .map(|group| &group.destination)
            .unwrap_or(&self.default)
    }

    /// Name of the group that owns `repository`, if any.
    pub fn group_of(&self, repository: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|group| group.repositories.iter().any(|name| name == repository))
            .map(|group| group.name.as_str())
    }
}
