use std::fmt;

use serde::{Deserialize, Serialize};

/// `(command, group?, subcommand?)` address of a slash command leaf.
///
/// A group is only meaningful together with a subcommand, so the
/// constructors never produce `(command, Some(group), None)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoutingPath {
    command: String,
    group: Option<String>,
    subcommand: Option<String>,
}

impl RoutingPath {
    pub fn command(name: impl Into<String>) -> Self {
        Self {
            command: name.into(),
            group: None,
            subcommand: None,
        }
    }

    pub fn subcommand(command: impl Into<String>, subcommand: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            group: None,
            subcommand: Some(subcommand.into()),
        }
    }

    pub fn grouped(
        command: impl Into<String>,
        group: impl Into<String>,
        subcommand: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            group: Some(group.into()),
            subcommand: Some(subcommand.into()),
        }
    }

    /// Builds a path from the loose parts carried on an inbound envelope.
    /// Returns `None` for a group without a subcommand.
    pub fn from_parts(
        command: impl Into<String>,
        group: Option<String>,
        subcommand: Option<String>,
    ) -> Option<Self> {
        match (group, subcommand) {
            (Some(_), None) => None,
            (group, subcommand) => Some(Self {
                command: command.into(),
                group,
                subcommand,
            }),
        }
    }

    pub fn command_name(&self) -> &str {
        &self.command
    }

    pub fn group_name(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn subcommand_name(&self) -> Option<&str> {
        self.subcommand.as_deref()
    }

    pub fn depth(&self) -> usize {
        1 + usize::from(self.group.is_some()) + usize::from(self.subcommand.is_some())
    }

    pub fn is_bare(&self) -> bool {
        self.subcommand.is_none()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.command.as_str())
            .chain(self.group.as_deref())
            .chain(self.subcommand.as_deref())
    }

    pub fn identifier(&self) -> String {
        self.segments().collect::<Vec<_>>().join(" ")
    }
}

impl fmt::Display for RoutingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.identifier())
    }
}
