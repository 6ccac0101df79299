//! Job-level GitHub token permissions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionScope {
    Actions,
    Checks,
    Contents,
    Deployments,
    Discussions,
    Issues,
    Packages,
    Pages,
    PullRequests,
    SecurityEvents,
    Statuses,
}

impl PermissionScope {
    pub fn label(&self) -> &'static str {
        match self {
            PermissionScope::Actions => "actions",
            PermissionScope::Checks => "checks",
            PermissionScope::Contents => "contents",
            PermissionScope::Deployments => "deployments",
            PermissionScope::Discussions => "discussions",
            PermissionScope::Issues => "issues",
            PermissionScope::Packages => "packages",
            PermissionScope::Pages => "pages",
            PermissionScope::PullRequests => "pull-requests",
            PermissionScope::SecurityEvents => "security-events",
            PermissionScope::Statuses => "statuses",
        }
    }
}

/// Ordered so that merging keeps the stronger grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    None,
    Read,
    Write,
}

impl PermissionLevel {
    pub fn label(&self) -> &'static str {
        match self {
            PermissionLevel::None => "none",
            PermissionLevel::Read => "read",
            PermissionLevel::Write => "write",
        }
    }
}

/// Explicit permission map. Scopes not listed are not granted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(BTreeMap<PermissionScope, PermissionLevel>);

impl Permissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_grants(grants: &[(PermissionScope, PermissionLevel)]) -> Self {
        let mut permissions = Self::new();
        for (scope, level) in grants {
            permissions.grant(*scope, *level);
        }
        permissions
    }

    /// Grant `level` on `scope`, keeping any stronger existing grant.
    pub fn grant(&mut self, scope: PermissionScope, level: PermissionLevel) {
        let entry = self.0.entry(scope).or_insert(level);
        if level > *entry {
            *entry = level;
        }
    }

    pub fn merge(&mut self, other: &Permissions) {
        for (scope, level) in &other.0 {
            self.grant(*scope, *level);
        }
    }

    pub fn get(&self, scope: PermissionScope) -> Option<PermissionLevel> {
        self.0.get(&scope).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PermissionScope, PermissionLevel)> + '_ {
        self.0.iter().map(|(s, l)| (*s, *l))
    }

    /// `true` when any scope is granted write access.
    pub fn writes(&self) -> bool {
        self.0.values().any(|level| *level == PermissionLevel::Write)
    }

    /// `permission-<scope>` inputs for `actions/create-github-app-token`.
    pub fn app_token_inputs(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(scope, level)| (format!("permission-{}", scope.label()), level.label().to_string()))
            .collect()
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> =
            self.iter().map(|(s, l)| format!("{}: {}", s.label(), l.label())).collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}
