use crate::errors::CoreError;
use std::collections::HashMap;

pub const HADOOP_CONF_DIR: &str = "HADOOP_CONF_DIR";
pub const HADOOP_HOME: &str = "HADOOP_HOME";
pub const HADOOP_NAMENODE: &str = "HADOOP_NAMENODE";
pub const HADOOP_USER_NAME: &str = "HADOOP_USER_NAME";

pub type EnvVarMap = HashMap<String, String>;

/// Snapshot of the environment variables the client consults.
///
/// Captured once per invocation so lookups stay consistent and tests can
/// supply their own variables.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: EnvVarMap,
}

impl Environment {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Returns the variable value, treating an empty value as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn conf_dir(&self) -> Option<&str> {
        self.get(HADOOP_CONF_DIR)
    }

    pub fn hadoop_home(&self) -> Option<&str> {
        self.get(HADOOP_HOME)
    }

    pub fn namenode_override(&self) -> Option<&str> {
        self.get(HADOOP_NAMENODE)
    }

    pub fn user_override(&self) -> Option<&str> {
        self.get(HADOOP_USER_NAME)
    }
}

/// Command family exposed by the `hdfs` front-end.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum CommandKind {
    Remove,
    SetReplication,
    Glob,
    Resolve,
    Addresses,
    PrintMinimalConfig,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remove => "rm",
            Self::SetReplication => "setrep",
            Self::Glob => "glob",
            Self::Resolve => "resolve",
            Self::Addresses => "addresses",
            Self::PrintMinimalConfig => "print-minimal-config",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Flags accepted by `rm`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RmOptions {
    pub recursive: bool,
    pub force: bool,
    /// Delete immediately instead of moving to the trash.
    pub skip_trash: bool,
    /// Use the trash even if the server reports it disabled.
    pub force_trash: bool,
}

/// Why a path was not relocated to the trash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The server-side retention interval is zero.
    TrashDisabled,
    /// The path already lives under the user's trash root.
    AlreadyTrashed(String),
    /// The path is gone and `-f` was given.
    MissingPath(String),
}

#[derive(Debug)]
pub enum PathOutcome {
    Trashed { path: String, destination: String },
    Removed(String),
    Skipped { path: String, reason: SkipReason },
    Failed { path: String, error: CoreError },
}

impl PathOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Per-path results of one removal batch, in input order.
#[derive(Debug, Default)]
pub struct RmReport {
    /// Cluster the batch ran against.
    pub nsid: String,
    pub outcomes: Vec<PathOutcome>,
}

impl RmReport {
    pub fn failures(&self) -> impl Iterator<Item = &PathOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn status(&self) -> ExitStatusLike {
        if self.failures().next().is_some() {
            ExitStatusLike::Error
        } else {
            ExitStatusLike::Ok
        }
    }
}

#[derive(Debug)]
pub enum ReplicationOutcome {
    Set(String),
    /// The namenode refused, e.g. for erasure-coded files.
    Declined(String),
    Failed { path: String, error: CoreError },
}

/// Files touched by one `setrep` run, in walk order.
#[derive(Debug, Default)]
pub struct SetrepReport {
    pub nsid: String,
    pub replication: u32,
    pub outcomes: Vec<ReplicationOutcome>,
}

impl SetrepReport {
    pub fn failures(&self) -> impl Iterator<Item = &ReplicationOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ReplicationOutcome::Failed { .. }))
    }

    pub fn status(&self) -> ExitStatusLike {
        if self.failures().next().is_some() {
            ExitStatusLike::Error
        } else {
            ExitStatusLike::Ok
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatusLike {
    Ok,
    Error,
}

impl ExitStatusLike {
    pub fn as_code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Error => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_variables_count_as_unset() {
        let env = Environment::from_vars([(HADOOP_NAMENODE, ""), (HADOOP_USER_NAME, "alice")]);
        assert_eq!(env.namenode_override(), None);
        assert_eq!(env.user_override(), Some("alice"));
    }

    #[test]
    fn report_status_reflects_failures() {
        let mut report = RmReport::default();
        report.outcomes.push(PathOutcome::Removed("/a".into()));
        assert_eq!(report.status(), ExitStatusLike::Ok);

        report.outcomes.push(PathOutcome::Failed {
            path: "/b".into(),
            error: CoreError::IsADirectory("/b".into()),
        });
        assert_eq!(report.status(), ExitStatusLike::Error);
        assert_eq!(report.status().as_code(), 1);
    }
}
