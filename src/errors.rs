use std::{io, path::PathBuf};

/// A configuration source that exists but could not be read or parsed.
///
/// Kept clonable so a cached load result can be handed out more than once.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{}: {message}", .path.display())]
pub struct ConfigLoadError {
    pub path: PathBuf,
    pub message: String,
}

impl ConfigLoadError {
    pub fn new(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Error type shared by path resolution, remote operations and commands.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    /// Only empty, `hdfs` and `viewfs` schemes are accepted.
    #[error("invalid HDFS scheme in {0}")]
    InvalidScheme(String),

    /// A malformed URL, or a viewfs host that conflicts with the root namespace.
    #[error("invalid HDFS filename: {0}")]
    InvalidReference(String),

    /// Two inputs resolved to different clusters.
    #[error("multiple namenode URLs specified ({first} and {second})")]
    MultipleNamenodeReferences { first: String, second: String },

    /// Viewfs resolution ended inside the indirection namespace.
    #[error("no mount point for {0}")]
    UnmappedMountPoint(String),

    #[error(
        "couldn't find a namenode to connect to; specify hdfs://<namenode>:<port> in your paths, \
         or set HADOOP_NAMENODE or HADOOP_CONF_DIR in your environment"
    )]
    NoResolvableCluster,

    /// A name service id without any configured RPC address.
    #[error("no RPC address configured for name service {0}")]
    UnresolvableEndpoint(String),

    #[error("{op} {path}: file does not exist")]
    NotFound { op: &'static str, path: String },

    /// A glob that matched nothing. Reports the path as the user typed it.
    #[error("stat {0}: no such file or directory")]
    NoMatch(String),

    #[error("{0}: not a directory")]
    NotADirectory(String),

    #[error("remove {0}: file is a directory")]
    IsADirectory(String),

    #[error("{0}: file already exists")]
    AlreadyExists(String),

    #[error("cannot move \"{0}\" to the trash, as it contains the trash")]
    TrashRootConflict(String),

    #[error("failed to move {path} to trash {destination}: {reason}")]
    RelocationFailed {
        path: String,
        destination: String,
        reason: String,
    },

    #[error("replication must be >= 1, got {0}")]
    InvalidReplication(u32),

    #[error("problem loading configuration: {0}")]
    Config(#[from] ConfigLoadError),

    #[error("couldn't determine user: {0}")]
    UnknownUser(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("I/O error while accessing {}", .0.display())]
    Io(PathBuf, #[source] io::Error),

    /// Failure reported by the transport for a remote call.
    #[error("{op} {path}: {message}")]
    Remote {
        op: &'static str,
        path: String,
        message: String,
    },
}

impl CoreError {
    pub fn not_found(op: &'static str, path: impl Into<String>) -> Self {
        Self::NotFound {
            op,
            path: path.into(),
        }
    }

    pub fn remote(op: &'static str, path: impl Into<String>, message: impl ToString) -> Self {
        Self::Remote {
            op,
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, error: io::Error) -> Self {
        Self::Io(path.into(), error)
    }

    pub fn multiple_namenodes(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self::MultipleNamenodeReferences {
            first: first.into(),
            second: second.into(),
        }
    }

    /// True for both a missing remote entity and an empty glob expansion.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NoMatch(_))
    }

    /// True when a directory could not be created because something is in the way.
    pub fn is_path_conflict(&self) -> bool {
        matches!(self, Self::AlreadyExists(_) | Self::NotADirectory(_))
    }
}

/// Shared result alias for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
