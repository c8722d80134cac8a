//! Client-side core for HDFS command-line tools.
//!
//! Resolves `hdfs://`, `viewfs://` and plain path arguments to a single
//! cluster and absolute paths, expands wildcards against the remote tree and
//! moves deleted paths into the per-user trash. The RPC transport is left to
//! implementors of [`Connector`] and [`NameNodeClient`].

pub mod client;
pub mod conf;
pub mod errors;
pub mod fs;
pub mod glob;
pub mod helpers;
pub mod models;
pub mod paths;
pub mod resolver;
pub mod rm;
pub mod session;
pub mod setrep;
pub mod trash;

pub use client::{ClientCache, ClientOptions, Connector};
pub use conf::HadoopConf;
pub use errors::{ConfigLoadError, CoreError, Result};
pub use fs::{FileStatus, LocalNameNode, NameNodeClient, ServerDefaults};
pub use glob::{expand_globs, expand_paths, has_glob};
pub use models::{
    CommandKind,
    Environment,
    ExitStatusLike,
    PathOutcome,
    ReplicationOutcome,
    RmOptions,
    RmReport,
    SetrepReport,
    SkipReason,
};
pub use paths::{NormalizedPaths, PathNormalizer};
pub use resolver::{AddressKind, MountResolution, ResolvedLocation, Resolver};
pub use session::Session;
pub use trash::{Clock, SystemClock, TrashOutcome, TrashRelocator};

/// Re-export a small stable API surface for command crates.
pub mod prelude {
    pub use crate::{
        client::*,
        conf::HadoopConf,
        errors::{CoreError, Result},
        fs::{FileStatus, LocalNameNode, NameNodeClient, ServerDefaults},
        models::*,
        session::Session,
        trash::{moved_message, Clock, SystemClock, TrashOutcome},
    };
}
