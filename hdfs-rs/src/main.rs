use clap::{Parser, Subcommand};
use hdfs_cli_core::prelude::*;
use hdfs_cli_core::resolver::Resolver;
use hdfs_cli_core::rm::rm;
use hdfs_cli_core::setrep::{replication_message, setrep};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "hdfs", version, about = "Client for HDFS-style filesystems")]
struct Cli {
    /// Serve remote paths from this local directory instead of a namenode.
    #[arg(long, global = true, value_name = "DIR")]
    local_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remove files, moving them to the trash unless told otherwise.
    Rm {
        #[arg(short = 'r')]
        recursive: bool,
        #[arg(short = 'f')]
        force: bool,
        /// Bypass the trash and delete immediately.
        #[arg(long = "skipTrash")]
        skip_trash: bool,
        /// Use the trash even if the server has it disabled.
        #[arg(long = "forceTrash")]
        force_trash: bool,
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Set the replication factor of every file under the given paths.
    Setrep {
        #[arg(value_name = "REP", value_parser = clap::value_parser!(u32).range(1..))]
        replication: u32,
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Print the paths a set of wildcard arguments expands to.
    Glob {
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Print the namenode and clean paths for the arguments, without remote calls.
    Resolve {
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Print the RPC endpoints for a name service id or address.
    Addresses { nsid: String },
    /// Print the configuration keys needed to locate namenodes.
    PrintMinimalConfig,
}

impl Command {
    fn kind(&self) -> CommandKind {
        match self {
            Self::Rm { .. } => CommandKind::Remove,
            Self::Setrep { .. } => CommandKind::SetReplication,
            Self::Glob { .. } => CommandKind::Glob,
            Self::Resolve { .. } => CommandKind::Resolve,
            Self::Addresses { .. } => CommandKind::Addresses,
            Self::PrintMinimalConfig => CommandKind::PrintMinimalConfig,
        }
    }
}

/// Serves every cluster from one local directory tree.
struct LocalConnector {
    root: PathBuf,
    trash_interval: std::time::Duration,
}

impl Connector for LocalConnector {
    fn connect(&self, options: &ClientOptions) -> Result<Arc<dyn NameNodeClient>> {
        Ok(Arc::new(
            LocalNameNode::new(&self.root, options.nsid.clone(), options.user.clone())
                .with_trash_interval(self.trash_interval),
        ))
    }
}

/// Used when no transport is available for real namenodes.
struct UnavailableConnector;

impl Connector for UnavailableConnector {
    fn connect(&self, options: &ClientOptions) -> Result<Arc<dyn NameNodeClient>> {
        Err(CoreError::Unsupported(format!(
            "no RPC transport for {} ({}); use --local-root to operate on a local tree",
            options.nsid,
            options.addresses.join(",")
        )))
    }
}

fn session(local_root: Option<PathBuf>) -> Result<Session> {
    let env = Environment::from_process();
    let Some(root) = local_root else {
        return Ok(Session::new(env, Box::new(UnavailableConnector)));
    };

    let conf = HadoopConf::load_from_environment(&env)?;
    let connector = LocalConnector {
        root,
        trash_interval: conf.trash_interval(),
    };
    Ok(Session::new(env, Box::new(connector)).with_conf(conf))
}

fn run(cli: Cli) -> Result<ExitStatusLike> {
    let session = session(cli.local_root)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let write_err = |err: io::Error| CoreError::io("<stdout>", err);

    match cli.command {
        Command::Rm {
            recursive,
            force,
            skip_trash,
            force_trash,
            files,
        } => {
            let options = RmOptions {
                recursive,
                force,
                skip_trash,
                force_trash,
            };
            let report = rm(&session, &files, options, &SystemClock)?;
            for outcome in &report.outcomes {
                match outcome {
                    PathOutcome::Trashed { path, destination } => {
                        writeln!(out, "{}", moved_message(&report.nsid, path, destination)).map_err(write_err)?;
                    }
                    PathOutcome::Failed { error, .. } => eprintln!("hdfs rm: {error}"),
                    PathOutcome::Removed(_) | PathOutcome::Skipped { .. } => {}
                }
            }
            Ok(report.status())
        }
        Command::Setrep { replication, files } => {
            let report = setrep(&session, replication, &files)?;
            for outcome in &report.outcomes {
                match outcome {
                    ReplicationOutcome::Set(path) => {
                        writeln!(out, "{}", replication_message(&report.nsid, report.replication, path))
                            .map_err(write_err)?;
                    }
                    ReplicationOutcome::Declined(path) => log::debug!("replication of {path} left unchanged"),
                    ReplicationOutcome::Failed { error, .. } => eprintln!("hdfs setrep: {error}"),
                }
            }
            Ok(report.status())
        }
        Command::Glob { files } => {
            let (expanded, _) = session.client_and_expanded_paths(&files)?;
            for path in expanded {
                writeln!(out, "{path}").map_err(write_err)?;
            }
            Ok(ExitStatusLike::Ok)
        }
        Command::Resolve { files } => {
            let normalized = session.normalize_paths(&files)?;
            let namenode = match normalized.namenode.as_str() {
                "" => "(default)",
                other => other,
            };
            writeln!(out, "namenode: {namenode}").map_err(write_err)?;
            for path in normalized.paths {
                writeln!(out, "{path}").map_err(write_err)?;
            }
            Ok(ExitStatusLike::Ok)
        }
        Command::Addresses { nsid } => {
            let resolver = Resolver::new(session.conf()?);
            writeln!(out, "{nsid}: {:?}", resolver.classify(&nsid)).map_err(write_err)?;
            for addr in resolver.addresses_for(&nsid)? {
                writeln!(out, "{addr}").map_err(write_err)?;
            }
            Ok(ExitStatusLike::Ok)
        }
        Command::PrintMinimalConfig => {
            let xml = session.conf()?.minimal().to_xml()?;
            out.write_all(xml.as_bytes()).map_err(write_err)?;
            Ok(ExitStatusLike::Ok)
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let kind = cli.command.kind();
    log::debug!("running {kind}");

    match run(cli) {
        Ok(status) => ExitCode::from(status.as_code()),
        Err(err) => {
            eprintln!("hdfs {kind}: {err}");
            ExitCode::from(ExitStatusLike::Error.as_code())
        }
    }
}
