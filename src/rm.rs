//! `rm`: trash-aware removal of a batch of paths.

use crate::errors::{CoreError, Result};
use crate::fs::NameNodeClient;
use crate::models::{PathOutcome, RmOptions, RmReport, SkipReason};
use crate::session::Session;
use crate::trash::{Clock, TrashOutcome, TrashRelocator};

/// Resolves and expands `paths`, then removes each one.
///
/// Resolution or expansion errors abort before anything is touched. After
/// that every path is handled on its own and its outcome recorded.
pub fn rm<S: AsRef<str>>(session: &Session, paths: &[S], options: RmOptions, clock: &dyn Clock) -> Result<RmReport> {
    let (expanded, client) = session.client_and_expanded_paths(paths)?;
    Ok(remove_paths(client.as_ref(), &expanded, options, clock))
}

/// Removes already resolved paths on one client.
pub fn remove_paths(client: &dyn NameNodeClient, paths: &[String], options: RmOptions, clock: &dyn Clock) -> RmReport {
    let relocator = TrashRelocator::new(client, clock).force_trash(options.force_trash);
    let mut report = RmReport {
        nsid: client.nsid().to_string(),
        outcomes: Vec::new(),
    };

    for path in paths {
        let outcome = remove_one(client, &relocator, path, options);
        if let PathOutcome::Failed { error, .. } = &outcome {
            log::debug!("rm {path} failed: {error}");
        }
        report.outcomes.push(outcome);
    }

    report
}

fn remove_one(client: &dyn NameNodeClient, relocator: &TrashRelocator<'_>, path: &str, options: RmOptions) -> PathOutcome {
    let missing = || PathOutcome::Skipped {
        path: path.to_string(),
        reason: SkipReason::MissingPath(path.to_string()),
    };
    let failed = |error: CoreError| PathOutcome::Failed {
        path: path.to_string(),
        error,
    };

    let status = match client.stat(path) {
        Ok(status) => status,
        Err(err) if options.force && err.is_not_found() => return missing(),
        Err(err) => return failed(err),
    };

    if status.is_dir && !options.recursive {
        return failed(CoreError::IsADirectory(path.to_string()));
    }

    if !options.skip_trash {
        match relocator.move_to_trash(path) {
            Ok(TrashOutcome::Moved { to, .. }) => {
                return PathOutcome::Trashed {
                    path: path.to_string(),
                    destination: to,
                }
            }
            Ok(TrashOutcome::UseDirectDelete(reason)) => {
                log::debug!("deleting {path} directly: {reason:?}");
            }
            Err(err) if options.force && err.is_not_found() => return missing(),
            Err(err) => return failed(err),
        }
    }

    match client.remove_all(path) {
        Ok(()) => PathOutcome::Removed(path.to_string()),
        Err(err) if options.force && err.is_not_found() => missing(),
        Err(err) => failed(err),
    }
}
