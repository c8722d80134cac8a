//! Relocation of deleted paths into `/user/<user>/.Trash/Current`.

use crate::errors::{CoreError, Result};
use crate::fs::{NameNodeClient, TRASH_PERMISSION};
use crate::helpers::{
    base_name, is_within, join_paths, parent_dir, qualified, trash_root, with_timestamp_suffix,
};
use crate::models::SkipReason;

/// Moves that can be retried because a trash checkpoint raced with us.
const MOVE_ATTEMPTS: usize = 2;
/// Times the destination parent may be renamed around a non-directory.
const PARENT_ADJUSTMENTS: usize = 2;

/// Millisecond wall clock used to disambiguate trash names.
pub trait Clock {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Result of a trash attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrashOutcome {
    Moved { from: String, to: String },
    /// Trash does not apply; the caller should delete directly.
    UseDirectDelete(SkipReason),
}

impl TrashOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

pub struct TrashRelocator<'a> {
    client: &'a dyn NameNodeClient,
    clock: &'a dyn Clock,
    force_trash: bool,
}

impl<'a> TrashRelocator<'a> {
    pub fn new(client: &'a dyn NameNodeClient, clock: &'a dyn Clock) -> Self {
        Self {
            client,
            clock,
            force_trash: false,
        }
    }

    /// Skips the server-side check that the trash is enabled.
    pub fn force_trash(mut self, force: bool) -> Self {
        self.force_trash = force;
        self
    }

    pub fn trash_root(&self) -> String {
        trash_root(self.client.user())
    }

    /// Moves `name` to `<trash root>/Current/<name>`, appending a millisecond
    /// timestamp where a previous entry or a non-directory is in the way.
    pub fn move_to_trash(&self, name: &str) -> Result<TrashOutcome> {
        let trash_root = self.trash_root();
        if is_within(name, &trash_root) {
            return Ok(TrashOutcome::UseDirectDelete(SkipReason::AlreadyTrashed(name.to_string())));
        }
        if is_within(&parent_dir(&trash_root), name) {
            return Err(CoreError::TrashRootConflict(name.to_string()));
        }

        if !self.force_trash && self.client.server_defaults()?.trash_interval.is_zero() {
            log::debug!("trash disabled on {}, deleting {name} directly", self.client.nsid());
            return Ok(TrashOutcome::UseDirectDelete(SkipReason::TrashDisabled));
        }

        let mut trash_path = join_paths(&[trash_root.as_str(), "Current", name]);
        let mut base_trash_path = parent_dir(&trash_path);
        let mut adjustments = 0;
        let mut attempt = 0;
        let mut last_err: Option<CoreError> = None;

        while attempt < MOVE_ATTEMPTS {
            if let Err(err) = self.client.mkdir_all(&base_trash_path, TRASH_PERMISSION) {
                if !err.is_path_conflict() || adjustments >= PARENT_ADJUSTMENTS {
                    log::error!("can't create trash directory: {base_trash_path}");
                    return Err(err);
                }
                adjustments += 1;

                let blocker = self.existing_ancestor(&base_trash_path)?;
                let suffixed = with_timestamp_suffix(&blocker, self.clock.now_millis());
                base_trash_path = format!("{suffixed}{}", &base_trash_path[blocker.len()..]);
                trash_path = join_paths(&[base_trash_path.as_str(), base_name(&trash_path).as_str()]);
                log::warn!("{blocker} is not a directory, using {base_trash_path} instead");
                continue;
            }
            attempt += 1;

            let destination = match self.free_destination(&trash_path) {
                Ok(destination) => destination,
                Err(err) => {
                    last_err = Some(err);
                    continue;
                }
            };

            match self.client.rename_for_trash(name, &destination) {
                Ok(()) => {
                    log::debug!("moved {name} to {destination}");
                    return Ok(TrashOutcome::Moved {
                        from: name.to_string(),
                        to: destination,
                    });
                }
                Err(err) => {
                    log::debug!("trash move of {name} to {destination} failed: {err}");
                    trash_path = destination;
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(err) if err.is_not_found() => Err(err),
            Some(err) => Err(CoreError::RelocationFailed {
                path: name.to_string(),
                destination: trash_path,
                reason: err.to_string(),
            }),
            None => Err(CoreError::RelocationFailed {
                path: name.to_string(),
                destination: trash_path,
                reason: "no attempt succeeded".to_string(),
            }),
        }
    }

    /// Walks up from `path` to the closest component that exists.
    fn existing_ancestor(&self, path: &str) -> Result<String> {
        let mut candidate = path.to_string();
        while !self.client.exists(&candidate)? {
            candidate = parent_dir(&candidate);
        }
        Ok(candidate)
    }

    /// Appends fresh timestamps to `trash_path` until nothing exists there.
    fn free_destination(&self, trash_path: &str) -> Result<String> {
        let mut candidate = trash_path.to_string();
        while self.client.exists(&candidate)? {
            candidate = with_timestamp_suffix(trash_path, self.clock.now_millis());
        }
        Ok(candidate)
    }
}

/// Confirmation line printed after a successful move.
pub fn moved_message(nsid: &str, from: &str, to: &str) -> String {
    format!("Moved: '{}' to trash at: {}", qualified(nsid, from), qualified(nsid, to))
}
