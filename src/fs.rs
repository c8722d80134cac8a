use crate::errors::{CoreError, Result};
use crate::helpers::{base_name, clean_path};
use std::fs::{self, DirBuilder};
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Permission bits for directories created under the trash.
pub const TRASH_PERMISSION: u32 = 0o700;

/// Metadata for a single remote entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub name: String,
    pub is_dir: bool,
    pub len: u64,
}

/// Server-side settings the client cares about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerDefaults {
    /// How long trashed items are retained. Zero disables the trash.
    pub trash_interval: Duration,
}

/// Operations the glob expander, trash and command code need from a namenode.
///
/// All paths are absolute,
/// slash-separated remote paths. Errors use the tagged variants of
/// [`CoreError`] so callers can tell a missing path from a conflict.
pub trait NameNodeClient: Send + Sync {
    /// Cluster identity this client is bound to.
    fn nsid(&self) -> &str;

    /// User the client acts as.
    fn user(&self) -> &str;

    /// Fails with [`CoreError::NotFound`] when the path is absent.
    fn stat(&self, path: &str) -> Result<FileStatus>;

    fn exists(&self, path: &str) -> Result<bool>;

    /// Lists directory children in server order.
    fn read_dir(&self, path: &str) -> Result<Vec<FileStatus>>;

    /// Creates the directory and any missing parents. Fails with
    /// [`CoreError::AlreadyExists`] or [`CoreError::NotADirectory`] when a
    /// component exists but is not a directory.
    fn mkdir_all(&self, path: &str, mode: u32) -> Result<()>;

    fn remove_all(&self, path: &str) -> Result<()>;

    /// Moves `from` into the trash at `to`. Never overwrites: an existing
    /// destination yields [`CoreError::AlreadyExists`].
    fn rename_for_trash(&self, from: &str, to: &str) -> Result<()>;

    /// Changes the replication factor of a file. `Ok(false)` means the
    /// namenode accepted the call but left the file alone.
    fn set_replication(&self, path: &str, replication: u32) -> Result<bool>;

    fn server_defaults(&self) -> Result<ServerDefaults>;
}

/// A namenode stand-in backed by a local directory tree.
///
/// Remote path `/a/b` maps to `<root>/a/b`. Useful for dry runs against a
/// scratch directory and for tests.
#[derive(Debug, Clone)]
pub struct LocalNameNode {
    root: PathBuf,
    nsid: String,
    user: String,
    defaults: ServerDefaults,
}

impl LocalNameNode {
    pub fn new(root: impl Into<PathBuf>, nsid: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            nsid: nsid.into(),
            user: user.into(),
            defaults: ServerDefaults::default(),
        }
    }

    pub fn with_trash_interval(mut self, interval: Duration) -> Self {
        self.defaults.trash_interval = interval;
        self
    }

    pub fn local_path(&self, path: &str) -> PathBuf {
        let clean = clean_path(path);
        self.root.join(clean.trim_start_matches('/'))
    }

    fn status_of(&self, name: String, local: &Path, op: &'static str, path: &str) -> Result<FileStatus> {
        let meta = fs::metadata(local).map_err(|err| map_io(op, path, local, err))?;
        Ok(FileStatus {
            name,
            is_dir: meta.is_dir(),
            len: meta.len(),
        })
    }
}

/// Translates local I/O failures into the tagged remote error variants.
fn map_io(op: &'static str, path: &str, local: &Path, err: io::Error) -> CoreError {
    if err.raw_os_error() == Some(libc::ENOTDIR) {
        return CoreError::NotADirectory(path.to_string());
    }
    match err.kind() {
        io::ErrorKind::NotFound => CoreError::not_found(op, path),
        io::ErrorKind::AlreadyExists => CoreError::AlreadyExists(path.to_string()),
        _ => CoreError::io(local, err),
    }
}

impl NameNodeClient for LocalNameNode {
    fn nsid(&self) -> &str {
        &self.nsid
    }

    fn user(&self) -> &str {
        &self.user
    }

    fn stat(&self, path: &str) -> Result<FileStatus> {
        let local = self.local_path(path);
        self.status_of(base_name(path), &local, "stat", path)
    }

    fn exists(&self, path: &str) -> Result<bool> {
        match fs::symlink_metadata(self.local_path(path)) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) if err.raw_os_error() == Some(libc::ENOTDIR) => Ok(false),
            Err(err) => Err(CoreError::io(self.local_path(path), err)),
        }
    }

    fn read_dir(&self, path: &str) -> Result<Vec<FileStatus>> {
        let local = self.local_path(path);
        let entries = fs::read_dir(&local).map_err(|err| map_io("readdir", path, &local, err))?;

        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| CoreError::io(&local, err))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            out.push(self.status_of(name, &entry.path(), "readdir", path)?);
        }
        Ok(out)
    }

    fn mkdir_all(&self, path: &str, mode: u32) -> Result<()> {
        let local = self.local_path(path);
        if local.is_file() {
            return Err(CoreError::AlreadyExists(path.to_string()));
        }
        DirBuilder::new()
            .recursive(true)
            .mode(mode)
            .create(&local)
            .map_err(|err| map_io("mkdir", path, &local, err))
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        let local = self.local_path(path);
        let meta = fs::symlink_metadata(&local).map_err(|err| map_io("remove", path, &local, err))?;
        let removed = if meta.is_dir() {
            fs::remove_dir_all(&local)
        } else {
            fs::remove_file(&local)
        };
        removed.map_err(|err| map_io("remove", path, &local, err))
    }

    fn rename_for_trash(&self, from: &str, to: &str) -> Result<()> {
        if self.exists(to)? {
            return Err(CoreError::AlreadyExists(to.to_string()));
        }
        let src = self.local_path(from);
        fs::rename(&src, self.local_path(to)).map_err(|err| map_io("rename", from, &src, err))
    }

    /// A local tree has a single copy of everything; only the target is checked.
    fn set_replication(&self, path: &str, replication: u32) -> Result<bool> {
        let status = self.stat(path)?;
        log::debug!("setrep {replication} on local {path} is a no-op");
        Ok(!status.is_dir)
    }

    fn server_defaults(&self) -> Result<ServerDefaults> {
        Ok(self.defaults)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn local() -> (TempDir, LocalNameNode) {
        let tmp = TempDir::new().unwrap();
        let node = LocalNameNode::new(tmp.path(), "local", "alice");
        (tmp, node)
    }

    #[test]
    fn local_paths_stay_under_root() {
        let (tmp, node) = local();
        assert_eq!(node.local_path("/a/../../b"), tmp.path().join("b"));
        assert_eq!(node.local_path("/"), tmp.path().join(""));
    }

    #[test]
    fn stat_and_listing() {
        let (tmp, node) = local();
        fs::create_dir_all(tmp.path().join("dir/sub")).unwrap();
        fs::write(tmp.path().join("dir/file.txt"), b"hello").unwrap();

        let status = node.stat("/dir/file.txt").unwrap();
        assert_eq!(status, FileStatus { name: "file.txt".into(), is_dir: false, len: 5 });
        assert!(node.stat("/dir/missing").unwrap_err().is_not_found());

        let mut names: Vec<(String, bool)> = node
            .read_dir("/dir")
            .unwrap()
            .into_iter()
            .map(|s| (s.name, s.is_dir))
            .collect();
        names.sort();
        assert_eq!(names, vec![("file.txt".into(), false), ("sub".into(), true)]);
    }

    #[test]
    fn mkdir_through_a_file_is_a_conflict() {
        let (tmp, node) = local();
        fs::write(tmp.path().join("blocker"), b"").unwrap();

        let err = node.mkdir_all("/blocker/child", TRASH_PERMISSION).unwrap_err();
        assert!(err.is_path_conflict(), "{err:?}");
        let err = node.mkdir_all("/blocker", TRASH_PERMISSION).unwrap_err();
        assert!(err.is_path_conflict(), "{err:?}");
        assert!(!node.exists("/blocker/child").unwrap());
    }

    #[test]
    fn trash_rename_never_overwrites() {
        let (tmp, node) = local();
        fs::write(tmp.path().join("a"), b"a").unwrap();
        fs::write(tmp.path().join("b"), b"b").unwrap();

        let err = node.rename_for_trash("/a", "/b").unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists(_)));
        assert_eq!(fs::read(tmp.path().join("b")).unwrap(), b"b");

        node.rename_for_trash("/a", "/c").unwrap();
        assert!(!node.exists("/a").unwrap());
        assert!(node.exists("/c").unwrap());
    }

    #[test]
    fn remove_all_handles_files_and_trees() {
        let (tmp, node) = local();
        fs::create_dir_all(tmp.path().join("t/x/y")).unwrap();
        fs::write(tmp.path().join("f"), b"").unwrap();

        node.remove_all("/t").unwrap();
        node.remove_all("/f").unwrap();
        assert!(!node.exists("/t").unwrap());
        assert!(node.remove_all("/f").unwrap_err().is_not_found());
    }

    #[test]
    fn local_replication_checks_the_target() {
        let (tmp, node) = local();
        fs::create_dir_all(tmp.path().join("d")).unwrap();
        fs::write(tmp.path().join("d/f"), b"").unwrap();

        assert!(node.set_replication("/d/f", 3).unwrap());
        assert!(!node.set_replication("/d", 3).unwrap());
        assert!(node.set_replication("/d/missing", 3).unwrap_err().is_not_found());
    }
}
