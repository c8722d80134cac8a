//! Path and URL helpers shared by the resolver, glob expansion and trash code.
//!
//! Remote paths are always `/`-separated strings, independent of the local
//! platform, so these helpers work on `str` rather than `std::path::Path`.

use crate::errors::{CoreError, Result};
use std::ffi::CStr;

pub const HDFS_SCHEME: &str = "hdfs";
pub const VIEWFS_SCHEME: &str = "viewfs";
pub const VIEWFS_PREFIX: &str = "viewfs://";

/// A parsed `scheme://host/path` reference. Every part may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub scheme: String,
    /// Host, including the port when one was given.
    pub host: String,
    pub path: String,
}

/// Splits a raw path argument into scheme, host and decoded path.
///
/// Strings that are not absolute URLs (`/abs/path`, `rel/path`) come back
/// with an empty scheme and host and the input untouched as path.
pub fn parse_location(raw: &str) -> Result<Location> {
    let url = match url::Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            return Ok(Location {
                path: raw.to_string(),
                ..Location::default()
            })
        }
        Err(err) => return Err(CoreError::InvalidReference(format!("{raw}: {err}"))),
    };

    let mut host = url.host_str().unwrap_or_default().to_string();
    if let Some(port) = url.port() {
        host = format!("{host}:{port}");
    }

    let decode = |part: &str| {
        urlencoding::decode(part)
            .map(|decoded| decoded.into_owned())
            .map_err(|err| CoreError::InvalidReference(format!("{raw}: {err}")))
    };
    let mut path = decode(url.path())?;
    // `?` is a glob character here, not a query separator.
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(&decode(query)?);
    }

    Ok(Location {
        scheme: url.scheme().to_string(),
        host,
        path,
    })
}

pub fn is_viewfs_id(nsid: &str) -> bool {
    nsid.starts_with(VIEWFS_PREFIX)
}

/// Renders `hdfs://<nsid><path>` for user-facing messages.
pub fn qualified(nsid: &str, path: &str) -> String {
    format!("{HDFS_SCHEME}://{nsid}{path}")
}

/// Lexically normalizes a slash-separated path: collapses repeated slashes,
/// drops `.` segments and resolves `..` against preceding segments.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Joins the non-empty elements with `/` and cleans the result.
/// Returns an empty string when every element is empty.
pub fn join_paths<S: AsRef<str>>(elements: &[S]) -> String {
    let parts: Vec<&str> = elements
        .iter()
        .map(AsRef::as_ref)
        .filter(|e| !e.is_empty())
        .collect();
    if parts.is_empty() {
        return String::new();
    }
    clean_path(&parts.join("/"))
}

/// Everything but the last element of the path, cleaned.
pub fn parent_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => clean_path(&path[..=idx]),
        None => ".".to_string(),
    }
}

/// The last element of the path, ignoring trailing slashes.
pub fn base_name(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    match trimmed.rfind('/') {
        Some(idx) => trimmed[idx + 1..].to_string(),
        None => trimmed.to_string(),
    }
}

/// True when `path` is `root` or lies below it, compared segment-wise.
pub fn is_within(path: &str, root: &str) -> bool {
    if root == "/" {
        return path.starts_with('/');
    }
    let root = root.trim_end_matches('/');
    path == root || path.strip_prefix(root).is_some_and(|rest| rest.starts_with('/'))
}

/// Appends a millisecond timestamp to a trash name, Hadoop style (no separator).
pub fn with_timestamp_suffix(path: &str, millis: i64) -> String {
    format!("{path}{millis}")
}

/// `/user/<user>`
pub fn user_home(user: &str) -> String {
    join_paths(&["/user", user])
}

/// `/user/<user>/.Trash`
pub fn trash_root(user: &str) -> String {
    join_paths(&["/user", user, ".Trash"])
}

/// Name of the account owning the effective uid, if the passwd database knows it.
pub fn current_os_user() -> Option<String> {
    let uid = unsafe { libc::geteuid() };
    let mut buf = vec![0 as libc::c_char; 4096];
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();

    let rc = unsafe { libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result) };
    if rc != 0 || result.is_null() || pwd.pw_name.is_null() {
        return None;
    }

    let name = unsafe { CStr::from_ptr(pwd.pw_name) };
    name.to_str().ok().filter(|n| !n.is_empty()).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_path_resolves_dots_and_slashes() {
        assert_eq!(clean_path("/a//b/./c/../d/"), "/a/b/d");
        assert_eq!(clean_path("/../a"), "/a");
        assert_eq!(clean_path("a/../../b"), "../b");
        assert_eq!(clean_path(""), ".");
        assert_eq!(clean_path("/"), "/");
    }

    #[test]
    fn join_skips_empty_elements() {
        assert_eq!(join_paths(&["/base", "", "x", ""]), "/base/x");
        assert_eq!(join_paths(&["", ""]), "");
        assert_eq!(join_paths(&["/user", "bob", "rel/p"]), "/user/bob/rel/p");
    }

    #[test]
    fn dir_and_base() {
        assert_eq!(parent_dir("/a/b"), "/a");
        assert_eq!(parent_dir("/a"), "/");
        assert_eq!(parent_dir("/"), "/");
        assert_eq!(base_name("/a/b/"), "b");
        assert_eq!(base_name("/"), "/");
    }

    #[test]
    fn within_compares_whole_segments() {
        assert!(is_within("/user/u/.Trash/Current/x", "/user/u/.Trash"));
        assert!(is_within("/user/u/.Trash", "/user/u/.Trash"));
        assert!(!is_within("/user/u/.Trash2", "/user/u/.Trash"));
        assert!(is_within("/anything", "/"));
    }

    #[test]
    fn parse_plain_paths_and_urls() {
        let loc = parse_location("rel/dir").unwrap();
        assert_eq!(loc, Location { path: "rel/dir".into(), ..Location::default() });

        let loc = parse_location("hdfs://nn1:8020/a%20b/c").unwrap();
        assert_eq!(loc.scheme, "hdfs");
        assert_eq!(loc.host, "nn1:8020");
        assert_eq!(loc.path, "/a b/c");

        let loc = parse_location("viewfs://nsX/data/*.t?t").unwrap();
        assert_eq!(loc.host, "nsX");
        assert_eq!(loc.path, "/data/*.t?t");
    }

    #[test]
    fn glob_after_question_mark_is_decoded() {
        let loc = parse_location("hdfs://h/a?b c").unwrap();
        assert_eq!(loc.path, "/a?b c");

        let loc = parse_location("hdfs://h/logs/a%20?%5Bxy%5D.log").unwrap();
        assert_eq!(loc.path, "/logs/a ?[xy].log");
    }

    #[test]
    fn trash_layout() {
        assert_eq!(trash_root("bob"), "/user/bob/.Trash");
        assert_eq!(user_home("bob"), "/user/bob");
        assert_eq!(with_timestamp_suffix("/user/bob/.Trash/Current/a", 42), "/user/bob/.Trash/Current/a42");
    }
}
