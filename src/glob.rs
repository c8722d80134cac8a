//! Expansion of `*`, `?` and `[...]` wildcards against a remote directory tree.

use crate::errors::{CoreError, Result};
use crate::fs::NameNodeClient;
use crate::helpers::join_paths;
use std::ffi::CString;

/// True when the fragment holds a wildcard not preceded by a backslash.
pub fn has_glob(fragment: &str) -> bool {
    let mut prev: Option<char> = None;
    for ch in fragment.chars() {
        if matches!(ch, '*' | '?' | '[') && prev != Some('\\') {
            return true;
        }
        prev = Some(ch);
    }
    false
}

/// Shell-style match of a whole entry name, case-sensitive, `\` escapes.
pub fn name_matches(pattern: &str, name: &str) -> bool {
    let pattern = CString::new(pattern).ok();
    let name = CString::new(name).ok();
    match (pattern, name) {
        (Some(pattern), Some(name)) => unsafe { libc::fnmatch(pattern.as_ptr(), name.as_ptr(), 0) == 0 },
        _ => false,
    }
}

/// Expands the wildcards in one absolute, cleaned path.
///
/// The first wildcard segment is matched against a listing of the literal
/// directory before it. When wildcards remain after that segment, matching
/// directories are expanded further and other matches dropped; otherwise
/// each candidate is kept only if it still exists. Matched names are never
/// reinterpreted as patterns. Results come back in listing order.
pub fn expand_globs(client: &dyn NameNodeClient, globbed_path: &str) -> Result<Vec<String>> {
    let parts: Vec<&str> = globbed_path.split('/').skip(1).collect();
    if !parts.iter().any(|part| has_glob(part)) {
        return Ok(vec![globbed_path.to_string()]);
    }
    expand_below(client, "/", &parts)
}

fn expand_below(client: &dyn NameNodeClient, base: &str, segments: &[&str]) -> Result<Vec<String>> {
    let Some(split_at) = segments.iter().position(|part| has_glob(part)) else {
        return Ok(vec![join_below(base, segments)]);
    };

    let dir = join_below(base, &segments[..split_at]);
    let glob = segments[split_at];
    let remainder = &segments[split_at + 1..];
    let remainder_has_glob = remainder.iter().any(|part| has_glob(part));

    let mut res = Vec::new();
    for entry in client.read_dir(&dir)? {
        if !name_matches(glob, &entry.name) {
            continue;
        }

        let matched = join_paths(&[dir.as_str(), entry.name.as_str()]);
        if remainder_has_glob {
            if entry.is_dir {
                res.extend(expand_below(client, &matched, remainder)?);
            }
            continue;
        }

        let candidate = join_below(&matched, remainder);
        match client.stat(&candidate) {
            Ok(_) => res.push(candidate),
            Err(err) if err.is_not_found() => {
                log::debug!("{candidate} vanished after listing {dir}");
            }
            Err(err) => return Err(err),
        }
    }

    Ok(res)
}

fn join_below(base: &str, segments: &[&str]) -> String {
    let mut elements = Vec::with_capacity(segments.len() + 1);
    elements.push(base);
    elements.extend_from_slice(segments);
    join_paths(&elements)
}

/// Expands every wildcard path, passing literal paths through untouched.
///
/// A wildcard path that matches nothing fails the whole batch with
/// [`CoreError::NoMatch`] naming the path as given.
pub fn expand_paths<S: AsRef<str>>(client: &dyn NameNodeClient, paths: &[S]) -> Result<Vec<String>> {
    let mut res = Vec::new();

    for path in paths {
        let path = path.as_ref();
        if !has_glob(path) {
            res.push(path.to_string());
            continue;
        }

        let expanded = expand_globs(client, path)?;
        if expanded.is_empty() {
            return Err(CoreError::NoMatch(path.to_string()));
        }
        log::debug!("{path} expanded to {} path(s)", expanded.len());
        res.extend(expanded);
    }

    Ok(res)
}
