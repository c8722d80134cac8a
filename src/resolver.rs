//! Name service classification, RPC endpoint lookup and viewfs mount resolution.

use crate::conf::{HadoopConf, HA_NAMENODES_PREFIX, MOUNT_TABLE_PREFIX, RPC_ADDRESS_PREFIX};
use crate::errors::{CoreError, Result};
use crate::helpers::{
    clean_path, is_viewfs_id, join_paths, parse_location, VIEWFS_PREFIX, VIEWFS_SCHEME,
};

/// What kind of cluster reference a namenode string is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// `host:port`, possibly several joined by commas, or an unknown hostname.
    SimpleAddress,
    /// A logical name service resolved through `dfs.namenode.rpc-address.*`.
    NameServiceId,
    /// `viewfs://<id>`, a mount table namespace rather than a cluster.
    ViewfsNameServiceId,
}

/// A cluster identity paired with a path on that cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub nsid: String,
    pub path: String,
}

impl ResolvedLocation {
    pub fn into_parts(self) -> (String, String) {
        (self.nsid, self.path)
    }
}

/// Outcome of one viewfs mount table lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountResolution {
    /// A mount entry mapped the path onto a concrete cluster.
    Mounted(ResolvedLocation),
    /// No mount entry applies, or it points into another viewfs namespace.
    /// The identity is still `viewfs://`-shaped.
    Unmapped(ResolvedLocation),
}

impl MountResolution {
    /// The `(cluster, path)` pair, whether or not it was mapped.
    pub fn location(&self) -> &ResolvedLocation {
        match self {
            Self::Mounted(location) | Self::Unmapped(location) => location,
        }
    }

    pub fn into_location(self) -> ResolvedLocation {
        match self {
            Self::Mounted(location) | Self::Unmapped(location) => location,
        }
    }

    pub fn is_mounted(&self) -> bool {
        matches!(self, Self::Mounted(_))
    }
}

/// Read-only view over a [`HadoopConf`] answering endpoint questions.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    conf: &'a HadoopConf,
}

impl<'a> Resolver<'a> {
    pub fn new(conf: &'a HadoopConf) -> Self {
        Self { conf }
    }

    /// Classifies a namenode reference. Mount table links are not consulted.
    pub fn classify(&self, reference: &str) -> AddressKind {
        if is_viewfs_id(reference) {
            return AddressKind::ViewfsNameServiceId;
        }
        if reference.contains(':') {
            return AddressKind::SimpleAddress;
        }
        if self.conf.nameservices().any(|ns| ns == reference)
            || self.conf.get(&format!("{HA_NAMENODES_PREFIX}{reference}")).is_some()
        {
            return AddressKind::NameServiceId;
        }
        AddressKind::SimpleAddress
    }

    /// RPC addresses serving `nsid`.
    ///
    /// Viewfs ids and `host:port` strings are returned as-is. A direct
    /// `dfs.namenode.rpc-address.<nsid>` wins over the HA member list; HA
    /// member addresses are sorted.
    pub fn addresses_for(&self, nsid: &str) -> Result<Vec<String>> {
        if is_viewfs_id(nsid) || nsid.contains(':') {
            return Ok(vec![nsid.to_string()]);
        }

        if let Some(addr) = self.conf.get(&format!("{RPC_ADDRESS_PREFIX}{nsid}")) {
            return Ok(vec![addr.to_string()]);
        }

        let members = self
            .conf
            .get(&format!("{HA_NAMENODES_PREFIX}{nsid}"))
            .unwrap_or_default();
        let mut addresses: Vec<String> = members
            .split(',')
            .map(str::trim)
            .filter(|member| !member.is_empty())
            .filter_map(|member| self.conf.get(&format!("{RPC_ADDRESS_PREFIX}{nsid}.{member}")))
            .filter(|addr| !addr.is_empty())
            .map(str::to_owned)
            .collect();

        if addresses.is_empty() {
            return Err(CoreError::UnresolvableEndpoint(nsid.to_string()));
        }
        addresses.sort();
        Ok(addresses)
    }

    pub fn default_cluster_identity(&self) -> String {
        self.conf.default_nsid()
    }

    /// Maps a viewfs filename onto the cluster and path behind its mount point.
    ///
    /// `filename` is a plain path or a `viewfs://` URL. The namespace is the
    /// URL host, else `root_namespace`, else the default filesystem. The
    /// longest path prefix with a `fs.viewfs.mounttable.<ns>.link.<prefix>`
    /// entry is replaced by its target. Only one substitution is made: a
    /// target that is itself a viewfs URL is reported as unmapped.
    pub fn reparse_viewfs(&self, root_namespace: &str, filename: &str) -> Result<MountResolution> {
        let location = parse_location(filename)?;
        if !location.scheme.is_empty() && location.scheme != VIEWFS_SCHEME {
            return Err(CoreError::InvalidReference(filename.to_string()));
        }
        if !location.host.is_empty() && !root_namespace.is_empty() {
            return Err(CoreError::InvalidReference(format!(
                "{filename} conflicts with namespace {root_namespace}"
            )));
        }

        let mut namespace = if location.host.is_empty() {
            root_namespace.to_string()
        } else {
            location.host
        };
        if namespace.is_empty() {
            namespace = self.default_cluster_identity();
        }
        let namespace = namespace
            .strip_prefix(VIEWFS_PREFIX)
            .unwrap_or(&namespace)
            .to_string();
        let path = location.path;

        let mut dirs: Vec<&str> = path.split('/').collect();
        if dirs.first().is_some_and(|first| !first.is_empty()) {
            dirs.insert(0, "");
        }

        for len in (1..=dirs.len()).rev() {
            let prefix = dirs[..len].join("/");
            let key = format!("{MOUNT_TABLE_PREFIX}{namespace}.link.{prefix}");
            let Some(target) = self.conf.get(&key) else {
                continue;
            };

            let suffix = join_paths(&dirs[len..]);
            let target = parse_location(&format!("{target}/{suffix}"))?;
            let resolved = ResolvedLocation {
                path: clean_path(&target.path),
                nsid: target.host,
            };
            log::debug!(
                "viewfs {namespace}: {path} matched mount {prefix:?} -> {}{}",
                resolved.nsid,
                resolved.path
            );

            if target.scheme == VIEWFS_SCHEME {
                return Ok(MountResolution::Unmapped(ResolvedLocation {
                    nsid: format!("{VIEWFS_PREFIX}{}", resolved.nsid),
                    path: resolved.path,
                }));
            }
            return Ok(MountResolution::Mounted(resolved));
        }

        log::debug!("viewfs {namespace}: no mount point for {path}");
        Ok(MountResolution::Unmapped(ResolvedLocation {
            nsid: format!("{VIEWFS_PREFIX}{namespace}"),
            path,
        }))
    }
}
