//! Hadoop configuration: the merged key/value view of `*-site.xml` files.

use crate::errors::{ConfigLoadError, Result};
use crate::helpers::{is_viewfs_id, parse_location, HDFS_SCHEME};
use crate::models::Environment;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Files read from a configuration directory, lowest precedence first.
pub const CONF_FILES: [&str; 3] = ["core-site.xml", "hdfs-site.xml", "mapred-site.xml"];

pub const DEFAULT_FS: &str = "fs.defaultFS";
pub const DEFAULT_FS_DEPRECATED: &str = "fs.default.name";
pub const NAMESERVICES: &str = "dfs.nameservices";
pub const RPC_ADDRESS_PREFIX: &str = "dfs.namenode.rpc-address.";
pub const HA_NAMENODES_PREFIX: &str = "dfs.ha.namenodes.";
pub const MOUNT_TABLE_PREFIX: &str = "fs.viewfs.mounttable.";
pub const AUTHENTICATION: &str = "hadoop.security.authentication";
pub const TRASH_INTERVAL: &str = "fs.trash.interval";

const MINIMAL_KEYS: [&str; 7] = [
    "dfs.client.use.datanode.hostname",
    "dfs.data.transfer.protection",
    "dfs.encrypt.data.transfer",
    "dfs.namenode.kerberos.principal",
    NAMESERVICES,
    DEFAULT_FS_DEPRECATED,
    DEFAULT_FS,
];

const MINIMAL_PREFIXES: [&str; 3] = [RPC_ADDRESS_PREFIX, HA_NAMENODES_PREFIX, MOUNT_TABLE_PREFIX];

#[derive(Debug, Deserialize, Serialize)]
struct Property {
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct PropertyList {
    #[serde(rename = "property", default)]
    property: Vec<Property>,
}

/// Merged Hadoop configuration. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HadoopConf {
    values: BTreeMap<String, String>,
}

impl HadoopConf {
    /// Locates configuration through `HADOOP_CONF_DIR`, then `HADOOP_HOME/conf`.
    ///
    /// The first directory holding at least one configuration file wins. A
    /// file that exists but is unreadable or malformed is an error; finding
    /// nothing at all yields an empty configuration.
    pub fn load_from_environment(env: &Environment) -> std::result::Result<Self, ConfigLoadError> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(dir) = env.conf_dir() {
            candidates.push(PathBuf::from(dir));
        }
        if let Some(home) = env.hadoop_home() {
            candidates.push(Path::new(home).join("conf"));
        }

        for dir in candidates {
            if let Some(conf) = Self::load(&dir)? {
                log::debug!("loaded hadoop configuration from {}", dir.display());
                return Ok(conf);
            }
        }

        log::debug!("no hadoop configuration found");
        Ok(Self::default())
    }

    /// Parses the configuration files present in `dir`. Returns `None` when
    /// none of them exist.
    pub fn load(dir: &Path) -> std::result::Result<Option<Self>, ConfigLoadError> {
        let mut conf: Option<Self> = None;

        for file in CONF_FILES {
            let path = dir.join(file);
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(ConfigLoadError::new(&path, err)),
            };

            let list: PropertyList =
                quick_xml::de::from_str(&text).map_err(|err| ConfigLoadError::new(&path, err))?;

            let conf = conf.get_or_insert_with(Self::default);
            for prop in list.property {
                conf.values.insert(prop.name, prop.value);
            }
        }

        Ok(conf)
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `fs.defaultFS`, or the deprecated `fs.default.name`.
    pub fn default_fs(&self) -> &str {
        match self.get(DEFAULT_FS) {
            Some(value) if !value.is_empty() => value,
            _ => self.get(DEFAULT_FS_DEPRECATED).unwrap_or_default(),
        }
    }

    /// Cluster identity of the default filesystem.
    ///
    /// A viewfs default comes back whole (`viewfs://nsX`), an hdfs default as
    /// its host, anything else as an empty string.
    pub fn default_nsid(&self) -> String {
        let value = self.default_fs();
        if is_viewfs_id(value) {
            return value.to_string();
        }
        if value.starts_with("hdfs://") {
            if let Ok(location) = parse_location(value) {
                return location.host;
            }
        }
        String::new()
    }

    /// Comma separated `dfs.nameservices` entries.
    pub fn nameservices(&self) -> impl Iterator<Item = &str> {
        self.get(NAMESERVICES)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Default namenode addresses.
    ///
    /// Uses the default name service when one is configured; otherwise scans
    /// every `fs.default*` host and `dfs.namenode.rpc-address.*` value,
    /// minus logical HA cluster names. Sorted and de-duplicated.
    pub fn namenodes(&self) -> Result<Vec<String>> {
        let default_nsid = self.default_nsid();
        if !default_nsid.is_empty() {
            return crate::resolver::Resolver::new(self).addresses_for(&default_nsid);
        }

        let mut found: BTreeSet<String> = BTreeSet::new();
        let mut clusters: Vec<&str> = Vec::new();
        for (key, value) in self.iter() {
            if key.starts_with("fs.default") {
                if let Ok(location) = parse_location(value) {
                    if location.scheme == HDFS_SCHEME && !location.host.is_empty() {
                        found.insert(location.host);
                    }
                }
            } else if key.starts_with(RPC_ADDRESS_PREFIX) {
                found.insert(value.to_string());
            } else if let Some(cluster) = key.strip_prefix(HA_NAMENODES_PREFIX) {
                clusters.push(cluster);
            }
        }
        for cluster in clusters {
            found.remove(cluster);
        }

        Ok(found.into_iter().collect())
    }

    pub fn is_kerberos(&self) -> bool {
        self.get(AUTHENTICATION)
            .is_some_and(|v| v.eq_ignore_ascii_case("kerberos"))
    }

    /// `fs.trash.interval`, configured in minutes. Missing or invalid is zero.
    pub fn trash_interval(&self) -> Duration {
        let minutes = self
            .get(TRASH_INTERVAL)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|m| m.is_finite() && *m > 0.0)
            .unwrap_or(0.0);
        Duration::from_secs_f64(minutes * 60.0)
    }

    /// The subset of keys a client needs to locate namenodes.
    pub fn minimal(&self) -> Self {
        Self {
            values: self
                .values
                .iter()
                .filter(|(key, _)| {
                    MINIMAL_KEYS.contains(&key.as_str())
                        || MINIMAL_PREFIXES.iter().any(|p| key.starts_with(p))
                })
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Serializes back to the `<configuration>` property list format.
    pub fn to_xml(&self) -> std::result::Result<String, ConfigLoadError> {
        let list = PropertyList {
            property: self
                .values
                .iter()
                .map(|(name, value)| Property {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect(),
        };
        let body = quick_xml::se::to_string_with_root("configuration", &list)
            .map_err(|err| ConfigLoadError::new("<stdout>", err))?;
        Ok(format!("<?xml version=\"1.0\"?>\n{body}\n"))
    }
}
