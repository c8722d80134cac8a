//! Turns mixed path arguments into one cluster identity plus absolute paths.

use crate::conf::HadoopConf;
use crate::errors::{CoreError, Result};
use crate::helpers::{
    is_viewfs_id, join_paths, parse_location, user_home, HDFS_SCHEME, VIEWFS_PREFIX, VIEWFS_SCHEME,
};
use crate::resolver::{MountResolution, Resolver};

/// Paths for one invocation, all on the same cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPaths {
    pub paths: Vec<String>,
    /// Empty when the caller's default cluster applies.
    pub namenode: String,
}

/// Cleans `hdfs://`, `viewfs://`, absolute and relative path arguments.
pub struct PathNormalizer<'a> {
    conf: &'a HadoopConf,
    user: &'a dyn Fn() -> Result<String>,
    namenode_override: bool,
}

impl<'a> PathNormalizer<'a> {
    /// `user` is only called when a relative path needs the home directory.
    pub fn new(conf: &'a HadoopConf, user: &'a dyn Fn() -> Result<String>) -> Self {
        Self {
            conf,
            user,
            namenode_override: false,
        }
    }

    /// An explicit namenode (e.g. `HADOOP_NAMENODE`) disables default viewfs handling.
    pub fn with_namenode_override(mut self, present: bool) -> Self {
        self.namenode_override = present;
        self
    }

    pub fn normalize<S: AsRef<str>>(&self, raw_paths: &[S]) -> Result<NormalizedPaths> {
        let resolver = Resolver::new(self.conf);
        let mut namenode = String::new();
        let mut clean_paths = Vec::with_capacity(raw_paths.len());

        for raw in raw_paths {
            let raw = raw.as_ref();
            let location = parse_location(raw)?;
            let mut clean_path = location.path;

            match location.scheme.as_str() {
                "" => {
                    if !clean_path.starts_with('/') {
                        let user = (self.user)()?;
                        clean_path = join_paths(&[user_home(&user), clean_path]);
                    }
                }
                HDFS_SCHEME | VIEWFS_SCHEME => {
                    if clean_path.is_empty() {
                        clean_path = "/".to_string();
                    }
                }
                _ => return Err(CoreError::InvalidScheme(raw.to_string())),
            }

            if !location.host.is_empty() {
                let mut nsid = location.host;
                if location.scheme == VIEWFS_SCHEME {
                    let root = format!("{VIEWFS_PREFIX}{nsid}");
                    match resolver.reparse_viewfs(&root, &clean_path)? {
                        MountResolution::Mounted(resolved) => {
                            nsid = resolved.nsid;
                            clean_path = resolved.path;
                        }
                        MountResolution::Unmapped(_) => {
                            return Err(CoreError::UnmappedMountPoint(raw.to_string()))
                        }
                    }
                }
                accept_namenode(&mut namenode, nsid)?;
            }

            clean_paths.push(clean_path);
        }

        if !namenode.is_empty() || self.namenode_override {
            return Ok(NormalizedPaths {
                paths: clean_paths,
                namenode,
            });
        }

        let default_nsid = resolver.default_cluster_identity();
        if !is_viewfs_id(&default_nsid) {
            return Ok(NormalizedPaths {
                paths: clean_paths,
                namenode,
            });
        }

        log::debug!("resolving {} path(s) through default {default_nsid}", clean_paths.len());
        let mut resolved_paths = Vec::with_capacity(clean_paths.len());
        for path in &clean_paths {
            match resolver.reparse_viewfs(&default_nsid, path)? {
                MountResolution::Mounted(resolved) => {
                    accept_namenode(&mut namenode, resolved.nsid)?;
                    resolved_paths.push(resolved.path);
                }
                MountResolution::Unmapped(_) => {
                    return Err(CoreError::UnmappedMountPoint(format!("{default_nsid}{path}")))
                }
            }
        }

        if namenode.is_empty() {
            return Err(CoreError::NoResolvableCluster);
        }

        Ok(NormalizedPaths {
            paths: resolved_paths,
            namenode,
        })
    }
}

/// Records the first cluster seen and rejects any different one after it.
fn accept_namenode(current: &mut String, nsid: String) -> Result<()> {
    if !current.is_empty() && *current != nsid {
        return Err(CoreError::multiple_namenodes(current.clone(), nsid));
    }
    *current = nsid;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::DEFAULT_FS;

    fn bob() -> Result<String> {
        Ok("bob".to_string())
    }

    fn no_user() -> Result<String> {
        Err(CoreError::UnknownUser("not needed".into()))
    }

    fn viewfs_conf() -> HadoopConf {
        HadoopConf::from_pairs([
            (DEFAULT_FS, "viewfs://nsX"),
            ("fs.viewfs.mounttable.nsX.link./user", "hdfs://NN2/_user"),
            ("fs.viewfs.mounttable.nsX.link./data", "hdfs://NN2/warehouse"),
            ("fs.viewfs.mounttable.nsX.link./cloud", "hdfs://NN1/_cloud"),
        ])
    }

    #[test]
    fn relative_paths_land_in_the_home_directory() {
        let conf = HadoopConf::default();
        let out = PathNormalizer::new(&conf, &bob)
            .normalize(&["reports/q1", "/abs/path"])
            .unwrap();
        assert_eq!(out.paths, vec!["/user/bob/reports/q1", "/abs/path"]);
        assert_eq!(out.namenode, "");
    }

    #[test]
    fn absolute_paths_do_not_need_a_user() {
        let conf = HadoopConf::default();
        let out = PathNormalizer::new(&conf, &no_user).normalize(&["/tmp/x"]).unwrap();
        assert_eq!(out.paths, vec!["/tmp/x"]);
    }

    #[test]
    fn explicit_hosts_must_agree() {
        let conf = HadoopConf::default();
        let normalizer = PathNormalizer::new(&conf, &bob);

        let out = normalizer.normalize(&["hdfs://A/foo", "/bar", "hdfs://A/baz"]).unwrap();
        assert_eq!(out.namenode, "A");
        assert_eq!(out.paths, vec!["/foo", "/bar", "/baz"]);

        let err = normalizer.normalize(&["hdfs://A/foo", "hdfs://B/bar"]).unwrap_err();
        assert!(matches!(err, CoreError::MultipleNamenodeReferences { .. }));
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let conf = HadoopConf::default();
        let err = PathNormalizer::new(&conf, &bob).normalize(&["s3://bucket/key"]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidScheme(ref raw) if raw == "s3://bucket/key"));
    }

    #[test]
    fn explicit_viewfs_url_is_mapped() {
        let conf = viewfs_conf();
        let out = PathNormalizer::new(&conf, &bob)
            .normalize(&["viewfs://nsX/user/bob/f"])
            .unwrap();
        assert_eq!(out.namenode, "NN2");
        assert_eq!(out.paths, vec!["/_user/bob/f"]);
    }

    #[test]
    fn explicit_viewfs_url_without_mount_fails() {
        let conf = viewfs_conf();
        let err = PathNormalizer::new(&conf, &bob)
            .normalize(&["viewfs://nsX/nowhere"])
            .unwrap_err();
        assert!(matches!(err, CoreError::UnmappedMountPoint(_)));
    }

    #[test]
    fn default_viewfs_applies_to_plain_paths() {
        let conf = viewfs_conf();
        let out = PathNormalizer::new(&conf, &bob)
            .normalize(&["notes.txt", "/data/t1"])
            .unwrap();
        assert_eq!(out.namenode, "NN2");
        assert_eq!(out.paths, vec!["/_user/bob/notes.txt", "/warehouse/t1"]);
    }

    #[test]
    fn default_viewfs_paths_must_share_a_cluster() {
        let conf = viewfs_conf();
        let err = PathNormalizer::new(&conf, &bob)
            .normalize(&["/data/t1", "/cloud/c"])
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::MultipleNamenodeReferences { ref first, ref second } if first == "NN2" && second == "NN1"
        ));
    }

    #[test]
    fn default_viewfs_unmapped_path_fails() {
        let conf = viewfs_conf();
        let err = PathNormalizer::new(&conf, &bob).normalize(&["/tmp/x"]).unwrap_err();
        assert!(matches!(err, CoreError::UnmappedMountPoint(ref p) if p == "viewfs://nsX/tmp/x"));
    }

    #[test]
    fn namenode_override_skips_default_viewfs() {
        let conf = viewfs_conf();
        let out = PathNormalizer::new(&conf, &bob)
            .with_namenode_override(true)
            .normalize(&["/tmp/x"])
            .unwrap();
        assert_eq!(out.namenode, "");
        assert_eq!(out.paths, vec!["/tmp/x"]);
    }

    #[test]
    fn empty_batch_under_default_viewfs_has_no_cluster() {
        let conf = viewfs_conf();
        let empty: [&str; 0] = [];
        let err = PathNormalizer::new(&conf, &bob).normalize(&empty).unwrap_err();
        assert!(matches!(err, CoreError::NoResolvableCluster));
    }
}
