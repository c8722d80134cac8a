//! `setrep`: change the replication factor of every file under a set of paths.

use crate::errors::{CoreError, Result};
use crate::fs::{FileStatus, NameNodeClient};
use crate::helpers::{join_paths, qualified};
use crate::models::{ReplicationOutcome, SetrepReport};
use crate::session::Session;

/// Resolves and expands `paths`, then sets `replication` on every file found
/// under them. Directories are walked, never changed themselves.
pub fn setrep<S: AsRef<str>>(session: &Session, replication: u32, paths: &[S]) -> Result<SetrepReport> {
    if replication == 0 {
        return Err(CoreError::InvalidReplication(replication));
    }
    let (expanded, client) = session.client_and_expanded_paths(paths)?;
    Ok(set_replication_paths(client.as_ref(), replication, &expanded))
}

/// Walks already resolved paths on one client. Paths that vanish are skipped.
pub fn set_replication_paths(client: &dyn NameNodeClient, replication: u32, paths: &[String]) -> SetrepReport {
    let mut report = SetrepReport {
        nsid: client.nsid().to_string(),
        replication,
        outcomes: Vec::new(),
    };

    for path in paths {
        match client.stat(path) {
            Ok(status) => walk(client, path, &status, replication, &mut report.outcomes),
            Err(err) if err.is_not_found() => log::debug!("setrep: {path} does not exist, skipping"),
            Err(error) => report.outcomes.push(ReplicationOutcome::Failed {
                path: path.clone(),
                error,
            }),
        }
    }

    report
}

fn walk(
    client: &dyn NameNodeClient,
    path: &str,
    status: &FileStatus,
    replication: u32,
    outcomes: &mut Vec<ReplicationOutcome>,
) {
    if status.is_dir {
        let entries = match client.read_dir(path) {
            Ok(entries) => entries,
            Err(err) if err.is_not_found() => return,
            Err(error) => {
                outcomes.push(ReplicationOutcome::Failed {
                    path: path.to_string(),
                    error,
                });
                return;
            }
        };
        for entry in &entries {
            let child = join_paths(&[path, entry.name.as_str()]);
            walk(client, &child, entry, replication, outcomes);
        }
        return;
    }

    let outcome = match client.set_replication(path, replication) {
        Ok(true) => ReplicationOutcome::Set(path.to_string()),
        Ok(false) => ReplicationOutcome::Declined(path.to_string()),
        Err(err) if err.is_not_found() => return,
        Err(error) => ReplicationOutcome::Failed {
            path: path.to_string(),
            error,
        },
    };
    outcomes.push(outcome);
}

/// Confirmation line printed for each changed file.
pub fn replication_message(nsid: &str, replication: u32, path: &str) -> String {
    format!("Replication {replication} set: {}", qualified(nsid, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientOptions, Connector};
    use crate::conf::HadoopConf;
    use crate::fs::memory::MemoryNameNode;
    use crate::models::{Environment, ExitStatusLike, HADOOP_USER_NAME};
    use std::sync::Arc;

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn walks_directories_and_sets_files_only() {
        let node = MemoryNameNode::new("bob");
        node.add_file("/data/a.csv");
        node.add_file("/data/nested/b.csv");
        node.add_dir("/data/empty");
        node.add_file("/top");

        let report = set_replication_paths(&node, 2, &paths(&["/data", "/top"]));
        let set: Vec<&str> = report
            .outcomes
            .iter()
            .filter_map(|o| match o {
                ReplicationOutcome::Set(p) => Some(p.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(set, vec!["/data/a.csv", "/data/nested/b.csv", "/top"]);
        assert_eq!(node.replication("/data/nested/b.csv"), Some(2));
        assert_eq!(node.replication("/data"), None);
        assert!(node.calls().iter().all(|c| !c.starts_with("setrep /data/empty")));
        assert_eq!(report.status(), ExitStatusLike::Ok);
    }

    #[test]
    fn missing_paths_are_skipped() {
        let node = MemoryNameNode::new("bob");
        node.add_file("/here");

        let report = set_replication_paths(&node, 3, &paths(&["/gone", "/here"]));
        assert!(matches!(&report.outcomes[..], [ReplicationOutcome::Set(p)] if p == "/here"));
        assert_eq!(report.nsid, "mem");
        assert_eq!(report.replication, 3);
    }

    #[test]
    fn message_names_the_qualified_path() {
        assert_eq!(replication_message("mem", 3, "/a/b"), "Replication 3 set: hdfs://mem/a/b");
    }

    struct MemoryConnector(Arc<MemoryNameNode>);

    impl Connector for MemoryConnector {
        fn connect(&self, _options: &ClientOptions) -> Result<Arc<dyn NameNodeClient>> {
            Ok(Arc::clone(&self.0) as Arc<dyn NameNodeClient>)
        }
    }

    #[test]
    fn zero_replication_is_rejected_before_connecting() {
        let node = Arc::new(MemoryNameNode::new("bob"));
        node.add_file("/f");
        let env = Environment::from_vars([(HADOOP_USER_NAME, "bob")]);
        let session = Session::new(env, Box::new(MemoryConnector(Arc::clone(&node))))
            .with_conf(HadoopConf::from_pairs([("fs.defaultFS", "hdfs://nn:8020")]));

        let err = setrep(&session, 0, &["/f"]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidReplication(0)));
        assert!(node.calls().is_empty());

        let report = setrep(&session, 1, &["/*"]).unwrap();
        assert!(matches!(&report.outcomes[..], [ReplicationOutcome::Set(p)] if p == "/f"));
        assert_eq!(node.replication("/f"), Some(1));
    }
}
