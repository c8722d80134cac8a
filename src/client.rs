//! Choosing namenode endpoints for a cluster identity and caching clients.

use crate::conf::HadoopConf;
use crate::errors::{CoreError, Result};
use crate::fs::NameNodeClient;
use crate::resolver::{AddressKind, Resolver};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Everything a transport needs to open a namenode connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Identity the client reports, used as the cache key.
    pub nsid: String,
    /// RPC endpoints in failover order.
    pub addresses: Vec<String>,
    pub user: String,
}

impl ClientOptions {
    /// Resolves `namenode` (possibly empty) into endpoints.
    ///
    /// An empty namenode falls back to `namenode_override` and then to the
    /// configured default namenodes. Viewfs identities cannot be connected to.
    pub fn resolve(
        conf: &HadoopConf,
        namenode: &str,
        namenode_override: Option<&str>,
        user: String,
    ) -> Result<Self> {
        let namenode = match namenode {
            "" => namenode_override.unwrap_or_default(),
            other => other,
        };

        let resolver = Resolver::new(conf);
        let (nsid, addresses) = if namenode.is_empty() {
            let addresses = conf.namenodes()?;
            (addresses.first().cloned().unwrap_or_default(), addresses)
        } else {
            match resolver.classify(namenode) {
                AddressKind::SimpleAddress => {
                    let addresses: Vec<String> = namenode
                        .split(',')
                        .map(str::trim)
                        .filter(|a| !a.is_empty())
                        .map(str::to_owned)
                        .collect();
                    (addresses.first().cloned().unwrap_or_default(), addresses)
                }
                AddressKind::NameServiceId => (namenode.to_string(), resolver.addresses_for(namenode)?),
                AddressKind::ViewfsNameServiceId => {
                    return Err(CoreError::UnmappedMountPoint(namenode.to_string()))
                }
            }
        };

        if addresses.is_empty() {
            return Err(CoreError::NoResolvableCluster);
        }
        log::debug!("namenode {nsid} -> {}", addresses.join(","));

        Ok(Self { nsid, addresses, user })
    }
}

/// Opens a client for resolved options. This is the transport seam.
pub trait Connector: Send + Sync {
    fn connect(&self, options: &ClientOptions) -> Result<Arc<dyn NameNodeClient>>;
}

/// Clients keyed by the cluster identity they were requested for.
#[derive(Default)]
pub struct ClientCache {
    clients: Mutex<HashMap<String, Arc<dyn NameNodeClient>>>,
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached client for `key`, creating it with `create` on first use.
    pub fn get_or_try_insert<F>(&self, key: &str, create: F) -> Result<Arc<dyn NameNodeClient>>
    where
        F: FnOnce() -> Result<Arc<dyn NameNodeClient>>,
    {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| CoreError::Unsupported("client cache poisoned".to_string()))?;
        if let Some(client) = clients.get(key) {
            return Ok(Arc::clone(client));
        }
        let client = create()?;
        clients.insert(key.to_string(), Arc::clone(&client));
        Ok(client)
    }

    pub fn len(&self) -> usize {
        self.clients.lock().map(|c| c.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ClientCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCache").field("clients", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalNameNode;

    fn conf() -> HadoopConf {
        HadoopConf::from_pairs([
            ("fs.defaultFS", "hdfs://prod"),
            ("dfs.nameservices", "prod"),
            ("dfs.ha.namenodes.prod", "nn1,nn2"),
            ("dfs.namenode.rpc-address.prod.nn1", "nn-b:8020"),
            ("dfs.namenode.rpc-address.prod.nn2", "nn-a:8020"),
        ])
    }

    #[test]
    fn name_service_uses_ha_addresses() {
        let opts = ClientOptions::resolve(&conf(), "prod", None, "bob".into()).unwrap();
        assert_eq!(opts.nsid, "prod");
        assert_eq!(opts.addresses, vec!["nn-a:8020", "nn-b:8020"]);
        assert_eq!(opts.user, "bob");
    }

    #[test]
    fn literal_addresses_are_split() {
        let opts = ClientOptions::resolve(&HadoopConf::default(), "h1:1,h2:2", None, "bob".into()).unwrap();
        assert_eq!(opts.nsid, "h1:1");
        assert_eq!(opts.addresses, vec!["h1:1", "h2:2"]);
    }

    #[test]
    fn empty_namenode_uses_override_then_default() {
        let opts = ClientOptions::resolve(&conf(), "", Some("other:9000"), "bob".into()).unwrap();
        assert_eq!(opts.addresses, vec!["other:9000"]);

        let opts = ClientOptions::resolve(&conf(), "", None, "bob".into()).unwrap();
        assert_eq!(opts.addresses, vec!["nn-a:8020", "nn-b:8020"]);
    }

    #[test]
    fn nothing_to_connect_to() {
        let err = ClientOptions::resolve(&HadoopConf::default(), "", None, "bob".into()).unwrap_err();
        assert!(matches!(err, CoreError::NoResolvableCluster));

        let err = ClientOptions::resolve(&conf(), "viewfs://nsX", None, "bob".into()).unwrap_err();
        assert!(matches!(err, CoreError::UnmappedMountPoint(_)));
    }

    #[test]
    fn cache_creates_once_per_key() {
        let cache = ClientCache::new();
        let mut created = 0;
        for _ in 0..3 {
            cache
                .get_or_try_insert("a", || {
                    created += 1;
                    Ok(Arc::new(LocalNameNode::new("/tmp", "a", "bob")) as Arc<dyn NameNodeClient>)
                })
                .unwrap();
        }
        assert_eq!(created, 1);

        let err = cache.get_or_try_insert("b", || Err(CoreError::NoResolvableCluster));
        assert!(err.is_err());
        assert_eq!(cache.len(), 1);
    }
}
