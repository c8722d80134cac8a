//! Per-invocation context: environment, configuration, user and clients.

use crate::client::{ClientCache, ClientOptions, Connector};
use crate::conf::HadoopConf;
use crate::errors::{ConfigLoadError, CoreError, Result};
use crate::fs::NameNodeClient;
use crate::glob::expand_paths;
use crate::helpers::current_os_user;
use crate::models::Environment;
use crate::paths::{NormalizedPaths, PathNormalizer};
use std::sync::{Arc, OnceLock};

/// State shared by every step of one command invocation.
///
/// Configuration and the user name are resolved lazily and at most once;
/// later calls replay the first result, error included.
pub struct Session {
    env: Environment,
    conf: OnceLock<std::result::Result<HadoopConf, ConfigLoadError>>,
    user: OnceLock<std::result::Result<String, String>>,
    clients: ClientCache,
    connector: Box<dyn Connector>,
}

impl Session {
    pub fn new(env: Environment, connector: Box<dyn Connector>) -> Self {
        Self {
            env,
            conf: OnceLock::new(),
            user: OnceLock::new(),
            clients: ClientCache::new(),
            connector,
        }
    }

    /// Uses `conf` instead of searching the environment for configuration files.
    pub fn with_conf(self, conf: HadoopConf) -> Self {
        let _ = self.conf.set(Ok(conf));
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn conf(&self) -> Result<&HadoopConf> {
        self.conf
            .get_or_init(|| HadoopConf::load_from_environment(&self.env))
            .as_ref()
            .map_err(|err| CoreError::Config(err.clone()))
    }

    /// The user remote calls act as.
    pub fn user(&self) -> Result<String> {
        self.user
            .get_or_init(|| self.lookup_user())
            .clone()
            .map_err(CoreError::UnknownUser)
    }

    fn lookup_user(&self) -> std::result::Result<String, String> {
        let conf = self.conf().map_err(|err| err.to_string())?;
        if conf.is_kerberos() {
            return Err("kerberos authentication is not supported".to_string());
        }
        if let Some(user) = self.env.user_override() {
            return Ok(user.to_string());
        }
        current_os_user()
            .or_else(|| self.env.get("USER").map(str::to_owned))
            .ok_or_else(|| "no account name for the current uid".to_string())
    }

    pub fn normalize_paths<S: AsRef<str>>(&self, paths: &[S]) -> Result<NormalizedPaths> {
        let conf = self.conf()?;
        let user = || self.user();
        PathNormalizer::new(conf, &user)
            .with_namenode_override(self.env.namenode_override().is_some())
            .normalize(paths)
    }

    /// Client for `namenode`, connecting on first use.
    pub fn client(&self, namenode: &str) -> Result<Arc<dyn NameNodeClient>> {
        let key = match namenode {
            "" => self.env.namenode_override().unwrap_or_default(),
            other => other,
        };
        self.clients.get_or_try_insert(key, || {
            let options = ClientOptions::resolve(self.conf()?, namenode, self.env.namenode_override(), self.user()?)?;
            log::debug!("connecting to {} as {}", options.nsid, options.user);
            self.connector.connect(&options)
        })
    }

    /// Normalizes, connects and expands globs. Fails before any remote mutation.
    pub fn client_and_expanded_paths<S: AsRef<str>>(
        &self,
        paths: &[S],
    ) -> Result<(Vec<String>, Arc<dyn NameNodeClient>)> {
        let normalized = self.normalize_paths(paths)?;
        let client = self.client(&normalized.namenode)?;
        let expanded = expand_paths(client.as_ref(), &normalized.paths)?;
        Ok((expanded, client))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("env", &self.env)
            .field("clients", &self.clients)
            .finish_non_exhaustive()
    }
}
