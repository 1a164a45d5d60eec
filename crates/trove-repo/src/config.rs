//! Remote repository configuration
//!
//! Stored in `<config dir>/remotes.yaml`. The older
//! `<config dir>/remote-repositories.yaml` format is only ever read, for a
//! one-time migration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use crate::auth::Credentials;
use crate::error::{RepoError, Result};

pub const API_VERSION: &str = "trove.dev/v1";
pub const REMOTES_FILE: &str = "remotes.yaml";
pub const LEGACY_REMOTES_FILE: &str = "remote-repositories.yaml";

/// Configured remotes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRepositories {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default)]
    pub remotes: Vec<RemoteRepository>,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

impl Default for RemoteRepositories {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            remotes: Vec::new(),
        }
    }
}

impl RemoteRepositories {
    /// Get a remote by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&RemoteRepository> {
        self.remotes.iter().find(|r| r.is_named(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut RemoteRepository> {
        self.remotes.iter_mut().find(|r| r.is_named(name))
    }

    /// Add a remote
    pub fn add(&mut self, remote: RemoteRepository) -> Result<()> {
        if self.get(&remote.name).is_some() {
            return Err(RepoError::RemoteAlreadyExists {
                name: remote.name.clone(),
            });
        }
        self.remotes.push(remote);
        Ok(())
    }

    /// Remove a remote by name
    pub fn remove(&mut self, name: &str) -> Result<RemoteRepository> {
        let idx = self
            .remotes
            .iter()
            .position(|r| r.is_named(name))
            .ok_or_else(|| RepoError::RemoteNotFound {
                name: name.to_string(),
            })?;
        Ok(self.remotes.remove(idx))
    }

    pub fn names(&self) -> Vec<&str> {
        self.remotes.iter().map(|r| r.name.as_str()).collect()
    }

    /// Remotes by ascending priority, the one named `hint` first
    pub fn ordered(&self, hint: Option<&str>) -> Vec<&RemoteRepository> {
        let mut ordered: Vec<&RemoteRepository> = self.remotes.iter().collect();
        ordered.sort_by_key(|r| r.priority);

        if let Some(hint) = hint
            && let Some(idx) = ordered.iter().position(|r| r.is_named(hint))
        {
            let preferred = ordered.remove(idx);
            ordered.insert(0, preferred);
        }
        ordered
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }
}

/// A configured remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRepository {
    pub name: String,

    /// Lower values are consulted first
    #[serde(default)]
    pub priority: i32,

    pub fetch: RemoteEndpoint,

    #[serde(default)]
    pub publish: Vec<RemoteEndpoint>,
}

impl RemoteRepository {
    pub fn new(name: impl Into<String>, priority: i32, fetch: RemoteEndpoint) -> Self {
        Self {
            name: name.into(),
            priority,
            fetch,
            publish: Vec::new(),
        }
    }

    pub fn with_publish(mut self, endpoint: RemoteEndpoint) -> Self {
        self.publish.push(endpoint);
        self
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A repository token plus optional credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEndpoint {
    pub token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl RemoteEndpoint {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Credentials to inject, present only when a username is configured
    pub fn credentials(&self) -> Option<Credentials> {
        let username = self.username.as_deref()?;
        Some(Credentials::basic(
            username,
            self.password.clone().unwrap_or_default(),
        ))
    }
}

/// Legacy remote list: name -> address and priority
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegacyRemoteRepositories {
    pub remotes: IndexMap<String, LegacyRemote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyRemote {
    pub href: String,

    #[serde(default)]
    pub priority: i32,
}

/// Where remote configuration is persisted
pub trait ConfigurationStore {
    /// `None` when no current-format configuration exists
    fn load_remotes(&self) -> Result<Option<RemoteRepositories>>;

    /// `None` when no legacy configuration exists
    fn load_legacy_remotes(&self) -> Result<Option<LegacyRemoteRepositories>>;

    fn save_remotes(&self, remotes: &RemoteRepositories) -> Result<()>;
}

/// Configuration files in a directory
#[derive(Debug, Clone)]
pub struct FileConfigurationStore {
    dir: PathBuf,
}

impl FileConfigurationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in the user configuration directory
    pub fn user() -> Result<Self> {
        Ok(Self::new(Self::default_dir()?))
    }

    /// Get default configuration directory
    pub fn default_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| RepoError::InvalidConfig {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("trove"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn remotes_path(&self) -> PathBuf {
        self.dir.join(REMOTES_FILE)
    }

    pub fn legacy_remotes_path(&self) -> PathBuf {
        self.dir.join(LEGACY_REMOTES_FILE)
    }
}

fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    let value = serde_yaml::from_str(&content).map_err(|e| RepoError::InvalidConfig {
        message: format!("{}: {}", path.display(), e),
    })?;
    Ok(Some(value))
}

impl ConfigurationStore for FileConfigurationStore {
    fn load_remotes(&self) -> Result<Option<RemoteRepositories>> {
        load_yaml(&self.remotes_path())
    }

    fn load_legacy_remotes(&self) -> Result<Option<LegacyRemoteRepositories>> {
        load_yaml(&self.legacy_remotes_path())
    }

    fn save_remotes(&self, remotes: &RemoteRepositories) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let content = serde_yaml::to_string(remotes)?;
        std::fs::write(self.remotes_path(), content)?;
        tracing::debug!("Saved {}", self.remotes_path().display());
        Ok(())
    }
}

/// Configuration held in memory; counts saves
#[derive(Debug, Default)]
pub struct MemoryConfigurationStore {
    remotes: RefCell<Option<RemoteRepositories>>,
    legacy: RefCell<Option<LegacyRemoteRepositories>>,
    saves: Cell<usize>,
}

impl MemoryConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remotes(remotes: RemoteRepositories) -> Self {
        let store = Self::new();
        *store.remotes.borrow_mut() = Some(remotes);
        store
    }

    pub fn with_legacy(legacy: LegacyRemoteRepositories) -> Self {
        let store = Self::new();
        *store.legacy.borrow_mut() = Some(legacy);
        store
    }

    pub fn remotes(&self) -> Option<RemoteRepositories> {
        self.remotes.borrow().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl ConfigurationStore for MemoryConfigurationStore {
    fn load_remotes(&self) -> Result<Option<RemoteRepositories>> {
        Ok(self.remotes.borrow().clone())
    }

    fn load_legacy_remotes(&self) -> Result<Option<LegacyRemoteRepositories>> {
        Ok(self.legacy.borrow().clone())
    }

    fn save_remotes(&self, remotes: &RemoteRepositories) -> Result<()> {
        *self.remotes.borrow_mut() = Some(remotes.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn remote(name: &str, priority: i32) -> RemoteRepository {
        RemoteRepository::new(name, priority, RemoteEndpoint::new(format!("[folder]/{}", name)))
    }

    #[test]
    fn test_add_rejects_duplicate_names() {
        let mut remotes = RemoteRepositories::default();
        remotes.add(remote("central", 1)).unwrap();

        let err = remotes.add(remote("CENTRAL", 2)).unwrap_err();
        assert!(matches!(err, RepoError::RemoteAlreadyExists { .. }));
        assert_eq!(remotes.names(), vec!["central"]);
    }

    #[test]
    fn test_remove() {
        let mut remotes = RemoteRepositories::default();
        remotes.add(remote("central", 1)).unwrap();

        assert_eq!(remotes.remove("Central").unwrap().name, "central");
        assert!(remotes.is_empty());
        assert!(matches!(
            remotes.remove("central"),
            Err(RepoError::RemoteNotFound { .. })
        ));
    }

    #[test]
    fn test_ordered_by_priority_with_hint_first() {
        let mut remotes = RemoteRepositories::default();
        remotes.add(remote("A", 5)).unwrap();
        remotes.add(remote("B", 1)).unwrap();
        remotes.add(remote("C", 10)).unwrap();
        remotes.add(remote("D", 1)).unwrap();

        let names = |hint: Option<&str>| {
            remotes
                .ordered(hint)
                .iter()
                .map(|r| r.name.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(None), vec!["B", "D", "A", "C"]);
        assert_eq!(names(Some("a")), vec!["A", "B", "D", "C"]);
        assert_eq!(names(Some("unknown")), vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn test_endpoint_credentials_need_username() {
        let endpoint = RemoteEndpoint::new("[folder]/srv");
        assert!(endpoint.credentials().is_none());

        let endpoint = RemoteEndpoint {
            username: Some("alice".to_string()),
            ..endpoint
        };
        let credentials = endpoint.credentials().unwrap();
        assert_eq!(credentials.username(), "alice");
        assert_eq!(credentials.password(), "");
    }

    #[test]
    fn test_serialized_layout() {
        let mut remotes = RemoteRepositories::default();
        remotes
            .add(
                RemoteRepository::new(
                    "central",
                    1,
                    RemoteEndpoint::new("[folder]/srv/trove").with_credentials("alice", "s3cret"),
                )
                .with_publish(RemoteEndpoint::new("[folder]/srv/trove")),
            )
            .unwrap();

        let yaml = serde_yaml::to_string(&remotes).unwrap();
        insta::assert_snapshot!(yaml, @r"
        apiVersion: trove.dev/v1
        remotes:
        - name: central
          priority: 1
          fetch:
            token: '[folder]/srv/trove'
            username: alice
            password: s3cret
          publish:
          - token: '[folder]/srv/trove'
        ");
    }

    #[test]
    fn test_legacy_format_preserves_order() {
        let legacy: LegacyRemoteRepositories = serde_yaml::from_str(
            "zeta:\n  href: /srv/zeta\n  priority: 2\nalpha:\n  href: file:///srv/alpha\n",
        )
        .unwrap();

        let names: Vec<_> = legacy.remotes.keys().cloned().collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(legacy.remotes["alpha"].priority, 0);
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = FileConfigurationStore::new(temp.path().join("config"));
        assert!(store.load_remotes().unwrap().is_none());
        assert!(store.load_legacy_remotes().unwrap().is_none());

        let mut remotes = RemoteRepositories::default();
        remotes.add(remote("central", 1)).unwrap();
        store.save_remotes(&remotes).unwrap();

        assert_eq!(store.load_remotes().unwrap(), Some(remotes));
        assert!(store.remotes_path().exists());
    }

    #[test]
    fn test_file_store_reports_malformed_yaml() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(REMOTES_FILE), "remotes: [oops").unwrap();
        let store = FileConfigurationStore::new(temp.path());

        assert!(matches!(
            store.load_remotes(),
            Err(RepoError::InvalidConfig { .. })
        ));
    }
}
