//! Remote repository manager
//!
//! Turns the persisted remote configuration into ordered repository
//! instances for fetching and publishing.

use std::rc::Rc;

use crate::auth::AuthenticatedRepository;
use crate::config::{ConfigurationStore, RemoteEndpoint, RemoteRepositories, RemoteRepository};
use crate::error::Result;
use crate::factory::{RepositoryFactory, resolve_token, resolve_user_input};
use crate::repository::{RepositoryRef, SupportsAuthentication, SupportsPublishing};

/// Selects, orders and authenticates configured remotes
pub struct RemoteManager<S: ConfigurationStore> {
    store: S,
    factories: Vec<Box<dyn RepositoryFactory>>,
}

impl<S: ConfigurationStore> RemoteManager<S> {
    pub fn new(store: S, factories: Vec<Box<dyn RepositoryFactory>>) -> Self {
        Self { store, factories }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current remotes, migrating the legacy format the first time
    pub fn load_remotes(&self) -> Result<RemoteRepositories> {
        if let Some(remotes) = self.store.load_remotes()? {
            return Ok(remotes);
        }

        let Some(legacy) = self.store.load_legacy_remotes()? else {
            return Ok(RemoteRepositories::default());
        };

        let mut remotes = RemoteRepositories::default();
        for (name, entry) in &legacy.remotes {
            let Some(repository) = self.resolve_user_input(&entry.href)? else {
                tracing::warn!("Dropping legacy remote {}: cannot resolve {}", name, entry.href);
                continue;
            };

            let token = repository.token().to_string();
            let mut remote =
                RemoteRepository::new(name.clone(), entry.priority, RemoteEndpoint::new(&token));
            if repository.feature::<dyn SupportsPublishing>().is_some() {
                remote = remote.with_publish(RemoteEndpoint::new(token));
            }
            if let Err(e) = remotes.add(remote) {
                tracing::warn!("Dropping legacy remote {}: {}", name, e);
            }
        }

        tracing::info!("Migrated {} legacy remote(s)", remotes.remotes.len());
        self.store.save_remotes(&remotes)?;
        Ok(remotes)
    }

    pub fn save_remotes(&self, remotes: &RemoteRepositories) -> Result<()> {
        self.store.save_remotes(remotes)
    }

    /// Resolve a user-typed locator through the factory chain
    pub fn resolve_user_input(&self, input: &str) -> Result<Option<RepositoryRef>> {
        resolve_user_input(&self.factories, input)
    }

    /// Repositories to read from, ambient first, then by priority
    pub fn fetch_repositories(&self, hint: Option<&str>) -> Result<Vec<RepositoryRef>> {
        let remotes = self.load_remotes()?;
        let hint = hint.filter(|h| !h.is_empty());

        let mut repositories = Vec::new();
        if let Some(ambient) = self.ambient(hint, &remotes)? {
            repositories.push(ambient);
        }

        for remote in remotes.ordered(hint) {
            match self.from_endpoint(&remote.fetch)? {
                Some(repository) => repositories.push(repository),
                None => tracing::warn!(
                    "Skipping remote {}: cannot resolve {}",
                    remote.name,
                    remote.fetch.token
                ),
            }
        }

        Ok(repositories)
    }

    /// Publish targets grouped per remote
    ///
    /// Only remotes with publish endpoints contribute a group. A group keeps
    /// its place even when none of its endpoints resolve.
    pub fn publish_repositories(&self, hint: Option<&str>) -> Result<Vec<Vec<RepositoryRef>>> {
        let remotes = self.load_remotes()?;
        let hint = hint.filter(|h| !h.is_empty());

        let mut groups = Vec::new();
        if let Some(ambient) = self.ambient(hint, &remotes)? {
            groups.push(vec![ambient]);
        }

        for remote in remotes.ordered(hint) {
            if remote.publish.is_empty() {
                continue;
            }
            let mut group = Vec::new();
            for endpoint in &remote.publish {
                match self.from_endpoint(endpoint)? {
                    Some(repository) => group.push(repository),
                    None => tracing::warn!(
                        "Skipping publish endpoint {} of {}",
                        endpoint.token,
                        remote.name
                    ),
                }
            }
            groups.push(group);
        }

        Ok(groups)
    }

    /// A repository named by `hint` that is not a configured remote
    fn ambient(
        &self,
        hint: Option<&str>,
        remotes: &RemoteRepositories,
    ) -> Result<Option<RepositoryRef>> {
        match hint {
            Some(hint) if remotes.get(hint).is_none() => {
                let ambient = self.resolve_user_input(hint)?;
                if ambient.is_some() {
                    tracing::debug!("Using ambient repository {}", hint);
                }
                Ok(ambient)
            }
            _ => Ok(None),
        }
    }

    fn from_endpoint(&self, endpoint: &RemoteEndpoint) -> Result<Option<RepositoryRef>> {
        let repository = resolve_token(&self.factories, &endpoint.token)?;
        Ok(repository.map(|r| inject_authentication(r, endpoint)))
    }
}

/// Wrap `repository` when the endpoint has a username and the repository
/// accepts credentials
fn inject_authentication(repository: RepositoryRef, endpoint: &RemoteEndpoint) -> RepositoryRef {
    let Some(credentials) = endpoint.credentials() else {
        return repository;
    };
    if repository.feature::<dyn SupportsAuthentication>().is_none() {
        tracing::debug!("{} does not accept credentials", repository.name());
        return repository;
    }
    Rc::new(AuthenticatedRepository::new(repository, credentials))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LegacyRemote, LegacyRemoteRepositories, MemoryConfigurationStore};
    use crate::factory::StaticRepositoryFactory;
    use crate::memory::{InMemoryRepository, MemoryFeatures};

    fn remote(name: &str, priority: i32) -> RemoteRepository {
        RemoteRepository::new(name, priority, RemoteEndpoint::new(format!("[memory]{}", name)))
            .with_publish(RemoteEndpoint::new(format!("[memory]{}", name)))
    }

    fn factory(names: &[&str]) -> Vec<Box<dyn RepositoryFactory>> {
        let mut factory = StaticRepositoryFactory::new();
        for name in names {
            factory = factory.with(InMemoryRepository::new(*name));
        }
        vec![Box::new(factory)]
    }

    fn manager(
        remotes: Vec<RemoteRepository>,
        repositories: &[&str],
    ) -> RemoteManager<MemoryConfigurationStore> {
        let config = RemoteRepositories {
            remotes,
            ..Default::default()
        };
        RemoteManager::new(
            MemoryConfigurationStore::with_remotes(config),
            factory(repositories),
        )
    }

    fn names(repositories: &[RepositoryRef]) -> Vec<&str> {
        repositories.iter().map(|r| r.name()).collect()
    }

    #[test]
    fn test_fetch_orders_by_priority_with_hint_first() {
        let manager = manager(
            vec![remote("A", 5), remote("B", 1), remote("C", 10)],
            &["A", "B", "C"],
        );

        let repositories = manager.fetch_repositories(None).unwrap();
        assert_eq!(names(&repositories), vec!["B", "A", "C"]);

        let repositories = manager.fetch_repositories(Some("A")).unwrap();
        assert_eq!(names(&repositories), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_fetch_drops_unresolvable_remotes() {
        let manager = manager(vec![remote("A", 1), remote("gone", 2)], &["A"]);

        let repositories = manager.fetch_repositories(None).unwrap();
        assert_eq!(names(&repositories), vec!["A"]);
    }

    #[test]
    fn test_ambient_repository_is_prepended() {
        let manager = manager(vec![remote("A", 1)], &["A", "mirror"]);

        let repositories = manager.fetch_repositories(Some("mirror")).unwrap();
        assert_eq!(names(&repositories), vec!["mirror", "A"]);

        let repositories = manager.fetch_repositories(Some("nowhere")).unwrap();
        assert_eq!(names(&repositories), vec!["A"]);
    }

    #[test]
    fn test_publish_groups() {
        let fetch_only = RemoteRepository::new("R", 0, RemoteEndpoint::new("[memory]R"));
        let partial = RemoteRepository::new("P", 2, RemoteEndpoint::new("[memory]P1"))
            .with_publish(RemoteEndpoint::new("[memory]P1"))
            .with_publish(RemoteEndpoint::new("[memory]missing"));
        let broken = RemoteRepository::new("X", 3, RemoteEndpoint::new("[memory]X"))
            .with_publish(RemoteEndpoint::new("[memory]missing"));
        let manager = manager(
            vec![fetch_only, partial, broken, remote("A", 1)],
            &["R", "P1", "A", "mirror"],
        );

        let groups = manager.publish_repositories(None).unwrap();
        let group_names: Vec<Vec<&str>> = groups.iter().map(|g| names(g)).collect();
        assert_eq!(group_names, vec![vec!["A"], vec!["P1"], vec![]]);

        let groups = manager.publish_repositories(Some("mirror")).unwrap();
        assert_eq!(groups.len(), 4);
        assert_eq!(names(&groups[0]), vec!["mirror"]);
    }

    #[test]
    fn test_credentials_injected_when_supported() {
        let secured = InMemoryRepository::with_features(
            "secured",
            MemoryFeatures {
                publish: true,
                clean: false,
                authenticate: true,
            },
        );
        let plain = InMemoryRepository::new("plain");
        let config = RemoteRepositories {
            remotes: vec![
                RemoteRepository::new(
                    "secured",
                    1,
                    RemoteEndpoint::new("[memory]secured").with_credentials("alice", "pw"),
                ),
                RemoteRepository::new(
                    "plain",
                    2,
                    RemoteEndpoint::new("[memory]plain").with_credentials("bob", "pw"),
                ),
            ],
            ..Default::default()
        };
        let factories: Vec<Box<dyn RepositoryFactory>> = vec![Box::new(
            StaticRepositoryFactory::new()
                .with(secured.clone())
                .with(plain.clone()),
        )];
        let manager = RemoteManager::new(MemoryConfigurationStore::with_remotes(config), factories);

        let repositories = manager.fetch_repositories(None).unwrap();
        assert_eq!(names(&repositories), vec!["secured", "plain"]);
        assert_eq!(repositories[0].token(), "[memory]secured");

        for repository in &repositories {
            repository.refresh_packages().unwrap();
        }
        assert_eq!(secured.credential_log(), vec![Some("alice".to_string())]);
        assert!(secured.current_credentials().is_none());
    }

    #[test]
    fn test_legacy_migration_runs_once() {
        let mut legacy = LegacyRemoteRepositories::default();
        legacy.remotes.insert(
            "central".to_string(),
            LegacyRemote {
                href: "central".to_string(),
                priority: 3,
            },
        );
        legacy.remotes.insert(
            "mirror".to_string(),
            LegacyRemote {
                href: "mirror".to_string(),
                priority: 1,
            },
        );
        legacy.remotes.insert(
            "dead".to_string(),
            LegacyRemote {
                href: "http://nowhere".to_string(),
                priority: 0,
            },
        );

        let factories: Vec<Box<dyn RepositoryFactory>> = vec![Box::new(
            StaticRepositoryFactory::new()
                .with(InMemoryRepository::new("central"))
                .with(InMemoryRepository::read_only("mirror")),
        )];
        let manager = RemoteManager::new(MemoryConfigurationStore::with_legacy(legacy), factories);

        let remotes = manager.load_remotes().unwrap();
        assert_eq!(remotes.names(), vec!["central", "mirror"]);

        let central = remotes.get("central").unwrap();
        assert_eq!(central.priority, 3);
        assert_eq!(central.fetch.token, "[memory]central");
        assert_eq!(central.publish, vec![RemoteEndpoint::new("[memory]central")]);
        assert!(remotes.get("mirror").unwrap().publish.is_empty());
        assert_eq!(manager.store().save_count(), 1);

        let again = manager.load_remotes().unwrap();
        assert_eq!(again, remotes);
        manager.fetch_repositories(None).unwrap();
        assert_eq!(manager.store().save_count(), 1);
    }

    #[test]
    fn test_no_configuration_is_empty_and_unsaved() {
        let manager = RemoteManager::new(MemoryConfigurationStore::new(), factory(&[]));

        assert!(manager.load_remotes().unwrap().is_empty());
        assert!(manager.fetch_repositories(None).unwrap().is_empty());
        assert_eq!(manager.store().save_count(), 0);
    }
}
