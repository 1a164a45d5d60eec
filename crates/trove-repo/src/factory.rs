//! Repository factories
//!
//! A factory turns a persisted token or a user-supplied locator into a
//! repository instance. Factories are consulted in order and the first one
//! returning a repository wins.

use std::path::PathBuf;
use url::Url;

use crate::error::Result;
use crate::folder::{FOLDER_TOKEN_PREFIX, FolderRepository};
use crate::repository::RepositoryRef;

/// Resolves repositories from tokens and user input
pub trait RepositoryFactory {
    /// Rebuild a repository from its token, `None` if the token is not ours
    fn from_token(&self, token: &str) -> Result<Option<RepositoryRef>>;

    /// Resolve a user-typed locator, `None` if it is not ours
    fn from_user_input(&self, input: &str) -> Result<Option<RepositoryRef>>;
}

/// First repository any factory builds from `token`
pub fn resolve_token(
    factories: &[Box<dyn RepositoryFactory>],
    token: &str,
) -> Result<Option<RepositoryRef>> {
    for factory in factories {
        if let Some(repository) = factory.from_token(token)? {
            return Ok(Some(repository));
        }
    }
    Ok(None)
}

/// First repository any factory builds from `input`
pub fn resolve_user_input(
    factories: &[Box<dyn RepositoryFactory>],
    input: &str,
) -> Result<Option<RepositoryRef>> {
    for factory in factories {
        if let Some(repository) = factory.from_user_input(input)? {
            return Ok(Some(repository));
        }
    }
    Ok(None)
}

/// Resolves local directories into [`FolderRepository`] instances
#[derive(Debug, Clone, Default)]
pub struct FolderRepositoryFactory {
    anchors_enabled: bool,
}

impl FolderRepositoryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build anchored repositories
    pub fn anchored() -> Self {
        Self {
            anchors_enabled: true,
        }
    }

    fn open(&self, path: PathBuf) -> Result<Option<RepositoryRef>> {
        if !path.is_dir() {
            tracing::debug!("{} is not a directory", path.display());
            return Ok(None);
        }
        let repository: RepositoryRef = FolderRepository::new(&path, self.anchors_enabled)?;
        Ok(Some(repository))
    }
}

impl RepositoryFactory for FolderRepositoryFactory {
    fn from_token(&self, token: &str) -> Result<Option<RepositoryRef>> {
        match token.strip_prefix(FOLDER_TOKEN_PREFIX) {
            Some(path) => self.open(PathBuf::from(path)),
            None => Ok(None),
        }
    }

    fn from_user_input(&self, input: &str) -> Result<Option<RepositoryRef>> {
        if input.starts_with("file://") {
            return match Url::parse(input).ok().and_then(|url| url.to_file_path().ok()) {
                Some(path) => self.open(path),
                None => Ok(None),
            };
        }
        if input.is_empty() || input.starts_with(FOLDER_TOKEN_PREFIX) {
            return Ok(None);
        }
        self.open(PathBuf::from(input))
    }
}

/// Resolves a fixed set of repositories by token or by name
///
/// Lets callers inject repositories the shipped factories cannot build.
#[derive(Debug, Default)]
pub struct StaticRepositoryFactory {
    repositories: Vec<RepositoryRef>,
}

impl StaticRepositoryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, repository: RepositoryRef) -> Self {
        self.repositories.push(repository);
        self
    }
}

impl RepositoryFactory for StaticRepositoryFactory {
    fn from_token(&self, token: &str) -> Result<Option<RepositoryRef>> {
        Ok(self
            .repositories
            .iter()
            .find(|r| r.token() == token)
            .cloned())
    }

    fn from_user_input(&self, input: &str) -> Result<Option<RepositoryRef>> {
        Ok(self
            .repositories
            .iter()
            .find(|r| r.name().eq_ignore_ascii_case(input))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRepository;
    use tempfile::TempDir;

    #[test]
    fn test_folder_factory_round_trips_token() {
        let temp = TempDir::new().unwrap();
        let factory = FolderRepositoryFactory::new();

        let repository = factory
            .from_user_input(&temp.path().display().to_string())
            .unwrap()
            .unwrap();
        assert_eq!(repository.repository_type(), "folder");

        let again = factory.from_token(repository.token()).unwrap().unwrap();
        assert!(again.is_same_repository(repository.as_ref()));
    }

    #[test]
    fn test_folder_factory_accepts_file_urls() {
        let temp = TempDir::new().unwrap();
        let url = Url::from_directory_path(temp.path()).unwrap();

        let repository = FolderRepositoryFactory::new()
            .from_user_input(url.as_str())
            .unwrap();
        assert!(repository.is_some());
    }

    #[test]
    fn test_folder_factory_ignores_missing_and_foreign_input() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing");
        let factory = FolderRepositoryFactory::new();

        assert!(factory
            .from_user_input(&missing.display().to_string())
            .unwrap()
            .is_none());
        assert!(factory
            .from_token(&format!("[folder]{}", missing.display()))
            .unwrap()
            .is_none());
        assert!(factory.from_token("[memory]central").unwrap().is_none());
        assert!(factory.from_user_input("").unwrap().is_none());
    }

    #[test]
    fn test_first_factory_wins() {
        let memory: RepositoryRef = InMemoryRepository::new("central");
        let factories: Vec<Box<dyn RepositoryFactory>> = vec![
            Box::new(FolderRepositoryFactory::new()),
            Box::new(StaticRepositoryFactory::new().with(memory.clone())),
        ];

        let by_token = resolve_token(&factories, "[memory]central").unwrap().unwrap();
        assert!(by_token.is_same_repository(memory.as_ref()));

        let by_name = resolve_user_input(&factories, "Central").unwrap().unwrap();
        assert!(by_name.is_same_repository(memory.as_ref()));

        assert!(resolve_token(&factories, "[memory]other").unwrap().is_none());
    }
}
