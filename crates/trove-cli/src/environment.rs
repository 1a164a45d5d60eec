//! Repository environment for a command
//!
//! Read order: project, system, remotes. Write order: remotes, system,
//! project, so propagation always moves packages toward the project.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use trove_repo::{
    FileConfigurationStore, FolderRepository, FolderRepositoryFactory, RemoteManager,
    RepositoryFactory, RepositoryRef,
};

use crate::error::{CliError, Result};

/// Locations given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Locations {
    pub config_dir: Option<PathBuf>,
    pub system_repository: Option<PathBuf>,
    pub project_repository: Option<PathBuf>,
}

pub struct Environment {
    remotes: RemoteManager<FileConfigurationStore>,
    system_path: PathBuf,
    project_path: Option<PathBuf>,
}

impl Environment {
    pub fn new(locations: &Locations) -> Result<Self> {
        let store = match &locations.config_dir {
            Some(dir) => FileConfigurationStore::new(dir),
            None => FileConfigurationStore::user()?,
        };
        tracing::debug!("Remote configuration in {}", store.dir().display());

        let system_path = match &locations.system_repository {
            Some(path) => path.clone(),
            None => default_system_repository()?,
        };

        Ok(Self {
            remotes: RemoteManager::new(store, factories()),
            system_path,
            project_path: locations.project_repository.clone(),
        })
    }

    pub fn remotes(&self) -> &RemoteManager<FileConfigurationStore> {
        &self.remotes
    }

    /// The per-user repository, created on first use
    pub fn system_repository(&self) -> Result<Rc<FolderRepository>> {
        Ok(FolderRepository::with_name(
            "system",
            &self.system_path,
            false,
        )?)
    }

    /// The anchored project repository, when one is configured
    pub fn project_repository(&self) -> Result<Option<Rc<FolderRepository>>> {
        match &self.project_path {
            Some(path) => Ok(Some(FolderRepository::with_name("project", path, true)?)),
            None => Ok(None),
        }
    }

    /// An existing folder repository given by path
    pub fn existing_repository(&self, path: &Path) -> Result<Rc<FolderRepository>> {
        if !path.is_dir() {
            return Err(CliError::usage(format!(
                "Repository directory '{}' does not exist",
                path.display()
            )));
        }
        Ok(FolderRepository::new(path, false)?)
    }
}

/// Repositories to resolve against, nearest first
pub fn read_chain(
    project: Option<&Rc<FolderRepository>>,
    system: &Rc<FolderRepository>,
    remotes: &[RepositoryRef],
) -> Vec<RepositoryRef> {
    let mut chain: Vec<RepositoryRef> = Vec::new();
    if let Some(project) = project {
        chain.push(project.clone());
    }
    chain.push(system.clone());
    chain.extend(remotes.iter().cloned());
    chain
}

/// Repositories to propagate along, farthest first
pub fn write_chain(
    project: Option<&Rc<FolderRepository>>,
    system: &Rc<FolderRepository>,
    remotes: &[RepositoryRef],
) -> Vec<RepositoryRef> {
    let mut chain: Vec<RepositoryRef> = remotes.to_vec();
    chain.push(system.clone());
    if let Some(project) = project {
        chain.push(project.clone());
    }
    chain
}

fn factories() -> Vec<Box<dyn RepositoryFactory>> {
    vec![Box::new(FolderRepositoryFactory::new())]
}

fn default_system_repository() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        CliError::usage_with_help(
            "Could not determine data directory",
            "Pass --system-repository or set TROVE_SYSTEM_REPOSITORY",
        )
    })?;
    Ok(data_dir.join("trove").join("packages"))
}
