//! Trove Repository Federation
//!
//! This crate provides the repository layer of Trove, including:
//!
//! - **Folder repositories**: archives in a local directory with an expansion cache
//! - **In-memory repositories**: for embedding and tests
//! - **Remotes**: configured, prioritised and authenticated repository lists
//! - **Propagation**: copying resolved packages toward nearer repositories
//!
//! ## Capabilities
//!
//! Publishing, cleaning, authentication and anchoring are optional. Probe for
//! them instead of assuming:
//!
//! ```rust,no_run
//! use trove_repo::{FolderRepository, RepositoryRef, SupportsPublishing};
//!
//! # fn example() -> trove_repo::Result<()> {
//! let repository: RepositoryRef = FolderRepository::new("/srv/trove", false)?;
//! if let Some(publisher) = repository.feature::<dyn SupportsPublishing>() {
//!     let mut archive = std::fs::File::open("moq-4.0.trove")?;
//!     publisher.publish("moq-4.0.trove", &mut archive)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Propagation
//!
//! ```rust,no_run
//! use trove_repo::{RepositoryRef, copy_packages_to_repositories, resolve};
//!
//! # fn example(read: Vec<RepositoryRef>, write: Vec<RepositoryRef>) {
//! let dependencies: Vec<trove_core::PackageDependency> = vec!["nunit >= 2.5".parse().unwrap()];
//! let resolution = resolve(&dependencies, &read);
//! for event in copy_packages_to_repositories(&resolution, &write) {
//!     match event {
//!         Ok(event) => println!("{}", event),
//!         Err(e) => eprintln!("{}", e),
//!     }
//! }
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod factory;
pub mod folder;
pub mod memory;
pub mod propagate;
pub mod remote;
pub mod repository;
pub mod resolve;

// Re-exports for convenience
pub use auth::{AuthenticatedRepository, CredentialScope, Credentials};
pub use config::{
    ConfigurationStore, FileConfigurationStore, LegacyRemote, LegacyRemoteRepositories,
    MemoryConfigurationStore, RemoteEndpoint, RemoteRepositories, RemoteRepository,
};
pub use error::{RepoError, Result};
pub use factory::{FolderRepositoryFactory, RepositoryFactory, StaticRepositoryFactory};
pub use folder::{FolderPackage, FolderRepository};
pub use memory::{InMemoryRepository, MemoryFeatures};
pub use propagate::{Propagation, PropagationEvent, Severity, copy_packages_to_repositories};
pub use remote::RemoteManager;
pub use repository::{
    AnchorOutcome, PackageIndex, PackageInfo, PackageRef, PackageRepository, RepositoryFeature,
    RepositoryRef, SupportsAnchoring, SupportsAuthentication, SupportsCleaning,
    SupportsPublishing, is_same_package,
};
pub use resolve::{DependencyResolution, ResolvedDependency, resolve, select_best};
