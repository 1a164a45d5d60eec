//! Repository capability contract
//!
//! Every repository implements [`PackageRepository`]. Anything beyond reading
//! (publishing, cleaning, authentication, anchoring) is an optional capability
//! probed at runtime with [`feature`](trait.PackageRepository.html#method.feature):
//!
//! ```rust,ignore
//! if let Some(publisher) = repository.feature::<dyn SupportsPublishing>() {
//!     publisher.publish("foo-1.0.trove", &mut stream)?;
//! }
//! ```
//!
//! A repository that lacks a capability returns `None`. That is never an
//! error; callers skip silently.

use indexmap::IndexMap;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::rc::Rc;
use trove_core::{PackageDependency, PackageIdentifier, Version};

use crate::auth::Credentials;
use crate::error::Result;

/// Shared handle to a package entry
pub type PackageRef = Rc<dyn PackageInfo>;

/// Shared handle to a repository
pub type RepositoryRef = Rc<dyn PackageRepository>;

/// Lazily produced removal reports
pub type Removals<'a> = Box<dyn Iterator<Item = Result<PackageRef>> + 'a>;

/// Lazily produced anchoring reports
pub type AnchorOutcomes<'a> = Box<dyn Iterator<Item = Result<AnchorOutcome>> + 'a>;

/// A package entry owned by exactly one repository
pub trait PackageInfo: fmt::Debug {
    fn identifier(&self) -> &PackageIdentifier;

    fn name(&self) -> &str {
        &self.identifier().name
    }

    fn version(&self) -> &Version {
        &self.identifier().version
    }

    fn full_name(&self) -> String {
        self.identifier().full_name()
    }

    /// Owning repository, `None` once it has been dropped. Provenance only.
    fn source(&self) -> Option<RepositoryRef>;

    /// Token of the owning repository
    fn source_token(&self) -> &str;

    /// Read the package archive bytes
    fn open_stream(&self) -> Result<Box<dyn Read + '_>>;

    /// Directory holding the expanded package content, for repositories that
    /// keep packages on local disk. May expand the package on first access.
    fn content_directory(&self) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Two entries denote the same package when identifiers and owners match
pub fn is_same_package(a: &dyn PackageInfo, b: &dyn PackageInfo) -> bool {
    a.identifier() == b.identifier() && a.source_token() == b.source_token()
}

/// Packages grouped by case-insensitive name, in discovery order
#[derive(Debug, Clone, Default)]
pub struct PackageIndex {
    by_name: IndexMap<String, Vec<PackageRef>>,
}

impl PackageIndex {
    pub fn from_packages<I>(packages: I) -> Self
    where
        I: IntoIterator<Item = PackageRef>,
    {
        let mut by_name: IndexMap<String, Vec<PackageRef>> = IndexMap::new();
        for package in packages {
            by_name
                .entry(package.name().to_ascii_lowercase())
                .or_default()
                .push(package);
        }
        Self { by_name }
    }

    /// All versions of a package, empty when unknown
    pub fn get(&self, name: &str) -> &[PackageRef] {
        self.by_name
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.get(name).is_empty()
    }

    /// Find an entry by `<name>-<version>`
    pub fn find_by_full_name(&self, full_name: &str) -> Option<&PackageRef> {
        let identifier = PackageIdentifier::parse_full_name(full_name).ok()?;
        self.get(&identifier.name)
            .iter()
            .find(|p| *p.identifier() == identifier)
    }

    /// Highest version of a package
    pub fn latest(&self, name: &str) -> Option<&PackageRef> {
        self.get(name).iter().max_by_key(|p| *p.version())
    }

    /// Highest version of every package name
    pub fn latest_versions(&self) -> Vec<PackageRef> {
        self.by_name
            .values()
            .filter_map(|versions| versions.iter().max_by_key(|p| *p.version()))
            .cloned()
            .collect()
    }

    /// Package names as first discovered
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name
            .values()
            .filter_map(|versions| versions.first())
            .map(|p| p.name())
    }

    pub fn packages(&self) -> impl Iterator<Item = &PackageRef> {
        self.by_name.values().flatten()
    }

    /// Number of package entries (not names)
    pub fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// The contract every repository implements
pub trait PackageRepository: fmt::Debug {
    fn name(&self) -> &str;

    /// Opaque, stable identity used for equality and re-resolution
    fn token(&self) -> &str;

    fn repository_type(&self) -> &str;

    /// Current index, as of the last refresh or mutation
    fn packages_by_name(&self) -> PackageIndex;

    /// Rebuild the index from the backing store
    fn refresh_packages(&self) -> Result<()>;

    /// Every package satisfying `dependency`, not only the best one
    fn find_all(&self, dependency: &PackageDependency) -> Vec<PackageRef> {
        self.packages_by_name()
            .get(dependency.name())
            .iter()
            .filter(|p| dependency.is_satisfied_by(p.version()))
            .cloned()
            .collect()
    }

    fn publishing(&self) -> Option<&(dyn SupportsPublishing + 'static)> {
        None
    }

    fn cleaning(&self) -> Option<&(dyn SupportsCleaning + 'static)> {
        None
    }

    fn authentication(&self) -> Option<&(dyn SupportsAuthentication + 'static)> {
        None
    }

    fn anchoring(&self) -> Option<&(dyn SupportsAnchoring + 'static)> {
        None
    }
}

impl dyn PackageRepository {
    /// Probe an optional capability, e.g. `repo.feature::<dyn SupportsCleaning>()`
    pub fn feature<F: RepositoryFeature + ?Sized>(&self) -> Option<&F> {
        F::probe(self)
    }

    /// Token equality
    pub fn is_same_repository(&self, other: &dyn PackageRepository) -> bool {
        self.token() == other.token()
    }
}

/// A capability that can be probed on any repository
pub trait RepositoryFeature {
    fn probe(repository: &dyn PackageRepository) -> Option<&Self>;
}

/// Accepts new package archives
pub trait SupportsPublishing {
    /// Store `stream` under `file_name`. `Ok(None)` when an archive with that
    /// name already exists.
    fn publish(&self, file_name: &str, stream: &mut dyn Read) -> Result<Option<PackageRef>>;
}

/// Removes every package except a keep-set
pub trait SupportsCleaning {
    /// Removal happens as the returned iterator is consumed
    fn clean(&self, keep: &[PackageRef]) -> Removals<'_>;
}

/// Accepts credentials for subsequent calls
pub trait SupportsAuthentication {
    /// `None` clears the current credentials
    fn set_credentials(&self, credentials: Option<Credentials>);
}

/// Maintains stable per-name paths to expanded package content
pub trait SupportsAnchoring {
    fn anchor(&self, packages: &[PackageRef]) -> AnchorOutcomes<'_>;
}

impl RepositoryFeature for dyn SupportsPublishing {
    fn probe(repository: &dyn PackageRepository) -> Option<&Self> {
        repository.publishing()
    }
}

impl RepositoryFeature for dyn SupportsCleaning {
    fn probe(repository: &dyn PackageRepository) -> Option<&Self> {
        repository.cleaning()
    }
}

impl RepositoryFeature for dyn SupportsAuthentication {
    fn probe(repository: &dyn PackageRepository) -> Option<&Self> {
        repository.authentication()
    }
}

impl RepositoryFeature for dyn SupportsAnchoring {
    fn probe(repository: &dyn PackageRepository) -> Option<&Self> {
        repository.anchoring()
    }
}

/// Result of anchoring one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorOutcome {
    /// The anchor was created or replaced
    Anchored { package: String, path: PathBuf },
    /// The anchor already pointed at this package
    Unchanged { package: String, path: PathBuf },
}

impl fmt::Display for AnchorOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorOutcome::Anchored { package, path } => {
                write!(f, "Anchored '{}' at '{}'", package, path.display())
            }
            AnchorOutcome::Unchanged { package, path } => {
                write!(f, "'{}' already anchored at '{}'", package, path.display())
            }
        }
    }
}
