//! In-memory repository
//!
//! Holds packages in memory. Useful for embedding and for tests without
//! touching the filesystem. The advertised capabilities are chosen at
//! construction time.

use std::cell::RefCell;
use std::io::Read;
use std::rc::{Rc, Weak};
use trove_core::package::archive_stem;
use trove_core::{PackageIdentifier, normalize_file_name};

use crate::auth::Credentials;
use crate::error::{RepoError, Result};
use crate::repository::{
    PackageIndex, PackageInfo, PackageRef, PackageRepository, Removals, RepositoryRef,
    SupportsAuthentication, SupportsCleaning, SupportsPublishing, is_same_package,
};

/// Capabilities an in-memory repository advertises
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryFeatures {
    pub publish: bool,
    pub clean: bool,
    pub authenticate: bool,
}

impl Default for MemoryFeatures {
    fn default() -> Self {
        Self {
            publish: true,
            clean: true,
            authenticate: false,
        }
    }
}

/// Repository backed by a `Vec` of packages
#[derive(Debug)]
pub struct InMemoryRepository {
    name: String,
    token: String,
    features: MemoryFeatures,
    packages: RefCell<Vec<Rc<MemoryPackage>>>,
    credentials: RefCell<Option<Credentials>>,
    /// Username in effect at each publish/refresh, for assertions
    credential_log: RefCell<Vec<Option<String>>>,
    this: Weak<InMemoryRepository>,
}

impl InMemoryRepository {
    /// Publishing and cleaning repository
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Self::with_features(name, MemoryFeatures::default())
    }

    /// Repository without any optional capability
    pub fn read_only(name: impl Into<String>) -> Rc<Self> {
        Self::with_features(
            name,
            MemoryFeatures {
                publish: false,
                clean: false,
                authenticate: false,
            },
        )
    }

    pub fn with_features(name: impl Into<String>, features: MemoryFeatures) -> Rc<Self> {
        let name = name.into();
        Rc::new_cyclic(|this| Self {
            token: format!("[memory]{}", name),
            name,
            features,
            packages: RefCell::new(Vec::new()),
            credentials: RefCell::new(None),
            credential_log: RefCell::new(Vec::new()),
            this: this.clone(),
        })
    }

    /// Add a package directly to the backing store
    pub fn add_package(&self, name: &str, version: &str, bytes: &[u8]) -> Result<PackageRef> {
        let identifier = PackageIdentifier::new(name, version.parse()?);
        Ok(self.insert(identifier, bytes.to_vec()))
    }

    /// Usernames seen by publish/refresh calls, in call order
    pub fn credential_log(&self) -> Vec<Option<String>> {
        self.credential_log.borrow().clone()
    }

    pub fn current_credentials(&self) -> Option<Credentials> {
        self.credentials.borrow().clone()
    }

    fn insert(&self, identifier: PackageIdentifier, bytes: Vec<u8>) -> PackageRef {
        let package = Rc::new(MemoryPackage {
            identifier,
            bytes,
            token: self.token.clone(),
            source: self.this.clone(),
        });
        self.packages.borrow_mut().push(package.clone());
        package
    }

    fn record_credentials(&self) {
        if self.features.authenticate {
            let username = self
                .credentials
                .borrow()
                .as_ref()
                .map(|c| c.username().to_string());
            self.credential_log.borrow_mut().push(username);
        }
    }
}

impl PackageRepository for InMemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn token(&self) -> &str {
        &self.token
    }

    fn repository_type(&self) -> &str {
        "memory"
    }

    fn packages_by_name(&self) -> PackageIndex {
        PackageIndex::from_packages(
            self.packages
                .borrow()
                .iter()
                .map(|p| p.clone() as PackageRef),
        )
    }

    fn refresh_packages(&self) -> Result<()> {
        // The package list is the backing store
        self.record_credentials();
        Ok(())
    }

    fn publishing(&self) -> Option<&(dyn SupportsPublishing + 'static)> {
        self.features
            .publish
            .then_some(self as &(dyn SupportsPublishing + 'static))
    }

    fn cleaning(&self) -> Option<&(dyn SupportsCleaning + 'static)> {
        self.features
            .clean
            .then_some(self as &(dyn SupportsCleaning + 'static))
    }

    fn authentication(&self) -> Option<&(dyn SupportsAuthentication + 'static)> {
        self.features
            .authenticate
            .then_some(self as &(dyn SupportsAuthentication + 'static))
    }
}

impl SupportsPublishing for InMemoryRepository {
    fn publish(&self, file_name: &str, stream: &mut dyn Read) -> Result<Option<PackageRef>> {
        self.record_credentials();

        let file_name = normalize_file_name(file_name);
        let identifier = archive_stem(&file_name)
            .and_then(|stem| PackageIdentifier::parse_full_name(stem).ok())
            .ok_or_else(|| RepoError::InvalidPackageFileName {
                file_name: file_name.clone(),
            })?;

        if self
            .packages
            .borrow()
            .iter()
            .any(|p| p.identifier == identifier)
        {
            return Ok(None);
        }

        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes)?;
        Ok(Some(self.insert(identifier, bytes)))
    }
}

impl SupportsCleaning for InMemoryRepository {
    fn clean(&self, keep: &[PackageRef]) -> Removals<'_> {
        let doomed: Vec<Rc<MemoryPackage>> = self
            .packages
            .borrow()
            .iter()
            .filter(|p| !keep.iter().any(|k| is_same_package(&***p, &**k)))
            .cloned()
            .collect();

        Box::new(doomed.into_iter().map(move |package| {
            self.packages
                .borrow_mut()
                .retain(|p| !Rc::ptr_eq(p, &package));
            Ok(package as PackageRef)
        }))
    }
}

impl SupportsAuthentication for InMemoryRepository {
    fn set_credentials(&self, credentials: Option<Credentials>) {
        *self.credentials.borrow_mut() = credentials;
    }
}

/// A package held by an [`InMemoryRepository`]
#[derive(Debug)]
pub struct MemoryPackage {
    identifier: PackageIdentifier,
    bytes: Vec<u8>,
    token: String,
    source: Weak<InMemoryRepository>,
}

impl PackageInfo for MemoryPackage {
    fn identifier(&self) -> &PackageIdentifier {
        &self.identifier
    }

    fn source(&self) -> Option<RepositoryRef> {
        self.source.upgrade().map(|repo| repo as RepositoryRef)
    }

    fn source_token(&self) -> &str {
        &self.token
    }

    fn open_stream(&self) -> Result<Box<dyn Read + '_>> {
        Ok(Box::new(self.bytes.as_slice()))
    }
}
