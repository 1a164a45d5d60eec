//! Local folder repository
//!
//! Layout on disk:
//!
//! ```text
//! <base>/
//! ├── nunit-2.5.trove        # archives
//! ├── moq-4.0.trove
//! ├── _cache/
//! │   └── nunit-2.5/         # expanded content, created on demand
//! └── nunit -> _cache/nunit-2.5   # anchor (anchored repositories only)
//! ```

use std::cell::{OnceCell, RefCell};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use trove_core::archive::extract_archive;
use trove_core::package::archive_stem;
use trove_core::{PackageIdentifier, normalize_file_name};
#[cfg(not(unix))]
use walkdir::WalkDir;

use crate::error::{RepoError, Result};
use crate::repository::{
    AnchorOutcome, AnchorOutcomes, PackageIndex, PackageInfo, PackageRef, PackageRepository,
    Removals, RepositoryRef, SupportsAnchoring, SupportsCleaning, SupportsPublishing,
    is_same_package,
};

/// Subdirectory holding expanded packages
pub const CACHE_DIRECTORY: &str = "_cache";

/// Token prefix for folder repositories
pub const FOLDER_TOKEN_PREFIX: &str = "[folder]";

/// Marker file identifying a copied anchor directory
const ANCHOR_MARKER: &str = ".trove-anchor";

/// Repository stored as archives in a directory
#[derive(Debug)]
pub struct FolderRepository {
    name: String,
    token: String,
    base: PathBuf,
    cache: PathBuf,
    anchors_enabled: bool,
    packages: RefCell<Vec<Rc<FolderPackage>>>,
    this: Weak<FolderRepository>,
}

impl FolderRepository {
    /// Open (creating if needed) the repository at `base`, named after the
    /// directory
    pub fn new(base: impl AsRef<Path>, anchors_enabled: bool) -> Result<Rc<Self>> {
        let base = base.as_ref();
        let name = base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| base.display().to_string());
        Self::with_name(name, base, anchors_enabled)
    }

    pub fn with_name(
        name: impl Into<String>,
        base: impl AsRef<Path>,
        anchors_enabled: bool,
    ) -> Result<Rc<Self>> {
        fs::create_dir_all(base.as_ref().join(CACHE_DIRECTORY))?;
        let base = fs::canonicalize(base.as_ref())?;
        let cache = base.join(CACHE_DIRECTORY);

        let repository = Rc::new_cyclic(|this| Self {
            name: name.into(),
            token: format!("{}{}", FOLDER_TOKEN_PREFIX, base.display()),
            base,
            cache,
            anchors_enabled,
            packages: RefCell::new(Vec::new()),
            this: this.clone(),
        });
        repository.refresh_packages()?;
        Ok(repository)
    }

    pub fn base_path(&self) -> &Path {
        &self.base
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache
    }

    pub fn is_anchored(&self) -> bool {
        self.anchors_enabled
    }

    /// Path of the anchor for a package name
    pub fn anchor_path(&self, name: &str) -> PathBuf {
        self.base.join(name)
    }

    /// Whether a package of this repository has content in the cache
    pub fn is_expanded(&self, package: &dyn PackageInfo) -> bool {
        self.tracked(package)
            .is_some_and(|p| p.cache_directory().is_dir())
    }

    /// Expansion directory for an archive: its file name minus the extension
    fn cache_dir_for(&self, file_name: &str) -> PathBuf {
        self.cache.join(archive_stem(file_name).unwrap_or(file_name))
    }

    fn entry(&self, file_name: &str, identifier: PackageIdentifier) -> FolderPackage {
        let cache_dir = self.cache_dir_for(file_name);
        let layout = if cache_dir.is_dir() {
            Layout::Expanded(cache_dir)
        } else {
            Layout::Compressed {
                cache_dir,
                expanded: OnceCell::new(),
            }
        };

        FolderPackage {
            identifier,
            archive: self.base.join(file_name),
            layout,
            token: self.token.clone(),
            source: self.this.clone(),
        }
    }

    /// The tracked entry for a package, if it belongs to this repository
    fn tracked(&self, package: &dyn PackageInfo) -> Option<Rc<FolderPackage>> {
        if package.source_token() != self.token {
            return None;
        }
        self.packages
            .borrow()
            .iter()
            .find(|p| p.identifier == *package.identifier())
            .cloned()
    }

    fn foreign(&self, package: &dyn PackageInfo) -> RepoError {
        RepoError::ForeignPackage {
            package: package.full_name(),
            repository: self.name.clone(),
        }
    }

    fn remove(&self, package: Rc<FolderPackage>) -> Result<PackageRef> {
        if !Weak::ptr_eq(&package.source, &self.this) {
            return Err(self.foreign(&*package));
        }

        let cache_dir = package.cache_directory();
        if cache_dir.exists() {
            fs::remove_dir_all(cache_dir)?;
        }
        if package.archive.exists() {
            fs::remove_file(&package.archive)?;
        }
        self.packages
            .borrow_mut()
            .retain(|p| !Rc::ptr_eq(p, &package));

        tracing::info!("Removed {} from {}", package.identifier, self.name);
        Ok(package)
    }

    fn anchor_package(&self, package: &PackageRef) -> Result<AnchorOutcome> {
        let owned = self
            .tracked(package.as_ref())
            .ok_or_else(|| self.foreign(package.as_ref()))?;

        let target = owned.expand()?;
        let anchor = self.anchor_path(owned.name());
        let package_name = owned.full_name();

        if anchor_points_at(&anchor, &target, &package_name) {
            return Ok(AnchorOutcome::Unchanged {
                package: package_name,
                path: anchor,
            });
        }

        remove_anchor(&anchor)?;
        create_anchor(&target, &anchor, &package_name)?;
        tracing::info!("Anchored {} at {}", package_name, anchor.display());

        Ok(AnchorOutcome::Anchored {
            package: package_name,
            path: anchor,
        })
    }
}

impl PackageRepository for FolderRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn token(&self) -> &str {
        &self.token
    }

    fn repository_type(&self) -> &str {
        "folder"
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
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.base)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(stem) = archive_stem(&file_name) else {
                continue;
            };
            match PackageIdentifier::parse_full_name(stem) {
                Ok(identifier) if is_reserved_name(&identifier.name) => {
                    tracing::warn!("Skipping {}: '{}' is reserved", file_name, identifier.name)
                }
                Ok(identifier) => found.push((file_name, identifier)),
                Err(_) => tracing::debug!("Skipping {}: no version in file name", file_name),
            }
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));

        let mut seen = HashSet::new();
        let mut packages = Vec::with_capacity(found.len());
        for (file_name, identifier) in found {
            if !seen.insert(identifier.clone()) {
                tracing::warn!(
                    "Ignoring {}: {} is already provided by another archive",
                    file_name,
                    identifier
                );
                continue;
            }
            packages.push(Rc::new(self.entry(&file_name, identifier)));
        }
        tracing::debug!("{} holds {} package(s)", self.name, packages.len());

        *self.packages.borrow_mut() = packages;
        Ok(())
    }

    fn publishing(&self) -> Option<&(dyn SupportsPublishing + 'static)> {
        Some(self)
    }

    fn cleaning(&self) -> Option<&(dyn SupportsCleaning + 'static)> {
        Some(self)
    }

    fn anchoring(&self) -> Option<&(dyn SupportsAnchoring + 'static)> {
        self.anchors_enabled
            .then_some(self as &(dyn SupportsAnchoring + 'static))
    }
}

impl SupportsPublishing for FolderRepository {
    fn publish(&self, file_name: &str, stream: &mut dyn Read) -> Result<Option<PackageRef>> {
        let file_name = normalize_file_name(file_name);
        let identifier = archive_stem(&file_name)
            .and_then(|stem| PackageIdentifier::parse_full_name(stem).ok())
            .filter(|identifier| !is_reserved_name(&identifier.name))
            .ok_or_else(|| RepoError::InvalidPackageFileName {
                file_name: file_name.clone(),
            })?;

        if self
            .packages
            .borrow()
            .iter()
            .any(|p| p.identifier == identifier)
        {
            tracing::debug!("{} already holds {}", self.name, identifier);
            return Ok(None);
        }

        let archive = self.base.join(&file_name);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&archive) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!("{} already exists", archive.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = io::copy(stream, &mut file) {
            drop(file);
            let _ = fs::remove_file(&archive);
            return Err(e.into());
        }

        // A leftover expansion from an earlier copy would shadow the new bytes
        let stale = self.cache_dir_for(&file_name);
        if stale.exists() {
            fs::remove_dir_all(&stale)?;
        }

        let package = Rc::new(self.entry(&file_name, identifier));
        self.packages.borrow_mut().push(package.clone());
        tracing::info!("Published {} to {}", package.identifier, self.name);

        Ok(Some(package))
    }
}

impl SupportsCleaning for FolderRepository {
    fn clean(&self, keep: &[PackageRef]) -> Removals<'_> {
        let doomed: Vec<Rc<FolderPackage>> = self
            .packages
            .borrow()
            .iter()
            .filter(|p| !keep.iter().any(|k| is_same_package(&***p, &**k)))
            .cloned()
            .collect();

        Box::new(doomed.into_iter().map(move |package| self.remove(package)))
    }
}

impl SupportsAnchoring for FolderRepository {
    fn anchor(&self, packages: &[PackageRef]) -> AnchorOutcomes<'_> {
        let packages = packages.to_vec();
        Box::new(
            packages
                .into_iter()
                .map(move |package| self.anchor_package(&package)),
        )
    }
}

/// On-disk representation of a folder package
#[derive(Debug)]
enum Layout {
    /// Content already expanded in the cache
    Expanded(PathBuf),
    /// Only the archive exists; expanded on first access
    Compressed {
        cache_dir: PathBuf,
        expanded: OnceCell<PathBuf>,
    },
}

/// A package archive tracked by a [`FolderRepository`]
#[derive(Debug)]
pub struct FolderPackage {
    identifier: PackageIdentifier,
    archive: PathBuf,
    layout: Layout,
    token: String,
    source: Weak<FolderRepository>,
}

impl FolderPackage {
    pub fn archive_path(&self) -> &Path {
        &self.archive
    }

    /// Whether the content has been expanded into the cache
    pub fn is_expanded(&self) -> bool {
        match &self.layout {
            Layout::Expanded(_) => true,
            Layout::Compressed { expanded, .. } => expanded.get().is_some(),
        }
    }

    fn cache_directory(&self) -> &Path {
        match &self.layout {
            Layout::Expanded(dir) => dir,
            Layout::Compressed { cache_dir, .. } => cache_dir,
        }
    }

    fn expand(&self) -> Result<PathBuf> {
        let (cache_dir, expanded) = match &self.layout {
            Layout::Expanded(dir) => return Ok(dir.clone()),
            Layout::Compressed {
                cache_dir,
                expanded,
            } => (cache_dir, expanded),
        };

        if let Some(dir) = expanded.get() {
            return Ok(dir.clone());
        }

        if !cache_dir.exists() {
            tracing::debug!("Expanding {} into {}", self.identifier, cache_dir.display());
            if let Err(e) = extract_archive(&self.archive, cache_dir) {
                let _ = fs::remove_dir_all(cache_dir);
                return Err(e.into());
            }
        }

        let _ = expanded.set(cache_dir.clone());
        Ok(cache_dir.clone())
    }
}

impl PackageInfo for FolderPackage {
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
        Ok(Box::new(File::open(&self.archive)?))
    }

    fn content_directory(&self) -> Result<Option<PathBuf>> {
        self.expand().map(Some)
    }
}

fn remove_anchor(anchor: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(anchor) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    if metadata.file_type().is_symlink() {
        fs::remove_file(anchor)?;
    } else if metadata.is_dir() && anchor.join(ANCHOR_MARKER).is_file() {
        fs::remove_dir_all(anchor)?;
    } else {
        return Err(RepoError::AnchorOccupied {
            path: anchor.to_path_buf(),
        });
    }
    Ok(())
}

/// Names that would collide with the repository's own layout
fn is_reserved_name(name: &str) -> bool {
    name.eq_ignore_ascii_case(CACHE_DIRECTORY)
}

#[cfg(unix)]
fn anchor_points_at(anchor: &Path, target: &Path, _package: &str) -> bool {
    fs::read_link(anchor).is_ok_and(|link| link == target)
}

#[cfg(unix)]
fn create_anchor(target: &Path, anchor: &Path, _package: &str) -> Result<()> {
    std::os::unix::fs::symlink(target, anchor)?;
    Ok(())
}

#[cfg(not(unix))]
fn anchor_points_at(anchor: &Path, _target: &Path, package: &str) -> bool {
    fs::read_to_string(anchor.join(ANCHOR_MARKER)).is_ok_and(|content| content == package)
}

#[cfg(not(unix))]
fn create_anchor(target: &Path, anchor: &Path, package: &str) -> Result<()> {
    copy_dir_recursive(target, anchor)?;
    fs::write(anchor.join(ANCHOR_MARKER), package)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_dir_recursive(src: &Path, dest: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let rel_path = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let to = dest.join(rel_path);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&to)?;
        } else {
            fs::copy(entry.path(), &to)?;
        }
    }
    Ok(())
}
