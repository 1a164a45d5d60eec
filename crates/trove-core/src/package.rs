//! Package identity and archive file names
//!
//! A package is identified by its name and version; its full name is
//! `<name>-<version>` and its archive is `<name>-<version>.trove`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::version::Version;

/// Archive file extension, without the dot
pub const ARCHIVE_EXTENSION: &str = "trove";

/// Name and version of a package. Names compare case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageIdentifier {
    pub name: String,
    pub version: Version,
}

impl PackageIdentifier {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// `<name>-<version>`
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// `<name>-<version>.trove`
    pub fn archive_file_name(&self) -> String {
        format!("{}.{}", self.full_name(), ARCHIVE_EXTENSION)
    }

    /// Split a full name at its last dash
    pub fn parse_full_name(full_name: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidPackageName {
            name: full_name.to_string(),
        };

        let (name, version) = full_name.rsplit_once('-').ok_or_else(invalid)?;
        if !is_valid_name(name) {
            return Err(invalid());
        }
        let version = version.parse::<Version>().map_err(|_| invalid())?;

        Ok(Self::new(name, version))
    }

    /// Check whether `name` designates this package, ignoring case
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A package name must be usable as a single path component
fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

impl PartialEq for PackageIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.is_named(&other.name) && self.version == other.version
    }
}

impl Eq for PackageIdentifier {}

impl Hash for PackageIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.to_ascii_lowercase().hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for PackageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// Strip the archive extension (case-insensitive) from a file name
pub fn archive_stem(file_name: &str) -> Option<&str> {
    let split = file_name.len().checked_sub(ARCHIVE_EXTENSION.len() + 1)?;
    if split == 0 || !file_name.is_char_boundary(split) {
        return None;
    }
    let (stem, extension) = file_name.split_at(split);
    let extension = extension.strip_prefix('.')?;
    extension
        .eq_ignore_ascii_case(ARCHIVE_EXTENSION)
        .then_some(stem)
}

/// Normalize a user-supplied archive file name: drop any directory part and
/// force the lowercase `.trove` extension.
pub fn normalize_file_name(file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());

    match archive_stem(&base) {
        Some(stem) => format!("{}.{}", stem, ARCHIVE_EXTENSION),
        None => format!("{}.{}", base, ARCHIVE_EXTENSION),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_name() {
        let id = PackageIdentifier::parse_full_name("open-wrap-1.2.3").unwrap();
        assert_eq!(id.name, "open-wrap");
        assert_eq!(id.version, "1.2.3".parse().unwrap());
        assert_eq!(id.full_name(), "open-wrap-1.2.3");
        assert_eq!(id.archive_file_name(), "open-wrap-1.2.3.trove");

        assert!(PackageIdentifier::parse_full_name("nodash").is_err());
        assert!(PackageIdentifier::parse_full_name("-1.0").is_err());
        assert!(PackageIdentifier::parse_full_name("name-latest").is_err());
        assert!(PackageIdentifier::parse_full_name("name-1").is_err());
    }

    #[test]
    fn test_parse_full_name_rejects_path_like_names() {
        assert!(PackageIdentifier::parse_full_name("..-1.0").is_err());
        assert!(PackageIdentifier::parse_full_name(".-1.0").is_err());
        assert!(PackageIdentifier::parse_full_name("lib/nunit-1.0").is_err());
        assert!(PackageIdentifier::parse_full_name("lib\\nunit-1.0").is_err());
        assert!(PackageIdentifier::parse_full_name("..nunit-1.0").is_ok());
    }

    #[test]
    fn test_identifier_equality_ignores_name_case() {
        let a = PackageIdentifier::parse_full_name("NUnit-2.5").unwrap();
        let b = PackageIdentifier::parse_full_name("nunit-2.5").unwrap();
        let c = PackageIdentifier::parse_full_name("nunit-2.5.0").unwrap();
        assert_eq!(a, b);
        assert_ne!(b, c);

        let set: std::collections::HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_archive_stem() {
        assert_eq!(archive_stem("foo-1.0.trove"), Some("foo-1.0"));
        assert_eq!(archive_stem("foo-1.0.TROVE"), Some("foo-1.0"));
        assert_eq!(archive_stem("foo-1.0.zip"), None);
        assert_eq!(archive_stem(".trove"), None);
        assert_eq!(archive_stem("trove"), None);
    }

    #[test]
    fn test_normalize_file_name() {
        assert_eq!(normalize_file_name("foo-1.0.trove"), "foo-1.0.trove");
        assert_eq!(normalize_file_name("Foo-1.0.Trove"), "Foo-1.0.trove");
        assert_eq!(normalize_file_name("some/dir/foo-1.0.trove"), "foo-1.0.trove");
        assert_eq!(normalize_file_name("foo-1.0"), "foo-1.0.trove");
    }
}
