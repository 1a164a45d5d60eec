//! Trove Core - value types shared by every Trove crate
//!
//! - `Version`, `VersionVertex`, `PackageDependency`: the version constraint model
//! - `PackageIdentifier`: package name + version and archive file naming
//! - `archive`: gzip tar archives built from named content entries

pub mod archive;
pub mod error;
pub mod package;
pub mod version;

pub use archive::{ArchiveEntry, PackageContent};
pub use error::{CoreError, Result};
pub use package::{ARCHIVE_EXTENSION, PackageIdentifier, normalize_file_name};
pub use version::{PackageDependency, PrecisionPolicy, Version, VersionVertex};
