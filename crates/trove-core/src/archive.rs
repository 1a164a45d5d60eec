//! Archive creation and extraction for Trove packages
//!
//! A package archive is a gzip-compressed tar stream. Archives are built from
//! a sequence of named content entries, so whatever produces a package (a
//! build, a converter) only has to hand over relative paths and bytes.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tar::{Archive, Builder, Header};

use crate::error::{CoreError, Result};

/// One file to place in a package archive
#[derive(Debug, Clone)]
pub struct PackageContent {
    /// Path inside the archive, `/`-separated
    pub relative_path: String,
    pub bytes: Vec<u8>,
}

impl PackageContent {
    pub fn new(relative_path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            relative_path: relative_path.into(),
            bytes: bytes.into(),
        }
    }
}

/// Information about a file in an archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Relative path within the archive
    pub path: String,
    /// File size in bytes
    pub size: u64,
    /// Whether this is a directory
    pub is_dir: bool,
}

/// Write a gzip tar archive containing `entries` to `writer`
pub fn write_archive<W, I>(entries: I, writer: W) -> Result<W>
where
    W: Write,
    I: IntoIterator<Item = PackageContent>,
{
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut builder = Builder::new(encoder);

    for entry in entries {
        if entry.relative_path.is_empty() || entry.relative_path.starts_with('/') {
            return Err(CoreError::Archive {
                message: format!("Invalid entry path: '{}'", entry.relative_path),
            });
        }
        add_bytes_to_archive(&mut builder, &entry.relative_path, &entry.bytes)?;
    }

    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

/// Build an archive in memory
pub fn archive_bytes<I>(entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = PackageContent>,
{
    write_archive(entries, Vec::new())
}

/// Extract an archive to a destination directory
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    extract_from_reader(file, dest)
}

/// Extract an archive stream to a destination directory
pub fn extract_from_reader<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let decoder = GzDecoder::new(reader);
    let mut archive = Archive::new(decoder);

    std::fs::create_dir_all(dest)?;
    archive.unpack(dest)?;

    Ok(())
}

/// List files in an archive
pub fn list_archive(archive_path: &Path) -> Result<Vec<ArchiveEntry>> {
    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);

    let mut entries = Vec::new();

    for entry in archive.entries()? {
        let entry = entry?;
        let path = entry.path()?.to_string_lossy().to_string();
        let size = entry.header().size()?;
        let is_dir = entry.header().entry_type().is_dir();

        entries.push(ArchiveEntry { path, size, is_dir });
    }

    Ok(entries)
}

/// Add bytes to a tar archive with a given path
fn add_bytes_to_archive<W: Write>(
    builder: &mut Builder<W>,
    archive_path: &str,
    content: &[u8],
) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0); // Reproducible builds: use epoch time
    header.set_cksum();

    builder.append_data(&mut header, archive_path, content)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_entries() -> Vec<PackageContent> {
        vec![
            PackageContent::new("sample.wrapdesc", "name: sample\nversion: 1.0\n"),
            PackageContent::new("bin-net35/Sample.dll", vec![0x4d, 0x5a, 0x90, 0x00]),
        ]
    }

    #[test]
    fn test_write_list_and_extract() {
        let temp = TempDir::new().unwrap();
        let archive_path = temp.path().join("sample-1.0.trove");

        let file = File::create(&archive_path).unwrap();
        write_archive(sample_entries(), file).unwrap();

        let entries = list_archive(&archive_path).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["sample.wrapdesc", "bin-net35/Sample.dll"]);
        assert_eq!(entries[1].size, 4);

        let dest = temp.path().join("out");
        extract_archive(&archive_path, &dest).unwrap();
        assert_eq!(
            std::fs::read_to_string(dest.join("sample.wrapdesc")).unwrap(),
            "name: sample\nversion: 1.0\n"
        );
        assert_eq!(
            std::fs::read(dest.join("bin-net35").join("Sample.dll")).unwrap(),
            vec![0x4d, 0x5a, 0x90, 0x00]
        );
    }

    #[test]
    fn test_archives_are_reproducible() {
        let first = archive_bytes(sample_entries()).unwrap();
        let second = archive_bytes(sample_entries()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_absolute_entry_paths() {
        let result = archive_bytes(vec![PackageContent::new("/etc/passwd", "x")]);
        assert!(matches!(result, Err(CoreError::Archive { .. })));
    }
}
