//! Archive unpacking and zip packing
//!
//! The format of an archive is inferred from its file name only; the bytes
//! are never sniffed.

use crate::CacheResult;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Archive formats the cache can unpack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip`
    Zip,
    /// `.tar`
    Tar,
    /// `.tar.gz` / `.tgz`
    TarGz,
    /// `.tar.bz2` / `.tbz2`
    TarBz2,
    /// `.tar.xz`
    TarXz,
}

impl ArchiveFormat {
    /// Infer the format from the file name extension (case-insensitive)
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();

        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(Self::TarBz2)
        } else if name.ends_with(".tar.xz") {
            Some(Self::TarXz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

/// Unpack `archive_path` into `dest_dir`
///
/// # Errors
///
/// Returns the underlying IO or zip error if the archive is unreadable.
pub fn unpack(format: ArchiveFormat, archive_path: &Path, dest_dir: &Path) -> CacheResult<()> {
    debug!("Unpacking {:?} archive {}", format, archive_path.display());

    let file = fs::File::open(archive_path)?;
    match format {
        ArchiveFormat::Zip => {
            let mut archive = zip::ZipArchive::new(file)?;
            archive.extract(dest_dir)?;
        }
        ArchiveFormat::Tar => tar::Archive::new(file).unpack(dest_dir)?,
        ArchiveFormat::TarGz => {
            tar::Archive::new(flate2::read::GzDecoder::new(file)).unpack(dest_dir)?;
        }
        ArchiveFormat::TarBz2 => {
            tar::Archive::new(bzip2::read::BzDecoder::new(file)).unpack(dest_dir)?;
        }
        ArchiveFormat::TarXz => {
            tar::Archive::new(xz2::read::XzDecoder::new(file)).unpack(dest_dir)?;
        }
    }

    Ok(())
}

/// Write a deflated zip of everything under `source_dir` to `archive_path`
///
/// Entry names are relative to `source_dir`, use `/` separators and are
/// written in sorted order. Directories get their own entries so empty ones
/// survive a round trip. An existing archive is replaced.
///
/// Returns the number of entries written.
///
/// # Errors
///
/// Returns the underlying IO, traversal or zip error.
pub fn pack_zip(source_dir: &Path, archive_path: &Path) -> CacheResult<usize> {
    let mut writer = zip::ZipWriter::new(fs::File::create(archive_path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = 0;

    for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.path() == archive_path {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(io::Error::other)?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            writer.add_directory(name, options)?;
        } else {
            writer.start_file(name, options)?;
            let mut file = fs::File::open(entry.path())?;
            let _ = io::copy(&mut file, &mut writer)?;
        }
        entries += 1;
    }

    let _ = writer.finish()?;
    info!(entries, "Packed {} into {}", source_dir.display(), archive_path.display());
    Ok(entries)
}
