//! Download and unpack cache for upstream source archives
//!
//! This crate keeps a scratch directory of downloaded archives and their
//! unpacked trees. Both operations are keyed purely by the existence of the
//! destination path: a file or directory that is already present is trusted
//! as-is and never re-fetched or re-verified.
//!
//! # Features
//!
//! - Blocking HTTP downloads using ureq, behind a [`Transport`] seam
//! - Archive format inferred from the file extension
//! - `.zip`, `.tar`, `.tar.gz`, `.tar.bz2` and `.tar.xz` unpacking
//! - Deflated zip packing of a directory tree ([`pack_zip`])
//!
//! # Example
//!
//! ```no_run
//! use convenient_cache::{ArtifactCache, HttpTransport};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = ArtifactCache::new("tmp", HttpTransport::new());
//!
//!     cache.download("https://www.libsdl.org/release/SDL2-2.0.22.zip", "sdl2.zip")?;
//!     let tree = cache.extract("sdl2.zip", "sdl2")?;
//!     println!("Sources unpacked to {}", tree.display());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

pub mod archive;
pub mod transport;

pub use archive::{ArchiveFormat, pack_zip, unpack};
pub use transport::{HttpTransport, Transport};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Error types for cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem or stream error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Remote resource could not be fetched
    #[error("HTTP error fetching {url}: {message}")]
    Http {
        /// Requested URL
        url: String,
        /// Transport failure description
        message: String,
    },

    /// Archive extension is not one we know how to unpack
    #[error("Unsupported archive format: {0}")]
    UnsupportedArchive(String),

    /// Zip reader or writer failure
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Directory traversal failure while packing
    #[error("Walk error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Suffix of an in-flight download
const PART_SUFFIX: &str = "part";

/// Suffix of an in-flight extraction
const PARTIAL_SUFFIX: &str = "partial";

/// Existence-keyed cache of downloaded archives and unpacked trees
///
/// All paths handed to [`download`](Self::download) and
/// [`extract`](Self::extract) are relative to the cache root.
#[derive(Debug)]
pub struct ArtifactCache<T> {
    root: PathBuf,
    transport: T,
}

impl<T: Transport> ArtifactCache<T> {
    /// Create a cache rooted at `root`
    ///
    /// The directory is created lazily on the first download.
    pub fn new(root: impl Into<PathBuf>, transport: T) -> Self {
        Self {
            root: root.into(),
            transport,
        }
    }

    /// Cache root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Transport used for downloads
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Download `url` to `<root>/<file_name>` unless that file already exists
    ///
    /// The body is streamed into `<file_name>.part` and renamed into place
    /// once complete; a transfer that fails midway removes the partial file.
    /// An existing destination is returned untouched, with no integrity check.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Http` if the transport fails and
    /// `CacheError::Io` if the body cannot be written.
    pub fn download(&self, url: &str, file_name: &str) -> CacheResult<PathBuf> {
        let dest = self.root.join(file_name);
        if dest.exists() {
            info!("{} already downloaded", file_name);
            return Ok(dest);
        }

        fs::create_dir_all(&self.root)?;
        info!("Downloading {} from {}", file_name, url);

        let mut reader = self.transport.open(url)?;
        let part = self.root.join(format!("{file_name}.{PART_SUFFIX}"));
        let mut file = fs::File::create(&part)?;
        let copied = io::copy(&mut reader, &mut file).and_then(|n| file.sync_all().map(|()| n));
        let bytes = match copied {
            Ok(bytes) => bytes,
            Err(e) => {
                drop(file);
                if let Err(cleanup) = fs::remove_file(&part) {
                    debug!("Could not remove {}: {}", part.display(), cleanup);
                }
                return Err(e.into());
            }
        };
        drop(file);

        fs::rename(&part, &dest)?;
        info!(bytes, "Downloaded {}", dest.display());
        Ok(dest)
    }

    /// Unpack `<root>/<archive_name>` into `<root>/<dir_name>` unless that
    /// directory already exists
    ///
    /// The archive is unpacked into `<dir_name>.partial` first and renamed
    /// into place afterwards.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::UnsupportedArchive` if the extension is unknown,
    /// or the underlying IO/zip error if unpacking fails.
    pub fn extract(&self, archive_name: &str, dir_name: &str) -> CacheResult<PathBuf> {
        let dest = self.root.join(dir_name);
        if dest.exists() {
            info!("{} already extracted", dir_name);
            return Ok(dest);
        }

        let archive = self.root.join(archive_name);
        let format = ArchiveFormat::from_path(&archive)
            .ok_or_else(|| CacheError::UnsupportedArchive(archive.display().to_string()))?;

        let staging = self.root.join(format!("{dir_name}.{PARTIAL_SUFFIX}"));
        if staging.exists() {
            debug!("Removing stale staging directory {}", staging.display());
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        info!("Extracting {} to {}", archive.display(), dest.display());
        unpack(format, &archive, &staging)?;
        fs::rename(&staging, &dest)?;

        Ok(dest)
    }
}
