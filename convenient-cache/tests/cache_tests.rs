//! Integration tests for the artifact cache
//!
//! Tests idempotent download and extraction, archive formats, and zip packing.

use convenient_cache::{ArtifactCache, CacheError, CacheResult, Transport, pack_zip};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

/// In-memory transport that records every requested URL
#[derive(Default)]
struct FakeTransport {
    bodies: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl FakeTransport {
    fn serving(url: &str, body: Vec<u8>) -> Self {
        let mut bodies = HashMap::new();
        let _ = bodies.insert(url.to_string(), body);
        Self {
            bodies,
            requests: RefCell::default(),
        }
    }

    fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Transport for FakeTransport {
    fn open(&self, url: &str) -> CacheResult<Box<dyn Read + Send>> {
        self.requests.borrow_mut().push(url.to_string());
        match self.bodies.get(url) {
            Some(body) => Ok(Box::new(Cursor::new(body.clone()))),
            None => Err(CacheError::Http {
                url: url.to_string(),
                message: "status 404 Not Found".to_string(),
            }),
        }
    }
}

fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn tar_gz_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, content.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

fn relative_files(root: &Path) -> BTreeSet<String> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

const URL: &str = "https://example.com/release/SDL2-2.0.22.zip";

#[test]
fn test_download_fetches_once() {
    let temp = TempDir::new().unwrap();
    let transport = FakeTransport::serving(URL, b"payload".to_vec());
    let cache = ArtifactCache::new(temp.path(), &transport);

    let first = cache.download(URL, "sdl2.zip").unwrap();
    let second = cache.download(URL, "sdl2.zip").unwrap();

    assert_eq!(first, second);
    assert_eq!(transport.request_count(), 1);
    assert_eq!(fs::read(first).unwrap(), b"payload");
}

#[test]
fn test_download_trusts_existing_file() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("sdl2.zip"), b"truncated").unwrap();

    let transport = FakeTransport::default();
    let cache = ArtifactCache::new(temp.path(), &transport);
    let path = cache.download(URL, "sdl2.zip").unwrap();

    assert_eq!(transport.request_count(), 0);
    assert_eq!(fs::read(path).unwrap(), b"truncated");
}

#[test]
fn test_download_error_propagates_and_leaves_no_file() {
    let temp = TempDir::new().unwrap();
    let transport = FakeTransport::default();
    let cache = ArtifactCache::new(temp.path(), &transport);

    let result = cache.download(URL, "sdl2.zip");

    assert!(matches!(result, Err(CacheError::Http { .. })));
    assert!(!temp.path().join("sdl2.zip").exists());
}

/// Reader that fails after its prefix, like a dropped connection
struct ResetAfter(Cursor<&'static [u8]>);

impl Read for ResetAfter {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.0.read(buf)? {
            0 => Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            )),
            n => Ok(n),
        }
    }
}

/// Transport whose first transfer is cut off midway
#[derive(Default)]
struct FlakyTransport {
    attempts: Cell<usize>,
}

impl Transport for FlakyTransport {
    fn open(&self, _url: &str) -> CacheResult<Box<dyn Read + Send>> {
        self.attempts.set(self.attempts.get() + 1);
        if self.attempts.get() == 1 {
            Ok(Box::new(ResetAfter(Cursor::new(&b"PK\x03"[..]))))
        } else {
            Ok(Box::new(Cursor::new(b"complete archive".to_vec())))
        }
    }
}

#[test]
fn test_interrupted_download_leaves_nothing_behind() {
    let temp = TempDir::new().unwrap();
    let transport = FlakyTransport::default();
    let cache = ArtifactCache::new(temp.path(), &transport);

    let result = cache.download(URL, "sdl2.zip");

    assert!(matches!(result, Err(CacheError::Io(_))));
    assert!(!temp.path().join("sdl2.zip").exists());
    assert!(!temp.path().join("sdl2.zip.part").exists());

    // The next attempt is not mistaken for a cached download
    let path = cache.download(URL, "sdl2.zip").unwrap();
    assert_eq!(transport.attempts.get(), 2);
    assert_eq!(fs::read(path).unwrap(), b"complete archive");
}

#[test]
fn test_download_overwrites_leftover_part_file() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("sdl2.zip.part"), b"half of an older transfer").unwrap();

    let transport = FakeTransport::serving(URL, b"payload".to_vec());
    let cache = ArtifactCache::new(temp.path(), &transport);
    let path = cache.download(URL, "sdl2.zip").unwrap();

    assert_eq!(transport.request_count(), 1);
    assert_eq!(fs::read(path).unwrap(), b"payload");
    assert!(!temp.path().join("sdl2.zip.part").exists());
}

#[test]
fn test_extract_zip() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("sdl2.zip"),
        zip_bytes(&[
            ("SDL2-2.0.22/CMakeLists.txt", "project(SDL2)"),
            ("SDL2-2.0.22/src/SDL.c", "int main;"),
        ]),
    )
    .unwrap();

    let cache = ArtifactCache::new(temp.path(), FakeTransport::default());
    let dir = cache.extract("sdl2.zip", "sdl2").unwrap();

    assert_eq!(dir, temp.path().join("sdl2"));
    assert_eq!(
        fs::read_to_string(dir.join("SDL2-2.0.22/CMakeLists.txt")).unwrap(),
        "project(SDL2)"
    );
    assert!(!temp.path().join("sdl2.partial").exists());
}

#[test]
fn test_extract_tar_gz() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("openal.tar.gz"),
        tar_gz_bytes(&[("openal-soft-1.22.2/CMakeLists.txt", "project(OpenAL)")]),
    )
    .unwrap();

    let cache = ArtifactCache::new(temp.path(), FakeTransport::default());
    let dir = cache.extract("openal.tar.gz", "openal").unwrap();

    assert!(dir.join("openal-soft-1.22.2/CMakeLists.txt").is_file());
}

#[test]
fn test_extract_skips_existing_directory() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("sdl2")).unwrap();
    fs::write(temp.path().join("sdl2").join("marker"), "kept").unwrap();
    // A corrupt archive proves the unpack step never ran
    fs::write(temp.path().join("sdl2.zip"), b"not a zip").unwrap();

    let cache = ArtifactCache::new(temp.path(), FakeTransport::default());
    let dir = cache.extract("sdl2.zip", "sdl2").unwrap();

    assert_eq!(relative_files(&dir), BTreeSet::from(["marker".to_string()]));
}

#[test]
fn test_extract_discards_stale_staging_directory() {
    let temp = TempDir::new().unwrap();
    let staging = temp.path().join("sdl2.partial");
    fs::create_dir_all(&staging).unwrap();
    fs::write(staging.join("junk"), "from an interrupted run").unwrap();
    fs::write(
        temp.path().join("sdl2.zip"),
        zip_bytes(&[("SDL2-2.0.22/CMakeLists.txt", "project(SDL2)")]),
    )
    .unwrap();

    let cache = ArtifactCache::new(temp.path(), FakeTransport::default());
    let dir = cache.extract("sdl2.zip", "sdl2").unwrap();

    assert_eq!(
        relative_files(&dir),
        BTreeSet::from(["SDL2-2.0.22/CMakeLists.txt".to_string()])
    );
    assert!(!staging.exists());
}

#[test]
fn test_extract_corrupt_archive_is_an_error() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("sdl2.zip"), b"not a zip").unwrap();

    let cache = ArtifactCache::new(temp.path(), FakeTransport::default());
    let result = cache.extract("sdl2.zip", "sdl2");

    assert!(matches!(result, Err(CacheError::Zip(_))));
    assert!(!temp.path().join("sdl2").exists());
}

#[test]
fn test_extract_missing_archive_is_an_error() {
    let temp = TempDir::new().unwrap();
    let cache = ArtifactCache::new(temp.path(), FakeTransport::default());

    assert!(matches!(cache.extract("gone.zip", "gone"), Err(CacheError::Io(_))));
}

#[test]
fn test_pack_zip_round_trip() {
    let temp = TempDir::new().unwrap();
    let tree = temp.path().join("sdk");
    fs::create_dir_all(tree.join("windows/lib")).unwrap();
    fs::create_dir_all(tree.join("linux/lib")).unwrap();
    fs::write(tree.join("windows/lib/SDL2.lib"), "sdl2").unwrap();
    fs::write(tree.join("windows/lib/OpenAL32.lib"), "openal").unwrap();

    let archive = temp.path().join("sdk.zip");
    let entries = pack_zip(&tree, &archive).unwrap();
    // windows, windows/lib, two files, linux, linux/lib
    assert_eq!(entries, 6);

    let cache = ArtifactCache::new(temp.path(), FakeTransport::default());
    let unpacked = cache.extract("sdk.zip", "unpacked").unwrap();

    assert_eq!(relative_files(&tree), relative_files(&unpacked));
    assert!(unpacked.join("linux/lib").is_dir());
    assert_eq!(
        fs::read_to_string(unpacked.join("windows/lib/OpenAL32.lib")).unwrap(),
        "openal"
    );
}

#[test]
fn test_pack_zip_replaces_existing_archive() {
    let temp = TempDir::new().unwrap();
    let tree = temp.path().join("sdk");
    fs::create_dir_all(&tree).unwrap();
    fs::write(tree.join("a.txt"), "a").unwrap();

    let archive = temp.path().join("sdk.zip");
    fs::write(&archive, b"stale contents").unwrap();

    assert_eq!(pack_zip(&tree, &archive).unwrap(), 1);

    let reader = zip::ZipArchive::new(fs::File::open(&archive).unwrap()).unwrap();
    assert_eq!(reader.len(), 1);
}
