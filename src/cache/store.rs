//! Content-addressed call cache persisted to disk
//!
//! Provides a `CallCache` that memoizes the results of expensive calls
//! (network requests, subprocess runs) as JSON files named after the owning
//! function and a hash of its arguments.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

/// Derives a cache key from the string form of a call's arguments.
///
/// The key is the MD5 hex digest of the space-joined parts, so identical
/// argument lists map to identical keys and differing lists collide only
/// with negligible probability. Argument order is significant.
pub fn call_key(parts: &[&str]) -> String {
    format!("{:x}", md5::compute(parts.join(" ").as_bytes()))
}

/// Errors that can occur when reading or writing cache entries
#[derive(Debug, Error)]
pub enum CacheError {
    /// No result has been stored at this path
    ///
    /// Used as an internal signal by [`CallCache::get_or_compute`]; callers
    /// that go through the wrapper never observe it for a computable value.
    #[error("no cached result at {}", .0.display())]
    Missing(PathBuf),

    /// Reading or writing the cache file failed
    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The stored payload could not be serialized or deserialized
    ///
    /// A crash mid-write can leave a truncated entry behind; it surfaces
    /// here on the next read and is not repaired automatically.
    #[error("invalid cache payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Memoizes call results as content-addressed files in a directory
///
/// Entries are keyed by function name plus argument hash and overwritten in
/// place on refresh. There is no eviction, TTL, size bound, or cross-process
/// locking: two concurrent calls with the same key may both compute and race
/// to write, and the last write wins.
#[derive(Debug, Clone)]
pub struct CallCache {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
    /// Whether new entries are written gzip-compressed
    use_gzip: bool,
}

impl CallCache {
    /// Creates a cache rooted at the given directory (created lazily on
    /// first write).
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            use_gzip: false,
        }
    }

    /// Creates a cache in the XDG-compliant cache directory
    /// (`~/.cache/srafetch/` on Linux).
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no
    /// home directory).
    pub fn for_project() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "srafetch")?;
        Some(Self::new(project_dirs.cache_dir()))
    }

    /// Enables or disables gzip compression for newly written entries.
    ///
    /// Reads auto-detect the format, so flipping this flag never invalidates
    /// existing entries.
    pub fn with_gzip(mut self, use_gzip: bool) -> Self {
        self.use_gzip = use_gzip;
        self
    }

    /// Returns the directory this cache stores entries under.
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path of the entry for `func` called with `args`.
    pub fn entry_path(&self, func: &str, args: &[&str]) -> PathBuf {
        let extension = if self.use_gzip { "json.gz" } else { "json" };
        self.cache_dir
            .join(format!("{}.{}.{}", func, call_key(args), extension))
    }

    /// Loads a stored value from `path`.
    ///
    /// A missing file is reported as [`CacheError::Missing`]. The payload is
    /// first treated as gzip-compressed; if the gzip decode fails the raw
    /// bytes are decoded instead, so entries written with either setting of
    /// the gzip flag stay readable.
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T, CacheError> {
        if !path.exists() {
            return Err(CacheError::Missing(path.to_path_buf()));
        }
        let raw = fs::read(path)?;

        let mut decoded = Vec::new();
        let value = match GzDecoder::new(raw.as_slice()).read_to_end(&mut decoded) {
            Ok(_) => serde_json::from_slice(&decoded)?,
            // Not gzip-compressed; decode the bytes as written.
            Err(_) => serde_json::from_slice(&raw)?,
        };
        Ok(value)
    }

    /// Serializes `value` to `path`, creating the parent directory if needed.
    ///
    /// An existing entry at the same path is overwritten.
    pub fn store<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), CacheError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec(value)?;
        if self.use_gzip {
            let file = fs::File::create(path)?;
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(&json)?;
            encoder.finish()?;
        } else {
            fs::write(path, json)?;
        }
        Ok(())
    }

    /// Returns the cached result of `func(args)`, computing and persisting
    /// it on a miss.
    ///
    /// With `update_cache` set the stored entry is ignored and overwritten
    /// by a fresh computation.
    pub fn get_or_compute<T, E, F>(
        &self,
        func: &str,
        args: &[&str],
        update_cache: bool,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        let path = self.entry_path(func, args);
        if !update_cache && path.exists() {
            debug!(func, path = %path.display(), "cache hit");
            return Ok(self.load(&path)?);
        }

        debug!(func, path = %path.display(), "cache miss");
        let value = compute()?;
        self.store(&path, &value)?;
        Ok(value)
    }
}
