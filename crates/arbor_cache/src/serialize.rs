//! Snapshot serialization and deserialization using `MessagePack`.
//!
//! A cache file holds a version tag followed by a [`StorageDump`]. Files
//! written by a different serializer version are treated as stale and
//! ignored rather than reported as errors.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind as IoErrorKind, Read, Write};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use arbor_foundation::{Error, ErrorKind, Result};
use arbor_storage::{EntityTypeRegistry, ImmutableEntityStorage, MutableEntityStorage, StorageDump};

use crate::resolver::{TypeResolver, resolve_record};

/// Version tag of the cache format. Bump on any change to the dump layout.
pub const SERIALIZER_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    dump: StorageDump,
}

/// Reads only the version tag; the dump is skipped.
#[derive(Deserialize)]
struct CacheHeader {
    version: u32,
}

/// Outcome of writing a cache file.
#[derive(Debug)]
pub enum SerializationResult {
    /// The file was written; carries the number of bytes.
    Success(usize),
    /// Writing failed.
    Fail(Error),
}

impl SerializationResult {
    /// Returns true if the file was written.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Number of bytes written, if successful.
    #[must_use]
    pub const fn bytes_written(&self) -> Option<usize> {
        match self {
            Self::Success(bytes) => Some(*bytes),
            Self::Fail(_) => None,
        }
    }

    /// Converts into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the failure, if any.
    pub fn into_result(self) -> Result<usize> {
        match self {
            Self::Success(bytes) => Ok(bytes),
            Self::Fail(err) => Err(err),
        }
    }
}

fn serialization_error(err: impl std::fmt::Display) -> Error {
    Error::new(ErrorKind::Serialization(err.to_string()))
}

fn io_error(action: &str, path: &Path, err: &std::io::Error) -> Error {
    Error::new(ErrorKind::Io(format!(
        "failed to {action} '{}': {err}",
        path.display()
    )))
}

/// Serializes a snapshot to bytes using `MessagePack` format.
///
/// Uses named serialization so field names are stored with the data.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be dumped or encoded.
pub fn to_bytes(snapshot: &ImmutableEntityStorage) -> Result<Vec<u8>> {
    let file = CacheFile {
        version: SERIALIZER_VERSION,
        dump: snapshot.dump()?,
    };
    rmp_serde::to_vec_named(&file).map_err(serialization_error)
}

/// Deserializes a builder from `MessagePack` bytes.
///
/// Returns `Ok(None)` if the bytes were written by another serializer
/// version.
///
/// # Errors
///
/// Returns an error if the bytes cannot be decoded, a type cannot be
/// resolved, or the decoded storage is not consistent.
pub fn from_bytes(
    bytes: &[u8],
    registry: &Arc<EntityTypeRegistry>,
    resolver: &dyn TypeResolver,
) -> Result<Option<MutableEntityStorage>> {
    let header: CacheHeader = rmp_serde::from_slice(bytes).map_err(serialization_error)?;
    if header.version != SERIALIZER_VERSION {
        tracing::warn!(
            found = header.version,
            expected = SERIALIZER_VERSION,
            "ignoring cache written by another serializer version"
        );
        return Ok(None);
    }

    let file: CacheFile = rmp_serde::from_slice(bytes).map_err(serialization_error)?;
    let storage = MutableEntityStorage::from_dump(
        Arc::clone(registry),
        &file.dump,
        &mut |record| resolve_record(resolver, record),
    )?;
    Ok(Some(storage))
}

/// Writes a snapshot to a cache file, creating parent directories.
///
/// Failures are returned as [`SerializationResult::Fail`]; a cache that
/// cannot be written is not fatal to the caller.
pub fn serialize_cache<P: AsRef<Path>>(path: P, snapshot: &ImmutableEntityStorage) -> SerializationResult {
    match write_cache(path.as_ref(), snapshot) {
        Ok(bytes) => {
            tracing::debug!(path = %path.as_ref().display(), bytes, "wrote cache");
            SerializationResult::Success(bytes)
        }
        Err(err) => {
            tracing::debug!(path = %path.as_ref().display(), error = %err, "failed to write cache");
            SerializationResult::Fail(err)
        }
    }
}

fn write_cache(path: &Path, snapshot: &ImmutableEntityStorage) -> Result<usize> {
    let bytes = to_bytes(snapshot)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error("create directory", parent, &e))?;
    }

    let file = File::create(path).map_err(|e| io_error("create file", path, &e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(&bytes)
        .map_err(|e| io_error("write to file", path, &e))?;
    writer.flush().map_err(|e| io_error("flush file", path, &e))?;
    Ok(bytes.len())
}

/// Loads a builder from a cache file.
///
/// Returns `Ok(None)` if the file does not exist or was written by another
/// serializer version.
///
/// # Errors
///
/// Returns an error if the file cannot be read or its contents cannot be
/// turned back into a storage.
pub fn deserialize_cache<P: AsRef<Path>>(
    path: P,
    registry: &Arc<EntityTypeRegistry>,
    resolver: &dyn TypeResolver,
) -> Result<Option<MutableEntityStorage>> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == IoErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no cache file");
            return Ok(None);
        }
        Err(e) => return Err(io_error("open file", path, &e)),
    };

    let mut reader = BufReader::new(file);
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| io_error("read file", path, &e))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "read cache");

    from_bytes(&bytes, registry, resolver).map_err(|err| err.in_operation("deserialize_cache"))
}
