//! Byte storage backends: raw bytes addressed by opaque IDs.
//!
//! Filesystem layout:
//! ```text
//! {base_path}/
//! └── objects/
//!     ├── ab/
//!     │   └── cdef0123...   # remainder of hex(SHA-256(id))
//!     └── 12/
//!         └── 3456789a...
//! ```

use crate::db::{Result, StorageError};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use vaultnode_core::hash;

/// Raw byte storage addressed by opaque IDs.
///
/// Backends do no integrity checking; that is the chunk store's job.
pub trait ByteStorage: Send + Sync {
    /// Store `data` under `id`, replacing any previous bytes.
    fn save(&self, id: &str, data: &[u8]) -> Result<()>;

    /// Store everything the reader yields; returns the number of bytes written.
    fn save_from(&self, id: &str, reader: &mut dyn Read) -> Result<u64>;

    /// Fetch all bytes, or `None` if nothing is stored under `id`.
    fn fetch(&self, id: &str) -> Result<Option<Vec<u8>>>;

    /// Fetch `length` bytes starting at `offset`.
    ///
    /// A range reaching past the end of the object is [`StorageError::OutOfRange`].
    fn fetch_range(&self, id: &str, offset: u64, length: u64) -> Result<Option<Vec<u8>>>;

    /// Remove the bytes; returns whether anything was removed.
    fn remove(&self, id: &str) -> Result<bool>;

    fn has(&self, id: &str) -> Result<bool>;
}

fn check_range(id: &str, offset: u64, length: u64, size: u64) -> Result<()> {
    match offset.checked_add(length) {
        Some(end) if end <= size => Ok(()),
        _ => Err(StorageError::OutOfRange {
            id: id.to_string(),
            offset,
            length,
            size,
        }),
    }
}

// =============================================================================
// Filesystem backend
// =============================================================================

/// Filesystem backend with two-character directory sharding.
#[derive(Debug)]
pub struct FsBackend {
    objects_dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl FsBackend {
    /// Create a backend rooted at `base_dir`, creating `base_dir/objects` if missing.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let objects_dir = base_dir.as_ref().join("objects");
        fs::create_dir_all(&objects_dir)?;
        Ok(Self {
            objects_dir,
            tmp_counter: AtomicU64::new(0),
        })
    }

    /// Path where the bytes for `id` are (or would be) stored.
    ///
    /// IDs are opaque, so the file name is derived from their SHA-256 rather
    /// than used directly.
    pub fn object_path(&self, id: &str) -> PathBuf {
        let name = hash(id.as_bytes()).to_hex();
        self.objects_dir.join(&name[..2]).join(&name[2..])
    }

    /// Write through a temp file in the same directory, then rename into place.
    fn atomic_write(&self, dest: &Path, reader: &mut dyn Read) -> Result<u64> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let seq = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = dest.with_extension(format!("tmp.{}.{}", std::process::id(), seq));

        let written = (|| -> io::Result<u64> {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)?;
            let written = io::copy(reader, &mut file)?;
            file.flush()?;
            file.sync_all()?;
            Ok(written)
        })();

        match written {
            Ok(written) => {
                fs::rename(&tmp, dest)?;
                Ok(written)
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                Err(e.into())
            }
        }
    }
}

impl ByteStorage for FsBackend {
    fn save(&self, id: &str, data: &[u8]) -> Result<()> {
        let mut data = data;
        self.atomic_write(&self.object_path(id), &mut data)?;
        Ok(())
    }

    fn save_from(&self, id: &str, reader: &mut dyn Read) -> Result<u64> {
        self.atomic_write(&self.object_path(id), reader)
    }

    fn fetch(&self, id: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.object_path(id)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn fetch_range(&self, id: &str, offset: u64, length: u64) -> Result<Option<Vec<u8>>> {
        let mut file = match File::open(self.object_path(id)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata()?.len();
        check_range(id, offset, length, size)?;

        let mut buf = vec![0u8; length as usize];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf)?;
        Ok(Some(buf))
    }

    fn remove(&self, id: &str) -> Result<bool> {
        match fs::remove_file(self.object_path(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn has(&self, id: &str) -> Result<bool> {
        Ok(self.object_path(id).is_file())
    }
}

// =============================================================================
// In-memory backend
// =============================================================================

/// Backend keeping every object in a map; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-written entry, so
    // poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<u8>>> {
        self.objects.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<u8>>> {
        self.objects.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl ByteStorage for MemoryBackend {
    fn save(&self, id: &str, data: &[u8]) -> Result<()> {
        self.write().insert(id.to_string(), data.to_vec());
        Ok(())
    }

    fn save_from(&self, id: &str, reader: &mut dyn Read) -> Result<u64> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        let written = data.len() as u64;
        self.write().insert(id.to_string(), data);
        Ok(written)
    }

    fn fetch(&self, id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.read().get(id).cloned())
    }

    fn fetch_range(&self, id: &str, offset: u64, length: u64) -> Result<Option<Vec<u8>>> {
        let objects = self.read();
        let Some(data) = objects.get(id) else {
            return Ok(None);
        };
        check_range(id, offset, length, data.len() as u64)?;
        let start = offset as usize;
        Ok(Some(data[start..start + length as usize].to_vec()))
    }

    fn remove(&self, id: &str) -> Result<bool> {
        Ok(self.write().remove(id).is_some())
    }

    fn has(&self, id: &str) -> Result<bool> {
        Ok(self.read().contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn backends() -> (TempDir, Vec<Box<dyn ByteStorage>>) {
        let dir = TempDir::new().unwrap();
        let fs_backend = FsBackend::new(dir.path()).unwrap();
        (dir, vec![Box::new(fs_backend), Box::new(MemoryBackend::new())])
    }

    #[test]
    fn test_save_fetch_has_remove() {
        let (_dir, backends) = backends();
        for backend in backends {
            assert!(!backend.has("chunk-1").unwrap());
            assert_eq!(backend.fetch("chunk-1").unwrap(), None);

            backend.save("chunk-1", b"some bytes").unwrap();
            assert!(backend.has("chunk-1").unwrap());
            assert_eq!(backend.fetch("chunk-1").unwrap().unwrap(), b"some bytes");

            assert!(backend.remove("chunk-1").unwrap());
            assert!(!backend.remove("chunk-1").unwrap());
            assert!(!backend.has("chunk-1").unwrap());
        }
    }

    #[test]
    fn test_save_from_reader() {
        let (_dir, backends) = backends();
        for backend in backends {
            let mut reader = Cursor::new(b"streamed content".to_vec());
            let written = backend.save_from("s", &mut reader).unwrap();
            assert_eq!(written, 16);
            assert_eq!(backend.fetch("s").unwrap().unwrap(), b"streamed content");
        }
    }

    #[test]
    fn test_fetch_range() {
        let (_dir, backends) = backends();
        for backend in backends {
            backend.save("r", b"0123456789").unwrap();

            assert_eq!(backend.fetch_range("r", 2, 4).unwrap().unwrap(), b"2345");
            assert_eq!(backend.fetch_range("r", 0, 10).unwrap().unwrap(), b"0123456789");
            assert_eq!(backend.fetch_range("r", 10, 0).unwrap().unwrap(), b"");
            assert_eq!(backend.fetch_range("missing", 0, 1).unwrap(), None);
        }
    }

    #[test]
    fn test_fetch_range_out_of_bounds() {
        let (_dir, backends) = backends();
        for backend in backends {
            backend.save("r", b"0123456789").unwrap();

            let result = backend.fetch_range("r", 8, 4);
            assert!(matches!(
                result,
                Err(StorageError::OutOfRange { size: 10, .. })
            ));

            let result = backend.fetch_range("r", u64::MAX, 2);
            assert!(matches!(result, Err(StorageError::OutOfRange { .. })));
        }
    }

    #[test]
    fn test_save_overwrites() {
        let (_dir, backends) = backends();
        for backend in backends {
            backend.save("x", b"first").unwrap();
            backend.save("x", b"second").unwrap();
            assert_eq!(backend.fetch("x").unwrap().unwrap(), b"second");
        }
    }

    #[test]
    fn test_fs_object_path_is_sharded() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new(dir.path()).unwrap();

        let path = backend.object_path("../../etc/passwd");
        assert!(path.starts_with(dir.path().join("objects")));

        let shard = path.parent().unwrap().file_name().unwrap().to_string_lossy();
        assert_eq!(shard.len(), 2);
        assert_eq!(path.file_name().unwrap().len(), 62);
    }

    #[test]
    fn test_fs_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new(dir.path()).unwrap();
        backend.save("clean", b"data").unwrap();

        let shard_dir = backend.object_path("clean").parent().unwrap().to_path_buf();
        let entries: Vec<_> = fs::read_dir(shard_dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
