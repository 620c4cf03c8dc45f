//! Storage collaborators and load/save orchestration
//!
//! A [`Storage`] opens, reads, writes and closes named resources. The cache
//! reads a whole resource into one buffer before scanning it, and renders a
//! whole cache into one buffer before writing it.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use ahash::RandomState;
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::IniCache;
use crate::encoding::TextEncoding;
use crate::error::{Error, Result};
use crate::options::LoadOptions;
use crate::serializer::render;

/// Backing store for INI resources
pub trait Storage {
    /// Open resource handle
    type Handle;

    /// Open an existing resource for reading
    fn open_for_read(&self, name: &Path) -> Result<Self::Handle>;

    /// Total length of the resource in bytes
    fn query_length(&self, handle: &mut Self::Handle) -> Result<u64>;

    /// Fill `buffer` from the start of the resource
    fn read_all(&self, handle: &mut Self::Handle, buffer: &mut [u8]) -> Result<()>;

    /// Create a resource for writing, truncating any existing content
    fn open_for_write(&self, name: &Path) -> Result<Self::Handle>;

    /// Write all of `bytes` at the current position
    fn write_all(&self, handle: &mut Self::Handle, bytes: &[u8]) -> Result<()>;

    /// Release the handle, flushing anything written through it
    fn close(&self, handle: Self::Handle) -> Result<()>;
}

/// File-system storage
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

/// Open file plus the mode it was opened in
#[derive(Debug)]
pub struct FsHandle {
    file: File,
    writable: bool,
}

impl Storage for FsStorage {
    type Handle = FsHandle;

    fn open_for_read(&self, name: &Path) -> Result<FsHandle> {
        let file = OpenOptions::new().read(true).open(name)?;
        Ok(FsHandle {
            file,
            writable: false,
        })
    }

    fn query_length(&self, handle: &mut FsHandle) -> Result<u64> {
        Ok(handle.file.metadata()?.len())
    }

    fn read_all(&self, handle: &mut FsHandle, buffer: &mut [u8]) -> Result<()> {
        handle.file.seek(SeekFrom::Start(0))?;
        handle.file.read_exact(buffer)?;
        Ok(())
    }

    fn open_for_write(&self, name: &Path) -> Result<FsHandle> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(name)?;
        Ok(FsHandle {
            file,
            writable: true,
        })
    }

    fn write_all(&self, handle: &mut FsHandle, bytes: &[u8]) -> Result<()> {
        handle.file.write_all(bytes)?;
        Ok(())
    }

    fn close(&self, mut handle: FsHandle) -> Result<()> {
        if handle.writable {
            handle.file.flush()?;
            handle.file.sync_all()?;
        }
        Ok(())
    }
}

/// In-memory storage of named byte buffers
#[derive(Debug, Default)]
pub struct MemStorage {
    files: Mutex<HashMap<PathBuf, Vec<u8>, RandomState>>,
}

/// Private copy of a resource; written data is published on close
#[derive(Debug)]
pub struct MemHandle {
    name: PathBuf,
    data: Vec<u8>,
    writable: bool,
}

impl MemStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` under `name`, replacing any previous content
    pub fn insert(&self, name: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.files.lock().insert(name.into(), bytes.into());
    }

    /// Copy of the content stored under `name`
    pub fn get(&self, name: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.lock().get(name.as_ref()).cloned()
    }

    /// Check if a resource exists
    pub fn contains(&self, name: impl AsRef<Path>) -> bool {
        self.files.lock().contains_key(name.as_ref())
    }
}

impl Storage for MemStorage {
    type Handle = MemHandle;

    fn open_for_read(&self, name: &Path) -> Result<MemHandle> {
        let data = self.get(name).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", name.display()),
            )
        })?;
        Ok(MemHandle {
            name: name.to_path_buf(),
            data,
            writable: false,
        })
    }

    fn query_length(&self, handle: &mut MemHandle) -> Result<u64> {
        Ok(handle.data.len() as u64)
    }

    fn read_all(&self, handle: &mut MemHandle, buffer: &mut [u8]) -> Result<()> {
        let source = handle
            .data
            .get(..buffer.len())
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        buffer.copy_from_slice(source);
        Ok(())
    }

    fn open_for_write(&self, name: &Path) -> Result<MemHandle> {
        self.files.lock().insert(name.to_path_buf(), Vec::new());
        Ok(MemHandle {
            name: name.to_path_buf(),
            data: Vec::new(),
            writable: true,
        })
    }

    fn write_all(&self, handle: &mut MemHandle, bytes: &[u8]) -> Result<()> {
        if !handle.writable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "handle was opened for reading",
            )
            .into());
        }
        handle.data.extend_from_slice(bytes);
        Ok(())
    }

    fn close(&self, handle: MemHandle) -> Result<()> {
        if handle.writable {
            self.files.lock().insert(handle.name, handle.data);
        }
        Ok(())
    }
}

impl IniCache {
    /// Load and parse the resource `name`
    ///
    /// # Arguments
    /// * `storage` - Where the resource lives
    /// * `name` - Resource name (a path for [`FsStorage`])
    /// * `options` - Scanner and encoding options
    ///
    /// # Returns
    /// * `Result<IniCache>` - Parsed cache
    pub fn load<S: Storage>(storage: &S, name: &Path, options: &LoadOptions) -> Result<Self> {
        let mut handle = storage.open_for_read(name)?;
        debug!(name = %name.display(), "opened INI file");

        let loaded = Self::load_by_handle(storage, &mut handle, options);
        let closed = storage.close(handle);

        let cache = loaded?;
        closed?;
        Ok(cache)
    }

    /// Read and parse the whole resource behind an open handle.
    ///
    /// The content is read into a buffer one byte longer than the resource
    /// and terminated with a zero byte before scanning.
    pub fn load_by_handle<S: Storage>(
        storage: &S,
        handle: &mut S::Handle,
        options: &LoadOptions,
    ) -> Result<Self> {
        let length = storage.query_length(handle)?;
        let length = usize::try_from(length).map_err(|_| Error::OutOfMemory {
            requested: usize::MAX,
        })?;
        let size = length.checked_add(1).ok_or(Error::OutOfMemory {
            requested: usize::MAX,
        })?;
        debug!(length, "reading INI file");

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(size)
            .map_err(Error::out_of_memory(size))?;
        buffer.resize(size, 0);

        storage.read_all(handle, &mut buffer[..length])?;

        Self::from_bytes(&buffer, options)
    }

    /// Render the cache and write it to `name`, replacing its content
    pub fn save<S: Storage>(&self, storage: &S, name: &Path, encoding: TextEncoding) -> Result<()> {
        let buffer = render(self, encoding)?;

        let mut handle = storage.open_for_write(name)?;
        let written = storage.write_all(&mut handle, &buffer);
        let closed = storage.close(handle);

        written?;
        closed?;
        debug!(name = %name.display(), bytes = buffer.len(), "saved INI file");
        Ok(())
    }

    /// Render the cache and write it through an open, writable handle
    pub fn save_by_handle<S: Storage>(
        &self,
        storage: &S,
        handle: &mut S::Handle,
        encoding: TextEncoding,
    ) -> Result<()> {
        let buffer = render(self, encoding)?;
        storage.write_all(handle, &buffer)
    }
}
