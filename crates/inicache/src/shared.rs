//! Lock-protected cache handle for callers that share a cache across threads

use std::sync::Arc;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cache::IniCache;

/// Cloneable, thread-safe handle to one [`IniCache`]
///
/// The cache itself does no locking; every access through this handle takes
/// the read or write lock for the duration of the returned guard.
#[derive(Clone, Default)]
pub struct SharedCache {
    inner: Arc<RwLock<IniCache>>,
}

impl SharedCache {
    /// Wrap an existing cache
    pub fn new(cache: IniCache) -> Self {
        Self {
            inner: Arc::new(RwLock::new(cache)),
        }
    }

    /// Shared access for lookups, iteration and saving
    pub fn read(&self) -> RwLockReadGuard<'_, IniCache> {
        self.inner.read()
    }

    /// Exclusive access for mutation
    pub fn write(&self) -> RwLockWriteGuard<'_, IniCache> {
        self.inner.write()
    }

    /// Take the cache back if this is the last handle
    pub fn into_inner(self) -> Result<IniCache, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(lock) => Ok(lock.into_inner()),
            Err(inner) => Err(Self { inner }),
        }
    }
}

impl From<IniCache> for SharedCache {
    fn from(cache: IniCache) -> Self {
        Self::new(cache)
    }
}
