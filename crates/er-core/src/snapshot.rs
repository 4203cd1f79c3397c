//! Versioned immutable snapshots with atomic pointer swap.
//!
//! Request-serving code calls [`Snapshot::current`] once at the start of a
//! request and works against that `Arc` until it finishes.  Administrative
//! rebuilds construct a fresh value off to the side and [`publish`] it; the
//! swap is a single pointer store under a write lock, so a reader sees either
//! the old value or the new one, never a mix.  In-flight requests keep the
//! old `Arc` alive until they drop it.
//!
//! [`publish`]: Snapshot::publish

use std::ops::Deref;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A value tagged with the version it was published under.
#[derive(Debug)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

impl<T> Deref for Versioned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Shared handle to the current version of `T`.
#[derive(Debug)]
pub struct Snapshot<T> {
    inner: RwLock<Arc<Versioned<T>>>,
}

impl<T> Snapshot<T> {
    /// Wrap `value` as version 1.
    pub fn new(value: T) -> Self {
        Self { inner: RwLock::new(Arc::new(Versioned { version: 1, value })) }
    }

    /// The currently published version.  Cheap: one `Arc` clone.
    pub fn current(&self) -> Arc<Versioned<T>> {
        Arc::clone(&self.read())
    }

    pub fn version(&self) -> u64 {
        self.read().version
    }

    /// Replace the published value and return its new version number.
    pub fn publish(&self, value: T) -> u64 {
        let mut slot = self.write();
        let version = slot.version + 1;
        *slot = Arc::new(Versioned { version, value });
        version
    }

    /// Derive the next value from the current one while holding the write
    /// lock, so concurrent read-modify-publish cycles cannot lose updates.
    /// Nothing is published if `f` fails.
    pub fn publish_with<E>(&self, f: impl FnOnce(&T) -> Result<T, E>) -> Result<u64, E> {
        let mut slot = self.write();
        let next = f(&slot.value)?;
        let version = slot.version + 1;
        *slot = Arc::new(Versioned { version, value: next });
        Ok(version)
    }

    // A panicking writer cannot leave a half-built value behind (the swap is
    // a single store), so a poisoned lock still guards a consistent `Arc`.
    fn read(&self) -> RwLockReadGuard<'_, Arc<Versioned<T>>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arc<Versioned<T>>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: Default> Default for Snapshot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
