//! Type identity cache
//!
//! Concurrent map from [`TypeKey`] to the one canonical descriptor for that
//! key, plus the global type lock that serializes every cache miss and the
//! static-data binding protocol.
//!
//! Lookups first probe the map without locking and accept only fully
//! initialized descriptors. A miss takes the type lock and re-checks. The lock
//! is reentrant so that a thread resolving types from inside a static-data
//! constructor can see the shell it has already published.
//!
//! While a shell is open, every publication is journaled. If the shell fails,
//! anything published since it opened that is built from it is withdrawn
//! along with it.

use dashmap::DashMap;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use rustc_hash::FxBuildHasher;
use std::cell::{Cell, RefCell};
use tracing::{debug, trace};

use super::descriptor::TypeRef;
use super::key::TypeKey;

/// Instantiation whose static data is being bound
pub(crate) struct PendingInstantiation {
    pub(crate) ty: TypeRef,
    pub(crate) published: bool,
}

/// State guarded by the type lock
pub(crate) struct TypeLockState {
    pub(crate) pending: RefCell<Option<PendingInstantiation>>,
    journal: RefCell<Vec<TypeKey>>,
    open_shells: Cell<usize>,
}

/// Held type lock
pub(crate) type TypeLockGuard<'a> = ReentrantMutexGuard<'a, TypeLockState>;

/// Canonical descriptor registry
pub struct TypeIdentityCache {
    entries: DashMap<TypeKey, TypeRef, FxBuildHasher>,
    lock: ReentrantMutex<TypeLockState>,
}

impl TypeIdentityCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty cache sized for `capacity` descriptors
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity_and_hasher(capacity, FxBuildHasher),
            lock: ReentrantMutex::new(TypeLockState {
                pending: RefCell::new(None),
                journal: RefCell::new(Vec::new()),
                open_shells: Cell::new(0),
            }),
        }
    }

    /// Lock-free probe; only initialized descriptors are returned
    pub fn get(&self, key: &TypeKey) -> Option<TypeRef> {
        let ty = self.entries.get(key).map(|e| e.value().clone())?;
        if ty.is_initialized() {
            trace!(ty = %ty.name(), "type cache hit");
            Some(ty)
        } else {
            None
        }
    }

    /// Take the global type lock
    pub(crate) fn lock(&self) -> TypeLockGuard<'_> {
        self.lock.lock()
    }

    /// Probe under the type lock; may return a shell this thread is still building
    pub(crate) fn get_locked(&self, _guard: &TypeLockGuard<'_>, key: &TypeKey) -> Option<TypeRef> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    /// Publish a descriptor under the type lock
    pub(crate) fn publish(&self, guard: &TypeLockGuard<'_>, key: TypeKey, ty: TypeRef) {
        if guard.open_shells.get() > 0 {
            guard.journal.borrow_mut().push(key.clone());
        }
        self.entries.insert(key, ty);
    }

    /// Start journaling publications for a new shell; returns its mark
    pub(crate) fn open_shell(&self, guard: &TypeLockGuard<'_>) -> usize {
        guard.open_shells.set(guard.open_shells.get() + 1);
        guard.journal.borrow().len()
    }

    /// Close the shell opened at `mark`
    ///
    /// With `failed` set, every descriptor published since `mark` that is
    /// built from `failed` (including `failed` itself) is withdrawn. Closing
    /// the outermost shell initializes everything left in the journal.
    pub(crate) fn close_shell(&self, guard: &TypeLockGuard<'_>, mark: usize, failed: Option<&TypeRef>) {
        if let Some(failed) = failed {
            let recorded = {
                let mut journal = guard.journal.borrow_mut();
                let mark = mark.min(journal.len());
                journal.split_off(mark)
            };
            let mut kept = Vec::with_capacity(recorded.len());
            for key in recorded {
                let stale = self
                    .entries
                    .get(&key)
                    .map(|e| e.value().mentions(failed))
                    .unwrap_or(false);
                if stale {
                    if let Some((_, ty)) = self.entries.remove(&key) {
                        debug!(ty = %ty.name(), failed = %failed.name(), "withdrew type built on failed instantiation");
                    }
                } else {
                    kept.push(key);
                }
            }
            guard.journal.borrow_mut().extend(kept);
        }

        let open = guard.open_shells.get().saturating_sub(1);
        guard.open_shells.set(open);
        if open == 0 {
            // Nothing is pending any more; what survived is final.
            for key in guard.journal.borrow_mut().drain(..) {
                if let Some(entry) = self.entries.get(&key) {
                    entry.value().mark_initialized();
                }
            }
        }
    }

    /// Number of published descriptors
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been published
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if a descriptor is published for `key`
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.entries.contains_key(key)
    }
}

impl Default for TypeIdentityCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeIdentityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeIdentityCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}
