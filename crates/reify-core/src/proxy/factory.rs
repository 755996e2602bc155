//! Array proxy factory
//!
//! Keeps one slot per subject. A slot holds the subject weakly and its base
//! proxy strongly, so the base stays cached while the subject lives and the
//! cache never keeps a subject alive. Racing creators build their bases
//! outside any lock and converge on whichever was published first.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

use super::array_proxy::{ArrayProxy, ProxyCore, ProxySubject};
use super::targets::ProxyRequest;
use crate::error::RuntimeResult;
use crate::object::{HostArray, HostString};
use crate::runtime::TypeSystem;

enum WeakSubject {
    Array(Weak<HostArray>),
    Chars(Weak<HostString>),
}

impl WeakSubject {
    fn new(subject: &ProxySubject) -> Self {
        match subject {
            ProxySubject::Array(a) => WeakSubject::Array(Arc::downgrade(a)),
            ProxySubject::Chars(s) => WeakSubject::Chars(Arc::downgrade(s)),
        }
    }

    fn is(&self, subject: &ProxySubject) -> bool {
        match (self, subject) {
            (WeakSubject::Array(w), ProxySubject::Array(a)) => {
                w.strong_count() > 0 && std::ptr::eq(w.as_ptr(), Arc::as_ptr(a))
            }
            (WeakSubject::Chars(w), ProxySubject::Chars(s)) => {
                w.strong_count() > 0 && std::ptr::eq(w.as_ptr(), Arc::as_ptr(s))
            }
            _ => false,
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            WeakSubject::Array(w) => w.strong_count() > 0,
            WeakSubject::Chars(w) => w.strong_count() > 0,
        }
    }
}

struct ProxySlot {
    subject: WeakSubject,
    core: Arc<ProxyCore>,
}

impl ProxySlot {
    fn new(subject: &ProxySubject, core: &Arc<ProxyCore>) -> Self {
        Self {
            subject: WeakSubject::new(subject),
            core: core.clone(),
        }
    }

    /// Base proxy of `subject`, if this slot belongs to it
    fn core_for(&self, subject: &ProxySubject) -> Option<Arc<ProxyCore>> {
        if self.subject.is(subject) {
            Some(self.core.clone())
        } else {
            None
        }
    }

    fn is_alive(&self) -> bool {
        self.subject.is_alive()
    }
}

/// Creates and caches collection proxies per subject
pub struct ArrayProxyFactory {
    slots: DashMap<usize, ProxySlot, FxBuildHasher>,
    publications: AtomicUsize,
    sweep_interval: usize,
}

impl ArrayProxyFactory {
    /// Create a factory sweeping dead slots every `sweep_interval` publications
    pub fn new(sweep_interval: usize) -> Self {
        Self {
            slots: DashMap::with_hasher(FxBuildHasher),
            publications: AtomicUsize::new(0),
            sweep_interval,
        }
    }

    /// Proxy for `subject` if it satisfies `request`
    ///
    /// Marker requests are satisfied by any proxy. Generic requests also need
    /// the subject's array type to be assignable to the requested interface;
    /// otherwise `None` is returned even though the base proxy exists.
    pub fn proxy_for(
        &self,
        system: &TypeSystem,
        subject: ProxySubject,
        request: &ProxyRequest,
    ) -> RuntimeResult<Option<Arc<ArrayProxy>>> {
        let proxy = self.get_or_create(system, subject)?;
        match request {
            ProxyRequest::Marker(_) => Ok(Some(proxy)),
            ProxyRequest::Generic(_, target) => {
                if proxy.satisfies(system, target) {
                    Ok(Some(proxy))
                } else {
                    trace!(target = %target.name(), subject = %proxy.subject_type().name(), "proxy does not satisfy interface");
                    Ok(None)
                }
            }
        }
    }

    /// The base proxy of `subject`, created on first use
    pub fn get_or_create(
        &self,
        system: &TypeSystem,
        subject: ProxySubject,
    ) -> RuntimeResult<Arc<ArrayProxy>> {
        let key = subject.key();
        if let Some(existing) = self.slots.get(&key).and_then(|slot| slot.core_for(&subject)) {
            trace!(subject = %existing.subject_type().name(), "proxy reused");
            return Ok(Arc::new(ArrayProxy::with_core(subject, existing)));
        }

        let fresh = Arc::new(ProxyCore::new(system, &subject)?);
        let (core, published) = match self.slots.entry(key) {
            Entry::Occupied(mut occupied) => match occupied.get().core_for(&subject) {
                Some(winner) => (winner, false),
                None => {
                    occupied.insert(ProxySlot::new(&subject, &fresh));
                    (fresh, true)
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(ProxySlot::new(&subject, &fresh));
                (fresh, true)
            }
        };

        if published {
            debug!(subject = %core.subject_type().name(), "proxy published");
            self.after_publication();
        } else {
            trace!(subject = %core.subject_type().name(), "lost proxy race, adopted winner");
        }
        Ok(Arc::new(ArrayProxy::with_core(subject, core)))
    }

    fn after_publication(&self) {
        let published = self.publications.fetch_add(1, Ordering::Relaxed) + 1;
        if self.sweep_interval > 0 && published % self.sweep_interval == 0 {
            self.sweep();
        }
    }

    /// Drop slots whose subject is gone; returns how many were removed
    pub fn sweep(&self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| slot.is_alive());
        let removed = before.saturating_sub(self.slots.len());
        debug!(removed, remaining = self.slots.len(), "swept proxy slots");
        removed
    }

    /// Number of slots currently held, live or not
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots whose subject is alive
    pub fn live_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_alive()).count()
    }
}

impl Default for ArrayProxyFactory {
    fn default() -> Self {
        Self::new(128)
    }
}

impl std::fmt::Debug for ArrayProxyFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayProxyFactory")
            .field("slots", &self.slots.len())
            .field("sweep_interval", &self.sweep_interval)
            .finish()
    }
}
