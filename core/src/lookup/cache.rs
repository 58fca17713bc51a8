//! Per-class handle caches.
//!
//! Every direct handle registers with the class defining its member so that a
//! redefinition can refresh its vmSlot. Lookups additionally keep keyed caches so
//! that finding the same member twice yields the same handle while it is alive.

use std::sync::{Mutex, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::class::ClassRef;
use crate::handle::{HandleNode, MethodHandle, Payload};
use crate::method_type::MethodType;
use crate::util::sync::lock;

const SWEEP_EVERY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheTable {
    Static,
    Virtual,
    Special,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    pub name: Box<str>,
    pub ty: MethodType,
    pub caller: Option<ClassRef>,
}

#[derive(Default)]
pub struct HandleCache {
    tracked: Mutex<Vec<Weak<HandleNode>>>,
    tracked_since_sweep: AtomicUsize,
    statics: DashMap<CacheKey, Weak<HandleNode>>,
    virtuals: DashMap<CacheKey, Weak<HandleNode>>,
    specials: DashMap<CacheKey, Weak<HandleNode>>,
}

impl HandleCache {
    /// Remembers `handle` for refresh on redefinition.
    pub(crate) fn track(&self, handle: &MethodHandle) {
        let mut tracked = lock(&self.tracked);
        if self.tracked_since_sweep.fetch_add(1, Ordering::Relaxed) >= SWEEP_EVERY {
            self.tracked_since_sweep.store(0, Ordering::Relaxed);
            tracked.retain(|w| w.strong_count() > 0);
        }
        tracked.push(handle.downgrade());
    }

    /// Number of live tracked handles.
    pub fn live_handles(&self) -> usize {
        lock(&self.tracked).iter().filter(|w| w.strong_count() > 0).count()
    }

    /// Re-reads the vmSlot of every live direct handle on this class.
    pub(crate) fn refresh_all(&self) {
        // collect strong refs first; refresh runs engine code outside the lock
        let live: Vec<MethodHandle> = {
            let mut tracked = lock(&self.tracked);
            tracked.retain(|w| w.strong_count() > 0);
            tracked.iter().filter_map(MethodHandle::upgrade).collect()
        };
        for handle in &live {
            if let Payload::Primitive(target) = handle.payload() {
                target.refresh();
            }
        }
    }

    fn table(&self, table: CacheTable) -> &DashMap<CacheKey, Weak<HandleNode>> {
        match table {
            CacheTable::Static => &self.statics,
            CacheTable::Virtual => &self.virtuals,
            CacheTable::Special => &self.specials,
        }
    }

    /// The cached handle for `key`, or the one `create` builds. Creation runs
    /// without holding a shard lock; when two threads race, the first insert wins.
    pub(crate) fn get_or_insert<F>(&self, table: CacheTable, key: CacheKey, create: F) -> Result<MethodHandle>
    where
        F: FnOnce() -> Result<MethodHandle>,
    {
        let map = self.table(table);
        if let Some(existing) = map.get(&key).and_then(|w| MethodHandle::upgrade(w.value())) {
            return Ok(existing);
        }
        let fresh = create()?;
        match map.entry(key) {
            Entry::Occupied(mut occupied) => match MethodHandle::upgrade(occupied.get()) {
                Some(existing) => Ok(existing),
                None => {
                    occupied.insert(fresh.downgrade());
                    Ok(fresh)
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(fresh.downgrade());
                Ok(fresh)
            }
        }
    }
}
