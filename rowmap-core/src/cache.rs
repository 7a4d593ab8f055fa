use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::dialect::SqlDialect;
use crate::error::{RowmapError, RowmapResult};
use crate::introspect::introspect;
use crate::model::Pojo;
use crate::pojo::PojoInfo;

type Key = (TypeId, Arc<str>);
type Slot = Arc<OnceCell<Arc<dyn Any + Send + Sync>>>;

/// Descriptors keyed by row type and dialect.
///
/// Each key gets its own cell, so a descriptor is built at most once even when
/// several threads ask for it first; the map lock is never held during a build.
/// A failed build leaves the cell empty and the next request tries again.
///
/// After publication a lookup holds the map's read lock only while cloning the
/// slot `Arc`. Readers share that lock and never wait on a build; they can only
/// be held up by a writer inserting a new slot or evicting.
#[derive(Default)]
pub struct DescriptorCache {
    slots: RwLock<HashMap<Key, Slot>>,
    builds: AtomicU64,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the descriptor of `T` for `dialect`, building it on first use.
    ///
    /// # Errors
    ///
    /// Propagates introspection errors; nothing is cached in that case.
    pub fn get_or_try_build<T: Pojo>(&self, dialect: &dyn SqlDialect) -> RowmapResult<Arc<PojoInfo<T>>> {
        self.get_or_try_build_keyed(dialect, &Arc::from(dialect.cache_key()))
    }

    /// Like [`get_or_try_build`](Self::get_or_try_build), with the dialect's
    /// cache key computed once by the caller.
    ///
    /// # Errors
    ///
    /// Propagates introspection errors; nothing is cached in that case.
    pub fn get_or_try_build_keyed<T: Pojo>(
        &self,
        dialect: &dyn SqlDialect,
        dialect_key: &Arc<str>,
    ) -> RowmapResult<Arc<PojoInfo<T>>> {
        let slot = self.slot((TypeId::of::<T>(), Arc::clone(dialect_key)));
        let entry = slot.get_or_try_init(|| {
            let started = Instant::now();
            let info = introspect::<T>(dialect)?;
            let elapsed = started.elapsed();
            self.builds.fetch_add(1, Ordering::Relaxed);
            crate::metrics::record_descriptor_build(info.type_name(), elapsed);
            debug!(
                type_name = info.type_name(),
                table = info.table(),
                dialect = dialect.name(),
                columns = info.properties().len(),
                elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
                "built pojo descriptor"
            );
            Ok::<_, RowmapError>(Arc::new(info) as Arc<dyn Any + Send + Sync>)
        })?;
        Arc::clone(entry)
            .downcast::<PojoInfo<T>>()
            .map_err(|_| RowmapError::mapping("descriptor cache entry has an unexpected type"))
    }

    fn slot(&self, key: Key) -> Slot {
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key).or_default())
    }

    /// Drops every descriptor of `T`. Returns how many were dropped.
    pub fn evict<T: Pojo>(&self) -> usize {
        let type_id = TypeId::of::<T>();
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let before = slots.len();
        slots.retain(|(id, _), _| *id != type_id);
        before - slots.len()
    }

    /// Drops every descriptor.
    pub fn clear(&self) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of descriptors built so far, including rebuilt ones.
    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    /// Number of published descriptors.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for DescriptorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorCache")
            .field("descriptors", &self.len())
            .field("builds", &self.build_count())
            .finish()
    }
}
