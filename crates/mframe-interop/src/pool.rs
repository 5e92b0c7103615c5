//! Per-producer interop registration cache.
//!
//! Registering a hardware surface with the importing subsystem is expensive
//! (API handshakes, view creation). A [`BufferPool`] is kept per producer —
//! one decoder's surface allocator — and handed to every import call for
//! frames from that producer, so repeated frames referencing the same native
//! resource skip re-registration.
//!
//! The pool grows without bound by design; backpressure against excessive
//! pooling (e.g. limiting decode-ahead) is the caller's responsibility.
//! Teardown is not reference-counted against outstanding frames: the caller
//! must free the pool only after every frame created from it is gone.

use crate::descriptor::{NativeHandle, ResourceKind};
use mframe_core::PixelFormat;
use smallvec::SmallVec;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Cache key for one registration. A native handle re-registered at a new
/// geometry or format is a distinct registration, never a stale cache hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PoolKey {
    pub handle: usize,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
}

/// One plane of a normalized registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneReg {
    /// Native handle backing the plane (view, surface or device pointer).
    pub handle: NativeHandle,
    /// Bytes per row.
    pub stride: usize,
}

/// Backend-specific registration state kept for export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendExtra {
    #[default]
    None,
    D3d11 {
        sub_resource: u32,
    },
    Vaapi {
        display: NativeHandle,
        x11_display: NativeHandle,
    },
    Cuda {
        context: NativeHandle,
        stream: NativeHandle,
    },
}

/// A native resource normalized to an explicit per-plane list.
#[derive(Debug, Clone)]
pub struct Registration {
    pub kind: ResourceKind,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub planes: SmallVec<[PlaneReg; 4]>,
    pub extra: BackendExtra,
}

/// Cache of interop registrations for one producer.
#[derive(Debug, Default)]
pub struct BufferPool {
    entries: HashMap<PoolKey, Registration>,
    registrations: u64,
}

impl BufferPool {
    /// An empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registration operations actually performed (cache misses).
    pub fn registrations(&self) -> u64 {
        self.registrations
    }

    /// Number of distinct resources currently registered.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no resource has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the registration for `key`, running `register` only on a miss.
    pub(crate) fn register_with(
        &mut self,
        key: PoolKey,
        register: impl FnOnce() -> Registration,
    ) -> Registration {
        if let Some(found) = self.entries.get(&key) {
            trace!(handle = key.handle, "reusing interop registration");
            return found.clone();
        }
        let reg = register();
        debug!(
            handle = key.handle,
            backend = reg.kind.name(),
            width = key.width,
            height = key.height,
            "registered interop resource"
        );
        self.registrations += 1;
        self.entries.insert(key, reg.clone());
        reg
    }
}

/// Release a lazily-created pool's bookkeeping.
///
/// The caller must guarantee that no frame created from this pool is still
/// alive; violating that leaves dangling native handles (a caller error, not
/// a fault this layer can detect).
pub fn free_pool(pool: &mut Option<BufferPool>) {
    if let Some(freed) = pool.take() {
        debug!(
            resources = freed.len(),
            registrations = freed.registrations(),
            "freed interop pool"
        );
    }
}
