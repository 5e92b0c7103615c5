//! Plane storage and external-buffer ownership.
//!
//! A plane either owns its bytes (a slice of an `Arc`-shared host block, so
//! cloned frames and non-copying conversions share storage) or references
//! externally-owned memory carrying a [`ReleaseToken`] that fires exactly once
//! when the last reference to the owning frame is dropped.

use std::fmt;
use std::sync::Arc;

/// Exactly-once release callback for externally-owned memory.
///
/// The callback runs when the token is dropped, on whichever thread drops the
/// last reference to the frame holding it. Frequently that is the render
/// thread, not the producer thread that registered it.
pub struct ReleaseToken {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ReleaseToken {
    /// Wrap a release callback.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A token that releases nothing.
    pub fn noop() -> Self {
        Self { release: None }
    }
}

// Safety: the callback is only reachable through `&mut self` (in Drop), so a
// shared ReleaseToken exposes nothing callable; Sync adds no new access.
#[allow(unsafe_code)]
unsafe impl Sync for ReleaseToken {}

impl Drop for ReleaseToken {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for ReleaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseToken")
            .field("armed", &self.release.is_some())
            .finish()
    }
}

/// Externally-owned plane memory: a data pointer (null for device-only
/// resources that have no host mapping) and the release token for it.
pub struct ExternalBuffer {
    data: *const u8,
    len: usize,
    _token: ReleaseToken,
}

// Safety: the pointer is treated as an opaque address owned by the producer.
// The producer guarantees validity until the token fires, and the token is
// Send, so moving the buffer between threads only moves where release runs.
#[allow(unsafe_code)]
unsafe impl Send for ExternalBuffer {}
#[allow(unsafe_code)]
unsafe impl Sync for ExternalBuffer {}

impl ExternalBuffer {
    /// Wrap external memory. `data` may be null for device-only planes.
    pub fn new(data: *const u8, len: usize, token: ReleaseToken) -> Self {
        Self {
            data,
            len,
            _token: token,
        }
    }

    /// Host view of the memory, if it has a host mapping.
    pub fn data(&self) -> Option<&[u8]> {
        if self.data.is_null() {
            return None;
        }
        // Safety: non-null pointers are valid for `len` bytes until the
        // release token fires, per the ExternalBuffer contract above.
        #[allow(unsafe_code)]
        Some(unsafe { std::slice::from_raw_parts(self.data, self.len) })
    }
}

impl fmt::Debug for ExternalBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalBuffer")
            .field("data", &self.data)
            .field("len", &self.len)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
enum PlaneStorage {
    /// Never attached; accessors return nothing.
    #[default]
    Unset,
    /// Slice of a frame-owned host allocation.
    Host {
        block: Arc<Vec<u8>>,
        offset: usize,
        len: usize,
    },
    /// Externally-owned memory, shared so frame clones release it once.
    External(Arc<ExternalBuffer>),
}

/// One plane of a frame.
///
/// `stride` is bytes per row for video planes and the full byte size for
/// audio planes.
#[derive(Debug, Clone, Default)]
pub struct Plane {
    storage: PlaneStorage,
    stride: usize,
}

impl Plane {
    /// A plane with no storage attached.
    pub fn unset() -> Self {
        Self::default()
    }

    /// A plane slicing `len` bytes of a shared host block at `offset`.
    pub fn host(block: Arc<Vec<u8>>, offset: usize, len: usize, stride: usize) -> Self {
        debug_assert!(offset + len <= block.len());
        Self {
            storage: PlaneStorage::Host { block, offset, len },
            stride,
        }
    }

    /// A plane referencing externally-owned memory.
    pub fn external(buffer: Arc<ExternalBuffer>, stride: usize) -> Self {
        Self {
            storage: PlaneStorage::External(buffer),
            stride,
        }
    }

    /// Whether any storage is attached.
    pub fn is_set(&self) -> bool {
        !matches!(self.storage, PlaneStorage::Unset)
    }

    /// Whether the bytes live in frame-owned host memory.
    pub fn is_host(&self) -> bool {
        matches!(self.storage, PlaneStorage::Host { .. })
    }

    /// Bytes per row (video) or total byte size (audio). 0 when unset.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Byte size of the plane's storage. 0 when unset or unmapped.
    pub fn len(&self) -> usize {
        match &self.storage {
            PlaneStorage::Unset => 0,
            PlaneStorage::Host { len, .. } => *len,
            PlaneStorage::External(buf) => buf.data().map_or(0, <[u8]>::len),
        }
    }

    /// Whether the plane holds no readable bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read view of the plane bytes. `None` when unset or device-only.
    pub fn data(&self) -> Option<&[u8]> {
        match &self.storage {
            PlaneStorage::Unset => None,
            PlaneStorage::Host { block, offset, len } => Some(&block[*offset..*offset + *len]),
            PlaneStorage::External(buf) => buf.data(),
        }
    }
}
