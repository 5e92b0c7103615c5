//! Ref-counted frame handles for boundary transfer.
//!
//! A [`FrameHandle`] is the wrapper side of the ownership protocol: it is
//! either unbound or holds one reference to a shared frame. [`make_ref`]
//! mints additional owners, [`unref`] drops one; the frame's storage (and any
//! plane release callbacks) is freed exactly when the last owner lets go.
//! [`detach`]/[`attach`] move a reference across a boundary as a raw handle
//! without touching the count, so neither side can double-free.
//!
//! [`make_ref`]: FrameHandle::make_ref
//! [`unref`]: FrameHandle::unref
//! [`detach`]: FrameHandle::detach
//! [`attach`]: FrameHandle::attach

use std::fmt;
use std::mem::ManuallyDrop;
use std::sync::Arc;

/// A frame reference in transit across an ownership boundary.
///
/// Produced by [`FrameHandle::detach`], consumed by [`FrameHandle::attach`].
/// It owns exactly one reference: dropping it without re-attaching releases
/// that reference, so a handle lost in transit cannot leak the frame.
pub struct RawFrame<F> {
    ptr: *const F,
}

// Safety: RawFrame owns one reference to an Arc<F>; the count is atomic and
// the pointee is never accessed mutably through this type, so moving or
// sharing the raw reference between threads follows Arc's own rules.
#[allow(unsafe_code)]
unsafe impl<F: Send + Sync> Send for RawFrame<F> {}
#[allow(unsafe_code)]
unsafe impl<F: Send + Sync> Sync for RawFrame<F> {}

impl<F> RawFrame<F> {
    fn from_arc(frame: Arc<F>) -> Self {
        Self {
            ptr: Arc::into_raw(frame),
        }
    }

    fn into_arc(self) -> Arc<F> {
        let this = ManuallyDrop::new(self);
        // Safety: ptr came from Arc::into_raw in from_arc and is consumed
        // exactly once; ManuallyDrop prevents the Drop impl from consuming
        // it a second time.
        #[allow(unsafe_code)]
        unsafe {
            Arc::from_raw(this.ptr)
        }
    }

    /// Address of the shared frame, for logging or identity checks only.
    pub fn as_ptr(&self) -> *const F {
        self.ptr
    }
}

impl<F> Drop for RawFrame<F> {
    fn drop(&mut self) {
        // Safety: the reference was never re-attached, so this is its one
        // and only reconstruction.
        #[allow(unsafe_code)]
        unsafe {
            drop(Arc::from_raw(self.ptr));
        }
    }
}

impl<F> fmt::Debug for RawFrame<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawFrame").field(&self.ptr).finish()
    }
}

/// One owner's view of a shared frame, or no frame at all.
pub struct FrameHandle<F> {
    frame: Option<Arc<F>>,
}

impl<F> Default for FrameHandle<F> {
    fn default() -> Self {
        Self::unbound()
    }
}

impl<F> FrameHandle<F> {
    /// A handle bound to nothing. Filter drain calls receive one of these.
    pub fn unbound() -> Self {
        Self { frame: None }
    }

    /// Take exclusive ownership of a new frame.
    pub fn new(frame: F) -> Self {
        Self {
            frame: Some(Arc::new(frame)),
        }
    }

    /// Whether the handle currently refers to a frame.
    pub fn is_bound(&self) -> bool {
        self.frame.is_some()
    }

    /// Read access to the frame, if bound.
    pub fn get(&self) -> Option<&F> {
        self.frame.as_deref()
    }

    /// Number of owners of the bound frame. 0 when unbound.
    pub fn ref_count(&self) -> usize {
        self.frame.as_ref().map_or(0, Arc::strong_count)
    }

    /// Mint a new handle sharing the same frame (count + 1).
    /// A ref of an unbound handle is unbound.
    pub fn make_ref(&self) -> FrameHandle<F> {
        Self {
            frame: self.frame.clone(),
        }
    }

    /// Drop this handle's reference (count − 1) and become unbound.
    ///
    /// When this was the last reference, the frame's storage is released and
    /// its plane release callbacks fire, on the calling thread.
    pub fn unref(&mut self) {
        self.frame = None;
    }

    /// Adopt `raw` as this handle's frame, first releasing whatever it held.
    pub fn attach(&mut self, raw: RawFrame<F>) {
        self.unref();
        self.frame = Some(raw.into_arc());
    }

    /// Relinquish the reference without decrementing, for transfer across a
    /// boundary. Leaves this handle unbound; `None` if it already was.
    pub fn detach(&mut self) -> Option<RawFrame<F>> {
        self.frame.take().map(RawFrame::from_arc)
    }
}

impl<F: fmt::Debug> fmt::Debug for FrameHandle<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.frame {
            Some(frame) => f
                .debug_struct("FrameHandle")
                .field("frame", frame)
                .field("refs", &Arc::strong_count(frame))
                .finish(),
            None => f.write_str("FrameHandle(unbound)"),
        }
    }
}
