//! Frame filter contract and drain driver.
//!
//! A filter receives an in/out frame handle and a track index and returns a
//! pending count. The handle is in/out: the filter may pass the frame
//! through, replace it, or consume it (leaving the handle unbound). A
//! non-zero pending count means the filter still holds queued output and
//! must be invoked again with an unbound handle to drain it before the next
//! real input frame.

use crate::handle::FrameHandle;

/// A stage that transforms frames in place.
pub trait FrameFilter<F> {
    /// Process (or drain into) `frame` for `track`, returning how many more
    /// output frames remain queued inside the filter.
    fn filter(&mut self, frame: &mut FrameHandle<F>, track: usize) -> usize;
}

/// Feed one input frame through `filter` and drain everything it produces.
///
/// The filter is first invoked with `input`, then re-invoked with an unbound
/// handle while it reports pending output. Every invocation that leaves the
/// handle bound contributes one output frame, in production order.
pub fn run_filter<F>(
    filter: &mut dyn FrameFilter<F>,
    input: FrameHandle<F>,
    track: usize,
) -> Vec<FrameHandle<F>> {
    let mut outputs = Vec::new();
    let mut handle = input;
    loop {
        let pending = filter.filter(&mut handle, track);
        if handle.is_bound() {
            outputs.push(std::mem::take(&mut handle));
        }
        if pending == 0 {
            return outputs;
        }
        // Drain call: explicitly no new input.
        handle = FrameHandle::unbound();
    }
}
