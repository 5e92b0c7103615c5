//! Boundary surfaces of the mframe playback engine.
//!
//! Everything here is the "edge" of the frame subsystem: ref-counted handles
//! for passing frames across ownership boundaries, the filter callback
//! contract with its drain driver, the metadata cursor protocol, and the
//! process-wide configuration (log routing, global options).

pub mod filter;
pub mod global;
pub mod handle;
pub mod metadata;

pub use filter::{run_filter, FrameFilter};
pub use global::{log, log_level, option, set_log_handler, set_log_level, set_option, LogHandler, LogLevel};
pub use handle::{FrameHandle, RawFrame};
pub use metadata::{Entry, Metadata};
