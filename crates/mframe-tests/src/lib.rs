//! Integration test crate for mframe.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the core, interop and abi crates to verify they work
//! together the way a decode/render pipeline uses them.

#[cfg(test)]
mod conversion;

#[cfg(test)]
mod interop;

#[cfg(test)]
mod pipeline;
