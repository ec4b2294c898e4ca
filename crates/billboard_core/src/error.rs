//! # Core Error Types
//!
//! Failures raised by guest memory access and arena allocation.

use thiserror::Error;

use crate::memory::GuestAddr;

/// Errors that can occur while touching guest memory.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// The access does not fit inside the guest buffer.
    #[error("address {address} (+{len} bytes) is outside guest memory of {size} bytes")]
    OutOfRange {
        /// Virtual address of the access.
        address: GuestAddr,
        /// Length of the access in bytes.
        len: usize,
        /// Size of the guest buffer in bytes.
        size: usize,
    },

    /// The frame arena cannot satisfy the request this frame.
    #[error("frame arena exhausted: need {requested} slots, {used}/{capacity} in use")]
    ArenaExhausted {
        /// Slots the request rounds up to.
        requested: u32,
        /// Slots already handed out this frame.
        used: u32,
        /// Total slots in the arena.
        capacity: u32,
    },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
