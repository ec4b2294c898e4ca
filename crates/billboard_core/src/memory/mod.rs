//! # Memory Management
//!
//! Views and allocators over the guest address space.
//!
//! ## Design Philosophy
//!
//! The guest buffer is owned by the host. This crate only borrows it:
//! - No copies of guest memory are kept across calls
//! - Scratch space comes from a reserved region, never the heap
//! - Arena addresses are valid for one frame only

mod arena;
mod guest;

pub use arena::{FrameArena, ARENA_BASE, ARENA_SLOTS, ARENA_SLOT_BYTES};
pub use guest::{GuestAddr, GuestMemory, KSEG0_BASE};
