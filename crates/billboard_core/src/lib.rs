//! # Billboard Core
//!
//! Low-level access to the simulated program's address space.
//!
//! - [`GuestMemory`] translates 32-bit virtual addresses into offsets of the
//!   shared byte buffer and performs typed, bounds-checked accesses.
//! - [`FrameArena`] hands out scratch space from a reserved region of that
//!   buffer and forgets everything when the frame token changes.
//!
//! ## Example
//!
//! ```rust,ignore
//! use billboard_core::{FrameArena, GuestAddr, GuestMemory};
//!
//! let mut rdram = vec![0u8; 16 * 1024 * 1024];
//! let mut mem = GuestMemory::new(&mut rdram);
//! let mut arena = FrameArena::with_defaults();
//!
//! let scratch = arena.allocate(frame_token, 64)?;
//! mem.write_u32(scratch, 0xDEAD_BEEF)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod memory;

pub use error::{CoreError, CoreResult};
pub use memory::{FrameArena, GuestAddr, GuestMemory};
