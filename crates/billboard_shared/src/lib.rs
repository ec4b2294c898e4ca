//! # Billboard Shared
//!
//! Types and constants shared by every layer of the billboard rewriter.
//!
//! ## CRITICAL RULE
//!
//! This crate only describes data. It must never read or write guest memory;
//! that belongs to `billboard_core`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;
pub mod protocol;

pub use constants::{
    BEHIND_CAMERA_Z, FRAME_STATE_PTR, LEVEL_CONFIG, RDRAM_SIZE, SCREEN_HEIGHT, SCREEN_WIDTH,
};
pub use math::{clamp_i16, Mat4};
pub use protocol::{
    billboard_sequence, BillboardDraw, Command, CommandList, ExtendedVertex, GfxCommand,
    MatrixGroup, BILLBOARD_SEQUENCE_WORDS, RESERVED_SEQUENCE_WORDS,
};
