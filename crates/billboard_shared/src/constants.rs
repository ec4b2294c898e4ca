//! # Legacy Renderer Constants
//!
//! Fixed guest addresses and calibration values of the legacy renderer.
//!
//! **CRITICAL:** The scaling factors below reproduce the game's own
//! fixed-point conventions. They are measured, not derived; changing any of
//! them shifts every rewritten sprite away from where the original draw put it.

// =============================================================================
// GUEST ADDRESSES
// =============================================================================

/// Slot holding the pointer to the current display-list state block.
/// Its value changes once per rendered frame.
pub const FRAME_STATE_PTR: u32 = 0x8020_4278;

/// Current screen width (signed halfword).
pub const SCREEN_WIDTH: u32 = 0x8020_3FD0;

/// Current screen height (signed halfword).
pub const SCREEN_HEIGHT: u32 = 0x8020_3FD2;

/// Active level configuration block.
pub const LEVEL_CONFIG: u32 = 0x803F_2D50;

/// Vertical field of view (f32) inside the level configuration.
pub const LEVEL_CONFIG_FOV_Y: u32 = 0xE0;

/// Primitive depth bias (signed halfword) inside the level configuration.
pub const LEVEL_CONFIG_DEPTH_BIAS: u32 = 0x42;

/// Row-major 4×4 f32 view-projection matrix inside the display-list state.
pub const FRAME_STATE_VIEW_PROJ: u32 = 0x38A10;

/// Addressable RDRAM. Display lists never live above this.
pub const RDRAM_SIZE: u32 = 0x0080_0000;

// =============================================================================
// CALL ARGUMENTS (stack offsets of the legacy billboard draw routines)
// =============================================================================

/// Half width of the sprite, in texels.
pub const ARG_HALF_W: u32 = 0x10;
/// Half height of the sprite, in texels.
pub const ARG_HALF_H: u32 = 0x14;
/// Uniform (or X) scale.
pub const ARG_SCALE: u32 = 0x18;
/// Y scale for dual-scale routines.
pub const ARG_SCALE_Y: u32 = 0x1C;
/// Horizontal wraparound flag (low byte).
pub const ARG_WRAP: u32 = 0x20;
/// Offset clamp for routines that cap sprite extents.
pub const ARG_OFFSET_CLAMP: u32 = 0x24;

// =============================================================================
// CALIBRATION
// =============================================================================

/// World coordinates are 16.16 fixed point.
pub const FIXED_POINT_ONE: f32 = 65536.0;

/// Anything with camera depth above this is behind or too close to the eye.
pub const BEHIND_CAMERA_Z: f32 = -3.0;

/// Screen space runs at 4 subpixels per pixel.
pub const SUBPIXELS: f32 = 4.0;

/// Screen center in subpixels is `size * CENTER_BIAS`.
pub const CENTER_BIAS: f32 = 2.0;

/// Numerator of the field-of-view scale term.
pub const FOV_SCALE: f32 = 33.0;

/// Multiplier applied after the field-of-view term.
pub const SPRITE_SCALE: f32 = 32.0;

/// Divisor turning half extents times sprite scale into subpixels.
pub const HALF_EXTENT_DIVISOR: f32 = 128.0;

/// Smallest field of view magnitude treated as valid.
pub const FOV_EPSILON: f32 = 0.0001;

/// Depth proxy to primitive depth: `clip_w * DEPTH_SCALE + DEPTH_BASE`.
pub const DEPTH_SCALE: f32 = 1023.0 * 32.0;

/// See [`DEPTH_SCALE`].
pub const DEPTH_BASE: f32 = 32736.0;
