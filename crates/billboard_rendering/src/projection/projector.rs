//! World-space billboard → screen-space quad.
//!
//! A single parametrized function covers every draw site; the differences
//! between sites live in [`BillboardConfig`].
//!
//! Screen space here is the legacy renderer's: 4 subpixels per pixel, origin
//! top-left, y down. All scaling constants come from
//! [`billboard_shared::constants`].

use billboard_shared::constants::{
    BEHIND_CAMERA_Z, CENTER_BIAS, DEPTH_BASE, DEPTH_SCALE, FIXED_POINT_ONE, FOV_EPSILON,
    FOV_SCALE, HALF_EXTENT_DIVISOR, SPRITE_SCALE, SUBPIXELS,
};
use billboard_shared::math::clamp_i16;

use crate::error::{RewriteFailure, RewriteResult};
use crate::interpolation::QuadCorners;
use crate::pipeline::RewriteTrace;

use super::view_cache::{ScreenSize, ViewProjection};

/// Clamp range for the computed sprite scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleClamp {
    /// Lower bound.
    pub min: f32,
    /// Upper bound.
    pub max: f32,
}

/// Whether the Y axis has its own scale argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleMode {
    /// One scale for both axes.
    Uniform,
    /// Independent X and Y scales.
    Dual,
}

/// Where the bottom edge of the quad sits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BottomEdge {
    /// Mirror of the top edge around the center.
    Mirrored,
    /// Fixed subpixel distance below the center.
    Fixed(f32),
}

/// What goes into the identity hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityMode {
    /// Include the scale argument. Off for sprites whose scale animates.
    pub include_scale: bool,
    /// Right shift applied to world coordinates before hashing.
    pub coord_shift: u32,
}

/// Per-site projection and identity parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillboardConfig {
    /// Salt keeping identities of different sites apart.
    pub hash_salt: u32,
    /// Sprite scale clamp, applied to each axis.
    pub scale_clamp: ScaleClamp,
    /// Uniform or dual scale.
    pub scale_mode: ScaleMode,
    /// Half height used for geometry instead of the argument.
    pub geometry_half_h: Option<i16>,
    /// Multiplier on the top edge offset.
    pub top_multiplier: f32,
    /// Bottom edge placement.
    pub bottom_edge: BottomEdge,
    /// Wrap the center into `[0, screen_w * 4)`.
    pub wrap_x: bool,
    /// Cap on both offsets, in half-subpixels (doubled before use).
    pub offset_clamp: Option<i16>,
    /// Identity hash inputs.
    pub identity: IdentityMode,
}

impl BillboardConfig {
    /// Default salt (the energy-item routine).
    pub const DEFAULT_SALT: u32 = 0x73F1_7C00;

    /// Creates the default configuration with the given salt.
    #[must_use]
    pub const fn salted(hash_salt: u32) -> Self {
        Self {
            hash_salt,
            scale_clamp: ScaleClamp {
                min: 0.0,
                max: 16383.0,
            },
            scale_mode: ScaleMode::Uniform,
            geometry_half_h: None,
            top_multiplier: 1.0,
            bottom_edge: BottomEdge::Mirrored,
            wrap_x: false,
            offset_clamp: None,
            identity: IdentityMode {
                include_scale: true,
                coord_shift: 0,
            },
        }
    }

    /// Sets the scale clamp range.
    #[must_use]
    pub const fn with_scale_clamp(mut self, min: f32, max: f32) -> Self {
        self.scale_clamp = ScaleClamp { min, max };
        self
    }

    /// Reads a separate Y scale.
    #[must_use]
    pub const fn with_dual_scale(mut self) -> Self {
        self.scale_mode = ScaleMode::Dual;
        self
    }

    /// Anchors the bottom edge a fixed distance below the center.
    #[must_use]
    pub const fn with_fixed_bottom(mut self, offset: f32) -> Self {
        self.bottom_edge = BottomEdge::Fixed(offset);
        self
    }

    /// Overrides the geometry half height and stretches the top edge.
    #[must_use]
    pub const fn with_raised_top(mut self, geometry_half_h: i16, top_multiplier: f32) -> Self {
        self.geometry_half_h = Some(geometry_half_h);
        self.top_multiplier = top_multiplier;
        self
    }

    /// Enables horizontal wraparound.
    #[must_use]
    pub const fn with_wrap_x(mut self, wrap: bool) -> Self {
        self.wrap_x = wrap;
        self
    }

    /// Caps offsets; non-positive values disable the cap.
    #[must_use]
    pub const fn with_offset_clamp(mut self, clamp: i16) -> Self {
        self.offset_clamp = if clamp > 0 { Some(clamp) } else { None };
        self
    }

    /// Sets the identity hash inputs.
    #[must_use]
    pub const fn with_identity(mut self, include_scale: bool, coord_shift: u32) -> Self {
        self.identity = IdentityMode {
            include_scale,
            coord_shift,
        };
        self
    }
}

impl Default for BillboardConfig {
    fn default() -> Self {
        Self::salted(Self::DEFAULT_SALT)
    }
}

/// Per-call arguments of a legacy billboard draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BillboardInput {
    /// World x (16.16).
    pub world_x: i32,
    /// World y (16.16).
    pub world_y: i32,
    /// World z (16.16).
    pub world_z: i32,
    /// Half width in texels.
    pub half_w: i16,
    /// Half height in texels.
    pub half_h: i16,
    /// Scale (X scale for dual-scale sites).
    pub scale: i32,
    /// Y scale argument, if the caller read one. Only honoured under
    /// [`ScaleMode::Dual`].
    pub scale_y: Option<i32>,
}

impl BillboardInput {
    /// Scale applied to the Y axis under `mode`.
    #[must_use]
    pub fn effective_scale_y(&self, mode: ScaleMode) -> i32 {
        match mode {
            ScaleMode::Uniform => self.scale,
            ScaleMode::Dual => self.scale_y.unwrap_or(self.scale),
        }
    }
}

/// A validated screen-space rectangle plus the values that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedQuad {
    /// Left edge (subpixels).
    pub xl: f32,
    /// Top edge.
    pub yl: f32,
    /// Right edge.
    pub xh: f32,
    /// Bottom edge.
    pub yh: f32,
    /// Camera-space depth (negative in front of the camera).
    pub cam_z: f32,
    /// Depth proxy.
    pub clip_w: f32,
    /// Sprite scale, x axis.
    pub sprite_scale_x: f32,
    /// Sprite scale, y axis.
    pub sprite_scale_y: f32,
}

impl ProjectedQuad {
    /// Corners relative to the screen center, rounded to integers.
    ///
    /// Order: top-left, top-right, bottom-left, bottom-right.
    #[must_use]
    pub fn corners(&self, screen: ScreenSize) -> QuadCorners {
        let cx = f32::from(screen.width) * CENTER_BIAS;
        let cy = f32::from(screen.height) * CENTER_BIAS;
        let l = clamp_i16(self.xl - cx);
        let r = clamp_i16(self.xh - cx);
        let t = clamp_i16(self.yl - cy);
        let b = clamp_i16(self.yh - cy);
        QuadCorners {
            x: [l, r, l, r],
            y: [t, t, b, b],
        }
    }

    /// Primitive depth for the draw, after the level's bias.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn depth_key(&self, bias: i16) -> u16 {
        let raw = (self.clip_w * DEPTH_SCALE + DEPTH_BASE).round() as i32 - i32::from(bias);
        (raw & 0xFFFF) as u16
    }
}

/// Checks the per-call arguments.
///
/// # Errors
///
/// [`RewriteFailure::InvalidArgs`] if a half extent or a scale in use under
/// `mode` is not positive.
pub fn validate_args(input: &BillboardInput, mode: ScaleMode) -> RewriteResult<()> {
    if input.half_w <= 0
        || input.half_h <= 0
        || input.scale <= 0
        || input.effective_scale_y(mode) <= 0
    {
        return Err(RewriteFailure::InvalidArgs);
    }
    Ok(())
}

/// Checks the screen dimensions.
///
/// # Errors
///
/// [`RewriteFailure::InvalidScreen`] if either dimension is not positive.
pub fn validate_screen(screen: ScreenSize) -> RewriteResult<()> {
    if screen.is_valid() {
        Ok(())
    } else {
        Err(RewriteFailure::InvalidScreen)
    }
}

/// Projects one billboard.
///
/// `trace` receives every intermediate value computed before the outcome is
/// known.
///
/// # Errors
///
/// The first failed precondition, in this order: arguments, screen, behind
/// camera, depth proxy, field of view, sprite scale, visibility.
#[allow(clippy::similar_names)]
pub fn project(
    input: &BillboardInput,
    screen: ScreenSize,
    fov_y: f32,
    view: &ViewProjection,
    config: &BillboardConfig,
    trace: &mut RewriteTrace,
) -> RewriteResult<ProjectedQuad> {
    validate_args(input, config.scale_mode)?;
    validate_screen(screen)?;

    #[allow(clippy::cast_precision_loss)]
    let (x, y, z) = (
        input.world_x as f32 / FIXED_POINT_ONE,
        input.world_y as f32 / FIXED_POINT_ONE,
        input.world_z as f32 / FIXED_POINT_ONE,
    );

    let cam_z = view.transform_row(2, x, y, z);
    trace.cam_z = cam_z;
    // Written as a negated comparison so NaN is rejected too.
    if !(cam_z <= BEHIND_CAMERA_Z) {
        return Err(RewriteFailure::BehindCamera);
    }

    let clip_w = (view.at(3, 2) * cam_z + view.at(3, 3)) / -cam_z;
    trace.clip_w = clip_w;
    if !(clip_w > 0.0) {
        return Err(RewriteFailure::InvalidClipW);
    }

    let proj_x = view.transform_row(0, x, y, z);
    let proj_y = view.transform_row(1, x, y, z);

    let screen_w = f32::from(screen.width);
    let screen_h = f32::from(screen.height);
    let center_x = (view.at(3, 0) * proj_x) / cam_z + screen_w * CENTER_BIAS;
    let center_y = (view.at(3, 1) * proj_y) / cam_z + screen_h * CENTER_BIAS;

    if !fov_y.is_finite() || fov_y.abs() < FOV_EPSILON {
        return Err(RewriteFailure::InvalidFov);
    }

    #[allow(clippy::cast_precision_loss)]
    let (scaled_x, scaled_y) = (
        input.scale as f32 * FOV_SCALE / fov_y,
        input.effective_scale_y(config.scale_mode) as f32 * FOV_SCALE / fov_y,
    );
    let clamp = config.scale_clamp;
    let sprite_scale_x = clamp_scale(scaled_x * SPRITE_SCALE / -cam_z, clamp);
    let sprite_scale_y = clamp_scale(scaled_y * SPRITE_SCALE / -cam_z, clamp);
    trace.sprite_scale = sprite_scale_x;
    if !(sprite_scale_x > 0.0) || !(sprite_scale_y > 0.0) {
        return Err(RewriteFailure::InvalidSpriteScale);
    }

    let geometry_half_h = config.geometry_half_h.unwrap_or(input.half_h);
    let mut x_offset = f32::from(input.half_w) * sprite_scale_x / HALF_EXTENT_DIVISOR;
    let mut y_offset = f32::from(geometry_half_h) * sprite_scale_y / HALF_EXTENT_DIVISOR;
    if let Some(cap) = config.offset_clamp {
        let cap = f32::from(cap) * 2.0;
        x_offset = x_offset.min(cap);
        y_offset = y_offset.min(cap);
    }

    let screen_max_x = screen_w * SUBPIXELS;
    let screen_max_y = screen_h * SUBPIXELS;

    let center_x = if config.wrap_x {
        wrap(center_x, screen_max_x)
    } else {
        center_x
    };

    let xl = center_x - x_offset;
    let xh = center_x + x_offset;
    let yl = center_y - y_offset * config.top_multiplier;
    let yh = match config.bottom_edge {
        BottomEdge::Mirrored => center_y + y_offset,
        BottomEdge::Fixed(offset) => center_y + offset,
    };
    trace.xl = xl;
    trace.yl = yl;
    trace.xh = xh;
    trace.yh = yh;

    let visible = xl < xh
        && yl < yh
        && xl < screen_max_x
        && yl < screen_max_y
        && xh > 0.0
        && yh > 0.0;
    if !visible {
        return Err(RewriteFailure::Offscreen);
    }

    Ok(ProjectedQuad {
        xl,
        yl,
        xh,
        yh,
        cam_z,
        clip_w,
        sprite_scale_x,
        sprite_scale_y,
    })
}

/// Clamp that lets NaN through (and so fails the positivity check later).
#[inline]
fn clamp_scale(value: f32, clamp: ScaleClamp) -> f32 {
    if value.is_nan() {
        value
    } else {
        value.max(clamp.min).min(clamp.max)
    }
}

/// Wraps `value` into `[0, period)`.
#[inline]
fn wrap(value: f32, period: f32) -> f32 {
    let wrapped = value.rem_euclid(period);
    if wrapped >= period {
        wrapped - period
    } else {
        wrapped
    }
}
