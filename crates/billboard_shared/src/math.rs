//! # Math Types
//!
//! The few matrix helpers the rewritten draw path needs.

/// A 4×4 float matrix in the renderer's column-major upload order.
pub type Mat4 = [f32; 16];

/// Returns the identity matrix.
#[must_use]
pub const fn identity() -> Mat4 {
    [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

/// Returns an orthographic projection for the given clip volume.
#[must_use]
pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let inv_rl = 1.0 / (right - left);
    let inv_tb = 1.0 / (top - bottom);
    let inv_fn = 1.0 / (far - near);

    let mut m = identity();
    m[0] = 2.0 * inv_rl;
    m[5] = 2.0 * inv_tb;
    m[10] = -2.0 * inv_fn;
    m[12] = -(right + left) * inv_rl;
    m[13] = -(top + bottom) * inv_tb;
    m[14] = -(far + near) * inv_fn;
    m
}

/// Screen-space orthographic projection centered on the screen, y down,
/// in 4× subpixel units.
#[must_use]
pub fn screen_ortho(screen_w: i16, screen_h: i16) -> Mat4 {
    let half_w = f32::from(screen_w) * 2.0;
    let half_h = f32::from(screen_h) * 2.0;
    ortho(-half_w, half_w, half_h, -half_h, -1.0, 1.0)
}

/// Rounds half away from zero and saturates into `i16`.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn clamp_i16(value: f32) -> i16 {
    // `as` saturates and maps NaN to 0.
    let rounded = value.round() as i32;
    rounded.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}
