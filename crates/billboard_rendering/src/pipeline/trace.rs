//! Per-call diagnostic snapshot.

use std::fmt;

/// Inputs and intermediate values of one rewrite attempt.
///
/// Filled progressively; fields past the point of failure keep their
/// defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RewriteTrace {
    /// World x (16.16).
    pub world_x: i32,
    /// World y (16.16).
    pub world_y: i32,
    /// World z (16.16).
    pub world_z: i32,
    /// Half width.
    pub half_w: i16,
    /// Half height.
    pub half_h: i16,
    /// Scale.
    pub scale: i32,
    /// Screen width.
    pub screen_w: i16,
    /// Screen height.
    pub screen_h: i16,
    /// Camera-space depth.
    pub cam_z: f32,
    /// Depth proxy.
    pub clip_w: f32,
    /// Sprite scale (x axis).
    pub sprite_scale: f32,
    /// Left edge.
    pub xl: f32,
    /// Top edge.
    pub yl: f32,
    /// Right edge.
    pub xh: f32,
    /// Bottom edge.
    pub yh: f32,
    /// Identity hash.
    pub group_id: u32,
}

impl fmt::Display for RewriteTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scale={} hw={} hh={} scr={}x{} z={:.3} cw={:.3} s={:.3} rect=({:.1},{:.1})-({:.1},{:.1}) grp={:08X}",
            self.scale,
            self.half_w,
            self.half_h,
            self.screen_w,
            self.screen_h,
            self.cam_z,
            self.clip_w,
            self.sprite_scale,
            self.xl,
            self.yl,
            self.xh,
            self.yh,
            self.group_id,
        )
    }
}
