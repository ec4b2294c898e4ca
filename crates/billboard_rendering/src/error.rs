//! # Rewrite Error Types
//!
//! Every way a single billboard rewrite can end without emitting.

use thiserror::Error;

/// Terminal outcome of a rewrite attempt that did not emit.
///
/// None of these are retried. The caller leaves the legacy draw alone
/// (unless configured to suppress it) and the next frame tries again.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewriteFailure {
    /// Half extents or scale not strictly positive.
    #[error("invalid billboard arguments")]
    InvalidArgs,
    /// Screen width or height not strictly positive.
    #[error("invalid screen size")]
    InvalidScreen,
    /// No display-list state pointer (no frame in flight).
    #[error("missing frame state")]
    MissingFrameState,
    /// Camera depth above the behind-camera threshold.
    #[error("billboard is behind the camera")]
    BehindCamera,
    /// Depth proxy not strictly positive.
    #[error("invalid depth proxy")]
    InvalidClipW,
    /// Field of view zero, tiny or not finite.
    #[error("invalid field of view")]
    InvalidFov,
    /// A sprite scale axis clamped to zero or below.
    #[error("invalid sprite scale")]
    InvalidSpriteScale,
    /// Rectangle empty or outside the visible range.
    #[error("billboard is off-screen")]
    Offscreen,
    /// Frame arena cannot hold the scratch data.
    #[error("frame arena allocation failed")]
    AllocFail,
    /// Command-buffer write pointer null or not addressable.
    #[error("display-list write pointer unavailable")]
    GfxPtrFail,
    /// Not enough room after the write pointer for the whole sequence.
    #[error("insufficient display-list capacity")]
    GfxCapacityFail,
}

impl RewriteFailure {
    /// Number of failure kinds.
    pub const COUNT: usize = 11;

    /// All failure kinds in reporting order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::InvalidArgs,
        Self::InvalidScreen,
        Self::MissingFrameState,
        Self::BehindCamera,
        Self::InvalidClipW,
        Self::InvalidFov,
        Self::InvalidSpriteScale,
        Self::Offscreen,
        Self::AllocFail,
        Self::GfxPtrFail,
        Self::GfxCapacityFail,
    ];

    /// Stable snake-case name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::InvalidArgs => "invalid_args",
            Self::InvalidScreen => "invalid_screen",
            Self::MissingFrameState => "missing_dl_state",
            Self::BehindCamera => "behind_camera",
            Self::InvalidClipW => "invalid_clip_w",
            Self::InvalidFov => "invalid_fov",
            Self::InvalidSpriteScale => "invalid_sprite_scale",
            Self::Offscreen => "offscreen",
            Self::AllocFail => "alloc_fail",
            Self::GfxPtrFail => "gfx_ptr_fail",
            Self::GfxCapacityFail => "gfx_capacity_fail",
        }
    }

    /// Dense index into per-failure counters.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Result of one rewrite attempt.
pub type RewriteResult<T> = Result<T, RewriteFailure>;

/// Errors raised while loading rewrite settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The settings text is not valid TOML or has the wrong shape.
    #[error("invalid rewrite settings: {0}")]
    Parse(#[from] toml::de::Error),
}
