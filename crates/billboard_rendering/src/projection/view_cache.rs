//! Per-frame camera matrix cache.
//!
//! The game's view-projection matrix only changes between frames, yet every
//! billboard needs it. The first billboard of a frame pays for 16 guest reads;
//! everyone after it reads the cached copy. The same cache remembers where the
//! screen-space ortho/identity pair was uploaded this frame.

use billboard_core::{CoreResult, GuestAddr, GuestMemory};

/// Screen dimensions in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ScreenSize {
    /// Width.
    pub width: i16,
    /// Height.
    pub height: i16,
}

impl ScreenSize {
    /// Creates a screen size.
    #[must_use]
    pub const fn new(width: i16, height: i16) -> Self {
        Self { width, height }
    }

    /// Both dimensions strictly positive.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Row-major 4×4 view-projection matrix as stored by the game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewProjection {
    m: [f32; 16],
}

impl ViewProjection {
    /// Wraps 16 row-major entries.
    #[must_use]
    pub const fn from_rows(m: [f32; 16]) -> Self {
        Self { m }
    }

    /// Entry at `row`, `col`.
    #[inline]
    #[must_use]
    pub const fn at(&self, row: usize, col: usize) -> f32 {
        self.m[row * 4 + col]
    }

    /// `row · [x, y, z, 1]`.
    #[inline]
    #[must_use]
    pub fn transform_row(&self, row: usize, x: f32, y: f32, z: f32) -> f32 {
        self.at(row, 3) + self.at(row, 2) * z + self.at(row, 1) * y + self.at(row, 0) * x
    }
}

impl Default for ViewProjection {
    fn default() -> Self {
        Self { m: [0.0; 16] }
    }
}

/// Guest addresses of this frame's screen-space matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchMatrices {
    /// Orthographic projection.
    pub projection: GuestAddr,
    /// Identity view.
    pub view: GuestAddr,
}

/// Camera matrix and scratch matrix cache, valid for one frame.
#[derive(Debug, Clone, Default)]
pub struct ViewProjectionCache {
    matrix: ViewProjection,
    valid: bool,
    scratch: Option<(ScreenSize, ScratchMatrices)>,
}

impl ViewProjectionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything; called when the frame token changes.
    pub fn invalidate(&mut self) {
        self.valid = false;
        self.scratch = None;
    }

    /// True once the matrix has been read this frame.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Reads the matrix at `base` unless already cached this frame.
    ///
    /// # Errors
    ///
    /// Propagates out-of-range reads; the cache stays invalid.
    pub fn load(&mut self, mem: &GuestMemory<'_>, base: GuestAddr) -> CoreResult<&ViewProjection> {
        if !self.valid {
            let mut m = [0.0f32; 16];
            for (i, slot) in (0u32..).zip(m.iter_mut()) {
                *slot = mem.read_f32(base.offset(i * 4))?;
            }
            self.matrix = ViewProjection::from_rows(m);
            self.valid = true;
        }
        Ok(&self.matrix)
    }

    /// Cached entry at `row`, `col`.
    #[must_use]
    pub const fn at(&self, row: usize, col: usize) -> f32 {
        self.matrix.at(row, col)
    }

    /// Scratch matrices uploaded this frame for exactly this screen size.
    #[must_use]
    pub fn scratch_for(&self, screen: ScreenSize) -> Option<ScratchMatrices> {
        match self.scratch {
            Some((size, scratch)) if size == screen => Some(scratch),
            _ => None,
        }
    }

    /// Remembers freshly uploaded scratch matrices.
    pub fn store_scratch(&mut self, screen: ScreenSize, scratch: ScratchMatrices) {
        self.scratch = Some((screen, scratch));
    }
}
