//! # Temporal Interpolation Cache
//!
//! The renderer interpolates each vertex between its previous and current
//! screen position. Legacy billboards carry no identity across frames, so one
//! is derived from the call arguments and the last emitted quad is remembered
//! under it.
//!
//! ## Lifetime
//! - Entries are never removed. Active billboards reuse their identity every
//!   frame, so the map stays bounded by what was on screen recently.
//! - An entry is only trusted if it was written within the last
//!   [`STALE_AFTER_TICKS`] ticks and its position signature still matches.
//!   The signature catches hash collisions between unrelated sprites.

use std::collections::HashMap;
use std::num::NonZeroU32;

/// Entries older than this many ticks are ignored.
pub const STALE_AFTER_TICKS: u64 = 300;

/// Reserved capacity for the identity map.
pub const INITIAL_CAPACITY: usize = 4096;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Four screen-space corners relative to the screen center.
///
/// Order: top-left, top-right, bottom-left, bottom-right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuadCorners {
    /// X of each corner.
    pub x: [i16; 4],
    /// Y of each corner.
    pub y: [i16; 4],
}

/// World position after quantization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PositionSignature {
    /// Quantized x.
    pub x: i32,
    /// Quantized y.
    pub y: i32,
    /// Quantized z.
    pub z: i32,
}

impl PositionSignature {
    /// Arithmetic right shift of each coordinate; shifts past 31 saturate.
    #[must_use]
    pub const fn quantize(x: i32, y: i32, z: i32, shift: u32) -> Self {
        let shift = if shift > 31 { 31 } else { shift };
        Self {
            x: x >> shift,
            y: y >> shift,
            z: z >> shift,
        }
    }
}

/// Identity of one billboard across frames. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityHash(NonZeroU32);

impl IdentityHash {
    /// Raw value, as written into the matrix group command.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

#[inline]
const fn fnv_fold(hash: u32, value: u32) -> u32 {
    (hash ^ value).wrapping_mul(FNV_PRIME)
}

/// Hashes a quantized position, half extents and scale, then mixes in the
/// per-site salt. Pass `0` as `scale` when the site excludes it.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn identity_hash(
    signature: PositionSignature,
    half_w: i16,
    half_h: i16,
    scale: i32,
    salt: u32,
) -> IdentityHash {
    let mut hash = FNV_OFFSET_BASIS;
    hash = fnv_fold(hash, signature.x as u32);
    hash = fnv_fold(hash, signature.y as u32);
    hash = fnv_fold(hash, signature.z as u32);
    hash = fnv_fold(hash, u32::from(half_w as u16));
    hash = fnv_fold(hash, u32::from(half_h as u16));
    hash = fnv_fold(hash, scale as u32);
    hash ^= salt;
    IdentityHash(NonZeroU32::new(hash).unwrap_or(NonZeroU32::MIN))
}

/// Last emitted quad of one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrevQuad {
    /// Corners as emitted.
    pub corners: QuadCorners,
    /// Signature at the time.
    pub signature: PositionSignature,
    /// Tick of the write.
    pub stamp: u64,
}

/// Result of looking up an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrevLookup {
    /// Recent entry with matching signature.
    Hit(QuadCorners),
    /// Never seen.
    Missing,
    /// Seen, but too long ago.
    Stale {
        /// Ticks since the entry was written.
        age: u64,
    },
    /// Same identity, different position: a collision.
    SignatureMismatch,
}

impl PrevLookup {
    /// Previous corners to interpolate from, and whether they came from the
    /// cache. Falls back to `current` (no motion) otherwise.
    #[must_use]
    pub const fn previous_or(self, current: QuadCorners) -> (QuadCorners, bool) {
        match self {
            Self::Hit(corners) => (corners, true),
            Self::Missing | Self::Stale { .. } | Self::SignatureMismatch => (current, false),
        }
    }
}

/// Identity → previous quad.
#[derive(Debug, Clone)]
pub struct TemporalCache {
    entries: HashMap<IdentityHash, PrevQuad>,
    tick: u64,
}

impl TemporalCache {
    /// Creates an empty cache with [`INITIAL_CAPACITY`] reserved.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::with_capacity(INITIAL_CAPACITY),
            tick: 0,
        }
    }

    /// Current logical time.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Advances logical time by one and returns the new value.
    pub fn advance(&mut self) -> u64 {
        self.tick = self.tick.wrapping_add(1);
        self.tick
    }

    /// Looks up `id` at the current tick.
    #[must_use]
    pub fn lookup(&self, id: IdentityHash, signature: PositionSignature) -> PrevLookup {
        let Some(prev) = self.entries.get(&id) else {
            return PrevLookup::Missing;
        };
        let age = self.tick.wrapping_sub(prev.stamp);
        if age > STALE_AFTER_TICKS {
            PrevLookup::Stale { age }
        } else if prev.signature != signature {
            PrevLookup::SignatureMismatch
        } else {
            PrevLookup::Hit(prev.corners)
        }
    }

    /// Records `corners` for `id` at the current tick, replacing any entry.
    pub fn update(&mut self, id: IdentityHash, signature: PositionSignature, corners: QuadCorners) {
        self.entries.insert(
            id,
            PrevQuad {
                corners,
                signature,
                stamp: self.tick,
            },
        );
    }

    /// One projection's worth of cache work: advance, look up, overwrite.
    ///
    /// Returns the corners to interpolate from and whether they were cached.
    pub fn lookup_or_create(
        &mut self,
        id: IdentityHash,
        signature: PositionSignature,
        current: QuadCorners,
    ) -> (QuadCorners, bool) {
        self.advance();
        let previous = self.lookup(id, signature).previous_or(current);
        self.update(id, signature, current);
        previous
    }

    /// Stored entry for `id`, if any.
    #[must_use]
    pub fn get(&self, id: IdentityHash) -> Option<&PrevQuad> {
        self.entries.get(&id)
    }

    /// Number of identities ever recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TemporalCache {
    fn default() -> Self {
        Self::new()
    }
}
