//! # Frame Arena
//!
//! A bump allocator over a reserved region of extended guest memory.
//!
//! The legacy vertex pool is small and shared with other game data, so the
//! rewriter keeps its own pool above the 8 MiB boundary. There is no explicit
//! "end of frame" signal: the arena notices a new frame when the caller's
//! frame token differs from the one it last saw, and starts over.

use crate::error::{CoreError, CoreResult};
use crate::memory::guest::GuestAddr;

/// Virtual base of the reserved pool.
pub const ARENA_BASE: GuestAddr = GuestAddr(0x8090_0000);

/// Number of slots in the pool (8192 × 16 = 128 KiB).
pub const ARENA_SLOTS: u32 = 8192;

/// Allocation granularity in bytes.
pub const ARENA_SLOT_BYTES: u32 = 16;

/// A frame-scoped bump-pointer allocator.
///
/// Allocations are fast (just bump a counter). Memory is freed all at once
/// when the frame token changes.
///
/// # Thread Safety
///
/// This arena is NOT thread-safe. Keep it on the rendering thread.
///
/// # Example
///
/// ```rust,ignore
/// let mut arena = FrameArena::with_defaults();
///
/// let a = arena.allocate(token, 128)?;   // 8 slots
/// let b = arena.allocate(token, 1)?;     // 1 slot, right after `a`
///
/// // Next frame: everything handed out before is invalid.
/// let c = arena.allocate(next_token, 16)?;
/// assert_eq!(c, a);
/// ```
#[derive(Debug, Clone)]
pub struct FrameArena {
    /// First byte of the pool.
    base: GuestAddr,
    /// Total capacity in slots.
    capacity_slots: u32,
    /// Token of the frame the current allocations belong to.
    frame_token: Option<u32>,
    /// Slots handed out this frame.
    used_slots: u32,
}

impl FrameArena {
    /// Creates an arena over `capacity_slots` slots starting at `base`.
    #[must_use]
    pub const fn new(base: GuestAddr, capacity_slots: u32) -> Self {
        Self {
            base,
            capacity_slots,
            frame_token: None,
            used_slots: 0,
        }
    }

    /// Creates an arena with the reference pool placement and size.
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self::new(ARENA_BASE, ARENA_SLOTS)
    }

    /// Returns the total capacity in slots.
    #[inline]
    #[must_use]
    pub const fn capacity_slots(&self) -> u32 {
        self.capacity_slots
    }

    /// Returns the slots handed out in the current frame.
    #[inline]
    #[must_use]
    pub const fn used_slots(&self) -> u32 {
        self.used_slots
    }

    /// Returns the token of the frame currently being served.
    #[inline]
    #[must_use]
    pub const fn frame_token(&self) -> Option<u32> {
        self.frame_token
    }

    /// Number of slots a request of `bytes` occupies.
    #[inline]
    #[must_use]
    pub const fn slots_for(bytes: u32) -> u32 {
        bytes.div_ceil(ARENA_SLOT_BYTES)
    }

    /// Adopts `token` as the current frame, resetting if it changed.
    ///
    /// Returns true when a reset happened.
    pub fn observe_frame(&mut self, token: u32) -> bool {
        if self.frame_token == Some(token) {
            return false;
        }
        self.frame_token = Some(token);
        self.used_slots = 0;
        true
    }

    /// Returns true if `bytes` would fit in the current frame.
    #[inline]
    #[must_use]
    pub const fn fits(&self, bytes: u32) -> bool {
        self.used_slots + Self::slots_for(bytes) <= self.capacity_slots
    }

    /// Allocates `bytes` for the frame identified by `token`.
    ///
    /// The request is rounded up to whole slots. On failure nothing changes
    /// apart from adopting a new frame token.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ArenaExhausted`] if the request does not fit.
    pub fn allocate(&mut self, token: u32, bytes: u32) -> CoreResult<GuestAddr> {
        self.observe_frame(token);

        let requested = Self::slots_for(bytes);
        if self.used_slots + requested > self.capacity_slots {
            return Err(CoreError::ArenaExhausted {
                requested,
                used: self.used_slots,
                capacity: self.capacity_slots,
            });
        }

        let addr = self.base.offset(self.used_slots * ARENA_SLOT_BYTES);
        self.used_slots += requested;
        Ok(addr)
    }
}

impl Default for FrameArena {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_A: u32 = 0x8010_0000;
    const FRAME_B: u32 = 0x8012_0000;

    #[test]
    fn test_arena_allocation() {
        let mut arena = FrameArena::with_defaults();
        let first = arena.allocate(FRAME_A, 64).unwrap();
        let second = arena.allocate(FRAME_A, 96).unwrap();
        assert_eq!(first, ARENA_BASE);
        assert_eq!(second, ARENA_BASE.offset(64));
        assert_eq!(arena.used_slots(), 10);
    }

    #[test]
    fn test_arena_rounds_up_to_slots() {
        let mut arena = FrameArena::with_defaults();
        arena.allocate(FRAME_A, 1).unwrap();
        arena.allocate(FRAME_A, 17).unwrap();
        assert_eq!(arena.used_slots(), 3);
        assert_eq!(FrameArena::slots_for(0), 0);
        assert_eq!(FrameArena::slots_for(96), 6);
    }

    #[test]
    fn test_arena_reset_on_new_token() {
        let mut arena = FrameArena::with_defaults();
        arena.allocate(FRAME_A, 224).unwrap();
        assert!(arena.used_slots() > 0);

        assert!(arena.observe_frame(FRAME_B));
        assert_eq!(arena.used_slots(), 0);
        assert!(!arena.observe_frame(FRAME_B));

        let again = arena.allocate(FRAME_B, 16).unwrap();
        assert_eq!(again, ARENA_BASE);
    }

    #[test]
    fn test_allocate_resets_without_observe() {
        let mut arena = FrameArena::with_defaults();
        arena.allocate(FRAME_A, 4096).unwrap();
        let addr = arena.allocate(FRAME_B, 16).unwrap();
        assert_eq!(addr, ARENA_BASE);
        assert_eq!(arena.used_slots(), 1);
        assert_eq!(arena.frame_token(), Some(FRAME_B));
    }

    #[test]
    fn test_exhaustion_leaves_state_untouched() {
        let mut arena = FrameArena::new(ARENA_BASE, 4);
        arena.allocate(FRAME_A, 48).unwrap();
        assert!(!arena.fits(32));

        let err = arena.allocate(FRAME_A, 32).unwrap_err();
        assert_eq!(
            err,
            CoreError::ArenaExhausted {
                requested: 2,
                used: 3,
                capacity: 4,
            }
        );
        assert_eq!(arena.used_slots(), 3);

        // The last slot is still available.
        assert!(arena.fits(16));
        arena.allocate(FRAME_A, 16).unwrap();
        assert_eq!(arena.used_slots(), 4);
    }
}
