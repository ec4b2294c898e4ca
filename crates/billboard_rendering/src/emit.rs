//! # Command Stream Emitter
//!
//! Writes one rewritten billboard into the game's display list.
//!
//! The display list is a plain region of guest memory with no recorded end,
//! so the only bound is the end of addressable RDRAM. Every check happens
//! before the first byte is written: a failed emit leaves the vertices, the
//! command words and the write cursor exactly as they were.

use billboard_core::{GuestAddr, GuestMemory};
use billboard_shared::constants::RDRAM_SIZE;
use billboard_shared::protocol::{
    billboard_sequence, BillboardDraw, ExtendedVertex, GfxCommand, RESERVED_SEQUENCE_WORDS,
};

use crate::error::{RewriteFailure, RewriteResult};
use crate::interpolation::{IdentityHash, QuadCorners};

/// Bytes of display-list room required before emitting.
#[allow(clippy::cast_possible_truncation)]
pub const RESERVED_SEQUENCE_BYTES: u32 = (RESERVED_SEQUENCE_WORDS * GfxCommand::SIZE) as u32;

/// Bytes of the four-vertex upload.
#[allow(clippy::cast_possible_truncation)]
pub const QUAD_VERTEX_BYTES: u32 = (4 * ExtendedVertex::SIZE) as u32;

/// Everything needed to emit one billboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillboardEmit {
    /// Corners this frame.
    pub current: QuadCorners,
    /// Corners to interpolate from.
    pub previous: QuadCorners,
    /// Half width, for texture coordinates.
    pub half_w: i16,
    /// Half height, for texture coordinates.
    pub half_h: i16,
    /// Primitive depth.
    pub prim_depth: u16,
    /// Screen-space projection matrix.
    pub proj_mtx: GuestAddr,
    /// Identity view matrix.
    pub view_mtx: GuestAddr,
    /// Destination of the four vertices.
    pub vertices: GuestAddr,
    /// Interpolation identity.
    pub group_id: IdentityHash,
}

/// Where the display list was and is after a successful emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitReceipt {
    /// Write cursor before the emit.
    pub cursor_before: GuestAddr,
    /// Write cursor after the emit.
    pub cursor_after: GuestAddr,
    /// Command words written.
    pub words: usize,
}

/// Last texel index shifted into 10.5 fixed point.
#[inline]
fn texel_extent(half: i16) -> i16 {
    let max = (i32::from(half) - 1).max(0) << 6;
    i16::try_from(max).unwrap_or(i16::MAX)
}

/// The four vertices of a billboard, in corner order.
#[must_use]
pub fn quad_vertices(
    current: &QuadCorners,
    previous: &QuadCorners,
    half_w: i16,
    half_h: i16,
) -> [ExtendedVertex; 4] {
    let s_max = texel_extent(half_w);
    let t_max = texel_extent(half_h);
    let st = [(0, 0), (s_max, 0), (0, t_max), (s_max, t_max)];
    std::array::from_fn(|i| {
        ExtendedVertex::white(
            current.x[i],
            current.y[i],
            previous.x[i],
            previous.y[i],
            st[i].0,
            st[i].1,
        )
    })
}

/// Emits billboard sequences at the display-list write cursor.
#[derive(Debug, Clone, Copy)]
pub struct CommandEmitter {
    rdram_size: u32,
}

impl CommandEmitter {
    /// Creates an emitter bounded by `rdram_size` bytes of addressable RDRAM.
    #[must_use]
    pub const fn new(rdram_size: u32) -> Self {
        Self { rdram_size }
    }

    /// Reads and validates the write cursor stored at `cursor_slot`.
    ///
    /// Returns the cursor and the bytes left before the end of RDRAM.
    ///
    /// # Errors
    ///
    /// [`RewriteFailure::GfxPtrFail`] if the slot is unreadable or the cursor
    /// is null or outside RDRAM.
    pub fn write_cursor(
        &self,
        mem: &GuestMemory<'_>,
        cursor_slot: GuestAddr,
    ) -> RewriteResult<(GuestAddr, u32)> {
        let cursor = mem
            .read_u32(cursor_slot)
            .map(GuestAddr)
            .map_err(|_| RewriteFailure::GfxPtrFail)?;
        if cursor.is_null() {
            return Err(RewriteFailure::GfxPtrFail);
        }
        let phys = cursor.physical();
        if phys >= self.rdram_size || mem.translate(cursor).is_err() {
            return Err(RewriteFailure::GfxPtrFail);
        }
        Ok((cursor, self.rdram_size - phys))
    }

    /// Writes the vertices and the command sequence, then advances the cursor.
    ///
    /// # Errors
    ///
    /// - [`RewriteFailure::GfxPtrFail`] for a bad write cursor
    /// - [`RewriteFailure::GfxCapacityFail`] if fewer than
    ///   [`RESERVED_SEQUENCE_BYTES`] remain after the cursor
    /// - [`RewriteFailure::AllocFail`] if the vertex destination is not
    ///   addressable
    pub fn emit(
        &self,
        mem: &mut GuestMemory<'_>,
        cursor_slot: GuestAddr,
        draw: &BillboardEmit,
    ) -> RewriteResult<EmitReceipt> {
        let (cursor, capacity) = self.write_cursor(mem, cursor_slot)?;
        if capacity < RESERVED_SEQUENCE_BYTES
            || mem.translate(cursor.offset(RESERVED_SEQUENCE_BYTES - 1)).is_err()
        {
            return Err(RewriteFailure::GfxCapacityFail);
        }
        if mem.translate(draw.vertices.offset(QUAD_VERTEX_BYTES - 1)).is_err() {
            return Err(RewriteFailure::AllocFail);
        }

        let vertices = quad_vertices(&draw.current, &draw.previous, draw.half_w, draw.half_h);
        mem.write_pod_slice(draw.vertices, &vertices)
            .map_err(|_| RewriteFailure::AllocFail)?;

        let list = billboard_sequence(&BillboardDraw {
            prim_depth: draw.prim_depth,
            proj_mtx: draw.proj_mtx.raw(),
            view_mtx: draw.view_mtx.raw(),
            vertices: draw.vertices.raw(),
            group_id: draw.group_id.get(),
        });
        mem.write_pod_slice(cursor, list.as_slice())
            .map_err(|_| RewriteFailure::GfxCapacityFail)?;

        #[allow(clippy::cast_possible_truncation)]
        let cursor_after = cursor.offset(list.byte_len() as u32);
        mem.write_u32(cursor_slot, cursor_after.raw())
            .map_err(|_| RewriteFailure::GfxPtrFail)?;

        Ok(EmitReceipt {
            cursor_before: cursor,
            cursor_after,
            words: list.len(),
        })
    }
}

impl Default for CommandEmitter {
    fn default() -> Self {
        Self::new(RDRAM_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::{identity_hash, PositionSignature};
    use billboard_shared::protocol::{G_SETPRIMDEPTH, BILLBOARD_SEQUENCE_WORDS};

    const SLOT: GuestAddr = GuestAddr(0x8000_0100);
    const DL: GuestAddr = GuestAddr(0x8000_1000);
    const VERTS: GuestAddr = GuestAddr(0x8000_4000);

    fn draw() -> BillboardEmit {
        let current = QuadCorners {
            x: [-4, 4, -4, 4],
            y: [-4, -4, 4, 4],
        };
        BillboardEmit {
            current,
            previous: QuadCorners {
                x: [-6, 2, -6, 2],
                ..current
            },
            half_w: 20,
            half_h: 8,
            prim_depth: 0xFFC0,
            proj_mtx: GuestAddr(0x8000_5000),
            view_mtx: GuestAddr(0x8000_5040),
            vertices: VERTS,
            group_id: identity_hash(PositionSignature::default(), 20, 8, 10, 1),
        }
    }

    #[test]
    fn test_emit_advances_cursor() {
        let mut buf = vec![0u8; 0x8000];
        let mut mem = GuestMemory::new(&mut buf);
        mem.write_u32(SLOT, DL.raw()).unwrap();

        let emitter = CommandEmitter::new(0x8000);
        let receipt = emitter.emit(&mut mem, SLOT, &draw()).unwrap();

        assert_eq!(receipt.words, BILLBOARD_SEQUENCE_WORDS);
        assert_eq!(receipt.cursor_before, DL);
        assert_eq!(receipt.cursor_after, DL.offset(25 * 8));
        assert_eq!(mem.read_u32(SLOT).unwrap(), DL.raw() + 200);
        assert_eq!(mem.read_u32(DL).unwrap(), G_SETPRIMDEPTH);
        assert_eq!(mem.read_u32(DL.offset(4)).unwrap(), 0xFFC0_0000);
    }

    #[test]
    fn test_vertices_carry_both_positions() {
        let mut buf = vec![0u8; 0x8000];
        let mut mem = GuestMemory::new(&mut buf);
        mem.write_u32(SLOT, DL.raw()).unwrap();
        CommandEmitter::new(0x8000).emit(&mut mem, SLOT, &draw()).unwrap();

        // Vertex 1: current x = 4, previous x = 2, s = 19 << 6.
        // Guest halfword order is x, y, flag, z, s, t.
        let v1 = VERTS.offset(24);
        assert_eq!(mem.read_i16(v1).unwrap(), 4, "x");
        assert_eq!(mem.read_i16(v1.offset(2)).unwrap(), -4, "y");
        assert_eq!(mem.read_i16(v1.offset(8)).unwrap(), 19 << 6, "s");
        assert_eq!(mem.read_i16(v1.offset(10)).unwrap(), 0, "t");
        assert_eq!(mem.read_i16(v1.offset(16)).unwrap(), 2, "prev x");
        assert_eq!(mem.read_u32(v1.offset(12)).unwrap(), 0xFFFF_FFFF, "rgba");
    }

    #[test]
    fn test_texel_extent() {
        let verts = quad_vertices(&QuadCorners::default(), &QuadCorners::default(), 1, 1000);
        assert_eq!(verts[3].s, 0);
        assert_eq!(verts[3].t, i16::MAX);
    }

    #[test]
    fn test_capacity_failure_writes_nothing() {
        let mut buf = vec![0u8; 0x8000];
        let mut mem = GuestMemory::new(&mut buf);
        // 271 bytes before the RDRAM bound.
        let cursor = GuestAddr(0x8000_0000 + 0x8000 - 271);
        mem.write_u32(SLOT, cursor.raw()).unwrap();

        let err = CommandEmitter::new(0x8000).emit(&mut mem, SLOT, &draw()).unwrap_err();
        assert_eq!(err, RewriteFailure::GfxCapacityFail);
        assert_eq!(mem.read_u32(SLOT).unwrap(), cursor.raw());
        assert_eq!(mem.read_u32(VERTS).unwrap(), 0);
    }

    #[test]
    fn test_bad_cursor() {
        let mut buf = vec![0u8; 0x8000];
        let mut mem = GuestMemory::new(&mut buf);
        let emitter = CommandEmitter::new(0x8000);

        assert_eq!(emitter.emit(&mut mem, SLOT, &draw()), Err(RewriteFailure::GfxPtrFail));

        mem.write_u32(SLOT, 0x8000_8000).unwrap();
        assert_eq!(emitter.emit(&mut mem, SLOT, &draw()), Err(RewriteFailure::GfxPtrFail));

        // Unreadable slot.
        assert_eq!(
            emitter.emit(&mut mem, GuestAddr(0x8001_0000), &draw()),
            Err(RewriteFailure::GfxPtrFail)
        );
    }
}
