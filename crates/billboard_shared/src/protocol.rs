//! # Display-List Protocol
//!
//! Typed records for the F3DEX command words and the renderer's extended
//! command set, plus the one builder that assembles the rewritten billboard.
//!
//! ## Design
//!
//! - Every command is a [`Command`] value; encoding to words happens in one place
//! - A [`CommandList`] is a fixed-size buffer (no heap allocations in hot path)
//! - [`billboard_sequence`] is the only producer of the billboard layout, so
//!   the ordering contract lives in a single function
//!
//! ## Sequence
//!
//! ```text
//! prim depth
//! ext enable → ext addressing ON → push othermode → tex persp
//! push proj → load ortho (RSP) → push+load identity (RSP)
//! ext proj = ortho, ext view = identity
//! matrix group(id, interpolate verts) → vertex ×4 → tri2 ×2
//! pop modelview → pop group → pop proj
//! ext proj = identity, ext view = identity → ext addressing OFF → pop othermode
//! ```
//!
//! Extended addressing is not part of the other-mode state, so the push/pop
//! bracket does not restore it. The explicit OFF is what keeps every later
//! command in the buffer resolving addresses the normal way.

use bytemuck::{Pod, Zeroable};

// =============================================================================
// OPCODES
// =============================================================================

/// F3DEX `G_SETPRIMDEPTH`.
pub const G_SETPRIMDEPTH: u32 = 0xEE00_0000;
/// F3DEX `G_TRI2`.
pub const G_TRI2: u32 = 0xB100_0000;
/// F3DEX `G_POPMTX`.
pub const G_POPMTX: u32 = 0xBD00_0000;
/// `G_SETOTHERMODE_H`, one bit at shift 19 (texture perspective).
pub const G_SETOTHERMODE_H_TEXTPERSP: u32 = 0xBA13_0001;
/// `G_TP_PERSP`.
pub const G_TP_PERSP: u32 = 0x0008_0000;
/// `G_MTX_MODELVIEW` for `G_POPMTX`.
pub const G_MTX_MODELVIEW: u32 = 0;

/// Opcode that routes a word into the extended command parser.
pub const EX_OPCODE: u32 = 0x64;
/// Opcode of the hook that switches the extended parser on.
pub const EX_HOOK_OPCODE: u32 = 0xC0;
/// Hook operation: enable.
pub const EX_HOOK_OP_ENABLE: u32 = 0x1;
/// Magic second word of hook commands.
pub const EX_HOOK_MAGIC: u32 = 0x0052_5464;

/// Extended command identifiers.
#[allow(missing_docs)]
pub mod ex {
    pub const MATRIXGROUP_V1: u32 = 0x00_000C;
    pub const POPMATRIXGROUP_V1: u32 = 0x00_000D;
    pub const VERTEX_V1: u32 = 0x00_0014;
    pub const PUSHOTHERMODE_V1: u32 = 0x00_0019;
    pub const POPOTHERMODE_V1: u32 = 0x00_001A;
    pub const PUSHPROJMATRIX_V1: u32 = 0x00_001D;
    pub const POPPROJMATRIX_V1: u32 = 0x00_001E;
    pub const SETRDRAMEXTENDED_V1: u32 = 0x00_0027;
    pub const MATRIXFLOAT_V1: u32 = 0x00_002A;
    pub const SETPROJMATRIXFLOAT_V1: u32 = 0x00_002B;
    pub const SETVIEWMATRIXFLOAT_V1: u32 = 0x00_002C;
}

/// Matrix parameter: load into the projection stack.
///
/// The extended float-matrix handler XORs its parameter with the push bit
/// (0x04) before use, so the values here are pre-XORed.
pub const EX_MTX_LOAD_PROJECTION: u8 = 0x07;
/// Matrix parameter: push and load into the modelview stack (pre-XORed).
pub const EX_MTX_PUSH_LOAD_MODELVIEW: u8 = 0x02;

/// Words the rewritten sequence actually writes.
pub const BILLBOARD_SEQUENCE_WORDS: usize = 25;

/// Words of command-buffer room required before anything is written.
pub const RESERVED_SEQUENCE_WORDS: usize = 34;

#[inline]
const fn ex_word(id: u32) -> u32 {
    (EX_OPCODE << 24) | (id & 0x00FF_FFFF)
}

// =============================================================================
// WIRE RECORDS
// =============================================================================

/// One 64-bit display-list word.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct GfxCommand {
    /// High word (opcode in the top byte).
    pub word0: u32,
    /// Low word.
    pub word1: u32,
}

impl GfxCommand {
    /// Size in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Builds a word from its halves.
    #[inline]
    #[must_use]
    pub const fn new(word0: u32, word1: u32) -> Self {
        Self { word0, word1 }
    }
}

/// Extended vertex with the previous frame's position for interpolation.
///
/// Halfwords are listed in host word order, which is why `y` precedes `x`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ExtendedVertex {
    /// Current y.
    pub y: i16,
    /// Current x.
    pub x: i16,
    /// Vertex flag (unused).
    pub flag: u16,
    /// Current z.
    pub z: i16,
    /// Texture t in 10.5 fixed point.
    pub t: i16,
    /// Texture s in 10.5 fixed point.
    pub s: i16,
    /// Alpha.
    pub a: u8,
    /// Blue.
    pub b: u8,
    /// Green.
    pub g: u8,
    /// Red.
    pub r: u8,
    /// Previous y.
    pub prev_y: i16,
    /// Previous x.
    pub prev_x: i16,
    /// Padding.
    pub pad: u16,
    /// Previous z.
    pub prev_z: i16,
}

impl ExtendedVertex {
    /// Size in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// A white, flat (z = 0) vertex.
    #[must_use]
    pub const fn white(x: i16, y: i16, prev_x: i16, prev_y: i16, s: i16, t: i16) -> Self {
        Self {
            y,
            x,
            flag: 0,
            z: 0,
            t,
            s,
            a: 0xFF,
            b: 0xFF,
            g: 0xFF,
            r: 0xFF,
            prev_y,
            prev_x,
            pad: 0,
            prev_z: 0,
        }
    }
}

/// How a matrix-group component is treated between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Component {
    /// Not interpolated.
    Skip = 0,
    /// Interpolated.
    Interpolate = 1,
    /// Renderer decides.
    Auto = 2,
}

/// Matrix group registration: ties the following geometry to a stable id so
/// the renderer can blend it from the previous frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixGroup {
    /// Stable identity of the object across frames.
    pub id: u32,
    /// Decompose matrices instead of simple interpolation.
    pub decompose: bool,
    /// Push a new group.
    pub push: bool,
    /// Group applies to the projection stack.
    pub projection: bool,
    /// Translation.
    pub position: Component,
    /// Rotation.
    pub rotation: Component,
    /// Scale.
    pub scale: Component,
    /// Skew.
    pub skew: Component,
    /// Perspective.
    pub perspective: Component,
    /// Per-vertex positions.
    pub vertices: Component,
    /// Tile coordinates.
    pub tiles: Component,
    /// Auto ordering instead of linear.
    pub order_auto: bool,
    /// Allow later edits by address.
    pub editable: bool,
    /// Aspect handling (0 = auto).
    pub aspect: u32,
    /// Midpoint handling.
    pub midpoint: Component,
    /// Vertex rounding.
    pub rounding: Component,
}

impl MatrixGroup {
    /// A pushed group that only interpolates vertex positions.
    #[must_use]
    pub const fn vertex_interpolated(id: u32) -> Self {
        Self {
            id,
            decompose: false,
            push: true,
            projection: false,
            position: Component::Skip,
            rotation: Component::Skip,
            scale: Component::Skip,
            skew: Component::Skip,
            perspective: Component::Skip,
            vertices: Component::Interpolate,
            tiles: Component::Skip,
            order_auto: false,
            editable: false,
            aspect: 0,
            midpoint: Component::Interpolate,
            rounding: Component::Skip,
        }
    }

    const fn packed(&self) -> u32 {
        (self.push as u32)
            | ((self.projection as u32) << 1)
            | ((self.decompose as u32) << 2)
            | ((self.position as u32) << 3)
            | ((self.rotation as u32) << 5)
            | ((self.scale as u32) << 7)
            | ((self.skew as u32) << 9)
            | ((self.perspective as u32) << 11)
            | ((self.vertices as u32) << 13)
            | ((self.tiles as u32) << 15)
            | ((self.order_auto as u32) << 17)
            | ((self.editable as u32) << 19)
            | ((self.aspect & 0x3) << 20)
            | ((self.midpoint as u32) << 22)
            | ((self.rounding as u32) << 24)
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// A typed display-list command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Primitive depth for the following geometry.
    SetPrimDepth(u16),
    /// Switch the extended parser on.
    ExEnable,
    /// Extended (above 8 MiB) addressing on or off.
    ExSetRdramExtended(bool),
    /// Save other-mode state.
    ExPushOtherMode,
    /// Restore other-mode state.
    ExPopOtherMode,
    /// Force texture perspective so the renderer skips its half-texel fixup.
    SetTexturePerspective,
    /// Save the projection stack.
    ExPushProjection,
    /// Restore the projection stack.
    ExPopProjection,
    /// Load a float matrix into the RSP stacks.
    ExMatrixFloat {
        /// Guest address of 16 f32.
        addr: u32,
        /// Pre-XORed matrix parameter.
        params: u8,
    },
    /// Set the extended projection matrix.
    ExSetProjMatrixFloat(u32),
    /// Set the extended view matrix.
    ExSetViewMatrixFloat(u32),
    /// Register an interpolation group.
    ExMatrixGroup(MatrixGroup),
    /// Pop interpolation groups.
    ExPopMatrixGroup(u8),
    /// Load extended vertices.
    ExVertex {
        /// Guest address of the first vertex.
        addr: u32,
        /// Number of vertices.
        count: u16,
        /// First vertex buffer index.
        v0: u16,
    },
    /// Two triangles by vertex index.
    Tri2([u8; 3], [u8; 3]),
    /// Pop the modelview stack.
    PopModelview,
}

impl Command {
    /// Number of 64-bit words this command occupies.
    #[must_use]
    pub const fn words(&self) -> usize {
        match self {
            Self::ExMatrixFloat { .. } | Self::ExMatrixGroup(_) | Self::ExVertex { .. } => 2,
            _ => 1,
        }
    }

    /// Encodes into `out`, returning the number of words used.
    #[must_use]
    pub fn encode(&self, out: &mut [GfxCommand; 2]) -> usize {
        const fn tri(a: u8, b: u8, c: u8) -> u32 {
            ((a as u32 * 2) << 16) | ((b as u32 * 2) << 8) | (c as u32 * 2)
        }

        let first = match *self {
            Self::SetPrimDepth(depth) => GfxCommand::new(G_SETPRIMDEPTH, u32::from(depth) << 16),
            Self::ExEnable => GfxCommand::new(
                (EX_HOOK_OPCODE << 24) | EX_HOOK_OP_ENABLE,
                EX_HOOK_MAGIC,
            ),
            Self::ExSetRdramExtended(on) => {
                GfxCommand::new(ex_word(ex::SETRDRAMEXTENDED_V1), u32::from(on))
            }
            Self::ExPushOtherMode => GfxCommand::new(ex_word(ex::PUSHOTHERMODE_V1), 0),
            Self::ExPopOtherMode => GfxCommand::new(ex_word(ex::POPOTHERMODE_V1), 0),
            Self::SetTexturePerspective => GfxCommand::new(G_SETOTHERMODE_H_TEXTPERSP, G_TP_PERSP),
            Self::ExPushProjection => GfxCommand::new(ex_word(ex::PUSHPROJMATRIX_V1), 0),
            Self::ExPopProjection => GfxCommand::new(ex_word(ex::POPPROJMATRIX_V1), 0),
            Self::ExMatrixFloat { addr, params } => {
                out[1] = GfxCommand::new(u32::from(params), 0);
                GfxCommand::new(ex_word(ex::MATRIXFLOAT_V1), addr)
            }
            Self::ExSetProjMatrixFloat(addr) => {
                GfxCommand::new(ex_word(ex::SETPROJMATRIXFLOAT_V1), addr)
            }
            Self::ExSetViewMatrixFloat(addr) => {
                GfxCommand::new(ex_word(ex::SETVIEWMATRIXFLOAT_V1), addr)
            }
            Self::ExMatrixGroup(group) => {
                out[1] = GfxCommand::new(group.packed(), 0);
                GfxCommand::new(ex_word(ex::MATRIXGROUP_V1), group.id)
            }
            Self::ExPopMatrixGroup(count) => {
                GfxCommand::new(ex_word(ex::POPMATRIXGROUP_V1), u32::from(count))
            }
            Self::ExVertex { addr, count, v0 } => {
                out[1] = GfxCommand::new((u32::from(count) << 16) | u32::from(v0), 0);
                GfxCommand::new(ex_word(ex::VERTEX_V1), addr)
            }
            Self::Tri2(a, b) => GfxCommand::new(G_TRI2 | tri(a[0], a[1], a[2]), tri(b[0], b[1], b[2])),
            Self::PopModelview => GfxCommand::new(G_POPMTX, G_MTX_MODELVIEW),
        };
        out[0] = first;
        self.words()
    }
}

/// Fixed-capacity list of encoded words.
///
/// Reused on the hot path; never allocates.
#[derive(Debug, Clone)]
pub struct CommandList {
    words: [GfxCommand; RESERVED_SEQUENCE_WORDS],
    len: usize,
}

impl CommandList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            words: [GfxCommand::new(0, 0); RESERVED_SEQUENCE_WORDS],
            len: 0,
        }
    }

    /// Appends a command. Returns false (and appends nothing) if it does not fit.
    #[inline]
    pub fn push(&mut self, command: Command) -> bool {
        let needed = command.words();
        if self.len + needed > RESERVED_SEQUENCE_WORDS {
            return false;
        }
        let mut encoded = [GfxCommand::default(); 2];
        let used = command.encode(&mut encoded);
        self.words[self.len..self.len + used].copy_from_slice(&encoded[..used]);
        self.len += used;
        true
    }

    /// Number of words written.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing has been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte length of the encoded words.
    #[inline]
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.len * GfxCommand::SIZE
    }

    /// The encoded words.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[GfxCommand] {
        &self.words[..self.len]
    }
}

impl Default for CommandList {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the billboard sequence references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillboardDraw {
    /// Primitive depth key.
    pub prim_depth: u16,
    /// Screen-space orthographic projection.
    pub proj_mtx: u32,
    /// Identity view matrix.
    pub view_mtx: u32,
    /// Four extended vertices.
    pub vertices: u32,
    /// Interpolation identity.
    pub group_id: u32,
}

/// Assembles the rewritten billboard draw.
#[must_use]
pub fn billboard_sequence(draw: &BillboardDraw) -> CommandList {
    let mut list = CommandList::new();
    let ok = list.push(Command::SetPrimDepth(draw.prim_depth))
        && list.push(Command::ExEnable)
        && list.push(Command::ExSetRdramExtended(true))
        && list.push(Command::ExPushOtherMode)
        && list.push(Command::SetTexturePerspective)
        && list.push(Command::ExPushProjection)
        && list.push(Command::ExMatrixFloat {
            addr: draw.proj_mtx,
            params: EX_MTX_LOAD_PROJECTION,
        })
        && list.push(Command::ExMatrixFloat {
            addr: draw.view_mtx,
            params: EX_MTX_PUSH_LOAD_MODELVIEW,
        })
        && list.push(Command::ExSetProjMatrixFloat(draw.proj_mtx))
        && list.push(Command::ExSetViewMatrixFloat(draw.view_mtx))
        && list.push(Command::ExMatrixGroup(MatrixGroup::vertex_interpolated(draw.group_id)))
        && list.push(Command::ExVertex {
            addr: draw.vertices,
            count: 4,
            v0: 0,
        })
        // Both windings, so the quad survives either cull mode.
        && list.push(Command::Tri2([0, 1, 3], [0, 3, 2]))
        && list.push(Command::Tri2([0, 3, 1], [0, 2, 3]))
        && list.push(Command::PopModelview)
        && list.push(Command::ExPopMatrixGroup(0))
        && list.push(Command::ExPopProjection)
        // The view matrix is the identity; it resets both extended matrices.
        && list.push(Command::ExSetProjMatrixFloat(draw.view_mtx))
        && list.push(Command::ExSetViewMatrixFloat(draw.view_mtx))
        && list.push(Command::ExSetRdramExtended(false))
        && list.push(Command::ExPopOtherMode);
    debug_assert!(ok, "billboard sequence exceeds reserved words");
    list
}
