//! # Rewrite Pipeline
//!
//! One call in, one emitted draw (or one typed failure) out.
//!
//! ```text
//! args → screen → frame state ─┬─ new frame? reset arena + camera cache
//!                              ▼
//!          arena probe → camera → project → scratch alloc
//!                              ▼
//!          identity + previous quad → depth → emit
//! ```
//!
//! All mutable state lives in [`RewriteContext`], owned by whoever drives the
//! hooks. Nothing here is global.

mod stats;
mod trace;

pub use stats::{
    DiagnosticsAggregator, IntervalReport, SiteStats, PER_CALL_TRACE_MASK, REPORT_INTERVAL_FRAMES,
};
pub use trace::RewriteTrace;

use billboard_core::{FrameArena, GuestAddr, GuestMemory};
use billboard_shared::math::{identity, screen_ortho, Mat4};

use crate::config::GuestLayout;
use crate::emit::{BillboardEmit, CommandEmitter, EmitReceipt, QUAD_VERTEX_BYTES};
use crate::error::{RewriteFailure, RewriteResult};
use crate::hooks::BillboardSite;
use crate::interpolation::{identity_hash, PositionSignature, TemporalCache};
use crate::projection::{
    project, validate_args, validate_screen, BillboardConfig, BillboardInput, ScratchMatrices,
    ScreenSize, ViewProjectionCache,
};

/// Bytes of one uploaded float matrix.
#[allow(clippy::cast_possible_truncation)]
pub const MATRIX_BYTES: u32 = std::mem::size_of::<Mat4>() as u32;

/// One intercepted draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillboardCall {
    /// Guest slot holding the display-list write cursor.
    pub cursor_slot: GuestAddr,
    /// Call arguments.
    pub input: BillboardInput,
}

/// Everything the pipeline remembers between calls.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    layout: GuestLayout,
    arena: FrameArena,
    view: ViewProjectionCache,
    temporal: TemporalCache,
    emitter: CommandEmitter,
    stats: DiagnosticsAggregator,
    frame_count: u64,
}

impl RewriteContext {
    /// Creates a context for the given memory layout.
    #[must_use]
    pub fn new(layout: GuestLayout) -> Self {
        Self {
            layout,
            arena: FrameArena::new(GuestAddr(layout.arena_base), layout.arena_slots),
            view: ViewProjectionCache::new(),
            temporal: TemporalCache::new(),
            emitter: CommandEmitter::new(layout.rdram_size),
            stats: DiagnosticsAggregator::new(),
            frame_count: 0,
        }
    }

    /// Scratch arena.
    #[must_use]
    pub const fn arena(&self) -> &FrameArena {
        &self.arena
    }

    /// Camera cache.
    #[must_use]
    pub const fn view_cache(&self) -> &ViewProjectionCache {
        &self.view
    }

    /// Previous-quad cache.
    #[must_use]
    pub const fn temporal(&self) -> &TemporalCache {
        &self.temporal
    }

    /// Diagnostics counters.
    #[must_use]
    pub const fn stats(&self) -> &DiagnosticsAggregator {
        &self.stats
    }

    /// Diagnostics counters, for recording.
    pub fn stats_mut(&mut self) -> &mut DiagnosticsAggregator {
        &mut self.stats
    }

    /// Frames seen so far (frame-token changes).
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Closes `site`'s reporting interval if due.
    pub fn take_report(&mut self, site: BillboardSite) -> Option<IntervalReport> {
        self.stats.maybe_report(
            site,
            self.frame_count,
            self.arena.used_slots(),
            self.arena.capacity_slots(),
        )
    }

    /// Rewrites one billboard draw.
    ///
    /// `trace` is filled as far as the call gets.
    ///
    /// # Errors
    ///
    /// The first failing step; see [`RewriteFailure`]. The display list and
    /// its write cursor are untouched on every error path.
    pub fn rewrite(
        &mut self,
        mem: &mut GuestMemory<'_>,
        call: &BillboardCall,
        config: &BillboardConfig,
        trace: &mut RewriteTrace,
    ) -> RewriteResult<EmitReceipt> {
        let input = &call.input;
        trace.world_x = input.world_x;
        trace.world_y = input.world_y;
        trace.world_z = input.world_z;
        trace.half_w = input.half_w;
        trace.half_h = input.half_h;
        trace.scale = input.scale;
        validate_args(input, config.scale_mode)?;

        let screen = self.read_screen(mem)?;
        trace.screen_w = screen.width;
        trace.screen_h = screen.height;
        validate_screen(screen)?;

        let frame_state = mem
            .read_u32(self.layout.frame_state_ptr())
            .map_err(|_| RewriteFailure::MissingFrameState)?;
        if frame_state == 0 {
            return Err(RewriteFailure::MissingFrameState);
        }
        self.observe_frame(frame_state);

        // Reject before touching anything if the frame's pool is already full.
        let scratch = self.view.scratch_for(screen);
        let needed = if scratch.is_some() {
            QUAD_VERTEX_BYTES
        } else {
            2 * MATRIX_BYTES + QUAD_VERTEX_BYTES
        };
        if !self.arena.fits(needed) {
            return Err(RewriteFailure::AllocFail);
        }

        let view = *self
            .view
            .load(mem, self.layout.view_proj(GuestAddr(frame_state)))
            .map_err(|_| RewriteFailure::MissingFrameState)?;
        let fov_y = mem
            .read_f32(self.layout.fov())
            .map_err(|_| RewriteFailure::InvalidFov)?;

        let quad = project(input, screen, fov_y, &view, config, trace)?;

        let scratch = match scratch {
            Some(scratch) => scratch,
            None => self.upload_scratch(mem, frame_state, screen)?,
        };
        let vertices = self
            .arena
            .allocate(frame_state, QUAD_VERTEX_BYTES)
            .map_err(|_| RewriteFailure::AllocFail)?;

        let current = quad.corners(screen);
        let signature = PositionSignature::quantize(
            input.world_x,
            input.world_y,
            input.world_z,
            config.identity.coord_shift,
        );
        let hash_scale = if config.identity.include_scale {
            input.scale
        } else {
            0
        };
        let group_id = identity_hash(
            signature,
            input.half_w,
            input.half_h,
            hash_scale,
            config.hash_salt,
        );
        trace.group_id = group_id.get();
        let (previous, _) = self.temporal.lookup_or_create(group_id, signature, current);

        let bias = mem
            .read_i16(self.layout.depth_bias())
            .map_err(|_| RewriteFailure::MissingFrameState)?;

        self.emitter.emit(
            mem,
            call.cursor_slot,
            &BillboardEmit {
                current,
                previous,
                half_w: input.half_w,
                half_h: input.half_h,
                prim_depth: quad.depth_key(bias),
                proj_mtx: scratch.projection,
                view_mtx: scratch.view,
                vertices,
                group_id,
            },
        )
    }

    fn read_screen(&self, mem: &GuestMemory<'_>) -> RewriteResult<ScreenSize> {
        let width = mem
            .read_i16(self.layout.screen_width())
            .map_err(|_| RewriteFailure::InvalidScreen)?;
        let height = mem
            .read_i16(self.layout.screen_height())
            .map_err(|_| RewriteFailure::InvalidScreen)?;
        Ok(ScreenSize::new(width, height))
    }

    fn observe_frame(&mut self, frame_state: u32) {
        if self.arena.observe_frame(frame_state) {
            self.view.invalidate();
            self.frame_count += 1;
            tracing::trace!(
                "Billboard frame {} (state 0x{:08X})",
                self.frame_count,
                frame_state
            );
        }
    }

    /// Allocates and fills this frame's ortho/identity pair for `screen`.
    fn upload_scratch(
        &mut self,
        mem: &mut GuestMemory<'_>,
        frame_state: u32,
        screen: ScreenSize,
    ) -> RewriteResult<ScratchMatrices> {
        let projection = self
            .arena
            .allocate(frame_state, MATRIX_BYTES)
            .map_err(|_| RewriteFailure::AllocFail)?;
        let view = self
            .arena
            .allocate(frame_state, MATRIX_BYTES)
            .map_err(|_| RewriteFailure::AllocFail)?;

        let ortho = screen_ortho(screen.width, screen.height);
        mem.write_pod_slice(projection, ortho.as_slice())
            .map_err(|_| RewriteFailure::AllocFail)?;
        mem.write_pod_slice(view, identity().as_slice())
            .map_err(|_| RewriteFailure::AllocFail)?;

        let scratch = ScratchMatrices { projection, view };
        self.view.store_scratch(screen, scratch);
        Ok(scratch)
    }
}

impl Default for RewriteContext {
    fn default() -> Self {
        Self::new(GuestLayout::default())
    }
}
