//! # Hook Dispatch
//!
//! Entry points called at each intercepted draw routine.
//!
//! Every rewriting site follows the same decision ladder:
//!
//! 1. **disabled** → hide the legacy draw, emit nothing
//! 2. **rewrite off** → leave the legacy draw alone
//! 3. otherwise rewrite; on success, optionally hide the legacy draw
//!
//! The field-of-view mask site is an observer: it is counted and can be
//! hidden, but never rewritten.

mod sites;
mod toggles;

pub use sites::{BillboardSite, FOV_MASK_HIDDEN_VALUE};
pub use toggles::BillboardToggles;

use std::sync::Arc;

use parking_lot::Mutex;

use billboard_core::{CoreResult, GuestAddr, GuestMemory};
use billboard_shared::constants::{ARG_HALF_H, ARG_HALF_W, ARG_SCALE, ARG_SCALE_Y};

use crate::config::RewriteSettings;
use crate::emit::EmitReceipt;
use crate::error::{ConfigError, RewriteFailure, RewriteResult};
use crate::pipeline::{BillboardCall, RewriteContext, RewriteTrace};
use crate::projection::{BillboardInput, ScaleMode};

/// Register state of an intercepted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Slot holding the display-list write cursor (`a0`).
    pub gfx_slot: GuestAddr,
    /// World position, 16.16 (`a1..a3`).
    pub world: [i32; 3],
    /// Stack pointer; further arguments live above it.
    pub sp: GuestAddr,
}

impl CallContext {
    /// Builds a context from 64-bit register values.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_registers(a0: u64, a1: u64, a2: u64, a3: u64, sp: u64) -> Self {
        Self {
            gfx_slot: GuestAddr::from_register(a0),
            world: [a1 as i32, a2 as i32, a3 as i32],
            sp: GuestAddr::from_register(sp),
        }
    }

    /// Reads the per-call stack arguments.
    ///
    /// Half extents are the low halfword of their stack word. The Y scale is
    /// only read under [`ScaleMode::Dual`].
    ///
    /// # Errors
    ///
    /// [`RewriteFailure::InvalidArgs`] if the stack is unreadable.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn read_input(&self, mem: &GuestMemory<'_>, scale_mode: ScaleMode) -> RewriteResult<BillboardInput> {
        let arg = |offset: u32| {
            mem.read_u32(self.sp.offset(offset))
                .map_err(|_| RewriteFailure::InvalidArgs)
        };
        Ok(BillboardInput {
            world_x: self.world[0],
            world_y: self.world[1],
            world_z: self.world[2],
            half_w: arg(ARG_HALF_W)? as i16,
            half_h: arg(ARG_HALF_H)? as i16,
            scale: arg(ARG_SCALE)? as i32,
            scale_y: if scale_mode == ScaleMode::Dual {
                Some(arg(ARG_SCALE_Y)? as i32)
            } else {
                None
            },
        })
    }
}

/// What a hook did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// Site disabled; legacy draw hidden.
    Disabled,
    /// Rewriting off; legacy draw untouched.
    Skipped,
    /// Rewritten draw emitted.
    Rewritten {
        /// Display-list cursor movement.
        receipt: EmitReceipt,
        /// Legacy draw hidden as well.
        suppressed: bool,
    },
    /// Rewrite attempted and failed; legacy draw untouched.
    Failed(RewriteFailure),
    /// Observer site counted the call.
    Observed {
        /// Legacy draw hidden.
        suppressed: bool,
    },
}

/// Runs one hook against explicit state.
pub fn dispatch(
    ctx: &mut RewriteContext,
    toggles: &BillboardToggles,
    mem: &mut GuestMemory<'_>,
    site: BillboardSite,
    call: &CallContext,
) -> HookOutcome {
    let outcome = if site.is_observer() {
        observe(ctx, toggles, mem, site, call)
    } else {
        rewrite_site(ctx, toggles, mem, site, call)
    };

    if let Some(report) = ctx.take_report(site) {
        if toggles.debug_log() {
            tracing::info!("{}", report);
        }
    }
    outcome
}

fn observe(
    ctx: &mut RewriteContext,
    toggles: &BillboardToggles,
    mem: &mut GuestMemory<'_>,
    site: BillboardSite,
    call: &CallContext,
) -> HookOutcome {
    let suppressed = toggles.disable(site);
    ctx.stats_mut().record_observed(site, suppressed);
    if suppressed {
        if let Err(err) = mem.write_u32(call.sp.offset(ARG_HALF_W), FOV_MASK_HIDDEN_VALUE) {
            tracing::warn!("{}: could not hide legacy draw: {}", site.label(), err);
        }
    }
    HookOutcome::Observed { suppressed }
}

fn rewrite_site(
    ctx: &mut RewriteContext,
    toggles: &BillboardToggles,
    mem: &mut GuestMemory<'_>,
    site: BillboardSite,
    call: &CallContext,
) -> HookOutcome {
    if toggles.disable(site) {
        hide_legacy(mem, site, call.sp);
        ctx.stats_mut().record_disabled(site);
        return HookOutcome::Disabled;
    }
    if !toggles.rewrite(site) {
        ctx.stats_mut().record_skip(site);
        return HookOutcome::Skipped;
    }

    let mut trace = RewriteTrace {
        world_x: call.world[0],
        world_y: call.world[1],
        world_z: call.world[2],
        ..RewriteTrace::default()
    };
    let result = site.config(mem, call.sp).and_then(|config| {
        let input = call.read_input(mem, config.scale_mode)?;
        let billboard = BillboardCall {
            cursor_slot: call.gfx_slot,
            input,
        };
        ctx.rewrite(mem, &billboard, &config, &mut trace)
    });

    let suppressed = result.is_ok() && toggles.suppress_original(site);
    ctx.stats_mut()
        .record(site, result.map(|_| ()), suppressed, &trace);
    if suppressed {
        hide_legacy(mem, site, call.sp);
    }

    if site == BillboardSite::EnergyItems && toggles.debug_log() {
        if let Some(n) = ctx.stats_mut().per_call_trace(result.is_err()) {
            let status = result.map_or_else(RewriteFailure::name, |_| "emitted");
            tracing::debug!(
                "[{}] n={} {} {} suppress={}",
                site.label(),
                n,
                status,
                trace,
                u8::from(suppressed)
            );
        }
    }

    match result {
        Ok(receipt) => HookOutcome::Rewritten {
            receipt,
            suppressed,
        },
        Err(failure) => HookOutcome::Failed(failure),
    }
}

/// Zeroes the site's scale arguments so the legacy routine draws nothing.
fn hide_legacy(mem: &mut GuestMemory<'_>, site: BillboardSite, sp: GuestAddr) {
    if let Err(err) = zero_args(mem, sp, site.zeroed_args()) {
        tracing::warn!("{}: could not hide legacy draw: {}", site.label(), err);
    }
}

fn zero_args(mem: &mut GuestMemory<'_>, sp: GuestAddr, offsets: &[u32]) -> CoreResult<()> {
    for &offset in offsets {
        mem.write_u32(sp.offset(offset), 0)?;
    }
    Ok(())
}

/// Thread-safe owner of the rewrite state and toggles.
///
/// Hosts that call every hook from one thread can drive [`dispatch`] with a
/// [`RewriteContext`] of their own instead.
#[derive(Debug)]
pub struct BillboardRuntime {
    context: Mutex<RewriteContext>,
    toggles: Arc<BillboardToggles>,
}

impl BillboardRuntime {
    /// Creates a runtime from startup settings.
    #[must_use]
    pub fn new(settings: &RewriteSettings) -> Self {
        Self {
            context: Mutex::new(RewriteContext::new(settings.layout)),
            toggles: Arc::new(BillboardToggles::from_settings(&settings.toggles)),
        }
    }

    /// Creates a runtime from TOML settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the settings do not parse.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(&RewriteSettings::from_toml_str(text)?))
    }

    /// Toggle handle for a settings UI.
    #[must_use]
    pub fn toggles(&self) -> Arc<BillboardToggles> {
        Arc::clone(&self.toggles)
    }

    /// Runs `f` with read access to the rewrite state.
    pub fn with_context<R>(&self, f: impl FnOnce(&RewriteContext) -> R) -> R {
        f(&self.context.lock())
    }

    /// Runs the hook for `site`.
    pub fn hook(
        &self,
        site: BillboardSite,
        mem: &mut GuestMemory<'_>,
        call: &CallContext,
    ) -> HookOutcome {
        let mut ctx = self.context.lock();
        dispatch(&mut ctx, &self.toggles, mem, site, call)
    }

    /// Field-of-view mask routine.
    pub fn fov_masks(&self, mem: &mut GuestMemory<'_>, call: &CallContext) -> HookOutcome {
        self.hook(BillboardSite::FovMasks, mem, call)
    }

    /// Star routine.
    pub fn stars(&self, mem: &mut GuestMemory<'_>, call: &CallContext) -> HookOutcome {
        self.hook(BillboardSite::Stars, mem, call)
    }

    /// Energy item routine.
    pub fn energy_items(&self, mem: &mut GuestMemory<'_>, call: &CallContext) -> HookOutcome {
        self.hook(BillboardSite::EnergyItems, mem, call)
    }

    /// Flower and power cell routine.
    pub fn flowers(&self, mem: &mut GuestMemory<'_>, call: &CallContext) -> HookOutcome {
        self.hook(BillboardSite::Flowers, mem, call)
    }

    /// Collectible routine.
    pub fn collectibles(&self, mem: &mut GuestMemory<'_>, call: &CallContext) -> HookOutcome {
        self.hook(BillboardSite::Collectibles, mem, call)
    }

    /// Tree top routine.
    pub fn trees(&self, mem: &mut GuestMemory<'_>, call: &CallContext) -> HookOutcome {
        self.hook(BillboardSite::Trees, mem, call)
    }
}

impl Default for BillboardRuntime {
    fn default() -> Self {
        Self::new(&RewriteSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SP: GuestAddr = GuestAddr(0x8000_0200);

    fn call() -> CallContext {
        CallContext {
            gfx_slot: GuestAddr(0x8000_0100),
            world: [1, 2, 3],
            sp: SP,
        }
    }

    #[test]
    fn test_from_registers_truncates() {
        let ctx = CallContext::from_registers(
            0xFFFF_FFFF_8020_0000,
            0xFFFF_FFFF_FFFF_FFFE,
            0x10,
            0x1_0000_0005,
            0xFFFF_FFFF_801F_FF00,
        );
        assert_eq!(ctx.gfx_slot, GuestAddr(0x8020_0000));
        assert_eq!(ctx.world, [-2, 16, 5]);
        assert_eq!(ctx.sp, GuestAddr(0x801F_FF00));
    }

    #[test]
    fn test_read_input_low_halfwords() {
        let mut buf = vec![0u8; 0x400];
        let mut mem = GuestMemory::new(&mut buf);
        mem.write_u32(SP.offset(ARG_HALF_W), 0xDEAD_0010).unwrap();
        mem.write_u32(SP.offset(ARG_HALF_H), 0x0000_0020).unwrap();
        mem.write_u32(SP.offset(ARG_SCALE), 7).unwrap();
        mem.write_u32(SP.offset(ARG_SCALE_Y), 9).unwrap();

        let input = call().read_input(&mem, ScaleMode::Uniform).unwrap();
        assert_eq!((input.half_w, input.half_h, input.scale), (16, 32, 7));
        assert_eq!(input.scale_y, None);
        assert_eq!(input.world_z, 3);

        let input = call().read_input(&mem, ScaleMode::Dual).unwrap();
        assert_eq!(input.scale_y, Some(9));
    }

    #[test]
    fn test_disabled_site_hides_legacy_draw() {
        let mut buf = vec![0u8; 0x400];
        let mut mem = GuestMemory::new(&mut buf);
        mem.write_u32(SP.offset(ARG_SCALE), 7).unwrap();
        mem.write_u32(SP.offset(ARG_SCALE_Y), 9).unwrap();

        let runtime = BillboardRuntime::default();
        runtime.toggles().set_disable(BillboardSite::Trees, true);
        assert_eq!(runtime.trees(&mut mem, &call()), HookOutcome::Disabled);
        assert_eq!(mem.read_u32(SP.offset(ARG_SCALE)).unwrap(), 0);
        assert_eq!(mem.read_u32(SP.offset(ARG_SCALE_Y)).unwrap(), 0);
        runtime.with_context(|ctx| {
            assert_eq!(ctx.stats().stats(BillboardSite::Trees).disabled, 1);
        });
    }

    #[test]
    fn test_rewrite_off_skips() {
        let mut buf = vec![0u8; 0x400];
        let mut mem = GuestMemory::new(&mut buf);
        mem.write_u32(SP.offset(ARG_SCALE), 7).unwrap();

        let runtime = BillboardRuntime::default();
        runtime.toggles().set_rewrite(BillboardSite::Stars, false);
        assert_eq!(runtime.stars(&mut mem, &call()), HookOutcome::Skipped);
        assert_eq!(mem.read_u32(SP.offset(ARG_SCALE)).unwrap(), 7);
    }

    #[test]
    fn test_failed_rewrite_keeps_legacy_draw() {
        let mut buf = vec![0u8; 0x400];
        let mut mem = GuestMemory::new(&mut buf);
        mem.write_u32(SP.offset(ARG_SCALE), 7).unwrap();

        let runtime = BillboardRuntime::default();
        runtime
            .toggles()
            .set_suppress_original(BillboardSite::EnergyItems, true);
        // Half extents are zero on this stack.
        assert_eq!(
            runtime.energy_items(&mut mem, &call()),
            HookOutcome::Failed(RewriteFailure::InvalidArgs)
        );
        assert_eq!(mem.read_u32(SP.offset(ARG_SCALE)).unwrap(), 7);
    }

    #[test]
    fn test_fov_mask_observer() {
        let mut buf = vec![0u8; 0x400];
        let mut mem = GuestMemory::new(&mut buf);
        mem.write_u32(SP.offset(ARG_HALF_W), 5).unwrap();

        let runtime = BillboardRuntime::default();
        assert_eq!(
            runtime.fov_masks(&mut mem, &call()),
            HookOutcome::Observed { suppressed: false }
        );
        assert_eq!(mem.read_u32(SP.offset(ARG_HALF_W)).unwrap(), 5);

        runtime.toggles().set_disable(BillboardSite::FovMasks, true);
        assert_eq!(
            runtime.fov_masks(&mut mem, &call()),
            HookOutcome::Observed { suppressed: true }
        );
        assert_eq!(mem.read_u32(SP.offset(ARG_HALF_W)).unwrap(), 100);
        runtime.with_context(|ctx| {
            let stats = ctx.stats().stats(BillboardSite::FovMasks);
            assert_eq!((stats.calls, stats.suppresses), (2, 1));
        });
    }

    #[test]
    fn test_runtime_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BillboardRuntime>();
    }
}
