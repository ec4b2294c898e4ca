//! Integration tests for the billboard rewrite pipeline.
//!
//! Every test runs against a 10 MiB guest buffer laid out like the game's:
//! screen size, frame state, camera, level config and a display list.

use billboard_core::{GuestAddr, GuestMemory};
use billboard_rendering::{
    BillboardRuntime, BillboardSite, CallContext, GuestLayout, HookOutcome, RewriteFailure,
};

const MEM_SIZE: usize = 0x00A0_0000;
const FRAME_A: u32 = 0x8010_0000;
const FRAME_B: u32 = 0x8014_0000;
const CURSOR_SLOT: GuestAddr = GuestAddr(0x8000_0400);
const SP: GuestAddr = GuestAddr(0x8000_0800);
const DL: u32 = 0x8000_2000;
const SEQUENCE_BYTES: u32 = 25 * 8;

struct Guest {
    buf: Vec<u8>,
    layout: GuestLayout,
}

impl Guest {
    /// 320×240 screen, fov 60, forward camera in both frame states, frame A
    /// current, write cursor at `DL`, stack holding a 20×20 billboard of
    /// scale 10.
    fn new() -> Self {
        let mut guest = Self {
            buf: vec![0u8; MEM_SIZE],
            layout: GuestLayout::default(),
        };
        let layout = guest.layout;
        let mut mem = guest.mem();
        mem.write_u16(layout.screen_width(), 320).unwrap();
        mem.write_u16(layout.screen_height(), 240).unwrap();
        mem.write_f32(layout.fov(), 60.0).unwrap();
        mem.write_u16(layout.depth_bias(), 0).unwrap();
        mem.write_u32(layout.frame_state_ptr(), FRAME_A).unwrap();
        mem.write_u32(CURSOR_SLOT, DL).unwrap();
        for (offset, value) in [(0x10, 20), (0x14, 20), (0x18, 10), (0x1C, 10)] {
            mem.write_u32(SP.offset(offset), value).unwrap();
        }
        guest.set_camera(FRAME_A, 0.0);
        guest.set_camera(FRAME_B, 0.0);
        guest
    }

    fn mem(&mut self) -> GuestMemory<'_> {
        GuestMemory::new(&mut self.buf)
    }

    /// Forward camera; `pan` is added to camera-space x.
    fn set_camera(&mut self, frame: u32, pan: f32) {
        let rows = [
            1.0, 0.0, 0.0, pan, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            1.0, 1.0, -1.0, 0.0,
        ];
        let base = self.layout.view_proj(GuestAddr(frame));
        let mut mem = self.mem();
        for (i, v) in (0u32..).zip(rows) {
            mem.write_f32(base.offset(i * 4), v).unwrap();
        }
    }

    fn set_frame(&mut self, frame: u32) {
        let slot = self.layout.frame_state_ptr();
        self.mem().write_u32(slot, frame).unwrap();
    }

    fn read_u32(&mut self, addr: GuestAddr) -> u32 {
        self.mem().read_u32(addr).unwrap()
    }

    fn read_i16(&mut self, addr: GuestAddr) -> i16 {
        self.mem().read_i16(addr).unwrap()
    }

    fn arena_base(&self) -> GuestAddr {
        GuestAddr(self.layout.arena_base)
    }
}

fn call() -> CallContext {
    CallContext {
        gfx_slot: CURSOR_SLOT,
        world: [0, 0, -500_000],
        sp: SP,
    }
}

/// Runtime with logging off and both draws kept, whatever the build profile.
fn runtime() -> BillboardRuntime {
    let runtime = BillboardRuntime::default();
    let toggles = runtime.toggles();
    toggles.set_debug_log(false);
    for site in BillboardSite::ALL {
        toggles.set_suppress_original(site, false);
    }
    runtime
}

/// Word offset of the projection-matrix load in the emitted sequence.
const PROJ_LOAD_WORD: u32 = 6;

#[test]
fn test_end_to_end_emits_centered_quad() {
    let mut guest = Guest::new();
    let runtime = runtime();

    let outcome = runtime.energy_items(&mut guest.mem(), &call());
    let HookOutcome::Rewritten { receipt, suppressed } = outcome else {
        panic!("expected a rewrite, got {outcome:?}");
    };
    assert!(!suppressed);
    assert_eq!(receipt.cursor_before, GuestAddr(DL));
    assert_eq!(receipt.cursor_after, GuestAddr(DL + SEQUENCE_BYTES));
    assert_eq!(guest.read_u32(CURSOR_SLOT), DL + SEQUENCE_BYTES);

    // Legacy draw left alone.
    assert_eq!(guest.read_u32(SP.offset(0x18)), 10);

    // Projection at the arena base, view right after, vertices after both.
    let base = guest.arena_base();
    assert_eq!(guest.read_u32(GuestAddr(DL + PROJ_LOAD_WORD * 8 + 4)), base.raw());
    let verts = base.offset(128);
    assert_eq!(guest.read_i16(verts), -4, "top-left x");
    assert_eq!(guest.read_i16(verts.offset(2)), -4, "top-left y");
    assert_eq!(guest.read_i16(verts.offset(24 * 3)), 4, "bottom-right x");
    assert_eq!(guest.read_i16(verts.offset(24 * 3 + 2)), 4, "bottom-right y");

    runtime.with_context(|ctx| {
        let stats = ctx.stats().stats(BillboardSite::EnergyItems);
        assert_eq!((stats.calls, stats.emits, stats.total_failures()), (1, 1, 0));
        let sample = stats.sample.unwrap();
        assert!(sample.cam_z < -3.0);
        assert!(sample.clip_w > 0.0);
        assert!(sample.xh > sample.xl && sample.yh > sample.yl);
        assert!(((sample.xl + sample.xh) / 2.0 - 640.0).abs() < 1.0);
        assert!(((sample.yl + sample.yh) / 2.0 - 480.0).abs() < 1.0);
    });
}

#[test]
fn test_disabled_site_never_projects() {
    let mut guest = Guest::new();
    let runtime = runtime();
    runtime.toggles().set_disable(BillboardSite::EnergyItems, true);

    assert_eq!(runtime.energy_items(&mut guest.mem(), &call()), HookOutcome::Disabled);
    assert_eq!(guest.read_u32(SP.offset(0x18)), 0);
    assert_eq!(guest.read_u32(CURSOR_SLOT), DL);

    runtime.with_context(|ctx| {
        let stats = ctx.stats().stats(BillboardSite::EnergyItems);
        assert_eq!(stats.disabled, 1);
        assert_eq!(stats.emits, 0);
        assert_eq!(stats.calls, 0);
        // The pipeline never ran, so no frame was observed.
        assert_eq!(ctx.frame_count(), 0);
        assert_eq!(ctx.arena().used_slots(), 0);
    });
}

#[test]
fn test_suppress_zeroes_both_scales() {
    let mut guest = Guest::new();
    let runtime = runtime();
    runtime
        .toggles()
        .set_suppress_original(BillboardSite::Collectibles, true);

    let outcome = runtime.collectibles(&mut guest.mem(), &call());
    assert!(matches!(outcome, HookOutcome::Rewritten { suppressed: true, .. }));
    assert_eq!(guest.read_u32(SP.offset(0x18)), 0);
    assert_eq!(guest.read_u32(SP.offset(0x1C)), 0);
}

#[test]
fn test_scratch_matrices_shared_within_frame() {
    let mut guest = Guest::new();
    let runtime = runtime();

    runtime.energy_items(&mut guest.mem(), &call());
    runtime.stars(&mut guest.mem(), &call());

    let base = guest.arena_base().raw();
    let second = DL + SEQUENCE_BYTES;
    assert_eq!(guest.read_u32(GuestAddr(second + PROJ_LOAD_WORD * 8 + 4)), base);
    // 4 + 4 matrix slots once, 6 vertex slots per billboard.
    runtime.with_context(|ctx| assert_eq!(ctx.arena().used_slots(), 20));
}

#[test]
fn test_screen_change_reuploads_matrices() {
    let mut guest = Guest::new();
    let runtime = runtime();

    runtime.energy_items(&mut guest.mem(), &call());
    let width = guest.layout.screen_width();
    guest.mem().write_u16(width, 424).unwrap();
    runtime.energy_items(&mut guest.mem(), &call());

    let second = DL + SEQUENCE_BYTES;
    let proj = guest.read_u32(GuestAddr(second + PROJ_LOAD_WORD * 8 + 4));
    assert_eq!(proj, guest.arena_base().offset(224).raw());
    runtime.with_context(|ctx| assert_eq!(ctx.arena().used_slots(), 28));
}

#[test]
fn test_new_frame_resets_arena_and_interpolates() {
    let mut guest = Guest::new();
    let runtime = runtime();

    runtime.energy_items(&mut guest.mem(), &call());
    runtime.stars(&mut guest.mem(), &call());

    // Next frame: the camera pans, the billboard stays put in the world.
    guest.set_camera(FRAME_B, 30.0);
    guest.set_frame(FRAME_B);
    runtime.energy_items(&mut guest.mem(), &call());

    runtime.with_context(|ctx| {
        assert_eq!(ctx.frame_count(), 2);
        assert_eq!(ctx.arena().used_slots(), 14);
    });

    let verts = guest.arena_base().offset(128);
    assert_eq!(guest.read_i16(verts), -8, "current x");
    assert_eq!(guest.read_i16(verts.offset(16)), -4, "previous x");
    assert_eq!(guest.read_i16(verts.offset(24)), 0, "current x, top-right");
    assert_eq!(guest.read_i16(verts.offset(24 + 16)), 4, "previous x, top-right");
}

#[test]
fn test_first_sighting_has_no_motion() {
    let mut guest = Guest::new();
    let runtime = runtime();
    runtime.energy_items(&mut guest.mem(), &call());

    let verts = guest.arena_base().offset(128);
    for v in 0..4 {
        let vertex = verts.offset(24 * v);
        assert_eq!(guest.read_i16(vertex), guest.read_i16(vertex.offset(16)));
        assert_eq!(guest.read_i16(vertex.offset(2)), guest.read_i16(vertex.offset(18)));
    }
}

#[test]
fn test_capacity_failure_keeps_cursor() {
    let mut guest = Guest::new();
    let runtime = runtime();
    // 100 bytes before the end of RDRAM.
    let cursor = 0x8000_0000 + 0x0080_0000 - 100;
    guest.mem().write_u32(CURSOR_SLOT, cursor).unwrap();

    assert_eq!(
        runtime.energy_items(&mut guest.mem(), &call()),
        HookOutcome::Failed(RewriteFailure::GfxCapacityFail)
    );
    assert_eq!(guest.read_u32(CURSOR_SLOT), cursor);
    assert_eq!(guest.read_u32(SP.offset(0x18)), 10);

    runtime.with_context(|ctx| {
        let stats = ctx.stats().stats(BillboardSite::EnergyItems);
        assert_eq!(stats.failures_of(RewriteFailure::GfxCapacityFail), 1);
    });
}

#[test]
fn test_behind_camera_allocates_nothing() {
    let mut guest = Guest::new();
    let runtime = runtime();
    let behind = CallContext {
        world: [0, 0, 500_000],
        ..call()
    };

    assert_eq!(
        runtime.trees(&mut guest.mem(), &behind),
        HookOutcome::Failed(RewriteFailure::BehindCamera)
    );
    assert_eq!(guest.read_u32(CURSOR_SLOT), DL);
    runtime.with_context(|ctx| {
        assert_eq!(ctx.arena().used_slots(), 0);
        assert!(ctx.temporal().is_empty());
    });
}

#[test]
fn test_interval_resets_counters() {
    let mut guest = Guest::new();
    let runtime = runtime();

    for i in 0..150u32 {
        guest.set_frame(if i % 2 == 0 { FRAME_A } else { FRAME_B });
        guest.mem().write_u32(CURSOR_SLOT, DL).unwrap();
        runtime.energy_items(&mut guest.mem(), &call());
        if i == 148 {
            runtime.with_context(|ctx| {
                assert_eq!(ctx.stats().stats(BillboardSite::EnergyItems).calls, 149);
            });
        }
    }

    runtime.with_context(|ctx| {
        assert_eq!(ctx.frame_count(), 150);
        assert!(ctx.stats().stats(BillboardSite::EnergyItems).is_idle());
    });
}

#[test]
fn test_settings_from_toml() {
    let runtime = BillboardRuntime::from_toml_str(
        r"
        [toggles]
        debug_log = false

        [toggles.flowers]
        disable = true
        ",
    )
    .unwrap();
    let toggles = runtime.toggles();
    assert!(toggles.disable(BillboardSite::Flowers));
    assert!(!toggles.disable(BillboardSite::Trees));
    assert!(!toggles.debug_log());
}
