//! The legacy draw routines that get intercepted.

use billboard_core::{GuestAddr, GuestMemory};
use billboard_shared::constants::{
    ARG_HALF_H, ARG_OFFSET_CLAMP, ARG_SCALE, ARG_SCALE_Y, ARG_WRAP,
};

use crate::error::{RewriteFailure, RewriteResult};
use crate::projection::BillboardConfig;

/// Flowers taller than this carry a stem; only the head is a billboard.
const FLOWER_STEM_HALF_H: i16 = 32;

/// Written over the mask routine's first stack argument to hide it.
pub const FOV_MASK_HIDDEN_VALUE: u32 = 100;

/// An intercepted draw routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BillboardSite {
    /// Field-of-view mask overlays. Observed, never rewritten.
    FovMasks,
    /// Sky stars.
    Stars,
    /// Energy items.
    EnergyItems,
    /// Flowers and power cells.
    Flowers,
    /// Collectibles.
    Collectibles,
    /// Tree tops.
    Trees,
}

impl BillboardSite {
    /// Number of sites.
    pub const COUNT: usize = 6;

    /// Every site.
    pub const ALL: [Self; Self::COUNT] = [
        Self::FovMasks,
        Self::Stars,
        Self::EnergyItems,
        Self::Flowers,
        Self::Collectibles,
        Self::Trees,
    ];

    /// Dense index for per-site tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Guest address of the hooked routine.
    #[must_use]
    pub const fn vram(self) -> u32 {
        match self {
            Self::FovMasks => 0x006F_A3A4,
            Self::Stars => 0x006C_5E44,
            Self::EnergyItems => 0x0073_F17C,
            Self::Flowers => 0x0073_F800,
            Self::Collectibles => 0x0074_0094,
            Self::Trees => 0x0074_0820,
        }
    }

    /// Label used in diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FovMasks => "6FA3A4(fov-masks)",
            Self::Stars => "6C5E44(stars)",
            Self::EnergyItems => "73F17C(energy-items)",
            Self::Flowers => "73F800(flowers)",
            Self::Collectibles => "740094(collectibles)",
            Self::Trees => "740820(trees)",
        }
    }

    /// True for sites that are counted but never rewritten.
    #[must_use]
    pub const fn is_observer(self) -> bool {
        matches!(self, Self::FovMasks)
    }

    /// Stack offsets zeroed to hide the legacy draw.
    ///
    /// The observer site hides its draw differently; see
    /// [`FOV_MASK_HIDDEN_VALUE`].
    #[must_use]
    pub const fn zeroed_args(self) -> &'static [u32] {
        match self {
            Self::FovMasks => &[],
            Self::Stars | Self::EnergyItems | Self::Flowers => &[ARG_SCALE],
            Self::Collectibles | Self::Trees => &[ARG_SCALE, ARG_SCALE_Y],
        }
    }

    /// Builds this call's projection parameters.
    ///
    /// Some routines take extra per-call arguments from the stack.
    ///
    /// # Errors
    ///
    /// [`RewriteFailure::InvalidArgs`] if a stack argument is unreadable.
    #[allow(clippy::cast_possible_truncation)]
    pub fn config(self, mem: &GuestMemory<'_>, sp: GuestAddr) -> RewriteResult<BillboardConfig> {
        let arg = |offset: u32| {
            mem.read_u32(sp.offset(offset))
                .map_err(|_| RewriteFailure::InvalidArgs)
        };
        let config = match self {
            Self::Stars => BillboardConfig::salted(0x6C5E_4400)
                .with_scale_clamp(4.0, 15.0)
                .with_fixed_bottom(2.0),
            Self::Flowers => {
                // Power cells pulsate in scale and depth every frame.
                let config = BillboardConfig::salted(0x73F8_0000).with_identity(false, 18);
                let raw_half_h = arg(ARG_HALF_H)? as i16;
                if raw_half_h > FLOWER_STEM_HALF_H {
                    config.with_raised_top(raw_half_h - FLOWER_STEM_HALF_H, 3.0)
                } else {
                    config
                }
            }
            Self::Collectibles => BillboardConfig::salted(0x7400_9400)
                .with_dual_scale()
                .with_identity(false, 0),
            Self::Trees => BillboardConfig::salted(0x7408_2000)
                .with_dual_scale()
                .with_wrap_x(arg(ARG_WRAP)? as u8 != 0)
                .with_offset_clamp(arg(ARG_OFFSET_CLAMP)? as i16),
            _ => BillboardConfig::default(),
        };
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{BottomEdge, ScaleMode};

    const SP: GuestAddr = GuestAddr(0x8000_0200);

    fn stack(words: &[(u32, u32)]) -> Vec<u8> {
        let mut buf = vec![0u8; 0x400];
        let mut mem = GuestMemory::new(&mut buf);
        for &(offset, value) in words {
            mem.write_u32(SP.offset(offset), value).unwrap();
        }
        buf
    }

    #[test]
    fn test_indices_and_labels() {
        for (i, site) in BillboardSite::ALL.iter().enumerate() {
            assert_eq!(site.index(), i);
            assert!(site.label().starts_with(&format!("{:06X}", site.vram())));
        }
    }

    #[test]
    fn test_default_config_and_dual_scale_sites() {
        let mut buf = stack(&[]);
        let mem = GuestMemory::new(&mut buf);
        for site in [BillboardSite::FovMasks, BillboardSite::EnergyItems] {
            assert_eq!(site.config(&mem, SP), Ok(BillboardConfig::default()));
        }
        let dual: Vec<_> = BillboardSite::ALL
            .into_iter()
            .filter(|site| site.config(&mem, SP).unwrap().scale_mode == ScaleMode::Dual)
            .collect();
        assert_eq!(dual, [BillboardSite::Collectibles, BillboardSite::Trees]);
    }

    #[test]
    fn test_stars_config() {
        let mut buf = stack(&[]);
        let mem = GuestMemory::new(&mut buf);
        let config = BillboardSite::Stars.config(&mem, SP).unwrap();
        assert_eq!(config.hash_salt, 0x6C5E_4400);
        assert_eq!(config.bottom_edge, BottomEdge::Fixed(2.0));
        assert!((config.scale_clamp.max - 15.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_flower_stem() {
        let mut buf = stack(&[(ARG_HALF_H, 40)]);
        let mem = GuestMemory::new(&mut buf);
        let config = BillboardSite::Flowers.config(&mem, SP).unwrap();
        assert_eq!(config.geometry_half_h, Some(8));
        assert!((config.top_multiplier - 3.0).abs() < f32::EPSILON);
        assert!(!config.identity.include_scale);
        assert_eq!(config.identity.coord_shift, 18);

        let mut buf = stack(&[(ARG_HALF_H, 32)]);
        let mem = GuestMemory::new(&mut buf);
        let config = BillboardSite::Flowers.config(&mem, SP).unwrap();
        assert_eq!(config.geometry_half_h, None);
    }

    #[test]
    fn test_tree_arguments() {
        let mut buf = stack(&[(ARG_WRAP, 0x0000_0100), (ARG_OFFSET_CLAMP, 0xFFFF_0030)]);
        let mem = GuestMemory::new(&mut buf);
        let config = BillboardSite::Trees.config(&mem, SP).unwrap();
        // Only the low byte counts for the wrap flag.
        assert!(!config.wrap_x);
        assert_eq!(config.offset_clamp, Some(0x30));
        assert_eq!(config.scale_mode, ScaleMode::Dual);

        let mut buf = stack(&[(ARG_WRAP, 1), (ARG_OFFSET_CLAMP, 0xFFFF)]);
        let mem = GuestMemory::new(&mut buf);
        let config = BillboardSite::Trees.config(&mem, SP).unwrap();
        assert!(config.wrap_x);
        assert_eq!(config.offset_clamp, None);
    }

    #[test]
    fn test_unreadable_stack() {
        let mut buf = vec![0u8; 0x100];
        let mem = GuestMemory::new(&mut buf);
        assert_eq!(
            BillboardSite::Trees.config(&mem, SP),
            Err(RewriteFailure::InvalidArgs)
        );
    }

    #[test]
    fn test_zeroed_args() {
        assert_eq!(BillboardSite::EnergyItems.zeroed_args(), &[ARG_SCALE]);
        assert_eq!(BillboardSite::Trees.zeroed_args(), &[ARG_SCALE, ARG_SCALE_Y]);
        assert!(BillboardSite::FovMasks.zeroed_args().is_empty());
    }
}
