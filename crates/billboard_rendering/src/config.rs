//! # Rewrite Settings
//!
//! Startup configuration: where things live in guest memory and the initial
//! state of every toggle. Loaded once from TOML; every field has a default, so
//! an empty document is a valid configuration.
//!
//! ```toml
//! [layout]
//! arena_slots = 4096
//!
//! [toggles]
//! debug_log = true
//!
//! [toggles.trees]
//! suppress_original = true
//! ```

use serde::Deserialize;

use billboard_core::memory::{ARENA_BASE, ARENA_SLOTS};
use billboard_core::GuestAddr;
use billboard_shared::constants;

use crate::error::ConfigError;
use crate::hooks::BillboardSite;

/// Fixed guest addresses the pipeline reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GuestLayout {
    /// Slot holding the per-frame display-list state pointer.
    pub frame_state_ptr: u32,
    /// Screen width halfword.
    pub screen_width: u32,
    /// Screen height halfword.
    pub screen_height: u32,
    /// Level configuration block.
    pub level_config: u32,
    /// Field of view offset inside the level configuration.
    pub fov_offset: u32,
    /// Depth bias offset inside the level configuration.
    pub depth_bias_offset: u32,
    /// View-projection offset inside the display-list state.
    pub view_proj_offset: u32,
    /// Size of addressable RDRAM, bounding the command buffer.
    pub rdram_size: u32,
    /// Base of the scratch arena.
    pub arena_base: u32,
    /// Arena capacity in 16-byte slots.
    pub arena_slots: u32,
}

impl GuestLayout {
    /// Frame-state pointer slot.
    #[must_use]
    pub const fn frame_state_ptr(&self) -> GuestAddr {
        GuestAddr(self.frame_state_ptr)
    }

    /// Screen width halfword.
    #[must_use]
    pub const fn screen_width(&self) -> GuestAddr {
        GuestAddr(self.screen_width)
    }

    /// Screen height halfword.
    #[must_use]
    pub const fn screen_height(&self) -> GuestAddr {
        GuestAddr(self.screen_height)
    }

    /// Field of view f32.
    #[must_use]
    pub const fn fov(&self) -> GuestAddr {
        GuestAddr(self.level_config).offset(self.fov_offset)
    }

    /// Primitive depth bias halfword.
    #[must_use]
    pub const fn depth_bias(&self) -> GuestAddr {
        GuestAddr(self.level_config).offset(self.depth_bias_offset)
    }

    /// Start of the view-projection matrix for the given frame state.
    #[must_use]
    pub const fn view_proj(&self, frame_state: GuestAddr) -> GuestAddr {
        frame_state.offset(self.view_proj_offset)
    }
}

impl Default for GuestLayout {
    fn default() -> Self {
        Self {
            frame_state_ptr: constants::FRAME_STATE_PTR,
            screen_width: constants::SCREEN_WIDTH,
            screen_height: constants::SCREEN_HEIGHT,
            level_config: constants::LEVEL_CONFIG,
            fov_offset: constants::LEVEL_CONFIG_FOV_Y,
            depth_bias_offset: constants::LEVEL_CONFIG_DEPTH_BIAS,
            view_proj_offset: constants::FRAME_STATE_VIEW_PROJ,
            rdram_size: constants::RDRAM_SIZE,
            arena_base: ARENA_BASE.raw(),
            arena_slots: ARENA_SLOTS,
        }
    }
}

/// Initial toggle state of one draw site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SiteToggleSettings {
    /// Hide the site entirely (legacy draw zeroed, nothing emitted).
    pub disable: bool,
    /// Rewrite the legacy draw as an interpolated screen-space quad.
    pub rewrite: bool,
    /// After a successful rewrite, zero the legacy draw.
    pub suppress_original: bool,
}

impl Default for SiteToggleSettings {
    fn default() -> Self {
        Self {
            disable: false,
            rewrite: true,
            // Debug builds show both draws side by side.
            suppress_original: !cfg!(debug_assertions),
        }
    }
}

/// Initial state of every runtime toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ToggleSettings {
    /// Print interval summaries and per-call traces.
    pub debug_log: bool,
    /// Field-of-view mask overlays (observer only).
    pub fov_masks: SiteToggleSettings,
    /// Sky stars.
    pub stars: SiteToggleSettings,
    /// Energy items.
    pub energy_items: SiteToggleSettings,
    /// Flowers and power cells.
    pub flowers: SiteToggleSettings,
    /// Collectibles.
    pub collectibles: SiteToggleSettings,
    /// Tree tops.
    pub trees: SiteToggleSettings,
}

impl ToggleSettings {
    /// Settings for one site.
    #[must_use]
    pub const fn site(&self, site: BillboardSite) -> &SiteToggleSettings {
        match site {
            BillboardSite::FovMasks => &self.fov_masks,
            BillboardSite::Stars => &self.stars,
            BillboardSite::EnergyItems => &self.energy_items,
            BillboardSite::Flowers => &self.flowers,
            BillboardSite::Collectibles => &self.collectibles,
            BillboardSite::Trees => &self.trees,
        }
    }
}

impl Default for ToggleSettings {
    fn default() -> Self {
        Self {
            debug_log: cfg!(debug_assertions),
            fov_masks: SiteToggleSettings::default(),
            stars: SiteToggleSettings::default(),
            energy_items: SiteToggleSettings::default(),
            flowers: SiteToggleSettings::default(),
            collectibles: SiteToggleSettings::default(),
            trees: SiteToggleSettings::default(),
        }
    }
}

/// Complete startup configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RewriteSettings {
    /// Guest memory layout.
    pub layout: GuestLayout,
    /// Initial toggles.
    pub toggles: ToggleSettings,
}

impl RewriteSettings {
    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid settings TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}
