//! Runtime toggles.
//!
//! Flipped from a settings UI on another thread and read by the hooks on the
//! rendering thread. Each flag is independent, so relaxed atomics suffice.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{SiteToggleSettings, ToggleSettings};

use super::sites::BillboardSite;

#[derive(Debug)]
struct SiteFlags {
    disable: AtomicBool,
    rewrite: AtomicBool,
    suppress_original: AtomicBool,
}

impl SiteFlags {
    fn from_settings(settings: &SiteToggleSettings) -> Self {
        Self {
            disable: AtomicBool::new(settings.disable),
            rewrite: AtomicBool::new(settings.rewrite),
            suppress_original: AtomicBool::new(settings.suppress_original),
        }
    }
}

/// Live toggle state shared between the settings UI and the hooks.
#[derive(Debug)]
pub struct BillboardToggles {
    debug_log: AtomicBool,
    sites: [SiteFlags; BillboardSite::COUNT],
}

impl BillboardToggles {
    /// Creates toggles initialised from settings.
    #[must_use]
    pub fn from_settings(settings: &ToggleSettings) -> Self {
        Self {
            debug_log: AtomicBool::new(settings.debug_log),
            sites: BillboardSite::ALL.map(|site| SiteFlags::from_settings(settings.site(site))),
        }
    }

    /// Whether diagnostics are logged.
    #[must_use]
    pub fn debug_log(&self) -> bool {
        self.debug_log.load(Ordering::Relaxed)
    }

    /// Turns diagnostics logging on or off.
    pub fn set_debug_log(&self, enabled: bool) {
        self.debug_log.store(enabled, Ordering::Relaxed);
    }

    /// Whether `site` is hidden.
    #[must_use]
    pub fn disable(&self, site: BillboardSite) -> bool {
        self.sites[site.index()].disable.load(Ordering::Relaxed)
    }

    /// Hides or shows `site`.
    pub fn set_disable(&self, site: BillboardSite, disabled: bool) {
        self.sites[site.index()].disable.store(disabled, Ordering::Relaxed);
    }

    /// Whether `site` is rewritten.
    #[must_use]
    pub fn rewrite(&self, site: BillboardSite) -> bool {
        self.sites[site.index()].rewrite.load(Ordering::Relaxed)
    }

    /// Enables or disables rewriting for `site`.
    pub fn set_rewrite(&self, site: BillboardSite, enabled: bool) {
        self.sites[site.index()].rewrite.store(enabled, Ordering::Relaxed);
    }

    /// Whether the legacy draw is zeroed after a successful rewrite.
    #[must_use]
    pub fn suppress_original(&self, site: BillboardSite) -> bool {
        self.sites[site.index()]
            .suppress_original
            .load(Ordering::Relaxed)
    }

    /// Sets whether the legacy draw is zeroed after a successful rewrite.
    pub fn set_suppress_original(&self, site: BillboardSite, enabled: bool) {
        self.sites[site.index()]
            .suppress_original
            .store(enabled, Ordering::Relaxed);
    }

    /// Point-in-time copy of one site's flags.
    #[must_use]
    pub fn snapshot(&self, site: BillboardSite) -> SiteToggleSettings {
        SiteToggleSettings {
            disable: self.disable(site),
            rewrite: self.rewrite(site),
            suppress_original: self.suppress_original(site),
        }
    }
}

impl Default for BillboardToggles {
    fn default() -> Self {
        Self::from_settings(&ToggleSettings::default())
    }
}
