//! Rewrite statistics.
//!
//! Counters accumulate per draw site and are flushed as one summary line per
//! site every [`REPORT_INTERVAL_FRAMES`] frames.

use std::fmt;

use crate::error::RewriteFailure;
use crate::hooks::BillboardSite;

use super::trace::RewriteTrace;

/// Frames between two summaries of the same site.
pub const REPORT_INTERVAL_FRAMES: u64 = 150;

/// Successful calls are traced once every `PER_CALL_TRACE_MASK + 1` calls.
pub const PER_CALL_TRACE_MASK: u64 = 0x3F;

/// Counters of one site over one reporting interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SiteStats {
    /// Calls that reached the rewriter (or the observer).
    pub calls: u64,
    /// Calls that emitted a rewritten draw.
    pub emits: u64,
    /// Legacy draws zeroed after an emit (or by the observer).
    pub suppresses: u64,
    /// Calls passed through because rewriting is off.
    pub skips: u64,
    /// Calls hidden because the site is disabled.
    pub disabled: u64,
    /// Failed calls per failure kind.
    pub failures: [u64; RewriteFailure::COUNT],
    /// First emitted call of the interval.
    pub sample: Option<RewriteTrace>,
}

impl SiteStats {
    /// Sum of all failure counters.
    #[must_use]
    pub fn total_failures(&self) -> u64 {
        self.failures.iter().sum()
    }

    /// Count for one failure kind.
    #[must_use]
    pub const fn failures_of(&self, failure: RewriteFailure) -> u64 {
        self.failures[failure.index()]
    }

    /// Nothing happened this interval.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.calls == 0 && self.skips == 0 && self.disabled == 0
    }
}

/// One site's summary for a finished interval.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalReport {
    /// Site label.
    pub label: &'static str,
    /// Counters of the interval.
    pub stats: SiteStats,
    /// Arena slots in use when the report was taken.
    pub pool_used: u32,
    /// Arena capacity in slots.
    pub pool_capacity: u32,
}

impl fmt::Display for IntervalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        let fails = s.total_failures();
        write!(
            f,
            "[BILLBOARD {}] calls={} emit={} suppress={} skip={} disabled={} fail={}",
            self.label, s.calls, s.emits, s.suppresses, s.skips, s.disabled, fails
        )?;
        if fails > 0 {
            f.write_str(" (")?;
            let mut first = true;
            for failure in RewriteFailure::ALL {
                let count = s.failures_of(failure);
                if count == 0 {
                    continue;
                }
                if !first {
                    f.write_str(",")?;
                }
                write!(f, "{}={count}", failure.name())?;
                first = false;
            }
            f.write_str(")")?;
        }
        if let Some(sample) = &s.sample {
            write!(
                f,
                " [sample: xyz=({},{},{}) s={} z={:.2} grp={:08X}]",
                sample.world_x,
                sample.world_y,
                sample.world_z,
                sample.scale,
                sample.cam_z,
                sample.group_id
            )?;
        }
        write!(f, " pool={}/{}", self.pool_used, self.pool_capacity)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SiteDiagnostics {
    stats: SiteStats,
    last_report_frame: u64,
}

/// Per-site counters plus the reporting schedule.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsAggregator {
    sites: [SiteDiagnostics; BillboardSite::COUNT],
    traced_calls: u64,
}

impl DiagnosticsAggregator {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters of the current interval.
    #[must_use]
    pub fn stats(&self, site: BillboardSite) -> &SiteStats {
        &self.sites[site.index()].stats
    }

    /// Records a rewrite attempt.
    pub fn record(
        &mut self,
        site: BillboardSite,
        outcome: Result<(), RewriteFailure>,
        suppressed: bool,
        trace: &RewriteTrace,
    ) {
        let stats = &mut self.sites[site.index()].stats;
        stats.calls += 1;
        match outcome {
            Ok(()) => {
                stats.emits += 1;
                if suppressed {
                    stats.suppresses += 1;
                }
                if stats.sample.is_none() {
                    stats.sample = Some(*trace);
                }
            }
            Err(failure) => stats.failures[failure.index()] += 1,
        }
    }

    /// Records a call passed through with rewriting off.
    pub fn record_skip(&mut self, site: BillboardSite) {
        self.sites[site.index()].stats.skips += 1;
    }

    /// Records a call hidden by the disable toggle.
    pub fn record_disabled(&mut self, site: BillboardSite) {
        self.sites[site.index()].stats.disabled += 1;
    }

    /// Records a call at an observer-only site.
    pub fn record_observed(&mut self, site: BillboardSite, suppressed: bool) {
        let stats = &mut self.sites[site.index()].stats;
        stats.calls += 1;
        if suppressed {
            stats.suppresses += 1;
        }
    }

    /// Closes the site's interval if it has run long enough.
    ///
    /// Counters reset whenever an interval closes with activity; the report
    /// is returned so the caller can decide whether to log it.
    pub fn maybe_report(
        &mut self,
        site: BillboardSite,
        frame_count: u64,
        pool_used: u32,
        pool_capacity: u32,
    ) -> Option<IntervalReport> {
        let slot = &mut self.sites[site.index()];
        if frame_count.wrapping_sub(slot.last_report_frame) < REPORT_INTERVAL_FRAMES {
            return None;
        }
        slot.last_report_frame = frame_count;
        if slot.stats.is_idle() {
            return None;
        }
        Some(IntervalReport {
            label: site.label(),
            stats: std::mem::take(&mut slot.stats),
            pool_used,
            pool_capacity,
        })
    }

    /// Counts a traced call and returns its number if it should be logged:
    /// every failure, and every 64th call otherwise.
    pub fn per_call_trace(&mut self, failed: bool) -> Option<u64> {
        self.traced_calls += 1;
        let n = self.traced_calls;
        (failed || n & PER_CALL_TRACE_MASK == 0).then_some(n)
    }
}
