//! # Billboard Rendering
//!
//! Rewrites the legacy renderer's camera-facing sprite draws into
//! screen-space quads that the renderer can interpolate between frames.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      PER INTERCEPTED CALL                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Hook → Projector → Temporal Cache → Emitter → Display List   │
//! │    ↓        ↓              ↓            ↓                     │
//! │  Toggles  Camera Cache   Identity    Frame Arena              │
//! │    ↓                                                          │
//! │  Diagnostics (every 150 frames)                               │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## MANDATE
//!
//! - Failures are values, never panics
//! - The display list is only written once every check has passed
//! - All state lives in an explicit [`RewriteContext`]

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod emit;
pub mod error;
pub mod hooks;
pub mod interpolation;
pub mod pipeline;
pub mod projection;

pub use config::{GuestLayout, RewriteSettings, SiteToggleSettings, ToggleSettings};
pub use emit::{BillboardEmit, CommandEmitter, EmitReceipt};
pub use error::{ConfigError, RewriteFailure, RewriteResult};
pub use hooks::{dispatch, BillboardRuntime, BillboardSite, BillboardToggles, CallContext, HookOutcome};
pub use interpolation::{identity_hash, IdentityHash, PositionSignature, PrevLookup, QuadCorners, TemporalCache};
pub use pipeline::{BillboardCall, DiagnosticsAggregator, IntervalReport, RewriteContext, RewriteTrace};
pub use projection::{
    BillboardConfig, BillboardInput, ProjectedQuad, ScreenSize, ViewProjection, ViewProjectionCache,
};
