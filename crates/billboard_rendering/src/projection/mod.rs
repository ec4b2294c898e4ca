//! # Projection
//!
//! Camera matrix caching and the world-to-screen billboard projector.

mod projector;
mod view_cache;

pub use projector::{
    project, validate_args, validate_screen, BillboardConfig, BillboardInput, BottomEdge,
    IdentityMode, ProjectedQuad, ScaleClamp, ScaleMode,
};
pub use view_cache::{ScratchMatrices, ScreenSize, ViewProjection, ViewProjectionCache};
