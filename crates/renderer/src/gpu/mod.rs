//! `wgpu` implementation of the graphics backend.
//!
//! - `context` owns instance/device/surface wiring and swapchain
//!   reconfiguration.
//! - `reflect` parses GLSL with `naga`, validates it, and reflects stage
//!   interfaces and uniform blocks; it supplies the compile and link steps
//!   `wgpu` does not have.
//! - `uniforms` keeps CPU staging copies of uniform blocks.
//! - `backend` builds pipelines and records one render pass per draw.
//! - `offline` runs the same compile/link/reflect path with no device, for
//!   checking shaders ahead of time.

mod backend;
mod context;
mod offline;
mod reflect;
mod uniforms;

pub use backend::WgpuBackend;
pub use context::ContextOptions;
pub use offline::{check_sources, OfflineBackend, ShaderReport};
