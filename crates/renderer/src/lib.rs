//! Renderer crate for the aurora background.
//!
//! A full-screen quad is rasterised every display refresh through a fragment
//! shader that paints drifting aurora curtains. The pieces are:
//!
//! ```text
//!   aurora CLI
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ WinitHost + WgpuBackend ──▶ AuroraBackground::mount
//!                                                    │
//!        frame callback ──▶ AnimationLoop::render_frame ──▶ clear/bind/upload/draw
//!        resize event   ──▶ SurfaceManager::sync_with_host ──▶ set_viewport
//! ```
//!
//! Everything above the [`GraphicsBackend`] and [`FrameHost`] traits is
//! independent of `wgpu` and `winit`, which is how the program builder,
//! surface manager and animation loop are tested without a GPU.

mod animation;
mod backend;
mod clock;
mod error;
mod gpu;
mod host;
mod program;
mod quad;
mod runtime;
mod session;
mod shaders;
mod surface;
#[cfg(test)]
mod testing;
mod types;
mod window;

use anyhow::Result;

pub use animation::{AnimationLoop, CancellationHandle, FrameOutcome, CLEAR_COLOR};
pub use backend::{
    AttributeLocation, BufferId, GraphicsBackend, ProgramId, ShaderId, ShaderStage,
    UniformKind, UniformLocation, VertexLayout,
};
pub use clock::AnimationClock;
pub use error::{DrawError, RenderError};
pub use gpu::{check_sources, ContextOptions, OfflineBackend, ShaderReport, WgpuBackend};
pub use host::{FrameHost, FrameRequest, ResizeListener};
pub use program::{compile_program, ShaderProgram};
pub use quad::{FullScreenQuad, QUAD_VERTEX_COUNT, QUAD_VERTICES};
pub use runtime::{FramePacer, FramePacing, PacerDecision};
pub use session::AuroraBackground;
pub use shaders::{
    ShaderSources, AURORA_FRAGMENT_GLSL, POSITION_ATTRIBUTE, RESOLUTION_UNIFORM, TIME_UNIFORM,
    VERTEX_SHADER_GLSL,
};
pub use surface::{SurfaceManager, SurfaceSize, SurfaceSizeProvider};
pub use types::{GpuPowerPreference, RendererConfig, VsyncMode};
pub use window::WinitHost;

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the window and renders until it is closed.
    ///
    /// Returns an error if no graphics context can be created, if the shader
    /// program fails to build, or if drawing fails unrecoverably.
    pub fn run(&self) -> Result<()> {
        window::run_window(&self.config)
    }
}
