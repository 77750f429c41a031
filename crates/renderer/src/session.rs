use std::time::Duration;

use tracing::{debug, info};

use crate::animation::{AnimationLoop, CancellationHandle, FrameOutcome};
use crate::backend::GraphicsBackend;
use crate::error::RenderError;
use crate::host::FrameHost;
use crate::program::{compile_program, ShaderProgram};
use crate::quad::FullScreenQuad;
use crate::shaders::ShaderSources;
use crate::surface::{SurfaceManager, SurfaceSize};

/// A mounted aurora background: one graphics context, one program, one quad,
/// one animation loop and one resize subscription.
///
/// Teardown runs exactly once, either through [`AuroraBackground::unmount`] or
/// on drop, and releases everything in reverse order of acquisition. A mount
/// that fails part-way releases whatever it had already acquired.
pub struct AuroraBackground<B: GraphicsBackend, H: FrameHost> {
    // Declared before `host` so GPU objects are released before the host
    // drops.
    backend: B,
    host: H,
    surface: SurfaceManager,
    program: Option<ShaderProgram>,
    quad: Option<FullScreenQuad>,
    animation: AnimationLoop,
    handle: Option<CancellationHandle>,
    torn_down: bool,
}

impl<B: GraphicsBackend, H: FrameHost> AuroraBackground<B, H> {
    /// Sizes the drawable to the host viewport, builds the program and quad,
    /// subscribes to resizes, and starts the animation loop.
    pub fn mount(
        backend: B,
        host: H,
        sources: &ShaderSources,
        stats_interval: Option<Duration>,
    ) -> Result<Self, RenderError> {
        let mut session = Self {
            backend,
            host,
            surface: SurfaceManager::new(),
            program: None,
            quad: None,
            animation: AnimationLoop::new(stats_interval),
            handle: None,
            torn_down: false,
        };

        // Eager resize so the first frame never draws at a stale size.
        session
            .surface
            .sync_with_host(&mut session.backend, &session.host);

        // On error `session` drops here and tears down the context.
        let program = compile_program(&mut session.backend, &sources.vertex, &sources.fragment)?;
        session.program = Some(program);

        let quad = FullScreenQuad::create(&mut session.backend);
        session.quad = Some(quad);

        session.surface.attach(&mut session.host);
        session.handle = Some(session.animation.start(&program, &quad, &mut session.host));

        let size = session.surface.current_size();
        info!(
            width = size.width,
            height = size.height,
            builtin_shaders = sources.is_builtin(),
            "aurora background mounted"
        );
        Ok(session)
    }

    /// Host frame callback.
    pub fn render_frame(&mut self, timestamp_ms: f64) -> FrameOutcome {
        if self.torn_down {
            return FrameOutcome::Idle;
        }
        let outcome = self.animation.render_frame(
            timestamp_ms,
            &mut self.backend,
            &self.surface,
            &mut self.host,
        );
        if outcome == FrameOutcome::SurfaceLost {
            self.surface.reapply(&mut self.backend);
        }
        outcome
    }

    /// Host resize notification. Ignored once the listener is detached.
    pub fn handle_resize(&mut self) -> bool {
        if !self.surface.is_attached() {
            return false;
        }
        self.surface.sync_with_host(&mut self.backend, &self.host)
    }

    pub fn is_running(&self) -> bool {
        !self.torn_down && self.animation.is_running()
    }

    pub fn surface_size(&self) -> SurfaceSize {
        self.surface.current_size()
    }

    pub fn program(&self) -> Option<&ShaderProgram> {
        self.program.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Stops the background and releases every resource it holds.
    pub fn unmount(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        if let Some(handle) = self.handle.take() {
            self.animation.stop(&handle, &mut self.host);
        }
        self.surface.detach(&mut self.host);
        if let Some(quad) = self.quad.take() {
            quad.release(&mut self.backend);
        }
        if let Some(program) = self.program.take() {
            program.release(&mut self.backend);
        }
        self.backend.destroy();
        debug!("aurora background torn down");
    }
}

impl<B: GraphicsBackend, H: FrameHost> Drop for AuroraBackground<B, H> {
    fn drop(&mut self) {
        self.teardown();
    }
}
