use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use crate::backend::GraphicsBackend;
use crate::clock::AnimationClock;
use crate::error::DrawError;
use crate::host::{FrameHost, FrameRequest};
use crate::program::ShaderProgram;
use crate::quad::FullScreenQuad;
use crate::surface::SurfaceSizeProvider;

/// Opaque black; every frame starts from it.
pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Handle returned by [`AnimationLoop::start`]. Cancelling it prevents any
/// not-yet-executed frame body from drawing.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns `true` only for the call that actually flipped the flag.
    fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    fn same_as(&self, other: &CancellationHandle) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

/// What a single frame callback did.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// The quad was drawn with `iTime = elapsed_seconds`.
    Rendered { elapsed_seconds: f32 },
    /// The loop is stopped or was never started; nothing was drawn.
    Idle,
    /// The surface must be re-applied before the next frame.
    SurfaceLost,
    /// The frame was skipped (acquire timeout); the loop keeps running.
    Dropped,
    /// An unrecoverable draw error; the loop has stopped itself.
    Stopped(DrawError),
}

#[derive(Debug, Clone, Copy)]
struct ActiveBindings {
    program: ShaderProgram,
    quad: FullScreenQuad,
}

/// Drives the per-frame callback chain: latch the clock, bind, upload, draw,
/// request the next frame.
#[derive(Debug)]
pub struct AnimationLoop {
    clock: AnimationClock,
    bindings: Option<ActiveBindings>,
    handle: Option<CancellationHandle>,
    pending: Option<FrameRequest>,
    stats: FrameStats,
}

impl AnimationLoop {
    pub fn new(stats_interval: Option<Duration>) -> Self {
        Self {
            clock: AnimationClock::new(),
            bindings: None,
            handle: None,
            pending: None,
            stats: FrameStats::new(stats_interval),
        }
    }

    /// Starts the callback chain for `program` and `quad` and requests the
    /// first frame. A loop that was already running is stopped first.
    pub fn start<H: FrameHost + ?Sized>(
        &mut self,
        program: &ShaderProgram,
        quad: &FullScreenQuad,
        host: &mut H,
    ) -> CancellationHandle {
        if let Some(previous) = self.handle.clone() {
            self.stop(&previous, host);
        }

        self.clock.reset();
        self.stats.reset();
        let handle = CancellationHandle::new();
        self.bindings = Some(ActiveBindings {
            program: *program,
            quad: *quad,
        });
        self.handle = Some(handle.clone());
        self.pending = Some(host.request_frame());
        info!(program = program.id().raw(), "animation loop started");
        handle
    }

    /// Stops the loop owning `handle`. Stopping twice is a no-op.
    pub fn stop<H: FrameHost + ?Sized>(&mut self, handle: &CancellationHandle, host: &mut H) {
        if !handle.cancel() {
            trace!("animation loop already stopped");
            return;
        }
        let owns_handle = self
            .handle
            .as_ref()
            .is_some_and(|current| current.same_as(handle));
        if !owns_handle {
            return;
        }
        self.handle = None;
        self.bindings = None;
        if let Some(request) = self.pending.take() {
            host.cancel_frame(request);
        }
        info!("animation loop stopped");
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_cancelled())
    }

    /// Body of the host frame callback.
    pub fn render_frame<B, S, H>(
        &mut self,
        timestamp_ms: f64,
        backend: &mut B,
        surface: &S,
        host: &mut H,
    ) -> FrameOutcome
    where
        B: GraphicsBackend + ?Sized,
        S: SurfaceSizeProvider + ?Sized,
        H: FrameHost + ?Sized,
    {
        self.pending = None;
        let Some(bindings) = self.bindings else {
            return FrameOutcome::Idle;
        };
        if !self.is_running() {
            self.bindings = None;
            return FrameOutcome::Idle;
        }

        let elapsed_seconds = self.clock.sample(timestamp_ms);
        let size = surface.current_size();
        let ActiveBindings { program, quad } = bindings;

        backend.clear(CLEAR_COLOR);
        backend.use_program(program.id());
        backend.bind_vertex_attribute(quad.buffer(), program.position(), quad.layout());
        backend.set_uniform_f32(program.elapsed_time(), elapsed_seconds);
        backend.set_uniform_vec2(program.resolution(), size.as_uniform());

        let outcome = match backend.draw_triangle_strip(quad.vertex_count()) {
            Ok(()) => {
                self.stats.record(timestamp_ms);
                FrameOutcome::Rendered { elapsed_seconds }
            }
            Err(DrawError::SurfaceLost) => {
                warn!("drawable surface lost; reconfiguring before next frame");
                FrameOutcome::SurfaceLost
            }
            Err(DrawError::Timeout) => {
                warn!("frame acquisition timed out; dropping frame");
                FrameOutcome::Dropped
            }
            Err(err) => {
                error!(error = %err, "unrecoverable draw failure; stopping animation");
                if let Some(handle) = self.handle.clone() {
                    self.stop(&handle, host);
                }
                return FrameOutcome::Stopped(err);
            }
        };

        trace!(
            elapsed_seconds,
            width = size.width,
            height = size.height,
            "frame submitted"
        );
        self.pending = Some(host.request_frame());
        outcome
    }
}

/// Periodic achieved-FPS reporting.
#[derive(Debug)]
struct FrameStats {
    interval_ms: Option<f64>,
    window_start_ms: Option<f64>,
    frames: u32,
}

impl FrameStats {
    fn new(interval: Option<Duration>) -> Self {
        Self {
            interval_ms: interval
                .filter(|interval| !interval.is_zero())
                .map(|interval| interval.as_secs_f64() * 1000.0),
            window_start_ms: None,
            frames: 0,
        }
    }

    fn reset(&mut self) {
        self.window_start_ms = None;
        self.frames = 0;
    }

    /// Counts a presented frame; returns the achieved rate when a reporting
    /// window closes.
    fn record(&mut self, timestamp_ms: f64) -> Option<f64> {
        let interval_ms = self.interval_ms?;
        let start = *self.window_start_ms.get_or_insert(timestamp_ms);
        self.frames = self.frames.saturating_add(1);
        let span = timestamp_ms - start;
        if span < interval_ms {
            return None;
        }
        // The first frame of a window only opens it.
        let fps = f64::from(self.frames.saturating_sub(1)) * 1000.0 / span;
        debug!(fps, frames = self.frames, "frame statistics");
        self.window_start_ms = Some(timestamp_ms);
        self.frames = 1;
        Some(fps)
    }
}
