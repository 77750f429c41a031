use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, error, info, trace};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::animation::FrameOutcome;
use crate::gpu::{ContextOptions, WgpuBackend};
use crate::host::{FrameHost, FrameRequest, ResizeListener};
use crate::runtime::{FramePacer, FramePacing, PacerDecision};
use crate::session::AuroraBackground;
use crate::types::RendererConfig;

/// [`FrameHost`] backed by a `winit` window.
///
/// A frame request becomes a `request_redraw` once the pacer allows it; the
/// matching `RedrawRequested` event delivers the frame callback.
pub struct WinitHost {
    window: Arc<Window>,
    pacer: FramePacer,
    origin: Instant,
    next_token: u64,
    pending: Option<FrameRequest>,
    listeners: Vec<ResizeListener>,
}

impl WinitHost {
    pub fn new(window: Arc<Window>, pacing: FramePacing) -> Self {
        Self {
            window,
            pacer: FramePacer::new(pacing),
            origin: Instant::now(),
            next_token: 0,
            pending: None,
            listeners: Vec::new(),
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Milliseconds since the host was created, the timebase of frame
    /// callbacks.
    pub fn timestamp_ms(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.origin).as_secs_f64() * 1000.0
    }

    /// Consumes the outstanding request when a redraw arrives. Redraws the
    /// compositor sends on its own carry no request and are ignored.
    pub fn take_due_frame(&mut self, now: Instant) -> Option<FrameRequest> {
        let request = self.pending.take()?;
        self.pacer.mark_delivered(now);
        Some(request)
    }

    /// Called when the event loop is about to sleep.
    pub fn schedule(&mut self, now: Instant) -> ControlFlow {
        match self.pacer.poll(now) {
            PacerDecision::RedrawNow => {
                self.window.request_redraw();
                ControlFlow::Wait
            }
            PacerDecision::WaitUntil(deadline) => {
                trace!(
                    wait_ms = deadline.saturating_duration_since(now).as_millis() as u64,
                    "waiting for next frame deadline"
                );
                ControlFlow::WaitUntil(deadline)
            }
            PacerDecision::Idle => ControlFlow::Wait,
        }
    }
}

impl FrameHost for WinitHost {
    fn request_frame(&mut self) -> FrameRequest {
        self.next_token += 1;
        let request = FrameRequest(self.next_token);
        self.pending = Some(request);
        self.pacer.request();
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.pending = None;
            self.pacer.cancel();
        }
    }

    fn viewport_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn add_resize_listener(&mut self) -> ResizeListener {
        self.next_token += 1;
        let listener = ResizeListener(self.next_token);
        self.listeners.push(listener);
        listener
    }

    fn remove_resize_listener(&mut self, listener: ResizeListener) {
        self.listeners.retain(|existing| *existing != listener);
    }
}

/// Opens the window, mounts the background and runs the event loop until the
/// window closes or rendering fails.
pub(crate) fn run_window(config: &RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let (width, height) = config.surface_size;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .context("failed to create window")?;
    let window = Arc::new(window);

    let size = window.inner_size();
    let backend = WgpuBackend::new(
        window.clone(),
        (size.width, size.height),
        ContextOptions {
            power: config.power,
            vsync: config.vsync,
            frame_latency: config.frame_latency,
        },
    )?;
    let host = WinitHost::new(window.clone(), config.pacing);
    let mut background = Some(AuroraBackground::mount(
        backend,
        host,
        &config.sources,
        config.stats_interval,
    )?);
    info!(pacing = ?config.pacing, "entering event loop");

    let mut failure: Option<anyhow::Error> = None;
    let run_result = event_loop.run(|event, elwt| {
        let Some(session) = background.as_mut() else {
            elwt.exit();
            return;
        };
        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    debug!("window closed");
                    elwt.exit();
                }
                WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                    session.handle_resize();
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    if session.host_mut().take_due_frame(now).is_none() {
                        return;
                    }
                    let timestamp_ms = session.host().timestamp_ms(now);
                    if let FrameOutcome::Stopped(err) = session.render_frame(timestamp_ms) {
                        error!(error = %err, "rendering stopped");
                        failure = Some(anyhow!(err).context("aurora background stopped"));
                        elwt.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                let flow = session.host_mut().schedule(Instant::now());
                elwt.set_control_flow(flow);
            }
            Event::LoopExiting => {
                if let Some(session) = background.take() {
                    session.unmount();
                }
            }
            _ => {}
        }
    });

    // Release GPU objects while the window is still alive.
    if let Some(session) = background.take() {
        session.unmount();
    }
    run_result.map_err(|err| anyhow!("window event loop error: {err}"))?;
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
