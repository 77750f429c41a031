use tracing::{debug, trace, warn};

use crate::backend::GraphicsBackend;
use crate::host::{FrameHost, ResizeListener};

/// Drawable dimensions in device pixels. Never zero in either axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    /// Clamps both edges into `1..=max_dimension`.
    pub fn clamped(width: u32, height: u32, max_dimension: u32) -> Self {
        let max_dimension = max_dimension.max(1);
        Self {
            width: width.clamp(1, max_dimension),
            height: height.clamp(1, max_dimension),
        }
    }

    pub fn as_uniform(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

impl Default for SurfaceSize {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
        }
    }
}

/// Read side of the surface handed to the animation loop each frame.
pub trait SurfaceSizeProvider {
    fn current_size(&self) -> SurfaceSize;
}

/// Tracks the drawable size and keeps the backend viewport in step with it.
#[derive(Debug, Default)]
pub struct SurfaceManager {
    applied: Option<SurfaceSize>,
    listener: Option<ResizeListener>,
}

impl SurfaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a new drawable size, clamped to what the backend supports.
    ///
    /// Returns `false` when the clamped size is already applied, in which case
    /// the backend is left untouched.
    pub fn resize<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> bool {
        let max_dimension = backend.max_surface_dimension();
        let size = SurfaceSize::clamped(width, height, max_dimension);
        if width > max_dimension || height > max_dimension {
            warn!(
                requested_width = width,
                requested_height = height,
                width = size.width,
                height = size.height,
                "clamped drawable size to backend limit"
            );
        } else if width == 0 || height == 0 {
            // Minimised windows report zero; nothing is visible anyway.
            debug!(
                requested_width = width,
                requested_height = height,
                "zero-sized drawable raised to one pixel"
            );
        }
        if self.applied == Some(size) {
            trace!(width = size.width, height = size.height, "resize is a no-op");
            return false;
        }
        backend.set_viewport(size.width, size.height);
        self.applied = Some(size);
        debug!(width = size.width, height = size.height, "resized drawable surface");
        true
    }

    /// Re-queries the host viewport and applies it. Used for the eager
    /// start-up resize and for every resize notification.
    pub fn sync_with_host<B, H>(&mut self, backend: &mut B, host: &H) -> bool
    where
        B: GraphicsBackend + ?Sized,
        H: FrameHost + ?Sized,
    {
        let (width, height) = host.viewport_size();
        self.resize(backend, width, height)
    }

    /// Pushes the current size to the backend again, e.g. after the surface
    /// was lost.
    pub fn reapply<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) {
        let size = self.current_size();
        backend.set_viewport(size.width, size.height);
        self.applied = Some(size);
        debug!(width = size.width, height = size.height, "re-applied drawable surface");
    }

    /// Registers for host resize notifications. Idempotent.
    pub fn attach<H: FrameHost + ?Sized>(&mut self, host: &mut H) {
        if self.listener.is_none() {
            self.listener = Some(host.add_resize_listener());
        }
    }

    /// Unregisters the resize listener, if any. Idempotent.
    pub fn detach<H: FrameHost + ?Sized>(&mut self, host: &mut H) {
        if let Some(listener) = self.listener.take() {
            host.remove_resize_listener(listener);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.listener.is_some()
    }

    pub fn current_size(&self) -> SurfaceSize {
        self.applied.unwrap_or_default()
    }
}

impl SurfaceSizeProvider for SurfaceManager {
    fn current_size(&self) -> SurfaceSize {
        SurfaceManager::current_size(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{capture_logs, BackendCall, ManualHost, RecordingBackend};

    fn viewport_calls(backend: &RecordingBackend) -> Vec<(u32, u32)> {
        backend
            .calls()
            .iter()
            .filter_map(|call| match call {
                BackendCall::SetViewport(w, h) => Some((*w, *h)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn identical_resize_is_idempotent() {
        let mut backend = RecordingBackend::new();
        let mut surface = SurfaceManager::new();

        assert!(surface.resize(&mut backend, 1024, 768));
        assert!(!surface.resize(&mut backend, 1024, 768));

        assert_eq!(surface.current_size(), SurfaceSize { width: 1024, height: 768 });
        assert_eq!(viewport_calls(&backend), vec![(1024, 768)]);
    }

    #[test]
    fn zero_size_is_clamped_to_one_pixel() {
        let mut backend = RecordingBackend::new();
        let mut surface = SurfaceManager::new();

        surface.resize(&mut backend, 0, 0);

        assert_eq!(surface.current_size(), SurfaceSize { width: 1, height: 1 });
        assert_eq!(viewport_calls(&backend), vec![(1, 1)]);
    }

    #[test]
    fn minimise_logs_quietly_but_limit_clamp_warns() {
        let mut backend = RecordingBackend::new();
        backend.set_max_surface_dimension(4096);
        let mut surface = SurfaceManager::new();

        let minimised = capture_logs(|| {
            surface.resize(&mut backend, 0, 0);
        });
        assert!(minimised.contains("zero-sized drawable"), "{minimised}");
        assert!(!minimised.contains("WARN"), "{minimised}");

        let oversized = capture_logs(|| {
            surface.resize(&mut backend, 8192, 600);
        });
        assert!(oversized.contains("WARN"), "{oversized}");
        assert!(oversized.contains("backend limit"), "{oversized}");
    }

    #[test]
    fn oversized_request_is_clamped_to_backend_limit() {
        let mut backend = RecordingBackend::new();
        backend.set_max_surface_dimension(4096);
        let mut surface = SurfaceManager::new();

        surface.resize(&mut backend, 10_000, 300);

        assert_eq!(surface.current_size(), SurfaceSize { width: 4096, height: 300 });
    }

    #[test]
    fn sync_requeries_the_host_viewport() {
        let mut backend = RecordingBackend::new();
        let mut host = ManualHost::new(800, 600);
        let mut surface = SurfaceManager::new();

        surface.sync_with_host(&mut backend, &host);
        host.set_viewport(1920, 1080);
        surface.sync_with_host(&mut backend, &host);

        assert_eq!(viewport_calls(&backend), vec![(800, 600), (1920, 1080)]);
    }

    #[test]
    fn reapply_bypasses_idempotence() {
        let mut backend = RecordingBackend::new();
        let mut surface = SurfaceManager::new();
        surface.resize(&mut backend, 640, 480);
        surface.reapply(&mut backend);
        assert_eq!(viewport_calls(&backend), vec![(640, 480), (640, 480)]);
    }

    #[test]
    fn attach_and_detach_manage_a_single_listener() {
        let mut host = ManualHost::new(800, 600);
        let mut surface = SurfaceManager::new();

        surface.attach(&mut host);
        surface.attach(&mut host);
        assert_eq!(host.listener_count(), 1);

        surface.detach(&mut host);
        surface.detach(&mut host);
        assert_eq!(host.listener_count(), 0);
        assert!(!surface.is_attached());
    }
}
