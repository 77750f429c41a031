use std::sync::Arc;

use winit::window::Window;

use crate::error::RenderError;
use crate::types::{GpuPowerPreference, VsyncMode};

/// Knobs that shape adapter selection and swapchain configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    pub power: GpuPowerPreference,
    pub vsync: VsyncMode,
    pub frame_latency: u32,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            power: GpuPowerPreference::default(),
            vsync: VsyncMode::default(),
            frame_latency: 2,
        }
    }
}

/// Instance, device and configured surface for one window.
pub(crate) struct GpuContext {
    _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub max_dimension: u32,
}

impl GpuContext {
    /// Creates a surface for `window` and configures it at `initial_size`.
    ///
    /// The surface holds its own reference to the window, so the window
    /// outlives every frame presented through it.
    pub(crate) fn new(
        window: Arc<Window>,
        initial_size: (u32, u32),
        options: ContextOptions,
    ) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let surface = instance.create_surface(window).map_err(|err| {
            RenderError::context_unavailable(format!("failed to create rendering surface: {err}"))
        })?;

        let power_preference = match options.power {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| {
            RenderError::context_unavailable(format!("no suitable GPU adapter: {err}"))
        })?;

        let adapter_info = adapter.get_info();
        let limits = adapter.limits();
        tracing::debug!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            "selected GPU adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("aurora device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| {
            RenderError::context_unavailable(format!("failed to create GPU device: {err}"))
        })?;

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(&first_format) = surface_caps.formats.first() else {
            return Err(RenderError::context_unavailable(
                "surface is not compatible with the selected adapter",
            ));
        };
        // The shader writes display-referred colour; keep the swapchain
        // non-sRGB so it is not encoded twice.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .unwrap_or_else(|| {
                tracing::warn!(
                    fallback = ?first_format,
                    "no non-sRGB surface format available; colours will be brighter"
                );
                first_format
            });

        let present_mode = choose_present_mode(&surface_caps.present_modes, options.vsync);
        tracing::debug!(?present_mode, vsync = ?options.vsync, "using present mode");

        let desired_maximum_frame_latency = options.frame_latency.clamp(1, 3);
        if desired_maximum_frame_latency != options.frame_latency {
            tracing::warn!(
                requested = options.frame_latency,
                clamped = desired_maximum_frame_latency,
                "GPU frame latency clamped to valid range (1-3)"
            );
        }

        let max_dimension = device.limits().max_texture_dimension_2d;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: initial_size.0.clamp(1, max_dimension),
            height: initial_size.1.clamp(1, max_dimension),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            max_dimension,
        })
    }

    /// Reconfigures the swapchain. Sizes are already clamped by the caller.
    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
    }

    pub(crate) fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }
}

fn choose_present_mode(modes: &[wgpu::PresentMode], vsync: VsyncMode) -> wgpu::PresentMode {
    let find = |wanted: wgpu::PresentMode| modes.iter().copied().find(|mode| *mode == wanted);
    match vsync {
        // FIFO support is guaranteed by every backend.
        VsyncMode::On => wgpu::PresentMode::Fifo,
        VsyncMode::Off => find(wgpu::PresentMode::Immediate)
            .or_else(|| find(wgpu::PresentMode::Mailbox))
            .unwrap_or(wgpu::PresentMode::Fifo),
    }
}
