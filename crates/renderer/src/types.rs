use std::time::Duration;

use crate::runtime::FramePacing;
use crate::shaders::ShaderSources;

/// Adapter selection hint forwarded to `wgpu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    /// Prefer integrated GPUs; a background should not wake the discrete one.
    #[default]
    Low,
    High,
}

/// Presentation synchronisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VsyncMode {
    /// FIFO presentation; frames are paced by the display.
    #[default]
    On,
    /// Prefer immediate, then mailbox presentation; falls back to FIFO.
    Off,
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors the merged CLI flags and config file: how large
/// the window should be, which shaders to build, and how frames are paced
/// and presented.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    pub title: String,
    pub vsync: VsyncMode,
    pub power: GpuPowerPreference,
    /// Frames the GPU may queue ahead of presentation (1-3).
    pub frame_latency: u32,
    pub pacing: FramePacing,
    /// How often achieved FPS is logged at `debug`; `None` disables it.
    pub stats_interval: Option<Duration>,
    pub sources: ShaderSources,
}

impl Default for RendererConfig {
    /// A 1280x720 window showing the bundled aurora at display cadence.
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "Aurora".to_string(),
            vsync: VsyncMode::default(),
            power: GpuPowerPreference::default(),
            frame_latency: 2,
            pacing: FramePacing::default(),
            stats_interval: Some(Duration::from_secs(5)),
            sources: ShaderSources::builtin(),
        }
    }
}
