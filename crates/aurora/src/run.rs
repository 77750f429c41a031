use std::path::PathBuf;

use anyhow::{Context, Result};
use auroraconfig::{AuroraConfig, PowerSetting};
use renderer::{
    FramePacing, GpuPowerPreference, Renderer, RendererConfig, ShaderSources, VsyncMode,
};
use tracing_subscriber::EnvFilter;

use crate::cli::{RunArgs, ShaderArgs};
use crate::paths::AppPaths;

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let location = paths.locate_config(args.config.as_deref());
    tracing::debug!(
        config = %location.path().display(),
        overridden = paths.is_overridden(),
        "resolved aurora configuration path"
    );
    let file = location.load()?;
    let config = build_renderer_config(&args, &file)?;

    tracing::info!(
        width = config.surface_size.0,
        height = config.surface_size.1,
        vsync = ?config.vsync,
        power = ?config.power,
        pacing = ?config.pacing,
        builtin_shaders = config.sources.is_builtin(),
        "starting aurora background"
    );
    Renderer::new(config).run()
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Merges the config file with command-line overrides; flags win.
pub fn build_renderer_config(args: &RunArgs, file: &AuroraConfig) -> Result<RendererConfig> {
    let surface_size = args
        .size
        .unwrap_or((file.window.width, file.window.height));
    let vsync = if args.no_vsync || !file.render.vsync {
        VsyncMode::Off
    } else {
        VsyncMode::On
    };
    let power = match args.power.unwrap_or(file.render.power) {
        PowerSetting::Low => GpuPowerPreference::Low,
        PowerSetting::High => GpuPowerPreference::High,
    };
    let pacing = FramePacing::from_fps(args.fps.unwrap_or(file.render.fps));

    Ok(RendererConfig {
        surface_size,
        title: file.window.title.clone(),
        vsync,
        power,
        frame_latency: file.render.frame_latency,
        pacing,
        stats_interval: file.stats_interval(),
        sources: load_sources(&args.shader, file)?,
    })
}

/// Reads the shader pair, preferring paths given on the command line over
/// those in the config file.
pub fn load_sources(args: &ShaderArgs, file: &AuroraConfig) -> Result<ShaderSources> {
    let (vertex, fragment) = shader_paths(args, file);
    ShaderSources::load(vertex.as_deref(), fragment.as_deref())
        .context("failed to load shader sources")
}

pub fn shader_paths(args: &ShaderArgs, file: &AuroraConfig) -> (Option<PathBuf>, Option<PathBuf>) {
    (
        args.vertex.clone().or_else(|| file.shader.vertex.clone()),
        args.fragment.clone().or_else(|| file.shader.fragment.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn file_values_apply_without_flags() {
        let file = AuroraConfig::from_toml_str(
            "version = 1\n[window]\nwidth = 800\nheight = 600\n[render]\nvsync = false\npower = \"high\"\nfps = 24\nframe_latency = 3\nstats_interval = 0\n",
        )
        .unwrap();
        let config = build_renderer_config(&RunArgs::default(), &file).unwrap();

        assert_eq!(config.surface_size, (800, 600));
        assert_eq!(config.vsync, VsyncMode::Off);
        assert_eq!(config.power, GpuPowerPreference::High);
        assert_eq!(config.frame_latency, 3);
        assert_eq!(config.pacing, FramePacing::Fixed { fps: 24.0 });
        assert_eq!(config.stats_interval, None);
        assert!(config.sources.is_builtin());
    }

    #[test]
    fn flags_override_file_values() {
        let file = AuroraConfig::from_toml_str("version = 1\n[render]\nfps = 24\n").unwrap();
        let args = RunArgs {
            size: Some((640, 360)),
            fps: Some(0.0),
            no_vsync: true,
            power: Some(PowerSetting::High),
            ..RunArgs::default()
        };
        let config = build_renderer_config(&args, &file).unwrap();

        assert_eq!(config.surface_size, (640, 360));
        assert_eq!(config.pacing, FramePacing::Display);
        assert_eq!(config.vsync, VsyncMode::Off);
        assert_eq!(config.power, GpuPowerPreference::High);
        assert_eq!(config.stats_interval, Some(Duration::from_secs(5)));
    }

    #[test]
    fn command_line_shader_wins_over_config() {
        let root = TempDir::new().unwrap();
        let from_file = root.path().join("file.frag");
        let from_flag = root.path().join("flag.frag");
        fs::write(&from_file, "// file").unwrap();
        fs::write(&from_flag, "// flag").unwrap();

        let mut file = AuroraConfig::default();
        file.shader.fragment = Some(from_file);
        let args = ShaderArgs {
            fragment: Some(from_flag),
            vertex: None,
        };

        let sources = load_sources(&args, &file).unwrap();
        assert_eq!(sources.fragment, "// flag");
        assert_eq!(sources.vertex, renderer::VERTEX_SHADER_GLSL);
    }

    #[test]
    fn unreadable_shader_is_reported() {
        let mut file = AuroraConfig::default();
        file.shader.vertex = Some(PathBuf::from("/nonexistent/aurora.vert"));
        let err = load_sources(&ShaderArgs::default(), &file).unwrap_err();
        assert!(format!("{err:#}").contains("aurora.vert"));
    }
}
