use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;

/// Frame-latency range accepted by the swapchain.
pub const FRAME_LATENCY_RANGE: std::ops::RangeInclusive<u32> = 1..=3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    #[default]
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuroraConfig {
    pub version: u32,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub render: RenderSection,
    #[serde(default)]
    pub shader: ShaderSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WindowSection {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_title")]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderSection {
    #[serde(default = "default_vsync")]
    pub vsync: bool,
    #[serde(default)]
    pub power: PowerSetting,
    /// `0` follows the display; anything above caps the frame rate.
    #[serde(default)]
    pub fps: f32,
    #[serde(default = "default_frame_latency")]
    pub frame_latency: u32,
    #[serde(
        default = "default_stats_interval",
        deserialize_with = "deserialize_duration_opt"
    )]
    pub stats_interval: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ShaderSection {
    #[serde(default)]
    pub vertex: Option<PathBuf>,
    #[serde(default)]
    pub fragment: Option<PathBuf>,
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_title() -> String {
    "Aurora".to_string()
}

fn default_vsync() -> bool {
    true
}

fn default_frame_latency() -> u32 {
    2
}

fn default_stats_interval() -> Option<Duration> {
    Some(Duration::from_secs(5))
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
        }
    }
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            vsync: default_vsync(),
            power: PowerSetting::default(),
            fps: 0.0,
            frame_latency: default_frame_latency(),
            stats_interval: default_stats_interval(),
        }
    }
}

impl Default for AuroraConfig {
    fn default() -> Self {
        Self {
            version: 1,
            window: WindowSection::default(),
            render: RenderSection::default(),
            shader: ShaderSection::default(),
        }
    }
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.trim() == "0" {
                return Ok(Some(Duration::ZERO));
            }
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() || v.is_infinite() {
                return Err(E::custom("duration must be a non-negative number"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl AuroraConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: AuroraConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates `path`. Relative shader paths are resolved against
    /// the directory holding the file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&input)?;
        Ok(match path.parent() {
            Some(base) => config.with_base_dir(base),
            None => config,
        })
    }

    /// Like [`AuroraConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn with_base_dir(mut self, base: &Path) -> Self {
        for path in [&mut self.shader.vertex, &mut self.shader.fragment]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }

    /// `None` when FPS reporting is disabled.
    pub fn stats_interval(&self) -> Option<Duration> {
        self.render
            .stats_interval
            .filter(|interval| !interval.is_zero())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        if !self.render.fps.is_finite() || self.render.fps < 0.0 {
            return Err(ConfigError::Invalid("render.fps must be >= 0".into()));
        }

        if !FRAME_LATENCY_RANGE.contains(&self.render.frame_latency) {
            return Err(ConfigError::Invalid(format!(
                "render.frame_latency must be between {} and {}, got {}",
                FRAME_LATENCY_RANGE.start(),
                FRAME_LATENCY_RANGE.end(),
                self.render.frame_latency
            )));
        }

        for (key, path) in [
            ("shader.vertex", &self.shader.vertex),
            ("shader.fragment", &self.shader.fragment),
        ] {
            if path
                .as_ref()
                .is_some_and(|path| path.as_os_str().is_empty())
            {
                return Err(ConfigError::Invalid(format!("{key} may not be empty")));
            }
        }

        Ok(())
    }
}
