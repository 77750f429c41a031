use std::fmt;

use tracing::error;

use crate::backend::ShaderStage;

/// Fatal configuration and setup failures of the background renderer.
///
/// None of these are retried: shader sources are compiled into the binary (or
/// read once at start-up), so a failure is deterministic and the background
/// simply renders nothing further.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to compile {stage} shader:\n{log}")]
    ShaderCompilation { stage: ShaderStage, log: String },
    #[error("failed to link shader program:\n{log}")]
    ShaderLink { log: String },
    #[error("uniform '{name}' could not be resolved in the linked program: {reason}")]
    UniformResolution { name: String, reason: String },
    #[error("vertex attribute '{name}' could not be resolved in the linked program")]
    AttributeResolution { name: String },
    #[error("graphics context unavailable: {reason}")]
    ContextUnavailable { reason: String },
}

impl RenderError {
    pub(crate) fn context_unavailable(reason: impl fmt::Display) -> Self {
        Self::ContextUnavailable {
            reason: reason.to_string(),
        }
    }

    /// Logs the error at `error` and hands it back; for `map_err` at the
    /// point a fatal failure is raised.
    pub(crate) fn logged(self) -> Self {
        error!(error = %self, "aurora background cannot start");
        self
    }

    /// Backend diagnostic text carried by the error, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::ShaderCompilation { log, .. } | Self::ShaderLink { log } => Some(log),
            _ => None,
        }
    }
}

/// Per-frame presentation failures reported by a backend draw.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DrawError {
    /// The swapchain no longer matches the window and must be reconfigured.
    #[error("drawable surface lost or outdated")]
    SurfaceLost,
    /// The next frame could not be acquired in time; the frame is dropped.
    #[error("timed out acquiring the next frame")]
    Timeout,
    #[error("graphics device out of memory")]
    OutOfMemory,
    #[error("draw failed: {0}")]
    Backend(String),
}

impl DrawError {
    /// Whether the animation loop can keep running after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SurfaceLost | Self::Timeout)
    }
}
