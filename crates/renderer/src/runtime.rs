use std::time::{Duration, Instant};

/// How often the host delivers frame callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FramePacing {
    /// One callback per display refresh; FIFO presentation does the pacing.
    #[default]
    Display,
    /// At most `fps` callbacks per second.
    Fixed { fps: f32 },
}

impl FramePacing {
    /// `0` (or anything non-positive or non-finite) means display cadence.
    pub fn from_fps(fps: f32) -> Self {
        if fps.is_finite() && fps > 0.0 {
            Self::Fixed { fps }
        } else {
            Self::Display
        }
    }

    pub fn frame_interval(&self) -> Option<Duration> {
        match *self {
            Self::Display => None,
            Self::Fixed { fps } => Some(Duration::from_secs_f32(1.0 / fps)),
        }
    }
}

/// Turns outstanding frame requests into redraws at the configured cadence.
///
/// The host records a request with [`FramePacer::request`]; each time the
/// event loop is about to sleep it asks [`FramePacer::poll`] whether to
/// redraw now or how long to wait.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Option<Duration>,
    last_frame: Option<Instant>,
    requested: bool,
}

/// Decision for the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacerDecision {
    RedrawNow,
    WaitUntil(Instant),
    Idle,
}

impl FramePacer {
    pub fn new(pacing: FramePacing) -> Self {
        Self {
            interval: pacing.frame_interval(),
            last_frame: None,
            requested: false,
        }
    }

    pub fn request(&mut self) {
        self.requested = true;
    }

    pub fn cancel(&mut self) {
        self.requested = false;
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }

    /// Earliest instant the next frame may run.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.interval, self.last_frame) {
            (Some(interval), Some(last)) => Some(last + interval),
            _ => None,
        }
    }

    pub fn poll(&self, now: Instant) -> PacerDecision {
        if !self.requested {
            return PacerDecision::Idle;
        }
        match self.next_deadline() {
            Some(deadline) if deadline > now => PacerDecision::WaitUntil(deadline),
            _ => PacerDecision::RedrawNow,
        }
    }

    /// Consumes the outstanding request when the frame is delivered.
    pub fn mark_delivered(&mut self, now: Instant) {
        self.requested = false;
        self.last_frame = Some(match (self.interval, self.last_frame) {
            // Stay on the grid unless we fell more than a frame behind.
            (Some(interval), Some(last)) if now.duration_since(last) < interval * 2 => {
                (last + interval).min(now)
            }
            _ => now,
        });
    }
}
