/// Host clock samples are in milliseconds; the shader consumes seconds.
const MILLIS_PER_SECOND: f64 = 1000.0;

/// Elapsed-time source for the `iTime` uniform.
///
/// The start timestamp is latched by the first sample rather than when the
/// loop starts, so the first rendered frame always sees exactly `0.0` no
/// matter how long the host took to deliver it.
#[derive(Debug, Clone, Default)]
pub struct AnimationClock {
    start_ms: Option<f64>,
    last_seconds: f32,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns seconds since the first sample.
    ///
    /// Never decreases: a host timestamp that steps backwards repeats the
    /// previous value.
    pub fn sample(&mut self, timestamp_ms: f64) -> f32 {
        let start = *self.start_ms.get_or_insert(timestamp_ms);
        let seconds = ((timestamp_ms - start).max(0.0) / MILLIS_PER_SECOND) as f32;
        self.last_seconds = self.last_seconds.max(seconds);
        self.last_seconds
    }

    pub fn start_ms(&self) -> Option<f64> {
        self.start_ms
    }

    pub fn reset(&mut self) {
        self.start_ms = None;
        self.last_seconds = 0.0;
    }
}
