//! Requested playback interval.

use crate::anim::{AnalysisSettings, AnimationConfig};
use crate::util::Chrono;

/// Resolved `[start, stop]` interval with its time fuzz.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeWindow {
    pub start: Chrono,
    pub stop: Chrono,
    /// Times closer than this are equal for loop termination.
    pub min_delta: Chrono,
}

impl TimeWindow {
    pub fn new(start: Chrono, stop: Chrono, min_delta: Chrono) -> Self {
        Self { start, stop, min_delta: min_delta.abs() }
    }

    /// Explicit range from `config`, else the full analysis interval.
    pub fn resolve(config: &AnimationConfig, analysis: &AnalysisSettings) -> Self {
        let (start, stop) = config.time_range.unwrap_or((analysis.start, analysis.stop));
        Self::new(start, stop, analysis.min_time_increment)
    }

    /// Exclusive loop bound: `stop` plus the fuzz.
    #[inline]
    pub fn end_time(&self) -> Chrono {
        self.stop + self.min_delta
    }

    /// Whether `t` lies before the loop bound.
    #[inline]
    pub fn contains(&self, t: Chrono) -> bool {
        t < self.end_time()
    }

    /// Length of the interval, never negative.
    #[inline]
    pub fn duration(&self) -> Chrono {
        (self.stop - self.start).max(0.0)
    }

    /// Stop at the last written time when that comes first.
    /// Non-finite times mean nothing is known and are ignored.
    pub fn clamp_to_written(&mut self, last_written: Option<Chrono>) {
        if let Some(t) = last_written {
            if t.is_finite() && t < self.stop {
                self.stop = t;
            }
        }
    }
}
