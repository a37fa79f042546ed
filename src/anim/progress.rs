//! Progress reporting and cooperative cancellation.

/// Message surface and progress bar of the host application.
///
/// All calls are made synchronously from the read loop.
pub trait ProgressHost {
    /// Report completion in percent (0 to 100).
    fn set_progress(&mut self, _percent: f64) {}

    /// Polled once per time step.
    fn is_cancelled(&mut self) -> bool {
        false
    }

    /// Informational text for the host's output list.
    fn list(&mut self, _msg: &str) {}

    /// User-facing notice (dialog).
    fn notice(&mut self, _msg: &str) {}
}

/// Host that ignores everything and never cancels.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl ProgressHost for NullProgress {}

/// Relative cost of the three read phases.
pub const POSITION_WEIGHT: f64 = 1.0;
pub const FRINGE_WEIGHT: f64 = 500.0;
pub const DEFORMATION_WEIGHT: f64 = 30.0;

/// Weighted progress estimate over entities and time.
///
/// Each entity contributes the share of its enabled phases times the
/// window duration, so the bar reflects expected cost rather than
/// wall-clock time.
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    position_share: f64,
    fringe_share: f64,
    deformation_share: f64,
    duration: f64,
    stop: f64,
    total: f64,
    done: f64,
}

impl ProgressTracker {
    pub fn new(entities: usize, start: f64, stop: f64, fringe: bool, deformation: bool) -> Self {
        let fr = if fringe { 1.0 } else { 0.0 };
        let df = if deformation { 1.0 } else { 0.0 };
        let position_share = POSITION_WEIGHT / (POSITION_WEIGHT + FRINGE_WEIGHT * fr + DEFORMATION_WEIGHT * df);
        let fringe_share = fr * FRINGE_WEIGHT / (POSITION_WEIGHT + FRINGE_WEIGHT + DEFORMATION_WEIGHT * df);
        let deformation_share = df * DEFORMATION_WEIGHT / (POSITION_WEIGHT + FRINGE_WEIGHT * fr + DEFORMATION_WEIGHT);
        let duration = (stop - start).max(0.0);
        let total = entities as f64 * duration * (position_share + fringe_share + deformation_share);
        Self {
            position_share,
            fringe_share,
            deformation_share,
            duration,
            stop,
            total,
            done: 0.0,
        }
    }

    /// Progress in percent after reading `time` of the current entity.
    /// `fe_data` tells whether fringe and deformation phases apply to it.
    pub fn at(&self, time: f64, fe_data: bool) -> f64 {
        let share = if fe_data {
            self.position_share + self.fringe_share + self.deformation_share
        } else {
            self.position_share
        };
        let elapsed = (self.duration - (self.stop - time)).clamp(0.0, self.duration);
        self.percent(self.done + elapsed * share)
    }

    /// Mark the current entity as complete.
    pub fn finish_entity(&mut self, fe_data: bool) {
        let share = if fe_data {
            self.position_share + self.fringe_share + self.deformation_share
        } else {
            self.position_share
        };
        self.done += self.duration * share;
    }

    fn percent(&self, progress: f64) -> f64 {
        if self.total > 0.0 {
            (100.0 * progress / self.total).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shares() {
        let t = ProgressTracker::new(1, 0.0, 1.0, true, true);
        assert!((t.position_share - 1.0 / 531.0).abs() < 1e-15);
        assert!((t.fringe_share - 500.0 / 531.0).abs() < 1e-15);
        assert!((t.deformation_share - 30.0 / 531.0).abs() < 1e-15);

        let t = ProgressTracker::new(1, 0.0, 1.0, false, false);
        assert_eq!(t.position_share, 1.0);
        assert_eq!(t.fringe_share + t.deformation_share, 0.0);
    }

    #[test]
    fn test_progress_advances() {
        let mut t = ProgressTracker::new(2, 0.0, 2.0, false, true);
        assert_eq!(t.at(0.0, true), 0.0);
        assert!((t.at(1.0, true) - 25.0).abs() < 1e-9);
        t.finish_entity(true);
        assert!((t.at(0.0, true) - 50.0).abs() < 1e-9);
        t.finish_entity(true);
        assert!((t.at(0.0, true) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_window() {
        let t = ProgressTracker::new(3, 1.0, 1.0, true, false);
        assert_eq!(t.at(1.0, true), 0.0);
    }
}
