//! Time axis of one extraction run.
//!
//! When a key set is in use the stepper walks it explicitly instead of the
//! archive's native stepping, since summary data is not uniformly timed.

use tracing::{debug, instrument};

use crate::anim::{AnimationConfig, TimeWindow};
use crate::core::{ResultArchive, ResultCategory, TimeSet};
use crate::util::{is_valid_time, Chrono, TIME_INVALID};

/// Positions and advances the archive cursor over a [`TimeWindow`].
#[derive(Clone, Debug)]
pub struct ResultStepper {
    window: TimeWindow,
    keys: TimeSet,
    summary: bool,
    precache: Option<ResultCategory>,
    first: usize,
    next: usize,
    start_time: Chrono,
}

impl ResultStepper {
    /// Choose the key set for `config`. Does not touch the cursor.
    pub fn new(rdb: &dyn ResultArchive, config: &AnimationConfig, window: TimeWindow) -> Self {
        let loading = config.load_deformation || config.load_fringe();
        let mut precache = None;
        let keys = if config.summary_animation {
            if loading {
                precache = Some(ResultCategory::Summary);
            }
            let keys = rdb.keys(ResultCategory::Summary);
            if keys.is_empty() { rdb.keys(ResultCategory::DutyCycle) } else { keys }
        } else {
            if loading {
                precache = Some(ResultCategory::TimeHistory);
            }
            if loading && !config.most_frequent_framing {
                rdb.keys(ResultCategory::TimeHistory)
            } else {
                TimeSet::new()
            }
        };

        Self {
            window,
            keys,
            summary: config.summary_animation,
            precache,
            first: 0,
            next: 0,
            start_time: TIME_INVALID,
        }
    }

    /// Position at the first readable time of the window.
    ///
    /// Summary runs always span the whole key set. Other runs stop at the
    /// last written time. Returns `TIME_INVALID` when there is nothing to read.
    #[instrument(skip_all, fields(summary = self.summary))]
    pub fn start(&mut self, rdb: &mut dyn ResultArchive) -> Chrono {
        if let Some(category) = self.precache {
            rdb.enable_precache(category);
        }

        if self.summary && self.keys.is_empty() {
            debug!("no summary keys");
            return TIME_INVALID;
        }

        if !self.keys.is_empty() {
            let first = if self.summary { Some(0) } else { self.keys.lower_bound(self.window.start) };
            let Some(first) = first else {
                return TIME_INVALID;
            };
            self.first = first;
            if let Some(t) = self.keys.get(first) {
                self.window.start = t;
            }
        }

        let got = rdb.position_at(self.window.start);
        if !is_valid_time(got) {
            return TIME_INVALID;
        }

        if self.summary {
            if let Some(last) = self.keys.last() {
                self.window.stop = last;
            }
        } else {
            self.window.clamp_to_written(rdb.last_written_time());
        }

        self.next = self.first + 1;
        self.start_time = got;
        debug!(start = got, stop = self.window.stop, keys = self.keys.len(), "positioned");
        got
    }

    /// Reposition at the start time found by [`start`](Self::start).
    pub fn rewind(&mut self, rdb: &mut dyn ResultArchive) -> Chrono {
        if !is_valid_time(self.start_time) {
            return TIME_INVALID;
        }
        self.next = self.first + 1;
        rdb.position_at(self.start_time)
    }

    /// Reposition at the first readable time at or after `t`.
    pub fn seek(&mut self, rdb: &mut dyn ResultArchive, t: Chrono) -> Chrono {
        if self.keys.is_empty() {
            return rdb.position_at(t);
        }
        match self.keys.lower_bound(t) {
            Some(i) => {
                self.next = i + 1;
                self.keys.get(i).map_or(TIME_INVALID, |k| rdb.position_at(k))
            }
            None => TIME_INVALID,
        }
    }

    /// Step to the next readable time.
    pub fn increment(&mut self, rdb: &mut dyn ResultArchive) -> Chrono {
        if self.keys.is_empty() {
            return rdb.advance();
        }
        let Some(t) = self.keys.get(self.next) else {
            return TIME_INVALID;
        };
        self.next += 1;
        rdb.position_at(t)
    }

    /// Whether `t` is readable and within the window.
    #[inline]
    pub fn in_range(&self, t: Chrono) -> bool {
        is_valid_time(t) && self.window.contains(t)
    }

    #[inline]
    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    #[inline]
    pub fn keys(&self) -> &TimeSet {
        &self.keys
    }

    /// Time obtained by [`start`](Self::start).
    #[inline]
    pub fn start_time(&self) -> Chrono {
        self.start_time
    }

    #[inline]
    pub fn is_summary(&self) -> bool {
        self.summary
    }
}
