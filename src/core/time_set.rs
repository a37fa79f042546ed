//! Ordered sets of recorded result times.
//!
//! Summary-style result categories are not uniformly timed, so stepping
//! through them walks an explicit [`TimeSet`] instead of the archive's
//! native stepping.

use crate::util::Chrono;

/// Result category whose recorded times may be enumerated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultCategory {
    /// Dense time history.
    TimeHistory,
    /// Summary snapshots.
    Summary,
    /// Duty-cycle snapshots (fallback for summary animations).
    DutyCycle,
}

impl ResultCategory {
    /// Archive name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimeHistory => "timehist_rcy",
            Self::Summary => "summary_rcy",
            Self::DutyCycle => "dutycycle_rcy",
        }
    }
}

/// Strictly increasing set of distinct recorded times.
///
/// Empty when the category uses uniform, non-enumerable stepping.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSet {
    times: Vec<Chrono>,
}

impl TimeSet {
    /// Empty set.
    pub const fn new() -> Self {
        Self { times: Vec::new() }
    }

    /// Build from arbitrary times; sorts and drops duplicates and non-finite values.
    pub fn from_times(times: impl IntoIterator<Item = Chrono>) -> Self {
        let mut times: Vec<Chrono> = times.into_iter().filter(|t| t.is_finite()).collect();
        times.sort_by(|a, b| a.total_cmp(b));
        times.dedup();
        Self { times }
    }

    /// Insert a time, keeping the set ordered. Returns `false` if already present.
    pub fn insert(&mut self, time: Chrono) -> bool {
        if !time.is_finite() {
            return false;
        }
        match self.times.binary_search_by(|t| t.total_cmp(&time)) {
            Ok(_) => false,
            Err(pos) => {
                self.times.insert(pos, time);
                true
            }
        }
    }

    /// Number of times in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Check if the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Time at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Chrono> {
        self.times.get(index).copied()
    }

    /// Earliest time.
    #[inline]
    pub fn first(&self) -> Option<Chrono> {
        self.times.first().copied()
    }

    /// Latest time.
    #[inline]
    pub fn last(&self) -> Option<Chrono> {
        self.times.last().copied()
    }

    /// Index of the first time `>= time` (the ceiling sample).
    pub fn lower_bound(&self, time: Chrono) -> Option<usize> {
        let idx = self.times.partition_point(|&t| t < time);
        (idx < self.times.len()).then_some(idx)
    }

    /// Index of the last time `<= time` (the floor sample).
    pub fn floor_index(&self, time: Chrono) -> Option<usize> {
        let idx = self.times.partition_point(|&t| t <= time);
        idx.checked_sub(1)
    }

    /// Iterate over the times in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = Chrono> + '_ {
        self.times.iter().copied()
    }

    /// View as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[Chrono] {
        &self.times
    }
}

impl FromIterator<Chrono> for TimeSet {
    fn from_iter<I: IntoIterator<Item = Chrono>>(iter: I) -> Self {
        Self::from_times(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_times_sorted_unique() {
        let ts = TimeSet::from_times([0.5, 0.0, 0.5, f64::NAN, 2.0, 1.0]);
        assert_eq!(ts.as_slice(), &[0.0, 0.5, 1.0, 2.0]);
        assert!(ts.as_slice().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_insert() {
        let mut ts = TimeSet::new();
        assert!(ts.insert(1.0));
        assert!(ts.insert(0.0));
        assert!(!ts.insert(1.0));
        assert!(!ts.insert(f64::INFINITY));
        assert_eq!(ts.as_slice(), &[0.0, 1.0]);
    }

    #[test]
    fn test_lower_bound() {
        let ts = TimeSet::from_times([0.0, 0.5, 1.0, 2.0]);
        assert_eq!(ts.lower_bound(-1.0), Some(0));
        assert_eq!(ts.lower_bound(0.5), Some(1));
        assert_eq!(ts.lower_bound(0.6), Some(2));
        assert_eq!(ts.lower_bound(2.5), None);
    }

    #[test]
    fn test_floor_index() {
        let ts = TimeSet::from_times([0.0, 0.5, 1.0]);
        assert_eq!(ts.floor_index(-0.1), None);
        assert_eq!(ts.floor_index(0.7), Some(1));
        assert_eq!(ts.floor_index(5.0), Some(2));
    }

    #[test]
    fn test_category_names() {
        assert_eq!(ResultCategory::Summary.as_str(), "summary_rcy");
        assert_eq!(ResultCategory::TimeHistory.as_str(), "timehist_rcy");
    }
}
