use super::{WindowCombo, WindowSnapshot};

#[derive(Clone, Debug, PartialEq)]
struct WindowSpan {
    start_lap: u64,
    end_lap: u64,
    total_duration_ms: f64,
}

/// Sliding-window "best N consecutive laps" statistic.
///
/// The running sum is seeded by direct summation when the lap count first
/// reaches the window size and slid in O(1) afterwards: subtract the lap
/// leaving the window, add the lap entering it. Every full window ever seen
/// is kept so the dashboard can list all combinations.
pub struct WindowStats {
    size: usize,
    current_sum: f64,
    best: Option<f64>,
    spans: Vec<WindowSpan>,
}

impl WindowStats {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            current_sum: 0.0,
            best: None,
            spans: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn has_enough_data(&self) -> bool {
        !self.spans.is_empty()
    }

    pub fn best_duration_ms(&self) -> Option<f64> {
        self.best
    }

    /// Accounts for the newest lap. `durations` is the full session history
    /// including the value just appended.
    pub fn push(&mut self, durations: &[f64]) {
        let k = durations.len();
        if self.size == 0 || k < self.size {
            return;
        }
        if k == self.size {
            self.current_sum = durations.iter().sum();
        } else {
            self.current_sum = self.current_sum - durations[k - self.size - 1] + durations[k - 1];
        }
        self.record_span(k);
    }

    /// Window boundaries shift when the size changes, so the history is
    /// rebuilt from scratch rather than patched incrementally.
    pub fn rebuild(&mut self, durations: &[f64], size: usize) {
        self.size = size;
        self.current_sum = 0.0;
        self.best = None;
        self.spans.clear();
        if size == 0 || durations.len() < size {
            return;
        }
        self.current_sum = durations[..size].iter().sum();
        self.record_span(size);
        for k in (size + 1)..=durations.len() {
            self.current_sum = self.current_sum - durations[k - size - 1] + durations[k - 1];
            self.record_span(k);
        }
    }

    pub fn reset(&mut self) {
        self.current_sum = 0.0;
        self.best = None;
        self.spans.clear();
    }

    fn record_span(&mut self, laps_seen: usize) {
        let span = WindowSpan {
            start_lap: (laps_seen - self.size + 1) as u64,
            end_lap: laps_seen as u64,
            total_duration_ms: self.current_sum,
        };
        if self.best.is_none_or(|best| span.total_duration_ms < best) {
            self.best = Some(span.total_duration_ms);
        }
        self.spans.push(span);
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        // ties on exact f64 equality are all flagged best; identical lap
        // patterns sum identically, rounding-induced ties are accepted
        let combinations = self
            .spans
            .iter()
            .map(|span| WindowCombo {
                start_lap: span.start_lap,
                end_lap: span.end_lap,
                total_duration_ms: span.total_duration_ms,
                is_best: Some(span.total_duration_ms) == self.best,
            })
            .collect();
        WindowSnapshot {
            size: self.size,
            has_enough_data: self.has_enough_data(),
            recent_total_ms: self.has_enough_data().then_some(self.current_sum),
            best_duration_ms: self.best,
            combinations,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn push_all(stats: &mut WindowStats, durations: &[f64]) {
        for k in 1..=durations.len() {
            stats.push(&durations[..k]);
        }
    }

    #[test]
    fn test_insufficient_data_below_window_size() {
        let mut stats = WindowStats::new(3);
        push_all(&mut stats, &[1000.0, 900.0]);
        let snapshot = stats.snapshot();
        assert!(!snapshot.has_enough_data);
        assert_eq!(snapshot.best_duration_ms, None);
        assert_eq!(snapshot.recent_total_ms, None);
        assert!(snapshot.combinations.is_empty());
    }

    #[test]
    fn test_seeds_at_exactly_window_size() {
        let mut stats = WindowStats::new(3);
        push_all(&mut stats, &[1000.0, 900.0, 1100.0]);
        let snapshot = stats.snapshot();
        assert!(snapshot.has_enough_data);
        assert_eq!(snapshot.best_duration_ms, Some(3000.0));
        assert_eq!(snapshot.recent_total_ms, Some(3000.0));
        assert_eq!(snapshot.combinations.len(), 1);
        assert!(snapshot.combinations[0].is_best);
        assert_eq!(snapshot.combinations[0].start_lap, 1);
        assert_eq!(snapshot.combinations[0].end_lap, 3);
    }

    #[test]
    fn test_slides_and_tracks_best() {
        let d1 = 1000.0 + 0.4;
        let d2 = 900.0 + 0.6;
        let d3 = 1100.0 + 0.5;
        let d4 = 950.0 + 0.3;
        let mut stats = WindowStats::new(3);
        push_all(&mut stats, &[d1, d2, d3, d4]);

        let first_sum = d1 + d2 + d3;
        let second_sum = first_sum - d1 + d4;
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.combinations.len(), 2);
        assert_eq!(snapshot.combinations[0].total_duration_ms, first_sum);
        assert_eq!(snapshot.combinations[1].total_duration_ms, second_sum);
        assert_eq!(snapshot.best_duration_ms, Some(second_sum));
        // the new window beat the first one
        assert!(!snapshot.combinations[0].is_best);
        assert!(snapshot.combinations[1].is_best);
        assert_eq!(snapshot.combinations[1].start_lap, 2);
        assert_eq!(snapshot.combinations[1].end_lap, 4);
    }

    #[test]
    fn test_ties_are_all_marked_best() {
        let mut stats = WindowStats::new(2);
        push_all(&mut stats, &[5.0, 5.0, 5.0, 5.0]);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.combinations.len(), 3);
        assert!(snapshot.combinations.iter().all(|combo| combo.is_best));
        assert_eq!(snapshot.best_duration_ms, Some(10.0));
    }

    #[test]
    fn test_window_of_one_tracks_single_laps() {
        let mut stats = WindowStats::new(1);
        push_all(&mut stats, &[30.0, 20.0, 40.0]);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.combinations.len(), 3);
        assert_eq!(snapshot.best_duration_ms, Some(20.0));
        assert_eq!(snapshot.recent_total_ms, Some(40.0));
    }

    #[test]
    fn test_rebuild_matches_incremental_pushes() {
        let durations = [1000.4, 900.6, 1100.5, 950.3, 980.1, 1010.9];
        let mut incremental = WindowStats::new(3);
        push_all(&mut incremental, &durations);
        let mut rebuilt = WindowStats::new(5);
        rebuilt.rebuild(&durations, 3);
        assert_eq!(incremental.snapshot(), rebuilt.snapshot());
    }

    #[test]
    fn test_rebuild_with_larger_window_drops_old_spans() {
        let durations = [10.0, 20.0, 30.0, 40.0];
        let mut stats = WindowStats::new(2);
        push_all(&mut stats, &durations);
        stats.rebuild(&durations, 4);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.size, 4);
        assert_eq!(snapshot.combinations.len(), 1);
        assert_eq!(snapshot.best_duration_ms, Some(100.0));
    }

    #[test]
    fn test_reset_clears_history_but_keeps_size() {
        let mut stats = WindowStats::new(2);
        push_all(&mut stats, &[10.0, 20.0, 30.0]);
        stats.reset();
        assert_eq!(stats.size(), 2);
        assert!(!stats.has_enough_data());
        assert_eq!(stats.best_duration_ms(), None);
    }

    proptest! {
        // Integer-valued durations keep every sum exact, so the sliding
        // result can be checked against direct range summation.
        #[test]
        fn prop_matches_brute_force_on_exact_sums(
            durations in prop::collection::vec(1u32..10_000, 1..40),
            size in 1usize..10,
        ) {
            let durations: Vec<f64> = durations.into_iter().map(f64::from).collect();
            let mut stats = WindowStats::new(size);
            push_all(&mut stats, &durations);
            let snapshot = stats.snapshot();

            if durations.len() < size {
                prop_assert!(!snapshot.has_enough_data);
                return Ok(());
            }

            let sums: Vec<f64> = durations
                .windows(size)
                .map(|window| window.iter().sum())
                .collect();
            let best = sums.iter().copied().fold(f64::INFINITY, f64::min);

            prop_assert_eq!(snapshot.combinations.len(), sums.len());
            prop_assert_eq!(snapshot.best_duration_ms, Some(best));
            for (combo, sum) in snapshot.combinations.iter().zip(&sums) {
                prop_assert_eq!(combo.total_duration_ms, *sum);
                prop_assert_eq!(combo.is_best, *sum == best);
                prop_assert_eq!(combo.end_lap - combo.start_lap + 1, size as u64);
            }
        }

        #[test]
        fn prop_rebuild_equals_incremental(
            durations in prop::collection::vec(0.1f64..5000.0, 0..30),
            size in 1usize..8,
        ) {
            let mut incremental = WindowStats::new(size);
            push_all(&mut incremental, &durations);
            let mut rebuilt = WindowStats::new(size + 1);
            rebuilt.rebuild(&durations, size);
            prop_assert_eq!(incremental.snapshot(), rebuilt.snapshot());
        }
    }
}
