//! Growth rule for the worker pool.
//!
//! Deterministic so callers can predict worker counts: each step adds
//! half of the remaining headroom, at least one worker, never past the
//! ceiling. There is no shrink rule.

/// Workers to add when the pool holds `current` of at most `max`.
pub fn increment(current: usize, max: usize) -> usize {
    if current >= max {
        return 0;
    }
    ((max - current) / 2).max(1)
}

/// Whether the monitor should ask for growth at this occupancy.
pub fn over_threshold(len: usize, capacity: usize) -> bool {
    len > capacity / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_is_half_the_headroom() {
        assert_eq!(increment(2, 10), 4);
        assert_eq!(increment(6, 10), 2);
        assert_eq!(increment(1, 4), 1);
    }

    #[test]
    fn increment_is_at_least_one_below_ceiling() {
        assert_eq!(increment(9, 10), 1);
        assert_eq!(increment(3, 4), 1);
    }

    #[test]
    fn increment_is_zero_at_or_past_ceiling() {
        assert_eq!(increment(10, 10), 0);
        assert_eq!(increment(1, 1), 0);
        assert_eq!(increment(12, 10), 0);
    }

    #[test]
    fn repeated_growth_converges_on_max() {
        let max = 64;
        let mut current = 1;
        let mut steps = 0;
        while increment(current, max) > 0 {
            current += increment(current, max);
            steps += 1;
            assert!(current <= max);
        }
        assert_eq!(current, max);
        assert!(steps <= 8);
    }

    #[test]
    fn threshold_is_strictly_above_half() {
        assert!(!over_threshold(5, 10));
        assert!(over_threshold(6, 10));
        assert!(!over_threshold(0, 1));
        assert!(over_threshold(1, 1));
        assert!(over_threshold(2, 2));
        assert!(!over_threshold(1, 2));
    }
}
