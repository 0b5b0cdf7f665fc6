use std::collections::VecDeque;

pub const DEFAULT_FILTER_WINDOW: usize = 10;

/// Mean of the last `window` samples.
#[derive(Debug, Clone)]
pub struct MovingAverageFilter {
    samples: VecDeque<f64>,
    window: usize,
}

impl MovingAverageFilter {
    /// A zero window is bumped to one.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            samples: VecDeque::with_capacity(window + 1),
            window,
        }
    }

    pub fn append(&mut self, value: f64) {
        self.samples.push_back(value);
        if self.samples.len() > self.window {
            self.samples.pop_front();
        }
    }

    /// Zero when no samples are held.
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

impl Default for MovingAverageFilter {
    fn default() -> Self {
        Self::new(DEFAULT_FILTER_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_averages_zero() {
        let mut filter = MovingAverageFilter::new(3);
        assert_eq!(filter.average(), 0.0);

        filter.append(5.0);
        filter.reset();
        assert!(filter.is_empty());
        assert_eq!(filter.average(), 0.0);
    }

    #[test]
    fn averages_held_samples() {
        let mut filter = MovingAverageFilter::new(3);
        for value in [10.0, 20.0, 30.0] {
            filter.append(value);
        }
        assert_eq!(filter.average(), 20.0);

        filter.append(40.0);
        assert_eq!(filter.len(), 3);
        assert_eq!(filter.average(), 30.0);
    }

    #[test]
    fn window_larger_than_stream() {
        let mut filter = MovingAverageFilter::default();
        for value in [10.0, 20.0, 30.0] {
            filter.append(value);
        }
        assert_eq!(filter.window(), 10);
        assert_eq!(filter.average(), 20.0);
    }

    #[test]
    fn size_never_exceeds_window() {
        let window = 4;
        let mut filter = MovingAverageFilter::new(window);
        let values: Vec<f64> = (1..=25).map(|v| (v * v % 17) as f64).collect();

        for (n, value) in values.iter().enumerate() {
            filter.append(*value);
            assert!(filter.len() <= window);

            let held = &values[(n + 1).saturating_sub(window)..=n];
            let expected = held.iter().sum::<f64>() / held.len() as f64;
            assert!((filter.average() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_window_keeps_latest_sample() {
        let mut filter = MovingAverageFilter::new(0);
        filter.append(1.0);
        filter.append(7.5);
        assert_eq!(filter.window(), 1);
        assert_eq!(filter.average(), 7.5);
    }
}
