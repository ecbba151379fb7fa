//! Signal filters
//!
//! Numeric primitives shared by every telemetry channel:
//! - [`median`]: order statistic of a burst of raw samples (in place, no allocation)
//! - [`SlidingFilter`]: fixed-window moving average over a ring buffer
//! - [`rate_limit`]: rejects a sample that jumps too far from the last accepted one
//!
//! The supervisor chains them as raw read -> median -> rate limit -> sliding
//! average, depending on the channel.

use libm::fabsf;

/// Middle order statistic of `values`, found by partial selection sort
///
/// Only the first `len / 2 + 1` positions are settled, which is all the
/// median needs. Swaps happen on strict `<` only, so equal samples keep their
/// index order and the result is deterministic. `values` is reordered in place.
///
/// Returns `None` for an empty slice.
pub fn median<T: PartialOrd + Copy>(values: &mut [T]) -> Option<T> {
    let size = values.len();
    if size == 0 {
        return None;
    }
    let mid = size / 2;
    for i in 0..=mid {
        for j in (i + 1)..size {
            if values[j] < values[i] {
                values.swap(i, j);
            }
        }
    }
    Some(values[mid])
}

/// Returns `previous` when `new` deviates from it by more than `threshold`
///
/// Used to keep single-sample spikes out of the voltage average.
pub fn rate_limit(new: f32, previous: f32, threshold: f32) -> f32 {
    if fabsf(new - previous) > threshold {
        previous
    } else {
        new
    }
}

/// Moving average over the most recent samples
///
/// `N` is the buffer capacity. The window defaults to `N` ([`SlidingFilter::add_sample`])
/// and may be narrowed per call with [`SlidingFilter::add_sample_windowed`].
#[derive(Debug, Clone)]
pub struct SlidingFilter<const N: usize> {
    buffer: [f32; N],
    sum: f32,
    index: usize,
    count: usize,
}

impl<const N: usize> SlidingFilter<N> {
    /// Creates an empty filter
    pub const fn new() -> Self {
        Self {
            buffer: [0.0; N],
            sum: 0.0,
            index: 0,
            count: 0,
        }
    }

    /// Adds a sample over the full capacity window and returns the new average
    pub fn add_sample(&mut self, sample: f32) -> f32 {
        self.add_sample_windowed(N, sample)
    }

    /// Adds a sample over a window of `window_size` samples and returns the new average
    ///
    /// Until the window is full the average covers every sample seen so far.
    /// After that the oldest sample is evicted from the running sum first.
    ///
    /// # Panics
    ///
    /// If `window_size` is zero or exceeds the capacity `N`. Changing the
    /// window between calls is the caller's responsibility.
    pub fn add_sample_windowed(&mut self, window_size: usize, sample: f32) -> f32 {
        assert!(
            window_size > 0 && window_size <= N,
            "sliding window exceeds filter capacity"
        );

        if self.count >= window_size {
            self.sum -= self.buffer[self.index];
        } else {
            self.count += 1;
        }

        self.buffer[self.index] = sample;
        self.sum += sample;
        self.index = (self.index + 1) % window_size;

        self.sum / self.count as f32
    }

    /// Current average, or `None` before the first sample
    pub fn average(&self) -> Option<f32> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f32)
        }
    }

    /// Number of samples currently inside the window
    pub fn len(&self) -> usize {
        self.count
    }

    /// True before the first sample
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Drops all samples
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl<const N: usize> Default for SlidingFilter<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn median_of_odd_burst() {
        let mut values = [9u32, 1, 7, 3, 5];
        assert_eq!(median(&mut values), Some(5));
    }

    #[test]
    fn median_of_even_burst_takes_upper_middle() {
        let mut values = [4u32, 1, 3, 2];
        assert_eq!(median(&mut values), Some(3));
    }

    #[test]
    fn median_ignores_outliers() {
        let mut values = [2000u16; 100];
        values[3] = 0;
        values[40] = 4095;
        values[77] = 4095;
        assert_eq!(median(&mut values), Some(2000));
    }

    #[test]
    fn median_of_empty_slice() {
        let mut values: [u16; 0] = [];
        assert_eq!(median(&mut values), None);
    }

    #[test]
    fn median_of_single_sample() {
        let mut values = [42.5f32];
        assert_eq!(median(&mut values), Some(42.5));
    }

    #[test]
    fn sliding_average_before_window_fills() {
        let mut filter = SlidingFilter::<8>::new();
        let samples = [1.0, 2.0, 3.0, 6.0];
        let mut last = 0.0;
        for (i, sample) in samples.iter().enumerate() {
            last = filter.add_sample(*sample);
            let expected: f32 = samples[..=i].iter().sum::<f32>() / (i + 1) as f32;
            assert!(close(last, expected));
        }
        assert!(close(last, 3.0));
        assert_eq!(filter.len(), 4);
    }

    #[test]
    fn sliding_average_evicts_oldest() {
        let mut filter = SlidingFilter::<4>::new();
        for sample in [10.0, 20.0, 30.0, 40.0] {
            filter.add_sample(sample);
        }
        // 10.0 drops out, 50.0 comes in
        let avg = filter.add_sample(50.0);
        assert!(close(avg, 35.0));
        assert_eq!(filter.len(), 4);
    }

    #[test]
    fn narrower_window_inside_capacity() {
        let mut filter = SlidingFilter::<20>::new();
        for sample in [1.0, 1.0, 1.0] {
            filter.add_sample_windowed(3, sample);
        }
        let avg = filter.add_sample_windowed(3, 4.0);
        assert!(close(avg, 2.0));
    }

    #[test]
    #[should_panic]
    fn window_beyond_capacity_panics() {
        let mut filter = SlidingFilter::<4>::new();
        filter.add_sample_windowed(5, 1.0);
    }

    #[test]
    fn average_and_reset() {
        let mut filter = SlidingFilter::<4>::new();
        assert!(filter.is_empty());
        assert_eq!(filter.average(), None);
        filter.add_sample(2.0);
        assert_eq!(filter.average(), Some(2.0));
        filter.reset();
        assert!(filter.is_empty());
    }

    #[test]
    fn rate_limit_rejects_spike() {
        assert_eq!(rate_limit(12.0, 11.0, 0.6), 11.0);
        assert_eq!(rate_limit(10.0, 11.0, 0.6), 11.0);
    }

    #[test]
    fn rate_limit_accepts_small_step() {
        assert_eq!(rate_limit(11.5, 11.0, 0.6), 11.5);
        // exactly on the threshold still passes
        assert_eq!(rate_limit(11.5, 11.0, 0.5), 11.5);
    }

    #[test]
    fn rate_limit_is_idempotent_on_equal_values() {
        assert_eq!(rate_limit(11.1, 11.1, 0.0), 11.1);
        assert_eq!(rate_limit(11.1, 11.1, 0.6), 11.1);
    }
}
