use super::RawSample;

/// Fixed-capacity ring buffer of raw samples
///
/// Samples are only addressable by age: index 0 is the most recent insertion,
/// index 1 the one before it, and so on. Once the buffer is full each push
/// overwrites the oldest sample.
///
/// ## Memory Usage
///
/// `N × 12` bytes, allocated inline. With the default capacity of 200 the
/// history takes 2.4 KB.
pub struct SampleStore<const N: usize> {
    /// Sample slots, written in a circle
    samples: [RawSample; N],
    /// Slot holding the most recent sample
    head: usize,
    /// Number of live samples, never more than `N`
    count: usize,
}

impl<const N: usize> SampleStore<N> {
    /// Create an empty store
    pub const fn new() -> Self {
        const { assert!(N > 0, "SampleStore capacity must be non-zero") };

        Self {
            samples: [RawSample::INVALID; N],
            head: N - 1,
            count: 0,
        }
    }

    /// Append a sample, overwriting the oldest one when full
    pub fn push(&mut self, sample: RawSample) {
        self.head = (self.head + 1) % N;
        self.samples[self.head] = sample;
        if self.count < N {
            self.count += 1;
        }
    }

    /// Get the sample `age` insertions older than the most recent one
    ///
    /// Returns [`RawSample::INVALID`] when fewer than `age + 1` samples have
    /// been stored. That is "no data yet", not an error.
    pub fn get(&self, age: usize) -> RawSample {
        if age >= self.count {
            return RawSample::INVALID;
        }
        let pos = (self.head + N - age) % N;
        self.samples[pos]
    }

    /// Number of live samples
    pub const fn len(&self) -> usize {
        self.count
    }

    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Iterate over live samples, newest first
    pub fn recent(&self) -> impl Iterator<Item = RawSample> + '_ {
        (0..self.count).map(|age| self.get(age))
    }
}

impl<const N: usize> Default for SampleStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store_returns_sentinel() {
        let store = SampleStore::<4>::new();

        assert!(store.is_empty());
        assert_eq!(store.get(0), RawSample::INVALID);
        assert!(!store.get(0).valid);
    }

    #[test]
    fn test_get_is_indexed_from_newest() {
        let mut store = SampleStore::<4>::new();
        store.push(RawSample::new(1, 10));
        store.push(RawSample::new(2, 20));
        store.push(RawSample::new(3, 30));

        assert_eq!(store.len(), 3);
        assert_eq!(store.get(0).pulses, 3);
        assert_eq!(store.get(1).pulses, 2);
        assert_eq!(store.get(2).pulses, 1);
        assert!(!store.get(3).valid, "age beyond live count must be invalid");
    }

    #[test]
    fn test_overwrites_oldest_when_full() {
        const C: usize = 5;
        const K: u32 = 3;
        let mut store = SampleStore::<C>::new();

        for i in 0..(C as u32 + K) {
            store.push(RawSample::new(i, 0));
        }

        assert_eq!(store.len(), C, "live count is capped at capacity");
        assert_eq!(store.get(0).pulses, C as u32 + K - 1);
        assert_eq!(store.get(C - 1).pulses, K, "oldest surviving sample");
        assert_eq!(store.get(C), RawSample::INVALID);
        assert_eq!(store.get(usize::MAX), RawSample::INVALID);
    }

    #[test]
    fn test_recent_iterates_newest_first() {
        let mut store = SampleStore::<3>::new();
        for i in 1..=4 {
            store.push(RawSample::new(i, 0));
        }

        let mut recent = store.recent();
        assert_eq!(recent.next().map(|s| s.pulses), Some(4));
        assert_eq!(recent.next().map(|s| s.pulses), Some(3));
        assert_eq!(recent.next().map(|s| s.pulses), Some(2));
        assert_eq!(recent.next(), None);
    }

    #[test]
    fn test_capacity_one() {
        let mut store = SampleStore::<1>::new();
        store.push(RawSample::new(7, 90));
        store.push(RawSample::new(8, 180));

        assert_eq!(store.capacity(), 1);
        assert_eq!(store.get(0), RawSample::new(8, 180));
        assert!(!store.get(1).valid);
    }
}
