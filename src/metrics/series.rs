use super::MetricSample;

/// Fixed-capacity ring of samples for one queue.
///
/// Slots are allocated once; when full, `head` points at the oldest sample
/// and the next append overwrites it. Logical index 0 is always the oldest.
#[derive(Debug, Clone)]
pub struct MetricSeries {
    slots: Vec<MetricSample>,
    head: usize,
    capacity: usize,
}

impl MetricSeries {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn get(&self, index: usize) -> &MetricSample {
        &self.slots[(self.head + index) % self.slots.len()]
    }

    pub fn latest(&self) -> Option<&MetricSample> {
        if self.slots.is_empty() {
            None
        } else {
            Some(self.get(self.slots.len() - 1))
        }
    }

    /// Appends, evicting the oldest sample when full. Rejects a sample older
    /// than the newest one so the series stays sorted.
    pub fn push(&mut self, sample: MetricSample) -> bool {
        if let Some(last) = self.latest() {
            if sample.timestamp < last.timestamp {
                return false;
            }
        }

        if self.slots.len() < self.capacity {
            self.slots.push(sample);
        } else {
            self.slots[self.head] = sample;
            self.head = (self.head + 1) % self.capacity;
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSample> + '_ {
        (0..self.slots.len()).map(move |i| self.get(i))
    }

    /// First logical index whose timestamp is >= `ts`.
    fn lower_bound(&self, ts: u64) -> usize {
        let (mut lo, mut hi) = (0, self.slots.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.get(mid).timestamp < ts {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Samples with `from <= timestamp <= to`, oldest first.
    pub fn range(&self, from: u64, to: u64) -> Vec<MetricSample> {
        if from > to || self.slots.is_empty() {
            return Vec::new();
        }
        let start = self.lower_bound(from);
        let end = match to.checked_add(1) {
            Some(next) => self.lower_bound(next),
            None => self.slots.len(),
        };
        (start..end).map(|i| self.get(i).clone()).collect()
    }

    pub fn to_vec(&self) -> Vec<MetricSample> {
        self.iter().cloned().collect()
    }
}
