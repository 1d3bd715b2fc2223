//! Ring buffer for rolling averages

#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    samples: Vec<T>,
    capacity: usize,
    index: usize,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            index: 0,
        }
    }

    /// Push a sample, overwriting the oldest one once the buffer is full.
    pub fn push(&mut self, sample: T) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.index] = sample;
        }
        self.index = (self.index + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let split = if self.samples.len() < self.capacity {
            0
        } else {
            self.index
        };
        let (newer, older) = self.samples.split_at(split);
        older.iter().chain(newer.iter())
    }

    pub fn latest(&self) -> Option<&T> {
        if self.samples.is_empty() {
            return None;
        }
        let last = (self.index + self.capacity - 1) % self.capacity;
        self.samples.get(last)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.index = 0;
    }
}

impl RingBuffer<f64> {
    /// Arithmetic mean, or `None` when no samples were pushed yet.
    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }

        let sum: f64 = self.samples.iter().sum();
        Some(sum / self.samples.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer() {
        let mut buffer = RingBuffer::new(3);

        buffer.push(10.0);
        assert_eq!(buffer.average(), Some(10.0));

        buffer.push(20.0);
        assert_eq!(buffer.average(), Some(15.0));

        buffer.push(30.0);
        assert_eq!(buffer.average(), Some(20.0));

        // Should wrap around
        buffer.push(40.0);
        assert_eq!(buffer.average(), Some(30.0)); // (20 + 30 + 40) / 3
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_iter_oldest_first() {
        let mut buffer = RingBuffer::new(3);
        for v in 1..=5 {
            buffer.push(v);
        }
        let order: Vec<i32> = buffer.iter().copied().collect();
        assert_eq!(order, vec![3, 4, 5]);
        assert_eq!(buffer.latest(), Some(&5));
    }

    #[test]
    fn test_empty_average() {
        let buffer = RingBuffer::<f64>::new(4);
        assert!(buffer.is_empty());
        assert_eq!(buffer.average(), None);
        assert_eq!(buffer.latest(), None);
    }

    #[test]
    fn test_zero_capacity_ignores_pushes() {
        let mut buffer = RingBuffer::new(0);
        buffer.push(1.0);
        assert!(buffer.is_empty());
    }
}
