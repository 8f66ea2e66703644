use std::collections::VecDeque;
/// Fixed-capacity FIFO of voltage samples for one channel.
#[derive(Clone, Debug)]
pub struct ChannelRingBuffer {
    samples: VecDeque<f32>,
    capacity: usize,
}
impl ChannelRingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn push(&mut self, sample: f32) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }
    pub fn push_many(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.push(sample);
        }
    }
    pub fn clear(&mut self) {
        self.samples.clear();
    }
    /// Borrowed view in insertion order, oldest first.
    pub fn as_view(&self) -> RingView<'_> {
        let (head, tail) = self.samples.as_slices();
        RingView { head, tail }
    }
}
/// Read-only window over a ring buffer's two contiguous halves.
#[derive(Clone, Copy, Debug)]
pub struct RingView<'a> {
    head: &'a [f32],
    tail: &'a [f32],
}
impl<'a> RingView<'a> {
    pub fn len(&self) -> usize {
        self.head.len() + self.tail.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn iter(&self) -> impl Iterator<Item = f32> + 'a {
        self.head.iter().chain(self.tail.iter()).copied()
    }
    pub fn to_vec(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(self.head);
        out.extend_from_slice(self.tail);
        out
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn overflow_keeps_most_recent_in_order() {
        let mut buffer = ChannelRingBuffer::with_capacity(50);
        let input: Vec<f32> = (0..137).map(|i| i as f32).collect();
        buffer.push_many(&input);
        assert_eq!(buffer.len(), 50);
        assert_eq!(buffer.as_view().to_vec(), input[87..].to_vec());
    }
    #[test]
    fn view_spans_wrapped_storage() {
        let mut buffer = ChannelRingBuffer::with_capacity(4);
        for i in 0..6 {
            buffer.push(i as f32);
        }
        let view = buffer.as_view();
        assert_eq!(view.len(), 4);
        assert_eq!(view.iter().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0, 5.0]);
    }
    #[test]
    fn clear_empties_immediately() {
        let mut buffer = ChannelRingBuffer::with_capacity(3);
        buffer.push_many(&[1.0, 2.0]);
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.as_view().is_empty());
        assert_eq!(buffer.capacity(), 3);
    }
    #[test]
    fn zero_capacity_stores_nothing() {
        let mut buffer = ChannelRingBuffer::with_capacity(0);
        buffer.push(1.0);
        assert!(buffer.is_empty());
    }
}
