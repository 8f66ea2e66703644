/// Bytes read from the link that have not been turned into frames yet.
///
/// Consumed bytes are skipped by moving `head` forward; the backing vector is
/// compacted once the dead prefix dominates, so dropping from the front stays
/// cheap during resync.
#[derive(Debug, Default)]
pub struct ByteAccumulator {
    bytes: Vec<u8>,
    head: usize,
}
const COMPACT_THRESHOLD: usize = 4096;
impl ByteAccumulator {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn append(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }
    pub fn len(&self) -> usize {
        self.bytes.len() - self.head
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// All pending bytes, oldest first.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[self.head..]
    }
    /// Up to `n` pending bytes without consuming them.
    pub fn peek_prefix(&self, n: usize) -> &[u8] {
        let pending = self.as_slice();
        &pending[..n.min(pending.len())]
    }
    /// Offset of the first occurrence of `pattern`, if any.
    pub fn find(&self, pattern: &[u8]) -> Option<usize> {
        if pattern.is_empty() {
            return Some(0);
        }
        self.as_slice()
            .windows(pattern.len())
            .position(|window| window == pattern)
    }
    /// Discards up to `n` bytes from the front; returns how many were dropped.
    pub fn drop_front(&mut self, n: usize) -> usize {
        let dropped = n.min(self.len());
        self.head += dropped;
        if self.head == self.bytes.len() {
            self.bytes.clear();
            self.head = 0;
        } else if self.head >= COMPACT_THRESHOLD && self.head * 2 >= self.bytes.len() {
            self.bytes.drain(..self.head);
            self.head = 0;
        }
        dropped
    }
    /// Removes and returns up to `n` bytes from the front.
    pub fn take_front(&mut self, n: usize) -> Vec<u8> {
        let taken = self.peek_prefix(n).to_vec();
        self.drop_front(taken.len());
        taken
    }
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.head = 0;
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn drop_and_take_consume_from_front() {
        let mut acc = ByteAccumulator::new();
        acc.append(&[1, 2, 3, 4, 5]);
        assert_eq!(acc.drop_front(2), 2);
        assert_eq!(acc.peek_prefix(2), &[3, 4]);
        assert_eq!(acc.take_front(2), vec![3, 4]);
        assert_eq!(acc.as_slice(), &[5]);
        assert_eq!(acc.drop_front(10), 1);
        assert!(acc.is_empty());
    }
    #[test]
    fn find_locates_pattern_after_head() {
        let mut acc = ByteAccumulator::new();
        acc.append(&[0xA5, 0x5A, 0x00, 0xA5, 0x5A]);
        assert_eq!(acc.find(&[0xA5, 0x5A]), Some(0));
        acc.drop_front(1);
        assert_eq!(acc.find(&[0xA5, 0x5A]), Some(2));
        assert_eq!(acc.find(&[0x11]), None);
    }
    #[test]
    fn compaction_preserves_pending_bytes() {
        let mut acc = ByteAccumulator::new();
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        acc.append(&data);
        acc.drop_front(6_000);
        assert_eq!(acc.len(), 4_000);
        assert_eq!(acc.as_slice(), &data[6_000..]);
        acc.append(&[7, 7]);
        assert_eq!(acc.len(), 4_002);
        assert_eq!(&acc.as_slice()[4_000..], &[7, 7]);
    }
}
