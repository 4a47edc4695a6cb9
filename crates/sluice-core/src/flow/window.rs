//! Sliding window of recent chunk sizes for one stream.
//!
//! The delivery server holds at most [`MAX_OUTSTANDING_CHUNKS`] unflushed frames
//! per connection and drops the client beyond that, regardless of their total
//! size. The window approximates the bytes those slots currently reserve.

use std::collections::VecDeque;

/// Delivery server limit on outstanding frames per connection.
pub const MAX_OUTSTANDING_CHUNKS: usize = 16;

/// Fixed-length queue of chunk sizes, oldest first. Always exactly
/// `MAX_OUTSTANDING_CHUNKS` entries; zero-padded at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkWindow {
    sizes: VecDeque<u64>,
}

impl Default for ChunkWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkWindow {
    pub fn new() -> Self {
        Self {
            sizes: std::iter::repeat(0).take(MAX_OUTSTANDING_CHUNKS).collect(),
        }
    }

    /// Records an admitted chunk, evicting the oldest entry.
    pub fn push(&mut self, size: u64) {
        self.sizes.pop_front();
        self.sizes.push_back(size);
    }

    pub fn oldest(&self) -> u64 {
        self.sizes.front().copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.sizes.iter().sum()
    }

    /// Bytes the server may still hold for this stream without exceeding its
    /// frame limit: everything in the window except the oldest slot, which is
    /// assumed drained.
    pub fn slot_budget(&self) -> u64 {
        self.total() - self.oldest()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.sizes.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_window_is_zero_filled() {
        let w = ChunkWindow::new();
        assert_eq!(w.len(), MAX_OUTSTANDING_CHUNKS);
        assert_eq!(w.total(), 0);
        assert_eq!(w.slot_budget(), 0);
    }

    #[test]
    fn push_keeps_length_and_evicts_oldest() {
        let mut w = ChunkWindow::new();
        for size in 1..=20u64 {
            w.push(size);
            assert_eq!(w.len(), MAX_OUTSTANDING_CHUNKS);
            assert_eq!(w.iter().last(), Some(size));
        }
        // 5..=20 remain.
        assert_eq!(w.oldest(), 5);
        assert_eq!(w.total(), (5..=20).sum::<u64>());
        assert_eq!(w.slot_budget(), (6..=20).sum::<u64>());
    }

    #[test]
    fn slot_budget_ignores_oldest_slot() {
        let mut w = ChunkWindow::new();
        w.push(5100);
        assert_eq!(w.slot_budget(), 5100);
        for _ in 0..15 {
            w.push(10);
        }
        // 5100 is now the oldest entry.
        assert_eq!(w.oldest(), 5100);
        assert_eq!(w.slot_budget(), 150);
    }
}
