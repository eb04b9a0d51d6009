//! Buffered shuffle over repeated passes of a dataset.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use frnn_core::Seed;

/// Default number of indices held in the shuffle buffer.
pub const SHUFFLE_BUFFER_SIZE: usize = 10_000;

/// Yields the indices `0..n`, `repeats` times over, each pass shuffled on its own.
///
/// Within a pass the buffer holds at most `buffer_size` pending indices.
/// Each step draws a uniformly random slot, emits it and refills the slot
/// from the next index of the pass. The buffer drains completely before the
/// next pass starts, so passes never mix: every block of `n` consecutive
/// outputs is a permutation of `0..n`. With a buffer of at least `n` that
/// permutation is uniform; smaller buffers bound memory and only
/// approximate it.
///
/// ```rust
/// use frnn_core::Seed;
/// use frnn_data::ShuffleRepeat;
///
/// let order: Vec<usize> = ShuffleRepeat::new(4, 2, 16, Seed::new(0)).collect();
/// assert_eq!(order.len(), 8);
/// ```
#[derive(Debug, Clone)]
pub struct ShuffleRepeat {
    rng: ChaCha8Rng,
    buffer: Vec<usize>,
    buffer_size: usize,
    n: usize,
    repeats: usize,
    pass: usize,
    next_index: usize,
    emitted: usize,
}

impl ShuffleRepeat {
    /// Create the stream for `repeats` passes over `n` indices.
    #[must_use]
    pub fn new(n: usize, repeats: usize, buffer_size: usize, seed: Seed) -> Self {
        let buffer_size = buffer_size.max(1);
        Self {
            rng: seed.to_rng(),
            buffer: Vec::with_capacity(buffer_size.min(n)),
            buffer_size,
            n,
            repeats,
            pass: 0,
            next_index: 0,
            emitted: 0,
        }
    }

    /// Number of indices this stream yields in total.
    #[must_use]
    pub fn total(&self) -> usize {
        self.n * self.repeats
    }

    fn pull_source(&mut self) -> Option<usize> {
        if self.next_index >= self.n {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;
        Some(index)
    }
}

impl Iterator for ShuffleRepeat {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.pass >= self.repeats {
                return None;
            }
            while self.buffer.len() < self.buffer_size {
                match self.pull_source() {
                    Some(index) => self.buffer.push(index),
                    None => break,
                }
            }
            if !self.buffer.is_empty() {
                break;
            }
            // Pass exhausted.
            self.pass += 1;
            self.next_index = 0;
        }

        let slot = self.rng.gen_range(0..self.buffer.len());
        let picked = match self.pull_source() {
            Some(refill) => std::mem::replace(&mut self.buffer[slot], refill),
            None => self.buffer.swap_remove(slot),
        };
        self.emitted += 1;
        Some(picked)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total() - self.emitted;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ShuffleRepeat {}
