// Seeded PRNG for tile colour generation.
//
// xoshiro256++ (Blackman & Vigna) expanded from a single `u64` seed with
// SplitMix64. The puzzle core draws every colour from one of these: fresh
// tile colours on build, the colour a leaf regrows with after a shuffle
// removal, and the recolouring of combo and power-up sweeps.
//
// A level replayed with the same seed and the same sequence of player
// removals must produce the same colours, so tests can assert exact boards.
// Nothing here touches OS entropy or floating point in the generator core.

use serde::{Deserialize, Serialize};

/// xoshiro256++ generator state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRng {
    s: [u64; 4],
}

impl GameRng {
    /// Seed a generator. Equal seeds give equal streams.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Next raw `u64` in the stream.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Uniform integer in `[low, high)` without modulo bias.
    ///
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let span = high - low;
        if span.is_power_of_two() {
            return low + (self.next_u64() & (span - 1));
        }
        let threshold = span.wrapping_neg() % span;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % span);
            }
        }
    }

    /// Uniform `usize` in `[low, high)`. Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Pick one element uniformly. `None` for an empty slice.
    pub fn choose<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            return None;
        }
        Some(items[self.range_usize(0, items.len())])
    }

    /// Pick one element uniformly, never returning `exclude` when any other
    /// element is available. Used when a regrown tile should not repeat the
    /// colour it replaces.
    pub fn choose_except<T: Copy + PartialEq>(&mut self, items: &[T], exclude: T) -> Option<T> {
        let others = items.iter().filter(|&&item| item != exclude).count();
        if others == 0 {
            return self.choose(items);
        }
        let mut nth = self.range_usize(0, others);
        for &item in items {
            if item == exclude {
                continue;
            }
            if nth == 0 {
                return Some(item);
            }
            nth -= 1;
        }
        None
    }
}

/// SplitMix64 step, used only to expand the seed.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
