// Deterministic, portable pseudo-random number generator.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// Hand-rolled so that the output stream is identical on every platform and
// never changes underneath us with a dependency bump.
//
// A settlement run owns exactly one `SiteRng`. The partitioner, the builder
// auction and the builder policies all draw from it, in a fixed order, so a
// fixed seed yields a fixed layout. On top of the raw generator this crate
// provides the few sampling primitives the generator needs: bounded integer
// ranges, Bernoulli draws, Fisher-Yates shuffling and a cumulative
// distribution sampler for weighted choices.
//
// **Critical constraint: determinism.** Every method must produce identical
// output given the same prior state, regardless of platform or optimization
// level. Each sampling method documents exactly how many draws it consumes;
// callers rely on that to keep seeded runs reproducible.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ PRNG, the single source of randomness for a generation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteRng {
    s: [u64; 4],
}

impl SiteRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
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

    /// Generate the next `u64` in the sequence.
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

    /// Upper 32 bits of the next `u64`.
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Generate a uniform `f64` in [0, 1) from the upper 53 bits of a `u64`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Uses rejection sampling to avoid modulo bias, so the number of raw
    /// draws is one in the common case and unbounded in theory.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range; // = (2^64 - range) % range
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Generate a uniform random `usize` in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Generate a uniform random `i32` in `[low, high]` (inclusive on both ends).
    ///
    /// Panics if `low > high`.
    pub fn range_i32_inclusive(&mut self, low: i32, high: i32) -> i32 {
        assert!(low <= high, "range_i32_inclusive: low must be <= high");
        let span = (high as i64 - low as i64) as u64 + 1;
        (low as i64 + self.range_u64(0, span) as i64) as i32
    }

    /// Return `true` with probability `p`. Always consumes one draw.
    ///
    /// `p <= 0.0` always returns false, `p >= 1.0` always returns true.
    pub fn random_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Shuffle a slice in place (Fisher-Yates, walking from the back).
    ///
    /// Consumes one `range_usize` draw per position `len - 1 ..= 1`; a
    /// two-element slice costs exactly one draw.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.range_usize(0, i + 1);
            items.swap(i, j);
        }
    }

    /// Pick a uniformly random element. `None` (no draw) for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let i = self.range_usize(0, items.len());
        items.get(i)
    }

    /// Draw an index with probability proportional to its weight.
    ///
    /// Weights are normalized by their total into a single probability
    /// vector and walked as a cumulative distribution against exactly one
    /// `next_f64` draw. Negative and non-finite weights count as zero and
    /// can never be returned. When the total is not positive, returns `None`
    /// without consuming any randomness.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().map(|&w| usable_weight(w)).sum();
        if total <= 0.0 {
            return None;
        }

        let draw = self.next_f64();
        let mut cumulative = 0.0;
        let mut last_positive = None;
        for (i, &w) in weights.iter().enumerate() {
            let w = usable_weight(w);
            if w <= 0.0 {
                continue;
            }
            cumulative += w / total;
            last_positive = Some(i);
            if draw < cumulative {
                return Some(i);
            }
        }
        // Rounding can leave the final cumulative value a hair below 1.0.
        last_positive
    }
}

fn usable_weight(w: f64) -> f64 {
    if w.is_finite() && w > 0.0 { w } else { 0.0 }
}

/// SplitMix64, used only for seeding xoshiro256++ from a single `u64`.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
