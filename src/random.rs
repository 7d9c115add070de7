//! Seeded, reproducible pseudo-random generator (PCG-XSH-RR).
//!
//! The generator runs two permuted congruential streams with decorrelated increments
//! derived from one stream id. 32-bit draws come from the first stream, and 64-bit
//! draws combine the first stream (low half) and the second stream (high half).
//!
//! A process-wide default instance is used by the top-level random functions. It is
//! guarded by a mutex, while generators created with [`SeededRng::new`] are plain
//! values that need no locking.

use parking_lot::{const_mutex, Mutex};
use rand::RngCore;

/// Seed of the process-wide default generator at startup.
pub const DEFAULT_SEED: u64 = 42;

/// Stream id of the process-wide default generator.
pub const DEFAULT_STREAM: u64 = 54;

const MULTIPLIER: u64 = 6364136223846793005;
const STREAM_XOR: u64 = 0xAAAA_AAAA;

const FLOAT_SCALE: f32 = 1.0 / (1u32 << 24) as f32;
const DOUBLE_SCALE: f64 = 1.0 / (1u64 << 53) as f64;

static DEFAULT_RNG: Mutex<SeededRng> = const_mutex(SeededRng::new(DEFAULT_SEED, DEFAULT_STREAM));

/// Seeded pseudo-random generator with uniform and gaussian deviates.
#[derive(Clone, Debug, PartialEq)]
pub struct SeededRng {
    state1: u64,
    state2: u64,
    inc1: u64,
    inc2: u64,
    stream: u64,
    gaussian: f64,
    has_gaussian: bool,
}

impl SeededRng {
    /// Creates a generator with the given seed and stream id.
    ///
    /// Generators with equal seed and stream id produce identical sequences.
    pub const fn new(seed: u64, stream: u64) -> Self {
        let inc1 = (stream << 1) | 1;
        let inc2 = inc1 ^ STREAM_XOR;

        Self {
            state1: seeded(seed, inc1),
            state2: seeded(seed, inc2),
            inc1,
            inc2,
            stream,
            gaussian: 0.0,
            has_gaussian: false,
        }
    }

    /// Returns the stream id of the generator.
    pub fn stream(&self) -> u64 {
        self.stream
    }

    /// Reseeds the generator and discards any cached gaussian sample.
    pub fn set_seed(&mut self, seed: u64) {
        self.state1 = seeded(seed, self.inc1);
        self.state2 = seeded(seed, self.inc2);
        self.has_gaussian = false;
    }

    /// Returns a uniformly distributed 32-bit value.
    pub fn next_u32(&mut self) -> u32 {
        let old = self.state1;

        self.state1 = advance(old, self.inc1);

        output(old)
    }

    /// Returns a uniformly distributed 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        let low = self.next_u32();
        let old = self.state2;

        self.state2 = advance(old, self.inc2);

        ((output(old) as u64) << 32) | low as u64
    }

    /// Returns a uniformly distributed `i32` over its whole range.
    pub fn next_i32(&mut self) -> i32 {
        self.next_u32() as i32
    }

    /// Returns a uniformly distributed `i64` over its whole range.
    pub fn next_i64(&mut self) -> i64 {
        self.next_u64() as i64
    }

    /// Returns a uniformly distributed value in `[0, bound)` without modulo bias.
    ///
    /// # Panics
    ///
    /// Panics if the bound is zero.
    pub fn next_u32_below(&mut self, bound: u32) -> u32 {
        assert!(bound > 0, "bound must be positive");

        let threshold = bound.wrapping_neg() % bound;

        loop {
            let r = self.next_u32();

            if r >= threshold {
                return r % bound;
            }
        }
    }

    /// Returns a uniformly distributed value in `[0, bound)` without modulo bias.
    ///
    /// # Panics
    ///
    /// Panics if the bound is zero.
    pub fn next_u64_below(&mut self, bound: u64) -> u64 {
        assert!(bound > 0, "bound must be positive");

        let threshold = bound.wrapping_neg() % bound;

        loop {
            let r = self.next_u64();

            if r >= threshold {
                return r % bound;
            }
        }
    }

    /// Returns a uniformly distributed `f32` in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * FLOAT_SCALE
    }

    /// Returns a uniformly distributed `f64` in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * DOUBLE_SCALE
    }

    /// Returns a standard normal deviate.
    ///
    /// Samples are generated in pairs with the polar Box-Muller method. The second
    /// sample of a pair is cached and returned by the next call.
    pub fn next_gaussian(&mut self) -> f64 {
        if self.has_gaussian {
            self.has_gaussian = false;

            return self.gaussian;
        }

        loop {
            let x = 2.0 * self.next_f64() - 1.0;
            let y = 2.0 * self.next_f64() - 1.0;
            let r2 = x * x + y * y;

            if r2 > 0.0 && r2 < 1.0 {
                let multiplier = (-2.0 * r2.ln() / r2).sqrt();

                self.gaussian = y * multiplier;
                self.has_gaussian = true;

                return x * multiplier;
            }
        }
    }
}

impl Default for SeededRng {
    fn default() -> Self {
        Self::new(DEFAULT_SEED, DEFAULT_STREAM)
    }
}

impl RngCore for SeededRng {
    fn next_u32(&mut self) -> u32 {
        SeededRng::next_u32(self)
    }

    fn next_u64(&mut self) -> u64 {
        SeededRng::next_u64(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = SeededRng::next_u64(self).to_le_bytes();

            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);

        Ok(())
    }
}

/// Reseeds the process-wide default generator.
pub fn set_seed(seed: u64) {
    log::debug!("reseeding default generator with {seed}");

    DEFAULT_RNG.lock().set_seed(seed);
}

/// Calls the function with exclusive access to the process-wide default generator.
///
/// The generator stays locked for the duration of the call, so the function must not
/// call back into the default generator.
pub fn with_default_rng<T, F: FnOnce(&mut SeededRng) -> T>(f: F) -> T {
    f(&mut DEFAULT_RNG.lock())
}

/// Replaces the process-wide default generator.
pub fn set_default_rng(rng: SeededRng) {
    log::debug!("replacing default generator with stream {}", rng.stream());

    *DEFAULT_RNG.lock() = rng;
}

/// Restores the process-wide default generator to its startup state.
pub fn reset_default_rng() {
    *DEFAULT_RNG.lock() = SeededRng::default();
}

const fn advance(state: u64, inc: u64) -> u64 {
    state.wrapping_mul(MULTIPLIER).wrapping_add(inc)
}

const fn output(state: u64) -> u32 {
    let rot = (state >> 59) as u32;
    let xorshifted = (((state >> 18) ^ state) >> 27) as u32;

    xorshifted.rotate_right(rot)
}

// Zero the state, advance once, add the seed and advance again.
const fn seeded(seed: u64, inc: u64) -> u64 {
    advance(advance(0, inc).wrapping_add(seed), inc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_stream_matches_reference_pcg32() {
        let mut rng = SeededRng::new(42, 54);
        let draws = (0..6).map(|_| rng.next_u32()).collect::<Vec<_>>();

        assert_eq!(draws, [0xa15c02b7, 0x7b47f409, 0xba1d3330, 0x83d2f293, 0xbfa4784b, 0xcbed606e]);
    }

    #[test]
    fn wide_draws_combine_both_streams() {
        let mut rng = SeededRng::new(42, 54);

        assert_eq!(rng.next_u64(), 0xd26341c3a15c02b7);
        assert_eq!(rng.next_u64(), 0x30e043c37b47f409);
        assert_eq!(rng.next_u64(), 0xd8073fa8ba1d3330);
    }

    #[test]
    fn reseed_discards_cached_gaussian() {
        let mut a = SeededRng::new(7, 1);
        let mut b = SeededRng::new(7, 1);

        _ = a.next_gaussian();
        a.set_seed(7);

        assert!(!a.has_gaussian);
        assert_eq!(a.next_gaussian(), b.next_gaussian());
        assert_eq!(a.next_gaussian(), b.next_gaussian());
    }

    #[test]
    fn streams_are_decorrelated() {
        let rng = SeededRng::new(0, 3);

        assert_eq!(rng.inc1, 7);
        assert_eq!(rng.inc2, 7 ^ 0xAAAA_AAAA);
        assert_ne!(rng.state1, rng.state2);
    }
}
