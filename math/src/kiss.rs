//! Marsaglia KISS generator with a 4-word state.
//!
//! The generator combines a linear congruential step, a 3-shift xorshift and a
//! multiply-with-carry step. Its entire state is the 4-word seed, which is
//! persisted alongside the source table so that a resumed run continues the
//! exact sequence it left off.

use rand::{Error, RngCore};

/// Multiplier of the multiply-with-carry component.
const MWC_MULTIPLIER: u64 = 4_294_584_393;

/// Carries are reduced modulo this value when a seed is validated.
const CARRY_MODULUS: u32 = 698_769_068;

/// Substitute for a zero xorshift word (which would lock that component at zero).
const XORSHIFT_FALLBACK: u32 = 13_031_301;

/// KISS generator state: `[lcg, xorshift, mwc, carry]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Kiss64 {
    state: [u32; 4],
}

impl Kiss64 {
    /// Seed used when none is configured.
    pub const DEFAULT_SEED: [u32; 4] = [123_456_789, 234_567_891, 345_678_912, 456_789_123];

    /// Creates a generator from raw state without validation.
    ///
    /// Use this to continue a sequence from persisted state.
    pub const fn from_state(state: [u32; 4]) -> Self {
        Self { state }
    }

    /// Creates a generator from a user-provided seed, repairing words that
    /// would degrade the sequence.
    pub fn from_seed(seed: [u32; 4]) -> Self {
        Self {
            state: Self::validate(seed),
        }
    }

    /// Repairs a seed: the xorshift word must be non-zero and the carry must
    /// lie in `[1, 698769068]`.
    pub fn validate(mut seed: [u32; 4]) -> [u32; 4] {
        if seed[1] == 0 {
            seed[1] = XORSHIFT_FALLBACK;
        }
        seed[3] = seed[3] % CARRY_MODULUS + 1;
        seed
    }

    /// Returns the current state (suitable for [Kiss64::from_state]).
    pub fn state(&self) -> [u32; 4] {
        self.state
    }

    #[inline]
    fn step(&mut self) -> u32 {
        let [x, y, z, c] = &mut self.state;
        *x = x.wrapping_mul(314_527_869).wrapping_add(1_234_567);
        *y ^= *y << 5;
        *y ^= *y >> 7;
        *y ^= *y << 22;
        let t = MWC_MULTIPLIER * u64::from(*z) + u64::from(*c);
        *c = (t >> 32) as u32;
        *z = t as u32;
        x.wrapping_add(*y).wrapping_add(*z)
    }
}

impl Default for Kiss64 {
    fn default() -> Self {
        Self::from_seed(Self::DEFAULT_SEED)
    }
}

impl RngCore for Kiss64 {
    fn next_u32(&mut self) -> u32 {
        self.step()
    }

    fn next_u64(&mut self) -> u64 {
        let high = u64::from(self.step());
        let low = u64::from(self.step());
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let word = self.step().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
