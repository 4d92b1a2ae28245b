//! Random variates drawn with integer arithmetic only.
//!
//! Every variate consumes 32-bit words from any [RngCore], so a generator
//! restored from persisted state replays the same draws.

use crate::{Accum, UFract};
use rand::RngCore;

/// Largest integer part an exponential variate can carry in an [Accum].
const MAX_EXPONENTIAL_WHOLE: u32 = (1 << (31 - Accum::FRACTIONAL_BITS)) - 1;

/// Shift reducing a 32-bit uniform word to the 15 fractional bits of an [Accum].
const FRACTION_SHIFT: u32 = 32 - Accum::FRACTIONAL_BITS;

/// Number of uniforms summed by [gaussian] (their variance sums to exactly one).
const GAUSSIAN_TERMS: i32 = 12;

/// Draws a uniform fraction in `[0, 1)`.
#[inline]
pub fn uniform<R: RngCore + ?Sized>(rng: &mut R) -> UFract {
    UFract::from_bits(rng.next_u32())
}

/// Draws an exponential variate with unit mean.
///
/// Uses von Neumann's comparison method: a candidate fraction `u0` is accepted
/// when the run of strictly descending uniforms that follows it has even
/// length (which happens with probability `exp(-u0)`); each rejection adds one
/// to the integer part.
pub fn exponential<R: RngCore + ?Sized>(rng: &mut R) -> Accum {
    let mut whole = 0u32;
    loop {
        let candidate = rng.next_u32();
        let mut previous = candidate;
        let mut run = 0u32;
        loop {
            let next = rng.next_u32();
            if next >= previous {
                break;
            }
            previous = next;
            run += 1;
        }
        if run % 2 == 0 {
            let bits = (whole << Accum::FRACTIONAL_BITS) | (candidate >> FRACTION_SHIFT);
            return Accum::from_bits(bits as i32);
        }
        whole = (whole + 1).min(MAX_EXPONENTIAL_WHOLE);
    }
}

/// Draws a Poisson count given `exp(-lambda)`, the probability of zero events.
///
/// Multiplies uniforms until the running product falls to or below
/// `exp_minus_lambda`; the number of extra factors is the count. Callers
/// should skip the draw when `exp_minus_lambda` is zero.
pub fn poisson<R: RngCore + ?Sized>(rng: &mut R, exp_minus_lambda: UFract) -> u32 {
    let mut count = 0;
    let mut product = UFract::MAX;
    loop {
        product = product.product(uniform(rng));
        if product <= exp_minus_lambda {
            return count;
        }
        count += 1;
    }
}

/// Draws an approximately standard normal variate.
///
/// Sums twelve uniforms (each with variance 1/12) and subtracts their mean,
/// which yields unit variance and a support of `[-6, 6)`.
pub fn gaussian<R: RngCore + ?Sized>(rng: &mut R) -> Accum {
    let mut sum = 0i32;
    for _ in 0..GAUSSIAN_TERMS {
        sum += (rng.next_u32() >> FRACTION_SHIFT) as i32;
    }
    Accum::from_bits(sum - (GAUSSIAN_TERMS / 2) * Accum::ONE.to_bits())
}
