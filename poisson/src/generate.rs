//! Per-tick event counts for each regime.

use crate::params::Regime;
use neurocore_math::{variate, Accum};
use rand::RngCore;

/// Phase units in one tick.
pub const PHASE_SCALE: u32 = 1000;

/// Draws the countdown (in thousandths of a tick) to the next event of a slow
/// source with the given mean gap.
pub fn initial_phase<R: RngCore + ?Sized>(rng: &mut R, mean_isi_ticks: u32) -> u32 {
    variate::exponential(rng)
        .scale_round(PHASE_SCALE)
        .saturating_mul(mean_isi_ticks)
}

/// Returns the number of events `regime` produces this tick, advancing any
/// per-source state.
pub fn events<R: RngCore + ?Sized>(regime: &mut Regime, rng: &mut R) -> u32 {
    match regime {
        Regime::Slow {
            mean_isi_ticks,
            phase,
        } => {
            if *mean_isi_ticks == 0 {
                return 0;
            }
            let mut count = 0;
            while *phase < PHASE_SCALE {
                count += 1;
                *phase = phase.saturating_add(initial_phase(rng, *mean_isi_ticks));
            }
            *phase -= PHASE_SCALE;
            count
        }
        Regime::Fast { exp_minus_lambda } => {
            if exp_minus_lambda.is_zero() {
                return 0;
            }
            variate::poisson(rng, *exp_minus_lambda)
        }
        Regime::Faster { sqrt_lambda } => {
            let deviation = variate::gaussian(rng) * Accum::HALF;
            (deviation + *sqrt_lambda).square_round()
        }
    }
}
