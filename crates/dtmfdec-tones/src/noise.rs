//! Seeded background hiss for test signals.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Add low-passed Gaussian noise with standard deviation `level` to `samples`.
///
/// The same `seed` always produces the same noise.
pub fn add_band_limited_noise(
    samples: &mut [f64],
    level: f64,
    sample_rate_hz: f64,
    cutoff_hz: f64,
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    // One-pole smoothing: y += a * (x - y).
    let dt = 1.0 / sample_rate_hz;
    let rc = 1.0 / (std::f64::consts::TAU * cutoff_hz.max(1.0));
    let a = dt / (rc + dt);
    let mut y = 0.0;

    for sample in samples.iter_mut() {
        y += a * (gaussian(&mut rng) * level - y);
        *sample += y;
    }
}

/// Root-mean-square level of `samples`.
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

fn gaussian(rng: &mut impl Rng) -> f64 {
    // gen() is in [0, 1); flip it so ln never sees zero.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}
