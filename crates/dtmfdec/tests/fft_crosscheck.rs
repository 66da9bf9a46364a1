use std::f64::consts::TAU;

use dtmfdec::ToneEnergyBank;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// For a bin-centred frequency the resonator power after N samples is |X[k]|².
#[test]
fn bin_aligned_energy_matches_fft() {
    let sample_rate_hz = 8000;
    let n = 160;
    let bin = 20; // 1000 Hz

    let signal: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64 / sample_rate_hz as f64;
            0.6 * (TAU * 1000.0 * t + 0.3).sin() + 0.2 * (TAU * 300.0 * t).sin() + 0.05
        })
        .collect();

    let mut bank = ToneEnergyBank::new([1000], sample_rate_hz);
    for &x in &signal {
        bank.process_sample(x);
    }

    let mut buffer: Vec<Complex<f64>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    FftPlanner::new().plan_fft_forward(n).process(&mut buffer);

    let total_power: f64 = signal.iter().map(|x| x * x).sum();
    let expected = buffer[bin].norm_sqr() / total_power / n as f64;
    let actual = bank.energies()[0];

    assert!(
        ((actual - expected) / expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
