use std::f64::consts::PI;

/// Low-group (row) frequencies in Hz.
pub const LOW_GROUP_HZ: [u32; 4] = [697, 770, 852, 941];
/// High-group (column) frequencies in Hz.
pub const HIGH_GROUP_HZ: [u32; 4] = [1209, 1336, 1477, 1633];
/// All eight keypad frequencies, low group first.
pub const DTMF_FREQS: [u32; TOTAL_BINS] = [697, 770, 852, 941, 1209, 1336, 1477, 1633];

/// Number of resonator slots in a keypad bank.
pub const TOTAL_BINS: usize = 8;

/// Keypad symbols indexed by `[low group position][high group position]`.
pub const DTMF_KEYS: [[char; 4]; 4] = [
    ['1', '2', '3', 'A'],
    ['4', '5', '6', 'B'],
    ['7', '8', '9', 'C'],
    ['*', '0', '#', 'D'],
];

#[derive(Clone, Copy, Debug)]
struct Resonator {
    freq_hz: u32,
    coeff: f64,
    first_previous: f64,
    second_previous: f64,
    filter_length: usize,
    total_power: f64,
}

impl Resonator {
    fn new(freq_hz: u32, sample_rate_hz: u32) -> Self {
        let normalized = freq_hz as f64 / sample_rate_hz as f64;
        let omega = 2.0 * PI * normalized;
        Self {
            freq_hz,
            coeff: 2.0 * omega.cos(),
            first_previous: 0.0,
            second_previous: 0.0,
            filter_length: 0,
            total_power: 0.0,
        }
    }

    /// Advance the filter by one sample and return the normalized energy.
    fn iterate(&mut self, x: f64) -> f64 {
        let f1 = self.first_previous;
        let f2 = self.second_previous;
        let s0 = x + self.coeff * f1 - f2;
        self.second_previous = f1;
        self.first_previous = s0;
        self.filter_length += 1;

        let power = f1 * f1 + s0 * s0 - self.coeff * s0 * f1;
        let mut total_power = self.total_power + x * x;
        if total_power == 0.0 {
            total_power = 1.0;
        }
        self.total_power = total_power;

        power / total_power / self.filter_length as f64
    }

    fn reset(&mut self) {
        self.first_previous = 0.0;
        self.second_previous = 0.0;
        self.filter_length = 0;
        self.total_power = 0.0;
    }
}

/// Bank of Goertzel resonators, one slot per target frequency.
///
/// Each slot reports the power at its frequency divided by the accumulated
/// signal power and by the number of samples seen, so a value is comparable
/// across blocks of different length or loudness. State must be cleared with
/// [`ToneEnergyBank::reset`] between unrelated blocks.
#[derive(Clone, Debug)]
pub struct ToneEnergyBank<const N: usize> {
    resonators: [Resonator; N],
    energies: [f64; N],
}

impl<const N: usize> ToneEnergyBank<N> {
    /// Create a bank for the given frequencies at `sample_rate_hz`.
    pub fn new(frequencies: [u32; N], sample_rate_hz: u32) -> Self {
        Self {
            resonators: frequencies.map(|freq_hz| Resonator::new(freq_hz, sample_rate_hz)),
            energies: [0.0; N],
        }
    }

    /// Feed one sample through every resonator.
    pub fn process_sample(&mut self, sample: f64) {
        for (resonator, energy) in self.resonators.iter_mut().zip(self.energies.iter_mut()) {
            *energy = resonator.iterate(sample);
        }
    }

    /// Clear all running state for a new block.
    pub fn reset(&mut self) {
        for resonator in &mut self.resonators {
            resonator.reset();
        }
        self.energies = [0.0; N];
    }

    /// Current energy per slot, in construction order.
    pub fn energies(&self) -> &[f64; N] {
        &self.energies
    }

    /// Current energy for `freq_hz`, if the bank monitors it.
    pub fn energy_of(&self, freq_hz: u32) -> Option<f64> {
        self.resonators
            .iter()
            .position(|r| r.freq_hz == freq_hz)
            .map(|i| self.energies[i])
    }
}

/// Exact Blackman window, evaluated for a single sample of a block.
pub fn exact_blackman(sample: f64, index: usize, block_size: usize) -> f64 {
    let index = index as f64;
    let block_size = block_size as f64;
    sample
        * (0.426591 - 0.496561 * ((2.0 * PI * index) / block_size).cos()
            + 0.076849 * ((4.0 * PI * index) / block_size).cos())
}

/// Map a finished energy profile to a keypad symbol.
///
/// Both groups need a strict maximum at or above `threshold`.
pub fn classify(energies: &[f64; TOTAL_BINS], threshold: f64) -> Option<char> {
    let row = strongest(&energies[..4], threshold)?;
    let column = strongest(&energies[4..], threshold)?;
    Some(DTMF_KEYS[row][column])
}

fn strongest(energies: &[f64], threshold: f64) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut best_energy = 0.0;
    for (i, &energy) in energies.iter().enumerate() {
        if energy > best_energy && energy >= threshold {
            best_energy = energy;
            best = Some(i);
        }
    }
    best
}
