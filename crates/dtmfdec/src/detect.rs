pub mod dsp;

use std::time::Duration;

use dsp::{classify, exact_blackman, ToneEnergyBank, DTMF_FREQS, TOTAL_BINS};
use tracing::{debug, trace};

/// Minimum normalized energy for a frequency to count as present.
pub const DEFAULT_ENERGY_THRESHOLD: f64 = 0.032;
/// Minimum time before the same key may be reported again.
pub const DEFAULT_PRESS_INTERVAL: Duration = Duration::from_millis(200);
const DEFAULT_BLOCK_MS: f64 = 20.0;

/// Errors raised while configuring a [`Decoder`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,
    #[error("energy threshold must be finite and non-negative, got {0}")]
    InvalidThreshold(f64),
}

/// A key accepted by [`Decoder::push`] or [`Decoder::flush`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: char,
    /// Index of the first sample of the block that produced the key,
    /// counted from the start of the session.
    pub start_sample: u64,
    /// Session time at which the key was accepted.
    pub at: Duration,
}

/// Stateful DTMF decoder for one audio stream.
///
/// Every call to [`Decoder::decode`] windows the block, runs it through the
/// resonator bank and reports at most one key. A key equal to the last
/// accepted one is suppressed until the press interval has elapsed, so a held
/// button spanning many blocks is reported once.
#[derive(Debug)]
pub struct Decoder {
    sample_rate_hz: u32,
    energy_threshold: f64,
    press_interval: Duration,
    block_len: usize,
    elapsed: Duration,
    last_key: Option<char>,
    last_accepted: Duration,
    samples_seen: u64,
    pending: Vec<f64>,
    bank: ToneEnergyBank<TOTAL_BINS>,
}

impl Decoder {
    /// Create a builder with default settings.
    pub fn builder(sample_rate_hz: u32) -> DecoderBuilder {
        DecoderBuilder::new(sample_rate_hz)
    }

    /// Create a decoder with the default threshold and press interval.
    pub fn new(sample_rate_hz: u32) -> Result<Self, ConfigError> {
        Self::builder(sample_rate_hz).build()
    }

    /// Decode one block and return the accepted key, if any.
    pub fn decode(&mut self, samples: &[f64]) -> Option<char> {
        self.elapsed += block_duration(samples.len(), self.sample_rate_hz);
        self.samples_seen += samples.len() as u64;

        let key = self.process(samples)?;
        let since = self.elapsed.saturating_sub(self.last_accepted);
        if self.last_key == Some(key) && since < self.press_interval {
            trace!(%key, since_ms = since.as_millis() as u64, "suppressing held key");
            return None;
        }

        self.last_key = Some(key);
        self.last_accepted = self.elapsed;
        debug!(%key, elapsed_ms = self.elapsed.as_millis() as u64, "accepted key");
        Some(key)
    }

    /// Feed an arbitrary run of samples, decoding every complete block.
    ///
    /// Samples that do not fill a block are kept for the next call.
    pub fn push(&mut self, samples: &[f64]) -> Vec<KeyPress> {
        let mut presses = Vec::new();

        let mut pos = 0usize;
        while pos < samples.len() {
            let to_block_end = self.block_len - self.pending.len();
            let take = to_block_end.min(samples.len() - pos);
            self.pending.extend_from_slice(&samples[pos..pos + take]);
            pos += take;

            if self.pending.len() == self.block_len {
                if let Some(press) = self.decode_pending() {
                    presses.push(press);
                }
            }
        }

        presses
    }

    /// Decode whatever partial block is still buffered.
    pub fn flush(&mut self) -> Option<KeyPress> {
        if self.pending.is_empty() {
            return None;
        }
        self.decode_pending()
    }

    /// Reset the session to its freshly built state.
    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
        self.last_key = None;
        self.last_accepted = Duration::ZERO;
        self.samples_seen = 0;
        self.pending.clear();
        self.bank.reset();
    }

    /// Total stream time decoded so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The most recently accepted key.
    pub fn last_key(&self) -> Option<char> {
        self.last_key
    }

    /// Sample rate the decoder was built for.
    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Minimum normalized energy a tone needs to count as present.
    pub fn energy_threshold(&self) -> f64 {
        self.energy_threshold
    }

    /// Minimum time before the same key is reported again.
    pub fn press_interval(&self) -> Duration {
        self.press_interval
    }

    /// Block length used by [`Decoder::push`].
    pub fn block_samples(&self) -> usize {
        self.block_len
    }

    fn process(&mut self, samples: &[f64]) -> Option<char> {
        let n = samples.len();
        for (i, &x) in samples.iter().enumerate() {
            self.bank.process_sample(exact_blackman(x, i, n));
        }
        let detected = classify(self.bank.energies(), self.energy_threshold);
        trace!(energies = ?self.bank.energies(), ?detected, "block energy profile");
        self.bank.reset();
        detected
    }

    fn decode_pending(&mut self) -> Option<KeyPress> {
        let start_sample = self.samples_seen;
        let block = std::mem::take(&mut self.pending);
        let key = self.decode(&block);
        self.pending = block;
        self.pending.clear();
        key.map(|key| KeyPress {
            key,
            start_sample,
            at: self.elapsed,
        })
    }
}

fn block_duration(samples: usize, sample_rate_hz: u32) -> Duration {
    Duration::from_secs(samples as u64) / sample_rate_hz
}

fn ms_to_samples(ms: f64, sample_rate_hz: u32) -> usize {
    let len = (sample_rate_hz as f64 * (ms / 1000.0)).round() as usize;
    len.max(1)
}

/// Builder for configuring a [`Decoder`].
pub struct DecoderBuilder {
    sample_rate_hz: u32,
    energy_threshold: f64,
    press_interval: Duration,
    block_samples: Option<usize>,
}

impl DecoderBuilder {
    /// Create a builder with defaults for the given sample rate.
    pub fn new(sample_rate_hz: u32) -> Self {
        Self {
            sample_rate_hz,
            energy_threshold: DEFAULT_ENERGY_THRESHOLD,
            press_interval: DEFAULT_PRESS_INTERVAL,
            block_samples: None,
        }
    }

    /// Set the minimum normalized energy for a tone to count as present.
    pub fn energy_threshold(mut self, threshold: f64) -> Self {
        self.energy_threshold = threshold;
        self
    }

    /// Set the minimum time before the same key may be reported again.
    pub fn press_interval(mut self, interval: Duration) -> Self {
        self.press_interval = interval;
        self
    }

    /// Set the block length used by [`Decoder::push`] in samples.
    pub fn block_samples(mut self, samples: usize) -> Self {
        self.block_samples = Some(samples.max(1));
        self
    }

    /// Set the block length used by [`Decoder::push`] in milliseconds.
    pub fn block_ms(mut self, ms: f64) -> Self {
        self.block_samples = Some(ms_to_samples(ms, self.sample_rate_hz));
        self
    }

    /// Build the decoder.
    pub fn build(self) -> Result<Decoder, ConfigError> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if !self.energy_threshold.is_finite() || self.energy_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.energy_threshold));
        }

        let block_len = self
            .block_samples
            .unwrap_or_else(|| ms_to_samples(DEFAULT_BLOCK_MS, self.sample_rate_hz));

        Ok(Decoder {
            sample_rate_hz: self.sample_rate_hz,
            energy_threshold: self.energy_threshold,
            press_interval: self.press_interval,
            block_len,
            elapsed: Duration::ZERO,
            last_key: None,
            last_accepted: Duration::ZERO,
            samples_seen: 0,
            pending: Vec::new(),
            bank: ToneEnergyBank::new(DTMF_FREQS, self.sample_rate_hz),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    const RATE: u32 = 8000;

    fn dual_tone(low_hz: f64, high_hz: f64, len: usize, level: f64) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let t = i as f64 / RATE as f64;
                ((TAU * low_hz * t).sin() + (TAU * high_hz * t).sin()) * 0.5 * level
            })
            .collect()
    }

    #[test]
    fn detects_every_key() {
        for (row, &low) in dsp::LOW_GROUP_HZ.iter().enumerate() {
            for (column, &high) in dsp::HIGH_GROUP_HZ.iter().enumerate() {
                let mut decoder = Decoder::new(RATE).unwrap();
                let block = dual_tone(low as f64, high as f64, 160, 0.5);
                assert_eq!(decoder.decode(&block), Some(dsp::DTMF_KEYS[row][column]));
            }
        }
    }

    #[test]
    fn pound_uses_941_and_1477() {
        let mut decoder = Decoder::new(RATE).unwrap();
        assert_eq!(decoder.decode(&dual_tone(941.0, 1477.0, 160, 0.5)), Some('#'));
        assert_eq!(decoder.decode(&dual_tone(941.0, 1336.0, 160, 0.5)), Some('0'));
    }

    #[test]
    fn held_key_is_reported_once_per_interval() {
        let mut decoder = Decoder::new(RATE).unwrap();
        let block = dual_tone(770.0, 1336.0, 160, 0.5);

        let hits: Vec<usize> = (0..25)
            .filter(|_| decoder.decode(&block).is_some())
            .collect();

        // 20 ms blocks with a 200 ms interval: accepted at blocks 0, 10 and 20.
        assert_eq!(hits, vec![0, 10, 20]);
        assert_eq!(decoder.last_key(), Some('5'));
        assert_eq!(decoder.elapsed(), Duration::from_millis(500));
    }

    #[test]
    fn different_key_is_not_debounced() {
        let mut decoder = Decoder::new(RATE).unwrap();
        assert_eq!(decoder.decode(&dual_tone(697.0, 1209.0, 160, 0.5)), Some('1'));
        assert_eq!(decoder.decode(&dual_tone(697.0, 1336.0, 160, 0.5)), Some('2'));
        assert_eq!(decoder.decode(&dual_tone(697.0, 1209.0, 160, 0.5)), Some('1'));
    }

    #[test]
    fn repeat_after_release_within_interval_is_suppressed() {
        let mut decoder = Decoder::new(RATE).unwrap();
        let tone = dual_tone(852.0, 1477.0, 160, 0.5);
        let silence = vec![0.0; 160];
        assert_eq!(decoder.decode(&tone), Some('9'));
        assert_eq!(decoder.decode(&silence), None);
        assert_eq!(decoder.decode(&tone), None);
    }

    #[test]
    fn threshold_gates_detection() {
        let mut decoder = Decoder::builder(RATE)
            .energy_threshold(0.9)
            .build()
            .unwrap();
        assert_eq!(decoder.decode(&dual_tone(697.0, 1209.0, 160, 0.5)), None);
        assert_eq!(decoder.last_key(), None);
    }

    #[test]
    fn silence_is_not_detected() {
        let mut decoder = Decoder::new(RATE).unwrap();
        assert_eq!(decoder.decode(&[0.0; 160]), None);
    }

    #[test]
    fn empty_block_only_counts_time() {
        let mut decoder = Decoder::new(RATE).unwrap();
        assert_eq!(decoder.decode(&[]), None);
        assert_eq!(decoder.elapsed(), Duration::ZERO);
        assert_eq!(decoder.last_key(), None);
        assert_eq!(decoder.decode(&dual_tone(697.0, 1209.0, 160, 0.5)), Some('1'));
    }

    #[test]
    fn mixed_block_yields_at_most_one_key() {
        let mut decoder = Decoder::new(RATE).unwrap();
        let mut block = dual_tone(697.0, 1209.0, 80, 0.5);
        block.extend(dual_tone(852.0, 1633.0, 80, 0.5));
        match decoder.decode(&block) {
            None | Some('1') | Some('C') => {}
            Some(other) => panic!("unexpected key {other}"),
        }
    }

    #[test]
    fn push_matches_block_decoding() {
        let mut blocks = Vec::new();
        for (low, high) in [(697.0, 1209.0), (0.0, 0.0), (941.0, 1477.0), (0.0, 0.0)] {
            for _ in 0..6 {
                if low == 0.0 {
                    blocks.push(vec![0.0; 160]);
                } else {
                    blocks.push(dual_tone(low, high, 160, 0.5));
                }
            }
        }
        let stream: Vec<f64> = blocks.concat();

        let mut by_block = Decoder::new(RATE).unwrap();
        let expected: Vec<char> = blocks.iter().filter_map(|b| by_block.decode(b)).collect();

        let mut streaming = Decoder::builder(RATE).block_samples(160).build().unwrap();
        let mut presses = Vec::new();
        for chunk in stream.chunks(37) {
            presses.extend(streaming.push(chunk));
        }
        assert!(streaming.flush().is_none());

        let keys: Vec<char> = presses.iter().map(|p| p.key).collect();
        assert_eq!(keys, expected);
        assert_eq!(keys, vec!['1', '#']);
        assert_eq!(presses[0].start_sample, 0);
        assert_eq!(presses[1].start_sample, 12 * 160);
        assert_eq!(presses[1].at, Duration::from_millis(260));
    }

    #[test]
    fn flush_decodes_partial_block() {
        let mut decoder = Decoder::builder(RATE).block_samples(320).build().unwrap();
        assert!(decoder.push(&dual_tone(697.0, 1209.0, 200, 0.5)).is_empty());
        let press = decoder.flush().unwrap();
        assert_eq!(press.key, '1');
        assert_eq!(press.start_sample, 0);
        assert_eq!(press.at, Duration::from_millis(25));
        assert!(decoder.flush().is_none());
    }

    #[test]
    fn reset_forgets_last_key() {
        let mut decoder = Decoder::new(RATE).unwrap();
        let block = dual_tone(697.0, 1209.0, 160, 0.5);
        assert_eq!(decoder.decode(&block), Some('1'));
        assert_eq!(decoder.decode(&block), None);
        decoder.reset();
        assert_eq!(decoder.elapsed(), Duration::ZERO);
        assert_eq!(decoder.decode(&block), Some('1'));
    }

    #[test]
    fn default_block_is_twenty_ms() {
        assert_eq!(Decoder::new(8000).unwrap().block_samples(), 160);
        assert_eq!(Decoder::new(16_000).unwrap().block_samples(), 320);
        let decoder = Decoder::builder(44_100).block_ms(10.0).build().unwrap();
        assert_eq!(decoder.block_samples(), 441);
    }

    #[test]
    fn oversized_blocks_build_and_flush() {
        for builder in [
            Decoder::builder(RATE).block_samples(usize::MAX),
            Decoder::builder(RATE).block_ms(f64::INFINITY),
        ] {
            let mut decoder = builder.build().unwrap();
            assert_eq!(decoder.block_samples(), usize::MAX);
            assert!(decoder.push(&dual_tone(697.0, 1209.0, 160, 0.5)).is_empty());
            assert_eq!(decoder.flush().map(|p| p.key), Some('1'));
        }
    }

    #[test]
    fn getters_report_configuration() {
        let decoder = Decoder::builder(16_000)
            .energy_threshold(0.05)
            .press_interval(Duration::from_millis(120))
            .build()
            .unwrap();
        assert_eq!(decoder.sample_rate_hz(), 16_000);
        assert_eq!(decoder.energy_threshold(), 0.05);
        assert_eq!(decoder.press_interval(), Duration::from_millis(120));
    }

    #[test]
    fn rejects_invalid_configuration() {
        assert_eq!(Decoder::new(0).err(), Some(ConfigError::ZeroSampleRate));
        assert!(matches!(
            Decoder::builder(RATE).energy_threshold(f64::NAN).build(),
            Err(ConfigError::InvalidThreshold(_))
        ));
        assert!(matches!(
            Decoder::builder(RATE).energy_threshold(-0.1).build(),
            Err(ConfigError::InvalidThreshold(_))
        ));
    }
}
