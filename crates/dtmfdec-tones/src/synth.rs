use std::f64::consts::TAU;

use crate::keypad::tone_pair;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthError {
    #[error("not a keypad symbol: {0:?}")]
    UnknownKey(char),
}

/// Renders keypad tones as mono samples.
pub struct DtmfSynth {
    sample_rate_hz: f64,
    level: f64,
}

impl DtmfSynth {
    /// Create a synthesizer. `level` is the peak amplitude of the summed pair.
    pub fn new(sample_rate_hz: f64, level: f64) -> Self {
        Self {
            sample_rate_hz,
            level,
        }
    }

    /// Render the tone pair for `key`.
    pub fn tone(&self, key: char, duration_ms: f64) -> Result<Vec<f64>, SynthError> {
        let (low_hz, high_hz) = tone_pair(key).ok_or(SynthError::UnknownKey(key))?;
        Ok(self.dual_tone(low_hz as f64, high_hz as f64, duration_ms))
    }

    /// Render two summed sines, each at half the configured level.
    pub fn dual_tone(&self, low_hz: f64, high_hz: f64, duration_ms: f64) -> Vec<f64> {
        let low_step = TAU * low_hz / self.sample_rate_hz;
        let high_step = TAU * high_hz / self.sample_rate_hz;
        (0..self.ms_to_samples(duration_ms))
            .map(|n| {
                let n = n as f64;
                ((low_step * n).sin() + (high_step * n).sin()) * 0.5 * self.level
            })
            .collect()
    }

    pub fn silence(&self, duration_ms: f64) -> Vec<f64> {
        vec![0.0; self.ms_to_samples(duration_ms)]
    }

    /// Render `keys` as tone bursts, each preceded by a gap and with a
    /// trailing gap at the end.
    pub fn sequence(&self, keys: &str, tone_ms: f64, gap_ms: f64) -> Result<Vec<f64>, SynthError> {
        let mut out = Vec::new();
        for key in keys.chars() {
            out.extend(self.silence(gap_ms));
            out.extend(self.tone(key, tone_ms)?);
        }
        out.extend(self.silence(gap_ms));
        Ok(out)
    }

    fn ms_to_samples(&self, ms: f64) -> usize {
        (self.sample_rate_hz * (ms / 1000.0)).round() as usize
    }
}

/// Add `src` into `dst` starting at `offset`, truncating at the end of `dst`.
pub fn mix_into(dst: &mut [f64], src: &[f64], offset: usize) {
    if offset >= dst.len() {
        return;
    }
    for (d, s) in dst[offset..].iter_mut().zip(src) {
        *d += s;
    }
}

/// Quantize samples to signed 16-bit little-endian bytes, clipping at full scale.
pub fn to_s16le(samples: &[f64]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&s| {
            let v = (s * 32768.0).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16;
            v.to_le_bytes()
        })
        .collect()
}
