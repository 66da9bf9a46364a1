//! Raw signed 16-bit little-endian mono PCM input.

use std::io::{ErrorKind, Read};
use std::path::Path;

use tracing::warn;

const FULL_SCALE: f64 = 32768.0;

#[derive(Debug, thiserror::Error)]
pub enum PcmError {
    #[error("failed to read PCM stream: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert s16le bytes to samples in `[-1.0, 1.0)`. A trailing odd byte is ignored.
pub fn s16le_to_samples(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f64 / FULL_SCALE)
        .collect()
}

/// Read a whole s16le file into samples.
pub fn read_s16le(path: &Path) -> Result<Vec<f64>, PcmError> {
    let bytes = std::fs::read(path)?;
    if bytes.len() % 2 == 1 {
        warn!(path = %path.display(), "dropping trailing odd byte");
    }
    Ok(s16le_to_samples(&bytes))
}

/// Iterator over fixed-size sample blocks read from an s16le stream.
///
/// Every block holds `block_samples` samples except possibly the last one.
pub struct S16leBlocks<R> {
    reader: R,
    buf: Vec<u8>,
    done: bool,
}

impl<R: Read> S16leBlocks<R> {
    pub fn new(reader: R, block_samples: usize) -> Self {
        Self {
            reader,
            buf: vec![0u8; block_samples.max(1) * 2],
            done: false,
        }
    }
}

impl<R: Read> Iterator for S16leBlocks<R> {
    type Item = Result<Vec<f64>, PcmError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut filled = 0usize;
        while filled < self.buf.len() {
            match self.reader.read(&mut self.buf[filled..]) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }

        if filled == 0 {
            return None;
        }
        if filled % 2 == 1 {
            warn!("dropping trailing odd byte");
        }
        Some(Ok(s16le_to_samples(&self.buf[..filled])))
    }
}
