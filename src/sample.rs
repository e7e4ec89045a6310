//! PCM sample primitives shared by the decode loop and the voice injector.

use byteorder::{ByteOrder, LittleEndian};
use itertools::Itertools;
use tokio::io::{AsyncRead, AsyncReadExt};

/// A stereo sample pair (left, right) as 16-bit signed integers.
pub type Sample = (i16, i16);

/// Reads raw 16-bit signed little-endian PCM values off a byte stream.
///
/// Each call performs exactly one underlying read, so a caller can reassemble
/// pairs that were split across short reads instead of blocking for a full
/// pair. A read ending on an odd byte boundary leaves the dangling byte
/// buffered here until the next call completes the value.
pub struct SampleReader<R> {
    inner: R,
    partial: Option<u8>,
}

impl<R: AsyncRead + Unpin> SampleReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            partial: None,
        }
    }

    /// Read up to `count` sample values with a single read call.
    ///
    /// Returns `Ok(None)` on end of stream. The returned vector holds however
    /// many complete values the read produced, possibly none.
    pub async fn read_values(&mut self, count: usize) -> std::io::Result<Option<Vec<i16>>> {
        if count == 0 {
            return Ok(Some(Vec::new()));
        }

        let mut buf = vec![0u8; count * 2];
        let mut len = 0;
        if let Some(byte) = self.partial.take() {
            buf[0] = byte;
            len = 1;
        }

        let n = self.inner.read(&mut buf[len..]).await?;
        if n == 0 {
            // Stream ended; a dangling byte cannot form a value anymore.
            return Ok(None);
        }
        len += n;

        if len % 2 == 1 {
            self.partial = Some(buf[len - 1]);
            len -= 1;
        }

        let values = buf[..len].chunks_exact(2).map(LittleEndian::read_i16).collect();
        Ok(Some(values))
    }
}

/// Pair a flat run of interleaved values into stereo samples. A trailing
/// unpaired value is dropped.
pub fn pair_values(values: &[i16]) -> Vec<Sample> {
    values.iter().copied().tuples().collect()
}

/// Mix all channel values of a single sample down to one mono value by
/// averaging.
pub fn downmix_to_mono(values: &[i16]) -> i16 {
    if values.is_empty() {
        return 0;
    }
    let sum: i64 = values.iter().map(|&v| i64::from(v)).sum();
    (sum / values.len() as i64) as i16
}

/// Amplify one sample pair with the given ratio. A ratio of 1 means no
/// change, anything lower decreases and anything higher increases the volume.
pub fn amplify(sample: Sample, ratio: f64) -> Sample {
    (
        (f64::from(sample.0) * ratio) as i16,
        (f64::from(sample.1) * ratio) as i16,
    )
}
