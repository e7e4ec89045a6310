// Canonical PCM format produced by the transcoder
pub const SAMPLE_RATE: u32 = 48_000; // 48 kHz sample rate
pub const BIT_DEPTH: u16 = 16; // 16 bits per sample
pub const CHANNELS: u16 = 2; // Stereo channel

/// Bounded sample channel capacity: 0.25 s of audio between the decode loop
/// and the voice injector.
pub const SAMPLE_CHANNEL_CAPACITY: usize = SAMPLE_RATE as usize / 4;
