//! Per-frame injection of decoded audio into the outgoing voice buffer.

use crate::error::PlaybackError;
use crate::host::ConnectionId;
use crate::playback::Player;
use crate::sample::{amplify, downmix_to_mono};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::sync::mpsc::error::TryRecvError;

/// One outgoing voice frame handed over by the host.
///
/// `data` holds `sample_count() * channels` interleaved 16-bit values as
/// captured from the microphone; the injector overwrites leading slots with
/// decoded audio while playback is running.
pub struct VoiceFrame<'a> {
    pub channels: usize,
    pub data: &'a mut [i16],
}

impl VoiceFrame<'_> {
    pub fn sample_count(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.data.len() / self.channels
        }
    }
}

impl Player {
    /// Host callback for every outgoing voice frame; returns the final mute
    /// decision. Runs on the host's real-time audio thread and never blocks.
    ///
    /// A frame that had any slot overwritten with injected audio is never
    /// muted, regardless of what the host suggested.
    pub fn on_voice_frame(
        &self,
        connection: ConnectionId,
        frame: &mut VoiceFrame<'_>,
        muted: bool,
    ) -> bool {
        let result = catch_unwind(AssertUnwindSafe(|| {
            self.inject_frame(connection, frame, muted)
        }));
        match result {
            Ok(Ok(mute)) => mute,
            Ok(Err(e)) => {
                warn!("{e}");
                self.request_stop(connection);
                muted
            }
            Err(_) => {
                error!("Voice frame handler panicked");
                muted
            }
        }
    }

    fn inject_frame(
        &self,
        connection: ConnectionId,
        frame: &mut VoiceFrame<'_>,
        muted: bool,
    ) -> Result<bool, PlaybackError> {
        // Pass host audio through untouched whenever we cannot take the
        // session lock without waiting.
        let Ok(mut session) = self.try_lock_session() else {
            return Ok(muted);
        };
        if !session.running {
            return Ok(muted);
        }
        let Some(output) = session.output_mut() else {
            return Ok(muted);
        };

        if frame.channels != 1 && frame.channels != 2 {
            return Err(PlaybackError::UnsupportedChannelCount(frame.channels));
        }

        let volume = self.volume();
        let mut edited = false;

        for slot in frame.data.chunks_exact_mut(frame.channels) {
            match output.try_recv() {
                Ok(sample) => {
                    let (left, right) = amplify(sample, volume);
                    if frame.channels == 2 {
                        slot[0] = left;
                        slot[1] = right;
                    } else {
                        slot[0] = downmix_to_mono(&[left, right]);
                    }
                    edited = true;
                }
                Err(TryRecvError::Disconnected) => {
                    // Channel closed: end of stream.
                    debug!("Sample stream ended, stopping playback");
                    self.request_stop(connection);
                    break;
                }
                // Underrun: leave the remaining slots as captured.
                Err(TryRecvError::Empty) => break,
            }
        }

        Ok(muted && !edited)
    }
}
