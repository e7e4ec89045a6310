//! Playback orchestration: at most one URL playing into the voice buffer at
//! a time.

use crate::decoder::{Decoder, DecoderInput, TranscodeCommand};
use crate::error::{DecoderError, PlaybackError};
use crate::host::{ConnectionId, VoiceHost};
use crate::resolver::{ByteStream, ResolverRegistry};
use crate::sample::Sample;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::sync::{mpsc, Mutex, Notify, TryLockError};

const COPY_BUF_SIZE: usize = 8192;

/// Handle to the upstream side of a running playback. Closing it is the only
/// cancellation primitive: the input copy task observes it and winds the rest
/// of the pipeline down through end-of-file propagation.
pub(crate) struct InputHandle {
    shutdown: Arc<Notify>,
}

impl InputHandle {
    fn close(&self) {
        self.shutdown.notify_one();
    }
}

/// Mutable state of the single playback session.
///
/// `running` is true iff both streams are present and the pipeline tasks are
/// live; every transition happens under the session mutex.
#[derive(Default)]
pub(crate) struct Session {
    pub(crate) running: bool,
    output: Option<mpsc::Receiver<Sample>>,
    input: Option<InputHandle>,
}

impl Session {
    pub(crate) fn output_mut(&mut self) -> Option<&mut mpsc::Receiver<Sample>> {
        self.output.as_mut()
    }
}

/// Options for constructing a [`Player`].
#[derive(Clone, Debug)]
pub struct PlayerOptions {
    pub transcode: TranscodeCommand,
    /// Initial playback volume, 0.0 to 1.0.
    pub volume: f64,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            transcode: TranscodeCommand::default(),
            volume: 0.5,
        }
    }
}

/// The playback orchestrator.
///
/// Owns the session state, the process-wide volume and the stop-request
/// channel that lets the real-time injector and background watchers trigger
/// [`Player::stop`] without blocking.
pub struct Player {
    session: Mutex<Session>,
    /// f64 bits; written by user commands, snapshotted once per voice frame.
    volume: AtomicU64,
    transcode: TranscodeCommand,
    host: Arc<dyn VoiceHost>,
    resolvers: Arc<ResolverRegistry>,
    stop_tx: mpsc::UnboundedSender<ConnectionId>,
}

impl Player {
    /// Create a player and spawn its stop-request watcher. Must be called
    /// within a tokio runtime.
    pub fn new(
        host: Arc<dyn VoiceHost>,
        resolvers: Arc<ResolverRegistry>,
        options: PlayerOptions,
    ) -> Arc<Player> {
        let (stop_tx, mut stop_rx) = mpsc::unbounded_channel();

        let player = Arc::new(Player {
            session: Mutex::new(Session::default()),
            volume: AtomicU64::new(options.volume.clamp(0.0, 1.0).to_bits()),
            transcode: options.transcode,
            host,
            resolvers,
            stop_tx,
        });

        let weak = Arc::downgrade(&player);
        tokio::spawn(async move {
            while let Some(connection) = stop_rx.recv().await {
                let Some(player) = weak.upgrade() else { break };
                if let Err(e) = player.stop(connection).await {
                    warn!("Requested stop failed: {e}");
                }
            }
        });

        player
    }

    /// Resolve a URL and start playing it into the voice buffer.
    pub async fn play(
        &self,
        connection: ConnectionId,
        uri: &str,
        credential: Option<&str>,
    ) -> Result<(), PlaybackError> {
        let mut session = self.session.lock().await;

        if session.running {
            return Err(PlaybackError::AlreadyPlaying);
        }

        let url = url::Url::parse(uri)?;

        let resolved = self
            .resolvers
            .resolve(&url, credential)
            .await
            .map_err(PlaybackError::Resolver)?;
        let Some(resolved) = resolved else {
            return Err(PlaybackError::UnresolvedUrl(uri.to_string()));
        };

        if let Some(title) = &resolved.title {
            info!("Resolved {} to {:?}", url, title);
        }
        if let Some(diagnostics) = resolved.diagnostics {
            spawn_diagnostics_reader(diagnostics);
        }

        debug!("About to start new decoder...");
        let decoder = Decoder::spawn(&self.transcode, |line| {
            debug!("TRANSCODER STDERR: {line}");
        })?;
        let Decoder {
            input,
            samples,
            errors,
        } = decoder;

        // First transcoder error takes the whole playback down.
        {
            let mut errors = errors;
            let stop_tx = self.stop_tx.clone();
            tokio::spawn(async move {
                if let Some(e) = errors.recv().await {
                    error!("Transcoder failed: {e}");
                    let _ = stop_tx.send(connection);
                }
            });
        }

        let shutdown = Arc::new(Notify::new());
        spawn_input_copy(resolved.stream, input, shutdown.clone());

        session.output = Some(samples);
        session.input = Some(InputHandle { shutdown });
        session.running = true;

        // Otherwise the host swallows the injected audio as silence.
        self.host
            .set_voice_activity_detection(connection, false)
            .await;

        Ok(())
    }

    /// Stop the current playback. A no-op when nothing is playing.
    pub async fn stop(&self, connection: ConnectionId) -> Result<(), PlaybackError> {
        let mut session = self.session.lock().await;

        debug!("Checking if playback is running");
        if !session.running {
            debug!("Playback was already inactive");
            return Ok(());
        }

        if let Some(input) = session.input.take() {
            debug!("Closing current input stream");
            input.close();
        }

        // Draining unblocks a producer stuck on a full channel and ends once
        // the decode loop observes end-of-file and closes the channel; that
        // is guaranteed because the input was closed first.
        debug!("Flushing output buffer...");
        if let Some(mut output) = session.output.take() {
            while output.recv().await.is_some() {}
        }

        debug!("Notifying that playback is not running anymore");
        session.running = false;

        self.host
            .set_voice_activity_detection(connection, true)
            .await;

        Ok(())
    }

    pub async fn is_playing(&self) -> bool {
        self.session.lock().await.running
    }

    /// Set the playback volume, 0.0 to 1.0. Last writer wins; the injector
    /// snapshots the value once per frame.
    pub fn set_volume(&self, volume: f64) {
        self.volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn volume(&self) -> f64 {
        f64::from_bits(self.volume.load(Ordering::Relaxed))
    }

    /// Non-blocking session access for the real-time injection path.
    pub(crate) fn try_lock_session(
        &self,
    ) -> Result<tokio::sync::MutexGuard<'_, Session>, TryLockError> {
        self.session.try_lock()
    }

    /// Ask the watcher task to stop playback. Safe to call from the
    /// real-time injection path.
    pub(crate) fn request_stop(&self, connection: ConnectionId) {
        let _ = self.stop_tx.send(connection);
    }
}

/// Pipe the resolved byte stream into the transcoder input until either side
/// closes, the copy fails, or the input handle is closed; then release the
/// transcoder.
fn spawn_input_copy(stream: ByteStream, input: DecoderInput, shutdown: Arc<Notify>) {
    tokio::spawn(async move {
        debug!("Input copy task started");
        let mut stream = stream;
        let mut buf = vec![0u8; COPY_BUF_SIZE];
        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                read = stream.read(&mut buf) => match read {
                    Ok(0) => break,
                    Ok(n) => {
                        if let Err(e) = input.write(&buf[..n]).await {
                            debug!("Writing to transcoder failed: {e}");
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("Reading input stream failed: {e}");
                        break;
                    }
                },
            }
        }
        // The decode loop closes the decoder on its own exit path as well.
        match input.close().await {
            Ok(()) | Err(DecoderError::AlreadyClosed) => {}
            Err(e) => debug!("Closing transcoder input failed: {e}"),
        }
        debug!("Input copy task stopped");
    });
}

/// Log the resolver's diagnostic output line by line, best effort; ends
/// silently when the stream closes.
fn spawn_diagnostics_reader(diagnostics: ByteStream) {
    tokio::spawn(async move {
        debug!("RESOLVER STDERR <listener loop started>");
        let mut lines = BufReader::new(diagnostics).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            for part in line.split('\r') {
                let part = part.trim_end();
                if !part.is_empty() {
                    debug!("RESOLVER STDERR: {part}");
                }
            }
        }
        debug!("RESOLVER STDERR <listener loop stopped>");
    });
}
