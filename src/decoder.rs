//! Transcoder subprocess wrapper.
//!
//! Launches an external transcoder (ffmpeg by default) that converts whatever
//! media arrives on its stdin into raw 16-bit signed 48 kHz stereo PCM on its
//! stdout, then feeds the decoded sample pairs out through a bounded channel
//! ready to inject into the outgoing voice buffer.

use crate::constants::{CHANNELS, SAMPLE_CHANNEL_CAPACITY, SAMPLE_RATE};
use crate::error::DecoderError;
use crate::sample::{Sample, SampleReader};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, Mutex};

/// Command line of the transcoding subprocess.
#[derive(Clone, Debug)]
pub struct TranscodeCommand {
    pub binary: String,
    pub args: Vec<String>,
}

impl Default for TranscodeCommand {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            args: vec![
                "-i".to_string(),
                "-".to_string(), // stdin for input
                "-loglevel".to_string(),
                "warning".to_string(), // only print warnings and errors
                "-c:a".to_string(),
                "pcm_s16le".to_string(), // 16-bit signed PCM audio codec
                "-ar".to_string(),
                SAMPLE_RATE.to_string(),
                "-ac".to_string(),
                CHANNELS.to_string(),
                "-f".to_string(),
                "s16le".to_string(), // raw PCM output, no container
                "pipe:".to_string(), // output everything to stdout
            ],
        }
    }
}

impl TranscodeCommand {
    /// Default arguments with a different transcoder binary.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            ..Self::default()
        }
    }
}

struct DecoderIo {
    child: Child,
    stdin: Option<ChildStdin>,
    closed: bool,
}

/// Write/close half of a running transcoder. Cloneable so the input copy task
/// and the decode loop can both release the subprocess.
#[derive(Clone)]
pub struct DecoderInput {
    io: Arc<Mutex<DecoderIo>>,
}

impl DecoderInput {
    /// Forward bytes to the transcoder input. Serialized against `close` so a
    /// write never races the pipe teardown.
    pub async fn write(&self, bytes: &[u8]) -> Result<(), DecoderError> {
        let mut io = self.io.lock().await;
        match io.stdin.as_mut() {
            Some(stdin) => stdin.write_all(bytes).await.map_err(DecoderError::Pipe),
            None => Err(DecoderError::AlreadyClosed),
        }
    }

    /// Close the transcoder input and wait for the subprocess to exit,
    /// exactly once. A second call fails with `AlreadyClosed`.
    ///
    /// Does not close the sample or error channels; those are owned by the
    /// decode loop, which also calls this on its own exit path.
    pub async fn close(&self) -> Result<(), DecoderError> {
        let mut io = self.io.lock().await;
        if io.closed {
            return Err(DecoderError::AlreadyClosed);
        }
        // Dropping stdin signals end of input to the transcoder.
        io.stdin.take();
        let _ = io.child.wait().await;
        io.closed = true;
        Ok(())
    }
}

/// A running transcoder subprocess and its decoded output.
pub struct Decoder {
    pub input: DecoderInput,
    /// Decoded sample pairs in strict production order. Closed by the decode
    /// loop to signal end of stream.
    pub samples: mpsc::Receiver<Sample>,
    /// Carries at most the first transport or logic error of the decode loop.
    pub errors: mpsc::Receiver<DecoderError>,
}

impl Decoder {
    /// Launch the transcoder and wire up its background tasks: a stderr line
    /// reader invoking `on_stderr` per line, and the stdout decode loop.
    /// Returns as soon as the process has started.
    pub fn spawn(
        command: &TranscodeCommand,
        on_stderr: impl Fn(&str) + Send + 'static,
    ) -> Result<Decoder, DecoderError> {
        debug!("Starting transcoder: {} {:?}", command.binary, command.args);

        let mut child = Command::new(&command.binary)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(DecoderError::Launch)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DecoderError::Launch(std::io::Error::other("no transcoder stdin")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DecoderError::Launch(std::io::Error::other("no transcoder stdout")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DecoderError::Launch(std::io::Error::other("no transcoder stderr")))?;

        let (samples_tx, samples_rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
        let (errors_tx, errors_rx) = mpsc::channel(1);

        let io = Arc::new(Mutex::new(DecoderIo {
            child,
            stdin: Some(stdin),
            closed: false,
        }));
        let input = DecoderInput { io };

        tokio::spawn(async move {
            debug!("Transcoder stderr reader started");
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                on_stderr(line.trim_end_matches(['\r', '\n']));
            }
            debug!("Transcoder stderr reader stopped");
        });

        {
            let input = input.clone();
            tokio::spawn(async move {
                debug!("Transcoder decode loop started");
                decode_loop(stdout, samples_tx, errors_tx).await;
                // The input copy task closes the decoder on its own exit path
                // as well; whichever gets here second sees AlreadyClosed.
                let _ = input.close().await;
                debug!("Transcoder decode loop stopped");
            });
        }

        Ok(Decoder {
            input,
            samples: samples_rx,
            errors: errors_rx,
        })
    }
}

/// Reassemble the transcoder's PCM output into sample pairs and push them
/// onto the bounded channel. The channel send blocks under full-buffer
/// backpressure, pacing the transcoder against a slow consumer.
pub(crate) async fn decode_loop<R>(
    output: R,
    samples: mpsc::Sender<Sample>,
    errors: mpsc::Sender<DecoderError>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = SampleReader::new(output);

    // Short reads can split a pair in half; buffer the leftover value here.
    let mut pending: Vec<i16> = Vec::with_capacity(2);

    loop {
        let values = match reader.read_values(2 - pending.len()).await {
            Ok(Some(values)) => values,
            // Transcoder closed its output, clean end of stream.
            Ok(None) => break,
            Err(e) => {
                let _ = errors.try_send(DecoderError::Pipe(e));
                break;
            }
        };

        pending.extend(values);
        if pending.len() < 2 {
            continue;
        }
        if pending.len() > 2 {
            let _ = errors.try_send(DecoderError::DecodeLogic);
            break;
        }

        let pair = (pending[0], pending[1]);
        pending.clear();
        if samples.send(pair).await.is_err() {
            // Consumer is gone, nothing left to decode for.
            break;
        }
    }
    // Dropping `samples` here closes the channel; that closure is the only
    // termination signal consumers observe.
}
