//! Test infrastructure for voicy-rs integration tests.
//!
//! Provides an in-memory resolver, a recording voice host and a passthrough
//! transcoder so the whole pipeline can run without network access or an
//! actual ffmpeg install.

use async_trait::async_trait;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

// Re-export key types from the main crate
pub use voicy_rs::decoder::TranscodeCommand;
pub use voicy_rs::host::{ConnectionId, VoiceHost};
pub use voicy_rs::playback::{Player, PlayerOptions};
pub use voicy_rs::resolver::{Resolution, ResolvedStream, Resolver, ResolverRegistry};
pub use voicy_rs::sample::Sample;
pub use voicy_rs::voice::VoiceFrame;

pub const CONNECTION: ConnectionId = 42;

/// Frame slots the tests leave untouched should keep this marker value.
pub const SENTINEL: i16 = 7777;

/// A transcoder stand-in that passes raw PCM straight through.
pub fn passthrough_command() -> TranscodeCommand {
    TranscodeCommand {
        binary: "cat".to_string(),
        args: vec![],
    }
}

/// Encode sample values as the canonical little-endian byte stream.
pub fn encode_pcm(values: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 2);
    for value in values {
        WriteBytesExt::write_i16::<LittleEndian>(&mut bytes, *value).unwrap();
    }
    bytes
}

/// Records every voice activity detection toggle the pipeline requests.
#[derive(Default)]
pub struct RecordingHost {
    vad_calls: Mutex<Vec<(ConnectionId, bool)>>,
}

impl RecordingHost {
    pub fn calls(&self) -> Vec<(ConnectionId, bool)> {
        self.vad_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VoiceHost for RecordingHost {
    async fn set_voice_activity_detection(&self, connection: ConnectionId, enabled: bool) {
        self.vad_calls.lock().unwrap().push((connection, enabled));
    }
}

/// Resolves any URL of its scheme to a fixed in-memory byte stream.
pub struct StaticResolver {
    pub id: &'static str,
    pub payload: Vec<u8>,
}

#[async_trait]
impl Resolver for StaticResolver {
    fn id(&self) -> &str {
        self.id
    }

    async fn resolve(&self, _url: &Url, _credential: Option<&str>) -> anyhow::Result<Resolution> {
        Ok(Resolution::Matched(ResolvedStream {
            stream: Box::new(Cursor::new(self.payload.clone())),
            diagnostics: None,
            title: Some(format!("{} payload", self.id)),
        }))
    }
}

/// Build a player wired to a static resolver and a passthrough transcoder.
pub fn test_player(payload: Vec<u8>, volume: f64) -> (Arc<Player>, Arc<RecordingHost>) {
    let host = Arc::new(RecordingHost::default());
    let resolvers = Arc::new(ResolverRegistry::new());
    resolvers
        .register(Arc::new(StaticResolver {
            id: "static",
            payload,
        }))
        .expect("duplicate resolver registration");
    let player = Player::new(
        host.clone(),
        resolvers,
        PlayerOptions {
            transcode: passthrough_command(),
            volume,
        },
    );
    (player, host)
}

/// Keep injecting sentinel-filled frames until decoded audio shows up, then
/// return the frame contents and the mute decision.
pub async fn inject_until_edited(
    player: &Player,
    channels: usize,
    slots: usize,
    muted: bool,
) -> (Vec<i16>, bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let mut data = vec![SENTINEL; channels * slots];
        let mute = {
            let mut frame = VoiceFrame {
                channels,
                data: &mut data,
            };
            player.on_voice_frame(CONNECTION, &mut frame, muted)
        };
        if data.iter().any(|&v| v != SENTINEL) {
            return (data, mute);
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "no decoded samples arrived in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Keep poking the injector until it observes end of stream and playback has
/// stopped.
pub async fn wait_until_stopped(player: &Player) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while player.is_playing().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "playback did not stop in time"
        );
        let mut data = vec![0i16; 4];
        let mut frame = VoiceFrame {
            channels: 2,
            data: &mut data,
        };
        player.on_voice_frame(CONNECTION, &mut frame, true);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
