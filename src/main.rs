//! Demo harness: runs the playback pipeline from a terminal.
//!
//! Reads `play <url> [password]`, `stop` and `volume <0-100>` commands from
//! stdin and simulates the host's voice frame callback with a 20 ms ticker.
//! The real product surface is the library, embedded by a voice chat host.

#[macro_use]
extern crate log;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use voicy_rs::host::{ConnectionId, VoiceHost};
use voicy_rs::playback::Player;
use voicy_rs::resolver::{http::HttpResolver, youtubedl::YoutubeDlResolver, ResolverRegistry};
use voicy_rs::voice::VoiceFrame;
use voicy_rs::{command, config};

const CONNECTION: ConnectionId = 0;

/// Sample pairs per simulated voice frame: 20 ms at 48 kHz.
const FRAME_SAMPLES: usize = 960;

/// Host stub that only logs what a real voice chat host would be asked to do.
struct ConsoleHost;

#[async_trait::async_trait]
impl VoiceHost for ConsoleHost {
    async fn set_voice_activity_detection(&self, connection: ConnectionId, enabled: bool) {
        info!("Voice activity detection on connection {connection}: {enabled}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let config = config::load().await?;

    let resolvers = Arc::new(ResolverRegistry::new());
    resolvers
        .register(Arc::new(HttpResolver::new()))
        .expect("duplicate resolver registration");
    resolvers
        .register(Arc::new(YoutubeDlResolver::new(&config.ytdlp_binary)))
        .expect("duplicate resolver registration");

    let player = Player::new(Arc::new(ConsoleHost), resolvers, config.player_options());

    // Stand in for the host's real-time callback so the pipeline drains.
    {
        let player = player.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(20));
            let mut data = vec![0i16; FRAME_SAMPLES * 2];
            loop {
                ticker.tick().await;
                data.fill(0);
                let mut frame = VoiceFrame {
                    channels: 2,
                    data: &mut data,
                };
                player.on_voice_frame(CONNECTION, &mut frame, true);
            }
        });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(reply) = command::dispatch(&player, CONNECTION, &line).await {
            println!("{reply}");
        }
    }

    Ok(())
}
