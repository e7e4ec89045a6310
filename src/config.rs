use crate::decoder::TranscodeCommand;
use crate::playback::PlayerOptions;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs::read_to_string;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Transcoder binary; must accept arbitrary media on stdin and honor the
    /// raw PCM output flags.
    pub transcoder_binary: String,

    /// yt-dlp binary used by the youtube-dl resolver.
    pub ytdlp_binary: String,

    /// Initial playback volume, 0.0 to 1.0.
    pub volume: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transcoder_binary: "ffmpeg".to_string(),
            ytdlp_binary: "yt-dlp".to_string(),
            volume: 0.5,
        }
    }
}

impl Config {
    pub fn player_options(&self) -> PlayerOptions {
        PlayerOptions {
            transcode: TranscodeCommand::with_binary(&self.transcoder_binary),
            volume: self.volume,
        }
    }
}

pub async fn load() -> Result<Config> {
    load_from("Config.toml").await
}

/// Load configuration from a TOML file; a missing file yields the defaults.
pub async fn load_from(path: impl AsRef<Path>) -> Result<Config> {
    let raw = match read_to_string(path.as_ref()).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No config file found, using defaults");
            return Ok(Config::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config: Config = toml::from_str(&raw)?;

    Ok(config)
}
