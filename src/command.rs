use crate::host::ConnectionId;
use crate::playback::Player;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Matches chat markup tags such as [b]...[/b] or [URL]...[/URL].
    static ref MARKUP_TAG_RE: Regex = Regex::new(r"\[/?[A-Za-z0-9_]+\]").unwrap();
}

/// Remove all chat markup tags, start and end, from a text.
pub fn strip_markup(text: &str) -> String {
    MARKUP_TAG_RE.replace_all(text, "").into_owned()
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Volume normalized to 0.0..=1.0.
    Volume(f64),
    Play {
        url: String,
        credential: Option<String>,
    },
    Stop,
}

/// Parse one chat message into a command.
///
/// Returns `Ok(None)` for messages that are no command at all, and a
/// human-readable rejection message for commands with invalid arguments.
pub fn parse(message: &str) -> Result<Option<Command>, String> {
    let text = strip_markup(message);
    let mut fields = text.split_whitespace();
    let Some(command) = fields.next() else {
        return Ok(None);
    };

    match command {
        "volume" => {
            let Some(value) = fields.next() else {
                return Err("You need at least a volume value (0 to 100).".to_string());
            };
            let value: f64 = value.parse().map_err(|e| format!("{e}"))?;
            if !(0.0..=100.0).contains(&value) {
                return Err("Volume value needs to be in valid range (0 to 100).".to_string());
            }
            Ok(Some(Command::Volume(value / 100.0)))
        }
        "play" => {
            let Some(url) = fields.next() else {
                return Err("You need at least the URL to play back.".to_string());
            };
            Ok(Some(Command::Play {
                url: url.to_string(),
                credential: fields.next().map(|s| s.to_string()),
            }))
        }
        "stop" => Ok(Some(Command::Stop)),
        _ => Ok(None),
    }
}

/// Execute a chat command against the player. Returns the reply to send back
/// to the requester, if any.
pub async fn dispatch(
    player: &Player,
    connection: ConnectionId,
    message: &str,
) -> Option<String> {
    let command = match parse(message) {
        Ok(Some(command)) => command,
        Ok(None) => return None,
        Err(reply) => return Some(reply),
    };

    match command {
        Command::Volume(volume) => {
            player.set_volume(volume);
            debug!("Volume is now: {volume}");
            None
        }
        Command::Play { url, credential } => {
            match player.play(connection, &url, credential.as_deref()).await {
                Ok(()) => None,
                Err(e) => Some(format!("Can not start playback of {url}: {e}")),
            }
        }
        Command::Stop => match player.stop(connection).await {
            Ok(()) => Some("Stopped playback.".to_string()),
            Err(e) => Some(format!("Can not stop playback: {e}")),
        },
    }
}
