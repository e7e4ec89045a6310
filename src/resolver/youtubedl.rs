//! yt-dlp backed resolver for everything its extractors support.

use super::{ByteStream, Resolution, ResolvedStream, Resolver};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::Cursor;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context as TaskContext, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::process::{Child, ChildStdout, Command};
use url::Url;
use youtube_dl::YoutubeDl;

const RESOLVER_ID: &str = "youtube-dl";

pub struct YoutubeDlResolver {
    binary: String,
}

impl YoutubeDlResolver {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl Resolver for YoutubeDlResolver {
    fn id(&self) -> &str {
        RESOLVER_ID
    }

    async fn resolve(&self, url: &Url, credential: Option<&str>) -> Result<Resolution> {
        if !matches!(url.scheme(), "http" | "https") {
            return Ok(Resolution::NotApplicable);
        }

        // Metadata lookup doubles as the compatibility check: yt-dlp calling
        // the URL unsupported means the next resolver should get a chance.
        let mut lookup = YoutubeDl::new(url.to_string());
        lookup
            .youtube_dl_path(&self.binary)
            .format("bestaudio/best")
            .extra_arg("--no-playlist");
        if let Some(credential) = credential {
            lookup.extra_arg("--video-password").extra_arg(credential);
        }
        let title = match lookup.run_async().await {
            Ok(output) => output.into_single_video().and_then(|video| video.title),
            Err(youtube_dl::Error::ExitCode { stderr, .. })
                if stderr.contains("Unsupported URL") =>
            {
                return Ok(Resolution::NotApplicable);
            }
            Err(e) => return Err(e).context("yt-dlp metadata lookup failed"),
        };

        // Spawn yt-dlp ourselves so we can capture stdout as a stream
        let mut command = Command::new(&self.binary);
        command
            .arg(url.as_str())
            .arg("--no-progress")
            .arg("--no-playlist")
            .arg("--format")
            .arg("bestaudio/best")
            .arg("-o")
            .arg("-");
        if let Some(credential) = credential {
            command.arg("--video-password").arg(credential);
        }

        let mut child = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("failed to spawn yt-dlp")?;

        let stdout = child.stdout.take().context("failed to get yt-dlp stdout")?;
        let stderr = child.stderr.take().context("failed to get yt-dlp stderr")?;

        // Lead the diagnostic stream with the command line so the log shows
        // what was actually run.
        let banner = format!("{} {}\n", self.binary, url);
        let diagnostics: ByteStream = Box::new(Cursor::new(banner.into_bytes()).chain(stderr));

        let stream: ByteStream = Box::new(ChildStream { child, stdout });

        Ok(Resolution::Matched(ResolvedStream {
            stream,
            diagnostics: Some(diagnostics),
            title,
        }))
    }
}

/// stdout of a child process; dropping the stream also takes the process
/// down via kill-on-drop.
struct ChildStream {
    #[allow(dead_code)]
    child: Child,
    stdout: ChildStdout,
}

impl AsyncRead for ChildStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stdout).poll_read(cx, buf)
    }
}
