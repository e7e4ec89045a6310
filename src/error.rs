use thiserror::Error;

/// Errors produced by the transcoder process wrapper and its decode loop.
#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("failed to launch transcoder: {0}")]
    Launch(#[source] std::io::Error),

    #[error("transcoder pipe error: {0}")]
    Pipe(#[from] std::io::Error),

    /// The decode loop assembled more than one sample pair in a single step.
    /// Only reachable if the sample reader returns more values than requested.
    #[error("got more than 2 sample values for one pair, logic error")]
    DecodeLogic,

    #[error("decoder was already closed")]
    AlreadyClosed,
}

/// Errors surfaced by the playback orchestrator.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("there is already a running playback that needs to be stopped first")]
    AlreadyPlaying,

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("the URL {0:?} could not be resolved, please check if you spelled it correctly")]
    UnresolvedUrl(String),

    #[error("resolver failed: {0}")]
    Resolver(#[source] anyhow::Error),

    #[error(transparent)]
    Decoder(#[from] DecoderError),

    #[error("unsupported channel count: {0}")]
    UnsupportedChannelCount(usize),
}

/// Fatal resolver registry misconfiguration.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a resolver with id {0:?} was already registered")]
    DuplicateResolver(String),
}
