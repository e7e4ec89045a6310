//! Streams remotely-resolved audio into a live voice-chat connection.
//!
//! A URL is resolved to a raw media stream by a pluggable resolver, piped
//! through an external transcoder into 48 kHz stereo 16-bit PCM, buffered
//! through a bounded channel and injected frame by frame into the host's
//! outgoing voice buffer, mixed with live microphone input.

#[macro_use]
extern crate log;

pub mod command;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod error;
pub mod host;
pub mod playback;
pub mod resolver;
pub mod sample;
pub mod voice;
