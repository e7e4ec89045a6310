//! Integration tests for the chat command surface.
//!
//! Drives the player exclusively through text commands, the way the host
//! forwards chat messages.

mod common;

use common::*;
use voicy_rs::command::dispatch;

#[tokio::test]
async fn test_play_command_starts_playback() {
    let (player, _host) = test_player(vec![0u8; 9600], 1.0);

    let reply = dispatch(&player, CONNECTION, "play https://example.com/track").await;
    assert!(reply.is_none());
    assert!(player.is_playing().await);

    player.stop(CONNECTION).await.unwrap();
}

#[tokio::test]
async fn test_second_play_command_is_rejected() {
    let (player, _host) = test_player(vec![0u8; 9600], 1.0);

    dispatch(&player, CONNECTION, "play https://example.com/a").await;
    let reply = dispatch(&player, CONNECTION, "play https://example.com/b").await;

    let reply = reply.expect("expected a rejection reply");
    assert!(reply.contains("already a running playback"));
    assert!(player.is_playing().await);

    player.stop(CONNECTION).await.unwrap();
}

#[tokio::test]
async fn test_stop_command_stops_and_replies() {
    let (player, host) = test_player(vec![0u8; 9600], 1.0);

    dispatch(&player, CONNECTION, "play https://example.com/track").await;
    let reply = dispatch(&player, CONNECTION, "stop").await;

    assert_eq!(reply.as_deref(), Some("Stopped playback."));
    assert!(!player.is_playing().await);
    assert_eq!(host.calls(), vec![(CONNECTION, false), (CONNECTION, true)]);
}

#[tokio::test]
async fn test_play_command_strips_chat_markup() {
    let (player, _host) = test_player(vec![0u8; 9600], 1.0);

    let reply = dispatch(
        &player,
        CONNECTION,
        "play [URL]https://example.com/track[/URL]",
    )
    .await;
    assert!(reply.is_none());
    assert!(player.is_playing().await);

    player.stop(CONNECTION).await.unwrap();
}

#[tokio::test]
async fn test_unsupported_url_reports_back() {
    let (player, _host) = test_player(vec![], 1.0);

    // The static resolver claims every URL; a malformed one never reaches it
    let reply = dispatch(&player, CONNECTION, "play not-a-valid-url").await;
    let reply = reply.expect("expected a rejection reply");
    assert!(reply.starts_with("Can not start playback of not-a-valid-url:"));
    assert!(!player.is_playing().await);
}

#[tokio::test]
async fn test_volume_command_validates_range() {
    let (player, _host) = test_player(vec![], 1.0);

    assert!(dispatch(&player, CONNECTION, "volume 75").await.is_none());
    assert_eq!(player.volume(), 0.75);

    let reply = dispatch(&player, CONNECTION, "volume 150").await;
    assert_eq!(
        reply.as_deref(),
        Some("Volume value needs to be in valid range (0 to 100).")
    );
    assert_eq!(player.volume(), 0.75);
}
