//! Coordinator tests against a scripted device
//!
//! Most tests run on a paused tokio clock: loads, sampling ticks and sleeps
//! advance virtual time only. Publishing order is checked on a multi-thread
//! runtime with real time.

mod common;

use beat_core::SongId;
use beat_playback::{
    Coordinator, PlaybackConfig, PlaybackError, PlaybackEvent, TransportState,
};
use common::{catalog, song, wait_for, DeviceCall, MockDevice, LOAD_DELAY, TRACK_MS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn spawn(
    device: &Arc<MockDevice>,
    ids: &[&str],
) -> (
    beat_playback::CoordinatorHandle,
    watch::Sender<Arc<Vec<beat_core::Song>>>,
) {
    let (catalog_tx, catalog_rx) = watch::channel(Arc::new(catalog(ids)));
    let handle = Coordinator::spawn(PlaybackConfig::default(), device.clone(), catalog_rx);
    (handle, catalog_tx)
}

fn is_playing(id: &'static str) -> impl FnMut(&beat_playback::PlaybackSnapshot) -> bool {
    move |s| {
        s.status == TransportState::Playing
            && s.current_song.as_ref().map(|song| song.id.as_str()) == Some(id)
    }
}

#[tokio::test(start_paused = true)]
async fn play_song_loads_then_plays() {
    let device = MockDevice::new();
    let (handle, _catalog) = spawn(&device, &["A", "B", "C"]);

    handle.play_song(song("A")).await.unwrap();
    assert!(handle.snapshot().is_loading);

    let snapshot = wait_for(&handle, is_playing("A")).await;
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.duration_ms, TRACK_MS);

    assert_eq!(device.loads(), vec!["https://cdn.example.com/A.mp3"]);
    assert_eq!(device.count(&DeviceCall::Play), 1);
}

#[tokio::test(start_paused = true)]
async fn initial_volume_is_applied() {
    let device = MockDevice::new();
    let (handle, _catalog) = spawn(&device, &["A"]);

    // Round-trip through the task so startup has been flushed
    handle.set_repeat_one(false).await.unwrap();

    assert!(matches!(device.calls().first(), Some(DeviceCall::SetVolume(_))));
}

#[tokio::test(start_paused = true)]
async fn superseded_load_never_plays() {
    let device = MockDevice::new();
    let (handle, _catalog) = spawn(&device, &["A", "B"]);

    handle.play_song(song("A")).await.unwrap();
    handle.play_song(song("B")).await.unwrap();

    wait_for(&handle, is_playing("B")).await;
    tokio::time::sleep(LOAD_DELAY * 4).await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.current_song.unwrap().id, SongId::new("B"));
    assert_eq!(device.count(&DeviceCall::Play), 1);
}

#[tokio::test(start_paused = true)]
async fn late_track_end_does_not_skip_new_song() {
    let device = MockDevice::new();
    let (handle, _catalog) = spawn(&device, &["A", "B", "C"]);

    for _ in 0..8 {
        handle.play_song(song("A")).await.unwrap();
        wait_for(&handle, is_playing("A")).await;

        // A's end and B's load completion reach the coordinator together
        device.end_during_next_load();
        handle.play_song(song("B")).await.unwrap();
        wait_for(&handle, is_playing("B")).await;

        tokio::time::sleep(LOAD_DELAY * 4).await;
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.status, TransportState::Playing);
        assert_eq!(snapshot.current_song.unwrap().id, SongId::new("B"));
    }

    assert!(!device.loads().iter().any(|l| l.ends_with("/C.mp3")));
}

#[tokio::test(start_paused = true)]
async fn load_failure_goes_idle_with_error() {
    let device = MockDevice::new();
    device.fail_loading("https://cdn.example.com/A.mp3");
    let (handle, _catalog) = spawn(&device, &["A", "B"]);
    let mut events = handle.events();

    handle.play_song(song("A")).await.unwrap();

    let snapshot = wait_for(&handle, |s| s.error.is_some()).await;
    assert_eq!(snapshot.status, TransportState::Idle);
    assert!(!snapshot.is_loading);
    assert!(snapshot.current_song.is_none());
    assert_eq!(device.count(&DeviceCall::Play), 0);

    let mut saw_error = false;
    while let Ok(event) = events.try_recv() {
        saw_error |= event.is_error();
    }
    assert!(saw_error);
}

#[tokio::test(start_paused = true)]
async fn position_is_sampled_while_playing() {
    let device = MockDevice::new();
    let (handle, _catalog) = spawn(&device, &["A"]);

    handle.play_song(song("A")).await.unwrap();
    wait_for(&handle, is_playing("A")).await;

    device.set_position(5_000);
    let snapshot = wait_for(&handle, |s| s.position_ms == 5_000).await;
    assert!(snapshot.position_ms <= snapshot.duration_ms);
}

#[tokio::test(start_paused = true)]
async fn sampling_stops_when_paused() {
    let device = MockDevice::new();
    let (handle, _catalog) = spawn(&device, &["A"]);

    handle.play_song(song("A")).await.unwrap();
    wait_for(&handle, is_playing("A")).await;
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(device.position_reads() > 0);

    handle.toggle_play_pause().await.unwrap();
    assert_eq!(handle.snapshot().status, TransportState::Paused);

    let reads = device.position_reads();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(device.position_reads(), reads);

    handle.toggle_play_pause().await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(device.position_reads() > reads);
}

#[tokio::test(start_paused = true)]
async fn scrub_suspends_sampling_and_seeks_once() {
    let device = MockDevice::new();
    let (handle, _catalog) = spawn(&device, &["A"]);

    handle.play_song(song("A")).await.unwrap();
    wait_for(&handle, is_playing("A")).await;

    handle.begin_scrub().await.unwrap();
    assert!(handle.snapshot().scrubbing);

    let reads = device.position_reads();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(device.position_reads(), reads);

    let committed = handle.end_scrub(7_000).await.unwrap();
    assert_eq!(committed, 7_000);
    assert_eq!(handle.snapshot().position_ms, 7_000);
    assert!(!handle.snapshot().scrubbing);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(device.count(&DeviceCall::Seek(7_000)), 1);
    assert!(device.position_reads() > reads);
}

#[tokio::test(start_paused = true)]
async fn seek_is_clamped_and_rejected_when_idle() {
    let device = MockDevice::new();
    let (handle, _catalog) = spawn(&device, &["A"]);

    let result = handle.seek_to(1_000).await;
    assert!(matches!(result, Err(PlaybackError::InvalidOperation(_))));

    handle.play_song(song("A")).await.unwrap();
    wait_for(&handle, is_playing("A")).await;

    assert_eq!(handle.seek_to(-5).await.unwrap(), 0);
    assert_eq!(handle.seek_to(i64::MAX).await.unwrap(), TRACK_MS);
}

#[tokio::test(start_paused = true)]
async fn track_end_advances_to_next() {
    let device = MockDevice::new();
    let (handle, _catalog) = spawn(&device, &["A", "B", "C"]);
    let mut events = handle.events();

    handle.play_song(song("A")).await.unwrap();
    wait_for(&handle, is_playing("A")).await;

    device.end_track();
    wait_for(&handle, is_playing("B")).await;

    let mut finished = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let PlaybackEvent::TrackFinished { song_id } = event {
            finished.push(song_id);
        }
    }
    assert_eq!(finished, vec![SongId::new("A")]);
}

#[tokio::test(start_paused = true)]
async fn track_end_with_repeat_one_replays() {
    let device = MockDevice::new();
    let (handle, _catalog) = spawn(&device, &["A", "B"]);

    handle.set_repeat_one(true).await.unwrap();
    handle.play_song(song("A")).await.unwrap();
    wait_for(&handle, is_playing("A")).await;

    device.end_track();
    tokio::time::sleep(LOAD_DELAY * 2).await;
    let snapshot = wait_for(&handle, is_playing("A")).await;

    assert!(snapshot.repeat_one);
    assert_eq!(
        device.loads(),
        vec![
            "https://cdn.example.com/A.mp3",
            "https://cdn.example.com/A.mp3"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn catalog_refresh_does_not_interrupt_playback() {
    let device = MockDevice::new();
    let (handle, catalog_tx) = spawn(&device, &["A", "B"]);

    handle.play_song(song("A")).await.unwrap();
    wait_for(&handle, is_playing("A")).await;

    catalog_tx.send_replace(Arc::new(catalog(&["X", "Y"])));
    tokio::time::sleep(Duration::from_secs(2)).await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.status, TransportState::Playing);
    assert_eq!(snapshot.current_song.unwrap().id, SongId::new("A"));

    // A is gone from the new catalog: next starts from the top
    handle.skip_to_next().await.unwrap();
    assert_eq!(
        handle.snapshot().current_song.unwrap().id,
        SongId::new("X")
    );
}

#[tokio::test(start_paused = true)]
async fn skip_on_empty_catalog_is_reported() {
    let device = MockDevice::new();
    let (handle, _catalog) = spawn(&device, &[]);

    let result = handle.skip_to_next().await;
    assert!(matches!(result, Err(PlaybackError::QueueEmpty)));
    assert_eq!(handle.snapshot().status, TransportState::Idle);
    assert!(handle.snapshot().error.is_some());
}

#[tokio::test(start_paused = true)]
async fn transport_failure_keeps_state() {
    let device = MockDevice::new();
    let (handle, _catalog) = spawn(&device, &["A"]);

    handle.play_song(song("A")).await.unwrap();
    wait_for(&handle, is_playing("A")).await;

    device.fail_transport(true);
    handle.toggle_play_pause().await.unwrap();

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.status, TransportState::Paused);
    assert_eq!(snapshot.current_song.unwrap().id, SongId::new("A"));
    assert!(snapshot.error.unwrap().contains("output unavailable"));
}

#[tokio::test(start_paused = true)]
async fn shuffle_and_repeat_are_published() {
    let device = MockDevice::new();
    let (handle, _catalog) = spawn(&device, &["A", "B", "C"]);

    handle.toggle_shuffle().await.unwrap();
    handle.toggle_repeat_one().await.unwrap();
    let snapshot = handle.snapshot();
    assert!(snapshot.shuffle);
    assert!(snapshot.repeat_one);

    handle.set_shuffle(false).await.unwrap();
    assert!(!handle.snapshot().shuffle);
}

#[tokio::test(start_paused = true)]
async fn volume_and_mute_reach_device() {
    let device = MockDevice::new();
    let (handle, _catalog) = spawn(&device, &["A"]);

    handle.set_volume(100).await.unwrap();
    handle.mute().await.unwrap();
    assert!(handle.snapshot().muted);
    assert_eq!(handle.snapshot().volume, 100);

    handle.toggle_mute().await.unwrap();
    assert!(!handle.snapshot().muted);

    let calls = device.calls();
    assert!(calls.contains(&DeviceCall::SetVolume(0.0)));
    assert!(calls.contains(&DeviceCall::SetVolume(1.0)));
}

#[tokio::test(start_paused = true)]
async fn shutdown_pauses_and_closes() {
    let device = MockDevice::new();
    let (handle, _catalog) = spawn(&device, &["A"]);

    handle.play_song(song("A")).await.unwrap();
    wait_for(&handle, is_playing("A")).await;

    handle.shutdown().await;

    assert_eq!(device.count(&DeviceCall::Pause), 1);
    let result = handle.play_song(song("A")).await;
    assert!(matches!(result, Err(PlaybackError::CoordinatorClosed)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn snapshot_is_published_before_events() {
    let device = MockDevice::new();
    let (handle, _catalog) = spawn(&device, &["A", "B"]);
    let mut events = handle.events();

    for id in ["A", "B", "A", "B"] {
        handle.play_song(song(id)).await.unwrap();

        let snapshot = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match events.recv().await.unwrap() {
                    PlaybackEvent::StateChanged {
                        state: TransportState::Playing,
                    } => break handle.snapshot(),
                    _ => continue,
                }
            }
        })
        .await
        .expect("timed out waiting for playback");

        assert_eq!(snapshot.status, TransportState::Playing);
        assert_eq!(snapshot.current_song.unwrap().id, SongId::new(id));
    }
}
