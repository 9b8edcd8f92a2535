//! Session coordination: failure channel, peer controllers, stale events,
//! refresh and teardown

use std::sync::Arc;

use chatmedia_common::events::{FailureEvent, FailureKind};
use chatmedia_common::RawMessage;
use chatmedia_engine::controller::{ControllerSignal, DisplayState, PlayerState};
use chatmedia_engine::{
    MediaSession, MediaSurface, MessageMeta, NullSurface, ResolutionState, SessionConfig,
    Transition,
};
use serde_json::json;
use uuid::Uuid;

fn image_session(id: &str) -> MediaSession {
    let raw = RawMessage::default()
        .with_id(id)
        .with_type("image")
        .with_body(json!({"imageMessage": {"url": "https://cdn.example.com/p.jpg"}}));
    MediaSession::open(
        &raw,
        MessageMeta::new("https://chat.example.com"),
        &SessionConfig::default(),
    )
}

fn video_session(id: &str, config: &SessionConfig) -> MediaSession {
    let raw = RawMessage::default().with_id(id).with_type("video");
    MediaSession::open(&raw, MessageMeta::new("https://chat.example.com"), config)
}

/// Surface that records every load request
#[derive(Clone, Default)]
struct RecordingSurface {
    loads: Arc<std::sync::Mutex<Vec<String>>>,
}

impl MediaSurface for RecordingSurface {
    fn load(&mut self, locator: &str) {
        self.loads.lock().unwrap().push(locator.to_string());
    }
}

#[test]
fn test_peer_display_failure_advances_once() {
    let mut session = image_session("1");
    let mut first = session.static_controller(Box::new(NullSurface)).unwrap();
    let mut second = session.static_controller(Box::new(NullSurface)).unwrap();

    first.on_error("404");
    assert!(matches!(
        second.poll_peers(),
        ControllerSignal::FailurePublished {
            kind: FailureKind::AlternateRequested,
            ..
        }
    ));

    // Both reports name the same locator; only the first one advances
    assert_eq!(
        session.pump(),
        vec![Transition::Advanced { from: 0, to: 1 }, Transition::Stale]
    );
    assert_eq!(session.state(), Some(ResolutionState::Active(1)));
}

#[test]
fn test_peer_player_auto_advances_without_threshold() {
    let mut session = video_session("2", &SessionConfig::default());
    let mut failing = session.av_controller(Box::new(NullSurface)).unwrap();
    let mut peer = session.av_controller(Box::new(NullSurface)).unwrap();

    failing.on_load_error("network");
    assert!(!failing.can_try_alternate());
    peer.poll_peers();

    assert_eq!(
        session.pump(),
        vec![Transition::Ignored, Transition::Advanced { from: 0, to: 1 }]
    );

    let next = session.active_locator().unwrap().to_string();
    failing.rebind(&next);
    peer.rebind(&next);
    assert_eq!(failing.state(), PlayerState::Loading);
    assert_eq!(peer.locator(), next);
}

#[test]
fn test_local_retries_stay_on_same_candidate() {
    let config = SessionConfig {
        max_local_retries: 2,
        ..SessionConfig::default()
    };
    let mut session = video_session("3", &config);
    let surface = RecordingSurface::default();
    let loads = Arc::clone(&surface.loads);
    let mut player = session.av_controller(Box::new(surface)).unwrap();

    player.on_load_error("timeout");
    player.retry();
    player.on_load_error("timeout");

    assert_eq!(session.pump(), vec![Transition::Ignored, Transition::Ignored]);
    assert_eq!(session.state(), Some(ResolutionState::Active(0)));

    let first = session.candidates()[0].locator.clone();
    assert_eq!(*loads.lock().unwrap(), vec![first.clone(), first]);

    assert!(player.can_try_alternate());
    player.try_alternate();
    assert_eq!(session.pump(), vec![Transition::Advanced { from: 0, to: 1 }]);
}

#[test]
fn test_late_success_for_previous_locator_is_stale() {
    let mut session = image_session("4");
    let mut display = session.static_controller(Box::new(NullSurface)).unwrap();
    let first = display.locator().to_string();

    display.on_error("decode");
    session.pump();

    assert_eq!(session.report_success(&first), Transition::Stale);
    assert_eq!(session.state(), Some(ResolutionState::Active(1)));
}

#[test]
fn test_events_for_other_messages_are_not_applied() {
    let mut session = image_session("5");
    let active = session.active_locator().unwrap().to_string();

    session.channel().publish_lossy(FailureEvent::new(
        "some-other-message",
        active.as_str(),
        1,
        FailureKind::DisplayFailed,
        Uuid::new_v4(),
    ));

    assert!(session.pump().is_empty());
    assert_eq!(session.state(), Some(ResolutionState::Active(0)));
}

#[test]
fn test_retry_discards_pending_events() {
    let mut session = image_session("6");
    let mut display = session.static_controller(Box::new(NullSurface)).unwrap();
    display.on_error("404");

    assert_eq!(session.retry(), Transition::Reset);
    assert!(session.pump().is_empty());
    assert_eq!(session.state(), Some(ResolutionState::Active(0)));
}

#[test]
fn test_refresh_with_same_message_keeps_session() {
    let mut session = image_session("7");
    let channel = Arc::clone(session.channel());

    let same = RawMessage::default()
        .with_id("7")
        .with_type("image")
        .with_body(json!({"imageMessage": {"url": "https://cdn.example.com/p.jpg"}}));
    assert!(!session.refresh(&same));
    assert!(Arc::ptr_eq(&channel, session.channel()));
}

#[test]
fn test_refresh_without_message_id_keeps_resolved_session() {
    let raw = RawMessage::default()
        .with_type("image")
        .with_body("https://cdn.example.com/a.png");
    let mut session = MediaSession::open(
        &raw,
        MessageMeta::new("https://chat.example.com"),
        &SessionConfig::default(),
    );
    let key = session.key().to_string();
    let channel = Arc::clone(session.channel());

    let active = session.active_locator().unwrap().to_string();
    assert_eq!(session.report_success(&active), Transition::Resolved(0));

    assert!(!session.refresh(&raw));
    assert_eq!(session.key(), key);
    assert!(Arc::ptr_eq(&channel, session.channel()));
    assert_eq!(session.state(), Some(ResolutionState::Resolved));
}

#[test]
fn test_refresh_without_message_id_rebuilds_on_new_address() {
    let raw = RawMessage::default()
        .with_type("image")
        .with_body("https://cdn.example.com/a.png");
    let mut session = MediaSession::open(
        &raw,
        MessageMeta::new("https://chat.example.com"),
        &SessionConfig::default(),
    );
    let key = session.key().to_string();

    let changed = RawMessage::default()
        .with_type("image")
        .with_body("https://cdn.example.com/b.png");
    assert!(session.refresh(&changed));
    assert_eq!(session.key(), key);
    assert_eq!(
        session.active_locator(),
        Some("https://cdn.example.com/b.png")
    );
}

#[test]
fn test_refresh_tears_down_old_subscription() {
    let mut session = image_session("8");
    let old_channel = Arc::clone(session.channel());
    let mut stale_display = session.static_controller(Box::new(NullSurface)).unwrap();
    assert_eq!(old_channel.subscriber_count(), 2);

    let changed = RawMessage::default()
        .with_id("8")
        .with_type("image")
        .with_body(json!({"imageMessage": {"url": "https://cdn.example.com/q.jpg"}}));
    assert!(session.refresh(&changed));

    assert!(!Arc::ptr_eq(&old_channel, session.channel()));
    assert_eq!(old_channel.subscriber_count(), 1);
    assert_eq!(
        session.active_locator(),
        Some("https://cdn.example.com/q.jpg")
    );

    // The old controller still publishes on the old channel; nobody applies it
    stale_display.on_error("404");
    assert!(session.pump().is_empty());
    assert_eq!(session.state(), Some(ResolutionState::Active(0)));
}

#[test]
fn test_close_unsubscribes() {
    let session = image_session("9");
    let channel = Arc::clone(session.channel());
    assert_eq!(channel.subscriber_count(), 1);

    session.close();
    assert_eq!(channel.subscriber_count(), 0);
}

#[test]
fn test_displayed_controller_ignores_peer_failures() {
    let mut session = image_session("10");
    let mut shown = session.static_controller(Box::new(NullSurface)).unwrap();
    let mut failing = session.static_controller(Box::new(NullSurface)).unwrap();

    shown.on_loaded();
    failing.on_error("network");

    assert_eq!(shown.poll_peers(), ControllerSignal::None);
    assert_eq!(shown.state(), DisplayState::Displayed);
}

#[tokio::test]
async fn test_next_transition_awaits_events() {
    let mut session = image_session("11");
    let mut display = session.static_controller(Box::new(NullSurface)).unwrap();

    let publisher = tokio::spawn(async move {
        tokio::task::yield_now().await;
        display.on_error("404");
        display
    });

    let transition = session.next_transition().await;
    assert_eq!(transition, Some(Transition::Advanced { from: 0, to: 1 }));
    publisher.await.unwrap();
}
