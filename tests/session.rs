//! End-to-end session tests against an in-process mock application.
//!
//! The mock serves the control protocol on an ephemeral port: it
//! accepts WebSocket connections, answers frames through a
//! test-supplied handler, and can inject spontaneous events.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use voicelink::{Action, ClientEvent, Error, EventKind, Session, SessionState, ToggleKind};

// ============================================================================
// Mock Application
// ============================================================================

/// Maps one inbound frame to zero or more reply frames.
type Handler = Arc<dyn Fn(&Value) -> Vec<Value> + Send + Sync>;

struct MockApp {
    port: u16,
    inject_tx: mpsc::UnboundedSender<Value>,
}

impl MockApp {
    /// Binds an ephemeral port and serves connections until dropped.
    ///
    /// Each accepted connection runs the same handler; a closed
    /// connection returns the mock to accepting, which lets the
    /// discovery probe connect-and-close before the real connection.
    async fn spawn(handler: Handler) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let port = listener.local_addr().expect("local addr").port();
        let (inject_tx, mut inject_rx) = mpsc::unbounded_channel::<Value>();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let Ok(mut ws) = accept_async(stream).await else {
                    continue;
                };

                loop {
                    tokio::select! {
                        frame = ws.next() => match frame {
                            Some(Ok(Message::Text(text))) => {
                                let Ok(value) = serde_json::from_str::<Value>(text.as_str())
                                else {
                                    continue;
                                };
                                for reply in handler(&value) {
                                    if ws
                                        .send(Message::Text(reply.to_string().into()))
                                        .await
                                        .is_err()
                                    {
                                        return;
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                            _ => {}
                        },
                        injected = inject_rx.recv() => match injected {
                            Some(value) => {
                                let _ = ws
                                    .send(Message::Text(value.to_string().into()))
                                    .await;
                            }
                            None => return,
                        },
                    }
                }
            }
        });

        Self { port, inject_tx }
    }

    /// Pushes a spontaneous frame to the current connection.
    fn inject(&self, frame: Value) {
        let _ = self.inject_tx.send(frame);
    }
}

/// Correlated reply echoing the request id.
fn reply_to(frame: &Value, action: &str, action_object: Value) -> Value {
    json!({
        "actionType": action,
        "actionID": frame["id"].as_str().unwrap_or_default(),
        "actionObject": action_object,
    })
}

/// Successful registration reply.
fn accept_registration(frame: &Value) -> Value {
    json!({
        "actionType": "registerClient",
        "actionID": frame["id"].as_str().unwrap_or_default(),
        "payload": { "status": { "code": "200", "message": "registered" } },
    })
}

/// Handler that registers any client and answers nothing else.
fn register_only() -> Handler {
    Arc::new(|frame| {
        if frame["action"] == "registerClient" {
            vec![accept_registration(frame)]
        } else {
            Vec::new()
        }
    })
}

/// Session aimed at the mock with fast timeouts and no reconnect.
fn session_for(app: &MockApp) -> Session {
    Session::new(
        Session::builder()
            .host("127.0.0.1")
            .client_key("test-key")
            .ports([app.port])
            .probe_timeout(Duration::from_millis(500))
            .request_timeout(Duration::from_secs(2))
            .reconnect(false)
            .build()
            .expect("valid config"),
    )
}

/// A port with nothing listening; bound then immediately released.
async fn dead_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_connect_registers_and_reaches_ready() {
    let app = MockApp::spawn(register_only()).await;
    let session = session_for(&app);

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let registered_tx = events_tx.clone();
    session.subscribe(EventKind::Registered, move |_| {
        let _ = registered_tx.send("registered");
    });
    session.subscribe(EventKind::Connected, move |_| {
        let _ = events_tx.send("connected");
    });

    session.connect().await.expect("connect");

    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.is_ready());
    assert_eq!(events_rx.recv().await, Some("registered"));
    assert_eq!(events_rx.recv().await, Some("connected"));

    session.disconnect();
}

#[tokio::test]
async fn test_rejected_registration_fails_connect() {
    let handler: Handler = Arc::new(|frame| {
        if frame["action"] == "registerClient" {
            vec![json!({
                "actionType": "registerClient",
                "actionID": frame["id"].as_str().unwrap_or_default(),
                "payload": { "status": { "code": "403", "message": "invalid key" } },
            })]
        } else {
            Vec::new()
        }
    });
    let app = MockApp::spawn(handler).await;
    let session = session_for(&app);

    let (failed_tx, mut failed_rx) = mpsc::unbounded_channel();
    session.subscribe(EventKind::RegistrationFailed, move |event| {
        if let ClientEvent::RegistrationFailed { code, .. } = event {
            let _ = failed_tx.send(code.clone());
        }
    });

    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, Error::RegistrationRejected { .. }));
    assert!(!session.is_ready());
    assert_eq!(failed_rx.recv().await.as_deref(), Some("403"));
}

#[tokio::test]
async fn test_concurrent_connects_run_one_cycle() {
    let registrations = Arc::new(AtomicUsize::new(0));

    let registrations_clone = Arc::clone(&registrations);
    let handler: Handler = Arc::new(move |frame| {
        if frame["action"] == "registerClient" {
            registrations_clone.fetch_add(1, Ordering::SeqCst);
            vec![accept_registration(frame)]
        } else {
            Vec::new()
        }
    });
    let app = MockApp::spawn(handler).await;
    let session = session_for(&app);

    // The second caller joins the first cycle instead of racing it
    // with a second discover/dial/register sequence.
    let (first, second) = tokio::join!(session.connect(), session.connect());
    first.expect("first connect");
    second.expect("second connect");

    assert!(session.is_ready());
    assert_eq!(registrations.load(Ordering::SeqCst), 1);

    session.disconnect();
}

#[tokio::test]
async fn test_disconnect_from_failure_handler_does_not_deadlock() {
    let handler: Handler = Arc::new(|frame| {
        if frame["action"] == "registerClient" {
            vec![json!({
                "actionType": "registerClient",
                "actionID": frame["id"].as_str().unwrap_or_default(),
                "payload": { "status": { "code": "403", "message": "invalid key" } },
            })]
        } else {
            Vec::new()
        }
    });
    let app = MockApp::spawn(handler).await;
    let session = session_for(&app);

    let reentrant = session.clone();
    session.subscribe(EventKind::RegistrationFailed, move |_| {
        reentrant.disconnect();
    });

    let err = timeout(Duration::from_secs(5), session.connect())
        .await
        .expect("connect settles");
    assert!(matches!(err, Err(Error::ConnectionClosed)));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_discovery_skips_dead_ports_in_order() {
    let app = MockApp::spawn(register_only()).await;
    let live = app.port;

    let session = Session::new(
        Session::builder()
            .host("127.0.0.1")
            .client_key("test-key")
            .ports([dead_port().await, dead_port().await, live])
            .probe_timeout(Duration::from_millis(500))
            .reconnect(false)
            .build()
            .expect("valid config"),
    );

    let (opened_tx, mut opened_rx) = mpsc::unbounded_channel();
    session.subscribe(EventKind::ConnectionOpened, move |event| {
        if let ClientEvent::ConnectionOpened { port } = event {
            let _ = opened_tx.send(*port);
        }
    });

    session.connect().await.expect("connect via third port");
    assert_eq!(opened_rx.recv().await, Some(live));

    session.disconnect();
}

#[tokio::test]
async fn test_connect_fails_when_nothing_listens() {
    let session = Session::new(
        Session::builder()
            .host("127.0.0.1")
            .client_key("test-key")
            .ports([dead_port().await, dead_port().await])
            .probe_timeout(Duration::from_millis(500))
            .reconnect(false)
            .build()
            .expect("valid config"),
    );

    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, Error::NoReachablePort { .. }));
    assert_eq!(session.state(), SessionState::Idle);
}

// ============================================================================
// Correlation
// ============================================================================

#[tokio::test]
async fn test_out_of_order_responses_resolve_their_own_requests() {
    // The mock holds the getUser reply until getUserLicense arrives,
    // then answers in reverse order.
    let deferred: Arc<parking_lot::Mutex<Option<Value>>> =
        Arc::new(parking_lot::Mutex::new(None));

    let deferred_clone = Arc::clone(&deferred);
    let handler: Handler = Arc::new(move |frame| match frame["action"].as_str() {
        Some("registerClient") => vec![accept_registration(frame)],
        Some("getUser") => {
            *deferred_clone.lock() =
                Some(reply_to(frame, "getUser", json!({ "userID": "user-1" })));
            Vec::new()
        }
        Some("getUserLicense") => {
            let held = deferred_clone.lock().take();
            let mut replies = vec![reply_to(
                frame,
                "getUserLicense",
                json!({ "licenseType": "pro" }),
            )];
            replies.extend(held);
            replies
        }
        _ => Vec::new(),
    });

    let app = MockApp::spawn(handler).await;
    let session = session_for(&app);
    session.connect().await.expect("connect");

    let (user, license) = tokio::join!(
        session.request(Action::GetUser, json!({})),
        async {
            // Let getUser reach the mock first.
            sleep(Duration::from_millis(100)).await;
            session.request(Action::GetUserLicense, json!({})).await
        }
    );

    assert_eq!(user.expect("user reply").get_string("userID"), "user-1");
    assert_eq!(
        license.expect("license reply").get_string("licenseType"),
        "pro"
    );

    session.disconnect();
}

#[tokio::test]
async fn test_disconnect_fails_every_outstanding_request() {
    // Registration succeeds; everything else is never answered.
    let app = MockApp::spawn(register_only()).await;
    let session = session_for(&app);
    session.connect().await.expect("connect");

    let mut outstanding = Vec::new();
    for _ in 0..3 {
        let session = session.clone();
        outstanding.push(tokio::spawn(async move {
            session.request(Action::GetVoices, json!({})).await
        }));
    }

    sleep(Duration::from_millis(100)).await;
    session.disconnect();

    for task in outstanding {
        let result = timeout(Duration::from_millis(500), task)
            .await
            .expect("resolved promptly")
            .expect("task not cancelled");
        assert!(matches!(result, Err(Error::RequestFailed { .. })));
    }
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn test_cached_voices_cost_one_request() {
    let fetches = Arc::new(AtomicUsize::new(0));

    let fetches_clone = Arc::clone(&fetches);
    let handler: Handler = Arc::new(move |frame| match frame["action"].as_str() {
        Some("registerClient") => vec![accept_registration(frame)],
        Some("getVoices") => {
            fetches_clone.fetch_add(1, Ordering::SeqCst);
            vec![reply_to(
                frame,
                "getVoices",
                json!({
                    "voices": [
                        { "id": "baby", "friendlyName": "Baby", "enabled": true },
                        { "id": "robot", "friendlyName": "Robot", "enabled": true },
                    ],
                    "currentVoice": "baby",
                }),
            )]
        }
        _ => Vec::new(),
    });

    let app = MockApp::spawn(handler).await;
    let session = session_for(&app);
    session.connect().await.expect("connect");

    let first = session.voices().await.expect("fetched");
    let second = session.voices().await.expect("cached");

    assert_eq!(first.len(), 2);
    assert_eq!(first.len(), second.len());
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    // The list reply also seeded the current voice.
    let current = session.current_voice().await.expect("current");
    assert_eq!(current.id, "baby");

    session.disconnect();
}

#[tokio::test]
async fn test_spontaneous_voice_event_updates_cache() {
    let app = MockApp::spawn(register_only()).await;
    let session = session_for(&app);

    let (changed_tx, mut changed_rx) = mpsc::unbounded_channel();
    session.subscribe(EventKind::VoiceChanged, move |event| {
        if let ClientEvent::VoiceChanged { voice_id, .. } = event {
            let _ = changed_tx.send(voice_id.clone());
        }
    });

    session.connect().await.expect("connect");

    app.inject(json!({
        "action": "voiceLoadedEvent",
        "actionObject": { "voiceID": "robot" },
    }));

    let voice_id = timeout(Duration::from_secs(2), changed_rx.recv())
        .await
        .expect("event arrives")
        .expect("channel open");
    assert_eq!(voice_id, "robot");
    assert_eq!(
        session.cache_snapshot().current_voice_id.as_deref(),
        Some("robot")
    );

    session.disconnect();
}

#[tokio::test]
async fn test_toggle_event_updates_cache_and_fans_out() {
    let app = MockApp::spawn(register_only()).await;
    let session = session_for(&app);

    let (muted_tx, mut muted_rx) = mpsc::unbounded_channel();
    session.subscribe(EventKind::MuteMicChanged, move |event| {
        if let ClientEvent::MuteMicChanged { enabled } = event {
            let _ = muted_tx.send(*enabled);
        }
    });

    session.connect().await.expect("connect");

    app.inject(json!({ "action": "muteMicEnabledEvent", "actionObject": {} }));

    let enabled = timeout(Duration::from_secs(2), muted_rx.recv())
        .await
        .expect("event arrives")
        .expect("channel open");
    assert!(enabled);

    // The cached flag now serves without a round-trip; the mock never
    // answers getMuteMicStatus.
    assert!(session.mute_mic_status().await.expect("cached"));

    session.disconnect();
}

#[tokio::test]
async fn test_malformed_toggle_echo_is_rejected_not_cached() {
    // The echoed reply carries no boolean `value`; the accessor must
    // fail instead of fabricating `false`.
    let handler: Handler = Arc::new(|frame| match frame["action"].as_str() {
        Some("registerClient") => vec![accept_registration(frame)],
        Some("toggleMuteMic") => vec![reply_to(frame, "toggleMuteMic", json!({}))],
        _ => Vec::new(),
    });
    let app = MockApp::spawn(handler).await;
    let session = session_for(&app);
    session.connect().await.expect("connect");

    let err = session.toggle_mute_mic().await.unwrap_err();
    assert!(matches!(err, Error::Protocol { .. }));
    assert!(
        session
            .cache_snapshot()
            .toggle(ToggleKind::MuteMic)
            .is_none()
    );

    session.disconnect();
}

// ============================================================================
// Event Surface
// ============================================================================

#[tokio::test]
async fn test_raw_firehose_sees_every_frame() {
    let app = MockApp::spawn(register_only()).await;
    let session = session_for(&app);

    let frames = Arc::new(AtomicUsize::new(0));
    let frames_clone = Arc::clone(&frames);
    session.subscribe_all(move |_| {
        frames_clone.fetch_add(1, Ordering::SeqCst);
    });

    session.connect().await.expect("connect");

    app.inject(json!({ "action": "voiceLoadedEvent", "actionObject": { "voiceID": "x" } }));
    app.inject(json!({ "not": "an envelope at all" }));

    sleep(Duration::from_millis(300)).await;

    // Registration reply + both injected frames.
    assert_eq!(frames.load(Ordering::SeqCst), 3);

    session.disconnect();
}

#[tokio::test]
async fn test_pending_auth_notice_surfaces_as_event() {
    let app = MockApp::spawn(register_only()).await;
    let session = session_for(&app);

    let (pending_tx, mut pending_rx) = mpsc::unbounded_channel();
    session.subscribe(EventKind::RegistrationPending, move |event| {
        if let ClientEvent::RegistrationPending { message } = event {
            let _ = pending_tx.send(message.clone());
        }
    });

    session.connect().await.expect("connect");

    app.inject(json!({ "msg": "Pending authentication" }));

    let message = timeout(Duration::from_secs(2), pending_rx.recv())
        .await
        .expect("event arrives")
        .expect("channel open");
    assert_eq!(message.to_ascii_lowercase(), "pending authentication");

    session.disconnect();
}
