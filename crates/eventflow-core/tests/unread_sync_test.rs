//! End-to-end convergence tests: REST reconcile, gateway push and bus
//! events all driving the same badge surfaces.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::timeout;

use eventflow_core::gateway::GatewayClient;
use eventflow_core::unread::{
    BadgeSurface, BadgeView, UnreadBadgeManager, UnreadCountSource, UnreadSyncService,
};
use eventflow_core::{ApiClient, CoreConfig, CoreEvent, EventBus};

struct RestFixture {
    unread: AtomicI64,
}

async fn unread_handler(State(state): State<Arc<RestFixture>>) -> Json<Value> {
    Json(json!({ "count": state.unread.load(Ordering::SeqCst) }))
}

async fn mark_read_handler(State(state): State<Arc<RestFixture>>) -> Json<Value> {
    state.unread.store(0, Ordering::SeqCst);
    Json(json!({ "count": 0 }))
}

async fn start_rest(state: Arc<RestFixture>) -> String {
    let app = Router::new()
        .route("/api/me/messages/unread", get(unread_handler))
        .route(
            "/api/conversations/:id/read",
            axum::routing::post(mark_read_handler),
        )
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

struct PushFixture {
    frames: broadcast::Sender<String>,
}

impl PushFixture {
    fn new() -> Arc<Self> {
        let (frames, _) = broadcast::channel(32);
        Arc::new(Self { frames })
    }

    fn push(&self, frame: &str) {
        let _ = self.frames.send(frame.to_string());
    }
}

async fn ws_handler(
    State(state): State<Arc<PushFixture>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| push_session(socket, state))
}

async fn push_session(mut socket: WebSocket, state: Arc<PushFixture>) {
    let mut frames = state.frames.subscribe();
    let Some(Ok(Message::Text(first))) = socket.recv().await else {
        return;
    };
    let header: Value = serde_json::from_str(&first).unwrap_or_default();
    if header["type"] != "subscribe" {
        return;
    }
    if socket
        .send(Message::Text(r#"{"type":"ready"}"#.to_string()))
        .await
        .is_err()
    {
        return;
    }
    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(text) => {
                    if socket.send(Message::Text(text)).await.is_err() {
                        return;
                    }
                }
                Err(_) => return,
            },
            message = socket.recv() => match message {
                Some(Ok(Message::Close(_))) | None => return,
                Some(_) => {}
            },
        }
    }
}

async fn start_push(state: Arc<PushFixture>) -> String {
    let app = Router::new()
        .route("/gateway", get(ws_handler))
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{addr}/gateway")
}

fn recording_surface(log: &Arc<Mutex<Vec<BadgeView>>>) -> Box<dyn BadgeSurface> {
    let log = Arc::clone(log);
    Box::new(move |view: &BadgeView| log.lock().push(view.clone()))
}

struct Harness {
    rest: Arc<RestFixture>,
    push: Arc<PushFixture>,
    api: ApiClient,
    bus: EventBus,
    counts: tokio::sync::watch::Receiver<i64>,
    navbar: Arc<Mutex<Vec<BadgeView>>>,
    menu: Arc<Mutex<Vec<BadgeView>>>,
    gateway_ready: eventflow_core::gateway::GatewayHandle,
}

/// Stand up both fixtures and a running sync service around them.
async fn start_harness(initial_unread: i64, poll_interval: Duration) -> Harness {
    let rest = Arc::new(RestFixture {
        unread: AtomicI64::new(initial_unread),
    });
    let base_url = start_rest(Arc::clone(&rest)).await;

    let push = PushFixture::new();
    let ws_url = start_push(Arc::clone(&push)).await;

    let mut config = CoreConfig::new(base_url, ws_url.clone(), "me");
    config.request_timeout = Duration::from_secs(2);
    let api = ApiClient::new(&config).unwrap();

    let (gateway, handle) = GatewayClient::new(ws_url, "me");
    tokio::spawn(gateway.run());

    let navbar = Arc::new(Mutex::new(Vec::new()));
    let menu = Arc::new(Mutex::new(Vec::new()));
    let mut manager = UnreadBadgeManager::new();
    manager.register("navbar", recording_surface(&navbar));
    manager.register("mobile_menu", recording_surface(&menu));

    let bus = EventBus::new();
    let service = UnreadSyncService::new(
        manager,
        Arc::new(api.clone()) as Arc<dyn UnreadCountSource>,
        handle.clone(),
        bus.clone(),
        poll_interval,
    );
    let counts = service.counts();
    tokio::spawn(service.run());

    Harness {
        rest,
        push,
        api,
        bus,
        counts,
        navbar,
        menu,
        gateway_ready: handle,
    }
}

async fn wait_for_count(harness: &mut Harness, expected: i64) {
    timeout(
        Duration::from_secs(5),
        harness.counts.wait_for(|count| *count == expected),
    )
    .await
    .unwrap_or_else(|_| panic!("count never converged to {expected}"))
    .unwrap();
}

#[tokio::test]
async fn test_startup_reconcile_then_push_convergence() {
    let mut harness = start_harness(7, Duration::from_secs(60)).await;

    // Startup reconcile applies the store's count to every surface.
    wait_for_count(&mut harness, 7).await;
    assert_eq!(harness.navbar.lock().last().unwrap().text, "7");
    assert_eq!(harness.menu.lock().last().unwrap().text, "7");

    // A push supersedes it everywhere at once.
    timeout(Duration::from_secs(2), harness.gateway_ready.ready())
        .await
        .unwrap();
    harness.push.push(r#"{"type":"unread:update","count":12}"#);
    wait_for_count(&mut harness, 12).await;

    let navbar_last = harness.navbar.lock().last().unwrap().clone();
    let menu_last = harness.menu.lock().last().unwrap().clone();
    assert_eq!(navbar_last, menu_last);
    assert_eq!(navbar_last.text, "12");
    assert_eq!(navbar_last.label, "12 unread messages");
}

#[tokio::test]
async fn test_repeated_push_is_rendered_once() {
    let mut harness = start_harness(0, Duration::from_secs(60)).await;
    timeout(Duration::from_secs(2), harness.gateway_ready.ready())
        .await
        .unwrap();

    harness.push.push(r#"{"type":"unread:update","count":4}"#);
    wait_for_count(&mut harness, 4).await;
    harness.push.push(r#"{"type":"unread:update","count":4}"#);
    harness.push.push(r#"{"type":"unread:update","count":5}"#);
    wait_for_count(&mut harness, 5).await;

    // The duplicate arrived between the two observed values, so it has been
    // processed; it must not have produced a second render.
    let renders_of_four = harness
        .navbar
        .lock()
        .iter()
        .filter(|view| view.text == "4")
        .count();
    assert_eq!(renders_of_four, 1);
}

#[tokio::test]
async fn test_display_caps_but_label_stays_exact() {
    let mut harness = start_harness(0, Duration::from_secs(60)).await;
    timeout(Duration::from_secs(2), harness.gateway_ready.ready())
        .await
        .unwrap();

    harness.push.push(r#"{"type":"unread:update","count":250}"#);
    wait_for_count(&mut harness, 250).await;

    let view = harness.navbar.lock().last().unwrap().clone();
    assert_eq!(view.text, "99+");
    assert_eq!(view.label, "250 unread messages");
    assert!(view.visible);
}

#[tokio::test]
async fn test_poll_corrects_count_without_push() {
    let mut harness = start_harness(2, Duration::from_millis(100)).await;
    wait_for_count(&mut harness, 2).await;

    // The store moves on; no push is ever sent.
    harness.rest.unread.store(9, Ordering::SeqCst);
    wait_for_count(&mut harness, 9).await;

    assert_eq!(harness.navbar.lock().last().unwrap().text, "9");
    assert_eq!(harness.menu.lock().last().unwrap().text, "9");
}

#[tokio::test]
async fn test_mark_read_flows_through_the_bus() {
    let mut harness = start_harness(5, Duration::from_secs(60)).await;
    wait_for_count(&mut harness, 5).await;

    // Marking read returns the new aggregate; publishing it on the bus
    // converges every surface without another fetch.
    let remaining = harness.api.mark_conversation_read("conv-1").await.unwrap();
    assert_eq!(remaining, 0);
    harness
        .bus
        .publish(CoreEvent::UnreadCountUpdated { count: remaining });

    wait_for_count(&mut harness, 0).await;
    let view = harness.navbar.lock().last().unwrap().clone();
    assert!(!view.visible);
    assert_eq!(view.text, "");
}
