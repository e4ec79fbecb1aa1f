//! Server-push event stream.
//!
//! Each connection gets its own poll task and fingerprint pair. The producer
//! task and the SSE body communicate over an mpsc channel: when the client
//! tears the transport down the receiver is dropped, the next `send` fails,
//! and the producer exits, taking its interval timer with it. That channel
//! failure is the closed-flag check; there is no window in which a write can
//! land on a dead connection.

use super::fingerprint::ConnectionTracker;
use super::server::ApiServer;
use crate::db::StateStore;
use axum::extract::State;
use axum::http::{header, HeaderName};
use axum::response::sse::{Event, Sse};
use axum::response::{AppendHeaders, IntoResponse};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// How many events may queue per connection before the producer awaits the
/// consumer. Snapshots are sent at most two per tick, so this never fills
/// under a live client.
const CHANNEL_CAPACITY: usize = 32;

/// `GET /api/events` — long-lived event stream.
pub(crate) async fn events(State(state): State<ApiServer>) -> impl IntoResponse {
    let (tx, mut rx) = mpsc::channel::<Event>(CHANNEL_CAPACITY);
    let store: Arc<dyn StateStore> = state.db().clone();
    tokio::spawn(run_connection(store, tx, state.poll_interval()));

    let stream = futures::stream::poll_fn(move |cx| {
        rx.poll_recv(cx).map(|event| event.map(Ok::<_, Infallible>))
    });

    (
        // Intermediaries must not cache or buffer the stream, or heartbeats
        // and pushes arrive late.
        AppendHeaders([
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ]),
        Sse::new(stream),
    )
}

/// Per-connection poll loop: cold-start snapshots, then one detection pass
/// plus a heartbeat per tick until the client goes away.
pub(crate) async fn run_connection(
    store: Arc<dyn StateStore>,
    tx: mpsc::Sender<Event>,
    poll_interval: Duration,
) {
    let mut tracker = ConnectionTracker::default();

    let connected = Event::default()
        .event("connected")
        .data(r#"{"status":"connected"}"#);
    if tx.send(connected).await.is_err() {
        return;
    }

    // Cold start: push full snapshots immediately so the client does not
    // wait out the first poll interval. An empty board still gets its empty
    // array. A failed read here just defers the snapshot to the first
    // successful tick, since the tracker has not advanced.
    if !poll_once(&store, &tx, &mut tracker).await {
        return;
    }

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first interval tick completes immediately; the cold start above
    // already covered it.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        if !poll_once(&store, &tx, &mut tracker).await {
            return;
        }

        // Comment-only heartbeat every tick keeps proxies from timing out
        // the connection during quiet periods.
        if tx.send(Event::default().comment("heartbeat")).await.is_err() {
            debug!("event stream client disconnected");
            return;
        }
    }
}

/// One detection pass. Returns false when the connection is gone.
async fn poll_once(
    store: &Arc<dyn StateStore>,
    tx: &mpsc::Sender<Event>,
    tracker: &mut ConnectionTracker,
) -> bool {
    let (tasks_result, watcher_result) =
        tokio::join!(store.get_all_tasks(), store.get_watcher_config());

    // A failed read skips this entity for the tick; the loop never dies on
    // a store error.
    match tasks_result {
        Ok(tasks) => {
            if tracker.observe_tasks(&tasks) && !send_json(tx, "tasks", &tasks).await {
                return false;
            }
        }
        Err(e) => warn!("task read failed during poll tick: {e:#}"),
    }

    match watcher_result {
        Ok(config) => {
            if tracker.observe_watcher(&config) && !send_json(tx, "watcher", &config).await {
                return false;
            }
        }
        Err(e) => warn!("watcher read failed during poll tick: {e:#}"),
    }

    true
}

/// Serialize and send one named event. Returns false when the connection is
/// gone; a serialization failure only drops that event.
async fn send_json<T: Serialize>(tx: &mpsc::Sender<Event>, name: &str, payload: &T) -> bool {
    let event = match Event::default().event(name).json_data(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!("failed to serialize '{name}' event: {e}");
            return true;
        }
    };
    if tx.send(event).await.is_err() {
        debug!("event stream client disconnected during '{name}' send");
        return false;
    }
    true
}
