use crate::models::bubble::{Bubble, BubbleId, OverlayEvent};
use crate::models::settings::OverlaySettings;
use crate::services::bubble_service::RenderSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use warp::Filter;

const CHANNEL_CAPACITY: usize = 1000;

struct SinkState {
    // serialized present events of live bubbles, oldest first
    live: Vec<(BubbleId, String)>,
    last_status: Option<String>,
}

/// Render sink that fans overlay events out to websocket clients.
///
/// Late joiners first get the live bubbles replayed in order, then the live stream.
pub struct BroadcastSink {
    tx: broadcast::Sender<String>,
    state: Mutex<SinkState>,
}

impl BroadcastSink {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel::<String>(CHANNEL_CAPACITY);
        Self {
            tx,
            state: Mutex::new(SinkState {
                live: Vec::new(),
                last_status: None,
            }),
        }
    }

    /// Replay backlog plus a receiver positioned right after it.
    pub fn subscribe(&self) -> (Vec<String>, broadcast::Receiver<String>) {
        let state = self.state();
        let rx = self.tx.subscribe();
        let mut replay: Vec<String> = state.live.iter().map(|(_, json)| json.clone()).collect();
        if let Some(status) = &state.last_status {
            replay.push(status.clone());
        }
        (replay, rx)
    }

    fn state(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn encode(event: &OverlayEvent) -> Option<String> {
        match serde_json::to_string(event) {
            Ok(json) => Some(json),
            Err(e) => {
                log::error!("[Overlay] Failed to encode event: {}", e);
                None
            }
        }
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSink for BroadcastSink {
    fn present(&self, bubble: &Bubble) {
        let Some(json) = Self::encode(&OverlayEvent::Present {
            bubble: bubble.clone(),
        }) else {
            return;
        };
        let mut state = self.state();
        state.live.push((bubble.id, json.clone()));
        // No receivers is fine, the backlog covers clients that connect later
        let _ = self.tx.send(json);
    }

    fn remove(&self, id: BubbleId) {
        let mut state = self.state();
        state.live.retain(|(live_id, _)| *live_id != id);
        if let Some(json) = Self::encode(&OverlayEvent::Remove { id }) {
            let _ = self.tx.send(json);
        }
    }

    fn begin_fade(&self, id: BubbleId) {
        // Held so a concurrent subscribe never splits backlog and stream
        let _state = self.state();
        if let Some(json) = Self::encode(&OverlayEvent::Fade { id }) {
            let _ = self.tx.send(json);
        }
    }

    fn status(&self, text: &str) {
        let Some(json) = Self::encode(&OverlayEvent::Status {
            text: text.to_string(),
        }) else {
            return;
        };
        let mut state = self.state();
        state.last_status = Some(json.clone());
        let _ = self.tx.send(json);
    }
}

/// Serve `/ws` (overlay events) and `/config` (theme and style for the page) on a
/// background task.
pub fn serve(sink: Arc<BroadcastSink>, settings: &OverlaySettings, addr: SocketAddr) -> JoinHandle<()> {
    let page_config = json!({
        "theme": settings.theme,
        "style": settings.style,
        "debug": settings.debug,
    });

    // Filters are built outside the task, the spawned future only owns the server
    let ws = warp::path("ws").and(warp::ws()).map(move |ws: warp::ws::Ws| {
        let sink = sink.clone();
        ws.on_upgrade(move |socket| handle_client(socket, sink))
    });

    let config = warp::path("config")
        .and(warp::get())
        .map(move || warp::reply::json(&page_config));

    let routes = ws.or(config).boxed();

    log::info!("[Overlay] Listening on ws://{}/ws", addr);
    tokio::spawn(async move {
        warp::serve(routes).run(addr).await;
    })
}

async fn handle_client(socket: warp::ws::WebSocket, sink: Arc<BroadcastSink>) {
    let (mut client_tx, _client_rx) = socket.split();
    let (replay, mut rx) = sink.subscribe();

    log::info!(
        "[Overlay] Client connected, replaying {} events",
        replay.len()
    );

    for json in replay {
        if client_tx.send(warp::ws::Message::text(json)).await.is_err() {
            log::info!("[Overlay] Client disconnected during replay");
            return;
        }
    }

    loop {
        match rx.recv().await {
            Ok(json) => {
                if client_tx.send(warp::ws::Message::text(json)).await.is_err() {
                    log::info!("[Overlay] Client disconnected");
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::warn!("[Overlay] Client lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bubble(name: &str) -> Bubble {
        Bubble::new(name.to_string(), "#fff".to_string(), vec![name.to_string()], Vec::new())
    }

    fn decode(json: &str) -> OverlayEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_replay_tracks_live_bubbles() {
        let sink = BroadcastSink::new();
        let a = bubble("a");
        let b = bubble("b");
        sink.present(&a);
        sink.present(&b);
        sink.remove(a.id);
        sink.status("Connected");

        let (replay, _rx) = sink.subscribe();
        let events: Vec<OverlayEvent> = replay.iter().map(|j| decode(j)).collect();
        assert_eq!(
            events,
            vec![
                OverlayEvent::Present { bubble: b },
                OverlayEvent::Status {
                    text: "Connected".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_after_replay() {
        let sink = BroadcastSink::new();
        let (replay, mut rx) = sink.subscribe();
        assert!(replay.is_empty());

        let a = bubble("a");
        sink.present(&a);
        sink.begin_fade(a.id);

        assert_eq!(decode(&rx.recv().await.unwrap()), OverlayEvent::Present { bubble: a.clone() });
        assert_eq!(decode(&rx.recv().await.unwrap()), OverlayEvent::Fade { id: a.id });
    }

    #[tokio::test]
    async fn test_server_replays_and_serves_config() {
        use tokio_tungstenite::tungstenite::Message;

        let sink = Arc::new(BroadcastSink::new());
        let live = bubble("live");
        sink.present(&live);

        let mut settings = OverlaySettings::default();
        settings.theme = "dark".to_string();
        settings.style.insert("textSize".to_string(), "20px".to_string());
        let addr = SocketAddr::from(([127, 0, 0, 1], 47817));
        let server = serve(sink.clone(), &settings, addr);

        let url = format!("ws://{}/ws", addr);
        let mut socket = None;
        for _ in 0..100 {
            if let Ok((ws, _)) = tokio_tungstenite::connect_async(url.as_str()).await {
                socket = Some(ws);
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        let mut socket = socket.expect("overlay server did not start");

        let replayed = match socket.next().await.unwrap().unwrap() {
            Message::Text(text) => decode(text.as_str()),
            other => panic!("unexpected frame {:?}", other),
        };
        assert_eq!(replayed, OverlayEvent::Present { bubble: live.clone() });

        let config: serde_json::Value = reqwest::get(format!("http://{}/config", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(config["theme"], "dark");
        assert_eq!(config["style"]["textSize"], "20px");
        assert_eq!(config["debug"], false);

        server.abort();
    }

    #[test]
    fn test_event_wire_shape() {
        let id = BubbleId::new();
        let json = serde_json::to_value(OverlayEvent::Remove { id }).unwrap();
        assert_eq!(json["type"], "remove");
        assert_eq!(json["id"], id.to_string());
    }
}
