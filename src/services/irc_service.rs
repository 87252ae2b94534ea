use crate::models::chat_message::ParsedMessage;
use crate::services::bubble_service::{BubbleService, RenderSink};
use crate::services::catalog_service::CatalogHandle;
use crate::services::composer::compose;
use crate::services::debug_banner::StatusReporter;
use crate::services::irc_parser::parse_privmsg;
use anyhow::Result;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};

pub const IRC_WS_URL: &str = "wss://irc-ws.chat.twitch.tv:443";

const PING_PREFIX: &str = "PING";
const PONG_REPLY: &str = "PONG :tmi.twitch.tv";
const PRIVMSG_MARKER: &str = " PRIVMSG #";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Disconnected,
    Connecting,
    Joined,
}

/// Delay before the next connection attempt.
pub trait ReconnectStrategy: Send {
    fn next_delay(&mut self) -> Duration;
}

/// Same delay every time, retried forever.
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff(pub Duration);

impl Default for FixedBackoff {
    fn default() -> Self {
        FixedBackoff(Duration::from_secs(2))
    }
}

impl ReconnectStrategy for FixedBackoff {
    fn next_delay(&mut self) -> Duration {
        self.0
    }
}

/// Read-only guest login, `justinfan1000`..`justinfan80999`.
pub fn anonymous_nick() -> String {
    format!("justinfan{}", rand::rng().random_range(1000..81000))
}

pub fn login_commands(channel: &str, nick: &str) -> Vec<String> {
    vec![
        "CAP REQ :twitch.tv/tags twitch.tv/commands".to_string(),
        // Anonymous logins accept any password
        "PASS SCHMOOPIIE".to_string(),
        format!("NICK {}", nick),
        format!("JOIN #{}", channel.trim_start_matches('#').to_lowercase()),
    ]
}

/// What one inbound payload asks of the transport.
#[derive(Debug, Default, PartialEq)]
pub struct PayloadOutcome {
    pub replies: Vec<String>,
    pub messages: Vec<ParsedMessage>,
}

/// Split a (possibly multiplexed) payload, answer keep-alives and parse chat lines
/// in wire order.
pub fn handle_payload(payload: &str) -> PayloadOutcome {
    let mut outcome = PayloadOutcome::default();

    for line in payload.split("\r\n").filter(|l| !l.is_empty()) {
        if line.starts_with(PING_PREFIX) {
            outcome.replies.push(PONG_REPLY.to_string());
            continue;
        }
        if !line.contains(PRIVMSG_MARKER) {
            continue;
        }
        if let Some(message) = parse_privmsg(line) {
            outcome.messages.push(message);
        }
    }

    outcome
}

/// Anonymous chat connection feeding composed bubbles into a [`BubbleService`].
pub struct IrcService<S: RenderSink> {
    channel: String,
    url: String,
    emotes_enabled: bool,
    bubbles: Arc<BubbleService<S>>,
    catalogs: CatalogHandle,
    reporter: Option<StatusReporter>,
    state: TransportState,
}

impl<S: RenderSink> IrcService<S> {
    pub fn new(
        channel: &str,
        emotes_enabled: bool,
        bubbles: Arc<BubbleService<S>>,
        catalogs: CatalogHandle,
    ) -> Self {
        Self {
            channel: channel.to_string(),
            url: IRC_WS_URL.to_string(),
            emotes_enabled,
            bubbles,
            catalogs,
            reporter: None,
            state: TransportState::Disconnected,
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn with_reporter(mut self, reporter: StatusReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Connect, read until the link drops, wait, repeat. Never returns.
    pub async fn run<R: ReconnectStrategy>(mut self, mut backoff: R) {
        loop {
            self.set_state(TransportState::Connecting);
            log::info!("[IRC Chat] Connecting to {}...", self.url);

            match connect_async(self.url.as_str()).await {
                Ok((ws_stream, _)) => {
                    let (write, read) = ws_stream.split();
                    match self.run_session(write, read).await {
                        Ok(()) => log::info!("[IRC Chat] Connection closed by server"),
                        Err(e) => {
                            log::error!("[IRC Chat] Connection error: {}", e);
                            self.report("WebSocket error (network)").await;
                        }
                    }
                }
                Err(e) => {
                    log::error!("[IRC Chat] Connect failed: {}", e);
                    self.report("WebSocket error (network)").await;
                }
            }

            self.set_state(TransportState::Disconnected);
            let delay = backoff.next_delay();
            log::info!("[IRC Chat] Reconnecting in {:?}...", delay);
            self.report(&format!("Disconnected, retrying in {}s", delay.as_secs_f64()))
                .await;
            tokio::time::sleep(delay).await;
        }
    }

    /// Drive one connection: log in, then route payloads until the stream ends.
    pub async fn run_session<W, R, E>(&mut self, mut write: W, mut read: R) -> Result<()>
    where
        W: Sink<Message> + Unpin,
        W::Error: std::error::Error + Send + Sync + 'static,
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: std::error::Error + Send + Sync + 'static,
    {
        let nick = anonymous_nick();
        for command in login_commands(&self.channel, &nick) {
            write.send(Message::Text(command.into())).await?;
        }
        log::info!("[IRC Chat] Logged in as {}, joining #{}", nick, self.channel);
        self.report(&format!("Connected as {}", nick)).await;

        while let Some(frame) = read.next().await {
            match frame? {
                Message::Text(text) => {
                    // No join ack in scope: any traffic after login confirms it
                    if self.state != TransportState::Joined {
                        self.set_state(TransportState::Joined);
                    }

                    let outcome = handle_payload(text.as_str());
                    for reply in outcome.replies {
                        write.send(Message::Text(reply.into())).await?;
                    }
                    if outcome.messages.is_empty() {
                        continue;
                    }

                    let snapshot = self.catalogs.current().await;
                    for message in outcome.messages {
                        let bubble = compose(message, &snapshot, self.emotes_enabled);
                        self.bubbles.insert(bubble).await;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        Ok(())
    }

    fn set_state(&mut self, next: TransportState) {
        if self.state != next {
            log::debug!("[IRC Chat] {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    async fn report(&self, status_text: &str) {
        if let Some(reporter) = &self.reporter {
            reporter.report(status_text).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bubble::{Bubble, BubbleId, LifecycleSettings};
    use crate::models::lookup::LookupSnapshot;
    use crate::models::settings::OverlaySettings;
    use futures::channel::mpsc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite;

    #[derive(Default)]
    struct CollectSink {
        presented: StdMutex<Vec<Bubble>>,
        statuses: StdMutex<Vec<String>>,
    }

    impl RenderSink for CollectSink {
        fn present(&self, bubble: &Bubble) {
            self.presented.lock().unwrap().push(bubble.clone());
        }

        fn remove(&self, _id: BubbleId) {}

        fn status(&self, text: &str) {
            self.statuses.lock().unwrap().push(text.to_string());
        }
    }

    /// Zero delay, counting how often a retry was scheduled.
    struct CountingBackoff(Arc<AtomicUsize>);

    impl ReconnectStrategy for CountingBackoff {
        fn next_delay(&mut self) -> Duration {
            self.0.fetch_add(1, Ordering::SeqCst);
            Duration::ZERO
        }
    }

    fn debug_reporter(sink: Arc<CollectSink>) -> StatusReporter {
        let settings = OverlaySettings {
            debug: true,
            ..OverlaySettings::default()
        };
        StatusReporter::new(Arc::new(settings), CatalogHandle::new(), sink)
    }

    async fn wait_for(counter: &AtomicUsize, target: usize) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while counter.load(Ordering::SeqCst) < target {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("retry loop stalled");
    }

    fn service(max: usize) -> (IrcService<CollectSink>, Arc<CollectSink>) {
        let sink = Arc::new(CollectSink::default());
        let bubbles = Arc::new(BubbleService::new(
            LifecycleSettings {
                max,
                ttl: 0,
                fade: 0.0,
            },
            sink.clone(),
        ));
        let irc = IrcService::new("SomeChannel", true, bubbles, CatalogHandle::with_snapshot(LookupSnapshot::default()));
        (irc, sink)
    }

    fn text(payload: &str) -> Result<Message, tungstenite::Error> {
        Ok(Message::Text(payload.to_string().into()))
    }

    #[test]
    fn test_login_commands() {
        let commands = login_commands("#SomeChannel", "justinfan1234");
        assert_eq!(
            commands,
            vec![
                "CAP REQ :twitch.tv/tags twitch.tv/commands",
                "PASS SCHMOOPIIE",
                "NICK justinfan1234",
                "JOIN #somechannel",
            ]
        );
    }

    #[test]
    fn test_anonymous_nick_range() {
        for _ in 0..100 {
            let nick = anonymous_nick();
            let n: u32 = nick.strip_prefix("justinfan").unwrap().parse().unwrap();
            assert!((1000..81000).contains(&n));
        }
    }

    #[test]
    fn test_ping_is_answered_not_forwarded() {
        let outcome = handle_payload("PING :tmi.twitch.tv\r\n");
        assert_eq!(outcome.replies, vec!["PONG :tmi.twitch.tv"]);
        assert!(outcome.messages.is_empty());
    }

    #[test]
    fn test_multiplexed_payload_keeps_wire_order() {
        let payload = "@display-name=A :a!a@a PRIVMSG #c :first\r\n\
                       :tmi.twitch.tv 001 justinfan1 :Welcome\r\n\
                       @display-name=B :b!b@b PRIVMSG #c :second\r\n\
                       @msg-id=sub :tmi.twitch.tv USERNOTICE #c :hello\r\n";
        let outcome = handle_payload(payload);
        let names: Vec<&str> = outcome.messages.iter().map(|m| m.sender_name.as_str()).collect();
        let texts: Vec<&str> = outcome.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(texts, vec!["first", "second"]);
        assert!(outcome.replies.is_empty());
    }

    #[test]
    fn test_fixed_backoff_is_constant() {
        let mut backoff = FixedBackoff(Duration::from_millis(0));
        assert_eq!(backoff.next_delay(), Duration::ZERO);
        assert_eq!(backoff.next_delay(), Duration::ZERO);
        assert_eq!(FixedBackoff::default().next_delay(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_session_logs_in_answers_ping_and_inserts() {
        let (mut irc, sink) = service(8);
        let (write, mut sent) = mpsc::unbounded::<Message>();
        let read = futures::stream::iter(vec![
            text(":tmi.twitch.tv 001 justinfan1 :Welcome, GLHF!"),
            text("PING :tmi.twitch.tv"),
            text("@display-name=Fyre;color=#112233;emotes=25:0-4 :fyre!fyre@fyre.tmi.twitch.tv PRIVMSG #somechannel :Kappa hello\r\n@display-name=Two :t!t@t PRIVMSG #somechannel :<3"),
        ]);

        assert_eq!(irc.state(), TransportState::Disconnected);
        irc.run_session(write, read).await.unwrap();
        assert_eq!(irc.state(), TransportState::Joined);

        drop(irc);
        let mut outgoing = Vec::new();
        while let Ok(Some(Message::Text(t))) = sent.try_next() {
            outgoing.push(t.as_str().to_string());
        }
        assert_eq!(outgoing.len(), 5);
        assert!(outgoing[2].starts_with("NICK justinfan"));
        assert_eq!(outgoing[3], "JOIN #somechannel");
        assert_eq!(outgoing[4], "PONG :tmi.twitch.tv");

        let presented = sink.presented.lock().unwrap().clone();
        assert_eq!(presented.len(), 2);
        assert_eq!(presented[0].name, "Fyre");
        assert_eq!(presented[0].color, "#112233");
        assert_eq!(presented[0].body_html[1], " hello");
        assert_eq!(presented[1].body_html, vec!["&lt;3"]);
    }

    #[tokio::test]
    async fn test_session_stops_at_close_frame() {
        let (mut irc, sink) = service(8);
        let (write, _sent) = mpsc::unbounded::<Message>();
        let read = futures::stream::iter(vec![
            Ok(Message::Close(None)),
            text("@display-name=Late :l!l@l PRIVMSG #c :too late"),
        ]);
        irc.run_session(write, read).await.unwrap();
        assert!(sink.presented.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_session_surfaces_stream_errors() {
        let (mut irc, _sink) = service(8);
        let (write, _sent) = mpsc::unbounded::<Message>();
        let read = futures::stream::iter(vec![Err::<Message, _>(tungstenite::Error::ConnectionClosed)]);
        assert!(irc.run_session(write, read).await.is_err());
    }

    #[tokio::test]
    async fn test_run_keeps_retrying_unreachable_server() {
        let (irc, sink) = service(8);
        let attempts = Arc::new(AtomicUsize::new(0));
        let irc = irc
            .with_url("ws://127.0.0.1:1")
            .with_reporter(debug_reporter(sink.clone()));
        assert_eq!(irc.state(), TransportState::Disconnected);

        let task = tokio::spawn(irc.run(CountingBackoff(attempts.clone())));
        wait_for(&attempts, 3).await;
        task.abort();

        let statuses = sink.statuses.lock().unwrap().clone();
        let failures = statuses
            .iter()
            .filter(|s| s.ends_with("| WebSocket error (network)"))
            .count();
        let retries = statuses
            .iter()
            .filter(|s| s.ends_with("| Disconnected, retrying in 0s"))
            .count();
        assert!(failures >= 3);
        assert!(retries >= 3);
        assert!(statuses[0].ends_with("| WebSocket error (network)"));
        assert!(statuses[1].ends_with("| Disconnected, retrying in 0s"));
        assert!(sink.presented.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_reconnects_after_server_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let logins = Arc::new(StdMutex::new(Vec::<String>::new()));

        let server_logins = logins.clone();
        let server = tokio::spawn(async move {
            for session in 0..3 {
                let (stream, _) = listener.accept().await.unwrap();
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                for _ in 0..4 {
                    if let Some(Ok(Message::Text(line))) = ws.next().await {
                        server_logins.lock().unwrap().push(line.as_str().to_string());
                    }
                }
                let line = format!(
                    "@display-name=Viewer{} :v!v@v PRIVMSG #somechannel :hello {}",
                    session, session
                );
                ws.send(Message::Text(line.into())).await.unwrap();
                ws.close(None).await.ok();
            }
        });

        let (irc, sink) = service(8);
        let attempts = Arc::new(AtomicUsize::new(0));
        let irc = irc.with_url(&format!("ws://{}", addr));
        let task = tokio::spawn(irc.run(CountingBackoff(attempts.clone())));

        wait_for(&attempts, 3).await;
        task.abort();
        server.await.unwrap();

        let names: Vec<String> = sink
            .presented
            .lock()
            .unwrap()
            .iter()
            .map(|b| b.name.clone())
            .collect();
        assert_eq!(names, vec!["Viewer0", "Viewer1", "Viewer2"]);

        let logins = logins.lock().unwrap().clone();
        let joins = logins.iter().filter(|l| *l == "JOIN #somechannel").count();
        assert_eq!(joins, 3);
    }
}
