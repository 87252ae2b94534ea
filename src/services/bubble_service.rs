use crate::models::bubble::{Bubble, BubbleId, LifecycleSettings};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Visual surface the bubbles are rendered on.
pub trait RenderSink: Send + Sync + 'static {
    fn present(&self, bubble: &Bubble);
    fn remove(&self, id: BubbleId);
    fn begin_fade(&self, _id: BubbleId) {}
    fn status(&self, _text: &str) {}
}

#[derive(Default)]
struct Timers {
    fade: Option<JoinHandle<()>>,
    expire: Option<JoinHandle<()>>,
}

impl Timers {
    fn cancel(&mut self) {
        if let Some(handle) = self.fade.take() {
            handle.abort();
        }
        if let Some(handle) = self.expire.take() {
            handle.abort();
        }
    }
}

struct LiveBubble {
    bubble: Bubble,
    fading: bool,
    timers: Timers,
}

#[derive(Default)]
struct BubbleStack {
    // oldest first
    entries: VecDeque<LiveBubble>,
}

impl BubbleStack {
    fn position(&self, id: BubbleId) -> Option<usize> {
        self.entries.iter().position(|e| e.bubble.id == id)
    }

    fn get_mut(&mut self, id: BubbleId) -> Option<&mut LiveBubble> {
        self.entries.iter_mut().find(|e| e.bubble.id == id)
    }

    fn take(&mut self, id: BubbleId) -> Option<LiveBubble> {
        let idx = self.position(id)?;
        self.entries.remove(idx)
    }
}

/// Offset of the fade transition, only when `0 < fade < ttl`.
fn fade_start(ttl: Duration, fade: f64) -> Option<Duration> {
    let fade = Duration::try_from_secs_f64(fade).ok().filter(|f| !f.is_zero())?;
    if fade >= ttl {
        return None;
    }
    Some(ttl - fade)
}

#[derive(Clone, Copy)]
enum TimerAction {
    Fade,
    Expire,
}

/// Owns the live bubbles: capacity eviction plus TTL/fade removal.
pub struct BubbleService<S: RenderSink> {
    settings: LifecycleSettings,
    stack: Arc<Mutex<BubbleStack>>,
    sink: Arc<S>,
}

impl<S: RenderSink> BubbleService<S> {
    pub fn new(settings: LifecycleSettings, sink: Arc<S>) -> Self {
        Self {
            settings: LifecycleSettings {
                max: settings.max.max(1),
                ..settings
            },
            stack: Arc::new(Mutex::new(BubbleStack::default())),
            sink,
        }
    }

    pub fn settings(&self) -> LifecycleSettings {
        self.settings
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    /// Append a bubble, evict the oldest past `max`, and arm its timers.
    pub async fn insert(&self, bubble: Bubble) -> BubbleId {
        let id = bubble.id;
        let mut stack = self.stack.lock().await;

        self.sink.present(&bubble);
        stack.entries.push_back(LiveBubble {
            bubble,
            fading: false,
            timers: Timers::default(),
        });

        while stack.entries.len() > self.settings.max {
            if let Some(mut evicted) = stack.entries.pop_front() {
                evicted.timers.cancel();
                self.sink.remove(evicted.bubble.id);
                log::debug!("[Bubbles] Evicted {} (cap {})", evicted.bubble.id, self.settings.max);
            }
        }

        // Timers are attached under the same lock so a removal can always cancel them
        if self.settings.ttl > 0 {
            let ttl = Duration::from_secs(self.settings.ttl);
            let mut timers = Timers::default();
            if let Some(fade_at) = fade_start(ttl, self.settings.fade) {
                timers.fade = Some(self.schedule(id, fade_at, TimerAction::Fade));
            }
            timers.expire = Some(self.schedule(id, ttl, TimerAction::Expire));

            if let Some(entry) = stack.get_mut(id) {
                entry.timers = timers;
            }
        }

        id
    }

    /// Remove a bubble ahead of its timers. Returns false if it was already gone.
    pub async fn remove(&self, id: BubbleId) -> bool {
        let mut stack = self.stack.lock().await;
        match stack.take(id) {
            Some(mut entry) => {
                entry.timers.cancel();
                self.sink.remove(id);
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.stack.lock().await.entries.len()
    }

    /// Live bubbles, oldest first.
    pub async fn live(&self) -> Vec<Bubble> {
        let stack = self.stack.lock().await;
        stack.entries.iter().map(|e| e.bubble.clone()).collect()
    }

    pub async fn is_fading(&self, id: BubbleId) -> bool {
        let mut stack = self.stack.lock().await;
        stack.get_mut(id).is_some_and(|e| e.fading)
    }

    fn schedule(&self, id: BubbleId, delay: Duration, action: TimerAction) -> JoinHandle<()> {
        let stack = self.stack.clone();
        let sink = self.sink.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut stack = stack.lock().await;
            match action {
                TimerAction::Fade => {
                    if let Some(entry) = stack.get_mut(id) {
                        entry.fading = true;
                        entry.timers.fade = None;
                        sink.begin_fade(id);
                    }
                }
                TimerAction::Expire => {
                    if let Some(mut entry) = stack.take(id) {
                        // Drop our own handle before cancelling the rest
                        entry.timers.expire = None;
                        entry.timers.cancel();
                        sink.remove(id);
                    }
                }
            }
        })
    }
}
