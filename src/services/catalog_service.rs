use crate::models::lookup::{BadgeTables, CatalogStatus, LookupSnapshot};
use crate::models::settings::OverlaySettings;
use crate::services::badge_service::BadgeService;
use crate::services::emote_service::EmoteService;
use crate::services::twitch_service::{http_client, resolve_channel_id};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Shared, atomically swapped catalog snapshot. Readers hold an `Arc` for a whole
/// render pass, so a refresh never changes tables under a message being composed.
#[derive(Clone, Default)]
pub struct CatalogHandle(Arc<RwLock<Arc<LookupSnapshot>>>);

impl CatalogHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: LookupSnapshot) -> Self {
        CatalogHandle(Arc::new(RwLock::new(Arc::new(snapshot))))
    }

    pub async fn current(&self) -> Arc<LookupSnapshot> {
        self.0.read().await.clone()
    }

    pub async fn publish(&self, snapshot: LookupSnapshot) {
        *self.0.write().await = Arc::new(snapshot);
    }
}

pub struct CatalogService {
    settings: Arc<OverlaySettings>,
    client: reqwest::Client,
    badges: BadgeService,
    emotes: EmoteService,
    handle: CatalogHandle,
}

impl CatalogService {
    pub fn new(settings: Arc<OverlaySettings>, handle: CatalogHandle) -> Self {
        let client = http_client();
        Self {
            settings,
            badges: BadgeService::new(client.clone()),
            emotes: EmoteService::new(client.clone()),
            client,
            handle,
        }
    }

    /// Fetch everything and publish a fresh snapshot. Failures degrade to empty tables.
    pub async fn refresh(&self) {
        let snapshot = self.load().await;
        log::info!(
            "[Catalogs] Published: {} global / {} channel badge sets, {} emote keys",
            snapshot.badges.global.len(),
            snapshot.badges.channel.len(),
            snapshot.emotes.len()
        );
        self.handle.publish(snapshot).await;
    }

    async fn load(&self) -> LookupSnapshot {
        let settings = &self.settings;
        let mut status = CatalogStatus::default();

        let id_proxy = if settings.id_proxy.is_empty() {
            &settings.badge_proxy
        } else {
            &settings.id_proxy
        };
        if id_proxy.is_empty() {
            status.id_error = Some("no idProxy".to_string());
        } else {
            match resolve_channel_id(&self.client, id_proxy, &settings.channel).await {
                Ok(id) => status.channel_id = Some(id),
                Err(e) => {
                    log::warn!("[Catalogs] Channel ID resolve failed: {}", e);
                    status.id_error = Some("id resolve failed".to_string());
                }
            }
        }
        let channel_id = status.channel_id.clone();

        let mut badges = BadgeTables::default();
        if settings.badges_enabled() {
            match self.badges.fetch_global(&settings.badge_proxy).await {
                Ok(table) => badges.global = table,
                Err(e) => {
                    log::warn!("[Catalogs] Global badges failed: {}", e);
                    status.badge_error = Some("global fetch failed".to_string());
                }
            }
            if let Some(channel_id) = channel_id.as_deref() {
                match self.badges.fetch_channel(&settings.badge_proxy, channel_id).await {
                    Ok(table) => badges.channel = table,
                    Err(e) => {
                        log::warn!("[Catalogs] Channel badges failed: {}", e);
                        status
                            .badge_error
                            .get_or_insert_with(|| "channel fetch failed".to_string());
                    }
                }
            }
        }

        let (emotes, emote_errors) = self
            .emotes
            .fetch_emotes(&settings.emotes, channel_id.as_deref())
            .await;
        status.emote_errors = emote_errors;

        LookupSnapshot {
            emotes,
            badges,
            status,
        }
    }

    /// Refresh every `cache_minutes`; the first refresh is expected to be done by the caller.
    pub fn spawn_refresh_loop(self: Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        let minutes = self.settings.emotes.cache_minutes;
        if minutes == 0 {
            return None;
        }
        Some(tokio::spawn(async move {
            let period = Duration::from_secs(minutes * 60);
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                log::info!("[Catalogs] Refreshing after {} minutes", minutes);
                self.refresh().await;
            }
        }))
    }
}
