use crate::models::lookup::LookupSnapshot;
use crate::models::settings::OverlaySettings;
use crate::services::bubble_service::RenderSink;
use crate::services::catalog_service::CatalogHandle;
use std::sync::Arc;

/// One-line status: mode, limits, catalog state, transport status, errors.
pub fn format_status(settings: &OverlaySettings, catalogs: &LookupSnapshot, status_text: &str) -> String {
    let mode = if settings.demo { "DEMO" } else { "IRC" };
    let on_off = |on: bool| if on { "on" } else { "off" };
    let badges_on = settings.badges_enabled();
    let badge_sets = on_off(badges_on && catalogs.badges_ready());

    let providers = &settings.emotes.providers;
    let provider_flags: Vec<&str> = [
        (providers.bttv.enabled, "BTTV"),
        (providers.seven_tv.enabled, "7TV"),
        (providers.ffz.enabled, "FFZ"),
    ]
    .into_iter()
    .filter(|(on, _)| *on)
    .map(|(_, name)| name)
    .collect();

    let style_bits: Vec<String> = [
        ("badgeSize", "badge"),
        ("emoteSize", "emote"),
        ("textSize", "text"),
        ("nameSize", "name"),
    ]
    .into_iter()
    .filter_map(|(key, label)| settings.style.get(key).map(|v| format!("{}={}", label, v)))
    .collect();

    let mut line = format!(
        "{} | ch={} | max={} | ttl={}s | fade={}s | badges={} | emotes={} | badgeSets={}, 3pEmotes={}",
        mode,
        settings.channel,
        settings.max,
        settings.ttl,
        settings.fade,
        on_off(badges_on),
        on_off(settings.emotes.enabled),
        badge_sets,
        catalogs.emotes.len(),
    );
    if !provider_flags.is_empty() {
        line.push_str(&format!(" [{}]", provider_flags.join(",")));
    }
    if !style_bits.is_empty() {
        line.push_str(&format!(" | style({})", style_bits.join(",")));
    }
    if !status_text.is_empty() {
        line.push_str(&format!(" | {}", status_text));
    }
    if let Some(err) = &catalogs.status.badge_error {
        line.push_str(&format!(" | badgeErr={}", err));
    }
    if let Some(err) = &catalogs.status.id_error {
        line.push_str(&format!(" | idErr={}", err));
    }
    line
}

/// Pushes status lines to the log, and to the overlay when debugging.
#[derive(Clone)]
pub struct StatusReporter {
    settings: Arc<OverlaySettings>,
    catalogs: CatalogHandle,
    sink: Arc<dyn RenderSink>,
}

impl StatusReporter {
    pub fn new(settings: Arc<OverlaySettings>, catalogs: CatalogHandle, sink: Arc<dyn RenderSink>) -> Self {
        Self {
            settings,
            catalogs,
            sink,
        }
    }

    pub async fn report(&self, status_text: &str) {
        let snapshot = self.catalogs.current().await;
        let line = format_status(&self.settings, &snapshot, status_text);
        log::info!("[Status] {}", line);
        if self.settings.debug {
            self.sink.status(&line);
        }
    }
}
