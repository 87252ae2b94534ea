use crate::models::lookup::{EmoteProvider, EmoteTable};
use crate::models::settings::EmoteSettings;
use crate::services::twitch_service::{fetch_json, strip_trailing_slash};
use anyhow::Result;
use serde_json::Value;

const BTTV_API: &str = "https://api.betterttv.net/3";
const FFZ_API: &str = "https://api.frankerfacez.com/v1";
const SEVEN_TV_API: &str = "https://api.7tv.app/v3";

fn bttv_cdn_url(id: &str) -> String {
    format!("https://cdn.betterttv.net/emote/{}/3x", id)
}

/// BTTV emotes are `[{id, code}]`, both for globals and channel/shared lists.
pub fn ingest_bttv_list(list: &Value, table: &mut EmoteTable) {
    let Some(items) = list.as_array() else {
        return;
    };
    for item in items {
        if let (Some(id), Some(code)) = (
            item.get("id").and_then(|v| v.as_str()),
            item.get("code").and_then(|v| v.as_str()),
        ) {
            table.insert(code, bttv_cdn_url(id), EmoteProvider::BTTV);
        }
    }
}

/// FFZ `sets` object: `{set_id: {emoticons: [{name, urls: {"1","2","4"}}]}}`.
pub fn ingest_ffz_sets(sets: &Value, table: &mut EmoteTable) {
    let Some(sets) = sets.as_object() else {
        return;
    };
    for set in sets.values() {
        let Some(emotes) = set.get("emoticons").and_then(|v| v.as_array()) else {
            continue;
        };
        for emote in emotes {
            let Some(name) = emote.get("name").and_then(|v| v.as_str()) else {
                continue;
            };
            let Some(urls) = emote.get("urls") else {
                continue;
            };
            let url = ["1", "2", "4"]
                .iter()
                .find_map(|size| urls.get(*size).and_then(|v| v.as_str()).filter(|u| !u.is_empty()));
            if let Some(url) = url {
                let url = if url.starts_with("//") {
                    format!("https:{}", url)
                } else {
                    url.to_string()
                };
                table.insert(name, url, EmoteProvider::FFZ);
            }
        }
    }
}

/// 7TV emote set: `{emotes: [{name, data: {host: {url, files: [{name}]}}}]}`.
/// Prefers a `1x*` file, then any `.webp`, then the first file.
pub fn ingest_seven_tv_set(set: &Value, table: &mut EmoteTable) {
    let Some(emotes) = set.get("emotes").and_then(|v| v.as_array()) else {
        return;
    };
    for item in emotes {
        let Some(name) = item.get("name").and_then(|v| v.as_str()) else {
            continue;
        };
        let Some(host) = item.pointer("/data/host") else {
            continue;
        };
        let (Some(host_url), Some(files)) = (
            host.get("url").and_then(|v| v.as_str()),
            host.get("files").and_then(|v| v.as_array()),
        ) else {
            continue;
        };

        let file_names: Vec<&str> = files
            .iter()
            .filter_map(|f| f.get("name").and_then(|v| v.as_str()))
            .collect();
        let file = file_names
            .iter()
            .find(|n| n.starts_with("1x"))
            .or_else(|| file_names.iter().find(|n| n.ends_with(".webp")))
            .or_else(|| file_names.first());

        if let Some(file) = file {
            table.insert(name, format!("https:{}/{}", host_url, file), EmoteProvider::SevenTV);
        }
    }
}

pub struct EmoteService {
    client: reqwest::Client,
}

impl EmoteService {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Fetch all enabled providers concurrently. A failing provider only loses its own
    /// emotes; its error is returned alongside the merged table.
    pub async fn fetch_emotes(
        &self,
        settings: &EmoteSettings,
        channel_id: Option<&str>,
    ) -> (EmoteTable, Vec<String>) {
        let mut table = EmoteTable::new();
        let mut errors = Vec::new();
        if !settings.enabled {
            return (table, errors);
        }

        let providers = &settings.providers;
        let (bttv, ffz, seven_tv) = tokio::join!(
            async {
                if providers.bttv.enabled {
                    Some(self.fetch_bttv(providers.bttv.base_url.as_deref(), channel_id).await)
                } else {
                    None
                }
            },
            async {
                if providers.ffz.enabled {
                    Some(self.fetch_ffz(providers.ffz.base_url.as_deref(), channel_id).await)
                } else {
                    None
                }
            },
            async {
                if providers.seven_tv.enabled {
                    Some(self.fetch_7tv(providers.seven_tv.base_url.as_deref(), channel_id).await)
                } else {
                    None
                }
            }
        );

        // Later merges win on identical codes: 7TV > FFZ > BTTV
        for (provider, result) in [
            (EmoteProvider::BTTV, bttv),
            (EmoteProvider::FFZ, ffz),
            (EmoteProvider::SevenTV, seven_tv),
        ] {
            match result {
                Some(Ok(provider_table)) => {
                    log::info!("[EmoteService] {}: {} keys", provider, provider_table.len());
                    table.merge(provider_table);
                }
                Some(Err(e)) => {
                    log::warn!("[EmoteService] {} fetch error: {}", provider, e);
                    errors.push(format!("{} load failed", provider));
                }
                None => {}
            }
        }

        (table, errors)
    }

    async fn fetch_bttv(&self, base_url: Option<&str>, channel_id: Option<&str>) -> Result<EmoteTable> {
        let base = strip_trailing_slash(base_url.unwrap_or(BTTV_API));
        let mut table = EmoteTable::new();

        match fetch_json(&self.client, &format!("{}/cached/emotes/global", base)).await {
            Ok(global) => ingest_bttv_list(&global, &mut table),
            Err(e) => log::warn!("[EmoteService] BTTV global request failed: {}", e),
        }

        if let Some(channel_id) = channel_id {
            let url = format!(
                "{}/cached/users/twitch/{}",
                base,
                urlencoding::encode(channel_id)
            );
            match fetch_json(&self.client, &url).await {
                Ok(user) => {
                    if let Some(list) = user.get("channelEmotes") {
                        ingest_bttv_list(list, &mut table);
                    }
                    if let Some(list) = user.get("sharedEmotes") {
                        ingest_bttv_list(list, &mut table);
                    }
                }
                // Channel not found is common and not critical
                Err(e) => log::debug!("[EmoteService] BTTV channel request failed: {}", e),
            }
        }

        Ok(table)
    }

    async fn fetch_ffz(&self, base_url: Option<&str>, channel_id: Option<&str>) -> Result<EmoteTable> {
        let base = strip_trailing_slash(base_url.unwrap_or(FFZ_API));
        let mut table = EmoteTable::new();

        let global = fetch_json(&self.client, &format!("{}/set/global", base)).await?;
        if let Some(sets) = global.get("sets") {
            ingest_ffz_sets(sets, &mut table);
        }

        if let Some(channel_id) = channel_id {
            let url = format!("{}/room/id/{}", base, urlencoding::encode(channel_id));
            let room = fetch_json(&self.client, &url).await?;
            if let Some(sets) = room.get("sets") {
                ingest_ffz_sets(sets, &mut table);
            }
        }

        Ok(table)
    }

    async fn fetch_7tv(&self, base_url: Option<&str>, channel_id: Option<&str>) -> Result<EmoteTable> {
        let base = strip_trailing_slash(base_url.unwrap_or(SEVEN_TV_API));
        let mut table = EmoteTable::new();

        let global = fetch_json(&self.client, &format!("{}/emote-sets/global", base)).await?;
        ingest_seven_tv_set(&global, &mut table);

        if let Some(channel_id) = channel_id {
            let url = format!("{}/users/twitch/{}", base, urlencoding::encode(channel_id));
            let user = fetch_json(&self.client, &url).await?;
            if let Some(set) = user.get("emote_set") {
                ingest_seven_tv_set(set, &mut table);
            }
        }

        Ok(table)
    }
}
