use crate::models::lookup::BadgeTable;
use crate::services::twitch_service::{fetch_json, strip_trailing_slash};
use serde_json::Value;

fn first_image_url(version: &Value) -> Option<&str> {
    ["image_url_1x", "image_url_2x", "image_url_4x"]
        .iter()
        .find_map(|key| {
            version
                .get(*key)
                .and_then(|v| v.as_str())
                .filter(|url| !url.is_empty())
        })
}

/// Ingest either the Helix-style `{data:[{set_id, versions:[...]}]}` payload or the
/// legacy `{badge_sets:{set:{versions:{ver:{...}}}}}` payload.
pub fn ingest_badge_payload(payload: &Value, table: &mut BadgeTable) {
    if let Some(sets) = payload.get("data").and_then(|d| d.as_array()) {
        for set in sets {
            let Some(set_id) = set.get("set_id").and_then(|v| v.as_str()) else {
                continue;
            };
            let Some(versions) = set.get("versions").and_then(|v| v.as_array()) else {
                continue;
            };
            for version in versions {
                let id = match version.get("id") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => continue,
                };
                if let Some(url) = first_image_url(version) {
                    table.insert(set_id, &id, url);
                }
            }
        }
        return;
    }

    if let Some(sets) = payload.get("badge_sets").and_then(|s| s.as_object()) {
        for (set_id, set) in sets {
            let Some(versions) = set.get("versions").and_then(|v| v.as_object()) else {
                continue;
            };
            for (version_id, version) in versions {
                if let Some(url) = first_image_url(version) {
                    table.insert(set_id, version_id, url);
                }
            }
        }
    }
}

pub struct BadgeService {
    client: reqwest::Client,
}

impl BadgeService {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn fetch_global(&self, proxy: &str) -> anyhow::Result<BadgeTable> {
        let url = format!("{}/badges/global", strip_trailing_slash(proxy));
        let payload = fetch_json(&self.client, &url).await?;
        let mut table = BadgeTable::new();
        ingest_badge_payload(&payload, &mut table);
        log::info!("[BadgeService] Global badge sets: {}", table.len());
        Ok(table)
    }

    pub async fn fetch_channel(&self, proxy: &str, channel_id: &str) -> anyhow::Result<BadgeTable> {
        let url = format!(
            "{}/badges/channels/{}",
            strip_trailing_slash(proxy),
            urlencoding::encode(channel_id)
        );
        let payload = fetch_json(&self.client, &url).await?;
        let mut table = BadgeTable::new();
        ingest_badge_payload(&payload, &mut table);
        log::info!("[BadgeService] Channel badge sets: {}", table.len());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ingest_helix_shape() {
        let payload = json!({
            "data": [
                {
                    "set_id": "subscriber",
                    "versions": [
                        { "id": "6", "image_url_1x": "https://b/sub6/1", "image_url_2x": "https://b/sub6/2" },
                        { "id": 12, "image_url_1x": "", "image_url_4x": "https://b/sub12/4" },
                        { "image_url_1x": "https://b/noid" }
                    ]
                },
                { "set_id": "empty", "versions": [] },
                { "versions": [ { "id": "1", "image_url_1x": "https://b/orphan" } ] }
            ]
        });
        let mut table = BadgeTable::new();
        ingest_badge_payload(&payload, &mut table);
        assert_eq!(table.get("subscriber", "6"), Some("https://b/sub6/1"));
        assert_eq!(table.get("subscriber", "12"), Some("https://b/sub12/4"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_ingest_legacy_shape() {
        let payload = json!({
            "badge_sets": {
                "moderator": { "versions": { "1": { "image_url_2x": "https://b/mod/2" } } },
                "vip": { "versions": { "1": {} } }
            }
        });
        let mut table = BadgeTable::new();
        ingest_badge_payload(&payload, &mut table);
        assert_eq!(table.get("moderator", "1"), Some("https://b/mod/2"));
        assert_eq!(table.get("vip", "1"), None);
    }

    #[test]
    fn test_ingest_unknown_shape_is_noop() {
        let mut table = BadgeTable::new();
        ingest_badge_payload(&json!({"error": "nope"}), &mut table);
        ingest_badge_payload(&Value::Null, &mut table);
        assert!(table.is_empty());
    }
}
