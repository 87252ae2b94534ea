use anyhow::Result;
use serde_json::Value;
use std::time::Duration;

/// Shared HTTP client for catalog requests.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .gzip(true)
        .build()
        .unwrap_or_default()
}

pub async fn fetch_json(client: &reqwest::Client, url: &str) -> Result<Value> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(anyhow::anyhow!("HTTP {} for {}", response.status(), url));
    }
    Ok(response.json::<Value>().await?)
}

pub fn strip_trailing_slash(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Candidate lookup URLs, tried in order.
pub fn channel_id_candidates(proxy: &str, login: &str) -> Vec<String> {
    let base = strip_trailing_slash(proxy);
    let login = urlencoding::encode(login);
    vec![
        format!("{}/id/{}", base, login),
        format!("{}/twitch/id/{}", base, login),
        format!("{}/users/{}", base, login),
        format!("{}/helix/users?login={}", base, login),
    ]
}

/// Accepts `{id}`, `{data:{id}}` and `{data:[{id}]}`; ids may be strings or numbers.
pub fn extract_channel_id(payload: &Value) -> Option<String> {
    let as_id = |v: &Value| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };

    payload
        .get("id")
        .and_then(as_id)
        .or_else(|| payload.pointer("/data/id").and_then(as_id))
        .or_else(|| payload.pointer("/data/0/id").and_then(as_id))
}

/// Resolve the numeric channel id for `login` through the id proxy.
pub async fn resolve_channel_id(client: &reqwest::Client, proxy: &str, login: &str) -> Result<String> {
    let mut last_err = anyhow::anyhow!("no id proxy configured");

    for url in channel_id_candidates(proxy, login) {
        match fetch_json(client, &url).await {
            Ok(payload) => match extract_channel_id(&payload) {
                Some(id) => {
                    log::info!("[TwitchService] Resolved {} -> {}", login, id);
                    return Ok(id);
                }
                None => last_err = anyhow::anyhow!("no id in response for {}", url),
            },
            Err(e) => {
                log::debug!("[TwitchService] {} failed: {}", url, e);
                last_err = e;
            }
        }
    }

    Err(last_err)
}
