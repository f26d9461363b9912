use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use super::MetadataResolver;
use crate::{common::HttpClient, configs::MetadataConfig};

/// Client of the song-info HTTP service.
pub struct HttpMetadataResolver {
    client: Client,
    base_url: String,
    retries: u32,
}

impl HttpMetadataResolver {
    pub fn new(config: &MetadataConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: HttpClient::with_timeout(config.timeout())?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retries: config.retries,
        })
    }

    /// GETs `url` as JSON, retrying up to `retries` extra times.
    async fn fetch_json(&self, url: &str) -> Option<Value> {
        let mut attempt = 0;
        loop {
            match self.try_fetch(url).await {
                Ok(body) => return Some(body),
                Err(e) if attempt < self.retries => {
                    debug!("Metadata lookup failed, retrying: url={} err={}", url, e);
                    attempt += 1;
                }
                Err(e) => {
                    warn!("Metadata lookup failed: url={} err={}", url, e);
                    return None;
                }
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<Value, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await
    }
}

#[async_trait]
impl MetadataResolver for HttpMetadataResolver {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn song_url(&self, hash: &str) -> Option<String> {
        let url = format!(
            "{}/song/url?hash={}",
            self.base_url,
            urlencoding::encode(hash)
        );
        let body = self.fetch_json(&url).await?;
        let found = parse_song_url(&body);
        if found.is_none() {
            warn!("No stream url for {}", hash);
        }
        found
    }

    async fn lyrics_url(&self, hash: &str) -> Option<String> {
        let url = format!(
            "{}/search/lyric?hash={}",
            self.base_url,
            urlencoding::encode(hash)
        );
        let body = self.fetch_json(&url).await?;
        let found = parse_lyrics_url(&self.base_url, &body);
        if found.is_none() {
            warn!("No lyrics candidate for {}", hash);
        }
        found
    }
}

/// First entry of the `url` array.
pub fn parse_song_url(body: &Value) -> Option<String> {
    body.get("url")?
        .as_array()?
        .first()?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Lyrics download URL built from the first of `candidates`.
pub fn parse_lyrics_url(base_url: &str, body: &Value) -> Option<String> {
    let candidate = body.get("candidates")?.as_array()?.first()?;
    let id = scalar(candidate.get("id")?)?;
    let key = scalar(candidate.get("accesskey")?)?;
    Some(format!(
        "{}/lyric?id={}&accesskey={}&decode=true&fmt=lrc",
        base_url,
        urlencoding::encode(&id),
        urlencoding::encode(&key)
    ))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "http://127.0.0.1:3000";

    #[test]
    fn test_song_url_takes_first_entry() {
        let body = json!({"url": ["http://cdn/a.mp3", "http://cdn/b.mp3"]});
        assert_eq!(parse_song_url(&body), Some("http://cdn/a.mp3".into()));
    }

    #[test]
    fn test_song_url_missing_or_malformed() {
        assert_eq!(parse_song_url(&json!({})), None);
        assert_eq!(parse_song_url(&json!({"url": "http://cdn/a.mp3"})), None);
        assert_eq!(parse_song_url(&json!({"url": []})), None);
        assert_eq!(parse_song_url(&json!({"url": [""]})), None);
    }

    #[test]
    fn test_lyrics_url_from_candidate() {
        let body = json!({"candidates": [{"id": "123", "accesskey": "KEY"}]});
        assert_eq!(
            parse_lyrics_url(BASE, &body),
            Some(format!("{BASE}/lyric?id=123&accesskey=KEY&decode=true&fmt=lrc"))
        );
    }

    #[test]
    fn test_lyrics_numeric_id() {
        let body = json!({"candidates": [{"id": 123, "accesskey": "K"}]});
        assert_eq!(
            parse_lyrics_url(BASE, &body),
            Some(format!("{BASE}/lyric?id=123&accesskey=K&decode=true&fmt=lrc"))
        );
    }

    #[test]
    fn test_lyrics_without_candidates() {
        assert_eq!(parse_lyrics_url(BASE, &json!({"candidates": []})), None);
        assert_eq!(parse_lyrics_url(BASE, &json!({"candidates": [{"id": "1"}]})), None);
        assert_eq!(parse_lyrics_url(BASE, &json!({"status": 0})), None);
    }

    #[tokio::test]
    async fn test_unreachable_service_degrades_to_none() {
        let config = MetadataConfig {
            base_url: "http://127.0.0.1:1".into(),
            timeout_ms: 200,
            retries: 0,
            ..Default::default()
        };
        let resolver = HttpMetadataResolver::new(&config).unwrap();
        assert_eq!(resolver.song_url("h1").await, None);
        assert_eq!(resolver.lyrics_url("h1").await, None);
    }
}
