use std::sync::Arc;

use async_trait::async_trait;

use crate::configs::MetadataConfig;

pub mod http;

pub use http::HttpMetadataResolver;

/// Resolves a song hash into the URLs clients need to play it.
///
/// Lookups are best effort: `None` means "no result" and the caller carries
/// on with an empty field.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Playable stream URL, resolved at selection time.
    async fn song_url(&self, hash: &str) -> Option<String>;

    /// Lyrics URL, resolved once when the track is added.
    async fn lyrics_url(&self, hash: &str) -> Option<String>;
}

/// Used when lookups are disabled.
pub struct NullResolver;

#[async_trait]
impl MetadataResolver for NullResolver {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn song_url(&self, _hash: &str) -> Option<String> {
        None
    }

    async fn lyrics_url(&self, _hash: &str) -> Option<String> {
        None
    }
}

/// Builds the resolver selected by `[metadata]`.
pub fn from_config(config: &MetadataConfig) -> Arc<dyn MetadataResolver> {
    if !config.enabled {
        tracing::info!("Metadata lookups disabled");
        return Arc::new(NullResolver);
    }

    match HttpMetadataResolver::new(config) {
        Ok(resolver) => {
            tracing::info!("Loaded metadata resolver: {}", config.base_url);
            Arc::new(resolver)
        }
        Err(e) => {
            tracing::warn!("Failed to build metadata client, lookups disabled: {}", e);
            Arc::new(NullResolver)
        }
    }
}
