//! External archive metadata client
//!
//! One metadata document per story, keyed by slug. The response shape is not
//! under our control, so parsing is tolerant: missing or malformed fields
//! drop the entry instead of failing the fetch.

use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::ArchiveConfig;
use crate::constants::AUDIO_EXTENSION;

#[derive(Debug, Deserialize)]
struct ArchiveMetadata {
    #[serde(default)]
    files: Vec<ArchiveFile>,
}

#[derive(Debug, Deserialize)]
struct ArchiveFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    length: Option<serde_json::Value>,
}

/// Request-scoped mapping from chapter audio filename to reported length
pub type DurationMap = HashMap<String, String>;

#[derive(Clone)]
pub struct ArchiveClient {
    http: reqwest::Client,
    metadata_url: String,
    download_url: String,
    fetch_timeout: Duration,
}

impl ArchiveClient {
    pub fn new(config: &ArchiveConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            metadata_url: config.metadata_url.trim_end_matches('/').to_string(),
            download_url: config.download_url.trim_end_matches('/').to_string(),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }

    /// Playable download URL for one chapter
    pub fn audio_url(&self, slug: &str, name: &str) -> String {
        format!("{}/{}/{}", self.download_url, slug, name)
    }

    /// Fetch the archive metadata for a story and extract a filename-to-length
    /// map for its audio files.
    ///
    /// Never fails the caller: a timeout, network error or unexpected body
    /// yields an empty map and a warning. No retries.
    pub async fn fetch_duration_map(&self, slug: &str) -> DurationMap {
        match self.try_fetch_duration_map(slug).await {
            Ok(map) => map,
            Err(e) => {
                warn!("Archive metadata fetch for '{}' skipped: {}", slug, e);
                DurationMap::new()
            }
        }
    }

    async fn try_fetch_duration_map(&self, slug: &str) -> Result<DurationMap, reqwest::Error> {
        let url = format!("{}/{}", self.metadata_url, slug);
        let response = self
            .http
            .get(&url)
            .timeout(self.fetch_timeout)
            .send()
            .await?
            .error_for_status()?;

        let metadata: ArchiveMetadata = response.json().await?;

        let mut map = DurationMap::new();
        for file in metadata.files {
            let Some(name) = file.name else { continue };
            if !name.ends_with(AUDIO_EXTENSION) {
                continue;
            }
            let Some(length) = file.length.as_ref().and_then(normalize_length) else {
                continue;
            };
            map.insert(name, length);
        }
        Ok(map)
    }
}

/// The archive reports length either as a string ("180.55", "03:01") or as a
/// bare number; anything else is treated as absent
fn normalize_length(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_length;
    use serde_json::json;

    #[test]
    fn length_strings_pass_through() {
        assert_eq!(normalize_length(&json!("180.55")), Some("180.55".to_string()));
        assert_eq!(normalize_length(&json!("03:01")), Some("03:01".to_string()));
    }

    #[test]
    fn numeric_lengths_are_stringified() {
        assert_eq!(normalize_length(&json!(180)), Some("180".to_string()));
        assert_eq!(normalize_length(&json!(180.5)), Some("180.5".to_string()));
    }

    #[test]
    fn empty_and_malformed_lengths_are_dropped() {
        assert_eq!(normalize_length(&json!("")), None);
        assert_eq!(normalize_length(&json!("   ")), None);
        assert_eq!(normalize_length(&json!(null)), None);
        assert_eq!(normalize_length(&json!({"value": 1})), None);
    }
}
