/// Display value used for chapters whose duration is still unknown
pub const DURATION_PLACEHOLDER: &str = "--:--";

/// Audio files on the archive use this extension; metadata entries with
/// other extensions (thumbnails, torrents, xml) are ignored
pub const AUDIO_EXTENSION: &str = ".m4a";

/// Default archive endpoints, overridable in the config file
pub const DEFAULT_ARCHIVE_METADATA_URL: &str = "https://archive.org/metadata";
pub const DEFAULT_ARCHIVE_DOWNLOAD_URL: &str = "https://archive.org/download";

/// Timeout for a single archive metadata fetch in seconds
pub const DEFAULT_ARCHIVE_TIMEOUT_SECS: u64 = 5;

/// Default and maximum entry counts for history listing
pub const HISTORY_DEFAULT_LIMIT: u32 = 50;
pub const HISTORY_MAX_LIMIT: u32 = 200;

/// Default and maximum page sizes for story search
pub const SEARCH_DEFAULT_LIMIT: u32 = 20;
pub const SEARCH_MAX_LIMIT: u32 = 100;

/// User-Agent presented to the upstream audio source by the proxy
pub const PROXY_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
