//! Sync configuration.
//!
//! Everything a cycle needs is carried explicitly in [`SyncConfig`] and handed
//! to the collaborators at construction time.

use crate::error::ConfigError;
use segsync_core::{MetricNames, SegmentInfo};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://a.klaviyo.com";
pub const DEFAULT_API_REVISION: &str = "2025-01-15";
pub const DEFAULT_SEGMENT_NAME: &str = "Segment_Triggered_Event";
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Configuration for one segment's sync cycle.
#[derive(Clone)]
pub struct SyncConfig {
    /// Remote segment identifier.
    pub segment_id: String,
    /// Human readable segment name, attached to every event.
    pub segment_name: String,
    /// Private API key.
    pub api_key: String,
    /// Value of the `revision` header.
    pub api_revision: String,
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Members requested per page.
    pub page_size: usize,
    /// Location of the persisted record.
    pub state_path: PathBuf,
    /// Per-request timeout (in milliseconds).
    pub request_timeout_ms: u64,
    /// Metric names for joined/left events.
    pub metrics: MetricNames,
    /// Reconcile even when the segment comes back empty.
    ///
    /// Off by default: an empty fetch is treated like a failed one and the
    /// cycle is skipped, so nobody is reported as having left.
    pub allow_empty_segment: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            segment_id: String::new(),
            segment_name: DEFAULT_SEGMENT_NAME.to_string(),
            api_key: String::new(),
            api_revision: DEFAULT_API_REVISION.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            state_path: PathBuf::from(segsync_store::file::DEFAULT_STATE_PATH),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            metrics: MetricNames::default(),
            allow_empty_segment: false,
        }
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("segment_id", &self.segment_id)
            .field("segment_name", &self.segment_name)
            .field("api_key", &"<redacted>")
            .field("api_revision", &self.api_revision)
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .field("state_path", &self.state_path)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("metrics", &self.metrics)
            .field("allow_empty_segment", &self.allow_empty_segment)
            .finish()
    }
}

impl SyncConfig {
    pub fn segment_info(&self) -> SegmentInfo {
        SegmentInfo::new(self.segment_id.clone(), self.segment_name.clone())
    }

    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `SEGSYNC_SEGMENT_ID`: remote segment identifier
    /// - `SEGSYNC_API_KEY`: private API key
    ///
    /// Optional:
    /// - `SEGSYNC_SEGMENT_NAME` (default: "Segment_Triggered_Event")
    /// - `SEGSYNC_API_REVISION` (default: "2025-01-15")
    /// - `SEGSYNC_BASE_URL` (default: "https://a.klaviyo.com")
    /// - `SEGSYNC_PAGE_SIZE` (default: 100)
    /// - `SEGSYNC_STATE_PATH` (default: "cache.json")
    /// - `SEGSYNC_TIMEOUT_MS` (default: 30000)
    /// - `SEGSYNC_JOINED_METRIC` (default: "Joined Segment")
    /// - `SEGSYNC_LEFT_METRIC` (default: "Left Segment")
    /// - `SEGSYNC_ALLOW_EMPTY` (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SyncConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = SyncConfigBuilder::new();

        if let Some(v) = get("SEGSYNC_SEGMENT_ID") {
            builder = builder.segment_id(v);
        }
        if let Some(v) = get("SEGSYNC_API_KEY") {
            builder = builder.api_key(v);
        }
        if let Some(v) = get("SEGSYNC_SEGMENT_NAME") {
            builder = builder.segment_name(v);
        }
        if let Some(v) = get("SEGSYNC_API_REVISION") {
            builder = builder.api_revision(v);
        }
        if let Some(v) = get("SEGSYNC_BASE_URL") {
            builder = builder.base_url(v);
        }
        if let Some(v) = get("SEGSYNC_PAGE_SIZE") {
            builder = builder.page_size(parse_number("SEGSYNC_PAGE_SIZE", &v)?);
        }
        if let Some(v) = get("SEGSYNC_STATE_PATH") {
            builder = builder.state_path(v);
        }
        if let Some(v) = get("SEGSYNC_TIMEOUT_MS") {
            builder = builder.request_timeout(parse_number("SEGSYNC_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = get("SEGSYNC_JOINED_METRIC") {
            builder = builder.joined_metric(v);
        }
        if let Some(v) = get("SEGSYNC_LEFT_METRIC") {
            builder = builder.left_metric(v);
        }
        if let Some(v) = get("SEGSYNC_ALLOW_EMPTY") {
            builder = builder.allow_empty_segment(parse_bool("SEGSYNC_ALLOW_EMPTY", &v)?);
        }

        builder.build()
    }

    /// Check that required settings are present and numbers are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.segment_id.trim().is_empty() {
            return Err(ConfigError::Missing("SEGSYNC_SEGMENT_ID"));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("SEGSYNC_API_KEY"));
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "SEGSYNC_PAGE_SIZE",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "SEGSYNC_TIMEOUT_MS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

/// Builder for sync configuration.
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
        }
    }

    pub fn segment_id(mut self, id: impl Into<String>) -> Self {
        self.config.segment_id = id.into();
        self
    }

    pub fn segment_name(mut self, name: impl Into<String>) -> Self {
        self.config.segment_name = name.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn api_revision(mut self, revision: impl Into<String>) -> Self {
        self.config.api_revision = revision.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.state_path = path.into();
        self
    }

    pub fn request_timeout(mut self, ms: u64) -> Self {
        self.config.request_timeout_ms = ms;
        self
    }

    pub fn joined_metric(mut self, name: impl Into<String>) -> Self {
        self.config.metrics.joined = name.into();
        self
    }

    pub fn left_metric(mut self, name: impl Into<String>) -> Self {
        self.config.metrics.left = name.into();
        self
    }

    pub fn allow_empty_segment(mut self, enabled: bool) -> Self {
        self.config.allow_empty_segment = enabled;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Return the configuration without validating it.
    pub fn build_unchecked(self) -> SyncConfig {
        self.config
    }
}

impl Default for SyncConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_builder() {
        let config = SyncConfigBuilder::new()
            .segment_id("AbC123")
            .api_key("pk_test")
            .segment_name("VIPs")
            .page_size(50)
            .base_url("http://localhost:9000/")
            .allow_empty_segment(true)
            .build()
            .unwrap();

        assert_eq!(config.segment_id, "AbC123");
        assert_eq!(config.segment_name, "VIPs");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.base_url, "http://localhost:9000");
        assert!(config.allow_empty_segment);
    }

    #[test]
    fn test_defaults_from_minimal_env() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("SEGSYNC_SEGMENT_ID", "seg"),
            ("SEGSYNC_API_KEY", "key"),
        ]))
        .unwrap();

        assert_eq!(config.api_revision, DEFAULT_API_REVISION);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.state_path, PathBuf::from("cache.json"));
        assert_eq!(config.metrics, MetricNames::default());
        assert!(!config.allow_empty_segment);
    }

    #[test]
    fn test_missing_required_values() {
        let err = SyncConfig::from_lookup(lookup(&[("SEGSYNC_API_KEY", "key")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("SEGSYNC_SEGMENT_ID"));

        let err = SyncConfig::from_lookup(lookup(&[
            ("SEGSYNC_SEGMENT_ID", "seg"),
            ("SEGSYNC_API_KEY", "   "),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("SEGSYNC_API_KEY"));
    }

    #[test]
    fn test_invalid_numbers_and_bools() {
        let err = SyncConfig::from_lookup(lookup(&[
            ("SEGSYNC_SEGMENT_ID", "seg"),
            ("SEGSYNC_API_KEY", "key"),
            ("SEGSYNC_PAGE_SIZE", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SEGSYNC_PAGE_SIZE", .. }));

        let err = SyncConfig::from_lookup(lookup(&[
            ("SEGSYNC_SEGMENT_ID", "seg"),
            ("SEGSYNC_API_KEY", "key"),
            ("SEGSYNC_ALLOW_EMPTY", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SEGSYNC_ALLOW_EMPTY", .. }));
    }

    #[test]
    fn test_overrides_from_env() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("SEGSYNC_SEGMENT_ID", "seg"),
            ("SEGSYNC_API_KEY", "key"),
            ("SEGSYNC_PAGE_SIZE", "25"),
            ("SEGSYNC_TIMEOUT_MS", "500"),
            ("SEGSYNC_JOINED_METRIC", "Entered"),
            ("SEGSYNC_LEFT_METRIC", "Exited"),
            ("SEGSYNC_ALLOW_EMPTY", "yes"),
            ("SEGSYNC_STATE_PATH", "/tmp/seg.json"),
        ]))
        .unwrap();

        assert_eq!(config.page_size, 25);
        assert_eq!(config.request_timeout_ms, 500);
        assert_eq!(config.metrics.joined, "Entered");
        assert_eq!(config.metrics.left, "Exited");
        assert!(config.allow_empty_segment);
        assert_eq!(config.state_path, PathBuf::from("/tmp/seg.json"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = SyncConfigBuilder::new()
            .segment_id("seg")
            .api_key("pk_super_secret")
            .build_unchecked();

        let printed = format!("{:?}", config);
        assert!(!printed.contains("pk_super_secret"));
        assert!(printed.contains("<redacted>"));
    }
}
