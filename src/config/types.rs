use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Defaults applied to new listings and booking requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
    #[serde(default = "default_free_cancellation_days")]
    pub free_cancellation_days: i64,
    #[serde(default = "default_partial_refund_days")]
    pub partial_refund_days: i64,
    #[serde(default = "default_max_stay_nights")]
    pub max_stay_nights: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            free_cancellation_days: default_free_cancellation_days(),
            partial_refund_days: default_partial_refund_days(),
            max_stay_nights: default_max_stay_nights(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_property_ttl")]
    pub property_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            property_ttl_secs: default_property_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StoreConfig {
    /// JSON file with `users` and `properties` loaded at startup.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

fn default_free_cancellation_days() -> i64 {
    7
}

fn default_partial_refund_days() -> i64 {
    3
}

fn default_max_stay_nights() -> u32 {
    30
}

fn default_page_size() -> usize {
    10
}

fn default_max_page_size() -> usize {
    50
}

fn default_max_entries() -> usize {
    500
}

fn default_property_ttl() -> u64 {
    600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = Config::default();
        assert_eq!(config.policy.free_cancellation_days, 7);
        assert_eq!(config.policy.partial_refund_days, 3);
        assert_eq!(config.policy.max_stay_nights, 30);
        assert_eq!(config.listing.page_size, 10);
        assert!(config.store.seed_path.is_none());
    }

    #[test]
    fn cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, 500);
        assert_eq!(config.property_ttl_secs, 600);
    }

    #[test]
    fn config_serde_roundtrip() {
        let original = Config::default();
        let yaml = serde_yml::to_string(&original).unwrap();
        let restored: Config = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(
            restored.policy.free_cancellation_days,
            original.policy.free_cancellation_days
        );
        assert_eq!(restored.cache.max_entries, original.cache.max_entries);
        assert_eq!(restored.listing.max_page_size, original.listing.max_page_size);
    }

    #[test]
    fn config_deserialize_with_overrides() {
        let yaml = "policy:\n  partial_refund_days: 2";
        let config: Config = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.policy.partial_refund_days, 2);
        // Other fields get defaults
        assert_eq!(config.policy.free_cancellation_days, 7);
        assert_eq!(config.cache.property_ttl_secs, 600);
    }
}
