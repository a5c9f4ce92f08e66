use std::{env, time::Duration};

pub const DEFAULT_API_URL: &str = "https://cafeteria1-vodr.onrender.com";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CartConfig {
    pub api_url: String,
    pub cache_ttl: Duration,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl CartConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_url = lookup("API_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let cache_ttl = lookup("CART_CACHE_TTL_SECS")
            .and_then(|secs| secs.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_TTL);

        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            anyhow::bail!("API_URL must be an http(s) url, got {api_url}");
        }

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            cache_ttl,
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }
}
