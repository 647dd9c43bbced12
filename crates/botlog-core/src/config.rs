use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    /// Fallback cover shown when an article has no images at all.
    pub default_cover: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "botlog".to_string(),
            base_url: "http://localhost:3000".to_string(),
            default_cover: "/blog/demo_1.png".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    pub api_key_env: String,
    pub base_url: String,
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageGenConfig {
    pub api_key_env: String,
    pub base_url: String,
    pub model: String,
}

impl Default for ImageGenConfig {
    fn default() -> Self {
        Self {
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Override for the AI response cache; defaults to `storage.cache_dir`.
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub imagegen: ImageGenConfig,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: None,
            gemini: GeminiConfig::default(),
            imagegen: ImageGenConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub gallery_dir: String,
    pub session_dir: String,
    pub style_dir: String,
    pub cache_dir: String,
    /// Newest-first session cap; older sessions are dropped past it.
    pub max_sessions: usize,
    /// Byte budget for a persisted session snapshot before degradation kicks in.
    pub session_budget_bytes: u64,
    /// TTL for the gallery list cache, in seconds.
    pub gallery_cache_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            gallery_dir: "~/.botlog/gallery".to_string(),
            session_dir: "~/.botlog/sessions".to_string(),
            style_dir: "~/.botlog/styles".to_string(),
            cache_dir: "~/.botlog/cache".to_string(),
            max_sessions: 20,
            session_budget_bytes: 4 * 1024 * 1024,
            gallery_cache_ttl_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BotlogConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl BotlogConfig {
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: BotlogConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BotlogConfig::default();
        assert!(config.ai.enabled);
        assert_eq!(config.storage.max_sessions, 20);
        assert_eq!(config.ai.gemini.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: BotlogConfig = toml::from_str(
            r#"
            [site]
            name = "my-blog"
            base_url = "https://example.com"
            default_cover = "/cover.png"

            [ai.gemini]
            api_key_env = "MY_KEY"
            base_url = "https://example.com/ai"
            model = "gemini-test"
            "#,
        )
        .unwrap();
        assert_eq!(config.site.name, "my-blog");
        assert_eq!(config.ai.gemini.model, "gemini-test");
        // Unspecified sections fall back to defaults.
        assert_eq!(config.storage.gallery_cache_ttl_secs, 10);
    }
}
