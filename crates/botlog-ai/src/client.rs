//! Shared plumbing for Gemini-compatible generateContent endpoints.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde_json::Value;

use botlog_core::BotlogConfig;

#[derive(Debug, Clone)]
pub(crate) struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key_env: String,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key_env: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key_env: api_key_env.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .map_err(|_| anyhow!("AI is enabled but {} is not set", self.api_key_env))
    }

    /// POST a generateContent body and return the parsed response JSON.
    pub fn generate_content(&self, body: &Value) -> Result<Value> {
        let api_key = self.api_key()?;
        let base = self.base_url.trim_end_matches('/');
        let url = format!("{}/v1beta/models/{}:generateContent", base, self.model);

        let res = self
            .http
            .post(url)
            .query(&[("key", api_key)])
            .json(body)
            .send()
            .context("generateContent request failed")?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().unwrap_or_default();
            return Err(anyhow!("generateContent failed: {}: {}", status, text));
        }

        res.json().context("failed to parse response JSON")
    }
}

/// Walk a generateContent response down to its first text part.
pub(crate) fn extract_text(response: &Value) -> Result<&str> {
    response
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .and_then(|p| p.first())
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| {
            anyhow!("unexpected response shape (missing candidates[0].content.parts[0].text)")
        })
}

/// Strip markdown code fences around a JSON payload.
pub(crate) fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Split a `data:<mime>;base64,<data>` URI into its mime type and payload.
pub(crate) fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (mime, data) = rest.split_once(";base64,")?;
    if mime.is_empty() || data.is_empty() {
        return None;
    }
    Some((mime, data))
}

/// Resolve the AI cache root from config, expanding a leading tilde.
pub(crate) fn resolve_cache_root(config: &BotlogConfig) -> Result<PathBuf> {
    let raw = config
        .ai
        .cache_dir
        .as_deref()
        .unwrap_or(&config.storage.cache_dir);
    expand_tilde(raw)
}

pub(crate) fn expand_tilde(path: &str) -> Result<PathBuf> {
    if path == "~" || path.starts_with("~/") {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("failed to resolve home dir"))?;
        if path == "~" {
            return Ok(home);
        }
        return Ok(home.join(path.trim_start_matches("~/")));
    }
    Ok(PathBuf::from(path))
}
