//! Image generation: one prompt (plus optional reference image) in, one
//! image payload out.

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use tracing::debug;

use botlog_canvas::{GenerateRequest, GeneratedImage, ImageGenerator};
use botlog_core::{BotlogConfig, BotlogError, BotlogResult};

use crate::client::{split_data_uri, GeminiClient};

/// Blocking image-generation adapter. The response's inline payload is
/// rewrapped as a `data:` URI; persisting it durably is the caller's job
/// (the workbench routes it through the asset sink).
pub struct GeminiImageGenerator {
    client: GeminiClient,
}

impl GeminiImageGenerator {
    pub fn new(config: &BotlogConfig) -> Self {
        let imagegen = &config.ai.imagegen;
        Self {
            client: GeminiClient::new(&imagegen.base_url, &imagegen.model, &imagegen.api_key_env),
        }
    }

    fn generate_inner(&self, request: &GenerateRequest<'_>) -> Result<GeneratedImage> {
        let mut parts = vec![json!({"text": build_prompt(request)})];
        if let Some(reference) = request.reference_image {
            let (mime, data) = split_data_uri(reference)
                .ok_or_else(|| anyhow!("reference image must be a base64 data URI"))?;
            parts.push(json!({"inline_data": {"mime_type": mime, "data": data}}));
        }

        let body = json!({
            "contents": [{"role": "user", "parts": parts}],
            "generationConfig": {"responseModalities": ["TEXT", "IMAGE"]}
        });
        let response = self.client.generate_content(&body)?;
        let image = first_inline_image(&response)
            .ok_or_else(|| anyhow!("response contained no image data"))?;
        debug!("generated image ({} bytes base64)", image.url.len());
        Ok(image)
    }
}

/// Fold the source text into the prompt as grounding context.
fn build_prompt(request: &GenerateRequest<'_>) -> String {
    match request.source_text.filter(|t| !t.is_empty()) {
        Some(source) => format!(
            "{}\n\nThe image illustrates this passage:\n{}",
            request.prompt, source
        ),
        None => request.prompt.to_string(),
    }
}

/// Find the first inline image part in a generateContent response.
fn first_inline_image(response: &Value) -> Option<GeneratedImage> {
    let parts = response
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;
    for part in parts {
        let Some(inline) = part.get("inlineData").or_else(|| part.get("inline_data")) else {
            continue;
        };
        let mime = inline.get("mimeType").or_else(|| inline.get("mime_type"));
        if let (Some(mime), Some(data)) = (
            mime.and_then(|m| m.as_str()),
            inline.get("data").and_then(|d| d.as_str()),
        ) {
            return Some(GeneratedImage {
                url: format!("data:{};base64,{}", mime, data),
            });
        }
    }
    None
}

impl ImageGenerator for GeminiImageGenerator {
    fn generate(&self, request: &GenerateRequest<'_>) -> BotlogResult<GeneratedImage> {
        self.generate_inner(request)
            .map_err(|err| BotlogError::generate(err.to_string()))
    }
}
