//! Style analysis: distill a writing sample or a reference image into a
//! reusable style description for the style library.

use anyhow::Result;
use serde_json::json;

use botlog_core::{BotlogConfig, BotlogError, BotlogResult};

use crate::client::{extract_text, split_data_uri, strip_code_fences, GeminiClient};

const WRITING_STYLE_PROMPT: &str = "\
You are a writing-style analyst. Analyze the article the user provides and
describe its style: tone, sentence rhythm, vocabulary habits, narrative
voice, structure, and any signature quirks.

Respond with JSON ONLY in this shape:
{
  \"summary\": \"one-line summary of the style\",
  \"tone\": \"...\",
  \"structure\": \"...\",
  \"vocabulary\": \"...\",
  \"uniqueTraits\": [\"...\"],
  \"promptForAI\": \"the instruction to give an AI to imitate this style\"
}";

const VISUAL_STYLE_PROMPT: &str = "\
You are a visual-style analyst. Analyze the image the user provides and
describe its style: palette, composition, lighting, style family, texture,
and mood.

Respond with JSON ONLY in this shape:
{
  \"summary\": \"one-line summary of the style\",
  \"colors\": \"...\",
  \"composition\": \"...\",
  \"lighting\": \"...\",
  \"styleType\": \"...\",
  \"texture\": \"...\",
  \"mood\": \"...\",
  \"promptForAI\": \"the English prompt to give an AI to generate images in this style\"
}";

/// Result of a style analysis: the parsed JSON (when the model complied) and
/// the prompt fragment to reuse for generation.
#[derive(Debug, Clone)]
pub struct StyleAnalysisResult {
    pub analysis: String,
    pub prompt_for_ai: String,
}

pub struct StyleAnalyzer {
    client: GeminiClient,
}

impl StyleAnalyzer {
    pub fn new(config: &BotlogConfig) -> Self {
        let gemini = &config.ai.gemini;
        Self {
            client: GeminiClient::new(&gemini.base_url, &gemini.model, &gemini.api_key_env),
        }
    }

    /// Analyze a writing sample.
    pub fn analyze_writing(&self, content: &str) -> BotlogResult<StyleAnalysisResult> {
        let parts = vec![json!({"text": format!("{}\n\n{}", WRITING_STYLE_PROMPT, content)})];
        self.run(parts)
            .map_err(|err| BotlogError::analyze(err.to_string()))
    }

    /// Analyze a reference image supplied as a `data:` URI.
    pub fn analyze_visual(&self, image_data_uri: &str) -> BotlogResult<StyleAnalysisResult> {
        let (mime, data) = split_data_uri(image_data_uri)
            .ok_or_else(|| BotlogError::InvalidArgument("expected a base64 data URI".into()))?;
        let parts = vec![
            json!({"text": VISUAL_STYLE_PROMPT}),
            json!({"inline_data": {"mime_type": mime, "data": data}}),
        ];
        self.run(parts)
            .map_err(|err| BotlogError::analyze(err.to_string()))
    }

    fn run(&self, parts: Vec<serde_json::Value>) -> Result<StyleAnalysisResult> {
        let body = json!({
            "contents": [{"role": "user", "parts": parts}],
            "generationConfig": {"temperature": 0.0}
        });
        let response = self.client.generate_content(&body)?;
        let text = extract_text(&response)?;
        Ok(parse_analysis(text))
    }
}

/// Keep the parsed JSON when the model complied; otherwise fall back to the
/// raw text for both fields, mirroring the analyzer's degraded path.
fn parse_analysis(text: &str) -> StyleAnalysisResult {
    let cleaned = strip_code_fences(text);
    match serde_json::from_str::<serde_json::Value>(&cleaned) {
        Ok(value) => {
            let prompt_for_ai = value
                .get("promptForAI")
                .and_then(|p| p.as_str())
                .unwrap_or(&cleaned)
                .to_string();
            StyleAnalysisResult {
                analysis: cleaned,
                prompt_for_ai,
            }
        }
        Err(_) => StyleAnalysisResult {
            analysis: text.to_string(),
            prompt_for_ai: text.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structured_analysis() {
        let text = "```json\n{\"summary\": \"dry wit\", \"promptForAI\": \"write with dry wit\"}\n```";
        let parsed = parse_analysis(text);
        assert!(parsed.analysis.contains("dry wit"));
        assert_eq!(parsed.prompt_for_ai, "write with dry wit");
    }

    #[test]
    fn test_parse_freeform_analysis() {
        let text = "The style is breezy and conversational.";
        let parsed = parse_analysis(text);
        assert_eq!(parsed.analysis, text);
        assert_eq!(parsed.prompt_for_ai, text);
    }
}
