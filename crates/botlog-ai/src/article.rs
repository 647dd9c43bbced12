//! Whole-article analysis: scan the full draft and propose which cards
//! would benefit from an illustration.

use anyhow::Result;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use botlog_canvas::Canvas;
use botlog_core::{BotlogConfig, BotlogError, BotlogResult};

use crate::client::{extract_text, strip_code_fences, GeminiClient};

const ARTICLE_ANALYSIS_PROMPT: &str = "\
You are a visual editor. Analyze the full article below and pick the
paragraphs that would benefit most from an illustration — not every
paragraph needs one; two to four images per article is typical. Favor
paragraphs where a picture carries information: concepts, processes,
comparisons, scenes.

Respond with JSON ONLY in this shape:
{
  \"articleTitle\": \"inferred from the content\",
  \"imagePlacements\": [
    {
      \"paragraphIndex\": 0,
      \"paragraphPreview\": \"first 50 characters of the paragraph\",
      \"reason\": \"why this paragraph needs an image\",
      \"imageType\": \"concept | process | infographic | scene\",
      \"promptSuggestions\": [
        {\"style\": \"...\", \"description\": \"...\", \"prompt\": \"English prompt, 50-100 words\"}
      ]
    }
  ]
}

paragraphIndex is the zero-based index of the paragraph in the input list.";

#[derive(Debug, Clone, Deserialize)]
pub struct PromptSuggestion {
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub description: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagePlacement {
    #[serde(rename = "paragraphIndex")]
    pub paragraph_index: usize,
    #[serde(default, rename = "paragraphPreview")]
    pub paragraph_preview: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, rename = "imageType")]
    pub image_type: String,
    #[serde(default, rename = "promptSuggestions")]
    pub prompt_suggestions: Vec<PromptSuggestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArticleAnalysis {
    #[serde(default, rename = "articleTitle")]
    pub article_title: String,
    #[serde(default, rename = "imagePlacements")]
    pub image_placements: Vec<ImagePlacement>,
}

impl ArticleAnalysis {
    /// Drop placements pointing past the end of the canvas; the model
    /// occasionally invents indexes.
    pub fn clamp_to(&mut self, card_count: usize) {
        let before = self.image_placements.len();
        self.image_placements
            .retain(|p| p.paragraph_index < card_count);
        if self.image_placements.len() != before {
            warn!(
                "dropped {} placement(s) with out-of-range paragraph index",
                before - self.image_placements.len()
            );
        }
    }
}

pub struct ArticleAnalyzer {
    client: GeminiClient,
}

impl ArticleAnalyzer {
    pub fn new(config: &BotlogConfig) -> Self {
        let gemini = &config.ai.gemini;
        Self {
            client: GeminiClient::new(&gemini.base_url, &gemini.model, &gemini.api_key_env),
        }
    }

    /// Analyze the whole canvas. Precondition: at least one card.
    pub fn analyze(&self, canvas: &Canvas) -> BotlogResult<ArticleAnalysis> {
        if canvas.is_empty() {
            return Err(BotlogError::precondition(
                "cannot analyze an empty canvas".to_string(),
            ));
        }
        let mut analysis = self
            .analyze_inner(canvas)
            .map_err(|err| BotlogError::analyze(err.to_string()))?;
        analysis.clamp_to(canvas.len());
        Ok(analysis)
    }

    fn analyze_inner(&self, canvas: &Canvas) -> Result<ArticleAnalysis> {
        let numbered = canvas
            .cards()
            .iter()
            .enumerate()
            .map(|(i, card)| format!("[{}] {}", i, card.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": format!("{}\n\nArticle paragraphs:\n{}", ARTICLE_ANALYSIS_PROMPT, numbered)}]
            }],
            "generationConfig": {
                "temperature": 0.0,
                "response_mime_type": "application/json"
            }
        });
        let response = self.client.generate_content(&body)?;
        let text = extract_text(&response)?;
        let analysis: ArticleAnalysis = serde_json::from_str(&strip_code_fences(text))?;
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape_decodes() {
        let raw = r#"{
            "articleTitle": "Foraging 101",
            "imagePlacements": [
                {
                    "paragraphIndex": 1,
                    "paragraphPreview": "Chanterelles grow...",
                    "reason": "a scene helps",
                    "imageType": "scene",
                    "promptSuggestions": [
                        {"style": "watercolor", "description": "forest floor", "prompt": "a forest floor with chanterelles"}
                    ]
                }
            ]
        }"#;
        let analysis: ArticleAnalysis = serde_json::from_str(raw).unwrap();
        assert_eq!(analysis.article_title, "Foraging 101");
        assert_eq!(analysis.image_placements.len(), 1);
        assert_eq!(analysis.image_placements[0].prompt_suggestions.len(), 1);
    }

    #[test]
    fn test_clamp_drops_out_of_range_placements() {
        let mut analysis = ArticleAnalysis {
            article_title: String::new(),
            image_placements: vec![
                ImagePlacement {
                    paragraph_index: 0,
                    paragraph_preview: String::new(),
                    reason: String::new(),
                    image_type: String::new(),
                    prompt_suggestions: Vec::new(),
                },
                ImagePlacement {
                    paragraph_index: 7,
                    paragraph_preview: String::new(),
                    reason: String::new(),
                    image_type: String::new(),
                    prompt_suggestions: Vec::new(),
                },
            ],
        };
        analysis.clamp_to(2);
        assert_eq!(analysis.image_placements.len(), 1);
        assert_eq!(analysis.image_placements[0].paragraph_index, 0);
    }
}
