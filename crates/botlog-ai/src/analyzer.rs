//! Scene analysis: decompose a card's text into illustratable scenes.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use botlog_canvas::{AnalysisOutcome, CoverSuggestion, Scene, SceneAnalysis, SceneAnalyzer};
use botlog_core::{hash_text, BotlogConfig, BotlogError, BotlogResult};

use crate::client::{extract_text, resolve_cache_root, strip_code_fences, GeminiClient};

fn system_prompt(style: &str) -> String {
    format!(
        concat!(
            "You are a visual story designer.\n\n",
            "Split the paragraph the user provides into discrete scenes and ",
            "suggest one illustration per scene, plus one cover image for the ",
            "whole passage.\n\n",
            "All prompts must use the \"{style}\" style for visual consistency.\n\n",
            "Rules:\n",
            "- Split on sentences or meaning units; every distinct scene, action ",
            "or description can be its own picture.\n",
            "- Each scene's originalText must be a verbatim part of the input, ",
            "and all originalText values concatenated in order must equal the ",
            "full input.\n",
            "- Prompts are English, 50-80 words, concrete visual elements only.\n\n",
            "Respond with JSON ONLY, no commentary, in this exact shape:\n",
            "{{\n",
            "  \"coverImage\": {{\"description\": \"...\", \"prompt\": \"...\"}},\n",
            "  \"scenes\": [\n",
            "    {{\"sceneIndex\": 0, \"originalText\": \"...\", ",
            "\"sceneDescription\": \"...\", \"prompt\": \"...\"}}\n",
            "  ]\n",
            "}}"
        ),
        style = style
    )
}

/// Wire shape of a structured analysis response.
#[derive(Debug, Deserialize)]
struct AnalysisWire {
    #[serde(default)]
    scenes: Vec<SceneWire>,
    #[serde(default, rename = "coverImage")]
    cover_image: Option<CoverWire>,
}

#[derive(Debug, Deserialize)]
struct SceneWire {
    #[serde(default, rename = "sceneIndex")]
    scene_index: usize,
    #[serde(rename = "originalText")]
    original_text: String,
    #[serde(default, rename = "sceneDescription")]
    scene_description: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct CoverWire {
    #[serde(default)]
    description: String,
    prompt: String,
}

/// Blocking scene-analysis adapter. Successful raw responses are cached on
/// disk keyed by (model, style, content), so re-analyzing unchanged text is
/// free.
pub struct GeminiAnalyzer {
    client: GeminiClient,
    cache_root: Option<std::path::PathBuf>,
}

impl GeminiAnalyzer {
    pub fn new(config: &BotlogConfig) -> Self {
        let gemini = &config.ai.gemini;
        Self {
            client: GeminiClient::new(&gemini.base_url, &gemini.model, &gemini.api_key_env),
            cache_root: resolve_cache_root(config).ok(),
        }
    }

    fn cache_path(&self, content: &str, style: &str) -> Option<std::path::PathBuf> {
        let root = self.cache_root.as_deref()?;
        let key = hash_text(&format!(
            "analyze|model={}|style={}|content={}",
            self.client.model(),
            style,
            content
        ));
        Some(root.join("ai").join("analyze").join(format!("{}.json", key)))
    }

    fn fetch_raw(&self, content: &str, style: &str) -> Result<String> {
        if let Some(path) = self.cache_path(content, style) {
            if path.exists() {
                debug!("analysis cache hit: {}", path.display());
                return std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read analysis cache: {}", path.display()));
            }
        }

        let prompt = format!("{}\n\nInput paragraph:\n{}", system_prompt(style), content);
        let body = json!({
            "contents": [
                {"role": "user", "parts": [{"text": prompt}]}
            ],
            "generationConfig": {
                "temperature": 0.0,
                "response_mime_type": "application/json"
            }
        });
        let response = self.client.generate_content(&body)?;
        let text = extract_text(&response)?.to_string();

        if let Some(path) = self.cache_path(content, style) {
            if let Err(err) = write_cache(&path, &text) {
                warn!("failed to write analysis cache: {}", err);
            }
        }
        Ok(text)
    }
}

fn write_cache(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create cache dir: {}", parent.display()))?;
    }
    std::fs::write(path, text)
        .with_context(|| format!("failed to write cache file: {}", path.display()))
}

/// Parse a raw analyzer response. Anything that does not decode as the
/// structured shape becomes the freeform legacy outcome — malformed upstream
/// output is a fallback, not an error.
fn parse_outcome(raw: &str, style: &str) -> AnalysisOutcome {
    let cleaned = strip_code_fences(raw);
    let wire: AnalysisWire = match serde_json::from_str(&cleaned) {
        Ok(wire) => wire,
        Err(err) => {
            warn!("analyzer response was not structured, falling back: {}", err);
            return AnalysisOutcome::Freeform(raw.to_string());
        }
    };
    if wire.scenes.is_empty() {
        return AnalysisOutcome::Freeform(raw.to_string());
    }

    let scenes = wire
        .scenes
        .into_iter()
        .map(|s| Scene {
            scene_index: s.scene_index,
            original_text: s.original_text,
            scene_description: s.scene_description,
            prompt: s.prompt.clone(),
            editable_prompt: s.prompt,
            reference_image: None,
            generating: false,
            generated_image: None,
        })
        .collect();
    let cover = wire.cover_image.map(|c| CoverSuggestion {
        description: c.description,
        prompt: c.prompt.clone(),
        editable_prompt: c.prompt,
        reference_image: None,
        generating: false,
        generated_image: None,
    });

    AnalysisOutcome::Scenes(SceneAnalysis {
        style: style.to_string(),
        scenes,
        cover,
    })
}

impl SceneAnalyzer for GeminiAnalyzer {
    fn analyze(&self, content: &str, style: &str) -> BotlogResult<AnalysisOutcome> {
        let raw = self
            .fetch_raw(content, style)
            .map_err(|err| BotlogError::analyze(err.to_string()))?;
        Ok(parse_outcome(&raw, style))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRUCTURED: &str = r#"```json
{
  "coverImage": {"description": "a mouse by a cabin", "prompt": "cover prompt"},
  "scenes": [
    {"sceneIndex": 0, "originalText": "A cabin. ", "sceneDescription": "the cabin", "prompt": "p0"},
    {"sceneIndex": 1, "originalText": "A hunter sleeps.", "sceneDescription": "the hunter", "prompt": "p1"}
  ]
}
```"#;

    #[test]
    fn test_parse_structured_response() {
        let outcome = parse_outcome(STRUCTURED, "watercolor");
        let AnalysisOutcome::Scenes(analysis) = outcome else {
            panic!("expected structured outcome");
        };
        assert_eq!(analysis.style, "watercolor");
        assert_eq!(analysis.scenes.len(), 2);
        assert_eq!(analysis.scenes[0].original_text, "A cabin. ");
        assert_eq!(analysis.scenes[1].editable_prompt, "p1");
        assert_eq!(
            analysis.cover.as_ref().unwrap().description,
            "a mouse by a cabin"
        );
        assert!(analysis.covers_losslessly("A cabin. A hunter sleeps."));
    }

    #[test]
    fn test_unparseable_response_falls_back_to_freeform() {
        let raw = "Here are some ideas:\n### Prompt 1: a cabin in the woods";
        let outcome = parse_outcome(raw, "watercolor");
        let AnalysisOutcome::Freeform(text) = outcome else {
            panic!("expected freeform fallback");
        };
        assert_eq!(text, raw);
    }

    #[test]
    fn test_structured_but_empty_scene_list_falls_back() {
        let outcome = parse_outcome(r#"{"scenes": []}"#, "watercolor");
        assert!(matches!(outcome, AnalysisOutcome::Freeform(_)));
    }

    #[test]
    fn test_system_prompt_carries_the_style() {
        let prompt = system_prompt("watercolor");
        assert!(prompt.contains("\"watercolor\""));
        assert!(prompt.contains("originalText"));
    }
}
