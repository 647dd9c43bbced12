//! Provider traits — the seams between the content model and the external
//! generative service and asset store. Implementations live in `botlog-ai`
//! and `botlog-store`; tests use hand-rolled dummies.

use botlog_core::BotlogResult;

use crate::scene::SceneAnalysis;

/// Outcome of a scene analysis: the structured shape, or the raw freeform
/// suggestion when the upstream response could not be parsed as one. The
/// freeform path is the legacy fallback — displayable, and mineable for
/// prompts on a best-effort basis, but never an error.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Scenes(SceneAnalysis),
    Freeform(String),
}

/// Decomposes card text into illustratable scenes plus a cover suggestion.
pub trait SceneAnalyzer {
    fn analyze(&self, content: &str, style: &str) -> BotlogResult<AnalysisOutcome>;
}

/// One image-generation request.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub prompt: &'a str,
    /// The text the image illustrates, passed as grounding context.
    pub source_text: Option<&'a str>,
    /// Optional reference image as a `data:` URI.
    pub reference_image: Option<&'a str>,
}

/// A generated image payload: a durable URL or an embedded `data:` URI.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub url: String,
}

/// Synthesizes one image from a prompt.
pub trait ImageGenerator {
    fn generate(&self, request: &GenerateRequest<'_>) -> BotlogResult<GeneratedImage>;
}

/// A request to persist an image payload durably.
#[derive(Debug, Clone, Copy)]
pub struct AssetSaveRequest<'a> {
    /// Durable URL (passed through) or embedded `data:` payload (stored).
    pub payload: &'a str,
    pub prompt: &'a str,
    /// Snippet of the text the image came from, for gallery search.
    pub source_context: &'a str,
    pub category: &'a str,
}

/// Persists generated images and hands back durable references.
pub trait AssetSink {
    /// Persist a payload and return the durable URL to store in its place.
    fn persist(&mut self, request: &AssetSaveRequest<'_>) -> BotlogResult<String>;

    /// The shared placeholder substituted when persistence degrades.
    fn placeholder_url(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneAnalysis;

    struct NullSink;

    impl AssetSink for NullSink {
        fn persist(&mut self, request: &AssetSaveRequest<'_>) -> BotlogResult<String> {
            Ok(request.payload.to_string())
        }

        fn placeholder_url(&self) -> String {
            "/placeholder.png".to_string()
        }
    }

    #[test]
    fn test_trait_objects_compose() {
        let mut sink: Box<dyn AssetSink> = Box::new(NullSink);
        let url = sink
            .persist(&AssetSaveRequest {
                payload: "https://example.com/a.png",
                prompt: "p",
                source_context: "",
                category: "ai-generated",
            })
            .unwrap();
        assert_eq!(url, "https://example.com/a.png");
    }

    #[test]
    fn test_outcome_variants() {
        let structured = AnalysisOutcome::Scenes(SceneAnalysis {
            style: "watercolor".to_string(),
            scenes: Vec::new(),
            cover: None,
        });
        assert!(matches!(structured, AnalysisOutcome::Scenes(_)));
        let fallback = AnalysisOutcome::Freeform("### Prompt 1: ...".to_string());
        assert!(matches!(fallback, AnalysisOutcome::Freeform(_)));
    }
}
