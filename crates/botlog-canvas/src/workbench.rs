//! The scene workbench — drives the per-card "decompose into scenes,
//! generate per scene, commit" workflow.
//!
//! All in-flight bookkeeping is keyed by scene index. Triggering generation
//! for one scene never touches a sibling's state; that independence is the
//! central concurrency property of the tool.

use tracing::warn;

use botlog_core::{BotlogError, BotlogResult};

use crate::card::{Card, CardId, ImageAttachment};
use crate::provider::{
    AnalysisOutcome, AssetSaveRequest, AssetSink, GenerateRequest, ImageGenerator, SceneAnalyzer,
};
use crate::scene::{CoverSuggestion, Scene, SceneAnalysis, SceneStatus};

/// Gallery category for committed scene images.
const SCENE_CATEGORY: &str = "ai-generated";
/// Gallery category for cover images.
const COVER_CATEGORY: &str = "cover";

/// Owns the scenes and cover suggestion for the card currently open in the
/// image tool. Ephemeral: commit transfers the resolved images to the card
/// and caches the analysis there for later reopening.
#[derive(Debug, Clone)]
pub struct SceneWorkbench {
    card_id: CardId,
    card_content: String,
    style: String,
    scenes: Vec<Scene>,
    cover: Option<CoverSuggestion>,
    legacy_suggestion: Option<String>,
    reference_image: Option<String>,
}

impl SceneWorkbench {
    /// Open the workbench for a card. A cached analysis produced under the
    /// same style is restored; any other cached state forces re-analysis.
    pub fn open(card: &Card, style: impl Into<String>) -> Self {
        let style = style.into();
        let (scenes, cover) = match &card.analysis {
            Some(analysis) if analysis.style == style => {
                (analysis.scenes.clone(), analysis.cover.clone())
            }
            _ => (Vec::new(), None),
        };
        Self {
            card_id: card.id.clone(),
            card_content: card.content.clone(),
            style,
            scenes,
            cover,
            legacy_suggestion: None,
            reference_image: card.reference_image.clone(),
        }
    }

    pub fn card_id(&self) -> &CardId {
        &self.card_id
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn cover(&self) -> Option<&CoverSuggestion> {
        self.cover.as_ref()
    }

    /// The raw freeform suggestion, when the last analysis fell back to the
    /// legacy format.
    pub fn legacy_suggestion(&self) -> Option<&str> {
        self.legacy_suggestion.as_deref()
    }

    /// Switch the generation style. Prompts are style-bound, so switching
    /// after an analysis exists clears both the scene list and the cover
    /// suggestion to force re-analysis.
    pub fn set_style(&mut self, style: impl Into<String>) {
        let style = style.into();
        if style == self.style {
            return;
        }
        self.style = style;
        self.scenes.clear();
        self.cover = None;
    }

    /// Card-level reference image forwarded to generations that have no
    /// per-scene reference.
    pub fn set_reference_image(&mut self, data_uri: Option<String>) {
        self.reference_image = data_uri;
    }

    pub fn set_scene_reference(&mut self, index: usize, data_uri: Option<String>) -> BotlogResult<()> {
        self.scene_mut(index)?.reference_image = data_uri;
        Ok(())
    }

    pub fn set_scene_prompt(&mut self, index: usize, prompt: impl Into<String>) -> BotlogResult<()> {
        self.scene_mut(index)?.editable_prompt = prompt.into();
        Ok(())
    }

    pub fn set_cover_prompt(&mut self, prompt: impl Into<String>) -> BotlogResult<()> {
        self.require_cover_mut()?.editable_prompt = prompt.into();
        Ok(())
    }

    /// Run the analyzer over the card text and install the outcome,
    /// replacing any prior proposals.
    pub fn analyze(&mut self, analyzer: &dyn SceneAnalyzer) -> BotlogResult<()> {
        self.scenes.clear();
        self.cover = None;
        self.legacy_suggestion = None;
        let outcome = analyzer.analyze(&self.card_content, &self.style)?;
        self.apply_analysis(outcome);
        Ok(())
    }

    /// Install an analysis outcome. Structured scenes are normalized: indices
    /// reassigned by position, editable prompts seeded, generation state
    /// reset. A freeform outcome is kept for display and best-effort prompt
    /// extraction.
    pub fn apply_analysis(&mut self, outcome: AnalysisOutcome) {
        match outcome {
            AnalysisOutcome::Scenes(analysis) => {
                let mut scenes = analysis.scenes;
                for (index, scene) in scenes.iter_mut().enumerate() {
                    scene.scene_index = index;
                    scene.editable_prompt = scene.prompt.clone();
                    scene.generating = false;
                    scene.generated_image = None;
                    scene.reference_image = None;
                }
                let mut cover = analysis.cover;
                if let Some(cover) = cover.as_mut() {
                    cover.editable_prompt = cover.prompt.clone();
                    cover.generating = false;
                    cover.generated_image = None;
                    cover.reference_image = None;
                }
                let installed = SceneAnalysis {
                    style: self.style.clone(),
                    scenes,
                    cover,
                };
                if !installed.scenes.is_empty() && !installed.covers_losslessly(&self.card_content)
                {
                    // Tolerated: the compositor degrades unanchorable images
                    // to end-of-card placement.
                    warn!(
                        card = %self.card_id,
                        "scene spans do not reconstruct the analyzed text"
                    );
                }
                self.scenes = installed.scenes;
                self.cover = installed.cover;
            }
            AnalysisOutcome::Freeform(text) => {
                self.legacy_suggestion = Some(text);
            }
        }
    }

    /// Mark one scene as generating. Rejected synchronously (before any I/O)
    /// unless that scene is currently `Proposed`.
    pub fn begin_scene_generation(&mut self, index: usize) -> BotlogResult<()> {
        let scene = self.scene_mut(index)?;
        match scene.status() {
            SceneStatus::Proposed => {
                scene.generating = true;
                Ok(())
            }
            SceneStatus::Generating => Err(BotlogError::precondition(format!(
                "scene {} is already generating",
                index
            ))),
            SceneStatus::Resolved => Err(BotlogError::precondition(format!(
                "scene {} already has a generated image",
                index
            ))),
        }
    }

    /// Record a successful generation for one scene.
    pub fn complete_scene_generation(
        &mut self,
        index: usize,
        url: impl Into<String>,
        prompt: impl Into<String>,
    ) -> BotlogResult<()> {
        let scene = self.scene_mut(index)?;
        scene.generated_image = Some(url.into());
        scene.editable_prompt = prompt.into();
        scene.generating = false;
        Ok(())
    }

    /// Roll one scene back to `Proposed` after a failed generation, keeping
    /// its editable prompt so the user can retry.
    pub fn fail_scene_generation(&mut self, index: usize) -> BotlogResult<()> {
        self.scene_mut(index)?.generating = false;
        Ok(())
    }

    pub fn begin_cover_generation(&mut self) -> BotlogResult<()> {
        let cover = self.require_cover_mut()?;
        match cover.status() {
            SceneStatus::Proposed => {
                cover.generating = true;
                Ok(())
            }
            SceneStatus::Generating => Err(BotlogError::precondition(
                "cover is already generating".to_string(),
            )),
            SceneStatus::Resolved => Err(BotlogError::precondition(
                "cover already has a generated image".to_string(),
            )),
        }
    }

    pub fn complete_cover_generation(
        &mut self,
        url: impl Into<String>,
        prompt: impl Into<String>,
    ) -> BotlogResult<()> {
        let cover = self.require_cover_mut()?;
        cover.generated_image = Some(url.into());
        cover.editable_prompt = prompt.into();
        cover.generating = false;
        Ok(())
    }

    pub fn fail_cover_generation(&mut self) -> BotlogResult<()> {
        self.require_cover_mut()?.generating = false;
        Ok(())
    }

    /// Generate one scene's image with its effective prompt.
    pub fn generate_scene(
        &mut self,
        index: usize,
        generator: &dyn ImageGenerator,
        sink: &mut dyn AssetSink,
    ) -> BotlogResult<String> {
        let prompt = self.scene(index)?.effective_prompt().to_string();
        self.generate_scene_with_prompt(index, &prompt, generator, sink)
    }

    /// Generate one scene's image with an explicit prompt. On success the
    /// payload is persisted through the sink and the durable URL — not the
    /// raw payload — is stored on the scene. On failure the scene reverts to
    /// `Proposed` and the error is returned for the caller to surface.
    pub fn generate_scene_with_prompt(
        &mut self,
        index: usize,
        prompt: &str,
        generator: &dyn ImageGenerator,
        sink: &mut dyn AssetSink,
    ) -> BotlogResult<String> {
        self.begin_scene_generation(index)?;
        let (source_text, reference) = {
            let scene = &self.scenes[index];
            (
                scene.original_text.clone(),
                scene
                    .reference_image
                    .clone()
                    .or_else(|| self.reference_image.clone()),
            )
        };
        let request = GenerateRequest {
            prompt,
            source_text: Some(&source_text),
            reference_image: reference.as_deref(),
        };
        let image = match generator.generate(&request) {
            Ok(image) => image,
            Err(err) => {
                self.fail_scene_generation(index)?;
                return Err(err);
            }
        };
        let url = persist_or_keep(sink, &image.url, prompt, &source_text, SCENE_CATEGORY);
        self.complete_scene_generation(index, url.clone(), prompt)?;
        Ok(url)
    }

    /// Generate the cover image. Independent of every scene's state.
    pub fn generate_cover(
        &mut self,
        generator: &dyn ImageGenerator,
        sink: &mut dyn AssetSink,
    ) -> BotlogResult<String> {
        let prompt = self.require_cover()?.effective_prompt().to_string();
        self.begin_cover_generation()?;
        let reference = self
            .cover
            .as_ref()
            .and_then(|c| c.reference_image.clone())
            .or_else(|| self.reference_image.clone());
        let request = GenerateRequest {
            prompt: &prompt,
            source_text: Some(&self.card_content),
            reference_image: reference.as_deref(),
        };
        let image = match generator.generate(&request) {
            Ok(image) => image,
            Err(err) => {
                self.fail_cover_generation()?;
                return Err(err);
            }
        };
        let url = persist_or_keep(sink, &image.url, &prompt, &self.card_content, COVER_CATEGORY);
        self.complete_cover_generation(url.clone(), prompt)?;
        Ok(url)
    }

    /// True while any scene or the cover has a request in flight. Callers use
    /// this to warn before closing the tool, since an issued request cannot
    /// be retracted.
    pub fn is_generating(&self) -> bool {
        self.scenes.iter().any(|s| s.generating)
            || self.cover.as_ref().map(|c| c.generating).unwrap_or(false)
    }

    /// Number of resolved images (scenes plus cover) ready to commit.
    pub fn resolved_count(&self) -> usize {
        let scenes = self
            .scenes
            .iter()
            .filter(|s| s.generated_image.is_some())
            .count();
        let cover = self
            .cover
            .as_ref()
            .map(|c| usize::from(c.generated_image.is_some()))
            .unwrap_or(0);
        scenes + cover
    }

    /// Commit every resolved image back to the card, consuming the
    /// workbench.
    ///
    /// Scene images become scene-anchored attachments appended after the
    /// card's existing ones — previously committed attachments are never
    /// discarded. A resolved cover is written to the card's primary image
    /// slot, taking precedence over any pre-existing primary. The full
    /// analysis is cached on the card so reopening restores this state.
    ///
    /// Precondition: at least one resolved image.
    pub fn commit(self, card: &mut Card) -> BotlogResult<usize> {
        if card.id != self.card_id {
            return Err(BotlogError::InvalidArgument(format!(
                "workbench is open for card {}, not {}",
                self.card_id, card.id
            )));
        }
        let committed = self.resolved_count();
        if committed == 0 {
            return Err(BotlogError::precondition(
                "no resolved images to commit".to_string(),
            ));
        }

        for scene in &self.scenes {
            if let Some(url) = &scene.generated_image {
                card.push_image(ImageAttachment::anchored(
                    url.clone(),
                    scene.effective_prompt(),
                    scene.original_text.clone(),
                    scene.scene_index,
                ));
            }
        }

        if let Some(cover) = &self.cover {
            if let Some(url) = &cover.generated_image {
                card.set_primary_image(url.clone(), cover.effective_prompt());
            }
        }

        card.analysis = Some(SceneAnalysis {
            style: self.style,
            scenes: self.scenes,
            cover: self.cover,
        });
        card.reference_image = self.reference_image;

        Ok(committed)
    }

    fn scene(&self, index: usize) -> BotlogResult<&Scene> {
        self.scenes
            .get(index)
            .ok_or_else(|| BotlogError::InvalidArgument(format!("no scene at index {}", index)))
    }

    fn scene_mut(&mut self, index: usize) -> BotlogResult<&mut Scene> {
        self.scenes
            .get_mut(index)
            .ok_or_else(|| BotlogError::InvalidArgument(format!("no scene at index {}", index)))
    }

    fn require_cover(&self) -> BotlogResult<&CoverSuggestion> {
        self.cover
            .as_ref()
            .ok_or_else(|| BotlogError::InvalidArgument("no cover suggestion".to_string()))
    }

    fn require_cover_mut(&mut self) -> BotlogResult<&mut CoverSuggestion> {
        self.cover
            .as_mut()
            .ok_or_else(|| BotlogError::InvalidArgument("no cover suggestion".to_string()))
    }
}

/// Persist a payload through the sink, falling back to the raw payload when
/// the store is unavailable. Degraded durability, never a workflow failure.
fn persist_or_keep(
    sink: &mut dyn AssetSink,
    payload: &str,
    prompt: &str,
    source_text: &str,
    category: &str,
) -> String {
    let context: String = source_text.chars().take(100).collect();
    match sink.persist(&AssetSaveRequest {
        payload,
        prompt,
        source_context: &context,
        category,
    }) {
        Ok(url) => url,
        Err(err) => {
            warn!("asset store unavailable, keeping raw payload: {}", err);
            payload.to_string()
        }
    }
}
