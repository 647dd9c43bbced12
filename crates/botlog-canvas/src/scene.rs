use serde::{Deserialize, Serialize};

/// Generation lifecycle of a single scene (or the cover), independently of
/// its siblings. There is no failure state: a failed generation returns the
/// scene to `Proposed` with its editable prompt intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneStatus {
    /// Has a prompt, no image yet.
    Proposed,
    /// A generation request is in flight.
    Generating,
    /// Has a generated image (terminal for this tool session).
    Resolved,
}

/// An analyzer-identified span of a card's text paired with a suggested
/// illustration. Ephemeral — lives in the workbench until committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Zero-based position assigned by the analyzer; sort order.
    pub scene_index: usize,
    /// The exact text span this scene covers.
    pub original_text: String,
    /// What the scene depicts, in the author's language.
    #[serde(default)]
    pub scene_description: String,
    /// Analyzer-suggested generation prompt.
    pub prompt: String,
    /// User-modified prompt; seeded from `prompt`.
    #[serde(default)]
    pub editable_prompt: String,
    /// Per-scene reference image, distinct from the card-level reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<String>,
    /// True only while this scene's generation request is in flight.
    #[serde(default)]
    pub generating: bool,
    /// Set once generation succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_image: Option<String>,
}

impl Scene {
    pub fn status(&self) -> SceneStatus {
        if self.generated_image.is_some() {
            SceneStatus::Resolved
        } else if self.generating {
            SceneStatus::Generating
        } else {
            SceneStatus::Proposed
        }
    }

    /// The prompt a generation should use: the user's edit when present,
    /// otherwise the analyzer suggestion.
    pub fn effective_prompt(&self) -> &str {
        if self.editable_prompt.is_empty() {
            &self.prompt
        } else {
            &self.editable_prompt
        }
    }
}

/// A whole-card illustration candidate — structurally a [`Scene`] without a
/// text span, since it represents the entire card rather than one passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverSuggestion {
    /// What the cover depicts, in the author's language.
    #[serde(default)]
    pub description: String,
    pub prompt: String,
    #[serde(default)]
    pub editable_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<String>,
    #[serde(default)]
    pub generating: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_image: Option<String>,
}

impl CoverSuggestion {
    pub fn status(&self) -> SceneStatus {
        if self.generated_image.is_some() {
            SceneStatus::Resolved
        } else if self.generating {
            SceneStatus::Generating
        } else {
            SceneStatus::Proposed
        }
    }

    pub fn effective_prompt(&self) -> &str {
        if self.editable_prompt.is_empty() {
            &self.prompt
        } else {
            &self.editable_prompt
        }
    }
}

/// A full analyzer result for one card. Cached on the card at commit so
/// reopening the image tool restores prior state instead of re-querying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneAnalysis {
    /// The style label the analysis was produced under; prompts are
    /// style-bound, so a style switch invalidates the whole analysis.
    pub style: String,
    pub scenes: Vec<Scene>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<CoverSuggestion>,
}

impl SceneAnalysis {
    /// Concatenation of all scene spans in index order. The analyzer contract
    /// says this reconstructs the analyzed input losslessly; consumers
    /// tolerate violations.
    pub fn concatenated_text(&self) -> String {
        let mut ordered: Vec<&Scene> = self.scenes.iter().collect();
        ordered.sort_by_key(|s| s.scene_index);
        ordered.iter().map(|s| s.original_text.as_str()).collect()
    }

    /// Whether the scene spans reconstruct `source` exactly.
    pub fn covers_losslessly(&self, source: &str) -> bool {
        self.concatenated_text() == source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(index: usize, text: &str) -> Scene {
        Scene {
            scene_index: index,
            original_text: text.to_string(),
            scene_description: String::new(),
            prompt: format!("prompt {}", index),
            editable_prompt: String::new(),
            reference_image: None,
            generating: false,
            generated_image: None,
        }
    }

    #[test]
    fn test_status_transitions() {
        let mut s = scene(0, "a");
        assert_eq!(s.status(), SceneStatus::Proposed);
        s.generating = true;
        assert_eq!(s.status(), SceneStatus::Generating);
        s.generating = false;
        s.generated_image = Some("img.png".to_string());
        assert_eq!(s.status(), SceneStatus::Resolved);
    }

    #[test]
    fn test_effective_prompt_prefers_edit() {
        let mut s = scene(0, "a");
        assert_eq!(s.effective_prompt(), "prompt 0");
        s.editable_prompt = "edited".to_string();
        assert_eq!(s.effective_prompt(), "edited");
    }

    #[test]
    fn test_concatenation_follows_scene_index() {
        let analysis = SceneAnalysis {
            style: "watercolor".to_string(),
            scenes: vec![scene(1, " world"), scene(0, "hello")],
            cover: None,
        };
        assert_eq!(analysis.concatenated_text(), "hello world");
        assert!(analysis.covers_losslessly("hello world"));
        assert!(!analysis.covers_losslessly("hello"));
    }
}
