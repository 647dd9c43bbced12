//! The style library — reusable writing and visual styles ("skills")
//! distilled by the style analyzer and fed back into generation prompts.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use botlog_core::{BotlogConfig, BotlogResult};

/// Library cap; the oldest styles fall off the end.
const MAX_STYLES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleKind {
    Writing,
    Visual,
}

/// One saved style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleSkill {
    pub id: String,
    pub name: String,
    pub kind: StyleKind,
    #[serde(default)]
    pub description: String,
    /// The analyzer's distilled description of the style.
    pub analysis: String,
    /// The sample the style was distilled from (article text or image URL).
    #[serde(default)]
    pub source_content: String,
    /// Ready-to-use prompt fragment.
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StyleSkill {
    /// Render the skill as a prompt fragment for generation.
    pub fn to_prompt(&self) -> String {
        match self.kind {
            StyleKind::Writing => format!(
                "Imitate the following writing style:\n{}\n\nWrite the content in this style.",
                self.analysis
            ),
            StyleKind::Visual => format!(
                "Visual style reference: {}\n\nApply this visual style to the generated image.",
                self.analysis
            ),
        }
    }
}

/// Fields for a new style; id and timestamps are minted on save.
#[derive(Debug, Clone)]
pub struct NewStyle {
    pub name: String,
    pub kind: StyleKind,
    pub description: String,
    pub analysis: String,
    pub source_content: String,
    pub prompt: String,
}

/// JSON-file-backed style library, newest first, capped at 50 entries.
pub struct StyleLibrary {
    path: PathBuf,
    styles: Vec<StyleSkill>,
}

impl StyleLibrary {
    pub fn open(config: &BotlogConfig) -> BotlogResult<Self> {
        let dir = expand_tilde(&config.storage.style_dir);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("styles.json");
        let styles = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            match serde_json::from_str(&raw) {
                Ok(styles) => styles,
                Err(err) => {
                    warn!("style library is corrupt, starting empty: {}", err);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        Ok(Self { path, styles })
    }

    fn persist(&self) -> BotlogResult<()> {
        let raw = serde_json::to_string_pretty(&self.styles)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn all(&self) -> &[StyleSkill] {
        &self.styles
    }

    pub fn by_kind(&self, kind: StyleKind) -> Vec<&StyleSkill> {
        self.styles.iter().filter(|s| s.kind == kind).collect()
    }

    pub fn get(&self, id: &str) -> Option<&StyleSkill> {
        self.styles.iter().find(|s| s.id == id)
    }

    /// Save a new style at the front of the library.
    pub fn save(&mut self, new: NewStyle) -> BotlogResult<&StyleSkill> {
        let now = Utc::now();
        let skill = StyleSkill {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            kind: new.kind,
            description: new.description,
            analysis: new.analysis,
            source_content: new.source_content,
            prompt: new.prompt,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.styles.insert(0, skill);
        self.styles.truncate(MAX_STYLES);
        self.persist()?;
        Ok(&self.styles[0])
    }

    pub fn update_tags(&mut self, id: &str, tags: Vec<String>) -> BotlogResult<bool> {
        let Some(skill) = self.styles.iter_mut().find(|s| s.id == id) else {
            return Ok(false);
        };
        skill.tags = tags;
        skill.updated_at = Utc::now();
        self.persist()?;
        Ok(true)
    }

    pub fn delete(&mut self, id: &str) -> BotlogResult<bool> {
        let before = self.styles.len();
        self.styles.retain(|s| s.id != id);
        let removed = self.styles.len() != before;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Case-insensitive search over name, description, and tags.
    pub fn search(&self, term: &str) -> Vec<&StyleSkill> {
        let term = term.to_lowercase();
        self.styles
            .iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&term)
                    || s.description.to_lowercase().contains(&term)
                    || s.tags.iter().any(|t| t.to_lowercase().contains(&term))
            })
            .collect()
    }

    pub fn clear(&mut self) -> BotlogResult<()> {
        self.styles.clear();
        self.persist()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            if path == "~" {
                return home;
            }
            return home.join(path.trim_start_matches("~/"));
        }
    }
    PathBuf::from(path)
}
