use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scene::SceneAnalysis;

/// Unique identifier for a card, stable for the card's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardId(pub String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh random identifier.
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a card's regular images sit relative to its text in the final article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardLayout {
    /// Images stacked after the text (the default).
    #[default]
    Full,
    /// Two-column layout, images on the left.
    Left,
    /// Two-column layout, images on the right.
    Right,
    /// Images centered above the text.
    Center,
}

/// An image attached to a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// Durable URL, or an embedded `data:` payload awaiting externalization.
    pub url: String,
    /// The text used to generate the image (or supplied manually).
    pub prompt: String,
    /// Exact substring of the owning card's content this image illustrates.
    /// Present and non-empty marks the attachment as scene-anchored; absent
    /// means regular end-of-card placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    /// Tie-break ordering among scene-anchored images on the same card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_index: Option<usize>,
}

impl ImageAttachment {
    /// A regular attachment with no text anchor.
    pub fn new(url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            prompt: prompt.into(),
            original_text: None,
            scene_index: None,
        }
    }

    /// A scene-anchored attachment tagged with the text span it illustrates.
    pub fn anchored(
        url: impl Into<String>,
        prompt: impl Into<String>,
        original_text: impl Into<String>,
        scene_index: usize,
    ) -> Self {
        Self {
            url: url.into(),
            prompt: prompt.into(),
            original_text: Some(original_text.into()),
            scene_index: Some(scene_index),
        }
    }

    /// Whether this attachment is spliced inline at its originating span.
    pub fn is_scene_anchored(&self) -> bool {
        self.original_text
            .as_deref()
            .map(|t| !t.is_empty())
            .unwrap_or(false)
    }

    /// Whether the payload is an embedded data URI rather than a durable URL.
    pub fn is_embedded(&self) -> bool {
        self.url.starts_with("data:")
    }
}

/// One block of article content plus its attached images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    /// Unique card identifier.
    pub id: CardId,
    /// Mutable markdown-flavored text.
    pub content: String,
    /// Ordered image attachments.
    #[serde(default)]
    pub images: Vec<ImageAttachment>,
    /// Legacy single-image mirror of `images[0]` (or the committed cover).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
    /// Layout mode for regular images at compose time.
    #[serde(default)]
    pub layout: CardLayout,
    /// Memoized last analysis, restored when the image tool reopens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<SceneAnalysis>,
    /// Card-level reference image for generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Create a new card with the given content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: CardId::fresh(),
            content: content.into(),
            images: Vec::new(),
            image: None,
            image_prompt: None,
            layout: CardLayout::default(),
            analysis: None,
            reference_image: None,
            created_at: Utc::now(),
        }
    }

    /// Append an attachment. The legacy primary mirror is filled only if the
    /// card has no primary yet.
    pub fn push_image(&mut self, attachment: ImageAttachment) {
        if self.image.is_none() {
            self.image = Some(attachment.url.clone());
            self.image_prompt = Some(attachment.prompt.clone());
        }
        self.images.push(attachment);
    }

    /// Overwrite the primary image slot (used by a committed cover, which
    /// takes precedence over any pre-existing primary).
    pub fn set_primary_image(&mut self, url: impl Into<String>, prompt: impl Into<String>) {
        self.image = Some(url.into());
        self.image_prompt = Some(prompt.into());
    }

    /// Remove one attachment by index and re-mirror the primary from the new
    /// `images[0]`, or clear it if the list is now empty.
    pub fn remove_image(&mut self, index: usize) -> Option<ImageAttachment> {
        if index >= self.images.len() {
            return None;
        }
        let removed = self.images.remove(index);
        match self.images.first() {
            Some(first) => {
                self.image = Some(first.url.clone());
                self.image_prompt = Some(first.prompt.clone());
            }
            None => {
                self.image = None;
                self.image_prompt = None;
            }
        }
        Some(removed)
    }

    /// First image exposed by this card: the primary slot, or the first
    /// attachment. Used for article cover resolution.
    pub fn first_image_url(&self) -> Option<&str> {
        self.image
            .as_deref()
            .or_else(|| self.images.first().map(|a| a.url.as_str()))
    }

    /// A deep copy with a freshly minted id and a new timestamp. Attachments
    /// and the cached analysis are copied, never shared.
    pub fn duplicate(&self) -> Card {
        let mut copy = self.clone();
        copy.id = CardId::fresh();
        copy.created_at = Utc::now();
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_image_fills_primary_once() {
        let mut card = Card::new("hello");
        card.push_image(ImageAttachment::new("a.png", "first"));
        card.push_image(ImageAttachment::new("b.png", "second"));
        assert_eq!(card.image.as_deref(), Some("a.png"));
        assert_eq!(card.images.len(), 2);
    }

    #[test]
    fn test_remove_image_remirrors_primary() {
        let mut card = Card::new("hello");
        card.push_image(ImageAttachment::new("a.png", "first"));
        card.push_image(ImageAttachment::new("b.png", "second"));
        card.remove_image(0);
        assert_eq!(card.image.as_deref(), Some("b.png"));
        assert_eq!(card.image_prompt.as_deref(), Some("second"));
        card.remove_image(0);
        assert!(card.image.is_none());
        assert!(card.images.is_empty());
    }

    #[test]
    fn test_duplicate_is_a_deep_copy() {
        let mut card = Card::new("hello");
        card.push_image(ImageAttachment::new("a.png", "p"));
        let mut copy = card.duplicate();
        assert_ne!(copy.id, card.id);
        copy.images[0].url = "changed.png".to_string();
        assert_eq!(card.images[0].url, "a.png");
    }

    #[test]
    fn test_anchored_discriminator() {
        let anchored = ImageAttachment::anchored("a.png", "p", "Hello", 0);
        assert!(anchored.is_scene_anchored());
        let regular = ImageAttachment::new("b.png", "p");
        assert!(!regular.is_scene_anchored());
        let empty_anchor = ImageAttachment {
            original_text: Some(String::new()),
            ..ImageAttachment::new("c.png", "p")
        };
        assert!(!empty_anchor.is_scene_anchored());
    }
}
