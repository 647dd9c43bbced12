//! Canvas → article composition.
//!
//! Scene-anchored images are spliced immediately after the text span they
//! were generated for; everything else lands in the card's end-of-card image
//! area according to its layout mode. The only hard failure is an empty
//! canvas — every per-card and per-image anomaly degrades in place.

use serde::{Deserialize, Serialize};
use tracing::warn;

use botlog_canvas::{AssetSaveRequest, AssetSink, Canvas, Card, CardLayout, ImageAttachment};
use botlog_core::{BotlogError, BotlogResult};

/// Separator between cards in the final body.
const CARD_SEPARATOR: &str = "\n\n---\n\n";
/// Excerpt length in characters.
const EXCERPT_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    #[default]
    Draft,
    Published,
}

/// A composed, publishable article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub cover_image: String,
    pub category: String,
    pub tags: Vec<String>,
    pub status: ArticleStatus,
    pub has_ai_images: bool,
}

/// Knobs for composition; the defaults match the publish flow.
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Cover used when no card exposes any image.
    pub default_cover: String,
    pub category: String,
    pub tags: Vec<String>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            default_cover: "/blog/demo_1.png".to_string(),
            category: "ai-lab".to_string(),
            tags: vec!["AI Generated".to_string()],
        }
    }
}

/// Compose the canvas into a finished article.
///
/// Embedded (`data:`) payloads are externalized through `sink` first; an
/// image whose externalization fails is degraded to the sink's shared
/// placeholder rather than aborting the publish.
pub fn compose(
    canvas: &Canvas,
    sink: &mut dyn AssetSink,
    options: &ComposeOptions,
) -> BotlogResult<Article> {
    if canvas.is_empty() {
        return Err(BotlogError::precondition(
            "cannot compose an empty canvas".to_string(),
        ));
    }

    let resolved: Vec<Card> = canvas
        .cards()
        .iter()
        .map(|card| resolve_card(card, sink))
        .collect();

    let content = resolved
        .iter()
        .enumerate()
        .map(|(index, card)| compose_card(card, index))
        .collect::<Vec<_>>()
        .join(CARD_SEPARATOR);

    let first = &resolved[0];
    let cover_image = resolved
        .iter()
        .find_map(|c| c.first_image_url())
        .unwrap_or(&options.default_cover)
        .to_string();
    let has_ai_images = resolved.iter().any(|c| !c.images.is_empty());

    Ok(Article {
        title: extract_title(&first.content),
        excerpt: extract_excerpt(&first.content),
        content,
        cover_image,
        category: options.category.clone(),
        tags: options.tags.clone(),
        status: ArticleStatus::Draft,
        has_ai_images,
    })
}

/// Externalize every embedded payload on a card, degrading individual
/// failures to the shared placeholder.
fn resolve_card(card: &Card, sink: &mut dyn AssetSink) -> Card {
    let mut resolved = card.clone();
    let context: String = card.content.chars().take(100).collect();

    for attachment in &mut resolved.images {
        if !attachment.is_embedded() {
            continue;
        }
        let previous = attachment.url.clone();
        attachment.url = externalize(sink, &previous, &attachment.prompt, &context);
        // Keep the legacy mirror pointing at the same image.
        if resolved.image.as_deref() == Some(previous.as_str()) {
            resolved.image = Some(attachment.url.clone());
        }
    }

    // A primary that never appeared in the attachment list (legacy single
    // image) may itself be embedded.
    if let Some(primary) = resolved.image.clone() {
        if primary.starts_with("data:") {
            let prompt = resolved.image_prompt.clone().unwrap_or_default();
            resolved.image = Some(externalize(sink, &primary, &prompt, &context));
        }
    }

    resolved
}

fn externalize(sink: &mut dyn AssetSink, payload: &str, prompt: &str, context: &str) -> String {
    match sink.persist(&AssetSaveRequest {
        payload,
        prompt,
        source_context: context,
        category: "ai-generated",
    }) {
        Ok(url) => url,
        Err(err) => {
            warn!("failed to externalize embedded image, using placeholder: {}", err);
            sink.placeholder_url()
        }
    }
}

/// Compose one card: splice anchored images, then append the rest per the
/// card's layout mode.
fn compose_card(card: &Card, card_index: usize) -> String {
    let (anchored, mut regular): (Vec<&ImageAttachment>, Vec<&ImageAttachment>) =
        card.images.iter().partition(|a| a.is_scene_anchored());

    let mut text = card.content.clone();
    let spliced_any = !anchored.is_empty();

    // Descending scene order keeps not-yet-processed anchors' offsets stable
    // relative to each other while we insert.
    let mut ordered = anchored;
    ordered.sort_by(|a, b| b.scene_index.unwrap_or(0).cmp(&a.scene_index.unwrap_or(0)));

    for attachment in ordered {
        let Some(anchor) = attachment.original_text.as_deref() else {
            regular.push(attachment);
            continue;
        };
        match text.find(anchor) {
            Some(at) => {
                let markdown = format!("\n\n![illustration]({})\n\n", attachment.url);
                text.insert_str(at + anchor.len(), &markdown);
            }
            None => {
                // The card was edited after generation; the image degrades to
                // regular end-of-card placement.
                regular.push(attachment);
            }
        }
    }

    if regular.is_empty() {
        return text;
    }

    let stacked = regular
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "![illustration-{}-{}]({})",
                card_index + 1,
                i + 1,
                a.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    // Once scene splicing happened, remaining images always stack after the
    // text; the layout modes only apply to cards composed without splices.
    if spliced_any {
        return format!("{}\n\n{}", text, stacked);
    }

    match card.layout {
        CardLayout::Full => format!("{}\n\n{}", text, stacked),
        CardLayout::Left => two_column(&regular, &text, true),
        CardLayout::Right => two_column(&regular, &text, false),
        CardLayout::Center => format!("{}\n\n{}", centered_block(&regular), text),
    }
}

fn image_tags(images: &[&ImageAttachment], class: &str) -> String {
    images
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                r#"<img src="{}" alt="illustration-{}" class="{}" />"#,
                a.url,
                i + 1,
                class
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn two_column(images: &[&ImageAttachment], text: &str, images_first: bool) -> String {
    let column = format!(
        "<div class=\"w-full md:w-1/2 space-y-4\">\n{}\n</div>",
        image_tags(images, "w-full object-cover rounded")
    );
    let prose = format!("<div class=\"flex-1\">\n\n{}\n\n</div>", text);
    let (left, right) = if images_first {
        (column, prose)
    } else {
        (prose, column)
    };
    format!(
        "<div class=\"flex flex-col md:flex-row gap-4 items-start\">\n{}\n{}\n</div>",
        left, right
    )
}

fn centered_block(images: &[&ImageAttachment]) -> String {
    format!(
        "<div class=\"text-center space-y-4 my-6\">\n{}\n</div>",
        image_tags(images, "mx-auto max-w-lg rounded")
    )
}

/// Title: the first line of the first card, stripped of heading markers.
fn extract_title(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or("");
    let title = first_line.trim_start_matches('#').trim();
    if title.is_empty() {
        "Untitled article".to_string()
    } else {
        title.to_string()
    }
}

/// Excerpt: the first 100 characters with markdown markers removed.
fn extract_excerpt(content: &str) -> String {
    let cleaned: String = content
        .chars()
        .filter(|c| !matches!(c, '#' | '*' | '_'))
        .collect();
    let mut excerpt: String = cleaned.chars().take(EXCERPT_LEN).collect();
    excerpt = excerpt.trim().to_string();
    if cleaned.chars().count() > EXCERPT_LEN {
        excerpt.push_str("...");
    }
    excerpt
}

#[cfg(test)]
mod tests {
    use super::*;
    use botlog_canvas::ImageAttachment;
    use botlog_core::BotlogResult;

    struct PassthroughSink;

    impl AssetSink for PassthroughSink {
        fn persist(&mut self, request: &AssetSaveRequest<'_>) -> BotlogResult<String> {
            Ok(format!("stored://{}", request.payload.len()))
        }

        fn placeholder_url(&self) -> String {
            "/placeholder.png".to_string()
        }
    }

    struct BrokenSink;

    impl AssetSink for BrokenSink {
        fn persist(&mut self, _request: &AssetSaveRequest<'_>) -> BotlogResult<String> {
            Err(BotlogError::store("quota exceeded"))
        }

        fn placeholder_url(&self) -> String {
            "/placeholder.png".to_string()
        }
    }

    #[test]
    fn test_empty_canvas_is_rejected() {
        let canvas = Canvas::new();
        let err = compose(&canvas, &mut PassthroughSink, &ComposeOptions::default()).unwrap_err();
        assert!(matches!(err, BotlogError::Precondition(_)));
    }

    #[test]
    fn test_splice_lands_after_anchor() {
        let mut canvas = Canvas::new();
        let id = canvas.insert(None, "Hello world");
        canvas
            .get_mut(&id)
            .unwrap()
            .push_image(ImageAttachment::anchored("img.png", "p", "Hello", 0));

        let article = compose(&canvas, &mut PassthroughSink, &ComposeOptions::default()).unwrap();
        assert!(article
            .content
            .starts_with("Hello\n\n![illustration](img.png)\n\n world"));
    }

    #[test]
    fn test_broken_anchor_degrades_to_end_of_card() {
        let mut canvas = Canvas::new();
        let id = canvas.insert(None, "Completely rewritten text");
        canvas
            .get_mut(&id)
            .unwrap()
            .push_image(ImageAttachment::anchored("img.png", "p", "Hello", 0));

        let article = compose(&canvas, &mut PassthroughSink, &ComposeOptions::default()).unwrap();
        assert!(article.content.starts_with("Completely rewritten text"));
        assert!(article.content.contains("![illustration-1-1](img.png)"));
    }

    #[test]
    fn test_embedded_payload_externalized_or_placeholder() {
        let mut canvas = Canvas::new();
        let id = canvas.insert(None, "text");
        canvas
            .get_mut(&id)
            .unwrap()
            .push_image(ImageAttachment::new("data:image/png;base64,AAAA", "p"));

        let stored = compose(&canvas, &mut PassthroughSink, &ComposeOptions::default()).unwrap();
        assert!(stored.content.contains("stored://"));
        assert!(!stored.content.contains("data:image"));

        let degraded = compose(&canvas, &mut BrokenSink, &ComposeOptions::default()).unwrap();
        assert!(degraded.content.contains("/placeholder.png"));
        assert!(!degraded.content.contains("data:image"));
    }

    #[test]
    fn test_title_and_excerpt_extraction() {
        assert_eq!(extract_title("## My Title\nrest"), "My Title");
        assert_eq!(extract_title(""), "Untitled article");
        let excerpt = extract_excerpt("**Bold** start");
        assert_eq!(excerpt, "Bold start");
        let long = extract_excerpt(&"a".repeat(200));
        assert!(long.ends_with("..."));
        assert_eq!(long.chars().count(), EXCERPT_LEN + 3);
    }

    #[test]
    fn test_layout_modes() {
        for (layout, needle) in [
            (CardLayout::Left, "md:flex-row"),
            (CardLayout::Right, "md:flex-row"),
            (CardLayout::Center, "text-center"),
        ] {
            let mut canvas = Canvas::new();
            let id = canvas.insert(None, "text");
            let card = canvas.get_mut(&id).unwrap();
            card.layout = layout;
            card.push_image(ImageAttachment::new("a.png", "p"));
            let article =
                compose(&canvas, &mut PassthroughSink, &ComposeOptions::default()).unwrap();
            assert!(article.content.contains(needle), "layout {:?}", layout);
        }
    }

    #[test]
    fn test_cover_falls_back_to_default() {
        let mut canvas = Canvas::new();
        canvas.insert(None, "no images here");
        let article = compose(&canvas, &mut PassthroughSink, &ComposeOptions::default()).unwrap();
        assert_eq!(article.cover_image, "/blog/demo_1.png");
        assert!(!article.has_ai_images);
    }
}
