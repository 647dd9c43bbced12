use botlog_core::BotlogError;

use crate::canvas::Canvas;

/// Validate a canvas for structural correctness.
pub fn validate_canvas(canvas: &Canvas) -> Result<(), Vec<BotlogError>> {
    let mut errors = Vec::new();

    let mut card_ids = std::collections::HashSet::new();
    for card in canvas.cards() {
        if !card_ids.insert(&card.id) {
            errors.push(BotlogError::Validation(format!(
                "duplicate card id: {}",
                card.id
            )));
        }

        for (index, attachment) in card.images.iter().enumerate() {
            if attachment.url.is_empty() {
                errors.push(BotlogError::Validation(format!(
                    "card '{}' attachment {} has an empty url",
                    card.id, index
                )));
            }
            // An empty anchor is neither anchored nor regular; it would be
            // skipped by the splice and silently demoted, so flag it here.
            if attachment
                .original_text
                .as_deref()
                .map(|t| t.is_empty())
                .unwrap_or(false)
            {
                errors.push(BotlogError::Validation(format!(
                    "card '{}' attachment {} has an empty anchor text",
                    card.id, index
                )));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::ImageAttachment;

    #[test]
    fn test_validate_clean_canvas() {
        let mut canvas = Canvas::new();
        let id = canvas.insert(None, "a");
        canvas
            .get_mut(&id)
            .unwrap()
            .push_image(ImageAttachment::anchored("a.png", "p", "a", 0));
        assert!(validate_canvas(&canvas).is_ok());
    }

    #[test]
    fn test_validate_empty_anchor() {
        let mut canvas = Canvas::new();
        let id = canvas.insert(None, "a");
        canvas.get_mut(&id).unwrap().push_image(ImageAttachment {
            original_text: Some(String::new()),
            ..ImageAttachment::new("a.png", "p")
        });
        let errors = validate_canvas(&canvas).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("empty anchor"));
    }

    #[test]
    fn test_validate_empty_url() {
        let mut canvas = Canvas::new();
        let id = canvas.insert(None, "a");
        canvas
            .get_mut(&id)
            .unwrap()
            .push_image(ImageAttachment::new("", "p"));
        assert!(validate_canvas(&canvas).is_err());
    }
}
