use serde::{Deserialize, Serialize};

use crate::card::{Card, CardId, CardLayout, ImageAttachment};

/// Direction for a single-step card move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// The draft article — an ordered, mutable sequence of cards. Iteration
/// order of the underlying sequence IS article order; there is no separate
/// sort key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Canvas {
    cards: Vec<Card>,
}

impl Canvas {
    pub fn new() -> Self {
        Self { cards: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn cards_mut(&mut self) -> impl Iterator<Item = &mut Card> {
        self.cards.iter_mut()
    }

    pub fn get(&self, id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|c| &c.id == id)
    }

    pub fn get_mut(&mut self, id: &CardId) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| &c.id == id)
    }

    pub fn position(&self, id: &CardId) -> Option<usize> {
        self.cards.iter().position(|c| &c.id == id)
    }

    /// Insert a new card at `position` (clamped), appending by default.
    /// Returns the new card's id.
    pub fn insert(&mut self, position: Option<usize>, content: impl Into<String>) -> CardId {
        let card = Card::new(content);
        let id = card.id.clone();
        let at = position.unwrap_or(self.cards.len()).min(self.cards.len());
        self.cards.insert(at, card);
        id
    }

    /// Pin a chat message to the canvas. Pinning the exact same content twice
    /// is a no-op that returns the existing card's id.
    pub fn pin(&mut self, content: impl Into<String>) -> CardId {
        let content = content.into();
        if let Some(existing) = self.cards.iter().find(|c| c.content == content) {
            return existing.id.clone();
        }
        self.insert(None, content)
    }

    /// Remove a card. Destructive; there is no undo.
    pub fn delete(&mut self, id: &CardId) -> Option<Card> {
        let index = self.position(id)?;
        Some(self.cards.remove(index))
    }

    /// Insert a deep copy of a card immediately after the source, with a
    /// fresh id and timestamp. Returns the copy's id.
    pub fn duplicate(&mut self, id: &CardId) -> Option<CardId> {
        let index = self.position(id)?;
        let copy = self.cards[index].duplicate();
        let copy_id = copy.id.clone();
        self.cards.insert(index + 1, copy);
        Some(copy_id)
    }

    /// Swap a card with its neighbor. Silent no-op at the boundaries: the
    /// first card cannot move up, the last cannot move down.
    pub fn move_card(&mut self, id: &CardId, direction: MoveDirection) {
        let Some(index) = self.position(id) else {
            return;
        };
        match direction {
            MoveDirection::Up if index > 0 => self.cards.swap(index, index - 1),
            MoveDirection::Down if index + 1 < self.cards.len() => {
                self.cards.swap(index, index + 1)
            }
            _ => {}
        }
    }

    /// Remove the dragged card and reinsert it immediately before the
    /// target's current position. No-op if dragged == target or either id is
    /// unknown.
    pub fn reorder(&mut self, dragged: &CardId, target: &CardId) {
        if dragged == target {
            return;
        }
        let Some(from) = self.position(dragged) else {
            return;
        };
        if self.position(target).is_none() {
            return;
        }
        let card = self.cards.remove(from);
        // Target index is re-resolved after removal so the card always lands
        // directly before the target.
        let at = self.position(target).unwrap_or(self.cards.len());
        self.cards.insert(at, card);
    }

    /// Replace a card's text.
    pub fn edit(&mut self, id: &CardId, content: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(card) => {
                card.content = content.into();
                true
            }
            None => false,
        }
    }

    pub fn set_layout(&mut self, id: &CardId, layout: CardLayout) -> bool {
        match self.get_mut(id) {
            Some(card) => {
                card.layout = layout;
                true
            }
            None => false,
        }
    }

    /// Delete one attachment from a card; the primary mirror follows the new
    /// `images[0]` (or clears).
    pub fn remove_image(&mut self, id: &CardId, image_index: usize) -> Option<ImageAttachment> {
        self.get_mut(id)?.remove_image(image_index)
    }

    /// Empty the whole collection. Destructive; the caller is responsible for
    /// confirming with the user.
    pub fn clear(&mut self) {
        self.cards.clear();
    }

    /// The first image any card exposes, scanning in order. Used as the
    /// article cover.
    pub fn first_image_url(&self) -> Option<&str> {
        self.cards.iter().find_map(|c| c.first_image_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas_with(contents: &[&str]) -> (Canvas, Vec<CardId>) {
        let mut canvas = Canvas::new();
        let ids = contents
            .iter()
            .map(|c| canvas.insert(None, *c))
            .collect::<Vec<_>>();
        (canvas, ids)
    }

    fn order(canvas: &Canvas) -> Vec<String> {
        canvas.cards().iter().map(|c| c.content.clone()).collect()
    }

    #[test]
    fn test_insert_appends_by_default() {
        let (canvas, _) = canvas_with(&["a", "b", "c"]);
        assert_eq!(order(&canvas), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_insert_at_position() {
        let (mut canvas, _) = canvas_with(&["a", "c"]);
        canvas.insert(Some(1), "b");
        assert_eq!(order(&canvas), vec!["a", "b", "c"]);
        // Out-of-range positions clamp to append.
        canvas.insert(Some(99), "d");
        assert_eq!(order(&canvas), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_pin_deduplicates_exact_content() {
        let (mut canvas, ids) = canvas_with(&["a"]);
        let pinned = canvas.pin("a");
        assert_eq!(pinned, ids[0]);
        assert_eq!(canvas.len(), 1);
        canvas.pin("b");
        assert_eq!(canvas.len(), 2);
    }

    #[test]
    fn test_move_is_noop_at_boundaries() {
        let (mut canvas, ids) = canvas_with(&["a", "b", "c"]);
        canvas.move_card(&ids[0], MoveDirection::Up);
        canvas.move_card(&ids[2], MoveDirection::Down);
        assert_eq!(order(&canvas), vec!["a", "b", "c"]);
        canvas.move_card(&ids[2], MoveDirection::Up);
        assert_eq!(order(&canvas), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_reorder_moves_before_target() {
        let (mut canvas, ids) = canvas_with(&["a", "b", "c", "d"]);
        canvas.reorder(&ids[3], &ids[1]);
        assert_eq!(order(&canvas), vec!["a", "d", "b", "c"]);
        // Dragging forward also lands directly before the target.
        canvas.reorder(&ids[0], &ids[2]);
        assert_eq!(order(&canvas), vec!["d", "b", "a", "c"]);
        // Self-drop is a no-op.
        canvas.reorder(&ids[1], &ids[1]);
        assert_eq!(order(&canvas), vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn test_duplicate_inserts_after_source() {
        let (mut canvas, ids) = canvas_with(&["a", "b"]);
        let copy_id = canvas.duplicate(&ids[0]).unwrap();
        assert_eq!(order(&canvas), vec!["a", "a", "b"]);
        assert_ne!(copy_id, ids[0]);
        assert_eq!(canvas.position(&copy_id), Some(1));
    }

    #[test]
    fn test_delete_and_clear() {
        let (mut canvas, ids) = canvas_with(&["a", "b"]);
        assert!(canvas.delete(&ids[0]).is_some());
        assert_eq!(canvas.len(), 1);
        canvas.clear();
        assert!(canvas.is_empty());
    }

    #[test]
    fn test_first_image_scans_in_order() {
        let (mut canvas, ids) = canvas_with(&["a", "b"]);
        assert!(canvas.first_image_url().is_none());
        canvas
            .get_mut(&ids[1])
            .unwrap()
            .push_image(ImageAttachment::new("b.png", "p"));
        assert_eq!(canvas.first_image_url(), Some("b.png"));
        canvas
            .get_mut(&ids[0])
            .unwrap()
            .push_image(ImageAttachment::new("a.png", "p"));
        assert_eq!(canvas.first_image_url(), Some("a.png"));
    }
}
