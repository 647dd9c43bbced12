//! The gallery front: primary filesystem store, transparent in-memory
//! fallback, and a TTL'd list cache.
//!
//! Reads are eventually consistent with recent writes — the list cache is
//! only as fresh as its TTL, and callers must not assume read-after-write
//! across the cache boundary.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::warn;

use botlog_canvas::{AssetSaveRequest, AssetSink};
use botlog_core::{BotlogConfig, BotlogResult};

use crate::placeholder::ensure_shared_placeholder;
use crate::store::{FsStore, GalleryImage, ImageStore, ImageUpdate, MemStore, NewImage};

/// The fixed category set.
pub const IMAGE_CATEGORIES: &[&str] = &[
    "concept",
    "infographic",
    "illustration",
    "photo",
    "ai-generated",
    "cover",
    "other",
];

/// Fallback capacity — embedded payloads are heavy, keep few.
const FALLBACK_CAPACITY: usize = 50;

pub struct Gallery {
    primary: Option<FsStore>,
    fallback: MemStore,
    cache: Option<(Instant, Vec<GalleryImage>)>,
    cache_ttl: Duration,
    placeholder: String,
}

impl Gallery {
    /// Open the gallery. A filesystem store that cannot be opened degrades
    /// to the in-memory fallback, transparently to callers.
    pub fn open(config: &BotlogConfig) -> Self {
        let dir = expand_tilde(&config.storage.gallery_dir);
        let primary = match FsStore::open(&dir) {
            Ok(store) => Some(store),
            Err(err) => {
                warn!("gallery store unavailable, using in-memory fallback: {}", err);
                None
            }
        };
        let placeholder = ensure_shared_placeholder(&dir)
            .unwrap_or_else(|_| "/blog/placeholder.png".to_string());
        Self {
            primary,
            fallback: MemStore::new(FALLBACK_CAPACITY),
            cache: None,
            cache_ttl: Duration::from_secs(config.storage.gallery_cache_ttl_secs),
            placeholder,
        }
    }

    fn active(&mut self) -> &mut dyn ImageStore {
        match self.primary.as_mut() {
            Some(primary) => primary,
            None => &mut self.fallback,
        }
    }

    /// Save an image, falling back to the in-memory store when the primary
    /// errors mid-flight. The fallback keeps the workflow alive at reduced
    /// durability.
    pub fn save(&mut self, image: &NewImage<'_>) -> BotlogResult<GalleryImage> {
        self.cache = None;
        if let Some(primary) = self.primary.as_mut() {
            match primary.save(image) {
                Ok(saved) => return Ok(saved),
                Err(err) => {
                    warn!("primary gallery store failed, degrading to memory: {}", err);
                    self.primary = None;
                }
            }
        }
        self.fallback.save(image)
    }

    /// All images, newest first, served from the TTL cache when fresh.
    pub fn list(&mut self) -> Vec<GalleryImage> {
        if let Some((at, cached)) = &self.cache {
            if at.elapsed() < self.cache_ttl {
                return cached.clone();
            }
        }
        let listed = match self.active().list() {
            Ok(listed) => listed,
            Err(err) => {
                warn!("gallery list failed: {}", err);
                Vec::new()
            }
        };
        self.cache = Some((Instant::now(), listed.clone()));
        listed
    }

    /// Case-insensitive search over prompt, source context, and tags.
    pub fn search(&mut self, term: &str) -> Vec<GalleryImage> {
        let term = term.to_lowercase();
        self.list()
            .into_iter()
            .filter(|image| {
                image.prompt.to_lowercase().contains(&term)
                    || image.source_context.to_lowercase().contains(&term)
                    || image.tags.iter().any(|t| t.to_lowercase().contains(&term))
            })
            .collect()
    }

    pub fn get(&mut self, id: &str) -> BotlogResult<Option<GalleryImage>> {
        self.active().get(id)
    }

    pub fn delete(&mut self, id: &str) -> BotlogResult<bool> {
        self.cache = None;
        self.active().delete(id)
    }

    pub fn update(&mut self, id: &str, update: &ImageUpdate) -> BotlogResult<Option<GalleryImage>> {
        self.cache = None;
        self.active().update(id, update)
    }

    pub fn set_favorite(&mut self, id: &str, favorite: bool) -> BotlogResult<Option<GalleryImage>> {
        self.update(
            id,
            &ImageUpdate {
                favorite: Some(favorite),
                ..ImageUpdate::default()
            },
        )
    }

    /// Drop the list cache; the next list re-reads the backing store.
    pub fn invalidate_cache(&mut self) {
        self.cache = None;
    }
}

impl AssetSink for Gallery {
    fn persist(&mut self, request: &AssetSaveRequest<'_>) -> BotlogResult<String> {
        // Already-durable references pass through untouched.
        if !request.payload.starts_with("data:") {
            return Ok(request.payload.to_string());
        }
        let saved = self.save(&NewImage {
            payload: request.payload,
            prompt: request.prompt,
            source_context: request.source_context,
            category: request.category,
        })?;
        Ok(saved.url)
    }

    fn placeholder_url(&self) -> String {
        self.placeholder.clone()
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

#[cfg(test)]
mod tests {
    use super::*;

    fn gallery_at(label: &str) -> (Gallery, PathBuf) {
        let root = std::env::temp_dir().join(format!("botlog_gallery_{}_{}", label, std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        let mut config = BotlogConfig::default();
        config.storage.gallery_dir = root.to_string_lossy().into_owned();
        (Gallery::open(&config), root)
    }

    fn new_image<'a>(payload: &'a str, prompt: &'a str) -> NewImage<'a> {
        NewImage {
            payload,
            prompt,
            source_context: "test",
            category: "ai-generated",
        }
    }

    #[test]
    fn test_durable_urls_pass_through_the_sink() {
        let (mut gallery, root) = gallery_at("passthrough");
        let url = gallery
            .persist(&AssetSaveRequest {
                payload: "https://example.com/a.png",
                prompt: "p",
                source_context: "",
                category: "ai-generated",
            })
            .unwrap();
        assert_eq!(url, "https://example.com/a.png");
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_list_cache_is_stale_within_ttl() {
        let (mut gallery, root) = gallery_at("ttl");
        assert!(gallery.list().is_empty());
        gallery
            .save(&new_image("https://example.com/a.png", "p"))
            .unwrap();
        // save invalidates, so the new image is visible...
        assert_eq!(gallery.list().len(), 1);

        // ...but a direct backend write behind the cache's back is not.
        if let Some(primary) = gallery.primary.as_mut() {
            primary
                .save(&new_image("https://example.com/b.png", "p"))
                .unwrap();
        }
        assert_eq!(gallery.list().len(), 1);
        gallery.invalidate_cache();
        assert_eq!(gallery.list().len(), 2);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_search_matches_prompt_and_tags() {
        let (mut gallery, root) = gallery_at("search");
        let saved = gallery
            .save(&new_image("https://example.com/a.png", "a misty forest"))
            .unwrap();
        gallery
            .update(
                &saved.id,
                &ImageUpdate {
                    tags: Some(vec!["cabin".to_string()]),
                    ..ImageUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(gallery.search("FOREST").len(), 1);
        assert_eq!(gallery.search("cabin").len(), 1);
        assert!(gallery.search("ocean").is_empty());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_placeholder_is_stable() {
        let (gallery, root) = gallery_at("placeholder");
        let a = gallery.placeholder_url();
        assert!(a.ends_with("placeholder.png"));
        let _ = std::fs::remove_dir_all(&root);
    }
}
