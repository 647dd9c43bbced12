//! Image store backends.
//!
//! [`FsStore`] is the primary, durable backend: decoded payloads land as
//! content-addressed files next to a JSON index. [`MemStore`] is the
//! lesser-durability fallback used when the filesystem store is unavailable;
//! payloads stay embedded and die with the process.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use botlog_core::{hash_bytes, BotlogError, BotlogResult};

/// A stored gallery image and its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryImage {
    pub id: String,
    /// Durable URL (filesystem path for [`FsStore`]) or embedded payload
    /// (fallback store).
    pub url: String,
    pub prompt: String,
    /// Snippet of the text the image came from.
    #[serde(default)]
    pub source_context: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: String,
    #[serde(default)]
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// A payload to store: an embedded `data:` URI or an already-durable URL.
#[derive(Debug, Clone, Copy)]
pub struct NewImage<'a> {
    pub payload: &'a str,
    pub prompt: &'a str,
    pub source_context: &'a str,
    pub category: &'a str,
}

/// Partial metadata update.
#[derive(Debug, Clone, Default)]
pub struct ImageUpdate {
    pub favorite: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
}

/// Backend contract shared by the filesystem store and the fallback.
pub trait ImageStore {
    fn save(&mut self, image: &NewImage<'_>) -> BotlogResult<GalleryImage>;
    /// All images, newest first.
    fn list(&self) -> BotlogResult<Vec<GalleryImage>>;
    fn get(&self, id: &str) -> BotlogResult<Option<GalleryImage>>;
    fn delete(&mut self, id: &str) -> BotlogResult<bool>;
    fn update(&mut self, id: &str, update: &ImageUpdate) -> BotlogResult<Option<GalleryImage>>;
}

fn apply_update(image: &mut GalleryImage, update: &ImageUpdate) {
    if let Some(favorite) = update.favorite {
        image.favorite = favorite;
    }
    if let Some(tags) = &update.tags {
        image.tags = tags.clone();
    }
    if let Some(category) = &update.category {
        image.category = category.clone();
    }
}

fn new_entry(image: &NewImage<'_>, url: String) -> GalleryImage {
    GalleryImage {
        id: Uuid::new_v4().to_string(),
        url,
        prompt: image.prompt.to_string(),
        source_context: image.source_context.to_string(),
        tags: Vec::new(),
        category: image.category.to_string(),
        favorite: false,
        created_at: Utc::now(),
        width: None,
        height: None,
    }
}

/// Filesystem-backed image store: one content-addressed file per payload
/// plus a JSON index, newest first.
pub struct FsStore {
    root: PathBuf,
    index: Vec<GalleryImage>,
}

impl FsStore {
    pub fn open(root: impl Into<PathBuf>) -> BotlogResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let index_path = root.join("index.json");
        let index = if index_path.exists() {
            let raw = std::fs::read_to_string(&index_path)?;
            serde_json::from_str(&raw)?
        } else {
            Vec::new()
        };
        Ok(Self { root, index })
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    fn persist_index(&self) -> BotlogResult<()> {
        let raw = serde_json::to_string_pretty(&self.index)?;
        let tmp = self.index_path().with_extension("tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, self.index_path())?;
        Ok(())
    }

    /// Decode an embedded payload to a content-addressed file and return its
    /// path, plus probed dimensions when the bytes decode as an image.
    fn materialize(&self, payload: &str) -> BotlogResult<(String, Option<(u32, u32)>)> {
        let (mime, data) = split_data_uri(payload).ok_or_else(|| {
            BotlogError::store("embedded payload is not a base64 data URI".to_string())
        })?;
        let bytes = BASE64
            .decode(data)
            .map_err(|err| BotlogError::store(format!("invalid base64 payload: {}", err)))?;

        let dimensions = match image::load_from_memory(&bytes) {
            Ok(decoded) => Some((decoded.width(), decoded.height())),
            Err(err) => {
                warn!("stored payload does not decode as an image: {}", err);
                None
            }
        };

        let file_name = format!("{}.{}", hash_bytes(&bytes).to_hex(), extension_for(mime));
        let out_path = self.root.join(&file_name);
        if !out_path.exists() {
            let tmp = out_path.with_extension("tmp");
            std::fs::write(&tmp, &bytes)?;
            std::fs::rename(&tmp, &out_path)?;
        }
        Ok((out_path.to_string_lossy().into_owned(), dimensions))
    }
}

impl ImageStore for FsStore {
    fn save(&mut self, image: &NewImage<'_>) -> BotlogResult<GalleryImage> {
        let entry = if image.payload.starts_with("data:") {
            let (url, dimensions) = self.materialize(image.payload)?;
            let mut entry = new_entry(image, url);
            if let Some((width, height)) = dimensions {
                entry.width = Some(width);
                entry.height = Some(height);
            }
            entry
        } else {
            // Already durable; register metadata only.
            new_entry(image, image.payload.to_string())
        };
        self.index.insert(0, entry.clone());
        self.persist_index()?;
        Ok(entry)
    }

    fn list(&self) -> BotlogResult<Vec<GalleryImage>> {
        Ok(self.index.clone())
    }

    fn get(&self, id: &str) -> BotlogResult<Option<GalleryImage>> {
        Ok(self.index.iter().find(|i| i.id == id).cloned())
    }

    fn delete(&mut self, id: &str) -> BotlogResult<bool> {
        let before = self.index.len();
        self.index.retain(|i| i.id != id);
        let removed = self.index.len() != before;
        if removed {
            self.persist_index()?;
        }
        Ok(removed)
    }

    fn update(&mut self, id: &str, update: &ImageUpdate) -> BotlogResult<Option<GalleryImage>> {
        let Some(entry) = self.index.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        apply_update(entry, update);
        let updated = entry.clone();
        self.persist_index()?;
        Ok(Some(updated))
    }
}

/// Bounded in-memory fallback. Payloads stay embedded; durability ends with
/// the process.
#[derive(Default)]
pub struct MemStore {
    images: Vec<GalleryImage>,
    capacity: usize,
}

impl MemStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            images: Vec::new(),
            capacity,
        }
    }
}

impl ImageStore for MemStore {
    fn save(&mut self, image: &NewImage<'_>) -> BotlogResult<GalleryImage> {
        let entry = new_entry(image, image.payload.to_string());
        self.images.insert(0, entry.clone());
        if self.capacity > 0 {
            self.images.truncate(self.capacity);
        }
        Ok(entry)
    }

    fn list(&self) -> BotlogResult<Vec<GalleryImage>> {
        Ok(self.images.clone())
    }

    fn get(&self, id: &str) -> BotlogResult<Option<GalleryImage>> {
        Ok(self.images.iter().find(|i| i.id == id).cloned())
    }

    fn delete(&mut self, id: &str) -> BotlogResult<bool> {
        let before = self.images.len();
        self.images.retain(|i| i.id != id);
        Ok(self.images.len() != before)
    }

    fn update(&mut self, id: &str, update: &ImageUpdate) -> BotlogResult<Option<GalleryImage>> {
        let Some(entry) = self.images.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        apply_update(entry, update);
        Ok(Some(entry.clone()))
    }
}

fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    rest.split_once(";base64,")
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}
