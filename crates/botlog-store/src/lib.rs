//! # botlog-store
//!
//! Persistence for the BotLog authoring workflow: the image gallery (a
//! filesystem store with an in-memory fallback and a TTL'd list cache), the
//! style library, and the session store with progressive quota degradation.

pub mod gallery;
pub mod placeholder;
pub mod session_store;
pub mod store;
pub mod styles;

pub use gallery::{Gallery, IMAGE_CATEGORIES};
pub use session_store::{SessionStore, SessionSummary};
pub use store::{FsStore, GalleryImage, ImageStore, ImageUpdate, MemStore, NewImage};
pub use styles::{NewStyle, StyleKind, StyleLibrary, StyleSkill};
