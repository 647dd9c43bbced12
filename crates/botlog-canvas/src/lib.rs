//! # botlog-canvas
//!
//! The BotLog content model — the canonical draft state for an article.
//!
//! A draft is an ordered [`Canvas`] of [`Card`]s. Each card carries text and
//! attached images; the [`SceneWorkbench`] drives the per-card "decompose
//! into scenes, generate per scene, commit" workflow against the provider
//! traits in [`provider`].

pub mod canvas;
pub mod card;
pub mod provider;
pub mod scene;
pub mod session;
pub mod validate;
pub mod workbench;

pub use canvas::{Canvas, MoveDirection};
pub use card::{Card, CardId, CardLayout, ImageAttachment};
pub use provider::{
    AnalysisOutcome, AssetSaveRequest, AssetSink, GenerateRequest, GeneratedImage, ImageGenerator,
    SceneAnalyzer,
};
pub use scene::{CoverSuggestion, Scene, SceneAnalysis, SceneStatus};
pub use session::{ChatMessage, Role, Session};
pub use workbench::SceneWorkbench;
