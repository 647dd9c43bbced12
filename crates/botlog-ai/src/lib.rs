//! # botlog-ai
//!
//! Thin blocking adapters over the external generative service: scene
//! analysis, image generation, chat completion, and style analysis, plus the
//! best-effort legacy prompt extractor.
//!
//! Every I/O-boundary error is caught here and converted to a typed
//! [`botlog_core::BotlogError`]; nothing propagates as an unhandled fault
//! past the adapter layer.

mod client;

pub mod analyzer;
pub mod article;
pub mod chat;
pub mod generator;
pub mod legacy;
pub mod style;

pub use analyzer::GeminiAnalyzer;
pub use article::{ArticleAnalysis, ArticleAnalyzer, ImagePlacement, PromptSuggestion};
pub use chat::{ChatClient, EDITORIAL_SYSTEM_PROMPT};
pub use generator::GeminiImageGenerator;
pub use legacy::{extract_prompt_options, PromptOption};
pub use style::{StyleAnalysisResult, StyleAnalyzer};
