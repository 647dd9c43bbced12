//! # botlog-render
//!
//! The publish-time compositor: turns a finished [`botlog_canvas::Canvas`]
//! into one article body, splicing scene-anchored images back into the text
//! spans they were generated for and laying out the rest per card.

pub mod compositor;

pub use compositor::{compose, Article, ArticleStatus, ComposeOptions};
