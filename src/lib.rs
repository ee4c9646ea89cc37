//! # quizthebest - Study Sets from a Topic
//!
//! Turns a topic into a study set: the web is searched, the leading pages are
//! scraped politely, and a generative model writes a summary, flashcards and
//! a quiz from the gathered material. Everything that flows in from a page or
//! out of a model is sanitized before it is stored.
//!
//! ## Features
//!
//! - Search with academic-first ranking and per-domain rate-limited scraping
//! - Sequential generation pipeline with an overall deadline
//! - Agent-delegated generation with retry, timeout and iteration limits
//! - Structured model-output parsing with ordered fallback strategies
//! - Study-set persistence on libsql, with CSV/JSON export
//! - Token usage accounting
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use quizthebest::config::AppConfig;
//! use quizthebest::crawler::{Scraper, ScraperConfig};
//! use quizthebest::model::gemini_from_config;
//! use quizthebest::pipeline::{GenerationOptions, GenerationOrchestrator};
//! use quizthebest::search::{SearchOrchestrator, SerpApiClient};
//! use quizthebest::usage::UsageLedger;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let model = gemini_from_config(&config, Arc::new(UsageLedger::new()))?;
//!     let search = SearchOrchestrator::new(
//!         SerpApiClient::new(config.serpapi_key.clone()),
//!         Scraper::new(ScraperConfig::default())?,
//!     );
//!
//!     let pipeline = GenerationOrchestrator::new(model, search);
//!     let materials = pipeline
//!         .generate("Photosynthesis", &GenerationOptions::from_config(&config))
//!         .await?;
//!
//!     println!("{}", materials.summary);
//!     Ok(())
//! }
//! ```

mod error;

pub mod agent;
pub mod config;
pub mod crawler;
pub mod export;
pub mod generator;
pub mod model;
pub mod pipeline;
pub mod quality;
pub mod render;
pub mod sanitizer;
pub mod search;
pub mod store;
pub mod types;
pub mod usage;

pub use error::{Error, ErrorKind, Result};

/// Re-export of common types for public use
pub mod prelude {
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::types::{
        Answer, Flashcard, GeneratedMaterials, GenerationResult, Quiz, QuizQuestion, StudySet,
    };
}
