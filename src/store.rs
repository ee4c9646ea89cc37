//! # Study Set Persistence
//!
//! A small document store behind the [`DatabaseAdapter`] trait so the engine
//! can be swapped without touching orchestration code. [`LibsqlStore`] keeps
//! every collection in one libsql table; [`StudySetRepository`] gives the
//! typed view used by the rest of the crate.

pub mod database;
pub mod error;
pub mod schema;
pub mod study_sets;

pub use database::{DatabaseAdapter, Filter, FilterOp, LibsqlStore, Record};
pub use error::StoreError;
pub use study_sets::{StudySetPatch, StudySetRepository, STUDY_SETS, TOPICS};
