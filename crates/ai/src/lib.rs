//! `weeb-ai`
//!
//! **Responsibility:** satisfaction prediction for review messages.
//!
//! This crate sits outside the domain model:
//! - It never reads or writes stores.
//! - It only turns free text into an integer label.
//! - Callers decide what an absent model or a failed inference means.

pub mod classifier;
pub mod error;
pub mod tfidf;

pub use classifier::{load_classifier, SatisfactionClassifier, DEFAULT_MODEL_PATH};
pub use error::ClassifierError;
pub use tfidf::TfidfLogisticModel;
