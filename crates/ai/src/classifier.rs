use std::path::Path;
use std::sync::Arc;

use crate::error::ClassifierError;
use crate::tfidf::TfidfLogisticModel;

/// Relative path the trained artifact is looked up at when nothing else is
/// configured.
pub const DEFAULT_MODEL_PATH: &str = "weeb_api_model.json";

/// Text → satisfaction label.
///
/// Implementations are immutable after construction and shared between
/// requests behind an `Arc`.
pub trait SatisfactionClassifier: Send + Sync {
    fn predict(&self, text: &str) -> Result<i64, ClassifierError>;
}

/// Load the artifact at `path`.
///
/// A missing or unreadable artifact is not fatal: it is logged and `None` is
/// returned, and the service runs without predictions.
pub fn load_classifier(path: impl AsRef<Path>) -> Option<Arc<dyn SatisfactionClassifier>> {
    let path = path.as_ref();
    match TfidfLogisticModel::from_path(path) {
        Ok(model) => {
            tracing::info!(
                path = %path.display(),
                vocabulary = model.vocabulary_len(),
                classes = ?model.classes(),
                "satisfaction model loaded"
            );
            Some(Arc::new(model))
        }
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "satisfaction model unavailable; predictions disabled");
            None
        }
    }
}
