//! `weeb-blog` — blog content: categories and articles.
//!
//! Pure domain: validation and state changes, no storage.

pub mod article;
pub mod category;

pub use article::{Article, ArticleChanges, ArticleDraft, ArticleWrite};
pub use category::{Category, CategoryInput, NewCategory};
