//! Record storage abstractions and their backends.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod r#trait;

use std::sync::Arc;

pub use in_memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
pub use r#trait::{ArticleStore, CategoryStore, ReviewStore, StoreError, TokenBlacklist, UserStore};

/// Every store the services need, type-erased.
///
/// One backend usually implements all of them so that cross-table rules
/// (cascading author deletes, protected categories) hold in one place.
#[derive(Clone)]
pub struct StoreSet {
    pub users: Arc<dyn UserStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub articles: Arc<dyn ArticleStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub blacklist: Arc<dyn TokenBlacklist>,
}

impl StoreSet {
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: UserStore + CategoryStore + ArticleStore + ReviewStore + TokenBlacklist + 'static,
    {
        Self {
            users: backend.clone(),
            categories: backend.clone(),
            articles: backend.clone(),
            reviews: backend.clone(),
            blacklist: backend,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(InMemoryStore::new()))
    }
}
