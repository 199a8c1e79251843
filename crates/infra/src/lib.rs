//! Infrastructure layer: record storage, the token blacklist and startup
//! bootstrap.

pub mod bootstrap;
pub mod store;

pub use bootstrap::{ensure_superuser, BootstrapError};
pub use store::{
    ArticleStore, CategoryStore, InMemoryStore, ReviewStore, StoreError, StoreSet, TokenBlacklist, UserStore,
};

#[cfg(feature = "postgres")]
pub use store::PostgresStore;
