//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use dex_core::collection::CollectionError;
use dex_core::model::CatalogFileError;
use dex_core::selector::SelectorError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `CollectionService`.
///
/// Persistence failures are not errors here; they are logged and reported
/// through the synchronizer's notice.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CollectionServiceError {
    #[error(transparent)]
    Collection(#[from] CollectionError),
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("choice {index} is out of range for {len} candidates")]
    InvalidChoice { index: usize, len: usize },
    #[error(transparent)]
    Selector(#[from] SelectorError),
    #[error(transparent)]
    Collection(#[from] CollectionServiceError),
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid remote URL {raw}: {source}")]
    InvalidRemoteUrl {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    #[error("cannot read catalog {}: {source}", path.display())]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogFileError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
