mod catalog;
pub mod catalog_file;
mod identity;
mod ids;
mod progress;
mod quiz;
mod stats;
mod variant;

pub use catalog::{Catalog, CatalogError};
pub use catalog_file::{CatalogFile, CatalogFileError, NormalizeReport};
pub use identity::{UserDocId, UserRef};
pub use ids::{BreedName, ParseIdError, VariantId};

pub use progress::{BadgeState, CollectionState, Progress, ProgressSnapshot};
pub use quiz::{QuizCandidate, QuizQuestion};
pub use stats::ProgressStats;
pub use variant::{DogVariant, ImageUri, VariantError};
