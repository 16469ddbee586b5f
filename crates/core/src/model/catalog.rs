use std::collections::HashMap;

use thiserror::Error;

use crate::model::ids::{BreedName, VariantId};
use crate::model::progress::{BadgeState, CollectionState};
use crate::model::variant::{DogVariant, VariantError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog must contain at least one variant")]
    Empty,

    #[error("duplicate variant id in catalog: {0}")]
    DuplicateId(VariantId),

    #[error(transparent)]
    Variant(#[from] VariantError),
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Read-only, ordered list of every collectible variant.
///
/// Breeds are listed in the order their first variant appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    variants: Vec<DogVariant>,
    breeds: Vec<BreedName>,
    by_id: HashMap<VariantId, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting empty input and duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Empty` or `CatalogError::DuplicateId`.
    pub fn new(variants: Vec<DogVariant>) -> Result<Self, CatalogError> {
        if variants.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut by_id = HashMap::with_capacity(variants.len());
        let mut breeds: Vec<BreedName> = Vec::new();
        for (index, variant) in variants.iter().enumerate() {
            if by_id.insert(variant.id().clone(), index).is_some() {
                return Err(CatalogError::DuplicateId(variant.id().clone()));
            }
            if !breeds.contains(variant.breed()) {
                breeds.push(variant.breed().clone());
            }
        }

        Ok(Self {
            variants,
            breeds,
            by_id,
        })
    }

    /// The starter catalog shipped with the app: four breeds, two coats each.
    ///
    /// # Panics
    ///
    /// Panics if the bundled entries stop validating.
    #[must_use]
    pub fn builtin() -> Self {
        let variants = BUILTIN_VARIANTS
            .iter()
            .map(|(id, breed, coat, uri)| DogVariant::new(*id, *breed, *coat, [*uri]))
            .collect::<Result<Vec<_>, _>>()
            .expect("builtin variants should be valid");
        Self::new(variants).expect("builtin catalog should be valid")
    }

    #[must_use]
    pub fn variants(&self) -> &[DogVariant] {
        &self.variants
    }

    #[must_use]
    pub fn breeds(&self) -> &[BreedName] {
        &self.breeds
    }

    #[must_use]
    pub fn get(&self, id: &VariantId) -> Option<&DogVariant> {
        self.by_id.get(id).map(|&index| &self.variants[index])
    }

    #[must_use]
    pub fn contains(&self, id: &VariantId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn variants_of<'a>(&'a self, breed: &'a BreedName) -> impl Iterator<Item = &'a DogVariant> {
        self.variants.iter().filter(move |v| v.breed() == breed)
    }

    /// A breed is complete when every one of its variants is unlocked.
    ///
    /// Unknown breeds are never complete.
    #[must_use]
    pub fn is_breed_complete(&self, breed: &BreedName, collection: &CollectionState) -> bool {
        let mut variants = self.variants_of(breed).peekable();
        if variants.peek().is_none() {
            return false;
        }
        variants.all(|v| collection.contains(v.id()))
    }

    /// Badges implied by a collection, in catalog breed order.
    #[must_use]
    pub fn earned_badges(&self, collection: &CollectionState) -> BadgeState {
        BadgeState::from_names(
            self.breeds
                .iter()
                .filter(|breed| self.is_breed_complete(breed, collection))
                .cloned(),
        )
    }

    /// Ids in the collection that this catalog does not know about.
    pub fn unknown_ids<'a>(
        &'a self,
        collection: &'a CollectionState,
    ) -> impl Iterator<Item = &'a VariantId> {
        collection.iter().filter(|id| !self.contains(id))
    }
}

const BUILTIN_VARIANTS: &[(&str, &str, &str, &str)] = &[
    (
        "labrador-yellow",
        "Labrador Retriever",
        "Yellow",
        "https://images.dog.ceo/breeds/labrador/n02099712_5640.jpg",
    ),
    (
        "labrador-black",
        "Labrador Retriever",
        "Black",
        "https://images.dog.ceo/breeds/labrador/n02099712_1978.jpg",
    ),
    (
        "pug-fawn",
        "Pug",
        "Fawn",
        "https://images.dog.ceo/breeds/pug/n02110958_15761.jpg",
    ),
    (
        "pug-black",
        "Pug",
        "Black",
        "https://images.dog.ceo/breeds/pug/n02110958_8270.jpg",
    ),
    (
        "germanshepherd-tan",
        "German Shepherd",
        "Tan & Black",
        "https://images.dog.ceo/breeds/germanshepherd/n02106662_5705.jpg",
    ),
    (
        "germanshepherd-sable",
        "German Shepherd",
        "Sable",
        "https://images.dog.ceo/breeds/germanshepherd/n02106662_2169.jpg",
    ),
    (
        "golden-light",
        "Golden Retriever",
        "Light Golden",
        "https://images.dog.ceo/breeds/retriever/golden/n02099601_3004.jpg",
    ),
    (
        "golden-dark",
        "Golden Retriever",
        "Dark Golden",
        "https://images.dog.ceo/breeds/retriever/golden/n02099601_5159.jpg",
    ),
];
