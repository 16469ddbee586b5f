//! Applying an answered quiz round to a user's progress.

use thiserror::Error;

use crate::model::{BreedName, Catalog, DogVariant, Progress, VariantId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CollectionError {
    #[error("variant {0} is not in the catalog")]
    UnknownVariant(VariantId),
}

/// What happened to the collection when an answer was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockResult {
    /// Wrong answer, or the variant was already owned.
    Unchanged,
    Unlocked(DogVariant),
}

impl UnlockResult {
    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, UnlockResult::Unlocked(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadgeResult {
    Unchanged,
    Earned(BreedName),
}

impl BadgeResult {
    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, BadgeResult::Earned(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub unlock: UnlockResult,
    pub badge: BadgeResult,
}

impl AnswerOutcome {
    /// True when progress was modified and needs persisting.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.unlock.is_new() || self.badge.is_new()
    }
}

/// Record a pick against the round's target.
///
/// A correct pick unlocks the target (set semantics) and then re-checks the
/// target's breed; a breed that is complete but not yet badged earns its badge.
/// The re-check runs even when nothing new was unlocked, so a badge missing
/// from restored progress is repaired on the next correct answer.
///
/// # Errors
///
/// Returns `CollectionError::UnknownVariant` if the target is not in the
/// catalog; progress is left untouched.
pub fn record_answer(
    catalog: &Catalog,
    chosen: &VariantId,
    target: &VariantId,
    progress: &mut Progress,
) -> Result<AnswerOutcome, CollectionError> {
    let variant = catalog
        .get(target)
        .ok_or_else(|| CollectionError::UnknownVariant(target.clone()))?;

    if chosen != target {
        return Ok(AnswerOutcome {
            correct: false,
            unlock: UnlockResult::Unchanged,
            badge: BadgeResult::Unchanged,
        });
    }

    let unlock = if progress.collection.insert(variant.id().clone()) {
        UnlockResult::Unlocked(variant.clone())
    } else {
        UnlockResult::Unchanged
    };

    let breed = variant.breed();
    let badge = if catalog.is_breed_complete(breed, &progress.collection)
        && progress.badges.insert(breed.clone())
    {
        BadgeResult::Earned(breed.clone())
    } else {
        BadgeResult::Unchanged
    };

    Ok(AnswerOutcome {
        correct: true,
        unlock,
        badge,
    })
}
