use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use thiserror::Error;

use crate::model::{
    BreedName, Catalog, CollectionState, DogVariant, ImageUri, QuizCandidate, QuizQuestion,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectorError {
    #[error("no variants available for breed {0}")]
    EmptyBreed(BreedName),
    #[error("catalog has no breeds to quiz on")]
    NoBreeds,
}

//
// ─── WEIGHTS ───────────────────────────────────────────────────────────────────
//

/// Weight for a breed that still has locked variants, or for a locked variant.
pub const INCOMPLETE_WEIGHT: u32 = 3;
/// Weight for a completed breed, or for an unlocked variant.
pub const COMPLETE_WEIGHT: u32 = 1;
/// Candidates shown per round, target included.
pub const CHOICES_PER_QUESTION: usize = 4;

/// Pick one item with probability proportional to its weight.
///
/// Draws `roll` uniformly from `[0, total)` and walks the items subtracting
/// weights until `roll <= 0`. Zero-weight items are never picked unless every
/// weight is zero, in which case the pick is uniform. Returns `None` only for
/// empty input.
///
/// # Examples
///
/// ```
/// # use dex_core::selector::weighted_pick;
/// # use rand::SeedableRng;
/// let mut rng = rand::rngs::StdRng::seed_from_u64(1);
/// let picked = weighted_pick(&["a", "b"], |s| u32::from(*s == "b"), &mut rng);
/// assert_eq!(picked, Some(&"b"));
/// ```
pub fn weighted_pick<'a, T, R>(
    items: &'a [T],
    weight: impl Fn(&T) -> u32,
    rng: &mut R,
) -> Option<&'a T>
where
    R: Rng + ?Sized,
{
    if items.is_empty() {
        return None;
    }

    let weights: Vec<u32> = items.iter().map(&weight).collect();
    let total: u64 = weights.iter().map(|w| u64::from(*w)).sum();
    if total == 0 {
        return items.get(rng.random_range(0..items.len()));
    }

    // Totals here are tiny; f64 represents them exactly.
    #[allow(clippy::cast_precision_loss)]
    let mut roll = rng.random::<f64>() * total as f64;
    for (item, w) in items.iter().zip(&weights) {
        if *w == 0 {
            continue;
        }
        roll -= f64::from(*w);
        if roll <= 0.0 {
            return Some(item);
        }
    }

    // Float rounding can leave a sliver of `roll`; settle on the last eligible item.
    items
        .iter()
        .zip(&weights)
        .rev()
        .find(|(_, w)| **w > 0)
        .map(|(item, _)| item)
}

/// Choose a photo for a variant, avoiding `previous` when another photo exists.
pub fn pick_image<'a, R>(
    variant: &'a DogVariant,
    previous: Option<&ImageUri>,
    rng: &mut R,
) -> Option<&'a ImageUri>
where
    R: Rng + ?Sized,
{
    let pool = variant.images();
    if pool.len() <= 1 {
        return pool.first();
    }

    let filtered: Vec<&ImageUri> = pool.iter().filter(|uri| Some(*uri) != previous).collect();
    if filtered.is_empty() {
        pool.choose(rng)
    } else {
        filtered.choose(rng).copied()
    }
}

//
// ─── QUESTION BUILDER ──────────────────────────────────────────────────────────
//

/// Builds quiz rounds biased toward breeds and coats the player has not finished.
pub struct QuizSelector<'a> {
    catalog: &'a Catalog,
}

impl<'a> QuizSelector<'a> {
    #[must_use]
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    fn breed_weight(&self, breed: &BreedName, collection: &CollectionState) -> u32 {
        if self.catalog.is_breed_complete(breed, collection) {
            COMPLETE_WEIGHT
        } else {
            INCOMPLETE_WEIGHT
        }
    }

    /// Pick a variant of `breed`, favouring coats not yet unlocked.
    ///
    /// # Errors
    ///
    /// Returns `SelectorError::EmptyBreed` if the catalog has no variant for the breed.
    pub fn pick_variant<R>(
        &self,
        breed: &BreedName,
        collection: &CollectionState,
        previous_image: Option<&ImageUri>,
        rng: &mut R,
    ) -> Result<QuizCandidate, SelectorError>
    where
        R: Rng + ?Sized,
    {
        let variants: Vec<&DogVariant> = self.catalog.variants_of(breed).collect();
        let variant = weighted_pick(
            &variants,
            |v| {
                if collection.contains(v.id()) {
                    COMPLETE_WEIGHT
                } else {
                    INCOMPLETE_WEIGHT
                }
            },
            rng,
        )
        .copied()
        .ok_or_else(|| SelectorError::EmptyBreed(breed.clone()))?;

        let image = pick_image(variant, previous_image, rng)
            .ok_or_else(|| SelectorError::EmptyBreed(breed.clone()))?;

        Ok(QuizCandidate::new(variant.clone(), image.clone()))
    }

    /// Build the next round.
    ///
    /// - The target breed is drawn with weight 3 when incomplete and 1 when complete.
    /// - The target's photo differs from `previous_image` whenever the variant has another.
    /// - Up to three distractor breeds are drawn the same way, without replacement.
    /// - Candidates are shuffled; `target_index` points at the target afterwards.
    ///
    /// # Errors
    ///
    /// Returns `SelectorError` only if the catalog is inconsistent.
    pub fn next_question<R>(
        &self,
        collection: &CollectionState,
        previous_image: Option<&ImageUri>,
        rng: &mut R,
    ) -> Result<QuizQuestion, SelectorError>
    where
        R: Rng + ?Sized,
    {
        let breeds = self.catalog.breeds();
        let target_breed = weighted_pick(breeds, |b| self.breed_weight(b, collection), rng)
            .ok_or(SelectorError::NoBreeds)?;
        let target = self.pick_variant(target_breed, collection, previous_image, rng)?;
        let target_id = target.id().clone();

        let mut remaining: Vec<&BreedName> =
            breeds.iter().filter(|b| *b != target_breed).collect();
        let mut candidates = Vec::with_capacity(CHOICES_PER_QUESTION);
        candidates.push(target);

        while candidates.len() < CHOICES_PER_QUESTION && !remaining.is_empty() {
            let Some(&picked) =
                weighted_pick(&remaining, |b| self.breed_weight(b, collection), rng)
            else {
                break;
            };
            remaining.retain(|b| *b != picked);
            candidates.push(self.pick_variant(picked, collection, None, rng)?);
        }

        candidates.shuffle(rng);
        let target_index = candidates
            .iter()
            .position(|c| *c.id() == target_id)
            .ok_or(SelectorError::NoBreeds)?;

        QuizQuestion::new(candidates, target_index).ok_or(SelectorError::NoBreeds)
    }
}
