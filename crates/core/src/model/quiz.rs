use crate::model::ids::{BreedName, VariantId};
use crate::model::variant::{DogVariant, ImageUri};

/// One tile in a quiz round: a variant and the photo shown for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizCandidate {
    variant: DogVariant,
    image: ImageUri,
}

impl QuizCandidate {
    #[must_use]
    pub fn new(variant: DogVariant, image: ImageUri) -> Self {
        Self { variant, image }
    }

    #[must_use]
    pub fn variant(&self) -> &DogVariant {
        &self.variant
    }

    #[must_use]
    pub fn id(&self) -> &VariantId {
        self.variant.id()
    }

    #[must_use]
    pub fn breed(&self) -> &BreedName {
        self.variant.breed()
    }

    #[must_use]
    pub fn image(&self) -> &ImageUri {
        &self.image
    }
}

/// A single round: shuffled candidates and the index of the right answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    candidates: Vec<QuizCandidate>,
    target_index: usize,
}

impl QuizQuestion {
    /// Returns `None` if `target_index` is out of bounds.
    #[must_use]
    pub fn new(candidates: Vec<QuizCandidate>, target_index: usize) -> Option<Self> {
        (target_index < candidates.len()).then_some(Self {
            candidates,
            target_index,
        })
    }

    #[must_use]
    pub fn candidates(&self) -> &[QuizCandidate] {
        &self.candidates
    }

    #[must_use]
    pub fn target_index(&self) -> usize {
        self.target_index
    }

    #[must_use]
    pub fn target(&self) -> &QuizCandidate {
        &self.candidates[self.target_index]
    }

    /// The breed the player is asked to find.
    #[must_use]
    pub fn prompt_breed(&self) -> &BreedName {
        self.target().breed()
    }

    #[must_use]
    pub fn candidate(&self, index: usize) -> Option<&QuizCandidate> {
        self.candidates.get(index)
    }
}
