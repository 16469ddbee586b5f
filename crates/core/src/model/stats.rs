use crate::model::catalog::Catalog;
use crate::model::progress::Progress;

/// Aggregated counts for the home and DoggyDex screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressStats {
    pub coats_unlocked: usize,
    pub total_coats: usize,
    pub badges_earned: usize,
    pub total_breeds: usize,
}

impl ProgressStats {
    /// Only ids known to the catalog count towards `coats_unlocked`.
    #[must_use]
    pub fn compute(catalog: &Catalog, progress: &Progress) -> Self {
        let coats_unlocked = progress
            .collection
            .iter()
            .filter(|id| catalog.contains(id))
            .count();
        Self {
            coats_unlocked,
            total_coats: catalog.variants().len(),
            badges_earned: progress.badges.len(),
            total_breeds: catalog.breeds().len(),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.coats_unlocked == self.total_coats
    }
}
