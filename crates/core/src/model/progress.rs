use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{BreedName, VariantId};

//
// ─── COLLECTION ────────────────────────────────────────────────────────────────
//

/// Unlocked variant ids, in unlock order.
///
/// Behaves as a set: inserting an id that is already present is a no-op.
/// There is no removal path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<VariantId>", into = "Vec<VariantId>")]
pub struct CollectionState(Vec<VariantId>);

impl CollectionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted ids, dropping repeats but keeping first-seen order.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = VariantId>) -> Self {
        let mut state = Self::new();
        for id in ids {
            state.insert(id);
        }
        state
    }

    /// Returns `true` if the id was newly added.
    pub fn insert(&mut self, id: VariantId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    #[must_use]
    pub fn contains(&self, id: &VariantId) -> bool {
        self.0.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariantId> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[VariantId] {
        &self.0
    }
}

impl From<Vec<VariantId>> for CollectionState {
    fn from(ids: Vec<VariantId>) -> Self {
        Self::from_ids(ids)
    }
}

impl From<CollectionState> for Vec<VariantId> {
    fn from(state: CollectionState) -> Self {
        state.0
    }
}

//
// ─── BADGES ────────────────────────────────────────────────────────────────────
//

/// Breeds whose every variant has been unlocked, in award order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<BreedName>", into = "Vec<BreedName>")]
pub struct BadgeState(Vec<BreedName>);

impl BadgeState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_names(names: impl IntoIterator<Item = BreedName>) -> Self {
        let mut state = Self::new();
        for name in names {
            state.insert(name);
        }
        state
    }

    /// Returns `true` if the badge was newly awarded.
    pub fn insert(&mut self, breed: BreedName) -> bool {
        if self.contains(&breed) {
            return false;
        }
        self.0.push(breed);
        true
    }

    #[must_use]
    pub fn contains(&self, breed: &BreedName) -> bool {
        self.0.contains(breed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BreedName> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[BreedName] {
        &self.0
    }
}

impl From<Vec<BreedName>> for BadgeState {
    fn from(names: Vec<BreedName>) -> Self {
        Self::from_names(names)
    }
}

impl From<BadgeState> for Vec<BreedName> {
    fn from(state: BadgeState) -> Self {
        state.0
    }
}

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// Collection and badges for one user, as held in memory or in either store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub collection: CollectionState,
    pub badges: BadgeState,
}

impl Progress {
    #[must_use]
    pub fn new(collection: CollectionState, badges: BadgeState) -> Self {
        Self { collection, badges }
    }

    /// True when neither collection nor badges hold anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collection.is_empty() && self.badges.is_empty()
    }
}

/// Progress plus the time it was last synced with the remote store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub progress: Progress,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn new(progress: Progress, last_synced_at: Option<DateTime<Utc>>) -> Self {
        Self {
            progress,
            last_synced_at,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.progress.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_insert_is_idempotent() {
        let mut collection = CollectionState::new();
        assert!(collection.insert(VariantId::new("pug-fawn")));
        assert!(!collection.insert(VariantId::new("pug-fawn")));
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn collection_from_ids_drops_repeats_in_order() {
        let collection = CollectionState::from_ids(
            ["b", "a", "b", "c"].into_iter().map(VariantId::new),
        );
        let ids: Vec<&str> = collection.iter().map(VariantId::as_str).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn collection_deserializes_from_json_array() {
        let collection: CollectionState =
            serde_json::from_str(r#"["pug-fawn","pug-black","pug-fawn"]"#).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(
            serde_json::to_string(&collection).unwrap(),
            r#"["pug-fawn","pug-black"]"#
        );
    }

    #[test]
    fn progress_is_empty_only_when_both_empty() {
        let mut progress = Progress::default();
        assert!(progress.is_empty());
        progress.badges.insert(BreedName::new("Pug"));
        assert!(!progress.is_empty());
    }
}
