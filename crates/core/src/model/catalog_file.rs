use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::model::catalog::{Catalog, CatalogError};
use crate::model::variant::{DogVariant, VariantError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogFileError {
    #[error("catalog file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Variant(#[from] VariantError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

//
// ─── FILE SHAPE ────────────────────────────────────────────────────────────────
//

/// On-disk breed dataset: `{ "breeds": [ ... ] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFile {
    pub breeds: Vec<BreedEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity_rank: Option<Value>,
    /// Absent and empty stay distinct so entries are written back as read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coats: Option<Vec<CoatEntry>>,
    /// Fields this crate does not interpret are carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoatEntry {
    pub id: String,
    pub coat: String,
    pub images: Vec<String>,
}

/// Counts reported after `CatalogFile::normalize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeReport {
    pub input_count: usize,
    pub output_count: usize,
    pub removed_exact_duplicates: usize,
    pub reassigned_ranks: usize,
}

impl CatalogFile {
    /// Parse a catalog file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogFileError::Json` if the input does not match the file shape.
    pub fn from_json(raw: &str) -> Result<Self, CatalogFileError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Pretty JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns `CatalogFileError::Json` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, CatalogFileError> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// Drop exact-duplicate breed entries and make popularity ranks unique.
    ///
    /// Entries are duplicates when their JSON is equal with keys sorted and
    /// numbers compared by value, so `2` and `2.0` match.
    ///
    /// A rank that is missing, not a positive integer, or already taken is
    /// replaced with the next free rank from a running counter.
    pub fn normalize(&mut self) -> NormalizeReport {
        let input_count = self.breeds.len();

        let mut seen = HashSet::new();
        let mut deduped: Vec<BreedEntry> = Vec::with_capacity(input_count);
        for breed in self.breeds.drain(..) {
            if seen.insert(breed.canonical_key()) {
                deduped.push(breed);
            }
        }
        let removed_exact_duplicates = input_count - deduped.len();

        let mut used = HashSet::new();
        let mut next_rank: u64 = 1;
        let mut reassigned_ranks = 0;
        for breed in &mut deduped {
            let rank = match breed.popularity_rank.as_ref().and_then(parse_rank) {
                Some(rank) if !used.contains(&rank) => rank,
                _ => {
                    while used.contains(&next_rank) {
                        next_rank += 1;
                    }
                    reassigned_ranks += 1;
                    next_rank
                }
            };

            breed.popularity_rank = Some(Value::from(rank));
            used.insert(rank);
            if next_rank <= rank {
                next_rank = rank + 1;
            }
        }

        self.breeds = deduped;
        NormalizeReport {
            input_count,
            output_count: self.breeds.len(),
            removed_exact_duplicates,
            reassigned_ranks,
        }
    }

    /// Flatten every coat of every breed, in file order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogFileError` if a coat is invalid or ids collide.
    pub fn into_catalog(self) -> Result<Catalog, CatalogFileError> {
        let mut variants = Vec::new();
        for breed in self.breeds {
            for coat in breed.coats.unwrap_or_default() {
                variants.push(DogVariant::new(
                    coat.id,
                    breed.name.as_str(),
                    coat.coat,
                    coat.images,
                )?);
            }
        }
        Ok(Catalog::new(variants)?)
    }
}

impl BreedEntry {
    fn canonical_key(&self) -> String {
        let mut fields = self.extra.clone();
        fields.insert("name".to_owned(), Value::from(self.name.as_str()));
        if let Some(rank) = &self.popularity_rank {
            fields.insert("popularityRank".to_owned(), rank.clone());
        }
        if let Some(coats) = &self.coats {
            let coats = coats
                .iter()
                .map(|c| json!({ "id": c.id, "coat": c.coat, "images": c.images }))
                .collect();
            fields.insert("coats".to_owned(), Value::Array(coats));
        }

        let mut out = String::new();
        write_canonical(&Value::Object(fields), &mut out);
        out
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => out.push('0'),
            Some(f) => out.push_str(&f.to_string()),
            None => out.push_str(&n.to_string()),
        },
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::from(key.as_str()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        other => out.push_str(&other.to_string()),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_rank(value: &Value) -> Option<u64> {
    let rank = match value {
        Value::Number(n) => match n.as_u64() {
            Some(v) => v,
            None => {
                let f = n.as_f64()?;
                if f.fract() != 0.0 || !(1.0..=9_007_199_254_740_991.0).contains(&f) {
                    return None;
                }
                f as u64
            }
        },
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    (rank >= 1).then_some(rank)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "breeds": [
            { "name": "Pug", "popularityRank": 2, "coats": [
                { "id": "pug-fawn", "coat": "Fawn", "images": ["https://x.test/pf.jpg"] }
            ] },
            { "name": "Pug", "popularityRank": 2, "coats": [
                { "id": "pug-fawn", "coat": "Fawn", "images": ["https://x.test/pf.jpg"] }
            ] },
            { "name": "Beagle", "popularityRank": 2, "coatCount": 1, "coats": [
                { "id": "beagle-tri", "coat": "Tricolor", "images": ["https://x.test/b.jpg"] }
            ] },
            { "name": "Boxer", "popularityRank": "x", "coats": [] },
            { "name": "Akita", "coats": [] }
        ]
    }"#;

    #[test]
    fn normalize_removes_duplicates_and_reassigns_ranks() {
        let mut file = CatalogFile::from_json(SAMPLE).unwrap();
        let report = file.normalize();

        assert_eq!(report.input_count, 5);
        assert_eq!(report.output_count, 4);
        assert_eq!(report.removed_exact_duplicates, 1);
        assert_eq!(report.reassigned_ranks, 3);

        let ranks: Vec<u64> = file
            .breeds
            .iter()
            .map(|b| b.popularity_rank.as_ref().and_then(Value::as_u64).unwrap())
            .collect();
        assert_eq!(ranks, vec![2, 3, 4, 5]);
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let mut file = CatalogFile::from_json(SAMPLE).unwrap();
        file.normalize();
        let json = file.to_json_pretty().unwrap();
        assert!(json.contains("\"coatCount\": 1"));
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn duplicates_match_numbers_by_value() {
        let mut file = CatalogFile::from_json(
            r#"{ "breeds": [
                { "name": "Pug", "popularityRank": 2, "group": "Toy" },
                { "group": "Toy", "popularityRank": 2.0, "name": "Pug" },
                { "name": "Pug", "popularityRank": 3, "group": "Toy" }
            ] }"#,
        )
        .unwrap();

        let report = file.normalize();

        assert_eq!(report.removed_exact_duplicates, 1);
        assert_eq!(report.output_count, 2);
    }

    #[test]
    fn absent_coats_are_not_written_back() {
        let mut file = CatalogFile::from_json(
            r#"{ "breeds": [
                { "name": "Akita", "popularityRank": 1 },
                { "name": "Boxer", "popularityRank": 2, "coats": [] }
            ] }"#,
        )
        .unwrap();
        file.normalize();

        let json: Value = serde_json::from_str(&file.to_json_pretty().unwrap()).unwrap();

        assert!(json["breeds"][0].get("coats").is_none());
        assert_eq!(json["breeds"][1]["coats"], json!([]));
    }

    #[test]
    fn into_catalog_flattens_coats_in_order() {
        let mut file = CatalogFile::from_json(SAMPLE).unwrap();
        file.normalize();
        let catalog = file.into_catalog().unwrap();
        let ids: Vec<&str> = catalog.variants().iter().map(|v| v.id().as_str()).collect();
        assert_eq!(ids, vec!["pug-fawn", "beagle-tri"]);
    }

    #[test]
    fn duplicate_coat_ids_are_rejected() {
        let file = CatalogFile::from_json(SAMPLE).unwrap();
        let err = file.into_catalog().unwrap_err();
        assert!(matches!(err, CatalogFileError::Catalog(CatalogError::DuplicateId(_))));
    }
}
