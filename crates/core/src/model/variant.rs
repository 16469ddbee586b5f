use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::ids::{BreedName, VariantId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VariantError {
    #[error("variant id cannot be empty")]
    EmptyId,

    #[error("breed name cannot be empty (variant {0})")]
    EmptyBreed(VariantId),

    #[error("variant {0} needs at least one image")]
    NoImages(VariantId),

    #[error("invalid image URI for variant {id}: {raw}")]
    InvalidImageUri { id: VariantId, raw: String },
}

//
// ─── IMAGE URI ─────────────────────────────────────────────────────────────────
//

/// Location of a single photo for a variant.
///
/// Absolute URLs are validated; anything without a scheme is kept as a bundled
/// asset path.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageUri(String);

impl ImageUri {
    /// Parse an image location, rejecting blanks and malformed URLs.
    pub fn parse(raw: impl AsRef<str>) -> Option<Self> {
        let s = raw.as_ref().trim();
        if s.is_empty() {
            return None;
        }
        if s.contains("://") && Url::parse(s).is_err() {
            return None;
        }
        Some(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ImageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageUri({})", self.0)
    }
}

impl fmt::Display for ImageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── VARIANT ───────────────────────────────────────────────────────────────────
//

/// One coat of one breed, as listed in the static catalog.
///
/// The image pool is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DogVariant {
    id: VariantId,
    breed: BreedName,
    coat: String,
    images: Vec<ImageUri>,
}

impl DogVariant {
    /// Build a variant from raw catalog values.
    ///
    /// # Errors
    ///
    /// Returns `VariantError` if the id or breed is blank, no images are given,
    /// or an image URI does not parse.
    pub fn new<I, S>(
        id: impl Into<String>,
        breed: impl Into<String>,
        coat: impl Into<String>,
        images: I,
    ) -> Result<Self, VariantError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(VariantError::EmptyId);
        }
        let id = VariantId::new(id.trim());

        let breed = breed.into();
        if breed.trim().is_empty() {
            return Err(VariantError::EmptyBreed(id));
        }

        let mut parsed = Vec::new();
        for raw in images {
            let raw = raw.as_ref();
            let uri = ImageUri::parse(raw).ok_or_else(|| VariantError::InvalidImageUri {
                id: id.clone(),
                raw: raw.to_owned(),
            })?;
            parsed.push(uri);
        }
        if parsed.is_empty() {
            return Err(VariantError::NoImages(id));
        }

        Ok(Self {
            id,
            breed: BreedName::new(breed.trim()),
            coat: coat.into().trim().to_owned(),
            images: parsed,
        })
    }

    #[must_use]
    pub fn id(&self) -> &VariantId {
        &self.id
    }

    #[must_use]
    pub fn breed(&self) -> &BreedName {
        &self.breed
    }

    #[must_use]
    pub fn coat(&self) -> &str {
        &self.coat
    }

    #[must_use]
    pub fn images(&self) -> &[ImageUri] {
        &self.images
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_requires_an_image() {
        let err = DogVariant::new("pug-fawn", "Pug", "Fawn", Vec::<String>::new()).unwrap_err();
        assert_eq!(err, VariantError::NoImages(VariantId::new("pug-fawn")));
    }

    #[test]
    fn variant_rejects_blank_breed() {
        let err = DogVariant::new("pug-fawn", "  ", "Fawn", ["a.jpg"]).unwrap_err();
        assert!(matches!(err, VariantError::EmptyBreed(_)));
    }

    #[test]
    fn variant_rejects_malformed_url() {
        let err = DogVariant::new("pug-fawn", "Pug", "Fawn", ["https://"]).unwrap_err();
        assert!(matches!(err, VariantError::InvalidImageUri { .. }));
    }

    #[test]
    fn variant_trims_and_keeps_asset_paths() {
        let variant =
            DogVariant::new(" pug-fawn ", " Pug ", "Fawn", ["assets/pug.jpg", "https://x.test/p.jpg"])
                .unwrap();
        assert_eq!(variant.id().as_str(), "pug-fawn");
        assert_eq!(variant.breed().as_str(), "Pug");
        assert_eq!(variant.images().len(), 2);
        assert_eq!(variant.images()[0].as_str(), "assets/pug.jpg");
    }
}
