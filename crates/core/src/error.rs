use thiserror::Error;

use crate::collection::CollectionError;
use crate::model::{CatalogError, CatalogFileError, VariantError};
use crate::selector::SelectorError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    CatalogFile(#[from] CatalogFileError),
    #[error(transparent)]
    Variant(#[from] VariantError),
    #[error(transparent)]
    Collection(#[from] CollectionError),
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Catalog, CatalogFile, VariantId};

    fn load(raw: &str) -> Result<Catalog, Error> {
        Ok(CatalogFile::from_json(raw)?.into_catalog()?)
    }

    #[test]
    fn layer_errors_convert_and_keep_their_message() {
        let err = load("{").unwrap_err();
        assert!(matches!(err, Error::CatalogFile(_)));

        let err: Error = CatalogError::DuplicateId(VariantId::new("pug-fawn")).into();
        assert!(err.to_string().contains("pug-fawn"));
    }
}
