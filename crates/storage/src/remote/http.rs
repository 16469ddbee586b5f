use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dex_core::model::{BadgeState, BreedName, CollectionState, Progress, UserDocId, VariantId};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::PROGRESS_COLLECTION;
use crate::repository::{ProgressDocument, RemoteProgressStore, StorageError};

#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub base_url: Url,
    pub token: Option<String>,
}

impl RemoteConfig {
    /// Parse and normalize the service base URL.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if `base_url` is not an absolute URL.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, url::ParseError> {
        let mut base = base_url.trim().to_owned();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            base_url: Url::parse(&base)?,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }
}

/// Progress documents over a REST document service.
///
/// `GET {base}/userProgress/{doc}` reads a document (404 means none);
/// `PATCH` with `{collection, badges}` merges into it and the service stamps
/// `updatedAt`.
#[derive(Clone)]
pub struct HttpRemoteStore {
    client: Client,
    config: RemoteConfig,
}

impl HttpRemoteStore {
    #[must_use]
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn document_url(&self, doc_id: &UserDocId) -> Result<Url, StorageError> {
        self.config
            .base_url
            .join(&format!("{PROGRESS_COLLECTION}/{doc_id}"))
            .map_err(|err| StorageError::Unavailable(err.to_string()))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteProgressStore for HttpRemoteStore {
    async fn load_progress(
        &self,
        doc_id: &UserDocId,
    ) -> Result<Option<ProgressDocument>, StorageError> {
        let url = self.document_url(doc_id)?;
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(doc_id = %doc_id, "no remote progress document");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StorageError::Connection(format!(
                "load returned status {}",
                response.status()
            )));
        }

        let raw: RawDocument = response
            .json()
            .await
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        Ok(Some(raw.into_document()))
    }

    async fn save_progress(
        &self,
        doc_id: &UserDocId,
        progress: &Progress,
    ) -> Result<(), StorageError> {
        let url = self.document_url(doc_id)?;
        let payload = SaveRequest {
            collection: progress.collection.as_slice(),
            badges: progress.badges.as_slice(),
        };

        let response = self
            .authorize(self.client.patch(url))
            .json(&payload)
            .send()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        if !response.status().is_success() {
            return Err(StorageError::Connection(format!(
                "save returned status {}",
                response.status()
            )));
        }
        debug!(
            doc_id = %doc_id,
            collection_len = progress.collection.len(),
            badges_len = progress.badges.len(),
            "saved remote progress"
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SaveRequest<'a> {
    collection: &'a [VariantId],
    badges: &'a [BreedName],
}

/// Stored documents are not trusted to be well-typed: a field that is not an
/// array reads as empty and non-string entries are skipped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    #[serde(default)]
    collection: Value,
    #[serde(default)]
    badges: Value,
    #[serde(default)]
    updated_at: Option<Value>,
}

impl RawDocument {
    fn into_document(self) -> ProgressDocument {
        let collection = CollectionState::from_ids(strings(self.collection).map(VariantId::new));
        let badges = BadgeState::from_names(strings(self.badges).map(BreedName::new));
        let updated_at = self
            .updated_at
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc));
        ProgressDocument {
            progress: Progress::new(collection, badges),
            updated_at,
        }
    }
}

fn strings(value: Value) -> impl Iterator<Item = String> {
    let items = match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    items.into_iter().filter_map(|item| match item {
        Value::String(s) => Some(s),
        _ => None,
    })
}
