use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque reference to a signed-in account, as handed over by the auth provider.
///
/// Any of the three fields may be missing; the first non-empty one wins when
/// deriving the remote document key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub uid: Option<String>,
    pub id: Option<String>,
    pub email: Option<String>,
}

impl UserRef {
    /// Reference carrying only a provider uid.
    #[must_use]
    pub fn from_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    fn primary_id(&self) -> Option<&str> {
        [&self.uid, &self.id, &self.email]
            .into_iter()
            .filter_map(Option::as_deref)
            .find(|value| !value.is_empty())
    }

    /// Derive the remote document key, or `None` when no usable id exists.
    #[must_use]
    pub fn doc_id(&self) -> Option<UserDocId> {
        self.primary_id().map(UserDocId::sanitize)
    }
}

/// Remote document key: the user's primary id with every character outside
/// `[A-Za-z0-9_-]` replaced by `_`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserDocId(String);

impl UserDocId {
    #[must_use]
    pub fn sanitize(raw: &str) -> Self {
        Self(
            raw.chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserDocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserDocId({})", self.0)
    }
}

impl fmt::Display for UserDocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_sanitized() {
        let user = UserRef::from_email("jane.doe+dogs@example.com");
        assert_eq!(
            user.doc_id().unwrap().as_str(),
            "jane_doe_dogs_example_com"
        );
    }

    #[test]
    fn uid_takes_priority_over_email() {
        let user = UserRef {
            uid: Some("abc-123_X".into()),
            id: Some("other".into()),
            email: Some("a@b.c".into()),
        };
        assert_eq!(user.doc_id().unwrap().as_str(), "abc-123_X");
    }

    #[test]
    fn empty_fields_are_skipped() {
        let user = UserRef {
            uid: Some(String::new()),
            id: None,
            email: Some("x@y".into()),
        };
        assert_eq!(user.doc_id().unwrap().as_str(), "x_y");
    }

    #[test]
    fn no_usable_id_yields_none() {
        assert!(UserRef::default().doc_id().is_none());
    }

    #[test]
    fn non_ascii_characters_are_replaced_one_for_one() {
        assert_eq!(UserDocId::sanitize("hé/llo").as_str(), "h__llo");
    }
}
