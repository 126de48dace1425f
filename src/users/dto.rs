use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// What other users may see of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

impl SearchQuery {
    /// Trimmed search term, at least two characters long.
    pub fn term(&self) -> AppResult<&str> {
        let term = self.q.as_deref().map(str::trim).unwrap_or_default();
        if term.chars().count() < 2 {
            return Err(AppError::BadRequest(
                "Search query must be at least 2 characters".into(),
            ));
        }
        Ok(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(q: Option<&str>) -> SearchQuery {
        SearchQuery {
            q: q.map(Into::into),
        }
    }

    #[test]
    fn term_is_trimmed() {
        assert_eq!(query(Some("  an ")).term().unwrap(), "an");
    }

    #[test]
    fn short_or_missing_terms_are_rejected() {
        for q in [None, Some(""), Some("a"), Some("  b  ")] {
            let err = query(q).term().unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
    }

    #[test]
    fn serializes_only_public_fields() {
        let user = PublicUser {
            id: Uuid::nil(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            avatar: String::new(),
        };
        let v = serde_json::to_value(&user).unwrap();
        let mut keys: Vec<_> = v.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["avatar", "email", "id", "name"]);
    }
}
