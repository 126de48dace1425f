//! Field-level request validation.
//!
//! Request bodies implement [`Validate`]; handlers receive them through
//! [`ValidatedJson`], which rejects with a list of `{field, message}` pairs
//! before any handler code runs.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Collects failed checks in declaration order.
#[derive(Debug, Default)]
pub struct Rules {
    errors: Vec<FieldError>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(mut self, ok: bool, field: &str, message: &str) -> Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    /// Runs `pred` only when the value is present.
    pub fn optional<T>(
        self,
        value: Option<T>,
        field: &str,
        message: &str,
        pred: impl FnOnce(T) -> bool,
    ) -> Self {
        match value {
            Some(v) => {
                let ok = pred(v);
                self.check(ok, field, message)
            }
            None => self,
        }
    }

    /// Runs `pred` on every element; reports the field at most once.
    pub fn each<'a, T: 'a>(
        self,
        values: impl IntoIterator<Item = &'a T>,
        field: &str,
        message: &str,
        pred: impl Fn(&T) -> bool,
    ) -> Self {
        let ok = values.into_iter().all(|v| pred(v));
        self.check(ok, field, message)
    }

    pub fn finish(self) -> Vec<FieldError> {
        self.errors
    }
}

pub trait Validate {
    /// Trims and case-folds fields before validation.
    fn normalize(&mut self) {}

    fn validate(&self) -> Vec<FieldError>;
}

/// JSON body that has been normalized and validated.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(mut value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        value.normalize();
        let errors = value.validate();
        if !errors.is_empty() {
            tracing::debug!(count = errors.len(), "request validation failed");
            return Err(AppError::Validation(errors));
        }
        Ok(Self(value))
    }
}

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref HEX_COLOR_RE: Regex = Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_hex_color(color: &str) -> bool {
    HEX_COLOR_RE.is_match(color)
}

/// At least one lowercase letter, one uppercase letter and one digit.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

pub fn char_len_between(value: &str, min: usize, max: usize) -> bool {
    let len = value.chars().count();
    (min..=max).contains(&len)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date_time(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if let Ok(ts) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(ts);
    }
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|d| d.midnight().assume_utc())
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email("first.last@mail.example.info"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana example@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn hex_colors() {
        assert!(is_hex_color("#3B82F6"));
        assert!(is_hex_color("#fff"));
        assert!(!is_hex_color("3B82F6"));
        assert!(!is_hex_color("#12345"));
        assert!(!is_hex_color("#GGGGGG"));
    }

    #[test]
    fn password_strength() {
        assert!(is_strong_password("Passw0rd"));
        assert!(!is_strong_password("password1"));
        assert!(!is_strong_password("PASSWORD1"));
        assert!(!is_strong_password("Password"));
    }

    #[test]
    fn char_len_counts_characters_not_bytes() {
        assert!(char_len_between("żółw", 1, 4));
        assert!(!char_len_between("", 1, 4));
        assert!(!char_len_between("abcde", 1, 4));
    }

    #[test]
    fn rules_collect_failures_in_order() {
        let errors = Rules::new()
            .check(false, "name", "Name is required")
            .check(true, "email", "never reported")
            .optional(Some("x"), "color", "Invalid color", is_hex_color)
            .optional(None::<&str>, "description", "never reported", |_| false)
            .each(["ok", "this-tag-is-way-too-long"].iter(), "tags", "Tag too long", |t| t.len() <= 20)
            .finish();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "color", "tags"]);
    }

    #[test]
    fn parses_rfc3339_and_plain_dates() {
        let ts = parse_date_time("2024-03-05T10:30:00Z").unwrap();
        assert_eq!(ts.hour(), 10);
        let day = parse_date_time("2024-03-05").unwrap();
        assert_eq!(day.date(), ts.date());
        assert_eq!(day.hour(), 0);
        assert!(parse_date_time("next tuesday").is_none());
    }

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        due: Option<Option<String>>,
    }

    #[test]
    fn double_option_tells_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.due, None);
        let null: Patch = serde_json::from_str(r#"{"due": null}"#).unwrap();
        assert_eq!(null.due, Some(None));
        let set: Patch = serde_json::from_str(r#"{"due": "2024-01-01"}"#).unwrap();
        assert_eq!(set.due, Some(Some("2024-01-01".into())));
    }
}
