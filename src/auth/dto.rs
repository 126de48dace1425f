use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::User;
use crate::validation::{
    char_len_between, is_strong_password, is_valid_email, normalize_email, FieldError, Rules,
    Validate,
};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for RegisterRequest {
    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);
    }

    fn validate(&self) -> Vec<FieldError> {
        Rules::new()
            .check(
                char_len_between(&self.name, 2, 50),
                "name",
                "Name must be between 2 and 50 characters",
            )
            .check(is_valid_email(&self.email), "email", "Please enter a valid email")
            .check(
                self.password.chars().count() >= 6,
                "password",
                "Password must be at least 6 characters long",
            )
            .check(
                is_strong_password(&self.password),
                "password",
                "Password must contain at least one uppercase letter, one lowercase letter, and one number",
            )
            .finish()
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for LoginRequest {
    fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
    }

    fn validate(&self) -> Vec<FieldError> {
        Rules::new()
            .check(is_valid_email(&self.email), "email", "Please enter a valid email")
            .check(!self.password.is_empty(), "password", "Password is required")
            .finish()
    }
}

/// Profile changes; blank values keep the current value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Validate for UpdateProfileRequest {
    fn normalize(&mut self) {
        self.name = self
            .name
            .take()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self.email = self
            .email
            .take()
            .map(|e| normalize_email(&e))
            .filter(|e| !e.is_empty());
    }

    fn validate(&self) -> Vec<FieldError> {
        Rules::new()
            .optional(
                self.name.as_deref(),
                "name",
                "Name must be between 2 and 50 characters",
                |n| char_len_between(n, 2, 50),
            )
            .optional(
                self.email.as_deref(),
                "email",
                "Please enter a valid email",
                is_valid_email,
            )
            .finish()
    }
}

/// Returned after register or login.
#[derive(Debug, Serialize)]
pub struct AuthData {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub token: String,
}

/// Own profile as returned to the caller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_login: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for ProfileData {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            avatar: u.avatar.clone(),
            last_login: u.last_login,
            created_at: u.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            avatar: String::new(),
            is_active: true,
            last_login: OffsetDateTime::UNIX_EPOCH,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn register_normalizes_email_and_name() {
        let mut req = RegisterRequest {
            name: "  Ana  ".into(),
            email: "  Ana@Example.COM ".into(),
            password: "Passw0rd".into(),
        };
        req.normalize();
        assert_eq!(req.name, "Ana");
        assert_eq!(req.email, "ana@example.com");
        assert!(req.validate().is_empty());
    }

    #[test]
    fn register_reports_each_bad_field() {
        let req = RegisterRequest {
            name: "A".into(),
            email: "nope".into(),
            password: "abc".into(),
        };
        let fields: Vec<_> = req.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "email", "password", "password"]);
    }

    #[test]
    fn login_requires_password() {
        let mut req = LoginRequest {
            email: "ANA@example.com".into(),
            password: String::new(),
        };
        req.normalize();
        let errors = req.validate();
        assert_eq!(errors, vec![FieldError::new("password", "Password is required")]);
    }

    #[test]
    fn missing_fields_reach_validation() {
        let mut req: RegisterRequest =
            serde_json::from_str(r#"{"email":"ana@example.com","password":"Passw0rd"}"#).unwrap();
        req.normalize();
        assert_eq!(
            req.validate(),
            vec![FieldError::new("name", "Name must be between 2 and 50 characters")]
        );

        let req: LoginRequest = serde_json::from_str("{}").unwrap();
        let fields: Vec<_> = req.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["email", "password"]);
    }

    #[test]
    fn profile_update_treats_blank_as_absent() {
        let mut req = UpdateProfileRequest {
            name: Some("   ".into()),
            email: Some("".into()),
        };
        req.normalize();
        assert!(req.name.is_none());
        assert!(req.email.is_none());
        assert!(req.validate().is_empty());
    }

    #[test]
    fn password_hash_never_serialized() {
        let u = user();
        let raw = serde_json::to_string(&u).unwrap();
        assert!(!raw.contains("password"));
        assert!(!raw.contains("argon2"));
        let profile = serde_json::to_string(&ProfileData::from(&u)).unwrap();
        assert!(!profile.contains("password"));
        assert!(profile.contains("lastLogin"));
    }
}
