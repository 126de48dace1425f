use serde::Deserialize;

use crate::{
    tasks::repo_types::NO_CATEGORY,
    validation::{char_len_between, is_hex_color, FieldError, Rules, Validate},
};

const NAME_RULE: &str = "Category name is required and must be less than 30 characters";
const COLOR_RULE: &str = "Please enter a valid hex color";
const DESCRIPTION_RULE: &str = "Description must be less than 200 characters";
const RESERVED_RULE: &str = "This category name is reserved";

/// Uncategorized tasks are projected under this name, so no category may take it.
fn is_reserved(name: &str) -> bool {
    name.eq_ignore_ascii_case(NO_CATEGORY)
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Validate for CreateCategoryRequest {
    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.color = self.color.trim().to_string();
        self.description = self.description.take().map(|d| d.trim().to_string());
    }

    fn validate(&self) -> Vec<FieldError> {
        Rules::new()
            .check(char_len_between(&self.name, 1, 30), "name", NAME_RULE)
            .check(!is_reserved(&self.name), "name", RESERVED_RULE)
            .check(is_hex_color(&self.color), "color", COLOR_RULE)
            .optional(self.description.as_deref(), "description", DESCRIPTION_RULE, |d| {
                char_len_between(d, 0, 200)
            })
            .finish()
    }
}

/// Partial update: absent fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCategoryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Validate for UpdateCategoryRequest {
    fn normalize(&mut self) {
        self.name = self.name.take().map(|n| n.trim().to_string());
        self.color = self.color.take().map(|c| c.trim().to_string());
        self.description = self.description.take().map(|d| d.trim().to_string());
    }

    fn validate(&self) -> Vec<FieldError> {
        Rules::new()
            .optional(self.name.as_deref(), "name", NAME_RULE, |n| char_len_between(n, 1, 30))
            .optional(self.name.as_deref(), "name", RESERVED_RULE, |n| !is_reserved(n))
            .optional(self.color.as_deref(), "color", COLOR_RULE, is_hex_color)
            .optional(self.description.as_deref(), "description", DESCRIPTION_RULE, |d| {
                char_len_between(d, 0, 200)
            })
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_trims_and_validates() {
        let mut req = CreateCategoryRequest {
            name: "  Work ".into(),
            color: "#3B82F6".into(),
            description: Some("  office stuff ".into()),
        };
        req.normalize();
        assert_eq!(req.name, "Work");
        assert_eq!(req.description.as_deref(), Some("office stuff"));
        assert!(req.validate().is_empty());
    }

    #[test]
    fn create_rejects_blank_name_and_bad_color() {
        let mut req = CreateCategoryRequest {
            name: "   ".into(),
            color: "blue".into(),
            description: None,
        };
        req.normalize();
        let fields: Vec<_> = req.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "color"]);
    }

    #[test]
    fn missing_fields_are_reported_per_field() {
        let mut req: CreateCategoryRequest = serde_json::from_str("{}").unwrap();
        req.normalize();
        let fields: Vec<_> = req.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "color"]);
    }

    #[test]
    fn no_category_name_is_reserved() {
        let mut req = CreateCategoryRequest {
            name: " no category ".into(),
            color: "#fff".into(),
            description: None,
        };
        req.normalize();
        assert_eq!(
            req.validate(),
            vec![FieldError::new("name", RESERVED_RULE)]
        );

        let req = UpdateCategoryRequest {
            name: Some(NO_CATEGORY.into()),
            ..Default::default()
        };
        assert_eq!(req.validate()[0].message, RESERVED_RULE);
    }

    #[test]
    fn update_checks_only_present_fields() {
        let req = UpdateCategoryRequest {
            color: Some("#abc".into()),
            ..Default::default()
        };
        assert!(req.validate().is_empty());

        let req = UpdateCategoryRequest {
            name: Some("x".repeat(31)),
            ..Default::default()
        };
        assert_eq!(req.validate()[0].field, "name");
    }
}
