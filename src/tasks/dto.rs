use serde::Deserialize;
use uuid::Uuid;

use super::{
    filter::{PageRequest, SortDirection, SortField, StatusFilter, TaskFilter, TaskSort},
    repo_types::{shares_from_emails, Priority, TaskDraft, TaskPatch},
};
use crate::{
    error::{AppError, AppResult},
    validation::{
        char_len_between, double_option, is_valid_email, parse_date_time, FieldError, Rules,
        Validate,
    },
};

const TITLE_RULE: &str = "Title is required and must be less than 100 characters";
const DESCRIPTION_RULE: &str = "Description must be less than 500 characters";
const PRIORITY_RULE: &str = "Invalid priority level";
const CATEGORY_RULE: &str = "Invalid category";
const DUE_DATE_RULE: &str = "Invalid due date format";
const REMINDER_DATE_RULE: &str = "Invalid reminder date format";
const TAG_RULE: &str = "Each tag must be less than 20 characters";
const SHARED_RULE: &str = "Please enter valid email addresses";

fn valid_title(title: &str) -> bool {
    char_len_between(title, 1, 100)
}

fn valid_description(description: &str) -> bool {
    char_len_between(description, 0, 500)
}

fn valid_tag(tag: &String) -> bool {
    char_len_between(tag, 0, 20)
}

fn valid_share(email: &String) -> bool {
    is_valid_email(email.trim())
}

fn trim_all(values: Option<Vec<String>>) -> Option<Vec<String>> {
    values.map(|vs| vs.into_iter().map(|v| v.trim().to_string()).collect())
}

/// Trimmed tags with blanks dropped.
fn clean_tags(tags: Option<Vec<String>>) -> Option<Vec<String>> {
    trim_all(tags).map(|ts| ts.into_iter().filter(|t| !t.is_empty()).collect())
}

/// Blank strings count as "not given".
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_date(value: &str) -> AppResult<time::OffsetDateTime> {
    parse_date_time(value).ok_or_else(|| AppError::validation("dueDate", DUE_DATE_RULE))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    /// Category id.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub shared_emails: Option<Vec<String>>,
    #[serde(default)]
    pub enable_reminder: Option<bool>,
    #[serde(default)]
    pub reminder_date: Option<String>,
}

impl Validate for CreateTaskRequest {
    fn normalize(&mut self) {
        self.title = self.title.trim().to_string();
        self.description = self.description.take().map(|d| d.trim().to_string());
        self.priority = non_blank(self.priority.take());
        self.category = non_blank(self.category.take());
        self.due_date = non_blank(self.due_date.take());
        self.reminder_date = non_blank(self.reminder_date.take());
        self.tags = clean_tags(self.tags.take());
        self.shared_emails = trim_all(self.shared_emails.take());
    }

    fn validate(&self) -> Vec<FieldError> {
        Rules::new()
            .check(valid_title(&self.title), "title", TITLE_RULE)
            .optional(self.description.as_deref(), "description", DESCRIPTION_RULE, valid_description)
            .optional(self.priority.as_deref(), "priority", PRIORITY_RULE, |p| {
                p.parse::<Priority>().is_ok()
            })
            .optional(self.category.as_deref(), "category", CATEGORY_RULE, |c| {
                Uuid::parse_str(c).is_ok()
            })
            .optional(self.due_date.as_deref(), "dueDate", DUE_DATE_RULE, |d| {
                parse_date_time(d).is_some()
            })
            .optional(self.reminder_date.as_deref(), "reminderDate", REMINDER_DATE_RULE, |d| {
                parse_date_time(d).is_some()
            })
            .each(self.tags.iter().flatten(), "tags", TAG_RULE, valid_tag)
            .each(self.shared_emails.iter().flatten(), "sharedEmails", SHARED_RULE, valid_share)
            .finish()
    }
}

impl CreateTaskRequest {
    /// Converts a validated request into insertable columns.
    pub fn into_draft(self) -> AppResult<TaskDraft> {
        let priority = match self.priority.as_deref() {
            Some(p) => p
                .parse()
                .map_err(|_| AppError::validation("priority", PRIORITY_RULE))?,
            None => Priority::default(),
        };
        let category_id = self.category.as_deref().map(parse_category).transpose()?;
        let due_date = self.due_date.as_deref().map(parse_date).transpose()?;
        let reminder_date = self
            .reminder_date
            .as_deref()
            .map(|d| {
                parse_date_time(d)
                    .ok_or_else(|| AppError::validation("reminderDate", REMINDER_DATE_RULE))
            })
            .transpose()?;

        Ok(TaskDraft {
            title: self.title,
            description: self.description.unwrap_or_default(),
            priority,
            category_id,
            due_date,
            tags: self.tags.unwrap_or_default(),
            shared_with: shares_from_emails(&self.shared_emails.unwrap_or_default()),
            enable_reminder: self.enable_reminder.unwrap_or(false),
            reminder_date,
            ..Default::default()
        })
    }
}

fn parse_category(id: &str) -> AppResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| AppError::validation("category", CATEGORY_RULE))
}

/// Every field optional; `null` clears `category`, `dueDate` and `reminderDate`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub shared_emails: Option<Vec<String>>,
    #[serde(default)]
    pub enable_reminder: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub reminder_date: Option<Option<String>>,
}

/// An explicit empty string clears like `null`.
fn clearable(value: Option<Option<String>>) -> Option<Option<String>> {
    value.map(non_blank)
}

impl Validate for UpdateTaskRequest {
    fn normalize(&mut self) {
        self.title = self.title.take().map(|t| t.trim().to_string());
        self.description = self.description.take().map(|d| d.trim().to_string());
        self.priority = self.priority.take().map(|p| p.trim().to_string());
        self.category = clearable(self.category.take());
        self.due_date = clearable(self.due_date.take());
        self.reminder_date = clearable(self.reminder_date.take());
        self.tags = clean_tags(self.tags.take());
        self.shared_emails = trim_all(self.shared_emails.take());
    }

    fn validate(&self) -> Vec<FieldError> {
        Rules::new()
            .optional(self.title.as_deref(), "title", TITLE_RULE, valid_title)
            .optional(self.description.as_deref(), "description", DESCRIPTION_RULE, valid_description)
            .optional(self.priority.as_deref(), "priority", PRIORITY_RULE, |p| {
                p.parse::<Priority>().is_ok()
            })
            .optional(self.category.clone().flatten(), "category", CATEGORY_RULE, |c| {
                Uuid::parse_str(&c).is_ok()
            })
            .optional(self.due_date.clone().flatten(), "dueDate", DUE_DATE_RULE, |d| {
                parse_date_time(&d).is_some()
            })
            .optional(
                self.reminder_date.clone().flatten(),
                "reminderDate",
                REMINDER_DATE_RULE,
                |d| parse_date_time(&d).is_some(),
            )
            .each(self.tags.iter().flatten(), "tags", TAG_RULE, valid_tag)
            .each(self.shared_emails.iter().flatten(), "sharedEmails", SHARED_RULE, valid_share)
            .finish()
    }
}

impl UpdateTaskRequest {
    pub fn into_patch(self) -> AppResult<TaskPatch> {
        let priority = self
            .priority
            .as_deref()
            .map(|p| {
                p.parse::<Priority>()
                    .map_err(|_| AppError::validation("priority", PRIORITY_RULE))
            })
            .transpose()?;
        let category_id = match self.category {
            Some(Some(id)) => Some(Some(parse_category(&id)?)),
            Some(None) => Some(None),
            None => None,
        };
        let due_date = match self.due_date {
            Some(Some(d)) => Some(Some(parse_date(&d)?)),
            Some(None) => Some(None),
            None => None,
        };
        let reminder_date = match self.reminder_date {
            Some(Some(d)) => Some(Some(parse_date_time(&d).ok_or_else(|| {
                AppError::validation("reminderDate", REMINDER_DATE_RULE)
            })?)),
            Some(None) => Some(None),
            None => None,
        };

        Ok(TaskPatch {
            title: self.title,
            description: self.description,
            completed: self.completed,
            priority,
            category_id,
            due_date,
            tags: self.tags,
            shared_with: self.shared_emails.map(|emails| shares_from_emails(&emails)),
            enable_reminder: self.enable_reminder,
            reminder_date,
        })
    }
}

/// Query string of `GET /tasks` and `GET /tasks/export`.
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl TaskListQuery {
    pub fn filter(&self) -> AppResult<TaskFilter> {
        let status = match self.status.as_deref() {
            Some(s) => StatusFilter::parse(s)
                .ok_or_else(|| AppError::validation("status", "Invalid status filter"))?,
            None => StatusFilter::All,
        };
        let priority = match non_blank(self.priority.clone()).as_deref() {
            None | Some("All Priority") => None,
            Some(p) => Some(
                p.parse::<Priority>()
                    .map_err(|_| AppError::validation("priority", PRIORITY_RULE))?,
            ),
        };
        let category = non_blank(self.category.clone()).filter(|c| c != "All Categories");
        let search = non_blank(self.search.clone());
        Ok(TaskFilter {
            status,
            priority,
            category,
            search,
        })
    }

    pub fn sort(&self) -> TaskSort {
        TaskSort {
            field: self.sort.as_deref().map(SortField::parse).unwrap_or_default(),
            direction: self
                .order
                .as_deref()
                .map(SortDirection::parse)
                .unwrap_or_default(),
        }
    }

    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub task_id: Uuid,
    pub position: usize,
}

impl Validate for ReorderRequest {
    fn validate(&self) -> Vec<FieldError> {
        Vec::new()
    }
}
