use std::{fmt, str::FromStr};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Projected category name for tasks without a category.
pub const NO_CATEGORY: &str = "No Category";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    #[serde(rename = "Low Priority")]
    Low,
    #[default]
    #[serde(rename = "Medium Priority")]
    Medium,
    #[serde(rename = "High Priority")]
    High,
    #[serde(rename = "Urgent Priority")]
    Urgent,
}

#[derive(Debug, Error)]
#[error("invalid priority level: {0}")]
pub struct InvalidPriority(pub String);

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low Priority",
            Priority::Medium => "Medium Priority",
            Priority::High => "High Priority",
            Priority::Urgent => "Urgent Priority",
        }
    }

    /// Severity used for sorting, Low = 1 .. Urgent = 4.
    pub fn weight(self) -> i32 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }
}

impl FromStr for Priority {
    type Err = InvalidPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| InvalidPriority(s.to_string()))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    View,
    Edit,
}

/// One entry of `tasks.shared_with` (jsonb).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareEntry {
    /// Account with this email, when one existed at write time.
    #[serde(default)]
    pub user: Option<Uuid>,
    pub email: String,
    #[serde(default)]
    pub permission: Permission,
}

impl ShareEntry {
    pub fn view(email: impl Into<String>) -> Self {
        Self {
            user: None,
            email: email.into(),
            permission: Permission::View,
        }
    }
}

/// Trimmed, lowercased, de-duplicated view shares in input order.
pub fn shares_from_emails(emails: &[String]) -> Vec<ShareEntry> {
    let mut out: Vec<ShareEntry> = Vec::with_capacity(emails.len());
    for email in emails {
        let email = email.trim().to_lowercase();
        if email.is_empty() || out.iter().any(|s| s.email == email) {
            continue;
        }
        out.push(ShareEntry::view(email));
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

/// `tasks` joined with its category.
#[derive(Debug, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub completed_at: Option<OffsetDateTime>,
    pub priority: String,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
    pub due_date: Option<OffsetDateTime>,
    pub tags: Vec<String>,
    pub shared_with: Json<Vec<ShareEntry>>,
    pub enable_reminder: bool,
    pub reminder_date: Option<OffsetDateTime>,
    pub sort_order: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    pub priority: Priority,
    pub category: Option<CategoryRef>,
    /// Always the live name of `category`, or [`NO_CATEGORY`].
    pub category_name: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    pub tags: Vec<String>,
    pub shared_with: Vec<ShareEntry>,
    pub enable_reminder: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub reminder_date: Option<OffsetDateTime>,
    pub order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TryFrom<TaskRow> for Task {
    type Error = anyhow::Error;

    fn try_from(r: TaskRow) -> anyhow::Result<Self> {
        let priority = r
            .priority
            .parse::<Priority>()
            .with_context(|| format!("task {}", r.id))?;
        let category = match (r.category_id, r.category_name.as_ref(), r.category_color) {
            (Some(id), Some(name), Some(color)) => Some(CategoryRef {
                id,
                name: name.clone(),
                color,
            }),
            _ => None,
        };
        Ok(Self {
            id: r.id,
            owner_id: r.owner_id,
            title: r.title,
            description: r.description,
            completed: r.completed,
            completed_at: r.completed_at,
            priority,
            category,
            category_name: r.category_name.unwrap_or_else(|| NO_CATEGORY.to_string()),
            due_date: r.due_date,
            tags: r.tags,
            shared_with: r.shared_with.0,
            enable_reminder: r.enable_reminder,
            reminder_date: r.reminder_date,
            order: r.sort_order,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

impl Task {
    pub fn shared_emails(&self) -> impl Iterator<Item = &str> {
        self.shared_with.iter().map(|s| s.email.as_str())
    }
}

/// Writable columns of a task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub completed_at: Option<OffsetDateTime>,
    pub priority: Priority,
    pub category_id: Option<Uuid>,
    pub due_date: Option<OffsetDateTime>,
    pub tags: Vec<String>,
    pub shared_with: Vec<ShareEntry>,
    pub enable_reminder: bool,
    pub reminder_date: Option<OffsetDateTime>,
}

/// Partial update; `None` leaves the field untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub category_id: Option<Option<Uuid>>,
    pub due_date: Option<Option<OffsetDateTime>>,
    pub tags: Option<Vec<String>>,
    pub shared_with: Option<Vec<ShareEntry>>,
    pub enable_reminder: Option<bool>,
    pub reminder_date: Option<Option<OffsetDateTime>>,
}

impl From<&Task> for TaskDraft {
    fn from(t: &Task) -> Self {
        Self {
            title: t.title.clone(),
            description: t.description.clone(),
            completed: t.completed,
            completed_at: t.completed_at,
            priority: t.priority,
            category_id: t.category.as_ref().map(|c| c.id),
            due_date: t.due_date,
            tags: t.tags.clone(),
            shared_with: t.shared_with.clone(),
            enable_reminder: t.enable_reminder,
            reminder_date: t.reminder_date,
        }
    }
}

impl TaskDraft {
    /// Stamps `completed_at` on false -> true, clears it on true -> false.
    pub fn set_completed(&mut self, completed: bool, now: OffsetDateTime) {
        if self.completed == completed {
            return;
        }
        self.completed = completed;
        self.completed_at = completed.then_some(now);
    }

    pub fn apply(&mut self, patch: TaskPatch, now: OffsetDateTime) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(completed) = patch.completed {
            self.set_completed(completed, now);
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        // replaces, never merges
        if let Some(shared_with) = patch.shared_with {
            self.shared_with = shared_with;
        }
        if let Some(enable_reminder) = patch.enable_reminder {
            self.enable_reminder = enable_reminder;
        }
        if let Some(reminder_date) = patch.reminder_date {
            self.reminder_date = reminder_date;
        }
    }
}
