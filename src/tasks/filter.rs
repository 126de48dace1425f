//! Task filtering and ordering.
//!
//! [`TaskFilter`] has two renderings that must agree: a SQL `WHERE` clause used
//! by the listing and export queries, and [`TaskFilter::matches`] for callers
//! that already hold a snapshot of tasks.

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::repo_types::{Priority, Task, NO_CATEGORY};
use crate::db::like_pattern;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl StatusFilter {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" | "all status" => Some(StatusFilter::All),
            "completed" => Some(StatusFilter::Completed),
            "pending" => Some(StatusFilter::Pending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: StatusFilter,
    pub priority: Option<Priority>,
    /// Projected category name, including [`NO_CATEGORY`].
    pub category: Option<String>,
    pub search: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Completed => task.completed,
            StatusFilter::Pending => !task.completed,
        };
        let priority_ok = self.priority.map_or(true, |p| task.priority == p);
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |c| task.category_name == c);
        let search_ok = self.search.as_deref().map_or(true, |term| {
            let term = term.to_lowercase();
            task.title.to_lowercase().contains(&term)
                || task.description.to_lowercase().contains(&term)
        });
        status_ok && priority_ok && category_ok && search_ok
    }

    /// Appends ` WHERE ...` scoped to `owner_id`. Expects `tasks t` joined to `categories c`.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>, owner_id: Uuid) {
        qb.push(" WHERE t.owner_id = ").push_bind(owner_id);
        match self.status {
            StatusFilter::All => {}
            StatusFilter::Completed => {
                qb.push(" AND t.completed = TRUE");
            }
            StatusFilter::Pending => {
                qb.push(" AND t.completed = FALSE");
            }
        }
        if let Some(priority) = self.priority {
            qb.push(" AND t.priority = ").push_bind(priority.as_str());
        }
        if let Some(category) = &self.category {
            qb.push(" AND COALESCE(c.name, ")
                .push_bind(NO_CATEGORY)
                .push(") = ")
                .push_bind(category.clone());
        }
        if let Some(term) = &self.search {
            let pattern = like_pattern(term);
            qb.push(" AND (t.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR t.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
    /// Manual drag-and-drop order.
    Manual,
}

impl SortField {
    pub fn parse(s: &str) -> Self {
        match s {
            "dueDate" => SortField::DueDate,
            "priority" => SortField::Priority,
            "order" => SortField::Manual,
            _ => SortField::CreatedAt,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("asc") {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }

    fn sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl TaskSort {
    /// `ORDER BY` body; every variant ends in a unique key so pages are stable.
    pub fn order_by(&self) -> String {
        let dir = self.direction.sql();
        match self.field {
            SortField::CreatedAt => format!("t.created_at {dir}, t.id {dir}"),
            SortField::DueDate => format!("t.due_date {dir} NULLS LAST, t.created_at DESC, t.id"),
            SortField::Priority => {
                format!("{} {dir}, t.created_at DESC, t.id", priority_weight_sql())
            }
            SortField::Manual => "t.sort_order ASC, t.created_at ASC, t.id".to_string(),
        }
    }
}

fn priority_weight_sql() -> String {
    let arms: String = Priority::ALL
        .iter()
        .map(|p| format!(" WHEN '{}' THEN {}", p.as_str(), p.weight()))
        .collect();
    format!("CASE t.priority{arms} ELSE 0 END")
}

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 100;
/// Keeps `(page - 1) * limit` inside `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}
