use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub color: String,
    pub description: String,
    pub is_default: bool,
    pub task_count: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct CategoryStatRow {
    pub category_name: String,
    pub total: i64,
    pub completed: i64,
}

/// Per-category completion summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub category_name: String,
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub completion_rate: f64,
}

impl From<CategoryStatRow> for CategoryStat {
    fn from(r: CategoryStatRow) -> Self {
        let completion_rate = if r.total == 0 {
            0.0
        } else {
            r.completed as f64 / r.total as f64 * 100.0
        };
        Self {
            category_name: r.category_name,
            total: r.total,
            completed: r.completed,
            pending: r.total - r.completed,
            completion_rate,
        }
    }
}
