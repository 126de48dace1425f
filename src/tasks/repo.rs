use anyhow::Context;
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::{
    filter::{PageRequest, TaskFilter, TaskSort},
    repo_types::{Priority, Task, TaskDraft, TaskRow},
};

const TASK_COLUMNS: &str = r#"
    t.id, t.owner_id, t.title, t.description, t.completed, t.completed_at, t.priority,
    t.category_id, c.name AS category_name, c.color AS category_color,
    t.due_date, t.tags, t.shared_with, t.enable_reminder, t.reminder_date, t.sort_order,
    t.created_at, t.updated_at
"#;

const TASK_FROM: &str = " FROM tasks t LEFT JOIN categories c ON c.id = t.category_id";

fn into_tasks(rows: Vec<TaskRow>) -> anyhow::Result<Vec<Task>> {
    rows.into_iter().map(Task::try_from).collect()
}

async fn fetch_one_tx(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: Uuid,
    id: Uuid,
) -> anyhow::Result<Task> {
    let sql = format!("SELECT {TASK_COLUMNS}{TASK_FROM} WHERE t.id = $1 AND t.owner_id = $2");
    let row = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_one(&mut **tx)
        .await
        .with_context(|| format!("reload task {id}"))?;
    Task::try_from(row)
}

pub async fn find_owned(db: &PgPool, owner_id: Uuid, id: Uuid) -> anyhow::Result<Option<Task>> {
    let sql = format!("SELECT {TASK_COLUMNS}{TASK_FROM} WHERE t.id = $1 AND t.owner_id = $2");
    let row = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?;
    row.map(Task::try_from).transpose()
}

/// Same as [`find_owned`] but row-locks the task until the transaction ends.
pub async fn find_owned_for_update_tx(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: Uuid,
    id: Uuid,
) -> anyhow::Result<Option<Task>> {
    let sql = format!(
        "SELECT {TASK_COLUMNS}{TASK_FROM} WHERE t.id = $1 AND t.owner_id = $2 FOR UPDATE OF t"
    );
    let row = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut **tx)
        .await
        .with_context(|| format!("lock task {id}"))?;
    row.map(Task::try_from).transpose()
}

/// One page of the owner's tasks plus the total number of matches.
pub async fn list_page(
    db: &PgPool,
    owner_id: Uuid,
    filter: &TaskFilter,
    sort: TaskSort,
    page: PageRequest,
) -> anyhow::Result<(Vec<Task>, i64)> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {TASK_COLUMNS}{TASK_FROM}"));
    filter.push_where(&mut qb, owner_id);
    qb.push(" ORDER BY ")
        .push(sort.order_by())
        .push(" LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let rows = qb
        .build_query_as::<TaskRow>()
        .fetch_all(db)
        .await
        .context("list tasks")?;

    let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*){TASK_FROM}"));
    filter.push_where(&mut count, owner_id);
    let total = count
        .build_query_scalar::<i64>()
        .fetch_one(db)
        .await
        .context("count tasks")?;

    Ok((into_tasks(rows)?, total))
}

/// Every matching task, unpaginated.
pub async fn list_all(
    db: &PgPool,
    owner_id: Uuid,
    filter: &TaskFilter,
    sort: TaskSort,
) -> anyhow::Result<Vec<Task>> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {TASK_COLUMNS}{TASK_FROM}"));
    filter.push_where(&mut qb, owner_id);
    qb.push(" ORDER BY ").push(sort.order_by());
    let rows = qb
        .build_query_as::<TaskRow>()
        .fetch_all(db)
        .await
        .context("list tasks for export")?;
    into_tasks(rows)
}

/// Inserts at the end of the owner's manual order.
pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: Uuid,
    draft: &TaskDraft,
) -> anyhow::Result<Task> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO tasks (
            owner_id, title, description, completed, completed_at, priority, category_id,
            due_date, tags, shared_with, enable_reminder, reminder_date, sort_order
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
            (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM tasks WHERE owner_id = $1)
        )
        RETURNING id
        "#,
    )
    .bind(owner_id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.completed)
    .bind(draft.completed_at)
    .bind(draft.priority.as_str())
    .bind(draft.category_id)
    .bind(draft.due_date)
    .bind(&draft.tags)
    .bind(Json(&draft.shared_with))
    .bind(draft.enable_reminder)
    .bind(draft.reminder_date)
    .fetch_one(&mut **tx)
    .await
    .context("insert task")?;

    fetch_one_tx(tx, owner_id, id).await
}

/// `None` when no row of the owner matched `id`.
pub async fn update_tx(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: Uuid,
    id: Uuid,
    draft: &TaskDraft,
) -> anyhow::Result<Option<Task>> {
    let res = sqlx::query(
        r#"
        UPDATE tasks
           SET title = $3, description = $4, completed = $5, completed_at = $6,
               priority = $7, category_id = $8, due_date = $9, tags = $10,
               shared_with = $11, enable_reminder = $12, reminder_date = $13,
               updated_at = now()
         WHERE id = $1 AND owner_id = $2
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.completed)
    .bind(draft.completed_at)
    .bind(draft.priority.as_str())
    .bind(draft.category_id)
    .bind(draft.due_date)
    .bind(&draft.tags)
    .bind(Json(&draft.shared_with))
    .bind(draft.enable_reminder)
    .bind(draft.reminder_date)
    .execute(&mut **tx)
    .await
    .context("update task")?;
    if res.rows_affected() == 0 {
        return Ok(None);
    }

    fetch_one_tx(tx, owner_id, id).await.map(Some)
}

pub async fn delete_tx(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: Uuid,
    id: Uuid,
) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner_id = $2")
        .bind(id)
        .bind(owner_id)
        .execute(&mut **tx)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// Locks the owner's tasks for the rest of the transaction.
pub async fn ids_in_manual_order_tx(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: Uuid,
) -> anyhow::Result<Vec<Uuid>> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id FROM tasks
         WHERE owner_id = $1
         ORDER BY sort_order ASC, created_at ASC, id
           FOR UPDATE
        "#,
    )
    .bind(owner_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(ids)
}

/// Rewrites `sort_order` so that each task's order is its index in `ids`.
pub async fn set_manual_order_tx(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: Uuid,
    ids: &[Uuid],
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE tasks t
           SET sort_order = o.idx - 1
          FROM UNNEST($2::uuid[]) WITH ORDINALITY AS o(id, idx)
         WHERE t.id = o.id AND t.owner_id = $1
        "#,
    )
    .bind(owner_id)
    .bind(ids)
    .execute(&mut **tx)
    .await
    .context("persist manual order")?;
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct StatsCounts {
    pub total: i64,
    pub completed: i64,
    pub high_priority: i64,
    pub overdue: i64,
}

pub async fn stats_counts(db: &PgPool, owner_id: Uuid) -> anyhow::Result<StatsCounts> {
    let counts = sqlx::query_as::<_, StatsCounts>(
        r#"
        SELECT COUNT(*) AS total,
               COUNT(*) FILTER (WHERE completed) AS completed,
               COUNT(*) FILTER (WHERE NOT completed AND priority = $2) AS high_priority,
               COUNT(*) FILTER (WHERE NOT completed AND due_date < now()) AS overdue
          FROM tasks
         WHERE owner_id = $1
        "#,
    )
    .bind(owner_id)
    .bind(Priority::High.as_str())
    .fetch_one(db)
    .await?;
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::User;
    use crate::categories;
    use crate::tasks::{
        filter::StatusFilter,
        repo_types::NO_CATEGORY,
        services,
        stats::{summarize, TaskStats},
    };
    use time::{Duration, OffsetDateTime};

    async fn owner(db: &PgPool) -> Uuid {
        User::create(db, "Ana", "ana@example.com", "$argon2id$x")
            .await
            .unwrap()
            .id
    }

    fn draft(title: &str, completed: bool, priority: Priority) -> TaskDraft {
        TaskDraft {
            title: title.into(),
            completed,
            completed_at: completed.then(OffsetDateTime::now_utc),
            priority,
            ..Default::default()
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn four_of_ten_completed_is_forty_percent(pool: PgPool) {
        let ana = owner(&pool).await;
        for i in 0..10 {
            let priority = if i % 3 == 0 { Priority::High } else { Priority::Low };
            services::create_task(&pool, ana, draft(&format!("task {i}"), i < 4, priority))
                .await
                .unwrap();
        }

        let counts = stats_counts(&pool, ana).await.unwrap();
        assert_eq!(counts.total, 10);
        assert_eq!(counts.completed, 4);
        // i = 6 and 9 are open and High
        assert_eq!(counts.high_priority, 2);
        let stats = TaskStats::from_counts(counts);
        assert_eq!(stats.completion_rate, 40);
        assert_eq!(stats.pending, 6);

        let empty = stats_counts(&pool, Uuid::new_v4()).await.unwrap();
        assert_eq!(TaskStats::from_counts(empty).completion_rate, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn in_memory_filter_and_stats_agree_with_sql(pool: PgPool) {
        let ana = owner(&pool).await;
        let work = categories::repo::insert(&pool, ana, "Work", "#3B82F6", "")
            .await
            .unwrap();
        let now = OffsetDateTime::now_utc();

        let mut overdue = draft("Quarterly report", false, Priority::High);
        overdue.category_id = Some(work.id);
        overdue.due_date = Some(now - Duration::days(3));
        let mut future = draft("Groceries", false, Priority::Urgent);
        future.description = "weekly REPORT of spending".into();
        future.due_date = Some(now + Duration::days(3));
        let mut done = draft("Report archive", true, Priority::High);
        done.category_id = Some(work.id);
        done.due_date = Some(now - Duration::days(1));
        for d in [overdue, future, done, draft("Call mom", false, Priority::Low)] {
            services::create_task(&pool, ana, d).await.unwrap();
        }

        let everything = list_all(&pool, ana, &TaskFilter::default(), TaskSort::default())
            .await
            .unwrap();
        assert_eq!(everything.len(), 4);

        let filters = [
            TaskFilter {
                search: Some("report".into()),
                ..Default::default()
            },
            TaskFilter {
                status: StatusFilter::Pending,
                category: Some("Work".into()),
                ..Default::default()
            },
            TaskFilter {
                category: Some(NO_CATEGORY.into()),
                priority: Some(Priority::Urgent),
                ..Default::default()
            },
            TaskFilter {
                status: StatusFilter::Completed,
                ..Default::default()
            },
        ];
        for filter in &filters {
            let mut from_sql: Vec<Uuid> = list_all(&pool, ana, filter, TaskSort::default())
                .await
                .unwrap()
                .iter()
                .map(|t| t.id)
                .collect();
            let mut in_memory: Vec<Uuid> = everything
                .iter()
                .filter(|t| filter.matches(t))
                .map(|t| t.id)
                .collect();
            from_sql.sort();
            in_memory.sort();
            assert!(!from_sql.is_empty(), "{filter:?} matched nothing");
            assert_eq!(from_sql, in_memory, "{filter:?}");
        }

        let sql_stats = TaskStats::from_counts(stats_counts(&pool, ana).await.unwrap());
        assert_eq!(summarize(&everything, now), sql_stats);
        assert_eq!(sql_stats.overdue, 1);
        assert_eq!(sql_stats.high_priority, 1);
    }
}
