use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{Category, CategoryStatRow};
use crate::tasks::repo_types::NO_CATEGORY;

const CATEGORY_COLUMNS: &str =
    "id, owner_id, name, color, description, is_default, task_count, created_at, updated_at";

pub async fn list_by_owner(db: &PgPool, owner_id: Uuid) -> anyhow::Result<Vec<Category>> {
    let sql = format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE owner_id = $1 ORDER BY created_at DESC"
    );
    let rows = sqlx::query_as::<_, Category>(&sql)
        .bind(owner_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn find_owned(db: &PgPool, owner_id: Uuid, id: Uuid) -> anyhow::Result<Option<Category>> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1 AND owner_id = $2");
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

/// Exact, case-sensitive name match among the owner's categories, ignoring `except`.
pub async fn name_taken(
    db: &PgPool,
    owner_id: Uuid,
    name: &str,
    except: Option<Uuid>,
) -> anyhow::Result<bool> {
    let taken = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM categories
             WHERE owner_id = $1 AND name = $2 AND ($3::uuid IS NULL OR id <> $3)
        )
        "#,
    )
    .bind(owner_id)
    .bind(name)
    .bind(except)
    .fetch_one(db)
    .await?;
    Ok(taken)
}

pub async fn insert(
    db: &PgPool,
    owner_id: Uuid,
    name: &str,
    color: &str,
    description: &str,
) -> anyhow::Result<Category> {
    let sql = format!(
        r#"
        INSERT INTO categories (owner_id, name, color, description)
        VALUES ($1, $2, $3, $4)
        RETURNING {CATEGORY_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(owner_id)
        .bind(name)
        .bind(color)
        .bind(description)
        .fetch_one(db)
        .await?;
    Ok(row)
}

/// Tasks read the category name through a join, so a rename needs no cascade.
pub async fn update(db: &PgPool, category: &Category) -> anyhow::Result<Category> {
    let sql = format!(
        r#"
        UPDATE categories
           SET name = $3, color = $4, description = $5, updated_at = now()
         WHERE id = $1 AND owner_id = $2
        RETURNING {CATEGORY_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(category.id)
        .bind(category.owner_id)
        .bind(&category.name)
        .bind(&category.color)
        .bind(&category.description)
        .fetch_one(db)
        .await?;
    Ok(row)
}

/// Deletes the category; the FK resets `tasks.category_id` to NULL in the same statement.
pub async fn delete(db: &PgPool, owner_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM categories WHERE id = $1 AND owner_id = $2")
        .bind(id)
        .bind(owner_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// Shifts the stored task counter, never below zero.
pub async fn adjust_task_count_tx(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: Uuid,
    id: Uuid,
    delta: i32,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE categories
           SET task_count = GREATEST(task_count + $3, 0)
         WHERE id = $1 AND owner_id = $2
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .bind(delta)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn stats_by_owner(db: &PgPool, owner_id: Uuid) -> anyhow::Result<Vec<CategoryStatRow>> {
    let rows = sqlx::query_as::<_, CategoryStatRow>(
        r#"
        SELECT COALESCE(c.name, $2) AS category_name,
               COUNT(*) AS total,
               COUNT(*) FILTER (WHERE t.completed) AS completed
          FROM tasks t
          LEFT JOIN categories c ON c.id = t.category_id
         WHERE t.owner_id = $1
         GROUP BY 1
         ORDER BY total DESC, category_name ASC
        "#,
    )
    .bind(owner_id)
    .bind(NO_CATEGORY)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::User;
    use crate::tasks::{repo as tasks_repo, repo_types::TaskDraft, services};

    async fn user(db: &PgPool, email: &str) -> Uuid {
        User::create(db, "Owner", email, "$argon2id$v=19$x")
            .await
            .unwrap()
            .id
    }

    fn draft(title: &str, category_id: Uuid) -> TaskDraft {
        TaskDraft {
            title: title.into(),
            category_id: Some(category_id),
            ..Default::default()
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn rename_shows_on_owner_tasks_only(pool: PgPool) {
        let ana = user(&pool, "ana@example.com").await;
        let bo = user(&pool, "bo@example.com").await;
        let mut work = insert(&pool, ana, "Work", "#3B82F6", "").await.unwrap();
        let bo_work = insert(&pool, bo, "Work", "#10B981", "").await.unwrap();
        let ana_task = services::create_task(&pool, ana, draft("Report", work.id))
            .await
            .unwrap();
        let bo_task = services::create_task(&pool, bo, draft("Invoice", bo_work.id))
            .await
            .unwrap();

        work.name = "Office".into();
        let renamed = update(&pool, &work).await.unwrap();
        assert_eq!(renamed.name, "Office");
        assert_eq!(renamed.task_count, 1);

        let ana_task = tasks_repo::find_owned(&pool, ana, ana_task.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ana_task.category_name, "Office");
        let bo_task = tasks_repo::find_owned(&pool, bo, bo_task.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bo_task.category_name, "Work");
        assert!(name_taken(&pool, bo, "Work", None).await.unwrap());
        assert!(!name_taken(&pool, ana, "Work", None).await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn delete_moves_tasks_to_no_category(pool: PgPool) {
        let ana = user(&pool, "ana@example.com").await;
        let work = insert(&pool, ana, "Work", "#3B82F6", "").await.unwrap();
        let task = services::create_task(&pool, ana, draft("Report", work.id))
            .await
            .unwrap();

        assert!(delete(&pool, ana, work.id).await.unwrap());
        assert!(!delete(&pool, ana, work.id).await.unwrap());

        let task = tasks_repo::find_owned(&pool, ana, task.id)
            .await
            .unwrap()
            .expect("task survives its category");
        assert!(task.category.is_none());
        assert_eq!(task.category_name, NO_CATEGORY);

        let stats = stats_by_owner(&pool, ana).await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].category_name, NO_CATEGORY);
    }
}
