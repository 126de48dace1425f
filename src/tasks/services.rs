//! Task writes that touch more than one row.
//!
//! Category counters are adjusted inside the same transaction as the task
//! write that changes them.

use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    filter::{SortField, TaskFilter, TaskSort},
    repo,
    repo_types::{ShareEntry, Task, TaskDraft, TaskPatch},
};
use crate::{
    categories,
    error::{AppError, AppResult},
    users,
};

pub(crate) fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

/// The category must exist and belong to the caller.
async fn ensure_category(db: &PgPool, owner_id: Uuid, category_id: Option<Uuid>) -> AppResult<()> {
    let Some(id) = category_id else {
        return Ok(());
    };
    if categories::repo::find_owned(db, owner_id, id).await?.is_none() {
        debug!(%owner_id, category_id = %id, "category not owned by caller");
        return Err(AppError::validation("category", "Category not found"));
    }
    Ok(())
}

/// Links share entries to active accounts with the same email. Unknown emails stay unlinked.
async fn link_share_users(db: &PgPool, shares: &mut [ShareEntry]) -> AppResult<()> {
    if shares.is_empty() {
        return Ok(());
    }
    let emails: Vec<String> = shares.iter().map(|s| s.email.clone()).collect();
    let known = users::repo::find_active_ids_by_emails(db, &emails).await?;
    for share in shares.iter_mut() {
        share.user = known
            .iter()
            .find(|(_, email)| *email == share.email)
            .map(|(id, _)| *id);
    }
    Ok(())
}

pub async fn create_task(db: &PgPool, owner_id: Uuid, mut draft: TaskDraft) -> AppResult<Task> {
    ensure_category(db, owner_id, draft.category_id).await?;
    link_share_users(db, &mut draft.shared_with).await?;

    let mut tx = db.begin().await?;
    let task = repo::insert_tx(&mut tx, owner_id, &draft).await?;
    if let Some(category_id) = draft.category_id {
        categories::repo::adjust_task_count_tx(&mut tx, owner_id, category_id, 1).await?;
    }
    tx.commit().await?;

    info!(%owner_id, task_id = %task.id, "task created");
    Ok(task)
}

pub async fn update_task(
    db: &PgPool,
    owner_id: Uuid,
    id: Uuid,
    mut patch: TaskPatch,
    now: OffsetDateTime,
) -> AppResult<Task> {
    if let Some(category_id) = patch.category_id {
        ensure_category(db, owner_id, category_id).await?;
    }
    if let Some(shares) = patch.shared_with.as_mut() {
        link_share_users(db, shares).await?;
    }

    let mut tx = db.begin().await?;
    let existing = repo::find_owned_for_update_tx(&mut tx, owner_id, id)
        .await?
        .ok_or_else(task_not_found)?;
    let mut draft = TaskDraft::from(&existing);
    let old_category = draft.category_id;
    draft.apply(patch, now);

    let task = repo::update_tx(&mut tx, owner_id, id, &draft)
        .await?
        .ok_or_else(task_not_found)?;
    if old_category != draft.category_id {
        if let Some(old) = old_category {
            categories::repo::adjust_task_count_tx(&mut tx, owner_id, old, -1).await?;
        }
        if let Some(new) = draft.category_id {
            categories::repo::adjust_task_count_tx(&mut tx, owner_id, new, 1).await?;
        }
    }
    tx.commit().await?;

    info!(%owner_id, task_id = %id, "task updated");
    Ok(task)
}

pub async fn toggle_task(
    db: &PgPool,
    owner_id: Uuid,
    id: Uuid,
    now: OffsetDateTime,
) -> AppResult<Task> {
    let mut tx = db.begin().await?;
    let existing = repo::find_owned_for_update_tx(&mut tx, owner_id, id)
        .await?
        .ok_or_else(task_not_found)?;
    let mut draft = TaskDraft::from(&existing);
    draft.set_completed(!existing.completed, now);

    let task = repo::update_tx(&mut tx, owner_id, id, &draft)
        .await?
        .ok_or_else(task_not_found)?;
    tx.commit().await?;

    info!(%owner_id, task_id = %id, completed = task.completed, "task toggled");
    Ok(task)
}

/// The counter of the task's category drops exactly once, even under concurrent deletes.
pub async fn delete_task(db: &PgPool, owner_id: Uuid, id: Uuid) -> AppResult<()> {
    let mut tx = db.begin().await?;
    let existing = repo::find_owned_for_update_tx(&mut tx, owner_id, id)
        .await?
        .ok_or_else(task_not_found)?;
    if !repo::delete_tx(&mut tx, owner_id, id).await? {
        return Err(task_not_found());
    }
    if let Some(category) = existing.category.as_ref() {
        categories::repo::adjust_task_count_tx(&mut tx, owner_id, category.id, -1).await?;
    }
    tx.commit().await?;

    info!(%owner_id, task_id = %id, "task deleted");
    Ok(())
}

/// Moves one task to `position` in the manual order and renumbers the rest.
pub async fn reorder_task(
    db: &PgPool,
    owner_id: Uuid,
    task_id: Uuid,
    position: usize,
) -> AppResult<Vec<Task>> {
    let mut tx = db.begin().await?;
    let mut ids = repo::ids_in_manual_order_tx(&mut tx, owner_id).await?;
    let from = ids
        .iter()
        .position(|id| *id == task_id)
        .ok_or_else(task_not_found)?;
    move_item(&mut ids, from, position);
    repo::set_manual_order_tx(&mut tx, owner_id, &ids).await?;
    tx.commit().await?;

    info!(%owner_id, %task_id, from, to = position, "task reordered");
    let manual = TaskSort {
        field: SortField::Manual,
        ..Default::default()
    };
    Ok(repo::list_all(db, owner_id, &TaskFilter::default(), manual).await?)
}

/// Removes the item at `from` and reinserts it at `to`, clamped to the end.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from >= items.len() {
        return;
    }
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::User;

    #[test]
    fn move_forward_and_back() {
        let mut v = vec!['a', 'b', 'c', 'd'];
        move_item(&mut v, 0, 2);
        assert_eq!(v, vec!['b', 'c', 'a', 'd']);
        move_item(&mut v, 3, 0);
        assert_eq!(v, vec!['d', 'b', 'c', 'a']);
    }

    #[test]
    fn move_clamps_to_end() {
        let mut v = vec![1, 2, 3];
        move_item(&mut v, 0, 99);
        assert_eq!(v, vec![2, 3, 1]);
    }

    #[test]
    fn move_same_position_is_noop() {
        let mut v = vec![1, 2, 3];
        move_item(&mut v, 1, 1);
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn move_out_of_range_source_is_ignored() {
        let mut v = vec![1, 2];
        move_item(&mut v, 5, 0);
        assert_eq!(v, vec![1, 2]);
    }

    async fn owner_with_category(db: &PgPool) -> (Uuid, Uuid) {
        let owner = User::create(db, "Ana", "ana@example.com", "$argon2id$x")
            .await
            .unwrap()
            .id;
        let work = categories::repo::insert(db, owner, "Work", "#3B82F6", "")
            .await
            .unwrap();
        (owner, work.id)
    }

    fn in_category(title: &str, category_id: Uuid) -> TaskDraft {
        TaskDraft {
            title: title.into(),
            category_id: Some(category_id),
            ..Default::default()
        }
    }

    async fn task_count(db: &PgPool, owner: Uuid, category_id: Uuid) -> i32 {
        categories::repo::find_owned(db, owner, category_id)
            .await
            .unwrap()
            .unwrap()
            .task_count
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn concurrent_deletes_decrement_counter_once(pool: PgPool) {
        let (owner, work) = owner_with_category(&pool).await;
        let doomed = create_task(&pool, owner, in_category("Report", work))
            .await
            .unwrap();
        create_task(&pool, owner, in_category("Invoice", work))
            .await
            .unwrap();
        assert_eq!(task_count(&pool, owner, work).await, 2);

        let (a, b) = tokio::join!(
            delete_task(&pool, owner, doomed.id),
            delete_task(&pool, owner, doomed.id)
        );
        assert_eq!([&a, &b].iter().filter(|r| r.is_ok()).count(), 1);
        assert!([a, b]
            .into_iter()
            .any(|r| matches!(r, Err(AppError::NotFound(_)))));
        assert_eq!(task_count(&pool, owner, work).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn writes_to_a_deleted_task_are_not_found(pool: PgPool) {
        let (owner, work) = owner_with_category(&pool).await;
        let task = create_task(&pool, owner, in_category("Report", work))
            .await
            .unwrap();
        delete_task(&pool, owner, task.id).await.unwrap();

        let now = OffsetDateTime::now_utc();
        let patch = TaskPatch {
            category_id: Some(None),
            ..Default::default()
        };
        let err = update_task(&pool, owner, task.id, patch, now).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = toggle_task(&pool, owner, task.id, now).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = delete_task(&pool, owner, task.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(task_count(&pool, owner, work).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn moving_a_task_shifts_both_counters(pool: PgPool) {
        let (owner, work) = owner_with_category(&pool).await;
        let home = categories::repo::insert(&pool, owner, "Home", "#10B981", "")
            .await
            .unwrap()
            .id;
        let task = create_task(&pool, owner, in_category("Report", work))
            .await
            .unwrap();

        let patch = TaskPatch {
            category_id: Some(Some(home)),
            ..Default::default()
        };
        let moved = update_task(&pool, owner, task.id, patch, OffsetDateTime::now_utc())
            .await
            .unwrap();
        assert_eq!(moved.category_name, "Home");
        assert_eq!(task_count(&pool, owner, work).await, 0);
        assert_eq!(task_count(&pool, owner, home).await, 1);
    }
}
