use sqlx::PgPool;
use uuid::Uuid;

use super::dto::PublicUser;
use crate::db::like_pattern;

const SEARCH_LIMIT: i64 = 10;

/// Active users other than `caller` whose name or email contains `term`.
pub async fn search(db: &PgPool, caller: Uuid, term: &str) -> anyhow::Result<Vec<PublicUser>> {
    let users = sqlx::query_as::<_, PublicUser>(
        r#"
        SELECT id, name, email, avatar
          FROM users
         WHERE id <> $1
           AND is_active
           AND (name ILIKE $2 OR email ILIKE $2)
         ORDER BY name ASC
         LIMIT $3
        "#,
    )
    .bind(caller)
    .bind(like_pattern(term))
    .bind(SEARCH_LIMIT)
    .fetch_all(db)
    .await?;
    Ok(users)
}

pub async fn find_active_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<PublicUser>> {
    let user = sqlx::query_as::<_, PublicUser>(
        "SELECT id, name, email, avatar FROM users WHERE email = $1 AND is_active",
    )
    .bind(email.trim().to_lowercase())
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// `(id, email)` of active accounts among `emails` (expected lowercase).
pub async fn find_active_ids_by_emails(
    db: &PgPool,
    emails: &[String],
) -> anyhow::Result<Vec<(Uuid, String)>> {
    let rows = sqlx::query_as::<_, (Uuid, String)>(
        "SELECT id, email FROM users WHERE email = ANY($1) AND is_active",
    )
    .bind(emails)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::User;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn search_skips_caller_and_caps_results(pool: PgPool) {
        let caller = User::create(&pool, "Ana Caller", "ana@example.com", "$argon2id$x")
            .await
            .unwrap();
        for i in 0..12 {
            let email = format!("ana{i:02}@example.com");
            User::create(&pool, &format!("Ana {i:02}"), &email, "$argon2id$x")
                .await
                .unwrap();
        }

        let hits = search(&pool, caller.id, "ana").await.unwrap();
        assert_eq!(hits.len(), 10);
        assert!(hits.iter().all(|u| u.id != caller.id));
        assert_eq!(hits[0].name, "Ana 00");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn inactive_accounts_are_hidden(pool: PgPool) {
        let caller = User::create(&pool, "Caller", "caller@example.com", "$argon2id$x")
            .await
            .unwrap();
        let gone = User::create(&pool, "Bo Gone", "bo@example.com", "$argon2id$x")
            .await
            .unwrap();
        sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
            .bind(gone.id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(search(&pool, caller.id, "bo").await.unwrap().is_empty());
        assert!(find_active_by_email(&pool, "BO@example.com").await.unwrap().is_none());
        let known = find_active_ids_by_emails(&pool, &["caller@example.com".into()])
            .await
            .unwrap();
        assert_eq!(known, vec![(caller.id, "caller@example.com".to_string())]);
    }
}
