use axum::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;

/// Repository seam for users and their bearer tokens. The auth services
/// depend on this trait only; `PgAuthStore` is the production impl and the
/// tests run against an in-memory fake.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn create_user(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User>;
    /// Returns false when the user was already verified (or absent), so the
    /// null -> timestamp transition happens at most once even under races.
    async fn set_email_verified(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<bool>;
    async fn create_token(&self, user_id: Uuid, token: &str) -> anyhow::Result<()>;
    /// Deletes every token of the user and inserts the new one, atomically.
    async fn replace_tokens(&self, user_id: Uuid, token: &str) -> anyhow::Result<()>;
    async fn delete_tokens_for_user(&self, user_id: Uuid) -> anyhow::Result<u64>;
    async fn user_id_for_token(&self, token: &str) -> anyhow::Result<Option<Uuid>>;
}

#[derive(Clone)]
pub struct PgAuthStore {
    pool: PgPool,
}

impl PgAuthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthStore for PgAuthStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, email_verified_at, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, email_verified_at, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, email_verified_at, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_email_verified(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verified_at = $2
            WHERE id = $1 AND email_verified_at IS NULL
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn create_token(&self, user_id: Uuid, token: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO access_tokens (user_id, token)
            VALUES ($1, $2)
            "#,
        )
        .bind(user_id)
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn replace_tokens(&self, user_id: Uuid, token: &str) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM access_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO access_tokens (user_id, token) VALUES ($1, $2)")
            .bind(user_id)
            .bind(token)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_tokens_for_user(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn user_id_for_token(&self, token: &str) -> anyhow::Result<Option<Uuid>> {
        let user_id =
            sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM access_tokens WHERE token = $1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user_id)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::Mutex;

    use super::*;

    /// In-memory AuthStore used by the service and extractor tests.
    #[derive(Default)]
    pub struct MemoryAuthStore {
        users: Mutex<Vec<User>>,
        tokens: Mutex<Vec<(String, Uuid)>>,
    }

    impl MemoryAuthStore {
        pub fn tokens_for(&self, user_id: Uuid) -> Vec<String> {
            self.tokens
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, uid)| *uid == user_id)
                .map(|(t, _)| t.clone())
                .collect()
        }
    }

    #[async_trait]
    impl AuthStore for MemoryAuthStore {
        async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.id == id)
                .cloned())
        }

        async fn create_user(
            &self,
            id: Uuid,
            name: &str,
            email: &str,
            password_hash: &str,
        ) -> anyhow::Result<User> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| u.email == email) {
                anyhow::bail!("duplicate key value violates unique constraint \"users_email_key\"");
            }
            let user = User {
                id,
                name: name.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                email_verified_at: None,
                created_at: OffsetDateTime::now_utc(),
            };
            users.push(user.clone());
            Ok(user)
        }

        async fn set_email_verified(
            &self,
            id: Uuid,
            at: OffsetDateTime,
        ) -> anyhow::Result<bool> {
            let mut users = self.users.lock().unwrap();
            match users
                .iter_mut()
                .find(|u| u.id == id && u.email_verified_at.is_none())
            {
                Some(user) => {
                    user.email_verified_at = Some(at);
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn create_token(&self, user_id: Uuid, token: &str) -> anyhow::Result<()> {
            self.tokens
                .lock()
                .unwrap()
                .push((token.to_string(), user_id));
            Ok(())
        }

        async fn replace_tokens(&self, user_id: Uuid, token: &str) -> anyhow::Result<()> {
            let mut tokens = self.tokens.lock().unwrap();
            tokens.retain(|(_, uid)| *uid != user_id);
            tokens.push((token.to_string(), user_id));
            Ok(())
        }

        async fn delete_tokens_for_user(&self, user_id: Uuid) -> anyhow::Result<u64> {
            let mut tokens = self.tokens.lock().unwrap();
            let before = tokens.len();
            tokens.retain(|(_, uid)| *uid != user_id);
            Ok((before - tokens.len()) as u64)
        }

        async fn user_id_for_token(&self, token: &str) -> anyhow::Result<Option<Uuid>> {
            Ok(self
                .tokens
                .lock()
                .unwrap()
                .iter()
                .find(|(t, _)| t == token)
                .map(|(_, uid)| *uid))
        }
    }
}
