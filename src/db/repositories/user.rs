use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::db::now_rfc3339;
use crate::entities::users;

/// Fields for account creation. The password arrives in the clear and is
/// hashed exactly once, inside [`UserRepository::create`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub level: i32,
    pub total_count: i64,
    pub expire_time: i64,
    pub is_admin: bool,
}

/// Partial update for admin edits and password changes. Every field is
/// optional; a present `password` is the only thing that triggers re-hashing.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub level: Option<i32>,
    pub total_count: Option<i64>,
    pub expire_time: Option<i64>,
    pub credits: Option<i64>,
    pub is_admin: Option<bool>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by id")
    }

    /// Resolves a login identifier against the username or the (lowercased)
    /// email address.
    pub async fn get_by_identifier(&self, identifier: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Username.eq(identifier))
                    .add(users::Column::Email.eq(identifier.to_lowercase())),
            )
            .one(&self.conn)
            .await
            .context("Failed to query user by identifier")
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email.to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")
    }

    /// Returns whichever existing user collides with the given username or
    /// email, if any.
    pub async fn get_conflicting(&self, username: &str, email: &str) -> Result<Option<users::Model>> {
        users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Username.eq(username))
                    .add(users::Column::Email.eq(email.to_lowercase())),
            )
            .one(&self.conn)
            .await
            .context("Failed to query for conflicting user")
    }

    pub async fn has_admin(&self) -> Result<bool> {
        let count = users::Entity::find()
            .filter(users::Column::IsAdmin.eq(true))
            .count(&self.conn)
            .await
            .context("Failed to count admin users")?;

        Ok(count > 0)
    }

    pub async fn create(&self, new_user: NewUser, config: &SecurityConfig) -> Result<users::Model> {
        let password = new_user.password;
        let config_clone = config.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, &config_clone))
            .await
            .context("Password hashing task panicked")??;

        let now = now_rfc3339();
        let model = users::ActiveModel {
            username: Set(new_user.username),
            email: Set(new_user.email.to_lowercase()),
            password_hash: Set(password_hash),
            level: Set(new_user.level),
            total_count: Set(new_user.total_count),
            used_count: Set(0),
            expire_time: Set(new_user.expire_time),
            credits: Set(0),
            usage: Set(serde_json::json!({})),
            is_admin: Set(new_user.is_admin),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        model
            .insert(&self.conn)
            .await
            .context("Failed to insert user")
    }

    /// Applies a partial update. Hashing happens here and only here: a
    /// present password is hashed, everything else is written through as-is.
    pub async fn update(
        &self,
        id: i32,
        changes: UserChanges,
        config: &SecurityConfig,
    ) -> Result<Option<users::Model>> {
        let Some(user) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = user.into();

        if let Some(username) = changes.username {
            active.username = Set(username);
        }
        if let Some(email) = changes.email {
            active.email = Set(email.to_lowercase());
        }
        if let Some(password) = changes.password {
            let config_clone = config.clone();
            let hash = task::spawn_blocking(move || hash_password(&password, &config_clone))
                .await
                .context("Password hashing task panicked")??;
            active.password_hash = Set(hash);
        }
        if let Some(level) = changes.level {
            active.level = Set(level);
        }
        if let Some(total_count) = changes.total_count {
            active.total_count = Set(total_count);
        }
        if let Some(expire_time) = changes.expire_time {
            active.expire_time = Set(expire_time);
        }
        if let Some(credits) = changes.credits {
            active.credits = Set(credits);
        }
        if let Some(is_admin) = changes.is_admin {
            active.is_admin = Set(is_admin);
        }

        active.updated_at = Set(now_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update user")?;

        Ok(Some(updated))
    }

    /// Verify a password against a stored hash.
    /// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
    /// and would block the async runtime if run directly.
    pub async fn verify_password(&self, stored_hash: &str, password: &str) -> Result<bool> {
        let stored_hash = stored_hash.to_string();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&stored_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            Ok::<bool, anyhow::Error>(
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid)
    }

    /// Adds `delta` to one model-tier counter and to the cumulative
    /// `used_count`, initializing absent tiers to zero. Persists the whole
    /// user document and returns the updated usage map.
    pub async fn increment_usage(
        &self,
        user: users::Model,
        model_type: &str,
        delta: i64,
    ) -> Result<users::Model> {
        let mut usage = user.usage.clone();

        if !usage.is_object() {
            usage = serde_json::json!({});
        }
        let map = usage
            .as_object_mut()
            .context("Usage document is not an object")?;

        let current = map
            .get(model_type)
            .and_then(|entry| entry.get("numRequests"))
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(0);

        map.insert(
            model_type.to_string(),
            serde_json::json!({ "numRequests": current + delta }),
        );

        let used_count = user.used_count + delta;

        let mut active: users::ActiveModel = user.into();
        active.usage = Set(usage);
        active.used_count = Set(used_count);
        active.updated_at = Set(now_rfc3339());

        active
            .update(&self.conn)
            .await
            .context("Failed to persist usage update")
    }

    /// Paginated listing for the admin surface, newest first, with
    /// case-insensitive substring search over username and email.
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
        search: &str,
    ) -> Result<(Vec<users::Model>, u64)> {
        let mut query = users::Entity::find();

        if !search.is_empty() {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(users::Column::Username.like(pattern.clone()))
                    .add(users::Column::Email.like(pattern)),
            );
        }

        let total = query
            .clone()
            .count(&self.conn)
            .await
            .context("Failed to count users")?;

        let page = page.max(1);
        let users = query
            .order_by_desc(users::Column::CreatedAt)
            .offset((page - 1) * limit)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok((users, total))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = users::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected > 0)
    }
}

/// Hash a password using Argon2id with the configured params.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Reads one tier's request counter out of a usage document.
#[must_use]
pub fn usage_requests(usage: &serde_json::Value, model_type: &str) -> i64 {
    usage
        .get(model_type)
        .and_then(|entry| entry.get("numRequests"))
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_requests_missing_tier() {
        let usage = serde_json::json!({});
        assert_eq!(usage_requests(&usage, "gpt-4"), 0);
    }

    #[test]
    fn test_usage_requests_present_tier() {
        let usage = serde_json::json!({ "gpt-4": { "numRequests": 7 } });
        assert_eq!(usage_requests(&usage, "gpt-4"), 7);
        assert_eq!(usage_requests(&usage, "gpt-3.5-turbo"), 0);
    }
}
