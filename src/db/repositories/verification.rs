use anyhow::{Context, Result};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::constants::codes;
use crate::db::{now_millis, now_rfc3339};
use crate::entities::verification_codes;

/// What a code unlocks. Codes for one purpose never satisfy the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePurpose {
    Login,
    ResetPassword,
}

impl CodePurpose {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::ResetPassword => "reset_password",
        }
    }
}

pub struct VerificationCodeRepository {
    conn: DatabaseConnection,
}

impl VerificationCodeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Stores a fresh 6-digit code with the standard TTL and returns it
    /// together with the TTL in seconds.
    pub async fn issue(&self, username: &str, purpose: CodePurpose) -> Result<(String, u64)> {
        let code = generate_code();
        let ttl = codes::TTL;
        let expires_at = now_millis() + i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);

        let model = verification_codes::ActiveModel {
            username: Set(username.to_string()),
            code: Set(code.clone()),
            purpose: Set(purpose.as_str().to_string()),
            expires_at: Set(expires_at),
            created_at: Set(now_rfc3339()),
            ..Default::default()
        };

        model
            .insert(&self.conn)
            .await
            .context("Failed to store verification code")?;

        Ok((code, ttl.as_secs()))
    }

    /// Single-use verification: succeeds only for a matching record whose
    /// expiry is still in the future by wall clock, and deletes it before
    /// reporting success. Expired rows never verify, whether or not the
    /// sweep got to them first.
    pub async fn verify_and_consume(
        &self,
        username: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> Result<bool> {
        let record = verification_codes::Entity::find()
            .filter(verification_codes::Column::Username.eq(username))
            .filter(verification_codes::Column::Code.eq(code))
            .filter(verification_codes::Column::Purpose.eq(purpose.as_str()))
            .filter(verification_codes::Column::ExpiresAt.gt(now_millis()))
            .one(&self.conn)
            .await
            .context("Failed to query verification code")?;

        let Some(record) = record else {
            return Ok(false);
        };

        verification_codes::Entity::delete_by_id(record.id)
            .exec(&self.conn)
            .await
            .context("Failed to consume verification code")?;

        Ok(true)
    }

    /// TTL sweep. Purely storage reclamation; verification correctness does
    /// not depend on it.
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = verification_codes::Entity::delete_many()
            .filter(verification_codes::Column::ExpiresAt.lte(now_millis()))
            .exec(&self.conn)
            .await
            .context("Failed to purge expired verification codes")?;

        Ok(result.rows_affected)
    }
}

/// Uniformly random 6-digit code.
#[must_use]
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    format!("{:06}", rng.random_range(0..1_000_000u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_purpose_round_trip() {
        assert_eq!(CodePurpose::Login.as_str(), "login");
        assert_eq!(CodePurpose::ResetPassword.as_str(), "reset_password");
    }
}
