//! PostgreSQL storage for WebAuthn credentials
//!
//! Credential ids are unique at the table level, so two concurrent
//! registrations of the same id cannot both succeed. The sign counter is only
//! written by a conditional `UPDATE`, giving the compare-and-swap that clone
//! detection relies on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use passkey_core::{
    encoding::{base64_url_encode, Base64UrlBytes},
    Credential, CredentialRecord, CredentialStore, StoreError,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// PostgreSQL-backed credential storage
pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    /// Connect with a pool of at most `max_connections`
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!(max_connections, "Connected to PostgreSQL database");
        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        tracing::info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Vec<Credential>, StoreError> {
        let rows = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, credential_type, public_key, sign_count,
                   username, user_id, display_name, created_at
            FROM webauthn_credentials
            WHERE username = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        rows.into_iter().map(CredentialRow::into_credential).collect()
    }

    async fn find_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<Credential>, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, credential_type, public_key, sign_count,
                   username, user_id, display_name, created_at
            FROM webauthn_credentials
            WHERE id = $1
            "#,
        )
        .bind(base64_url_encode(credential_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        row.map(CredentialRow::into_credential).transpose()
    }

    async fn insert(&self, credential: Credential) -> Result<(), StoreError> {
        let record = credential.to_record()?;

        let result = sqlx::query(
            r#"
            INSERT INTO webauthn_credentials
                (id, credential_type, public_key, sign_count,
                 username, user_id, display_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&record.id)
        .bind(&record.type_)
        .bind(record.public_key.as_slice())
        .bind(i64::from(record.sign_count))
        .bind(&record.username)
        .bind(record.user_id.as_slice())
        .bind(&record.display_name)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate);
        }

        tracing::debug!(credential_id = %record.id, "Credential stored in database");
        Ok(())
    }

    async fn update_sign_count(
        &self,
        credential_id: &[u8],
        expected: u32,
        new: u32,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE webauthn_credentials
            SET sign_count = $3, last_used_at = NOW()
            WHERE id = $1 AND sign_count = $2
            "#,
        )
        .bind(base64_url_encode(credential_id))
        .bind(i64::from(expected))
        .bind(i64::from(new))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }
}

/// Database row for credentials
#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: String,
    credential_type: String,
    public_key: Vec<u8>,
    sign_count: i64,
    username: String,
    user_id: Vec<u8>,
    display_name: String,
    created_at: DateTime<Utc>,
}

impl CredentialRow {
    fn into_credential(self) -> Result<Credential, StoreError> {
        let sign_count = u32::try_from(self.sign_count).map_err(|_| {
            StoreError::Serialization(format!("sign_count out of range: {}", self.sign_count))
        })?;

        Credential::try_from(CredentialRecord {
            id: self.id,
            type_: self.credential_type,
            public_key: Base64UrlBytes(self.public_key),
            sign_count,
            username: self.username,
            user_id: Base64UrlBytes(self.user_id),
            display_name: self.display_name,
            created_at: self.created_at,
        })
    }
}

impl std::fmt::Debug for PostgresCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresCredentialStore")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passkey_core::testing::SoftAuthenticator;

    fn row(sign_count: i64) -> CredentialRow {
        let key = SoftAuthenticator::es256().cose_key();
        CredentialRow {
            id: "AQID".to_string(),
            credential_type: "public-key".to_string(),
            public_key: passkey_core::serialize_public_key(&key).unwrap(),
            sign_count,
            username: "bob".to_string(),
            user_id: vec![9; 32],
            display_name: "bob".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_into_credential() {
        let credential = row(42).into_credential().unwrap();
        assert_eq!(credential.credential_id, vec![1, 2, 3]);
        assert_eq!(credential.sign_count, 42);
        assert_eq!(credential.owner_username, "bob");
        assert_eq!(credential.user_handle, vec![9; 32]);
    }

    #[test]
    fn test_row_rejects_negative_counter() {
        assert!(matches!(
            row(-1).into_credential(),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_row_rejects_garbage_key() {
        let mut bad = row(0);
        bad.public_key = vec![0xff, 0x00];
        assert!(bad.into_credential().is_err());
    }
}
