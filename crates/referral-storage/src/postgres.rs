use async_trait::async_trait;
use jiff::Timestamp;
use referral_core::error::Result;
use referral_core::{
    NewUser, ReferralCode, ReferralRecord, ReferralStore, Redemption, StoreError, User, UserStore,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::POSTGRES_SCHEMA;

/// Postgres implementation of the store contracts.
///
/// Uniqueness of referral codes is enforced by the primary key on
/// `referrals.code`; a rejected insert surfaces as [`StoreError::Conflict`].
/// Email uniqueness is enforced the same way by `users.email`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a store from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new connection pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        debug!(max_connections, "opened postgres pool");
        Ok(Self::new(pool))
    }

    /// Creates the tables if they are missing.
    pub async fn create_schema(&self) -> Result<()> {
        for ddl in POSTGRES_SCHEMA {
            sqlx::raw_sql(ddl)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        }
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();

    match err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(sqlstate) => classify_sqlstate(&sqlstate, message),
            None => StoreError::Query(message),
        },
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Protocol(_)
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}

/// Maps a Postgres SQLSTATE to a store error.
///
/// Class `08` (connection exception), class `53` (insufficient resources,
/// e.g. `53300` too many connections) and `57P*` (server shutting down or
/// still starting) mean the server cannot take the request right now.
/// `57014` is a statement cancelled by `statement_timeout`.
fn classify_sqlstate(sqlstate: &str, message: String) -> StoreError {
    match sqlstate {
        "57014" => StoreError::Timeout(message),
        s if s.starts_with("08") || s.starts_with("53") || s.starts_with("57P") => {
            StoreError::Unavailable(message)
        }
        _ => StoreError::Query(message),
    }
}

fn parse_created_at(millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis).map_err(|e| {
        StoreError::InvalidData(format!("invalid created_at timestamp '{}': {e}", millis))
    })
}

fn referral_from_row(row: &PgRow) -> Result<ReferralRecord> {
    let code: String = row.try_get("code").map_err(map_sqlx_error)?;
    let owner_user_id: String = row.try_get("owner_user_id").map_err(map_sqlx_error)?;
    let service_id: String = row.try_get("service_id").map_err(map_sqlx_error)?;
    let is_used: bool = row.try_get("is_used").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;

    Ok(ReferralRecord {
        code: ReferralCode::new_unchecked(code),
        owner_user_id,
        service_id,
        is_used,
        created_at: parse_created_at(created_at)?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        name: row.try_get("name").map_err(map_sqlx_error)?,
        email: row.try_get("email").map_err(map_sqlx_error)?,
        password_hash: row.try_get("password_hash").map_err(map_sqlx_error)?,
        points: row.try_get("points").map_err(map_sqlx_error)?,
    })
}

#[async_trait]
impl ReferralStore for PgStore {
    async fn exists(&self, code: &ReferralCode) -> Result<bool> {
        let exists = sqlx::query(
            r#"
            SELECT 1
            FROM referrals
            WHERE code = $1
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .is_some();

        Ok(exists)
    }

    async fn insert_if_absent(&self, record: &ReferralRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO referrals (code, owner_user_id, service_id, is_used, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.code.as_str())
        .bind(&record.owner_user_id)
        .bind(&record.service_id)
        .bind(record.is_used)
        .bind(record.created_at.as_millisecond())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::Conflict(record.code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn get(&self, code: &ReferralCode) -> Result<Option<ReferralRecord>> {
        let row = sqlx::query(
            r#"
            SELECT code, owner_user_id, service_id, is_used, created_at
            FROM referrals
            WHERE code = $1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(referral_from_row).transpose()
    }

    async fn redeem(&self, code: &ReferralCode) -> Result<Redemption> {
        // The `is_used = FALSE` guard makes the flip a compare-and-set: of
        // several concurrent updates only one matches the row.
        let row = sqlx::query(
            r#"
            UPDATE referrals
            SET is_used = TRUE
            WHERE code = $1
              AND is_used = FALSE
            RETURNING code, owner_user_id, service_id, is_used, created_at
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if let Some(row) = row {
            return Ok(Redemption::Redeemed(referral_from_row(&row)?));
        }

        if self.exists(code).await? {
            Ok(Redemption::AlreadyUsed)
        } else {
            Ok(Redemption::NotFound)
        }
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let id = Uuid::new_v4().to_string();

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, points)
            VALUES ($1, $2, $3, $4, 0)
            "#,
        )
        .bind(&id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(User {
                id,
                name: user.name,
                email: user.email,
                password_hash: user.password_hash,
                points: 0,
            }),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict(user.email)),
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, points
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, points
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn add_points(&self, id: &str, delta: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET points = points + $1
            WHERE id = $2
            "#,
        )
        .bind(delta)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
