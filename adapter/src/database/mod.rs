use shared::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
};
use sqlx::{postgres::PgConnectOptions, PgPool, Postgres, Transaction};

pub mod model;

const UNIQUE_VIOLATION: &str = "23505";

fn make_pg_connect_options(cfg: &DatabaseConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.username)
        .password(&cfg.password)
        .database(&cfg.database)
}

#[derive(Clone)]
pub struct ConnectionPool(PgPool);

impl ConnectionPool {
    pub fn new(pool: PgPool) -> Self {
        Self(pool)
    }

    pub fn inner_ref(&self) -> &PgPool {
        &self.0
    }

    pub async fn begin(&self) -> AppResult<Transaction<'_, Postgres>> {
        self.0.begin().await.map_err(AppError::TransactionError)
    }
}

pub fn connect_database_with(cfg: &DatabaseConfig) -> ConnectionPool {
    ConnectionPool(PgPool::connect_lazy_with(make_pg_connect_options(cfg)))
}

// マイグレーションは起動時に一度だけ流す
pub async fn migrate(pool: &ConnectionPool) -> AppResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool.inner_ref())
        .await
        .map_err(|e| AppError::SpecificOperationError(e.into()))
}

/// Advisory-lock namespaces. Each check-then-write sequence that guards a
/// uniqueness invariant takes the lock for its dimension first.
#[derive(Debug, Clone, Copy)]
pub enum LockScope {
    SpaceSchedule,
    TransactionId,
}

impl LockScope {
    fn prefix(self) -> &'static str {
        match self {
            LockScope::SpaceSchedule => "space-schedule",
            LockScope::TransactionId => "transaction-id",
        }
    }
}

// トランザクション終了時に自動で解放される
pub async fn lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    scope: LockScope,
    key: &str,
) -> AppResult<()> {
    let lock_key = format!("{}:{}", scope.prefix(), key);
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(lock_key.clone())
        .execute(&mut **tx)
        .await
        .map_err(storage_error("advisory_lock", lock_key))?;
    Ok(())
}

// 失敗した操作名と対象の ID をログに残してから AppError に変換する
pub fn storage_error(
    op: &'static str,
    entity_id: impl std::fmt::Display,
) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!(op, entity_id = %entity_id, error = %e, "storage operation failed");
        AppError::SpecificOperationError(e)
    }
}

pub fn commit_error(
    op: &'static str,
    entity_id: impl std::fmt::Display,
) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!(op, entity_id = %entity_id, error = %e, "transaction commit failed");
        AppError::TransactionError(e)
    }
}

// 一意制約違反は競合として扱う
pub fn map_unique_violation(e: sqlx::Error, message: impl Into<String>) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            AppError::Conflict(message.into())
        }
        _ => AppError::SpecificOperationError(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_stay_internal() {
        let err = map_unique_violation(sqlx::Error::RowNotFound, "dup");
        assert!(matches!(err, AppError::SpecificOperationError(_)));
    }

    #[test]
    fn failures_keep_their_variant_after_logging() {
        let err = storage_error("confirm_payment", "b-1")(sqlx::Error::RowNotFound);
        assert!(matches!(
            err,
            AppError::SpecificOperationError(sqlx::Error::RowNotFound)
        ));
        let err = commit_error("create_booking", 42)(sqlx::Error::PoolTimedOut);
        assert!(matches!(
            err,
            AppError::TransactionError(sqlx::Error::PoolTimedOut)
        ));
    }
}
