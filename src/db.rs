use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Statement,
};
use tracing::{info, warn};

pub type DbPool = DatabaseConnection;

/// Establish the connection pool. SQLite is used by the test harness;
/// production runs against Postgres.
pub async fn establish_connection(database_url: &str) -> Result<DbPool, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_string());
    opt.max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(false);

    let pool = Database::connect(opt).await?;
    info!("database connection pool established");
    Ok(pool)
}

/// Run pending schema migrations (used on startup when `auto_migrate` is set
/// and by the test harness).
pub async fn run_migrations(db: &DbPool) -> Result<(), DbErr> {
    use migrations::{Migrator, MigratorTrait};
    Migrator::up(db, None).await
}

/// Cheap liveness probe used by the readiness endpoint.
pub async fn check_connection(db: &DbPool) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    db.execute(Statement::from_string(backend, "SELECT 1".to_string()))
        .await
        .map(|_| ())
}

// Namespace for per-date plan locks, so they cannot collide with other
// advisory lock users on the same cluster.
const PLAN_LOCK_NAMESPACE: i64 = 0x7052_4C4E << 16;

/// Serialize concurrent plan runs for the same date. On Postgres this takes a
/// transaction-scoped advisory lock keyed by the date; released at commit or
/// rollback. Other backends fall through to the unique `(staff, date)`
/// constraint on purchase lists.
pub async fn acquire_plan_lock<C: ConnectionTrait>(conn: &C, date: NaiveDate) -> Result<(), DbErr> {
    let backend = conn.get_database_backend();
    if backend != DbBackend::Postgres {
        return Ok(());
    }

    let key = PLAN_LOCK_NAMESPACE | i64::from(date.num_days_from_ce());
    let sql = format!("SELECT pg_advisory_xact_lock({key})");
    if let Err(e) = conn.execute(Statement::from_string(backend, sql)).await {
        warn!(error = %e, %date, "failed to acquire plan advisory lock");
        return Err(e);
    }
    Ok(())
}
