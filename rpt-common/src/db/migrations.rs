//! Database schema migrations
//!
//! One canonical schema, advanced by numbered forward migrations recorded in
//! `schema_version`. Each migration runs inside its own transaction together
//! with its version row, so a failed step leaves the previous version intact.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field already ran them
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Use ALTER TABLE** - prefer it over DROP/CREATE to preserve data

use crate::Result;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 3;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(conn: &mut SqliteConnection, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(conn)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Run all pending migrations (safe to call on every startup)
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Proceeding with caution.");
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        let mut tx = pool.begin().await?;
        migrate_v1(&mut tx).await?;
        set_schema_version(&mut tx, 1).await?;
        tx.commit().await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        let mut tx = pool.begin().await?;
        migrate_v2(&mut tx).await?;
        set_schema_version(&mut tx, 2).await?;
        tx.commit().await?;
        info!("✓ Migration v2 completed");
    }

    if current_version < 3 {
        let mut tx = pool.begin().await?;
        migrate_v3(&mut tx).await?;
        set_schema_version(&mut tx, 3).await?;
        tx.commit().await?;
        info!("✓ Migration v3 completed");
    }

    info!("All migrations completed successfully");
    Ok(())
}

/// Migration v1: reference lists and problem tag header/line tables
async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
    info!("Running migration v1: customers, employees, problem tags");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_name TEXT NOT NULL UNIQUE CHECK (length(trim(customer_name)) > 0),
            date_added TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS employees (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            employee_name TEXT NOT NULL UNIQUE CHECK (length(trim(employee_name)) > 0),
            date_added TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS receiving_problem_tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date_entered TEXT NOT NULL,
            date_found DATE NOT NULL,
            po_number TEXT NOT NULL,
            customer_id INTEGER NOT NULL REFERENCES customers(id),
            job_name TEXT NOT NULL,
            team_name TEXT NOT NULL,
            author_name TEXT NOT NULL,
            problem_type TEXT NOT NULL,
            mistake_employee_id INTEGER NULL REFERENCES employees(id),
            notes TEXT NOT NULL DEFAULT '',
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS receiving_problem_lines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id INTEGER NOT NULL REFERENCES receiving_problem_tags(id) ON DELETE CASCADE,
            short_heavy_tag TEXT NOT NULL DEFAULT ''
                CHECK (short_heavy_tag IN ('', 'Short', 'Heavy', 'Short/Heavy')),
            style_number TEXT NOT NULL,
            item_description TEXT NOT NULL,
            color TEXT NOT NULL,
            size TEXT NOT NULL,
            packing_slip_match TEXT NOT NULL DEFAULT 'Unknown'
                CHECK (packing_slip_match IN ('Unknown', 'Match', 'NoMatch')),
            qty_short INTEGER NULL CHECK (qty_short IS NULL OR qty_short >= 0),
            qty_heavy INTEGER NULL CHECK (qty_heavy IS NULL OR qty_heavy >= 0)
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_problem_tags_date_found ON receiving_problem_tags(date_found)",
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_problem_lines_tag_id ON receiving_problem_lines(tag_id)",
    )
    .execute(&mut *conn)
    .await?;

    info!("  ✓ Created reference and problem tag tables");
    Ok(())
}

/// Migration v2: daily baseline log and production-line reference lists
async fn migrate_v2(conn: &mut SqliteConnection) -> Result<()> {
    info!("Running migration v2: daily actuals, production reference lists");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS daily_actuals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            receiving_date DATE NOT NULL,
            orders_received INTEGER NOT NULL CHECK (orders_received >= 0),
            estimated_units INTEGER NOT NULL CHECK (estimated_units >= 0),
            author_name TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            date_entered TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_daily_actuals_receiving_date ON daily_actuals(receiving_date)",
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS production_customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_name TEXT NOT NULL UNIQUE CHECK (length(trim(customer_name)) > 0),
            date_added TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS production_employees (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            employee_name TEXT NOT NULL UNIQUE CHECK (length(trim(employee_name)) > 0),
            date_added TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    info!("  ✓ Created daily_actuals and production reference tables");
    Ok(())
}

/// Upper bound on stored quantities and unit counts (`i32::MAX`)
const QUANTITY_CEILING: i64 = 2_147_483_647;

/// Migration v3: cap line quantities and daily counts
///
/// SQLite cannot add a CHECK to an existing column, so the cap is enforced by
/// BEFORE INSERT/UPDATE triggers that abort with a constraint error.
async fn migrate_v3(conn: &mut SqliteConnection) -> Result<()> {
    info!("Running migration v3: quantity ceilings");

    let guards = [
        ("receiving_problem_lines", "qty_short", "qty_heavy"),
        ("daily_actuals", "orders_received", "estimated_units"),
    ];

    for (table, first, second) in guards {
        for event in ["INSERT", "UPDATE"] {
            let sql = format!(
                r#"
                CREATE TRIGGER IF NOT EXISTS trg_{table}_ceiling_{event}
                BEFORE {event} ON {table}
                FOR EACH ROW
                WHEN NEW.{first} > {ceiling} OR NEW.{second} > {ceiling}
                BEGIN
                    SELECT RAISE(ABORT, 'CHECK constraint failed: {table} quantity ceiling');
                END
                "#,
                table = table,
                event = event.to_lowercase(),
                first = first,
                second = second,
                ceiling = QUANTITY_CEILING,
            );
            sqlx::query(&sql).execute(&mut *conn).await?;
        }
    }

    info!("  ✓ Added quantity ceiling triggers");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_schema_version_no_table() {
        let pool = setup_test_db().await;
        let version = get_schema_version(&pool).await.unwrap();
        assert_eq!(version, 0);
    }

    #[tokio::test]
    async fn test_run_migrations_complete_flow() {
        let pool = setup_test_db().await;

        run_migrations(&pool).await.unwrap();

        let version = get_schema_version(&pool).await.unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);

        let has_table: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='daily_actuals')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(has_table);
    }

    #[tokio::test]
    async fn test_run_migrations_idempotent() {
        let pool = setup_test_db().await;

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, CURRENT_SCHEMA_VERSION as i64);
    }

    #[tokio::test]
    async fn test_upgrade_from_v1_adds_daily_actuals() {
        let pool = setup_test_db().await;
        create_schema_version_table(&pool).await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        migrate_v1(&mut tx).await.unwrap();
        set_schema_version(&mut tx, 1).await.unwrap();
        tx.commit().await.unwrap();

        sqlx::query("INSERT INTO customers (customer_name) VALUES ('Acme')")
            .execute(&pool)
            .await
            .unwrap();

        run_migrations(&pool).await.unwrap();

        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
        let customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(customers, 1, "existing rows survive the upgrade");
    }

    #[tokio::test]
    async fn test_quantity_ceiling_enforced_by_storage() {
        let pool = setup_test_db().await;
        run_migrations(&pool).await.unwrap();

        let oversized = sqlx::query(
            "INSERT INTO daily_actuals (receiving_date, orders_received, estimated_units, author_name, date_entered) VALUES ('2024-01-05', 1, 2147483648, 'Randi', '2024-01-05')",
        )
        .execute(&pool)
        .await;
        assert!(matches!(
            crate::Error::from(oversized.unwrap_err()),
            crate::Error::ConstraintViolation(_)
        ));

        sqlx::query(
            "INSERT INTO daily_actuals (receiving_date, orders_received, estimated_units, author_name, date_entered) VALUES ('2024-01-05', 1, 2147483647, 'Randi', '2024-01-05')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let raised = sqlx::query("UPDATE daily_actuals SET orders_received = 9223372036854775807")
            .execute(&pool)
            .await;
        assert!(raised.is_err());
    }
}
