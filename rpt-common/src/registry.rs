//! Reference Registry
//!
//! Idempotent get-or-create store for named reference entities. Names are
//! unique per kind; concurrent creation of the same name collapses onto one
//! row through `ON CONFLICT DO NOTHING` followed by a lookup, so callers get
//! the same id whether their insert won or lost.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::NamedEntity;
use crate::{Error, Result};

/// Kind of reference entity, each backed by its own table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryKind {
    Customer,
    Employee,
    ProductionCustomer,
    ProductionEmployee,
}

impl RegistryKind {
    fn table(&self) -> &'static str {
        match self {
            RegistryKind::Customer => "customers",
            RegistryKind::Employee => "employees",
            RegistryKind::ProductionCustomer => "production_customers",
            RegistryKind::ProductionEmployee => "production_employees",
        }
    }

    fn name_column(&self) -> &'static str {
        match self {
            RegistryKind::Customer | RegistryKind::ProductionCustomer => "customer_name",
            RegistryKind::Employee | RegistryKind::ProductionEmployee => "employee_name",
        }
    }

    /// Human-readable label for messages
    pub fn label(&self) -> &'static str {
        match self {
            RegistryKind::Customer => "Customer",
            RegistryKind::Employee => "Employee",
            RegistryKind::ProductionCustomer => "Production customer",
            RegistryKind::ProductionEmployee => "Production employee",
        }
    }
}

/// Registry over all reference tables
#[derive(Debug, Clone)]
pub struct ReferenceRegistry {
    db: SqlitePool,
}

impl ReferenceRegistry {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Return the id for `name`, inserting it first if it does not exist
    pub async fn get_or_create(&self, kind: RegistryKind, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid(format!("{} name is required.", kind.label())));
        }

        let insert = format!(
            "INSERT INTO {table} ({col}) VALUES (?) ON CONFLICT ({col}) DO NOTHING RETURNING id",
            table = kind.table(),
            col = kind.name_column()
        );
        let inserted: Option<i64> = sqlx::query_scalar(&insert)
            .bind(name)
            .fetch_optional(&self.db)
            .await?;

        if let Some(id) = inserted {
            info!(kind = kind.label(), id, name, "Created reference entry");
            return Ok(id);
        }

        // Lost the race (or the row already existed); rows are never deleted
        let select = format!(
            "SELECT id FROM {table} WHERE {col} = ?",
            table = kind.table(),
            col = kind.name_column()
        );
        let id: i64 = sqlx::query_scalar(&select)
            .bind(name)
            .fetch_one(&self.db)
            .await?;

        debug!(kind = kind.label(), id, name, "Reference entry already existed");
        Ok(id)
    }

    /// Active entries ordered by name
    pub async fn list_active(&self, kind: RegistryKind) -> Result<Vec<NamedEntity>> {
        let sql = format!(
            "SELECT id, {col} FROM {table} WHERE active = 1 ORDER BY {col}",
            table = kind.table(),
            col = kind.name_column()
        );
        let rows = sqlx::query_as::<_, (i64, String)>(&sql)
            .fetch_all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| NamedEntity { id, name })
            .collect())
    }

    /// Show or hide an entry in read lists; existing reports keep referencing it
    pub async fn set_active(&self, kind: RegistryKind, id: i64, active: bool) -> Result<()> {
        let sql = format!("UPDATE {} SET active = ? WHERE id = ?", kind.table());
        let result = sqlx::query(&sql)
            .bind(active)
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("{} {}", kind.label(), id)));
        }

        info!(kind = kind.label(), id, active, "Updated reference entry visibility");
        Ok(())
    }

    /// Idempotently insert a starter list; blank names are skipped
    pub async fn seed(&self, kind: RegistryKind, names: &[String]) -> Result<usize> {
        let mut seeded = 0;
        for name in names.iter().filter(|n| !n.trim().is_empty()) {
            self.get_or_create(kind, name).await?;
            seeded += 1;
        }
        debug!(kind = kind.label(), seeded, "Seeded reference entries");
        Ok(seeded)
    }
}
