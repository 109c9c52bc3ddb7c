//! # Receiving Problem Tags Core
//!
//! Persistence and analytics for receiving defect reports:
//! - Reference registry (customers, employees) with idempotent get-or-create
//! - Atomic submission of a problem tag header with its lines
//! - Daily received-volume baseline
//! - Aggregation of defects against baseline volume (rates, rankings, trends)
//! - Drill-down queries
//!
//! [`Core`] bundles the services over one shared pool.

pub mod aggregation;
pub mod baseline;
pub mod config;
pub mod db;
pub mod draft;
pub mod error;
pub mod query;
pub mod registry;
pub mod submission;

pub use error::{Error, Result, ValidationErrors};

use chrono::NaiveDate;
use sqlx::SqlitePool;

use aggregation::{AggregationEngine, GroupBy, GroupMetrics, RankBy, TimeBucket};
use baseline::BaselineStore;
use db::{
    DateRange, NamedEntity, ProblemLineInput, ProblemTagHeader, ProblemTagInput, ProblemTagLine,
    TagFilter,
};
use query::QueryApi;
use registry::{ReferenceRegistry, RegistryKind};
use submission::SubmissionService;

/// Entry point used by presentation layers
///
/// Cheap to clone; every clone shares the same connection pool.
#[derive(Debug, Clone)]
pub struct Core {
    registry: ReferenceRegistry,
    submissions: SubmissionService,
    baselines: BaselineStore,
    queries: QueryApi,
    aggregation: AggregationEngine,
}

impl Core {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            registry: ReferenceRegistry::new(pool.clone()),
            submissions: SubmissionService::new(pool.clone()),
            baselines: BaselineStore::new(pool.clone()),
            queries: QueryApi::new(pool.clone()),
            aggregation: AggregationEngine::new(pool),
        }
    }

    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    pub fn submissions(&self) -> &SubmissionService {
        &self.submissions
    }

    pub fn baselines(&self) -> &BaselineStore {
        &self.baselines
    }

    pub fn queries(&self) -> &QueryApi {
        &self.queries
    }

    pub fn aggregation(&self) -> &AggregationEngine {
        &self.aggregation
    }

    pub async fn list_customers(&self) -> Result<Vec<NamedEntity>> {
        self.registry.list_active(RegistryKind::Customer).await
    }

    pub async fn list_employees(&self) -> Result<Vec<NamedEntity>> {
        self.registry.list_active(RegistryKind::Employee).await
    }

    pub async fn get_or_create_customer(&self, name: &str) -> Result<i64> {
        self.registry.get_or_create(RegistryKind::Customer, name).await
    }

    pub async fn get_or_create_employee(&self, name: &str) -> Result<i64> {
        self.registry.get_or_create(RegistryKind::Employee, name).await
    }

    pub async fn submit_problem_tag(
        &self,
        header: &ProblemTagInput,
        lines: &[ProblemLineInput],
    ) -> Result<i64> {
        self.submissions.submit(header, lines).await
    }

    pub async fn record_daily_actual(
        &self,
        date: NaiveDate,
        orders_received: i64,
        estimated_units: i64,
        author: &str,
        notes: &str,
    ) -> Result<i64> {
        self.baselines
            .record(date, orders_received, estimated_units, author, notes)
            .await
    }

    pub async fn fetch_headers(
        &self,
        range: &DateRange,
        filter: &TagFilter,
    ) -> Result<Vec<ProblemTagHeader>> {
        self.queries.fetch_headers(range, filter).await
    }

    pub async fn fetch_lines(&self, tag_id: i64) -> Result<Vec<ProblemTagLine>> {
        self.queries.fetch_lines(tag_id).await
    }

    pub async fn aggregate(
        &self,
        range: &DateRange,
        filter: &TagFilter,
        group_by: GroupBy,
        time_bucket: TimeBucket,
        rank_by: RankBy,
    ) -> Result<Vec<GroupMetrics>> {
        self.aggregation
            .aggregate(range, filter, group_by, time_bucket, rank_by)
            .await
    }
}
