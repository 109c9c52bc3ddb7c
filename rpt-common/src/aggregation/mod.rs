//! Aggregation Engine
//!
//! Joins stored problem tags with baseline volume over a date range:
//!
//! 1. Fetch header+line rows (with customer/employee names) in range and filter
//! 2. Collapse baseline entries to one `total_units` per date
//! 3. Collapse lines to tag rows, each counting once toward `orders_with_issue`
//! 4. Attach the tag date's `total_units` and compute the per-tag rate
//! 5. Group by dimension and time bucket, recomputing rates from sums
//! 6. Rank
//!
//! The engine only reads; every call reflects the latest committed data.

pub mod metrics;

pub use metrics::{
    error_rate, DefectLine, GroupBy, GroupMetrics, PackingSlipSummary, RankBy,
    ShortHeavyCounts, TagMetrics, TimeBucket,
};

use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::debug;

use crate::baseline::BaselineStore;
use crate::db::{DateRange, PackingSlipMatch, ProblemType, ShortHeavyTag, TagFilter, Team};
use crate::query::push_tag_predicates;
use crate::Result;

const DEFECT_LINE_SELECT: &str = r#"
    SELECT
        t.id AS tag_id,
        t.date_found,
        t.customer_id,
        c.customer_name,
        t.team_name,
        t.problem_type,
        t.mistake_employee_id,
        e.employee_name AS mistake_made_by,
        l.short_heavy_tag,
        l.packing_slip_match,
        l.qty_short,
        l.qty_heavy
    FROM receiving_problem_tags t
    JOIN customers c ON t.customer_id = c.id
    LEFT JOIN employees e ON t.mistake_employee_id = e.id
    JOIN receiving_problem_lines l ON l.tag_id = t.id
"#;

#[derive(Debug, Clone)]
pub struct AggregationEngine {
    db: SqlitePool,
    baselines: BaselineStore,
}

impl AggregationEngine {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            baselines: BaselineStore::new(db.clone()),
            db,
        }
    }

    /// Grouped, bucketed and ranked error metrics
    pub async fn aggregate(
        &self,
        range: &DateRange,
        filter: &TagFilter,
        group_by: GroupBy,
        time_bucket: TimeBucket,
        rank_by: RankBy,
    ) -> Result<Vec<GroupMetrics>> {
        let tags = self.tag_metrics(range, filter).await?;
        let mut groups = metrics::group_tags(&tags, group_by, time_bucket);
        metrics::rank(&mut groups, rank_by);

        debug!(
            start = %range.start,
            end = %range.end,
            ?group_by,
            ?time_bucket,
            ?rank_by,
            tags = tags.len(),
            groups = groups.len(),
            "Aggregated problem tags"
        );
        Ok(groups)
    }

    /// Tag-level rows with per-tag error rate, ordered by date then tag id
    pub async fn tag_metrics(&self, range: &DateRange, filter: &TagFilter) -> Result<Vec<TagMetrics>> {
        let lines = self.defect_lines(range, filter).await?;
        let daily_units = self.daily_units(range).await?;
        Ok(metrics::collapse_to_tags(&lines, &daily_units))
    }

    /// Short/heavy tagged line counts per bucket
    pub async fn short_heavy_trend(
        &self,
        range: &DateRange,
        filter: &TagFilter,
        time_bucket: TimeBucket,
    ) -> Result<Vec<ShortHeavyCounts>> {
        let lines = self.defect_lines(range, filter).await?;
        Ok(metrics::short_heavy_trend(&lines, time_bucket))
    }

    /// Packing-slip match rate, excluding lines with an unknown outcome
    pub async fn packing_slip_summary(
        &self,
        range: &DateRange,
        filter: &TagFilter,
    ) -> Result<PackingSlipSummary> {
        let lines = self.defect_lines(range, filter).await?;
        Ok(metrics::packing_slip_summary(&lines))
    }

    /// Joined line rows for tags in range matching `filter`
    pub async fn defect_lines(&self, range: &DateRange, filter: &TagFilter) -> Result<Vec<DefectLine>> {
        let mut qb = QueryBuilder::<Sqlite>::new(DEFECT_LINE_SELECT);
        push_tag_predicates(&mut qb, Some(range), filter);
        qb.push(" ORDER BY t.date_found ASC, t.id ASC, l.id ASC");

        let rows = qb.build().fetch_all(&self.db).await?;
        rows.iter().map(defect_line_from_row).collect()
    }

    /// Baseline units per date in range; absent dates mean 0 units
    async fn daily_units(&self, range: &DateRange) -> Result<HashMap<NaiveDate, i64>> {
        Ok(self
            .baselines
            .daily_totals(range)
            .await?
            .into_iter()
            .map(|day| (day.date, day.total_units))
            .collect())
    }
}

fn defect_line_from_row(row: &SqliteRow) -> Result<DefectLine> {
    let team_name: String = row.try_get("team_name")?;
    let problem_type: String = row.try_get("problem_type")?;
    let short_heavy_tag: String = row.try_get("short_heavy_tag")?;
    let packing_slip_match: String = row.try_get("packing_slip_match")?;

    Ok(DefectLine {
        tag_id: row.try_get("tag_id")?,
        date_found: row.try_get("date_found")?,
        customer_id: row.try_get("customer_id")?,
        customer_name: row.try_get("customer_name")?,
        team: Team::from_stored(&team_name)?,
        problem_type: ProblemType::from_stored(&problem_type)?,
        mistake_employee_id: row.try_get("mistake_employee_id")?,
        mistake_made_by: row.try_get("mistake_made_by")?,
        short_heavy_tag: ShortHeavyTag::from_stored(&short_heavy_tag)?,
        packing_slip_match: PackingSlipMatch::from_stored(&packing_slip_match)?,
        qty_short: row.try_get("qty_short")?,
        qty_heavy: row.try_get("qty_heavy")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, ProblemLineInput, ProblemTagInput};
    use crate::registry::{ReferenceRegistry, RegistryKind};
    use crate::submission::SubmissionService;

    struct Fixture {
        _db: Database,
        registry: ReferenceRegistry,
        submissions: SubmissionService,
        baselines: BaselineStore,
        engine: AggregationEngine,
    }

    async fn fixture() -> Fixture {
        let db = Database::init_in_memory().await.unwrap();
        let pool = db.pool().clone();
        Fixture {
            registry: ReferenceRegistry::new(pool.clone()),
            submissions: SubmissionService::new(pool.clone()),
            baselines: BaselineStore::new(pool.clone()),
            engine: AggregationEngine::new(pool),
            _db: db,
        }
    }

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn january() -> DateRange {
        DateRange::new(day(1, 1), day(1, 31)).unwrap()
    }

    fn header(date: NaiveDate, customer_id: i64, team: &str, problem: &str) -> ProblemTagInput {
        ProblemTagInput {
            date_found: Some(date),
            po_number: "N/A".to_string(),
            customer_id: Some(customer_id),
            job_name: "N/A".to_string(),
            team_name: team.to_string(),
            author_name: "Tester".to_string(),
            problem_type: problem.to_string(),
            ..Default::default()
        }
    }

    fn line(qty_short: Option<i64>, qty_heavy: Option<i64>) -> ProblemLineInput {
        ProblemLineInput {
            style_number: "A1".to_string(),
            item_description: "Shirt".to_string(),
            color: "Red".to_string(),
            size: "M".to_string(),
            qty_short,
            qty_heavy,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_single_tag_against_baseline() {
        let f = fixture().await;
        let acme = f.registry.get_or_create(RegistryKind::Customer, "Acme").await.unwrap();
        f.submissions
            .submit(&header(day(1, 5), acme, "Screenprint", "Damaged in Production"), &[line(Some(5), Some(0))])
            .await
            .unwrap();
        f.baselines.record(day(1, 5), 12, 100, "Randi", "").await.unwrap();

        let groups = f
            .engine
            .aggregate(&january(), &TagFilter::default(), GroupBy::Customer, TimeBucket::Month, RankBy::ErrorRate)
            .await
            .unwrap();

        assert_eq!(groups.len(), 1);
        let acme_jan = &groups[0];
        assert_eq!(acme_jan.name, "Acme");
        assert_eq!(acme_jan.bucket_start, Some(day(1, 1)));
        assert_eq!(acme_jan.orders_with_issue, 1);
        assert_eq!(acme_jan.error_units, 5);
        assert_eq!(acme_jan.total_units, 100);
        assert_eq!(acme_jan.error_rate, 0.05);
    }

    #[tokio::test]
    async fn test_multiple_baseline_entries_summed() {
        let f = fixture().await;
        let acme = f.registry.get_or_create(RegistryKind::Customer, "Acme").await.unwrap();
        f.submissions
            .submit(&header(day(1, 5), acme, "Digital", "Factory Damage"), &[line(Some(3), Some(7))])
            .await
            .unwrap();
        f.baselines.record(day(1, 5), 1, 60, "Day shift", "").await.unwrap();
        f.baselines.record(day(1, 5), 1, 40, "Night shift", "").await.unwrap();

        let tags = f.engine.tag_metrics(&january(), &TagFilter::default()).await.unwrap();

        assert_eq!(tags[0].error_units, 10);
        assert_eq!(tags[0].total_units, 100);
        assert_eq!(tags[0].error_rate, 0.1);
    }

    #[tokio::test]
    async fn test_filters_restrict_aggregation() {
        let f = fixture().await;
        let acme = f.registry.get_or_create(RegistryKind::Customer, "Acme").await.unwrap();
        let globex = f.registry.get_or_create(RegistryKind::Customer, "Globex").await.unwrap();
        f.submissions
            .submit(&header(day(1, 5), acme, "Digital", "Factory Damage"), &[line(Some(1), None)])
            .await
            .unwrap();
        f.submissions
            .submit(&header(day(1, 6), globex, "VAS", "Factory Damage"), &[line(Some(2), None)])
            .await
            .unwrap();
        f.submissions
            .submit(&header(day(2, 6), globex, "VAS", "Factory Damage"), &[line(Some(4), None)])
            .await
            .unwrap();

        let filter = TagFilter {
            team: Some(Team::Vas),
            ..Default::default()
        };
        let groups = f
            .engine
            .aggregate(&january(), &filter, GroupBy::Team, TimeBucket::Total, RankBy::Name)
            .await
            .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "VAS");
        assert_eq!(groups[0].error_units, 2);
    }

    #[tokio::test]
    async fn test_line_breakdowns() {
        let f = fixture().await;
        let acme = f.registry.get_or_create(RegistryKind::Customer, "Acme").await.unwrap();

        let mut both = line(Some(2), Some(9));
        both.short_heavy_tag = "Short/Heavy".to_string();
        both.packing_slip_match = PackingSlipMatch::Match;
        let mut mismatch = line(None, None);
        mismatch.packing_slip_match = PackingSlipMatch::NoMatch;
        let unknown = line(None, None);

        f.submissions
            .submit(&header(day(1, 5), acme, "Embroidery", "Short/ Heavy Items"), &[both, mismatch, unknown])
            .await
            .unwrap();

        let trend = f
            .engine
            .short_heavy_trend(&january(), &TagFilter::default(), TimeBucket::Month)
            .await
            .unwrap();
        assert_eq!(trend.len(), 1);
        assert_eq!((trend[0].short_lines, trend[0].heavy_lines), (1, 1));

        let slip = f
            .engine
            .packing_slip_summary(&january(), &TagFilter::default())
            .await
            .unwrap();
        assert_eq!(slip.match_rate, Some(0.5));
    }

    #[tokio::test]
    async fn test_empty_range_has_no_groups_and_no_slip_rate() {
        let f = fixture().await;

        let groups = f
            .engine
            .aggregate(&january(), &TagFilter::default(), GroupBy::Customer, TimeBucket::Month, RankBy::ErrorRate)
            .await
            .unwrap();
        assert!(groups.is_empty());

        let slip = f
            .engine
            .packing_slip_summary(&january(), &TagFilter::default())
            .await
            .unwrap();
        assert_eq!(slip.match_rate, None);
    }
}
