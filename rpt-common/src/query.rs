//! Query API
//!
//! Read-only drill-down accessors over stored problem tags. Customer and
//! employee names are joined regardless of their `active` flag so historical
//! reports always show who they referred to.

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::db::{
    DateRange, PackingSlipMatch, ProblemTagHeader, ProblemTagLine, ProblemType, ShortHeavyTag,
    Size, TagFilter, Team,
};
use crate::{Error, Result};

/// Row cap for `fetch_recent` when the caller does not pass one
pub const DEFAULT_RECENT_LIMIT: u32 = 500;

const HEADER_SELECT: &str = r#"
    SELECT
        t.id,
        t.date_entered,
        t.date_found,
        t.po_number,
        t.customer_id,
        c.customer_name,
        t.job_name,
        t.team_name,
        t.author_name,
        t.problem_type,
        t.mistake_employee_id,
        e.employee_name AS mistake_made_by,
        t.notes
    FROM receiving_problem_tags t
    JOIN customers c ON t.customer_id = c.id
    LEFT JOIN employees e ON t.mistake_employee_id = e.id
"#;

const MOST_RECENT_FIRST: &str = " ORDER BY t.date_found DESC, t.date_entered DESC, t.id DESC";

/// Append the active/date-range/filter predicates for alias `t`
///
/// A `None` range leaves `date_found` unbounded.
pub(crate) fn push_tag_predicates(
    qb: &mut QueryBuilder<'_, Sqlite>,
    range: Option<&DateRange>,
    filter: &TagFilter,
) {
    qb.push(" WHERE t.active = 1");

    if let Some(range) = range {
        qb.push(" AND t.date_found BETWEEN ")
            .push_bind(range.start)
            .push(" AND ")
            .push_bind(range.end);
    }

    if let Some(team) = filter.team {
        qb.push(" AND t.team_name = ").push_bind(team.as_str());
    }
    if let Some(customer_id) = filter.customer_id {
        qb.push(" AND t.customer_id = ").push_bind(customer_id);
    }
    if let Some(problem_type) = filter.problem_type {
        qb.push(" AND t.problem_type = ").push_bind(problem_type.as_str());
    }
}

#[derive(Debug, Clone)]
pub struct QueryApi {
    db: SqlitePool,
}

impl QueryApi {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Headers found within `range` matching `filter`, most recent first
    pub async fn fetch_headers(
        &self,
        range: &DateRange,
        filter: &TagFilter,
    ) -> Result<Vec<ProblemTagHeader>> {
        let mut qb = QueryBuilder::<Sqlite>::new(HEADER_SELECT);
        push_tag_predicates(&mut qb, Some(range), filter);
        qb.push(MOST_RECENT_FIRST);

        let rows = qb.build().fetch_all(&self.db).await?;
        rows.iter().map(header_from_row).collect()
    }

    /// Latest `limit` headers matching `filter`, regardless of date
    pub async fn fetch_recent(
        &self,
        filter: &TagFilter,
        limit: Option<u32>,
    ) -> Result<Vec<ProblemTagHeader>> {
        let mut qb = QueryBuilder::<Sqlite>::new(HEADER_SELECT);
        push_tag_predicates(&mut qb, None, filter);
        qb.push(MOST_RECENT_FIRST)
            .push(" LIMIT ")
            .push_bind(limit.unwrap_or(DEFAULT_RECENT_LIMIT));

        let rows = qb.build().fetch_all(&self.db).await?;
        rows.iter().map(header_from_row).collect()
    }

    pub async fn fetch_header(&self, tag_id: i64) -> Result<ProblemTagHeader> {
        let sql = format!("{} WHERE t.active = 1 AND t.id = ?", HEADER_SELECT);
        let row = sqlx::query(&sql)
            .bind(tag_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Problem tag {}", tag_id)))?;
        header_from_row(&row)
    }

    /// Lines of one tag in insertion order
    pub async fn fetch_lines(&self, tag_id: i64) -> Result<Vec<ProblemTagLine>> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM receiving_problem_tags WHERE id = ? AND active = 1)",
        )
        .bind(tag_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(Error::NotFound(format!("Problem tag {}", tag_id)));
        }

        let rows = sqlx::query(
            r#"
            SELECT id, tag_id, short_heavy_tag, style_number, item_description, color,
                   size, packing_slip_match, qty_short, qty_heavy
            FROM receiving_problem_lines
            WHERE tag_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(tag_id)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(line_from_row).collect()
    }
}

fn header_from_row(row: &SqliteRow) -> Result<ProblemTagHeader> {
    let team_name: String = row.try_get("team_name")?;
    let problem_type: String = row.try_get("problem_type")?;

    Ok(ProblemTagHeader {
        id: row.try_get("id")?,
        date_entered: row.try_get("date_entered")?,
        date_found: row.try_get("date_found")?,
        po_number: row.try_get("po_number")?,
        customer_id: row.try_get("customer_id")?,
        customer_name: row.try_get("customer_name")?,
        job_name: row.try_get("job_name")?,
        team_name: Team::from_stored(&team_name)?,
        author_name: row.try_get("author_name")?,
        problem_type: ProblemType::from_stored(&problem_type)?,
        mistake_employee_id: row.try_get("mistake_employee_id")?,
        mistake_made_by: row.try_get("mistake_made_by")?,
        notes: row.try_get("notes")?,
    })
}

fn line_from_row(row: &SqliteRow) -> Result<ProblemTagLine> {
    let short_heavy_tag: String = row.try_get("short_heavy_tag")?;
    let size: String = row.try_get("size")?;
    let packing_slip_match: String = row.try_get("packing_slip_match")?;

    Ok(ProblemTagLine {
        id: row.try_get("id")?,
        tag_id: row.try_get("tag_id")?,
        short_heavy_tag: ShortHeavyTag::from_stored(&short_heavy_tag)?,
        style_number: row.try_get("style_number")?,
        item_description: row.try_get("item_description")?,
        color: row.try_get("color")?,
        size: Size::from_stored(&size)?,
        packing_slip_match: PackingSlipMatch::from_stored(&packing_slip_match)?,
        qty_short: row.try_get("qty_short")?,
        qty_heavy: row.try_get("qty_heavy")?,
    })
}
