//! Query-string parameters shared by the read endpoints

use chrono::NaiveDate;
use rpt_common::aggregation::{GroupBy, RankBy, TimeBucket};
use rpt_common::db::{DateRange, ProblemType, TagFilter, Team};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

/// `?start=2024-01-01&end=2024-01-31&team=VAS&customer_id=3&problem_type=...`
///
/// Enumerated filters use their stored labels. Analytics endpoints also read
/// `group_by`, `time_bucket` and `rank_by` (snake_case).
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub team: Option<Team>,
    pub customer_id: Option<i64>,
    pub problem_type: Option<ProblemType>,
    pub group_by: Option<GroupBy>,
    pub time_bucket: Option<TimeBucket>,
    pub rank_by: Option<RankBy>,
    pub limit: Option<u32>,
}

impl ReportQuery {
    /// Inclusive range; both ends are required
    pub fn range(&self) -> ApiResult<DateRange> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Ok(DateRange::new(start, end)?),
            _ => Err(ApiError::BadRequest(
                "Both start and end dates are required".to_string(),
            )),
        }
    }

    /// Whether either range bound was supplied
    pub fn has_range(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    pub fn filter(&self) -> TagFilter {
        TagFilter {
            team: self.team,
            customer_id: self.customer_id,
            problem_type: self.problem_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(query: &str) -> ReportQuery {
        let uri: axum::http::Uri = format!("/x?{}", query).parse().unwrap();
        axum::extract::Query::<ReportQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_parses_labels_and_dimensions() {
        let q = parse(
            "start=2024-01-01&end=2024-01-31&team=VAS&problem_type=Short%2F%20Heavy%20Items\
             &customer_id=7&group_by=problem_type&time_bucket=week&rank_by=error_units",
        );

        assert_eq!(q.team, Some(Team::Vas));
        assert_eq!(q.problem_type, Some(ProblemType::ShortHeavyItems));
        assert_eq!(q.customer_id, Some(7));
        assert_eq!(q.group_by, Some(GroupBy::ProblemType));
        assert_eq!(q.time_bucket, Some(TimeBucket::Week));
        assert_eq!(q.rank_by, Some(RankBy::ErrorUnits));
        assert!(q.range().is_ok());
    }

    #[test]
    fn test_range_requires_both_bounds() {
        let q = parse("start=2024-01-01");
        assert!(q.has_range());
        assert!(matches!(q.range(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_inverted_range_is_validation_error() {
        let q = parse("start=2024-02-01&end=2024-01-01");
        assert!(matches!(
            q.range(),
            Err(ApiError::Core(rpt_common::Error::Validation(_)))
        ));
    }
}
