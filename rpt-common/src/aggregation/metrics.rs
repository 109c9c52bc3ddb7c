//! Pure metric computation over fetched defect lines
//!
//! Rates are always recomputed from summed units (`Σerror_units / Σtotal_units`),
//! never averaged from finer-grained rates, and a zero denominator yields a
//! rate of 0. Sums saturate at `i64::MAX` instead of overflowing.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::db::{PackingSlipMatch, ProblemType, ShortHeavyTag, Team};

/// Label used when grouping by employee for tags without one
pub const UNASSIGNED: &str = "Unassigned";

/// Label of the single group produced by `GroupBy::All`
pub const ALL_TAGS: &str = "All";

/// One stored line joined with its header and resolved names
#[derive(Debug, Clone, PartialEq)]
pub struct DefectLine {
    pub tag_id: i64,
    pub date_found: NaiveDate,
    pub customer_id: i64,
    pub customer_name: String,
    pub team: Team,
    pub problem_type: ProblemType,
    pub mistake_employee_id: Option<i64>,
    pub mistake_made_by: Option<String>,
    pub short_heavy_tag: ShortHeavyTag,
    pub packing_slip_match: PackingSlipMatch,
    pub qty_short: Option<i64>,
    pub qty_heavy: Option<i64>,
}

impl DefectLine {
    /// `qty_short + qty_heavy`, missing quantities counting as 0
    pub fn error_units(&self) -> i64 {
        self.qty_short
            .unwrap_or(0)
            .saturating_add(self.qty_heavy.unwrap_or(0))
    }
}

/// One problem tag collapsed from its lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagMetrics {
    pub tag_id: i64,
    pub date_found: NaiveDate,
    pub customer_id: i64,
    pub customer_name: String,
    pub team: Team,
    pub problem_type: ProblemType,
    pub mistake_employee_id: Option<i64>,
    pub mistake_made_by: Option<String>,
    pub orders_with_issue: i64,
    pub error_units: i64,
    /// Baseline units received on `date_found` (0 when nothing was recorded)
    pub total_units: i64,
    pub error_rate: f64,
}

/// Dimension to group tag rows by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// Every tag in one group
    All,
    #[default]
    Customer,
    Team,
    ProblemType,
    MistakeEmployee,
}

/// Time truncation applied to `date_found`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBucket {
    /// No time split; one bucket spanning the whole range
    #[default]
    Total,
    Day,
    /// ISO week, starting Monday
    Week,
    Month,
    Year,
}

impl TimeBucket {
    /// First date of the bucket containing `date`
    pub fn truncate(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            TimeBucket::Total => None,
            TimeBucket::Day => Some(date),
            TimeBucket::Week => {
                Some(date - Duration::days(date.weekday().num_days_from_monday() as i64))
            }
            TimeBucket::Month => date.with_day(1),
            TimeBucket::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
        }
    }
}

/// Ordering applied to grouped rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBy {
    #[default]
    ErrorRate,
    ErrorUnits,
    OrdersWithIssue,
    Name,
}

/// Aggregated metrics for one (bucket, group) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMetrics {
    /// Start of the time bucket; `None` when not bucketing
    pub bucket_start: Option<NaiveDate>,
    /// Entity id for customer/employee groups
    pub group_id: Option<i64>,
    pub name: String,
    pub orders_with_issue: i64,
    pub error_units: i64,
    pub total_units: i64,
    pub error_rate: f64,
}

/// Short/heavy line counts for one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortHeavyCounts {
    pub bucket_start: Option<NaiveDate>,
    pub short_lines: i64,
    pub heavy_lines: i64,
}

/// Packing-slip comparison outcome over a set of lines
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PackingSlipSummary {
    pub matched: i64,
    pub mismatched: i64,
    pub unknown: i64,
    /// `None` when no line had a known outcome
    pub match_rate: Option<f64>,
}

/// `error_units / total_units`, or 0 when there is no baseline volume
pub fn error_rate(error_units: i64, total_units: i64) -> f64 {
    if total_units > 0 {
        error_units as f64 / total_units as f64
    } else {
        0.0
    }
}

/// Collapse lines into one row per tag and attach that day's baseline volume
pub fn collapse_to_tags(
    lines: &[DefectLine],
    daily_units: &HashMap<NaiveDate, i64>,
) -> Vec<TagMetrics> {
    let mut tags: BTreeMap<(NaiveDate, i64), TagMetrics> = BTreeMap::new();

    for line in lines {
        let tag = tags
            .entry((line.date_found, line.tag_id))
            .or_insert_with(|| TagMetrics {
                tag_id: line.tag_id,
                date_found: line.date_found,
                customer_id: line.customer_id,
                customer_name: line.customer_name.clone(),
                team: line.team,
                problem_type: line.problem_type,
                mistake_employee_id: line.mistake_employee_id,
                mistake_made_by: line.mistake_made_by.clone(),
                orders_with_issue: 1,
                error_units: 0,
                total_units: daily_units.get(&line.date_found).copied().unwrap_or(0),
                error_rate: 0.0,
            });
        tag.error_units = tag.error_units.saturating_add(line.error_units());
    }

    tags.into_values()
        .map(|mut tag| {
            tag.error_rate = error_rate(tag.error_units, tag.total_units);
            tag
        })
        .collect()
}

fn group_key(tag: &TagMetrics, group_by: GroupBy) -> (Option<i64>, String) {
    match group_by {
        GroupBy::All => (None, ALL_TAGS.to_string()),
        GroupBy::Customer => (Some(tag.customer_id), tag.customer_name.clone()),
        GroupBy::Team => (None, tag.team.as_str().to_string()),
        GroupBy::ProblemType => (None, tag.problem_type.as_str().to_string()),
        GroupBy::MistakeEmployee => (
            tag.mistake_employee_id,
            tag.mistake_made_by
                .clone()
                .unwrap_or_else(|| UNASSIGNED.to_string()),
        ),
    }
}

#[derive(Default)]
struct GroupAccumulator {
    orders_with_issue: i64,
    error_units: i64,
    /// Baseline volume per distinct date; tags sharing a date share its volume
    units_by_date: BTreeMap<NaiveDate, i64>,
}

/// Sum tag rows per (bucket, group) and recompute the aggregate rate
///
/// Baseline volume is counted once per distinct date within a group, so two
/// tags found on the same day divide by that day's units, not twice them.
pub fn group_tags(tags: &[TagMetrics], group_by: GroupBy, bucket: TimeBucket) -> Vec<GroupMetrics> {
    let mut groups: BTreeMap<(Option<NaiveDate>, String, Option<i64>), GroupAccumulator> =
        BTreeMap::new();

    for tag in tags {
        let (group_id, name) = group_key(tag, group_by);
        let acc = groups
            .entry((bucket.truncate(tag.date_found), name, group_id))
            .or_default();
        acc.orders_with_issue = acc.orders_with_issue.saturating_add(tag.orders_with_issue);
        acc.error_units = acc.error_units.saturating_add(tag.error_units);
        acc.units_by_date.insert(tag.date_found, tag.total_units);
    }

    groups
        .into_iter()
        .map(|((bucket_start, name, group_id), acc)| {
            let total_units = acc
                .units_by_date
                .values()
                .fold(0i64, |sum, units| sum.saturating_add(*units));
            GroupMetrics {
                bucket_start,
                group_id,
                name,
                orders_with_issue: acc.orders_with_issue,
                error_units: acc.error_units,
                total_units,
                error_rate: error_rate(acc.error_units, total_units),
            }
        })
        .collect()
}

/// Sort by bucket, then by the chosen metric, breaking ties by name ascending
pub fn rank(groups: &mut [GroupMetrics], rank_by: RankBy) {
    groups.sort_by(|a, b| {
        a.bucket_start
            .cmp(&b.bucket_start)
            .then_with(|| match rank_by {
                RankBy::ErrorRate => b.error_rate.total_cmp(&a.error_rate),
                RankBy::ErrorUnits => b.error_units.cmp(&a.error_units),
                RankBy::OrdersWithIssue => b.orders_with_issue.cmp(&a.orders_with_issue),
                RankBy::Name => Ordering::Equal,
            })
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.group_id.cmp(&b.group_id))
    });
}

/// Count short- and heavy-tagged lines per bucket; buckets without lines are absent
pub fn short_heavy_trend(lines: &[DefectLine], bucket: TimeBucket) -> Vec<ShortHeavyCounts> {
    let mut buckets: BTreeMap<Option<NaiveDate>, (i64, i64)> = BTreeMap::new();

    for line in lines {
        let (short, heavy) = line.short_heavy_tag.line_counts();
        let counts = buckets.entry(bucket.truncate(line.date_found)).or_default();
        counts.0 += short;
        counts.1 += heavy;
    }

    buckets
        .into_iter()
        .map(|(bucket_start, (short_lines, heavy_lines))| ShortHeavyCounts {
            bucket_start,
            short_lines,
            heavy_lines,
        })
        .collect()
}

/// Match rate over lines with a known packing-slip outcome
pub fn packing_slip_summary(lines: &[DefectLine]) -> PackingSlipSummary {
    let mut summary = PackingSlipSummary {
        matched: 0,
        mismatched: 0,
        unknown: 0,
        match_rate: None,
    };

    for line in lines {
        match line.packing_slip_match {
            PackingSlipMatch::Match => summary.matched += 1,
            PackingSlipMatch::NoMatch => summary.mismatched += 1,
            PackingSlipMatch::Unknown => summary.unknown += 1,
        }
    }

    let known = summary.matched + summary.mismatched;
    if known > 0 {
        summary.match_rate = Some(summary.matched as f64 / known as f64);
    }
    summary
}
