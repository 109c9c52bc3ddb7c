//! Submission Service
//!
//! Validates a problem tag (header plus lines) and persists it in a single
//! transaction. Validation runs to completion before any connection is taken,
//! so every problem is reported at once and nothing is written on failure.

use chrono::{NaiveDate, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};

use crate::db::{
    PackingSlipMatch, ProblemLineInput, ProblemTagInput, ProblemType, ShortHeavyTag, Size, Team,
    MAX_QUANTITY,
};
use crate::{Error, Result, ValidationErrors};

/// Header that passed validation, text fields trimmed
#[derive(Debug, Clone, PartialEq)]
pub struct ValidHeader {
    pub date_found: NaiveDate,
    pub po_number: String,
    pub customer_id: i64,
    pub job_name: String,
    pub team_name: Team,
    pub author_name: String,
    pub problem_type: ProblemType,
    pub mistake_employee_id: Option<i64>,
    pub notes: String,
}

/// Line that passed validation, text fields trimmed
#[derive(Debug, Clone, PartialEq)]
pub struct ValidLine {
    pub short_heavy_tag: ShortHeavyTag,
    pub style_number: String,
    pub item_description: String,
    pub color: String,
    pub size: Size,
    pub packing_slip_match: PackingSlipMatch,
    pub qty_short: Option<i64>,
    pub qty_heavy: Option<i64>,
}

/// A complete submission ready to persist
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSubmission {
    pub header: ValidHeader,
    pub lines: Vec<ValidLine>,
}

/// Check a header and its lines, collecting every error
pub fn validate_submission(
    header: &ProblemTagInput,
    lines: &[ProblemLineInput],
) -> Result<ValidSubmission> {
    let mut errors = ValidationErrors::new();

    if header.date_found.is_none() {
        errors.push("Date Found is required.");
    }
    if header.customer_id.is_none() {
        errors.push("Customer is required.");
    }

    let problem_type = if header.problem_type.trim().is_empty() {
        errors.push("Problem Type is required.");
        None
    } else {
        let parsed = ProblemType::from_label(header.problem_type.trim());
        if parsed.is_none() {
            errors.push(format!("Problem Type {:?} is not a known type.", header.problem_type));
        }
        parsed
    };

    let team_name = if header.team_name.trim().is_empty() {
        errors.push("Team Name is required.");
        None
    } else {
        let parsed = Team::from_label(header.team_name.trim());
        if parsed.is_none() {
            errors.push(format!("Team Name {:?} is not a known team.", header.team_name));
        }
        parsed
    };

    if lines.is_empty() {
        errors.push("At least one SKU/problem line is required.");
    }

    let mut valid_lines = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        if let Some(valid) = validate_line(idx + 1, line, &mut errors) {
            valid_lines.push(valid);
        }
    }

    errors.into_result()?;

    match (header.date_found, header.customer_id, problem_type, team_name) {
        (Some(date_found), Some(customer_id), Some(problem_type), Some(team_name)) => {
            Ok(ValidSubmission {
                header: ValidHeader {
                    date_found,
                    po_number: header.po_number.trim().to_string(),
                    customer_id,
                    job_name: header.job_name.trim().to_string(),
                    team_name,
                    author_name: header.author_name.trim().to_string(),
                    problem_type,
                    mistake_employee_id: header.mistake_employee_id,
                    notes: header.notes.trim().to_string(),
                },
                lines: valid_lines,
            })
        }
        _ => Err(Error::Internal("validated header is incomplete".to_string())),
    }
}

fn validate_line(
    number: usize,
    line: &ProblemLineInput,
    errors: &mut ValidationErrors,
) -> Option<ValidLine> {
    let before = errors.len();

    for (value, label) in [
        (&line.style_number, "STYLE#"),
        (&line.item_description, "ITEM DESCRIPTION"),
        (&line.color, "COLOR"),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("Line {}: {} is required.", number, label));
        }
    }

    let size = Size::from_label(line.size.trim());
    if size.is_none() {
        errors.push(format!("Line {}: SIZE must be one of the allowed options.", number));
    }

    let short_heavy_tag = ShortHeavyTag::from_label(line.short_heavy_tag.trim());
    if short_heavy_tag.is_none() {
        errors.push(format!("Line {}: Short/Heavy tag is invalid.", number));
    }

    for (value, field) in [(line.qty_short, "qty_short"), (line.qty_heavy, "qty_heavy")] {
        match value {
            Some(qty) if qty < 0 => {
                errors.push(format!("Line {}: {} cannot be negative.", number, field));
            }
            Some(qty) if qty > MAX_QUANTITY => {
                errors.push(format!("Line {}: {} is too large.", number, field));
            }
            _ => {}
        }
    }

    if errors.len() != before {
        return None;
    }

    Some(ValidLine {
        short_heavy_tag: short_heavy_tag?,
        style_number: line.style_number.trim().to_string(),
        item_description: line.item_description.trim().to_string(),
        color: line.color.trim().to_string(),
        size: size?,
        packing_slip_match: line.packing_slip_match,
        qty_short: line.qty_short,
        qty_heavy: line.qty_heavy,
    })
}

/// Persists validated problem tags
#[derive(Debug, Clone)]
pub struct SubmissionService {
    db: SqlitePool,
}

impl SubmissionService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Validate and atomically store a header with its lines; returns the header id
    pub async fn submit(
        &self,
        header: &ProblemTagInput,
        lines: &[ProblemLineInput],
    ) -> Result<i64> {
        let submission = match validate_submission(header, lines) {
            Ok(submission) => submission,
            Err(err) => {
                warn!(error = %err, "Rejected problem tag submission");
                return Err(err);
            }
        };

        self.persist(&submission).await
    }

    /// Store an already-validated submission
    pub async fn persist(&self, submission: &ValidSubmission) -> Result<i64> {
        let mut tx = self.db.begin().await?;

        match insert_submission(&mut tx, submission).await {
            Ok(tag_id) => {
                tx.commit().await?;
                info!(
                    tag_id,
                    customer_id = submission.header.customer_id,
                    line_count = submission.lines.len(),
                    "Saved problem tag"
                );
                Ok(tag_id)
            }
            Err(err) => {
                // Nothing from this submission may become visible
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed submission also failed");
                }
                warn!(error = %err, "Problem tag submission rolled back");
                Err(err)
            }
        }
    }
}

async fn insert_submission(
    tx: &mut Transaction<'_, Sqlite>,
    submission: &ValidSubmission,
) -> Result<i64> {
    let header = &submission.header;

    let tag_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO receiving_problem_tags (
            date_entered, date_found, po_number, customer_id, job_name, team_name,
            author_name, problem_type, mistake_employee_id, notes
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(Utc::now())
    .bind(header.date_found)
    .bind(&header.po_number)
    .bind(header.customer_id)
    .bind(&header.job_name)
    .bind(header.team_name.as_str())
    .bind(&header.author_name)
    .bind(header.problem_type.as_str())
    .bind(header.mistake_employee_id)
    .bind(&header.notes)
    .fetch_one(&mut **tx)
    .await?;

    for (idx, line) in submission.lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO receiving_problem_lines (
                tag_id, short_heavy_tag, style_number, item_description, color, size,
                packing_slip_match, qty_short, qty_heavy
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(tag_id)
        .bind(line.short_heavy_tag.as_str())
        .bind(&line.style_number)
        .bind(&line.item_description)
        .bind(&line.color)
        .bind(line.size.as_str())
        .bind(line.packing_slip_match.as_str())
        .bind(line.qty_short)
        .bind(line.qty_heavy)
        .execute(&mut **tx)
        .await?;

        debug!(tag_id, line = idx + 1, style = %line.style_number, "Inserted problem line");
    }

    Ok(tag_id)
}
