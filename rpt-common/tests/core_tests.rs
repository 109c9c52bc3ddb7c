//! End-to-end behavior through the `Core` facade on a file-backed database

use chrono::NaiveDate;
use futures::future::join_all;
use rpt_common::aggregation::{GroupBy, RankBy, TimeBucket};
use rpt_common::db::{
    Database, DateRange, PackingSlipMatch, ProblemLineInput, ProblemTagInput, ShortHeavyTag,
    Size, TagFilter,
};
use rpt_common::draft::TagDraft;
use rpt_common::{Core, Error};
use tempfile::TempDir;

async fn setup() -> (TempDir, Database, Core) {
    let dir = TempDir::new().unwrap();
    let db = Database::init(&dir.path().join("problems.db")).await.unwrap();
    let core = Core::new(db.pool().clone());
    (dir, db, core)
}

fn jan(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn january() -> DateRange {
    DateRange::new(jan(1), jan(31)).unwrap()
}

fn header(customer_id: i64, date: NaiveDate) -> ProblemTagInput {
    ProblemTagInput {
        date_found: Some(date),
        po_number: "PO-1001".to_string(),
        customer_id: Some(customer_id),
        job_name: "Spring Tees".to_string(),
        team_name: "Screenprint".to_string(),
        author_name: "Randi".to_string(),
        problem_type: "Damaged in Production".to_string(),
        ..Default::default()
    }
}

fn line(style: &str, size: &str, qty_short: Option<i64>) -> ProblemLineInput {
    ProblemLineInput {
        style_number: style.to_string(),
        item_description: "Tee".to_string(),
        color: "Black".to_string(),
        size: size.to_string(),
        qty_short,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_submit_then_fetch_lines_round_trip() {
    let (_dir, _db, core) = setup().await;
    let acme = core.get_or_create_customer("Acme").await.unwrap();

    let mut first = line("A1", "XL", Some(2));
    first.short_heavy_tag = "Short".to_string();
    first.packing_slip_match = PackingSlipMatch::NoMatch;
    let second = line("B2", "YM", None);
    let mut third = line("C3", "OSFA", None);
    third.qty_heavy = Some(4);

    let tag_id = core
        .submit_problem_tag(&header(acme, jan(5)), &[first, second, third])
        .await
        .unwrap();

    let stored = core.fetch_lines(tag_id).await.unwrap();
    let styles: Vec<&str> = stored.iter().map(|l| l.style_number.as_str()).collect();
    assert_eq!(styles, vec!["A1", "B2", "C3"]);
    assert_eq!(stored[0].size, Size::Xl);
    assert_eq!(stored[0].short_heavy_tag, ShortHeavyTag::Short);
    assert_eq!(stored[0].packing_slip_match, PackingSlipMatch::NoMatch);
    assert_eq!(stored[0].qty_short, Some(2));
    assert_eq!(stored[1].qty_short, None);
    assert_eq!(stored[1].packing_slip_match, PackingSlipMatch::Unknown);
    assert_eq!(stored[2].qty_heavy, Some(4));
    assert!(stored.iter().all(|l| l.tag_id == tag_id));
}

#[tokio::test]
async fn test_zero_lines_rejected_without_rows() {
    let (_dir, db, core) = setup().await;
    let acme = core.get_or_create_customer("Acme").await.unwrap();

    let err = core.submit_problem_tag(&header(acme, jan(5)), &[]).await.unwrap_err();
    match err {
        Error::Validation(errors) => assert!(errors
            .messages()
            .iter()
            .any(|m| m.contains("At least one"))),
        other => panic!("expected validation error, got {:?}", other),
    }

    let headers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM receiving_problem_tags")
        .fetch_one(db.pool())
        .await
        .unwrap();
    let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM receiving_problem_lines")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!((headers, lines), (0, 0));
}

#[tokio::test]
async fn test_concurrent_get_or_create_yields_one_row() {
    let (_dir, db, core) = setup().await;

    let calls = (0..16).map(|_| {
        let core = core.clone();
        async move { core.get_or_create_customer("Acme").await }
    });
    let ids: Vec<i64> = join_all(calls)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE customer_name = 'Acme'")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_january_acme_error_rate() {
    let (_dir, _db, core) = setup().await;
    let acme = core.get_or_create_customer("Acme").await.unwrap();

    let mut draft = TagDraft::new();
    {
        let first = draft.line_mut(0).unwrap();
        first.style_number = "A1".to_string();
        first.item_description = "Tee".to_string();
        first.color = "Black".to_string();
        first.qty_short = Some(5);
        first.qty_heavy = Some(0);
    }
    core.submit_problem_tag(&header(acme, jan(5)), &draft.into_lines())
        .await
        .unwrap();
    core.record_daily_actual(jan(5), 12, 100, "Randi", "").await.unwrap();

    let groups = core
        .aggregate(&january(), &TagFilter::default(), GroupBy::Customer, TimeBucket::Month, RankBy::ErrorRate)
        .await
        .unwrap();

    assert_eq!(groups.len(), 1);
    let acme_jan = &groups[0];
    assert_eq!(acme_jan.group_id, Some(acme));
    assert_eq!(
        (acme_jan.orders_with_issue, acme_jan.error_units, acme_jan.total_units),
        (1, 5, 100)
    );
    assert_eq!(acme_jan.error_rate, 0.05);
}

#[tokio::test]
async fn test_deactivated_customer_keeps_history() {
    let (_dir, _db, core) = setup().await;
    let acme = core.get_or_create_customer("Acme").await.unwrap();
    let tag_id = core
        .submit_problem_tag(&header(acme, jan(8)), &[line("A1", "M", Some(1))])
        .await
        .unwrap();

    core.registry()
        .set_active(rpt_common::registry::RegistryKind::Customer, acme, false)
        .await
        .unwrap();

    assert!(core.list_customers().await.unwrap().is_empty());

    let headers = core.fetch_headers(&january(), &TagFilter::default()).await.unwrap();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].id, tag_id);
    assert_eq!(headers[0].customer_name, "Acme");

    let groups = core
        .aggregate(&january(), &TagFilter::default(), GroupBy::Customer, TimeBucket::Total, RankBy::Name)
        .await
        .unwrap();
    assert_eq!(groups[0].name, "Acme");
}
