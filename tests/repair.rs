//! Integration tests for backfill repair.
//! Tests: append-only, idempotence, per-record mode, createdAt order, response shape

use tempfile::TempDir;
use vidcat_core::{
    Catalog, CatalogConfig, ContentRecord, ImportOptions, ImportRecord, ListQuery, NewRecord,
    RepairMode, RepairOptions,
};

// 2025-12-27T03:00:00Z, noon in Seoul
const NOON: i64 = 1_766_804_400_000;
const HOUR: i64 = 3_600_000;

fn legacy(management_id: Option<&str>, created_at_ms: i64, title: &str) -> ImportRecord {
    ImportRecord {
        management_id: management_id.map(str::to_string),
        created_at_ms,
        title: Some(title.to_string()),
        ..Default::default()
    }
}

fn import(catalog: &mut Catalog, rows: Vec<ImportRecord>) -> Vec<ContentRecord> {
    catalog.import_records(rows, ImportOptions::default()).unwrap()
}

fn by_title<'a>(records: &'a [ContentRecord], title: &str) -> &'a ContentRecord {
    records
        .iter()
        .find(|record| record.title.as_deref() == Some(title))
        .unwrap()
}

#[test]
fn fully_identified_catalog_is_left_alone() {
    let mut catalog = Catalog::open_in_memory(CatalogConfig::default()).unwrap();
    for _ in 0..3 {
        catalog
            .create_record(NewRecord::builder().created_at_ms(NOON).build())
            .unwrap();
    }
    let before = catalog.list_records(&ListQuery::default()).unwrap();

    let report = catalog.repair(RepairOptions::default()).unwrap();
    assert_eq!(report.updated, 0);
    assert!(report.assignments.is_empty());
    assert_eq!(catalog.list_records(&ListQuery::default()).unwrap(), before);
}

#[test]
fn second_run_is_a_noop() {
    let mut catalog = Catalog::open_in_memory(CatalogConfig::default()).unwrap();
    import(
        &mut catalog,
        vec![
            legacy(None, NOON, "a"),
            legacy(Some("   "), NOON + 1, "b"),
            legacy(None, NOON + 2, "c"),
        ],
    );

    let first = catalog.repair(RepairOptions::default()).unwrap();
    assert_eq!(first.updated, 3);
    assert_eq!(first.to_response().updated, 3);
    assert!(catalog.plan_repair().unwrap().is_noop());

    let second = catalog.repair(RepairOptions::default()).unwrap();
    assert_eq!(second.updated, 0);
    let response = serde_json::to_value(second.to_response()).unwrap();
    assert_eq!(response, serde_json::json!({ "ok": true, "updated": 0 }));
}

/// Existing identifiers, well-formed or not, keep their exact text; blanks
/// continue after the stored maximum of their own bucket.
#[test]
fn existing_identifiers_are_never_rewritten() {
    let mut catalog = Catalog::open_in_memory(CatalogConfig::default()).unwrap();
    import(
        &mut catalog,
        vec![
            legacy(Some("251227-05"), NOON, "kept"),
            legacy(Some("2025-12-27 #3"), NOON, "legacy"),
            legacy(None, NOON + HOUR, "blank"),
        ],
    );

    let report = catalog.repair(RepairOptions::default()).unwrap();
    assert_eq!(report.updated, 1);

    let records = catalog.list_records(&ListQuery::default()).unwrap();
    assert_eq!(
        by_title(&records, "kept").management_id.as_deref(),
        Some("251227-05")
    );
    assert_eq!(
        by_title(&records, "legacy").management_id.as_deref(),
        Some("2025-12-27 #3")
    );
    assert_eq!(
        by_title(&records, "blank").management_id.as_deref(),
        Some("251227-06")
    );
}

/// Each row is bucketed by its own creation time and numbered in creation
/// order, regardless of insertion order.
#[test]
fn assignments_follow_creation_time() {
    let mut catalog = Catalog::open_in_memory(CatalogConfig::default()).unwrap();
    let next_day = NOON + 24 * HOUR;
    import(
        &mut catalog,
        vec![
            legacy(None, NOON + 2 * HOUR, "third"),
            legacy(None, next_day, "next-day"),
            legacy(None, NOON, "first"),
            legacy(None, NOON + HOUR, "second"),
        ],
    );

    let report = catalog.repair(RepairOptions::default()).unwrap();
    let assigned: Vec<_> = report
        .assignments
        .iter()
        .map(|a| a.management_id.as_str())
        .collect();
    assert_eq!(
        assigned,
        vec!["251227-01", "251227-02", "251227-03", "251228-01"]
    );

    let records = catalog.list_records(&ListQuery::default()).unwrap();
    assert_eq!(
        by_title(&records, "first").management_id.as_deref(),
        Some("251227-01")
    );
    assert_eq!(
        by_title(&records, "third").management_id.as_deref(),
        Some("251227-03")
    );
    assert_eq!(
        by_title(&records, "next-day").management_id.as_deref(),
        Some("251228-01")
    );
}

#[test]
fn partitions_are_repaired_independently() {
    let mut catalog = Catalog::open_in_memory(CatalogConfig::default()).unwrap();
    let mut rows = vec![legacy(Some("251227-01"), NOON, "a-existing")];
    rows[0].partition_key = Some("site-a".to_string());
    let mut blank_a = legacy(None, NOON + 1, "a-blank");
    blank_a.partition_key = Some("site-a".to_string());
    let mut blank_b = legacy(None, NOON + 2, "b-blank");
    blank_b.partition_key = Some("site-b".to_string());
    rows.push(blank_a);
    rows.push(blank_b);
    import(&mut catalog, rows);

    catalog.repair(RepairOptions::default()).unwrap();
    let records = catalog.list_records(&ListQuery::default()).unwrap();
    assert_eq!(
        by_title(&records, "a-blank").management_id.as_deref(),
        Some("251227-02")
    );
    assert_eq!(
        by_title(&records, "b-blank").management_id.as_deref(),
        Some("251227-01")
    );
}

#[test]
fn per_record_mode_resumes_after_partial_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.db");
    let config = CatalogConfig::default().with_repair_mode(RepairMode::PerRecord);
    {
        let mut catalog = Catalog::open(&path, config.clone()).unwrap();
        import(
            &mut catalog,
            (0..5)
                .map(|i| legacy(None, NOON + i, &format!("row-{i}")))
                .collect(),
        );
        let partial = catalog
            .repair(RepairOptions {
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(partial.mode, RepairMode::PerRecord);
        assert_eq!(partial.updated, 2);
    }

    let mut catalog = Catalog::open(&path, config).unwrap();
    let plan = catalog.plan_repair().unwrap();
    assert_eq!(plan.pending, 3);
    assert_eq!(plan.assignments[0].management_id, "251227-03");

    let rest = catalog.repair(RepairOptions::default()).unwrap();
    assert_eq!(rest.updated, 3);
    let mut ids: Vec<_> = catalog
        .list_records(&ListQuery::default())
        .unwrap()
        .into_iter()
        .map(|record| record.management_id.unwrap())
        .collect();
    ids.sort();
    assert_eq!(
        ids,
        vec!["251227-01", "251227-02", "251227-03", "251227-04", "251227-05"]
    );
}

/// A live insert after repair continues the sequence the repairer left.
#[test]
fn live_allocation_continues_after_repair() {
    let mut catalog = Catalog::open_in_memory(CatalogConfig::default()).unwrap();
    import(
        &mut catalog,
        vec![legacy(None, NOON, "a"), legacy(None, NOON + 1, "b")],
    );
    catalog
        .repair(RepairOptions {
            mode: Some(RepairMode::SingleTransaction),
            limit: None,
        })
        .unwrap();

    let created = catalog
        .create_record(NewRecord::builder().created_at_ms(NOON + 2).build())
        .unwrap();
    assert_eq!(created.management_id.as_deref(), Some("251227-03"));
}

/// Repair and live allocation agree on the maximum when a bucket mixes widths.
#[test]
fn mixed_width_bucket_keeps_both_paths_unique() {
    let mut catalog = Catalog::open_in_memory(CatalogConfig::default()).unwrap();
    import(
        &mut catalog,
        vec![
            legacy(Some("251227-001"), NOON, "one"),
            legacy(Some("251227-002"), NOON, "two"),
            legacy(Some("251227-003"), NOON, "three"),
            legacy(None, NOON + 1, "blank"),
        ],
    );

    let report = catalog.repair(RepairOptions::default()).unwrap();
    assert_eq!(report.assignments[0].management_id, "251227-04");

    let created = catalog
        .create_record(NewRecord::builder().created_at_ms(NOON + 2).build())
        .unwrap();
    assert_eq!(created.management_id.as_deref(), Some("251227-05"));
}
