use std::error::Error;

use sql_mutation::prelude::*;

fn unavailable(detail: &str) -> NotSupported {
    NotSupported::new(Dialect::Postgres, "last insert id").with_detail(detail)
}

fn returned_ids(ids: &[i64]) -> RecordSet {
    let mut set = RecordSet::with_columns(vec!["id".into()]);
    for id in ids {
        set.add_row_values(vec![RowValues::Int(*id)]);
    }
    set
}

#[test]
fn both_shapes_answer_the_same_questions() -> Result<(), Box<dyn Error>> {
    let results = [
        MutationResult::plain(3, LastInsertId::Value(12)),
        MutationResult::with_records(
            returned_ids(&[10, 11, 12]),
            unavailable("custom returning clause in use"),
        ),
    ];

    for result in &results {
        assert_eq!(result.rows_affected(), 3);
    }
    assert_eq!(results[0].last_insert_id()?, 12);
    assert!(results[1].last_insert_id().unwrap_err().is_not_supported());

    assert!(!results[0].has_records());
    assert!(results[0].records().is_none());
    assert!(results[1].has_records());
    assert_eq!(results[1].records().map(RecordSet::len), Some(3));
    Ok(())
}

#[test]
fn record_count_is_the_affected_count() {
    let empty = MutationResult::with_records(RecordSet::default(), unavailable("no rows"));
    assert_eq!(empty.rows_affected(), 0);
    assert!(empty.has_records());
    assert_eq!(empty.into_records().map(|r| r.is_empty()), Some(true));
}

#[test]
fn a_missing_id_is_never_zero() {
    let result = MutationResult::plain(
        1,
        unavailable("driver does not report generated identifiers"),
    );
    assert_eq!(result.last_insert_id_state().value(), None);

    // every call hands out its own copy of the reason
    let first = result.last_insert_id().unwrap_err().to_string();
    let second = result.last_insert_id().unwrap_err().to_string();
    assert_eq!(first, second);
    assert_eq!(
        first,
        "last insert id is not supported by postgres: driver does not report generated identifiers"
    );
}

#[test]
fn records_resolve_columns_by_name() {
    let mut set = RecordSet::with_columns(vec!["id".into(), "Name".into()]);
    set.add_row_values(vec![RowValues::Int(1), "ann".into()]);
    let result = MutationResult::with_records(set, unavailable("custom returning clause in use"));

    let records = result.records().expect("records present");
    let row = &records[0];
    assert_eq!(row["id"], RowValues::Int(1));
    assert_eq!(row.get("name"), None);
    assert_eq!(row.get_ignore_case("name"), Some(&RowValues::Text("ann".into())));
    assert!(records.has_column("Name"));
    assert_eq!(records.first().map(Record::len), Some(2));
}
