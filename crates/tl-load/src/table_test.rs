use super::*;
use crate::reader::DelimitedSource;
use chrono::NaiveDate;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tl_db::test_utils::{column, ScriptedStatement};
use tl_db::{build_source, DbError, DuckDbBackend, QuerySource, SqlType};

fn write_input(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn text_record(headers: &Arc<[String]>, values: &[&str]) -> LoadResult<Record> {
    Ok(Record::new(
        "mem",
        Arc::clone(headers),
        values.iter().map(|v| Value::from(*v)).collect(),
    )?)
}

fn headers(names: &[&str]) -> Arc<[String]> {
    names.iter().map(|n| n.to_string()).collect::<Vec<_>>().into()
}

fn read_back(db: &DuckDbBackend, sql: &str) -> Vec<Record> {
    db.with_statement(|stmt| {
        let mut source = QuerySource::new(stmt, sql);
        let records = source.produce_sequence()?.collect::<Result<_, DbError>>()?;
        Ok(records)
    })
    .unwrap()
}

#[test]
fn test_scan_infers_column_defs() {
    let h = headers(&["id", "price", "day", "note"]);
    let records = vec![
        text_record(&h, &["1", "2.5", "2024-01-01", "a"]),
        text_record(&h, &["2", "3", "2024-01-02", "bcd"]),
    ];

    let mut control = TableControl::new("items");
    let rows = control.scan_for_defs("mem", records).unwrap();

    assert_eq!(rows, 2);
    let types: Vec<InferredType> = control.column_defs().iter().map(|d| d.sql_type).collect();
    assert_eq!(
        types,
        vec![
            InferredType::BigInt,
            InferredType::Double,
            InferredType::Date,
            InferredType::Varchar
        ]
    );
    assert_eq!(control.column_defs()[3].max_width, 3);
}

#[test]
fn test_scan_matches_later_records_by_name() {
    let first = headers(&["a", "b"]);
    let reordered = headers(&["b", "a"]);
    let records = vec![
        text_record(&first, &["1", "x"]),
        text_record(&reordered, &["y", "2"]),
        text_record(&headers(&["a"]), &["3"]),
    ];

    let mut control = TableControl::new("t");
    control.scan_for_defs("mem", records).unwrap();
    assert_eq!(control.column_defs()[0].sql_type, InferredType::BigInt);
    assert_eq!(control.column_defs()[1].sql_type, InferredType::Varchar);
}

#[test]
fn test_scan_propagates_record_errors() {
    let records: Vec<LoadResult<Record>> = vec![Err(LoadError::MissingHeader {
        source_name: "mem".to_string(),
    })];
    let mut control = TableControl::new("t");
    assert!(control.scan_for_defs("mem", records).is_err());
}

#[test]
fn test_build_sql_statements() {
    let h = headers(&["id", "Full Name"]);
    let mut control = TableControl::new("staging.people");
    control
        .scan_for_defs("mem", vec![text_record(&h, &["1", "ada"])])
        .unwrap();
    control.build_sql_statements().unwrap();

    assert_eq!(
        control.create_sql(),
        Some("CREATE TABLE \"staging\".\"people\" (\"id\" BIGINT, \"Full Name\" VARCHAR)")
    );
    assert_eq!(
        control.insert_sql(),
        Some("INSERT INTO \"staging\".\"people\" (\"id\", \"Full Name\") VALUES (?, ?)")
    );
}

#[test]
fn test_build_without_scan_fails() {
    let mut control = TableControl::new("t");
    control
        .scan_for_defs("mem", Vec::<LoadResult<Record>>::new())
        .unwrap();
    assert!(matches!(
        control.build_sql_statements(),
        Err(LoadError::NoColumns { .. })
    ));
}

#[tokio::test]
async fn test_create_table_requires_statements() {
    let db = DuckDbBackend::in_memory().unwrap();
    let control = TableControl::new("t");
    assert!(matches!(
        control.create_table(&db).await,
        Err(LoadError::NotPrepared { .. })
    ));
}

#[tokio::test]
async fn test_create_table_replaces_existing() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t AS SELECT 'old' AS legacy")
        .await
        .unwrap();

    let h = headers(&["id"]);
    let mut control = TableControl::new("t");
    control
        .scan_for_defs("mem", vec![text_record(&h, &["1"])])
        .unwrap();
    control.build_sql_statements().unwrap();
    control.create_table(&db).await.unwrap();

    assert!(db.relation_exists("t").await.unwrap());
    assert_eq!(db.query_count("SELECT * FROM t").await.unwrap(), 0);
    assert!(db.query_count("SELECT legacy FROM t").await.is_err());
}

#[tokio::test]
async fn test_load_delimited_file_in_batches() {
    let file = write_input(
        "id,score,born,name\n1,9.5,1815-12-10,ada\n2,,1906-12-09,grace\n3,7,,\"hopper, g\"\n",
    );
    let source = DelimitedSource::new(file.path(), ',')
        .unwrap()
        .with_null_values([""]);
    let db = DuckDbBackend::in_memory().unwrap();

    let mut control = TableControl::new("people").with_batch_size(2);
    control
        .scan_for_defs(&source.name(), source.records().unwrap())
        .unwrap();
    control.build_sql_statements().unwrap();
    control.create_table(&db).await.unwrap();
    let inserted = control
        .load_data(&source.name(), source.records().unwrap(), &db)
        .await
        .unwrap();

    assert_eq!(inserted, 3);
    let records = read_back(&db, "SELECT * FROM people ORDER BY id");
    assert_eq!(records.len(), 3);
    assert_eq!(
        records[0].values(),
        &[
            Value::BigInt(1),
            Value::Double(9.5),
            Value::Date(NaiveDate::from_ymd_opt(1815, 12, 10).unwrap()),
            Value::from("ada"),
        ]
    );
    assert_eq!(records[1].get("score"), Some(&Value::Null));
    assert_eq!(records[2].get("born"), Some(&Value::Null));
    assert_eq!(records[2].get("name"), Some(&Value::from("hopper, g")));
}

#[tokio::test]
async fn test_header_only_file_creates_empty_varchar_table() {
    let file = write_input("id,Full Name\n");
    let source = DelimitedSource::new(file.path(), ',').unwrap();
    let db = DuckDbBackend::in_memory().unwrap();

    let mut control = TableControl::new("empty");
    let rows = control
        .scan_delimited(&source.name(), source.records().unwrap())
        .unwrap();
    assert_eq!(rows, 0);
    let types: Vec<(&str, InferredType)> = control
        .column_defs()
        .iter()
        .map(|d| (d.name.as_str(), d.sql_type))
        .collect();
    assert_eq!(
        types,
        vec![
            ("id", InferredType::Varchar),
            ("Full_Name", InferredType::Varchar)
        ]
    );

    control.build_sql_statements().unwrap();
    control.create_table(&db).await.unwrap();
    let inserted = control
        .load_data(&source.name(), source.records().unwrap(), &db)
        .await
        .unwrap();
    assert_eq!(inserted, 0);
    assert!(db.relation_exists("empty").await.unwrap());
    assert_eq!(db.query_count("SELECT * FROM empty").await.unwrap(), 0);
}

#[test]
fn test_scan_delimited_matches_scan_for_defs_with_rows() {
    let file = write_input("n,label\n1,one\n2,two\n");
    let source = DelimitedSource::new(file.path(), ',').unwrap();

    let mut seeded = TableControl::new("t");
    seeded
        .scan_delimited(&source.name(), source.records().unwrap())
        .unwrap();
    let mut plain = TableControl::new("t");
    plain
        .scan_for_defs(&source.name(), source.records().unwrap())
        .unwrap();

    assert_eq!(seeded.column_defs(), plain.column_defs());
}

#[tokio::test]
async fn test_load_stops_on_unconvertible_value() {
    let db = DuckDbBackend::in_memory().unwrap();
    let h = headers(&["n"]);

    let mut control = TableControl::new("nums").with_batch_size(1);
    control
        .scan_for_defs("mem", vec![text_record(&h, &["1"]), text_record(&h, &["2"])])
        .unwrap();
    control.build_sql_statements().unwrap();
    control.create_table(&db).await.unwrap();

    // The data changed between scan and load
    let err = control
        .load_data(
            "mem",
            vec![text_record(&h, &["1"]), text_record(&h, &["two"])],
            &db,
        )
        .await
        .unwrap_err();

    match err {
        LoadError::Conversion {
            column,
            value,
            sql_type,
            ..
        } => {
            assert_eq!(column, "n");
            assert_eq!(value, "two");
            assert_eq!(sql_type, "BIGINT");
        }
        other => panic!("expected Conversion, got {other:?}"),
    }
    // The first batch was already committed
    assert_eq!(db.query_count("SELECT * FROM nums").await.unwrap(), 1);
}

#[tokio::test]
async fn test_copy_between_databases_through_cursor() {
    let source_db = DuckDbBackend::in_memory().unwrap();
    source_db
        .execute_batch(
            "CREATE TABLE events AS SELECT range::INTEGER AS id, \
             DATE '2024-01-01' + range::INTEGER AS day, \
             (range * 1.5)::DOUBLE AS amount FROM range(4)",
        )
        .await
        .unwrap();

    let query = "SELECT id,day,amount FROM events ORDER BY id";
    let records = read_back(&source_db, query);

    let target_db = DuckDbBackend::in_memory().unwrap();
    let mut control = TableControl::new("events_copy");
    control
        .scan_for_defs(query, records.iter().cloned().map(Ok::<_, DbError>))
        .unwrap();
    control.build_sql_statements().unwrap();

    assert_eq!(
        control
            .column_defs()
            .iter()
            .map(|d| d.sql_type)
            .collect::<Vec<_>>(),
        vec![InferredType::BigInt, InferredType::Date, InferredType::Double]
    );

    control.create_table(&target_db).await.unwrap();
    let inserted = control
        .load_data(query, records.iter().cloned().map(Ok::<_, DbError>), &target_db)
        .await
        .unwrap();
    assert_eq!(inserted, 4);

    let copied = read_back(&target_db, "SELECT * FROM events_copy ORDER BY id");
    assert_eq!(copied[3].get("id"), Some(&Value::BigInt(3)));
    assert_eq!(
        copied[3].get("day"),
        Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 1, 4).unwrap()))
    );
    assert_eq!(copied[3].get("amount"), Some(&Value::Double(4.5)));
}

#[tokio::test]
async fn test_load_from_scripted_sequence() {
    let mut statement = ScriptedStatement::new().with_result(
        "SELECT a FROM src",
        vec![column("a", SqlType::Integer)],
        vec![vec![Value::Integer(10)], vec![Value::Integer(20)]],
    );
    let db = DuckDbBackend::in_memory().unwrap();

    let mut source = build_source(&mut statement, "src", ["a"]);
    let mut control = TableControl::new("dst");
    control
        .scan_for_defs("src", source.produce_sequence().unwrap())
        .unwrap();
    control.build_sql_statements().unwrap();
    control.create_table(&db).await.unwrap();

    let records: Vec<Record> = source
        .produce_sequence()
        .unwrap()
        .collect::<Result<_, DbError>>()
        .unwrap();
    let inserted = control
        .load_data("src", records.into_iter().map(Ok::<_, DbError>), &db)
        .await
        .unwrap();
    assert_eq!(inserted, 2);
    assert_eq!(db.query_count("SELECT * FROM dst WHERE a >= 10").await.unwrap(), 2);
}
