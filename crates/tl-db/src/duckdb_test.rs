use super::*;
use crate::query::{build_source, QuerySource};
use tl_core::Record;

fn seeded() -> DuckDbBackend {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch_sync(
        "CREATE TABLE nums AS SELECT range AS n, range * 10 AS tens, 'row' || range::VARCHAR AS label FROM range(5)",
    )
    .unwrap();
    db
}

#[tokio::test]
async fn test_in_memory() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(db.db_type(), "duckdb");
}

#[tokio::test]
async fn test_new_memory_path() {
    let db = DuckDbBackend::new(":memory:").unwrap();
    db.execute_batch("CREATE TABLE t (id INT)").await.unwrap();
    assert!(db.relation_exists("t").await.unwrap());
}

#[tokio::test]
async fn test_from_path_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.duckdb");
    {
        let db = DuckDbBackend::from_path(&path).unwrap();
        db.execute_batch("CREATE TABLE kept AS SELECT 1 AS id")
            .await
            .unwrap();
    }
    let db = DuckDbBackend::from_path(&path).unwrap();
    assert!(db.relation_exists("kept").await.unwrap());
}

#[tokio::test]
async fn test_query_count() {
    let db = seeded();
    let count = db.query_count("SELECT * FROM nums").await.unwrap();
    assert_eq!(count, 5);
}

#[tokio::test]
async fn test_execute_batch() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE t1 (id INT); CREATE TABLE t2 (id INT); INSERT INTO t1 VALUES (1);",
    )
    .await
    .unwrap();

    assert!(db.relation_exists("t1").await.unwrap());
    assert!(db.relation_exists("t2").await.unwrap());
}

#[tokio::test]
async fn test_execute_returns_affected_rows() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT)").await.unwrap();
    let affected = db
        .execute("INSERT INTO t VALUES (1), (2), (3)")
        .await
        .unwrap();
    assert_eq!(affected, 3);
}

#[tokio::test]
async fn test_relation_not_exists() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert!(!db.relation_exists("nonexistent").await.unwrap());
}

#[tokio::test]
async fn test_relation_exists_qualified() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE SCHEMA staging; CREATE TABLE staging.orders (id INT)")
        .await
        .unwrap();
    assert!(db.relation_exists("staging.orders").await.unwrap());
    assert!(!db.relation_exists("orders").await.unwrap());
}

#[tokio::test]
async fn test_drop_if_exists() {
    let db = seeded();
    assert!(db.relation_exists("nums").await.unwrap());

    db.drop_if_exists("nums").await.unwrap();
    assert!(!db.relation_exists("nums").await.unwrap());

    // Dropping again is not an error
    db.drop_if_exists("nums").await.unwrap();
}

#[tokio::test]
async fn test_insert_rows_binds_typed_values() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE people (id BIGINT, name VARCHAR, born DATE, score DOUBLE)")
        .await
        .unwrap();

    let rows = vec![
        vec![
            Value::BigInt(1),
            Value::from("ada"),
            Value::Date(NaiveDate::from_ymd_opt(1815, 12, 10).unwrap()),
            Value::Double(9.5),
        ],
        vec![Value::BigInt(2), Value::from("grace"), Value::Null, Value::Null],
    ];
    let inserted = db
        .insert_rows("INSERT INTO people VALUES (?, ?, ?, ?)", &rows)
        .await
        .unwrap();
    assert_eq!(inserted, 2);

    let records: Vec<Record> = db
        .with_statement(|stmt| {
            let mut source = QuerySource::new(stmt, "SELECT * FROM people ORDER BY id");
            let records = source.produce_sequence()?.collect::<DbResult<_>>()?;
            Ok(records)
        })
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0].get("born"),
        Some(&Value::Date(NaiveDate::from_ymd_opt(1815, 12, 10).unwrap()))
    );
    assert_eq!(records[1].get("born"), Some(&Value::Null));
    assert_eq!(records[1].get("score"), Some(&Value::Null));
}

#[tokio::test]
async fn test_insert_rows_rolls_back_on_failure() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INTEGER NOT NULL)")
        .await
        .unwrap();

    let rows = vec![vec![Value::Integer(1)], vec![Value::Null]];
    let result = db.insert_rows("INSERT INTO t VALUES (?)", &rows).await;
    assert!(result.is_err());
    assert_eq!(db.query_count("SELECT * FROM t").await.unwrap(), 0);
}

#[test]
fn test_cursor_decodes_declared_types() {
    let db = DuckDbBackend::in_memory().unwrap();
    let sql = "SELECT DATE '2024-01-02' AS d, \
               TIME '10:11:12' AS t, \
               TIMESTAMP '2024-01-02 03:04:05' AS ts, \
               5::BIGINT AS b, \
               1.5::DOUBLE AS dbl, \
               0.5::REAL AS f, \
               7::INTEGER AS i, \
               3::SMALLINT AS s, \
               12.34::DECIMAL(10,2) AS n, \
               'txt' AS v, \
               true AS flag";

    let (types, record) = db
        .with_statement(|stmt| {
            let mut source = QuerySource::new(stmt, sql);
            let mut seq = source.produce_sequence()?;
            let types: Vec<SqlType> = seq
                .column_descriptors()
                .iter()
                .map(|c| c.sql_type)
                .collect();
            let record = seq.take_next()?;
            assert!(!seq.has_next());
            Ok((types, record))
        })
        .unwrap();

    assert_eq!(
        types,
        vec![
            SqlType::Date,
            SqlType::Time,
            SqlType::Timestamp,
            SqlType::BigInt,
            SqlType::Double,
            SqlType::Float,
            SqlType::Integer,
            SqlType::SmallInt,
            SqlType::Numeric,
            SqlType::Other(SqlType::VARCHAR_CODE),
            SqlType::Other(BOOLEAN_CODE),
        ]
    );
    assert_eq!(
        record.values(),
        &[
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            Value::Time(NaiveTime::from_hms_opt(10, 11, 12).unwrap()),
            Value::Timestamp(
                NaiveDate::from_ymd_opt(2024, 1, 2)
                    .unwrap()
                    .and_hms_opt(3, 4, 5)
                    .unwrap()
            ),
            Value::BigInt(5),
            Value::Double(1.5),
            Value::Float(0.5),
            Value::Integer(7),
            Value::SmallInt(3),
            Value::Double(12.34),
            Value::from("txt"),
            Value::from("true"),
        ]
    );
}

#[test]
fn test_cursor_null_values() {
    let db = DuckDbBackend::in_memory().unwrap();
    let record = db
        .with_statement(|stmt| {
            let mut source = QuerySource::new(
                stmt,
                "SELECT NULL::BIGINT AS b, NULL::DATE AS d, NULL::VARCHAR AS v",
            );
            let mut seq = source.produce_sequence()?;
            seq.take_next()
        })
        .unwrap();
    assert!(record.values().iter().all(Value::is_null));
}

#[test]
fn test_cursor_rows_and_columns_in_order() {
    let db = seeded();
    let records: Vec<Record> = db
        .with_statement(|stmt| {
            let mut source = build_source(stmt, "nums ORDER BY n", ["n", "tens", "label"]);
            let records = source.produce_sequence()?.collect::<DbResult<_>>()?;
            Ok(records)
        })
        .unwrap();

    assert_eq!(records.len(), 5);
    for (i, record) in records.iter().enumerate() {
        let n = i as i64;
        assert_eq!(record.len(), 3);
        assert_eq!(record.origin(), crate::DB_ORIGIN);
        assert_eq!(
            record.values(),
            &[
                Value::BigInt(n),
                Value::BigInt(n * 10),
                Value::Text(format!("row{}", n)),
            ]
        );
    }
}

#[test]
fn test_cursor_headers_are_normalized() {
    let db = DuckDbBackend::in_memory().unwrap();
    let headers = db
        .with_statement(|stmt| {
            let mut source = QuerySource::new(stmt, "SELECT 1 AS \"Order ID\", 2 AS \"order-id\"");
            let seq = source.produce_sequence()?;
            Ok(seq.headers().to_vec())
        })
        .unwrap();
    assert_eq!(headers, vec!["Order_ID", "order_id_2"]);
}

#[test]
fn test_cursor_empty_result() {
    let db = seeded();
    db.with_statement(|stmt| {
        let mut source = build_source(stmt, "nums WHERE n > 100", ["n"]);
        let mut seq = source.produce_sequence()?;
        assert!(!seq.has_next());
        assert!(seq.headers().is_empty());
        assert!(matches!(seq.take_next(), Err(DbError::Exhausted)));
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_source_reused_sequentially() {
    let db = seeded();
    let (first, second) = db
        .with_statement(|stmt| {
            let mut source = build_source(stmt, "nums", ["count(*) AS c"]);
            let first: Vec<Record> = source.produce_sequence()?.collect::<DbResult<_>>()?;
            let second: Vec<Record> = source.produce_sequence()?.collect::<DbResult<_>>()?;
            Ok((first, second))
        })
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0].get("c"), Some(&Value::BigInt(5)));
}

#[test]
fn test_statement_reused_across_sources() {
    let db = seeded();
    db.with_statement(|stmt| {
        let mut small = build_source(&mut *stmt, "nums WHERE n < 2", ["n"]);
        assert_eq!(small.produce_sequence()?.count(), 2);

        let mut large = build_source(&mut *stmt, "nums", ["n"]);
        assert_eq!(large.produce_sequence()?.count(), 5);
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_missing_table_is_fatal() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db
        .with_statement(|stmt| {
            let mut source = build_source(stmt, "missing", ["a"]);
            source.produce_sequence().map(|_| ())
        })
        .unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn test_cursor_renders_other_types_as_duckdb_text() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch_sync("CREATE TYPE mood AS ENUM ('sad', 'happy')")
        .unwrap();
    let sql = "SELECT INTERVAL 1 DAY AS iv, \
               INTERVAL '1 year 2 months 3 days 04:05:06.5' AS span, \
               [1, 2] AS l, \
               'happy'::mood AS m";

    let (types, record) = db
        .with_statement(|stmt| {
            let mut source = QuerySource::new(stmt, sql);
            let mut seq = source.produce_sequence()?;
            let types: Vec<SqlType> = seq
                .column_descriptors()
                .iter()
                .map(|c| c.sql_type)
                .collect();
            Ok((types, seq.take_next()?))
        })
        .unwrap();

    assert!(types.iter().all(|t| matches!(t, SqlType::Other(_))));
    assert_eq!(
        record.values(),
        &[
            Value::from("1 day"),
            Value::from("1 year 2 months 3 days 04:05:06.5"),
            Value::from("[1, 2]"),
            Value::from("happy"),
        ]
    );
}

#[test]
fn test_interval_text() {
    assert_eq!(interval_text(0, 0, 0), "00:00:00");
    assert_eq!(interval_text(0, 2, 0), "2 days");
    assert_eq!(interval_text(14, 0, 0), "1 year 2 months");
    assert_eq!(interval_text(0, 0, 3_600_000_000_000), "01:00:00");
    assert_eq!(interval_text(0, -1, -90_000_000_000), "-1 day -00:01:30");
}

#[test]
fn test_sql_type_for_arrow_types() {
    assert_eq!(sql_type_for(&DataType::Int64), SqlType::BigInt);
    assert_eq!(sql_type_for(&DataType::Int16), SqlType::SmallInt);
    assert_eq!(sql_type_for(&DataType::Decimal128(18, 3)), SqlType::Numeric);
    assert_eq!(
        sql_type_for(&DataType::Utf8),
        SqlType::Other(SqlType::VARCHAR_CODE)
    );
    assert_eq!(
        sql_type_for(&DataType::UInt32),
        SqlType::Other(SqlType::OTHER_CODE)
    );
}
