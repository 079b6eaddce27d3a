use super::*;
use crate::cursor::SqlType;
use crate::test_utils::{column, ScriptedStatement};
use tl_core::{Record, Value};

const QUERY: &str = "SELECT id,name FROM people";

fn people_statement() -> ScriptedStatement {
    ScriptedStatement::new().with_result(
        QUERY,
        vec![
            column("id", SqlType::Integer),
            column("name", SqlType::Other(SqlType::VARCHAR_CODE)),
        ],
        vec![
            vec![Value::Integer(1), Value::from("ada")],
            vec![Value::Integer(2), Value::from("grace")],
        ],
    )
}

#[test]
fn test_build_query_joins_terms() {
    assert_eq!(build_query("T", ["a", "b", "c"]), "SELECT a,b,c FROM T");
}

#[test]
fn test_build_query_single_term() {
    assert_eq!(build_query("T", ["count(*)"]), "SELECT count(*) FROM T");
}

#[test]
fn test_build_query_empty_terms_is_not_sanitized() {
    assert_eq!(build_query("T", Vec::<&str>::new()), "SELECT  FROM T");
}

#[test]
fn test_build_query_terms_are_verbatim() {
    let terms = vec!["a AS \"x y\"".to_string(), "b+1".to_string()];
    assert_eq!(
        build_query("s.t", &terms),
        "SELECT a AS \"x y\",b+1 FROM s.t"
    );
}

#[test]
fn test_build_source_display_is_query() {
    let source = build_source(people_statement(), "people", ["id", "name"]);
    assert_eq!(source.query(), QUERY);
    assert_eq!(source.to_string(), QUERY);
}

#[test]
fn test_each_sequence_reexecutes_query() {
    let mut statement = people_statement();
    {
        let mut source = build_source(&mut statement, "people", ["id", "name"]);

        let first: Vec<Record> = source
            .produce_sequence()
            .unwrap()
            .collect::<DbResult<_>>()
            .unwrap();
        let second: Vec<Record> = source
            .produce_sequence()
            .unwrap()
            .collect::<DbResult<_>>()
            .unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(first[1].get("name"), Some(&Value::from("grace")));
    }
    assert_eq!(statement.executed(), &[QUERY.to_string(), QUERY.to_string()]);
    assert_eq!(statement.probe().open_cursors(), 0);
}

#[test]
fn test_closed_sequence_frees_statement() {
    let mut source = QuerySource::new(people_statement(), QUERY);

    let mut first = source.produce_sequence().unwrap();
    first.take_next().unwrap();
    first.close().unwrap();
    drop(first);

    let records: Vec<Record> = source
        .produce_sequence()
        .unwrap()
        .collect::<DbResult<_>>()
        .unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn test_overlapping_sequence_is_rejected() {
    // The scripted cursor does not borrow its statement, so overlap is
    // expressible here; the statement refuses it instead.
    let mut statement = people_statement();
    let probe = statement.probe();
    let mut first = {
        let cursor = statement.execute_query(QUERY).unwrap();
        crate::TypeMappedCursor::new(cursor).unwrap()
    };

    let mut source = QuerySource::new(&mut statement, QUERY);
    let err = source.produce_sequence().unwrap_err();
    assert!(matches!(err, DbError::ExecutionError(_)));
    assert!(err.to_string().contains("open result cursor"));
    assert!(err.to_string().contains(QUERY));

    // The earlier sequence is untouched by the rejected request
    assert_eq!(first.take_next().unwrap().get("id"), Some(&Value::Integer(1)));
    assert_eq!(first.take_next().unwrap().get("id"), Some(&Value::Integer(2)));
    assert!(!first.has_next());
    assert_eq!(probe.open_cursors(), 0);
}

#[test]
fn test_execution_failure_is_fatal_and_names_query() {
    let mut source = QuerySource::new(ScriptedStatement::new(), "SELECT * FROM nowhere");
    let err = source.produce_sequence().unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("SELECT * FROM nowhere"));
}

#[test]
fn test_into_statement_returns_handle() {
    let mut source = QuerySource::new(people_statement(), QUERY);
    source.produce_sequence().unwrap().for_each(drop);
    let statement = source.into_statement();
    assert_eq!(statement.executed().len(), 1);
}
