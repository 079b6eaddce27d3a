//! SQL identifier quoting for generated DDL and DML

/// Quote a SQL identifier, doubling embedded double quotes.
///
/// # Examples
/// ```
/// use tl_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("amount"), r#""amount""#);
/// assert_eq!(quote_ident(r#"say "hi""#), r#""say ""hi""""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a possibly schema-qualified table name, one component at a time.
///
/// # Examples
/// ```
/// use tl_core::sql_utils::quote_qualified;
/// assert_eq!(quote_qualified("staging.orders"), r#""staging"."orders""#);
/// ```
pub fn quote_qualified(name: &str) -> String {
    name.split('.').map(quote_ident).collect::<Vec<_>>().join(".")
}

/// Split `schema.table` on the last dot, defaulting the schema to `main`.
pub fn split_qualified_name(name: &str) -> (&str, &str) {
    match name.rsplit_once('.') {
        Some((schema, table)) => (schema, table),
        None => ("main", name),
    }
}
