//! SQL string helpers
//!
//! Table names in macros and manifests arrive as plain text, optionally
//! schema-qualified (`schema.table`). These helpers split names, build
//! literals, and split comma lists.

/// Split a potentially schema-qualified table name into (schema, table).
///
/// Uses the last `.` as the separator. Unqualified names have no schema.
///
/// # Examples
/// ```
/// use up_core::sql_utils::split_qualified_name;
/// assert_eq!(split_qualified_name("users"), (None, "users"));
/// assert_eq!(split_qualified_name("dvm.sat_hosts"), (Some("dvm"), "sat_hosts"));
/// ```
pub fn split_qualified_name(name: &str) -> (Option<&str>, &str) {
    match name.rfind('.') {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

/// Escape a SQL string literal value by doubling single quotes.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Render a value as a SQL literal: bare when numeric, quoted otherwise.
pub fn sql_literal(value: &str, numeric: bool) -> String {
    if numeric {
        value.to_string()
    } else {
        format!("'{}'", escape_sql_string(value))
    }
}

/// Split a comma-separated identifier list, trimming blanks.
///
/// # Examples
/// ```
/// use up_core::sql_utils::split_list;
/// assert_eq!(split_list(" a, b ,c"), vec!["a", "b", "c"]);
/// ```
pub fn split_list(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Return `Some(trimmed)` for non-blank text, `None` otherwise.
pub fn non_blank(s: &str) -> Option<&str> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t)
    }
}

/// Interpret a boolean-ish attribute value (`true`, `1`, `yes`, `on`).
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "y" | "t"
    )
}
