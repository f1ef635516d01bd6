//! SQL text helpers shared by the query compiler

/// Escape SQL LIKE metacharacters (%, _, \) so they match literally
///
/// Patterns built from the result must declare `ESCAPE '\'`.
///
/// # Example
///
/// ```
/// use recordql_server::utils::sql::escape_like_pattern;
///
/// let pattern = format!("%{}%", escape_like_pattern("50%_off"));
/// assert_eq!(pattern, "%50\\%\\_off%");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Comma-separated `?` list for an IN clause
pub fn placeholder_list(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Number of positional placeholders in a fragment
pub fn count_placeholders(sql: &str) -> usize {
    sql.matches('?').count()
}
