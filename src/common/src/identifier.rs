/// Strips everything but ASCII letters, digits and `_` so the result can be
/// interpolated into SQL as an unquoted identifier.
///
/// Characters are removed, not replaced: `"orders-2024"` becomes `"orders2024"`.
pub fn sanitize_sql_identifier(unquoted_identifier: &str) -> String {
    unquoted_identifier
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
