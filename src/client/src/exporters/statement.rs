use crate::exporters::db::Statement;
use eventsink_common::constants::COLUMN_COUNT;
use eventsink_common::event::ParsedRecord;

/// Zero-based column whose placeholder is cast so that text parameters are
/// converted to `timestamptz` by the server.
const TIMESTAMP_COLUMN: usize = 3;

pub fn create_table_statement(table_name: &str) -> Statement {
    Statement::new(format!(
        "CREATE TABLE IF NOT EXISTS public.{table_name} (
            feedback_type varchar(200),
            user_id varchar(200),
            item_id varchar(200),
            time_stamp timestamp with time zone,
            comment varchar(200)
        );"
    ))
}

/// Renders `($1, $2, $3, $4::timestamptz, $5), ($6, ...)` for `rows` rows.
///
/// Row `i` always owns parameters `5i+1 ..= 5i+5`. Built by hand rather than
/// with `sqlx::QueryBuilder::push_values` so a [`Statement`] stays plain data
/// that any [`QueryExecutor`](crate::exporters::db::QueryExecutor) can run
/// and tests can inspect without a database.
pub fn values_placeholders(rows: usize) -> String {
    (0..rows)
        .map(|row| {
            let slots = (0..COLUMN_COUNT)
                .map(|column| {
                    let position = COLUMN_COUNT * row + column + 1;
                    if column == TIMESTAMP_COLUMN {
                        format!("${position}::timestamptz")
                    } else {
                        format!("${position}")
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("({slots})")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// One multi-row insert for the whole batch, parameters flattened in row then column order.
pub fn insert_statement(table_name: &str, batch: &[ParsedRecord]) -> Statement {
    let sql = format!(
        "INSERT INTO {table_name} ({})\n        VALUES {}",
        ParsedRecord::COLUMNS.join(", "),
        values_placeholders(batch.len())
    );

    let params = batch
        .iter()
        .flat_map(|record| record.params())
        .map(str::to_string)
        .collect();

    Statement { sql, params }
}
