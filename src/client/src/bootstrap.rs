use std::collections::HashSet;
use std::fmt;

use crate::exporters::db::{QueryError, QueryExecutor};
use crate::exporters::statement::create_table_statement;
use eventsink_common::config::{ConfigError, ExporterConfig};
use eventsink_common::identifier::sanitize_sql_identifier;
use tracing::info;

/// Derived once at startup and shared read-only by every export and upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportState {
    pub table_name: String,
    pub events_to_insert: HashSet<String>,
}

impl ExportState {
    pub fn new(table_name: &str, events_to_insert: Option<&str>) -> Self {
        ExportState {
            table_name: sanitize_sql_identifier(table_name),
            events_to_insert: parse_allow_list(events_to_insert),
        }
    }
}

/// Splits the comma-separated allow-list. Blank entries are dropped, and an
/// absent list lets no event through.
pub fn parse_allow_list(raw: Option<&str>) -> HashSet<String> {
    raw.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Fatal startup failures; the exporter must not accept events after one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    Config(ConfigError),
    EmptyTableName { table_name: String },
    CreateTable(QueryError),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::Config(e) => write!(f, "{}", e),
            SetupError::EmptyTableName { table_name } => write!(
                f,
                "Table name {:?} has no usable characters once sanitized",
                table_name
            ),
            SetupError::CreateTable(e) => write!(
                f,
                "Unable to connect to Postgres instance and create table with error: {}",
                e
            ),
        }
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetupError::Config(e) => Some(e),
            SetupError::EmptyTableName { .. } => None,
            SetupError::CreateTable(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SetupError {
    fn from(err: ConfigError) -> Self {
        SetupError::Config(err)
    }
}

/// Validates the config, makes sure the table exists and builds the export state.
pub async fn setup<E: QueryExecutor>(
    config: &ExporterConfig,
    executor: &E,
) -> Result<ExportState, SetupError> {
    config.validate()?;

    let state = ExportState::new(&config.table_name, config.events_to_insert.as_deref());
    if state.table_name.is_empty() {
        return Err(SetupError::EmptyTableName {
            table_name: config.table_name.clone(),
        });
    }

    executor
        .execute(&create_table_statement(&state.table_name))
        .await
        .map_err(SetupError::CreateTable)?;

    info!(
        "Export table public.{} is ready, accepting {} event name(s)",
        state.table_name,
        state.events_to_insert.len()
    );

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedExecutor;
    use rstest::rstest;

    fn config(table_name: &str, events_to_insert: Option<&str>) -> ExporterConfig {
        ExporterConfig {
            events_to_insert: events_to_insert.map(str::to_string),
            ..ExporterConfig::with_url("postgres://localhost/analytics", table_name)
        }
    }

    #[rstest]
    #[case::absent(None, &[])]
    #[case::empty(Some(""), &[])]
    #[case::blank(Some(" , ,"), &[])]
    #[case::single(Some("feedback"), &["feedback"])]
    #[case::trimmed(Some(" feedback ,rating,  $pageview "), &["feedback", "rating", "$pageview"])]
    #[case::case_kept(Some("Feedback,feedback"), &["Feedback", "feedback"])]
    fn test_parse_allow_list(#[case] raw: Option<&str>, #[case] expected: &[&str]) {
        let expected: HashSet<String> = expected.iter().map(|s| s.to_string()).collect();
        assert_eq!(parse_allow_list(raw), expected);
    }

    #[tokio::test]
    async fn test_setup_creates_sanitized_table() {
        let executor = ScriptedExecutor::new(vec![Ok(0)]);

        let state = setup(&config("feedback-2024", Some("feedback, rating")), &executor)
            .await
            .unwrap();

        assert_eq!(state.table_name, "feedback2024");
        assert_eq!(
            state.events_to_insert,
            HashSet::from(["feedback".to_string(), "rating".to_string()])
        );

        let statements = executor.statements();
        assert_eq!(statements.len(), 1);
        assert!(statements[0]
            .sql
            .starts_with("CREATE TABLE IF NOT EXISTS public.feedback2024 ("));
    }

    #[tokio::test]
    async fn test_setup_with_no_allow_list_is_valid() {
        let executor = ScriptedExecutor::new(vec![Ok(0)]);
        let state = setup(&config("feedback", None), &executor).await.unwrap();
        assert!(state.events_to_insert.is_empty());
    }

    #[tokio::test]
    async fn test_create_table_failure_is_fatal() {
        let executor =
            ScriptedExecutor::new(vec![Err(QueryError::Connect("connection refused".into()))]);

        let err = setup(&config("feedback", Some("feedback")), &executor)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            SetupError::CreateTable(QueryError::Connect("connection refused".into()))
        );
        assert!(err.to_string().starts_with("Unable to connect"));
    }

    #[tokio::test]
    async fn test_missing_option_fails_before_touching_database() {
        let executor = ScriptedExecutor::new(vec![]);
        let config = ExporterConfig {
            database_url: None,
            host: Some("db.internal".into()),
            ..config("feedback", None)
        };

        let err = setup(&config, &executor).await.unwrap_err();

        assert_eq!(err, SetupError::Config(ConfigError::MissingOption("port")));
        assert!(executor.statements().is_empty());
    }

    #[tokio::test]
    async fn test_unusable_table_name_is_rejected() {
        let executor = ScriptedExecutor::new(vec![]);

        let err = setup(&config("---", None), &executor).await.unwrap_err();

        assert!(matches!(err, SetupError::EmptyTableName { .. }));
        assert!(executor.statements().is_empty());
    }
}
