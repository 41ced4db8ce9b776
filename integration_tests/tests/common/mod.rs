use eventsink_common::config::{ExporterConfig, SelfSignedCert};
use rand::Rng;
use sqlx::PgPool;

pub const DATABASE_URL_VAR: &str = "EVENTSINK_TEST_DATABASE_URL";

/// Connection string of the scratch database, read from the environment or `.env`.
/// The server must accept TLS; its certificate is not verified.
pub fn database_url() -> String {
    let _ = dotenvy::dotenv();
    std::env::var(DATABASE_URL_VAR)
        .unwrap_or_else(|_| panic!("{DATABASE_URL_VAR} must point at a scratch Postgres database"))
}

pub async fn setup_db(db_url: &str) -> PgPool {
    PgPool::connect(db_url)
        .await
        .expect("Failed to connect to test database")
}

/// Random table name so parallel runs do not collide.
pub fn unique_table(prefix: &str) -> String {
    format!("{prefix}_{}", rand::rng().random_range(0..1_000_000u32))
}

pub fn config(db_url: &str, table_name: &str, events_to_insert: &str) -> ExporterConfig {
    ExporterConfig {
        events_to_insert: Some(events_to_insert.to_string()),
        has_self_signed_cert: SelfSignedCert::Yes,
        ..ExporterConfig::with_url(db_url, table_name)
    }
}

pub async fn drop_table(pool: &PgPool, table_name: &str) {
    sqlx::query(&format!("DROP TABLE IF EXISTS public.{table_name}"))
        .execute(pool)
        .await
        .expect("Failed to drop test table");
}
