//! Shared helpers for songbook integration tests.
//!
//! Each test binary declares `mod support;` and picks what it needs, so
//! some helpers go unused in some binaries.
#![allow(dead_code, reason = "not every test binary uses every helper")]

pub mod cluster_skip;
pub mod pg_embed;

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use pg_embedded_setup_unpriv::TestCluster;
use postgres::{Client, NoTls};
use songbook::test_support::MutableClock;

pub use cluster_skip::handle_cluster_setup_failure;
pub use pg_embed::test_cluster;

/// Render a `postgres` error with SQLSTATE and detail.
///
/// `postgres::Error`'s `Display` often collapses to `db error`.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    if let Some(hint) = db_error.hint() {
        summary.push_str("; hint: ");
        summary.push_str(hint);
    }
    summary
}

/// Drop and recreate `name` on the cluster, returning its URL.
///
/// Uses the synchronous `postgres` client so no pooled connection keeps the
/// database open during `DROP DATABASE`.
pub fn reset_database(cluster: &TestCluster, name: &str) -> Result<String, String> {
    let admin_url = cluster.connection().database_url("postgres");
    let mut client =
        Client::connect(&admin_url, NoTls).map_err(|err| format_postgres_error(&err))?;
    client
        .batch_execute(&format!("DROP DATABASE IF EXISTS \"{name}\" WITH (FORCE)"))
        .map_err(|err| format_postgres_error(&err))?;
    client
        .batch_execute(&format!("CREATE DATABASE \"{name}\""))
        .map_err(|err| format_postgres_error(&err))?;
    Ok(cluster.connection().database_url(name))
}

/// Run a statement directly against `url`, bypassing the adapters.
pub fn execute_sql(url: &str, sql: &str) -> Result<(), String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    client
        .batch_execute(sql)
        .map_err(|err| format_postgres_error(&err))
}

/// 2024-05-01T12:00:00Z.
pub fn fixed_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .single()
        .expect("valid instant")
}

pub fn fixed_clock() -> Arc<MutableClock> {
    Arc::new(MutableClock::new(fixed_instant()))
}
