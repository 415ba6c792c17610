//! Apply/revert behaviour of the embedded migrations against embedded
//! PostgreSQL.

use pg_embedded_setup_unpriv::TestCluster;
use rstest::{fixture, rstest};
use songbook::domain::{BindingCheckError, SchemaDriftError};
use songbook::outbound::persistence::{
    Database, DatabaseError, PoolConfig, apply_migrations, revert_migrations,
};
use tokio::runtime::Runtime;

mod support;

use support::{handle_cluster_setup_failure, reset_database, test_cluster};

const TEST_DB: &str = "songbook_migrations_test";

struct MigrationContext {
    runtime: Runtime,
    database_url: String,
    _cluster: TestCluster,
}

impl MigrationContext {
    fn connect(&self) -> Result<Database, DatabaseError> {
        let config = PoolConfig::new(&self.database_url)
            .with_max_size(1)
            .with_min_idle(Some(1));
        self.runtime.block_on(Database::connect(config))
    }
}

fn setup_context() -> Result<MigrationContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = test_cluster()?;
    let database_url = reset_database(&cluster, TEST_DB)?;
    Ok(MigrationContext {
        runtime,
        database_url,
        _cluster: cluster,
    })
}

#[fixture]
fn migration_context() -> Option<MigrationContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

#[rstest]
fn apply_creates_the_songs_table_once(migration_context: Option<MigrationContext>) {
    let Some(context) = migration_context else {
        eprintln!("SKIP-TEST-CLUSTER: apply_creates_the_songs_table_once skipped");
        return;
    };

    let first = context
        .runtime
        .block_on(apply_migrations(&context.database_url))
        .expect("apply migrations");
    let second = context
        .runtime
        .block_on(apply_migrations(&context.database_url))
        .expect("apply migrations again");

    assert_eq!(first, ["20240501000000"]);
    assert!(second.is_empty());
    context
        .connect()
        .expect("binding matches migrated schema")
        .close();
}

#[rstest]
fn revert_drops_the_table(migration_context: Option<MigrationContext>) {
    let Some(context) = migration_context else {
        eprintln!("SKIP-TEST-CLUSTER: revert_drops_the_table skipped");
        return;
    };
    context
        .runtime
        .block_on(apply_migrations(&context.database_url))
        .expect("apply migrations");

    let reverted = context
        .runtime
        .block_on(revert_migrations(&context.database_url))
        .expect("revert migration");
    let error = context.connect().expect_err("table is gone");

    assert_eq!(reverted.as_deref(), Some("20240501000000"));
    assert_eq!(
        error,
        DatabaseError::Binding(BindingCheckError::Drift(SchemaDriftError::MissingTable {
            table: "songs"
        }))
    );
}

#[rstest]
fn revert_without_applied_migrations_is_a_no_op(migration_context: Option<MigrationContext>) {
    let Some(context) = migration_context else {
        eprintln!("SKIP-TEST-CLUSTER: revert_without_applied_migrations_is_a_no_op skipped");
        return;
    };

    let reverted = context
        .runtime
        .block_on(revert_migrations(&context.database_url))
        .expect("revert on empty database");

    assert_eq!(reverted, None);
}
