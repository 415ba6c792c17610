//! `songbook` command-line tool: migrations, schema checks, and a demo
//! walkthrough against the configured database.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::{DefaultClock, DefaultEnv};
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use songbook::config::{ConfigError, DatabaseSettings};
use songbook::domain::audit::to_iso8601;
use songbook::domain::{NewSong, SongChanges, SongQuery};
use songbook::outbound::persistence::{
    Database, PoolConfig, apply_migrations, revert_migrations,
};

/// `songbook` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(name = "songbook", about = "Manage the songbook database", version)]
struct CliArgs {
    /// Environment name (`development`, `test`, or an external one).
    #[arg(long, global = true, value_name = "name")]
    environment: Option<String>,
    /// Connection string; overrides the environment mapping.
    #[arg(long = "database-url", global = true, value_name = "url")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Apply or revert schema migrations.
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Connect and compare the songs binding with the live schema.
    CheckSchema,
    /// Insert, update, and delete a sample song, logging each step.
    Demo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum MigrateAction {
    /// Run pending migrations.
    Apply,
    /// Revert the last applied migration.
    Revert,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::parse();
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(run(args))
}

async fn run(args: CliArgs) -> Result<()> {
    let settings = load_settings(&args)?;
    let pool_config = settings.pool_config(&DefaultEnv::new())?;
    info!(environment = %settings.environment(), "configuration resolved");

    match args.command {
        Command::Migrate {
            action: MigrateAction::Apply,
        } => {
            let applied = apply_migrations(pool_config.database_url())
                .await
                .wrap_err("apply migrations")?;
            info!(count = applied.len(), "migrate apply finished");
        }
        Command::Migrate {
            action: MigrateAction::Revert,
        } => {
            let reverted = revert_migrations(pool_config.database_url())
                .await
                .wrap_err("revert migration")?;
            info!(reverted = ?reverted, "migrate revert finished");
        }
        Command::CheckSchema => {
            let database = Database::connect(pool_config)
                .await
                .wrap_err("check songs binding")?;
            info!("songs binding matches the live schema");
            database.close();
        }
        Command::Demo => demo(pool_config).await?,
    }
    Ok(())
}

/// Layered settings with the global flags applied on top.
fn load_settings(args: &CliArgs) -> Result<DatabaseSettings, ConfigError> {
    let settings = DatabaseSettings::load_from_args([OsString::from("songbook")])?;
    Ok(settings_with_overrides(settings, args))
}

fn settings_with_overrides(mut settings: DatabaseSettings, args: &CliArgs) -> DatabaseSettings {
    if let Some(environment) = &args.environment {
        settings.environment.clone_from(environment);
    }
    if let Some(url) = &args.database_url {
        settings.database_url = Some(url.clone());
    }
    settings
}

async fn demo(pool_config: PoolConfig) -> Result<()> {
    let database = Database::connect(pool_config)
        .await
        .wrap_err("connect to songs database")?;
    let songs = database.songs(Arc::new(DefaultClock));

    let new_song = NewSong::new("Yesterday")?
        .with_artist("The Beatles")?
        .with_album("Help!")?;
    let created = songs.insert_and_fetch(&new_song).await?;
    info!(
        id = %created.id(),
        created_at = %to_iso8601(&created.created_at()),
        "inserted song"
    );

    let changes = SongChanges::new().with_artist("The Beatlemen")?;
    let updated = songs
        .update_and_fetch_by_id(created.id(), &changes)
        .await?
        .ok_or_else(|| eyre!("song {} vanished during the demo", created.id()))?;
    info!(
        id = %updated.id(),
        artist = updated.artist(),
        updated_at = %to_iso8601(&updated.updated_at()),
        "updated song"
    );

    let remaining = songs.select(&SongQuery::table()).await?;
    info!(count = remaining.len(), "songs in table");

    let first = songs.delete_by_id(created.id()).await?;
    let second = songs.delete_by_id(created.id()).await?;
    info!(first, second, "deleted song twice");

    database.close();
    Ok(())
}
