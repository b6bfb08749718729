//! Command line runner for schemachain migration groups.
//!
//! Migration groups are read from JSON files in the format written by
//! `MigrationGroup::export`, and applied to a SQLite database.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use schemachain::{DbHelper, HelperOptions, MigrationGroup};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schemachain", version, about = "Versioned migration chains for SQLite")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply migration groups newer than the stored schema version
    Migrate(MigrateArgs),
    /// Print the stored schema version
    Version(DatabaseArgs),
    /// Convert a .sql file with one statement per line into a migration group
    ImportSql(ImportArgs),
}

#[derive(clap::Args)]
struct DatabaseArgs {
    /// Path of the SQLite database file
    #[arg(long, env = "SCHEMACHAIN_DATABASE")]
    database: String,

    /// JSON file with helper options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name of the schema version table, overrides the config file
    #[arg(long)]
    version_table: Option<String>,
}

#[derive(clap::Args)]
struct MigrateArgs {
    #[command(flatten)]
    db: DatabaseArgs,

    /// Migration group JSON files
    #[arg(long = "group", required = true)]
    groups: Vec<PathBuf>,

    /// Ignore the stored version and run every statement
    #[arg(long)]
    full: bool,

    /// Abort at the first failing statement
    #[arg(long)]
    stop_on_error: bool,
}

#[derive(clap::Args)]
struct ImportArgs {
    /// The .sql file to convert
    sql: PathBuf,

    /// Group name
    #[arg(long)]
    name: String,

    /// Position of the group relative to other groups
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    order: i32,

    /// Output file, stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate(args) => {
            let mut options = load_options(&args.db)?;
            if args.stop_on_error {
                options = options.stop_on_error(true);
            }
            let mut db = DbHelper::open_sqlite(&args.db.database, options)?;
            for path in &args.groups {
                let group = MigrationGroup::restore(path)?;
                tracing::debug!(group = %group.name, path = %path.display(), "Loaded group");
                db.add_group(group);
            }

            let report = db.run_update(args.full, false)?;
            println!(
                "Schema version {} -> {} ({} statements run)",
                report.previous_version, report.new_version, report.statements_run
            );
            for failure in &report.failures {
                println!(
                    "  failed: {} v{}: {}",
                    failure.group, failure.version, failure.error
                );
            }
            if !report.failures.is_empty() {
                std::process::exit(2);
            }
        }
        Commands::Version(args) => {
            let db = DbHelper::open_sqlite(&args.database, load_options(&args)?)?;
            println!("{}", db.current_version());
        }
        Commands::ImportSql(args) => {
            let group = MigrationGroup::load_sql_file(args.name, &args.sql, args.order)?;
            match args.output {
                Some(path) => group.export(path)?,
                None => println!("{}", serde_json::to_string_pretty(&group)?),
            }
        }
    }
    Ok(())
}

fn load_options(args: &DatabaseArgs) -> Result<HelperOptions, Box<dyn std::error::Error>> {
    let mut options = match &args.config {
        Some(path) => serde_json::from_slice::<HelperOptions>(&fs::read(path)?)
            .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?,
        None => HelperOptions::default(),
    };
    if let Some(table) = &args.version_table {
        options = options.version_table(table.clone());
    }
    Ok(options)
}
