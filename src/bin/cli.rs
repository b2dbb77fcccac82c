use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tabled::{Table, settings::Style};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bqschema::{connect, print_schema_differences, render_module, to_record};
use bqschema::{MigrationOptions, MigrationReport, Migrator, TableFinder, TableRef, WarehouseClient};
use bqschema::error::{BigQueryError, BqSchemaError, ValidationFailure};
use bqschema::migration::{confirm_apply, validation_failure, SchemaCheck};

#[derive(Parser)]
#[command(name = "bqschema")]
#[command(about = "BigQuery schema mapping and additive table migrations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare local table declarations with BigQuery and apply missing changes
    Migrate {
        /// Directory holding table manifests
        #[arg(short, long)]
        module_path: PathBuf,

        /// Target project, overrides the one declared by each table
        #[arg(short, long, env = "GCP_PROJECT_ID")]
        project: Option<String>,

        /// Target dataset, overrides the one declared by each table
        #[arg(short, long, env = "BQSCHEMA_DATASET")]
        dataset: Option<String>,

        /// Create missing tables and push new columns
        #[arg(long)]
        apply: bool,

        /// Fail when any table is missing or out of date
        #[arg(long)]
        validate: bool,

        /// Skip tables declared abstract
        #[arg(long)]
        ignore_abstract: bool,

        /// Apply without asking for confirmation
        #[arg(short, long, requires = "apply")]
        yes: bool,
    },

    /// Print a Rust record declaration for an existing table
    Convert {
        /// Project of the table (defaults to the service account's project)
        #[arg(short, long, env = "GCP_PROJECT_ID")]
        project: Option<String>,

        /// Dataset of the table
        #[arg(short, long, env = "BQSCHEMA_DATASET")]
        dataset: String,

        /// Table name
        #[arg(short, long)]
        table_name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("bqschema=debug,info")
    } else {
        EnvFilter::new("bqschema=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    if !atty::is(atty::Stream::Stdout) {
        colored::control::set_override(false);
    }

    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(e);
            ExitCode::FAILURE
        }
    }
}

fn print_error(err: Box<dyn std::error::Error>) {
    match err.downcast_ref::<BqSchemaError>() {
        Some(BqSchemaError::BigQuery(bq)) => print_bq_error(bq),
        Some(BqSchemaError::Validation(failure)) => print_validation_failure(failure),
        _ => eprintln!("{} {}", "✗ Error:".red(), err),
    }
}

fn print_bq_error(err: &BigQueryError) {
    eprintln!("\n{}", format!("✗ BigQuery Error [{}]", err.error_code()).red());
    eprintln!("  {}", err);
    eprintln!("\n{}", "Suggestion:".yellow());
    for line in err.suggestion().lines() {
        eprintln!("  {}", line);
    }
    eprintln!();
}

fn print_validation_failure(failure: &ValidationFailure) {
    eprintln!(
        "\n{}",
        format!("✗ Schema validation failed for {} table(s)", failure.tables.len()).red()
    );
    for (table, messages) in &failure.tables {
        eprintln!("  {}", table.bold());
        for message in messages {
            eprintln!("    {} {}", "-".dimmed(), message);
        }
    }
    eprintln!();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate {
            module_path,
            project,
            dataset,
            apply,
            validate,
            ignore_abstract,
            yes,
        } => {
            let options = MigrationOptions {
                project,
                dataset,
                apply,
                validate,
            };
            cmd_migrate(&module_path, options, ignore_abstract, yes).await?;
        }

        Commands::Convert { project, dataset, table_name } => {
            cmd_convert(project, &dataset, &table_name).await?;
        }
    }

    Ok(())
}

async fn cmd_migrate(
    module_path: &Path,
    options: MigrationOptions,
    ignore_abstract: bool,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Looking for tables in {}", module_path.display());
    let tables = TableFinder::new().find_tables(module_path, ignore_abstract)?;
    info!("Found {} table(s)", tables.len());

    let client = connect().await?;
    let migrator = Migrator::new(&client, options);

    let SchemaCheck { diffs, in_sync, failures } = migrator.find_schema_differences(&tables).await;
    print_schema_differences(&diffs);

    let mut report = MigrationReport::new(&diffs, in_sync, failures);

    if migrator.options().apply && !diffs.is_empty() {
        let confirmed = yes || confirm_apply(io::stdin().lock(), io::stdout())?;
        if confirmed {
            println!("\n{}", "Applying changes...".bold());
            report.record_applied(migrator.apply_schema_differences(&diffs).await);
        } else {
            warn!("Changes were not applied");
        }
    }

    print_report(&report);

    if migrator.options().validate {
        let failure = validation_failure(&diffs, &report.failures);
        if !failure.is_empty() {
            return Err(BqSchemaError::Validation(failure).into());
        }
    }

    if !report.is_success() {
        for failure in &report.failures {
            eprintln!("{} {}", format!("✗ {}:", failure.table).red(), failure.error);
            if let BqSchemaError::BigQuery(bq) = &failure.error {
                for line in bq.suggestion().lines() {
                    eprintln!("    {}", line.dimmed());
                }
            }
        }
        return Err(format!("{} table(s) failed", report.failures.len()).into());
    }

    Ok(())
}

fn print_report(report: &MigrationReport) {
    let rows = report.rows();
    if rows.is_empty() {
        println!("No tables found");
        return;
    }

    println!();
    let mut table = Table::new(rows);
    table.with(Style::markdown());
    println!("{}", table);

    println!("\nSummary:");
    println!("  ✓ {} in sync", report.in_sync.len());
    println!("  + {} missing, {} created", report.missing.len(), report.created.len());
    println!("  ~ {} differing, {} updated", report.differing.len(), report.updated.len());
    if !report.failures.is_empty() {
        println!("  ✗ {} failed", report.failures.len());
    }
}

async fn cmd_convert(
    project: Option<String>,
    dataset: &str,
    table_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = connect().await?;
    let project = project
        .or_else(|| client.default_project().map(str::to_string))
        .ok_or("Project ID required (--project or GCP_PROJECT_ID)")?;

    let table = client.get_table(&TableRef::new(project, dataset, table_name)).await?;
    info!("Converting {} ({} columns)", table.reference, table.columns.len());

    let record = to_record(table_name, &table.columns)?;
    print!("{}", render_module(&record));

    Ok(())
}
