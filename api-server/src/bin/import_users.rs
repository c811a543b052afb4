use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use roster_api::import::{ImportConfig, ImportCoordinator, ImportError, read_csv_rows};
use roster_api::seed_data::COUNTRIES;
use roster_api::store::{ImportStore, MemoryImportStore, PgImportStore};

#[derive(Parser, Debug)]
#[command(
    name = "import_users",
    about = "Import users from a CSV file into a company"
)]
struct Args {
    /// Company the imported users are linked to.
    #[arg(long)]
    company_id: i64,

    /// CSV file with a heading row naming firstname, lastname, sex, country and email.
    #[arg(long)]
    file: PathBuf,

    /// Users per bulk insert. Defaults to IMPORT_BATCH_SIZE or 1000.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Validate against an in-memory store instead of DATABASE_URL.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    let file = File::open(&args.file)?;
    let rows = read_csv_rows(BufReader::new(file))?;
    log::info!("read {} rows from {}", rows.len(), args.file.display());

    let mut config = ImportConfig::from_env();
    if let Some(batch_size) = args.batch_size {
        config = config.with_batch_size(batch_size);
    }

    let outcome = if args.dry_run {
        let store = MemoryImportStore::new()
            .with_countries(COUNTRIES.iter().map(|(code, _)| *code))
            .with_company(args.company_id);
        execute(store, args.company_id, config, rows).await
    } else {
        let database_url = std::env::var("DATABASE_URL")?;
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;
        execute(PgImportStore::new(pool), args.company_id, config, rows).await
    };

    if let Err(err) = outcome {
        writeln!(io::stderr(), "error: {err}")?;
        std::process::exit(1);
    }
    Ok(())
}

async fn execute<S: ImportStore>(
    store: S,
    company_id: i64,
    config: ImportConfig,
    rows: Vec<roster_api::import::Row>,
) -> Result<(), ImportError> {
    let mut importer = ImportCoordinator::new(store, company_id, config)?;
    let result = importer.run(rows).await;

    let mut stderr = io::stderr();
    for failure in importer.failures() {
        let _ = writeln!(
            stderr,
            "row {}: {}: {}",
            failure.row, failure.attribute, failure.message
        );
    }

    let summary = result?;
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(err) => log::warn!("failed to render summary: {}", err),
    }
    Ok(())
}
