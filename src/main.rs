use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lakeload::config::PipelineConfig;
use lakeload::manifest::FetchManifest;
use lakeload::runner::{self, run_pipeline};

#[derive(Parser)]
#[command(name = "lakeload", about = "Move Parquet files from an object store into warehouse raw tables and rebuild the analytical layer")]
struct Args {
    /// Quiet mode - warnings only, plus the final summary
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run fetch, load, and transform in sequence
    Run,

    /// Fetch stage only; writes the manifest consumed by a later load
    Fetch {
        /// Path the fetch manifest is written to
        #[arg(short, long)]
        manifest: PathBuf,
    },

    /// Load stage only; reads the manifest written by fetch
    Load {
        /// Path of the fetch manifest to load from
        #[arg(short, long)]
        manifest: PathBuf,
    },

    /// Transform stage only; rebuilds the analytical tables
    Transform,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.quiet);

    // Pick up a local .env before the config reads the environment
    dotenvy::dotenv().ok();
    let config = PipelineConfig::from_env()?;

    match args.command {
        Command::Run => {
            let report = run_pipeline(&config).await?;

            println!();
            println!("Pipeline Summary");
            println!("================");
            println!("Run ID: {}", report.run_id);
            println!("Files fetched: {}", report.files_fetched);
            println!("Tables loaded: {}", report.load.tables_loaded);
            println!("Rows loaded: {}", report.load.rows_loaded);
            println!("Rows skipped: {}", report.load.rows_skipped);
            println!("Tables rebuilt: {}", report.transform.tables_rebuilt.join(", "));
            println!("Duration: {:.2}s", report.duration.as_secs_f64());
        }
        Command::Fetch { manifest } => {
            let fetched = runner::run_fetch(&config).await?;
            fetched.save(&manifest).await?;

            println!();
            println!("Fetch Summary");
            println!("=============");
            println!("Files fetched: {}", fetched.file_count());
            println!("Manifest: {}", manifest.display());
        }
        Command::Load { manifest } => {
            let fetched = FetchManifest::load(&manifest).await?;
            let report = runner::run_load(&config, &fetched).await?;

            println!();
            println!("Load Summary");
            println!("============");
            println!("Tables loaded: {}", report.tables_loaded);
            println!("Files loaded: {}", report.files_loaded);
            println!("Rows loaded: {}", report.rows_loaded);
            println!("Rows skipped: {}", report.rows_skipped);
        }
        Command::Transform => {
            let report = runner::run_transform(&config).await?;

            println!();
            println!("Transform Summary");
            println!("=================");
            println!("Tables rebuilt: {}", report.tables_rebuilt.join(", "));
        }
    }

    Ok(())
}

fn init_tracing(quiet: bool) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let filter = if quiet {
        EnvFilter::new("lakeload=warn,sqlx=off")
    } else {
        EnvFilter::new("lakeload=info,sqlx=off")
    };
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
