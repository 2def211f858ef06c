use clap::Parser;
use std::path::PathBuf;
use telco_dwh_etl::{alert, pipeline, EtlConfig};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "telco-dwh-etl")]
#[command(about = "Batch ETL for telco usage and billing records")]
struct Args {
    /// Path to the input CSV file. Overrides the CSV_FILE_PATH environment variable.
    #[arg(long)]
    csv_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = EtlConfig::from_env();
    let csv_path = match args.csv_path {
        Some(path) => {
            info!("Using CSV path from command-line argument: '{}'", path.display());
            path
        }
        None => {
            info!(
                "Using CSV path from environment variable or default: '{}'",
                config.csv_path.display()
            );
            config.csv_path.clone()
        }
    };

    if let Err(e) = pipeline::run_etl(&config, &csv_path).await {
        error!("ETL ABORTED: {e}");
        alert::send_alert(&config.alert, e.alert_subject(), &[e.to_string()]);
        std::process::exit(1);
    }
}
