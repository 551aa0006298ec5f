use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::env;
use std::path::PathBuf;

mod errors;
mod handlers;
mod models;
mod render;
mod services;
mod utils;

use handlers::commands;
use services::transport::ScannerClient;

#[derive(Parser)]
#[command(name = "webscan-console")]
#[command(about = "Console client for the web security scanner backend", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(
        long,
        help = "Backend base URL (default: $SCANNER_API_URL or http://localhost:8001)"
    )]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Submit a scan and follow its progress to completion")]
    Scan {
        #[arg(help = "Absolute URL of the site to scan")]
        target: String,

        #[arg(
            short,
            long,
            help = "Scan options, comma-separated (full, urls, login, admin, api_keys, wallet, payment)"
        )]
        options: Vec<String>,

        #[arg(long, help = "Save results to scan-results-{scan_id}.json on completion")]
        export: bool,
    },

    #[command(about = "Show the current status of a scan")]
    Status { scan_id: String },

    #[command(about = "Fetch the results of a completed scan")]
    Results {
        scan_id: String,

        #[arg(short, long, help = "Write raw JSON to this file instead of rendering")]
        output: Option<PathBuf>,
    },

    #[command(about = "List known scans")]
    List,

    #[command(about = "Delete a finished scan")]
    Delete { scan_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let api_url = cli
        .api_url
        .or_else(|| env::var("SCANNER_API_URL").ok())
        .unwrap_or_else(|| "http://localhost:8001".to_string());
    let client = ScannerClient::new(&api_url);

    match cli.command {
        Command::Scan {
            target,
            options,
            export,
        } => commands::run_scan(client, target, options, export).await,
        Command::Status { scan_id } => commands::show_status(client, scan_id).await,
        Command::Results { scan_id, output } => {
            commands::show_results(client, scan_id, output).await
        }
        Command::List => commands::list_scans(client).await,
        Command::Delete { scan_id } => commands::delete_scan(client, scan_id).await,
    }
}
