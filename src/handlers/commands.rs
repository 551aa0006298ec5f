use anyhow::{Context, Result, bail};
use colored::Colorize;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use log::info;
use std::path::PathBuf;

use crate::models::scan::{ScanRequest, ScanStatus, ScanType};
use crate::render::console::ConsoleSink;
use crate::render::{PresentationSink, Severity};
use crate::services::controller::ScanController;
use crate::services::transport::ScannerClient;

pub async fn run_scan(
    client: ScannerClient,
    target: String,
    options: Vec<String>,
    export: bool,
) -> Result<()> {
    let scan_options = parse_scan_options(&options)?;
    let request = ScanRequest::new(target, scan_options);

    let mut controller = ScanController::new(client, ConsoleSink::new());
    let scan_id = controller.start(request).await?;
    info!("following scan {}", scan_id);

    let final_status = controller.run_to_completion().await?;
    match final_status {
        ScanStatus::Completed => {
            if export {
                controller.export().await?;
            }
            Ok(())
        }
        ScanStatus::Failed => bail!("scan {} failed", scan_id),
        other => bail!("scan {} ended in state '{}' before finishing", scan_id, other),
    }
}

pub async fn show_status(client: ScannerClient, scan_id: String) -> Result<()> {
    let status = client.fetch_status(&scan_id).await?;

    let label = match ScanStatus::parse(&status.status) {
        Some(ScanStatus::Initializing) => "Initializing".yellow(),
        Some(ScanStatus::Running) => "Running".blue(),
        Some(ScanStatus::Completed) => "Completed".green(),
        Some(ScanStatus::Failed) => "Failed".red(),
        None => "Unknown".dimmed(),
    };

    let shown_id = status.id.as_deref().unwrap_or(&scan_id);
    println!(
        "{}  {}  {:.0}%  {}",
        shown_id.bold(),
        label,
        status.progress,
        status.current_task
    );
    if let Some(started) = &status.start_time {
        let finished = status.end_time.as_deref().unwrap_or("-");
        println!("{} {} -> {}", "[time]".dimmed(), started, finished);
    }
    if let Some(error) = status.error {
        println!("{} {}", "[error]".red(), error);
    }

    Ok(())
}

pub async fn show_results(
    client: ScannerClient,
    scan_id: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let results = client.fetch_results(&scan_id).await?;

    match output {
        Some(path) => {
            let content = serde_json::to_string_pretty(&results)?;
            std::fs::write(&path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            let mut sink = ConsoleSink::new();
            sink.notify(
                &format!("Results written to {}", path.display()),
                Severity::Info,
            );
        }
        None => {
            let mut sink = ConsoleSink::new();
            sink.render_results(&results);
            sink.render_tree(&results.site_structure);
        }
    }

    Ok(())
}

pub async fn list_scans(client: ScannerClient) -> Result<()> {
    let listing = client.list_scans().await?;

    if listing.is_empty() {
        println!("No scans found");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Scan ID").add_attribute(Attribute::Bold),
        Cell::new("Status").add_attribute(Attribute::Bold),
        Cell::new("Progress").add_attribute(Attribute::Bold),
        Cell::new("Started").add_attribute(Attribute::Bold),
        Cell::new("Finished").add_attribute(Attribute::Bold),
    ]);

    let mut scan_ids: Vec<_> = listing.keys().collect();
    scan_ids.sort();
    for scan_id in scan_ids {
        let scan = &listing[scan_id];
        table.add_row(vec![
            Cell::new(scan_id),
            Cell::new(&scan.status),
            Cell::new(format!("{:.0}%", scan.progress)),
            Cell::new(scan.start_time.as_deref().unwrap_or("-")),
            Cell::new(scan.end_time.as_deref().unwrap_or("-")),
        ]);
    }

    println!("{}", table);
    Ok(())
}

pub async fn delete_scan(client: ScannerClient, scan_id: String) -> Result<()> {
    client.delete_scan(&scan_id).await?;
    let mut sink = ConsoleSink::new();
    sink.notify(&format!("Scan {} deleted", scan_id), Severity::Info);
    Ok(())
}

fn parse_scan_options(raw: &[String]) -> Result<Vec<ScanType>> {
    let mut options = Vec::new();

    for entry in raw {
        for part in entry.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.parse::<ScanType>() {
                Ok(option) => options.push(option),
                Err(e) => bail!(e),
            }
        }
    }

    Ok(options)
}
