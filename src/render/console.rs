use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;

use crate::models::results::{ScanResults, TreeNode};
use crate::models::scan::ScanStatus;
use crate::render::{PresentationSink, Severity};

pub struct ConsoleSink {
    bar: ProgressBar,
}

impl ConsoleSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{prefix:>14} [{bar:40.cyan/blue}] {pos:>3}% {wide_msg}")
                .expect("Failed to create progress style")
                .progress_chars("=> "),
        );

        Self { bar }
    }

    fn section(&self, title: &str) {
        println!("\n{}", title.bold());
    }

    fn empty_line(&self, what: &str) {
        println!("{}", format!("No {} found", what).dimmed());
    }

    fn new_table(headers: &[&str]) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
        table
    }
}

impl PresentationSink for ConsoleSink {
    fn render_progress(&mut self, percent: u8, text: &str) {
        self.bar.set_position(percent as u64);
        self.bar.set_message(text.to_string());
    }

    fn render_status(&mut self, status: ScanStatus) {
        let label = match status {
            ScanStatus::Initializing => "Initializing".yellow(),
            ScanStatus::Running => "Running".blue(),
            ScanStatus::Completed => "Completed".green(),
            ScanStatus::Failed => "Failed".red(),
        };
        self.bar.set_prefix(label.to_string());

        if status.is_terminal() {
            self.bar.abandon();
        }
    }

    fn render_results(&mut self, results: &ScanResults) {
        self.section("Hidden URLs");
        if results.hidden_urls.is_empty() {
            self.empty_line("hidden URLs");
        } else {
            for url in &results.hidden_urls {
                println!("  {}", url.underline());
            }
        }

        self.section("Login forms");
        if results.login_forms.is_empty() {
            self.empty_line("login forms");
        } else {
            let mut table = Self::new_table(&["URL", "Method", "Fields"]);
            for form in &results.login_forms {
                let fields = form
                    .fields
                    .iter()
                    .map(|(name, kind)| format!("{}: {}", name, kind))
                    .collect::<Vec<_>>()
                    .join(", ");
                table.add_row(vec![
                    Cell::new(&form.url),
                    Cell::new(form.method.to_uppercase()),
                    Cell::new(fields),
                ]);
            }
            println!("{}", table);
        }

        self.section("Admin panels");
        if results.admin_panels.is_empty() {
            self.empty_line("admin panels");
        } else {
            let mut table = Self::new_table(&["URL", "Type", "Confidence"]);
            for panel in &results.admin_panels {
                table.add_row(vec![
                    Cell::new(&panel.url),
                    Cell::new(&panel.panel_type),
                    Cell::new(format!("{}%", (panel.confidence * 100.0).round() as u32)),
                ]);
            }
            println!("{}", table);
        }

        self.section("API keys");
        if results.api_keys.is_empty() {
            self.empty_line("API keys");
        } else {
            let mut table = Self::new_table(&["Type", "Key", "Location", "Example usage"]);
            for key in &results.api_keys {
                table.add_row(vec![
                    Cell::new(&key.key_type),
                    Cell::new(&key.key),
                    Cell::new(&key.location),
                    Cell::new(&key.example_usage),
                ]);
            }
            println!("{}", table);
        }

        self.section("Wallet keys");
        if results.wallet_keys.is_empty() {
            self.empty_line("wallet keys");
        } else {
            let mut table = Self::new_table(&["Type", "Key", "Currency", "Location"]);
            for key in &results.wallet_keys {
                table.add_row(vec![
                    Cell::new(&key.key_type),
                    Cell::new(&key.key),
                    Cell::new(key.currency.as_deref().unwrap_or("Unknown")),
                    Cell::new(&key.location),
                ]);
            }
            println!("{}", table);
        }

        self.section("Payment information");
        if results.payment_info.is_empty() {
            self.empty_line("payment information");
        } else {
            let mut table = Self::new_table(&["Gateway", "Type", "Location", "Fields"]);
            for info in &results.payment_info {
                let fields = info
                    .fields
                    .iter()
                    .map(|(name, kind)| format!("{}: {}", name, kind))
                    .collect::<Vec<_>>()
                    .join(", ");
                table.add_row(vec![
                    Cell::new(&info.gateway),
                    Cell::new(&info.info_type),
                    Cell::new(&info.location),
                    Cell::new(fields),
                ]);
            }
            println!("{}", table);
        }
    }

    fn render_tree(&mut self, root: &TreeNode) {
        self.section("Site structure");
        println!("{}", node_label(root));
        print_children(&root.children, "");
    }

    fn notify(&mut self, message: &str, severity: Severity) {
        let tag = match severity {
            Severity::Info => "[info]".blue(),
            Severity::Success => "[ok]".green(),
            Severity::Error => "[error]".red(),
        };
        self.bar.println(format!("{} {}", tag, message));
    }

    fn download_file(&mut self, name: &str, content: &str) -> Result<()> {
        fs::write(name, content).with_context(|| format!("Failed to write {}", name))?;
        Ok(())
    }
}

fn node_label(node: &TreeNode) -> String {
    let label = match &node.title {
        Some(title) => format!("{} ({})", node.url, title),
        None => node.url.clone(),
    };

    match node.node_type.as_str() {
        "root" => label.as_str().bold().to_string(),
        "directory" => label.as_str().blue().to_string(),
        "admin" => label.as_str().red().to_string(),
        _ => label,
    }
}

fn print_children(children: &[TreeNode], prefix: &str) {
    for (idx, child) in children.iter().enumerate() {
        let last = idx + 1 == children.len();
        let connector = if last { "└── " } else { "├── " };
        println!("{}{}{}", prefix, connector, node_label(child));

        let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
        print_children(&child.children, &child_prefix);
    }
}
