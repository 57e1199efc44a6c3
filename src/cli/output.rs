//! Output formatting for CLI commands
//!
//! Every command prints either pretty JSON or a fixed-width table.

use crate::domain::Account;
use crate::sync::SyncReport;
use anyhow::{Context, Result};
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}

impl OutputFormat {
    /// Parse output format from string
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            _ => anyhow::bail!("Unsupported output format: '{}'. Use 'json' or 'table'.", s),
        }
    }
}

/// Print data as JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

pub fn print_accounts(accounts: &[Account], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&accounts),
        OutputFormat::Table => {
            let width = accounts.iter().map(|a| a.username.len()).max().unwrap_or(8).max(8);
            print_table_header(&[("Username", width), ("Password", 64)]);
            for account in accounts {
                println!("{:<width$}  {}", account.username, account.password, width = width);
            }
            Ok(())
        }
    }
}

pub fn print_report(report: &SyncReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            print_table_header(&[
                ("Direction", 18),
                ("Scanned", 8),
                ("Written", 8),
                ("Skipped", 8),
            ]);
            println!(
                "{:<18}  {:<8}  {:<8}  {:<8}",
                report.direction.as_str(),
                report.scanned,
                report.written,
                report.skipped
            );
            Ok(())
        }
    }
}

fn print_table_header(columns: &[(&str, usize)]) {
    let header = columns
        .iter()
        .map(|(name, width)| format!("{:<width$}", name, width = width))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", header.trim_end());
    println!("{}", "-".repeat(header.trim_end().len()));
}
