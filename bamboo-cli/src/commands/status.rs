//! `bamboo-artifact status` — recorded state of each managed artifact.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use bamboo_core::{manifest, ArtifactSpec};
use bamboo_sync::{ArtifactProvider, Property, UreqClient};

/// Arguments for `bamboo-artifact status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Path to the artifact manifest (YAML).
    pub manifest: PathBuf,

    /// Also run the in-sync check (queries the server for `latest` builds).
    #[arg(long)]
    pub check: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let manifest = manifest::load_at(&self.manifest)
            .with_context(|| format!("failed to load {}", self.manifest.display()))?;
        let client = UreqClient::new();

        let mut rows = Vec::new();
        for spec in &manifest.artifacts {
            rows.push(
                artifact_status(spec, &client, self.check)
                    .with_context(|| format!("status check failed for {}", spec.path.display()))?,
            );
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_table(rows);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ArtifactStatus {
    path: String,
    ensure: String,
    exists: bool,
    plan: String,
    desired_build: String,
    recorded_build: Option<u64>,
    last_sync_at: Option<String>,
    last_sync_age: String,
    /// `None` unless `--check` was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    out_of_sync: Option<Vec<String>>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "plan")]
    plan: String,
    #[tabled(rename = "desired")]
    desired: String,
    #[tabled(rename = "recorded")]
    recorded: String,
    #[tabled(rename = "last sync")]
    last_sync: String,
    #[tabled(rename = "state")]
    state: String,
}

fn artifact_status(spec: &ArtifactSpec, client: &UreqClient, check: bool) -> Result<ArtifactStatus> {
    let mut provider = ArtifactProvider::new(spec, client);
    let exists = provider.exists();
    let meta = provider.metadata().clone();

    let out_of_sync = if check {
        let mut diverged = Vec::new();
        for property in Property::ALL {
            if !provider.insync(property)? {
                diverged.push(property.name().to_string());
            }
        }
        Some(diverged)
    } else {
        None
    };

    Ok(ArtifactStatus {
        path: spec.path.display().to_string(),
        ensure: spec.ensure.to_string(),
        exists,
        plan: spec.plan.to_string(),
        desired_build: spec.build.to_string(),
        recorded_build: meta.build,
        last_sync_at: meta.synced_at.map(|t| t.to_rfc3339()),
        last_sync_age: meta
            .synced_at
            .map(format_age)
            .unwrap_or_else(|| "never".to_string()),
        out_of_sync,
    })
}

fn print_table(rows: Vec<ArtifactStatus>) {
    println!(
        "bamboo-artifact v{} | {} artifacts",
        env!("CARGO_PKG_VERSION"),
        rows.len()
    );
    if rows.is_empty() {
        println!("No artifacts declared.");
        return;
    }

    let table_rows: Vec<StatusTableRow> = rows
        .into_iter()
        .map(|row| StatusTableRow {
            state: state_label(&row),
            path: row.path,
            plan: row.plan,
            desired: row.desired_build,
            recorded: row
                .recorded_build
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
            last_sync: row.last_sync_age,
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn state_label(row: &ArtifactStatus) -> String {
    if !row.exists {
        return "MISSING".yellow().bold().to_string();
    }
    match &row.out_of_sync {
        None => "PRESENT".normal().to_string(),
        Some(props) if props.is_empty() => "IN SYNC".green().bold().to_string(),
        Some(props) => format!("{} ({})", "OUT OF SYNC".red().bold(), props.join(", ")),
    }
}

fn format_age(timestamp: DateTime<Utc>) -> String {
    let seconds = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0) as u64;
    if seconds < 60 {
        return format!("{seconds}s ago");
    }
    if seconds < 60 * 60 {
        return format!("{}m ago", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h ago", seconds / (60 * 60));
    }
    format!("{}d ago", seconds / (60 * 60 * 24))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn age_buckets() {
        assert_eq!(format_age(Utc::now()), "0s ago");
        assert_eq!(format_age(Utc::now() - Duration::minutes(5)), "5m ago");
        assert_eq!(format_age(Utc::now() - Duration::hours(3)), "3h ago");
        assert_eq!(format_age(Utc::now() - Duration::days(2)), "2d ago");
    }
}
