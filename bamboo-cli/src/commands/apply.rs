//! `bamboo-artifact apply` — evaluate and install every manifest record.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use bamboo_core::manifest;
use bamboo_sync::{
    companion::{FileEnsure, Relationship},
    evaluate, Evaluation, Outcome, UreqClient,
};

/// Arguments for `bamboo-artifact apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Path to the artifact manifest (YAML).
    pub manifest: PathBuf,

    /// Report what would change without downloading or writing anything.
    #[arg(long)]
    pub noop: bool,
}

impl ApplyArgs {
    pub fn run(self) -> Result<()> {
        let manifest = manifest::load_at(&self.manifest)
            .with_context(|| format!("failed to load {}", self.manifest.display()))?;
        let client = UreqClient::new();

        if manifest.artifacts.is_empty() {
            println!("No artifacts declared in {}.", self.manifest.display());
            return Ok(());
        }

        let mut failed = 0usize;
        for spec in &manifest.artifacts {
            // The manifest only declares artifacts, so the host never manages
            // the target file on its own.
            match evaluate(spec, &client, self.noop, |_| false) {
                Ok(eval) => {
                    if !self.noop {
                        apply_companions(&eval.relationships).with_context(|| {
                            format!("failed to manage files for {}", spec.path.display())
                        })?;
                    }
                    print_evaluation(&eval, self.noop);
                }
                Err(err) => {
                    failed += 1;
                    eprintln!("{} {}: {err}", "✗".red().bold(), spec.path.display());
                }
            }
        }

        if failed > 0 {
            bail!("{failed} of {} artifact(s) failed", manifest.artifacts.len());
        }
        Ok(())
    }
}

/// Realise the companion file records that only this host can act on:
/// absent files are removed; ownership is left to the surrounding system.
fn apply_companions(relationships: &[Relationship]) -> Result<()> {
    for rel in relationships {
        let file = &rel.target;
        match file.ensure {
            FileEnsure::Absent => {
                if file.path.exists() {
                    std::fs::remove_file(&file.path)
                        .with_context(|| format!("failed to remove {}", file.path.display()))?;
                    tracing::info!("removed {}", file.path.display());
                }
            }
            FileEnsure::File => {
                if let Some(owner) = &file.owner {
                    tracing::debug!(
                        "owner {owner} of {} is managed outside bamboo-artifact",
                        file.path.display()
                    );
                }
            }
        }
    }
    Ok(())
}

fn print_evaluation(eval: &Evaluation, noop: bool) {
    let prefix = if noop { "[noop] " } else { "" };
    let path = eval.path.display();
    match &eval.outcome {
        Outcome::InSync => println!("{prefix}{} {path} — in sync", "✓".green()),
        Outcome::Installed { build } => {
            println!("{prefix}{} {path} — installed build {build}", "✎".green().bold())
        }
        Outcome::WouldChange => println!("{prefix}{} {path} — would install", "~".yellow()),
        Outcome::Removed => println!("{prefix}{} {path} — removed", "✎".green().bold()),
        Outcome::Absent => println!("{prefix}{} {path} — absent", "·".bright_black()),
    }
    for change in &eval.changes {
        println!("    {change}");
    }
}
