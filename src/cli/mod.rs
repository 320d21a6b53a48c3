//! Command-line interface for iconified.
//!
//! Provides commands for rebuilding and checking container indexes,
//! listing categorized content, and maintaining the category tree.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use crate::config;
use crate::core::format::{calculate_filesize, confidential_message, print_message};
use crate::core::preview::ConversionRecords;
use crate::core::query::{query, Query, QueryResult, ResultType};
use crate::core::{LifecycleCoordinator, ReferentialGuard};
use crate::domain::CategoryNode;
use crate::library::{Repository, SiteSnapshot, SiteStore};

/// iconified - Categorized content index
#[derive(Parser, Debug)]
#[command(name = "iconified")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Site snapshot to operate on (defaults to $ICONIFIED_HOME/site.json)
    #[arg(long, global = true, env = "ICONIFIED_STORE")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild container indexes from their content
    Rebuild {
        /// Container path ("" or omitted for the whole site)
        #[arg(short, long)]
        container: Option<String>,

        /// Only report stale indexes, do not write
        #[arg(long)]
        check: bool,
    },

    /// List the categorized content of a container
    List {
        /// Container path (defaults to the site root)
        #[arg(short, long, default_value = "")]
        container: String,

        /// Keep only this portal type
        #[arg(short, long)]
        portal_type: Option<String>,

        /// Field to sort on
        #[arg(short, long)]
        sort_on: Option<String>,

        /// Shape of the results
        #[arg(short, long, value_enum, default_value = "dict")]
        result_type: ResultFormat,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which items reference a category node
    Relations {
        /// Node key: group, group_-_category or group_-_category_-_subcategory
        key: String,
    },

    /// Delete a category node that nothing references
    DeleteCategory {
        /// Node key
        key: String,
    },

    /// Move a category to another group, or a subcategory to another category
    MoveCategory {
        /// Node key
        key: String,

        /// Key of the new parent node
        #[arg(long)]
        to: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Result shape for CLI (maps to ResultType)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ResultFormat {
    /// Snapshot fields
    Dict,

    /// Live items
    Objects,

    /// Lightweight references
    Refs,
}

impl From<ResultFormat> for ResultType {
    fn from(f: ResultFormat) -> Self {
        match f {
            ResultFormat::Dict => ResultType::Dict,
            ResultFormat::Objects => ResultType::Objects,
            ResultFormat::Refs => ResultType::Refs,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let store = match self.store {
            Some(path) => SiteStore::new(path),
            None => SiteStore::from_config()?,
        };

        match self.command {
            Commands::Rebuild { container, check } => rebuild(&store, container, check).await,
            Commands::List {
                container,
                portal_type,
                sort_on,
                result_type,
                json,
            } => {
                let query = Query {
                    portal_type,
                    sort_on,
                    result_type: result_type.into(),
                };
                list(&store, &container, &query, json).await
            }
            Commands::Relations { key } => relations(&store, &key).await,
            Commands::DeleteCategory { key } => delete_category(&store, &key).await,
            Commands::MoveCategory { key, to } => move_category(&store, &key, &to).await,
            Commands::Config => show_config(&store),
        }
    }
}

/// Coordinator configured from settings and the site's conversion records
fn coordinator(snapshot: &SiteSnapshot) -> Result<LifecycleCoordinator> {
    let cfg = config::config()?;
    let records = Arc::new(ConversionRecords::from_map(snapshot.conversions.clone()));
    Ok(LifecycleCoordinator::from_settings(&cfg.index, records))
}

fn parse_node(key: &str) -> Result<CategoryNode> {
    CategoryNode::parse(key).with_context(|| format!("Invalid category key: {}", key))
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

async fn rebuild(store: &SiteStore, container: Option<String>, check: bool) -> Result<()> {
    let mut snapshot = store.load().await?;
    let coordinator = coordinator(&snapshot)?;

    let root = container.unwrap_or_default();
    let paths = snapshot.content.subtree(&root);
    if paths.is_empty() {
        anyhow::bail!("Container not found: '{}'", root);
    }

    let mut rebuilt = snapshot.content.clone();
    let report = coordinator.rebuild_subtree(&mut rebuilt, &root);

    println!("{:<40} {:>8} {:<18} {:<6}", "CONTAINER", "ENTRIES", "FINGERPRINT", "STATE");
    println!("{}", "-".repeat(75));

    let mut stale = 0;
    for path in &paths {
        let (Some(before), Some(after)) = (snapshot.content.index(path), rebuilt.index(path)) else {
            continue;
        };
        let fresh = before.fingerprint() == after.fingerprint();
        if !fresh {
            stale += 1;
        }
        println!(
            "{:<40} {:>8} {:<18} {:<6}",
            display_path(path),
            after.len(),
            after.fingerprint(),
            if fresh { "ok" } else { "stale" }
        );
    }
    println!(
        "\nIndexed: {}, dropped: {}, stale: {}",
        report.indexed, report.dropped, stale
    );

    if check {
        if stale > 0 {
            anyhow::bail!("{} index(es) out of date", stale);
        }
        return Ok(());
    }

    snapshot.content = rebuilt;
    store.save(&snapshot).await?;
    info!(containers = paths.len(), "Saved rebuilt indexes");
    Ok(())
}

async fn list(store: &SiteStore, container: &str, query_params: &Query, json: bool) -> Result<()> {
    let snapshot = store.load().await?;
    let results = query(&snapshot.content, container, query_params)?;

    if json {
        let value = results.to_json().context("Failed to serialize results")?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No categorized content in {}", display_path(container));
        return Ok(());
    }

    match &results {
        QueryResult::Dicts(_) | QueryResult::Refs(_) => {
            let index = snapshot
                .content
                .index(container)
                .context("Container has no index")?;
            println!(
                "{:<34} {:<36} {:<24} {:>8} {:<16}",
                "UID", "TITLE", "CATEGORY", "SIZE", "PREVIEW"
            );
            println!("{}", "-".repeat(122));
            for uid in results.uids() {
                let Some(entry) = index.get(&uid) else {
                    continue;
                };
                let category = entry
                    .subcategory_title
                    .as_deref()
                    .unwrap_or(&entry.category_title);
                println!(
                    "{:<34} {:<36} {:<24} {:>8} {:<16}",
                    entry.uid,
                    truncate(&entry.title, 36),
                    truncate(category, 24),
                    entry.filesize.map(calculate_filesize).unwrap_or_default(),
                    entry.preview_status.to_string()
                );
            }
        }
        QueryResult::Objects(items) => {
            println!("{:<34} {:<36} {:<28} {:<16}", "UID", "TITLE", "PRINT", "CONFIDENTIALITY");
            println!("{}", "-".repeat(117));
            for item in items {
                println!(
                    "{:<34} {:<36} {:<28} {:<16}",
                    item.uid,
                    truncate(&item.title, 36),
                    print_message(item.to_print),
                    confidential_message(item.confidential)
                );
            }
        }
    }

    println!("\nTotal: {} items", results.len());
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

async fn relations(store: &SiteStore, key: &str) -> Result<()> {
    let snapshot = store.load().await?;
    let node = parse_node(key)?;
    if !snapshot.content.categories.contains(&node) {
        anyhow::bail!("Category not found: {}", key);
    }

    let guard = ReferentialGuard::new();
    let referencing: Vec<_> = snapshot
        .content
        .items()
        .filter(|item| guard.has_relations(&node, [*item]))
        .collect();

    if referencing.is_empty() {
        println!("{} is not referenced by any item", node);
        return Ok(());
    }

    println!("{} is referenced by {} item(s):", node, referencing.len());
    for item in referencing {
        println!(
            "  {}  {}  ({})",
            item.uid,
            item.relative_url(),
            item.category_key().unwrap_or_default()
        );
    }
    Ok(())
}

/// Apply a category tree change, then rebuild every index
async fn change_categories<F>(store: &SiteStore, change: F) -> Result<()>
where
    F: FnOnce(&mut Repository) -> Result<()>,
{
    let mut snapshot = store.load().await?;
    let coordinator = coordinator(&snapshot)?;

    let mut repo = Repository::new(std::mem::take(&mut snapshot.content));
    change(&mut repo)?;
    let report = coordinator.rebuild_subtree(repo.content_mut(), "");

    snapshot.content = repo.into_content();
    store.save(&snapshot).await?;
    info!(indexed = report.indexed, dropped = report.dropped, "Indexes rebuilt after category change");
    Ok(())
}

async fn delete_category(store: &SiteStore, key: &str) -> Result<()> {
    let node = parse_node(key)?;
    change_categories(store, |repo| {
        repo.delete_category(&node)?;
        Ok(())
    })
    .await?;
    println!("Deleted {}", node);
    Ok(())
}

async fn move_category(store: &SiteStore, key: &str, to: &str) -> Result<()> {
    let node = parse_node(key)?;
    let parent = parse_node(to)?;
    let mut moved = None;
    change_categories(store, |repo| {
        moved = Some(repo.move_category(&node, &parent)?);
        Ok(())
    })
    .await?;
    if let Some(moved) = moved {
        println!("Moved {} to {}", node, moved);
    }
    Ok(())
}

fn show_config(store: &SiteStore) -> Result<()> {
    let cfg = config::config()?;

    println!("iconified configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:  {}", cfg.home.display());
    println!("  Store: {}", store.path().display());
    println!();
    println!("Index:");
    println!(
        "  Filesize warning above: {} ({} bytes)",
        calculate_filesize(cfg.index.filesize_limit),
        cfg.index.filesize_limit
    );
    println!("  Convertible types:      {}", cfg.index.convertible_types.join(", "));

    Ok(())
}
