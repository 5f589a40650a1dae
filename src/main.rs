use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use codescout::index::scanner::ProgressFn;
use codescout::{IndexService, SearchMode, SearchQuery, Settings, SymbolKind};

#[derive(Parser)]
#[command(name = "codescout", version, about = "Index and search source code symbols")]
struct Cli {
    /// Workspace root (defaults to configuration, then the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Verbose logging (same as RUST_LOG=debug)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the index from scratch and persist it
    Index {
        /// Print per-file progress
        #[arg(long)]
        progress: bool,
    },
    /// Search indexed symbols
    Search {
        query: String,
        #[arg(long, value_enum, default_value_t = ModeArg::Combined)]
        mode: ModeArg,
        /// Restrict to one symbol kind (function, class, interface, type, const, enum)
        #[arg(long)]
        kind: Option<SymbolKind>,
        /// Only exported symbols
        #[arg(long)]
        exported: bool,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Show symbols, imports, and exports for one file
    Info {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List files importing a module
    Imports {
        module: String,
        #[arg(long)]
        json: bool,
    },
    /// Watch the tree and keep the index current until interrupted
    Watch,
    /// Show index status
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Exact,
    Fuzzy,
    Semantic,
    Combined,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Exact => SearchMode::Exact,
            ModeArg::Fuzzy => SearchMode::Fuzzy,
            ModeArg::Semantic => SearchMode::Semantic,
            ModeArg::Combined => SearchMode::Combined,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().context("Failed to load configuration")?;
    if let Some(root) = cli.root {
        settings.workspace_root = Some(root);
    }

    let default_level = if cli.debug || settings.debug {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    let service = Arc::new(IndexService::new(Arc::new(settings), None)?);

    match cli.command {
        Command::Index { progress } => {
            let callback = |processed: usize, total: usize| {
                eprint!("\rIndexing {processed}/{total} files");
                if processed == total {
                    eprintln!();
                }
            };
            let callback: &ProgressFn<'_> = &callback;
            let stats = service.rebuild(progress.then_some(callback))?;
            stats.display();
        }
        Command::Search {
            query,
            mode,
            kind,
            exported,
            limit,
            json,
        } => {
            service.load_or_rebuild()?;
            let mut search = SearchQuery::new(query)
                .with_mode(mode.into())
                .with_limit(limit);
            if let Some(kind) = kind {
                search = search.with_kind(kind);
            }
            if exported {
                search = search.exported_only();
            }
            let results = service.search(&search)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No matches");
            } else {
                for result in &results {
                    let sym = &result.symbol;
                    println!(
                        "{:5.2}  {:<9} {:<30} {}:{}",
                        result.score,
                        sym.kind.to_string(),
                        sym.name,
                        sym.file.display(),
                        sym.start_line
                    );
                }
            }
        }
        Command::Info { file, json } => {
            service.load_or_rebuild()?;
            let info = service.file_info(&file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{}", info.path.display());
                println!("  symbols:");
                for sym in &info.symbols {
                    let vis = if sym.exported { "pub" } else { "   " };
                    println!(
                        "    {vis} {:<9} {:<30} {}..{}",
                        sym.kind.to_string(),
                        sym.name,
                        sym.start_line,
                        sym.end_line
                    );
                }
                println!("  imports:");
                for edge in &info.imports {
                    println!(
                        "    {} ({})",
                        edge.source_module,
                        edge.imported_names.join(", ")
                    );
                }
            }
        }
        Command::Imports { module, json } => {
            service.load_or_rebuild()?;
            let importers = service.importers_of(&module)?;
            if json {
                let rows: Vec<_> = importers
                    .iter()
                    .map(|(file, edge)| {
                        serde_json::json!({
                            "file": file,
                            "imported_names": edge.imported_names,
                            "used_by": edge.used_by,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if importers.is_empty() {
                println!("No files import '{module}'");
            } else {
                for (file, edge) in &importers {
                    println!("{}  ({})", file.display(), edge.imported_names.join(", "));
                }
            }
        }
        Command::Watch => {
            service.load_or_rebuild()?;
            let watcher = service.start_watching()?;
            println!("Watching {} (Ctrl-C to stop)", service.root().display());
            tokio::signal::ctrl_c().await?;
            watcher.stop();
            service.save()?;
        }
        Command::Status => {
            let loaded = service.load_or_rebuild()?;
            let status = service.status();
            println!("Index: {}", if loaded { "loaded" } else { "rebuilt" });
            println!("  files:   {}", status.file_count);
            println!("  symbols: {}", status.symbol_count);
            println!(
                "  semantic: {}",
                if status.semantic_configured {
                    "configured"
                } else {
                    "not configured"
                }
            );
        }
    }
    Ok(())
}
