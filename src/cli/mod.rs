//! CLI module
//!
//! chitrapur-rag command definitions and implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::embedding::has_api_key;
use crate::knowledge::{dedupe, format_bytes, format_docs, get_data_dir, DocumentStore};
use crate::query::{extract_terms, parse, parse_strict, SearchEngine};
use crate::retriever::{open_index, HybridRetriever, RetrievalPipeline, RetrieverKind};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "chitrapur-rag")]
#[command(version, about = "Search and retrieval over the magazine article archive", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./chitrapur.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Boolean AND/OR search with snippets
    Search {
        /// Query, e.g. "(temple OR mandir) AND shirali"
        query: String,

        /// Reject malformed queries instead of parsing them leniently
        #[arg(long)]
        strict: bool,
    },

    /// Show the parsed form of a boolean query
    Parse {
        query: String,

        #[arg(long)]
        strict: bool,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Hybrid retrieval for one or more queries
    Retrieve {
        /// Search queries (each retrieved independently)
        #[arg(required = true)]
        queries: Vec<String>,

        /// Retrievers to run (default: from configuration)
        #[arg(short, long, value_enum)]
        retriever: Vec<RetrieverKind>,

        /// Keep duplicates across retrievers and queries
        #[arg(long)]
        no_dedupe: bool,
    },

    /// Merge a JSONL file of documents into the knowledge base
    Import {
        file: PathBuf,
    },

    /// Show configuration and knowledge base status
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Search { query, strict } => cmd_search(&settings, &query, strict),
        Commands::Parse {
            query,
            strict,
            json,
        } => cmd_parse(&query, strict, json),
        Commands::Retrieve {
            queries,
            retriever,
            no_dedupe,
        } => cmd_retrieve(settings, &queries, retriever, no_dedupe).await,
        Commands::Import { file } => cmd_import(&settings, &file),
        Commands::Status => cmd_status(&settings),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

fn open_store(settings: &Settings) -> Result<DocumentStore> {
    let path = settings.knowledge_base_path();
    DocumentStore::open(&path).with_context(|| format!("Failed to open knowledge base {:?}", path))
}

fn cmd_search(settings: &Settings, query: &str, strict: bool) -> Result<()> {
    let store = open_store(settings)?;
    let engine = SearchEngine::new(&store, settings.snippet);

    let output = if strict {
        engine.search_strict(query)?
    } else {
        engine.search(query)
    };

    if output.is_empty() {
        println!("[!] No matching documents.");
    } else {
        print!("{}", output);
    }
    Ok(())
}

fn cmd_parse(query: &str, strict: bool, json: bool) -> Result<()> {
    let expr = if strict {
        Some(parse_strict(query)?)
    } else {
        parse(query)
    };

    let Some(expr) = expr else {
        println!("[!] Empty query");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&expr)?);
    } else {
        println!("{}", expr);
    }
    println!("terms: {}", extract_terms(&expr).join(", "));
    Ok(())
}

async fn cmd_retrieve(
    mut settings: Settings,
    queries: &[String],
    retrievers: Vec<RetrieverKind>,
    no_dedupe: bool,
) -> Result<()> {
    if !retrievers.is_empty() {
        settings.retrievers.enabled = retrievers;
    }

    let store = open_store(&settings)?;
    let vector_index = if settings.retrievers.enabled.contains(&RetrieverKind::Vector) {
        Some(open_index(&settings.vector, store.shared()).await?)
    } else {
        None
    };

    let hybrid = HybridRetriever::from_settings(&store, &settings, vector_index)?;
    println!(
        "[*] Retrieving with: {}",
        hybrid
            .kinds()
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let docs = if no_dedupe {
        hybrid
            .retrieve_batch(queries)
            .await?
            .into_iter()
            .flatten()
            .collect()
    } else {
        RetrievalPipeline::new(hybrid).run(queries, "").await?
    };

    if docs.is_empty() {
        println!("\n[!] No documents retrieved.");
        return Ok(());
    }

    println!("\n[OK] {} documents:\n", docs.len());
    println!("{}", format_docs(&docs));
    Ok(())
}

fn cmd_import(settings: &Settings, file: &Path) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File not found: {:?}", file);
    }

    let incoming = DocumentStore::open(file)?;
    // collapse duplicate lines inside the import file before merging
    let docs = dedupe(incoming.documents().to_vec());

    let target = settings.knowledge_base_path();
    println!("[*] Importing {} documents into {:?}", docs.len(), target);
    let total = DocumentStore::save_merged(&target, &docs)?;
    println!("[OK] Knowledge base now holds {} documents", total);
    Ok(())
}

fn cmd_status(settings: &Settings) -> Result<()> {
    println!("chitrapur-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("[*] Data directory: {}", get_data_dir().display());

    match open_store(settings) {
        Ok(store) => {
            let stats = store.stats();
            println!("[OK] Knowledge base: {}", stats.path.display());
            println!("     Documents: {}", stats.document_count);
            println!("     Sources: {}", stats.source_count);
            println!(
                "     Content size: {}",
                format_bytes(stats.total_content_bytes)
            );
            if let Some(modified) = stats.modified {
                println!("     Modified: {}", modified.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        Err(e) => println!("[!] Knowledge base unreadable: {:#}", e),
    }

    println!(
        "[*] Retrievers: {}",
        settings
            .retrievers
            .enabled
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    if has_api_key() {
        println!("[OK] Gemini API key: set");
    } else {
        println!("[!] Gemini API key: not set (needed for the vector retriever with provider = \"gemini\")");
        println!("    export GEMINI_API_KEY=your-key");
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Document;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::parse_from([
            "chitrapur-rag",
            "--config",
            "x.toml",
            "retrieve",
            "temple",
            "shirali",
            "-r",
            "exact",
            "-r",
            "lexical",
            "--no-dedupe",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        match cli.command {
            Commands::Retrieve {
                queries,
                retriever,
                no_dedupe,
            } => {
                assert_eq!(queries, vec!["temple", "shirali"]);
                assert_eq!(retriever, vec![RetrieverKind::Exact, RetrieverKind::Lexical]);
                assert!(no_dedupe);
            }
            _ => panic!("expected retrieve"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_retriever() {
        assert!(Cli::try_parse_from(["chitrapur-rag", "retrieve", "q", "-r", "semantic"]).is_err());
    }

    #[test]
    fn test_import_merges_into_knowledge_base() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("batch.jsonl");
        DocumentStore::save_merged(
            &source,
            &[Document::new("body")
                .with_meta("source", "issue-1.pdf")
                .with_meta("title", "Editorial")],
        )
        .unwrap();

        let settings = Settings {
            knowledge_base: Some(dir.path().join("kb.jsonl")),
            ..Settings::default()
        };
        cmd_import(&settings, &source).unwrap();
        cmd_import(&settings, &source).unwrap();

        let store = open_store(&settings).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("issue-1.pdf-Editorial").is_some());
    }

    #[test]
    fn test_import_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            knowledge_base: Some(dir.path().join("kb.jsonl")),
            ..Settings::default()
        };
        assert!(cmd_import(&settings, &dir.path().join("absent.jsonl")).is_err());
    }
}
