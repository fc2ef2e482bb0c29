//! # DocTalk — chat with a PDF
//!
//! Ingests a PDF into a per-document vector index and answers questions
//! against it with retrieval-augmented generation.
//!
//! Usage:
//!   doctalk ingest report.pdf              # Prints the new document id
//!   doctalk ask doc_1738755985255_1a2b3c4d "What does chapter 2 claim?"
//!   doctalk list                           # Stored documents

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use doctalk_core::DocTalkConfig;
use doctalk_core::traits::{AnswerGenerator, DocumentStore, TextExtractor};
use doctalk_extract::PdfExtractor;
use doctalk_index::{RetrievalPipeline, system_prompt};
use doctalk_providers::create_provider;
use doctalk_store::SqliteStore;

#[derive(Parser)]
#[command(name = "doctalk", version, about = "📄 DocTalk — chat with a PDF")]
struct Cli {
    /// Config file path (default: ~/.doctalk/config.toml)
    #[arg(long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a PDF: extract, chunk, embed, and store its passages
    Ingest {
        /// Path to the PDF file
        pdf: String,
    },
    /// Ask a question against an ingested document
    Ask {
        /// Document id printed by `ingest` (see `list`)
        document_id: String,
        /// The question to answer
        question: String,
        /// How many passages to retrieve as context
        #[arg(long)]
        top_k: Option<usize>,
        /// Print the retrieved passages and scores alongside the answer
        #[arg(long)]
        show_context: bool,
    },
    /// List ingested documents
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "doctalk=debug" } else { "doctalk=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => DocTalkConfig::load_from(Path::new(path))?,
        None => DocTalkConfig::load()?,
    };

    let db_path = shellexpand::tilde(&config.store.db_path).to_string();
    let store = Arc::new(SqliteStore::open(Path::new(&db_path))?);

    match cli.command {
        Command::Ingest { pdf } => {
            let provider = create_provider(&config)?;
            let pipeline = RetrievalPipeline::new(
                provider,
                Arc::clone(&store) as Arc<dyn DocumentStore>,
                config.embedding.max_concurrent,
            );

            // The file bytes live only in this scope; the pipeline only ever
            // sees the extracted text.
            let bytes = std::fs::read(&pdf).with_context(|| format!("reading {pdf}"))?;
            let text = PdfExtractor::new().extract(&bytes)?;
            let file_name = Path::new(&pdf)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| pdf.clone());

            let index = pipeline.ingest(&text, &file_name).await?;
            println!(
                "✅ Ingested {} ({} passages)",
                index.file_name,
                index.records.len()
            );
            println!("Document id: {}", index.document_id);
        }

        Command::Ask { document_id, question, top_k, show_context } => {
            let provider = create_provider(&config)?;
            let pipeline = RetrievalPipeline::new(
                provider.clone(),
                Arc::clone(&store) as Arc<dyn DocumentStore>,
                config.embedding.max_concurrent,
            );

            let k = top_k.unwrap_or(config.retrieval.top_k);
            let outcome = pipeline.query_document(&question, &document_id, k).await?;
            let answer = provider
                .generate(&system_prompt(&outcome.context), &question)
                .await?;

            println!("{answer}");
            println!();
            for m in &outcome.matches {
                println!("  {} (score {:.3})", m.citation(), m.score);
                if show_context {
                    println!("    {}", m.record.text.replace('\n', "\n    "));
                }
            }
        }

        Command::List => {
            let docs = store.list().await?;
            if docs.is_empty() {
                println!("No documents ingested yet.");
            }
            for (document_id, file_name) in docs {
                println!("{document_id}  {file_name}");
            }
        }
    }

    Ok(())
}
