use chrono::Utc;
use clap::{Parser, Subcommand};
use docbot_core::{
    AnswerError, AnswerSource, ChatCompletionsClient, DocumentChatService, LanguageModel,
    LlmEndpointConfig, LocalDirectoryStorage, ResolverOptions, SearchOptions, UnconfiguredModel,
    DEFAULT_MATCH_THRESHOLD,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docbot", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding uploaded documents.
    #[arg(long, env = "DOCBOT_DOCUMENTS_DIR", default_value = "./data/uploads")]
    documents_dir: PathBuf,

    /// Minimum fuzzy score (0-100) for a document match.
    #[arg(long, env = "DOCBOT_MATCH_THRESHOLD", default_value_t = DEFAULT_MATCH_THRESHOLD)]
    threshold: u8,

    /// Seconds to wait for the LLM before giving up.
    #[arg(long, env = "DOCBOT_LLM_TIMEOUT_SECS", default_value = "30")]
    llm_timeout_secs: u64,

    /// Seconds to wait for a single document to parse.
    #[arg(long, env = "DOCBOT_PARSE_TIMEOUT_SECS", default_value = "60")]
    parse_timeout_secs: u64,

    /// Print results as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Re-scan the documents directory and report what indexes.
    Index,
    /// Copy a PDF, DOCX or TXT file into the documents directory and index it.
    Upload {
        /// File to upload.
        #[arg(long)]
        file: PathBuf,
    },
    /// Remove a document from the index and the documents directory.
    Delete {
        /// Document file name.
        #[arg(long)]
        name: String,
    },
    /// List indexed documents.
    List,
    /// Fuzzy-search indexed documents without LLM fallback.
    Search {
        #[arg(long)]
        query: String,
    },
    /// Answer a question from the documents, falling back to the LLM.
    Ask {
        #[arg(long)]
        question: String,
    },
}

fn build_language_model(timeout: Duration) -> Box<dyn LanguageModel> {
    let client = LlmEndpointConfig::from_env()
        .and_then(|config| ChatCompletionsClient::new(config, timeout));

    match client {
        Ok(client) => {
            info!(model = client.model(), "llm client configured");
            Box::new(client)
        }
        Err(error) => {
            warn!(%error, "llm fallback unavailable");
            Box::new(UnconfiguredModel::new(error.to_string()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let options = ResolverOptions {
        search: SearchOptions {
            threshold: cli.threshold,
        },
        llm_timeout: Duration::from_secs(cli.llm_timeout_secs),
        parse_timeout: Duration::from_secs(cli.parse_timeout_secs),
    };

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        documents_dir = %cli.documents_dir.display(),
        threshold = cli.threshold,
        "docbot boot"
    );

    let storage = Arc::new(LocalDirectoryStorage::open(&cli.documents_dir)?);
    let llm = build_language_model(options.llm_timeout);
    let service = DocumentChatService::open(storage, llm, options);

    match cli.command {
        Command::Index => {
            let report = service.rebuild().await?;
            for skipped in &report.skipped {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped document");
            }
            println!(
                "{} documents indexed, {} skipped at {}",
                report.indexed.len(),
                report.skipped.len(),
                Utc::now().to_rfc3339()
            );
        }
        Command::Upload { file } => {
            let summary = service.upload_path(&file).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "Document '{}' uploaded and indexed ({} chars, sha256={})",
                    summary.identifier, summary.chars, summary.checksum
                );
            }
        }
        Command::Delete { name } => {
            if service.delete(&name).await? {
                println!("Document '{name}' deleted");
            } else {
                println!("Document '{name}' was not found");
            }
        }
        Command::List => {
            let documents = service.list_documents();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&documents)?);
            } else if documents.is_empty() {
                println!("no documents indexed in {}", cli.documents_dir.display());
            } else {
                for document in documents {
                    println!(
                        "{}  chars={}  indexed_at={}  sha256={}",
                        document.identifier,
                        document.chars,
                        document.indexed_at.to_rfc3339(),
                        document.checksum
                    );
                }
            }
        }
        Command::Search { query } => {
            let matches = service.search(&query);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else if matches.is_empty() {
                println!("No matches found in uploaded documents.");
            } else {
                for found in matches {
                    println!(
                        "[{}] score={} token={}\n...{}...\n",
                        found.document_identifier, found.score, found.matched_token, found.snippet
                    );
                }
            }
        }
        Command::Ask { question } => match service.answer(&question).await {
            Ok(answer) => {
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&answer)?);
                } else {
                    let label = match answer.source {
                        AnswerSource::Document => "From your documents",
                        AnswerSource::Llm => "From the assistant",
                    };
                    println!("{label}:\n\n{}", answer.text);
                }
            }
            Err(AnswerError::Upstream(details)) => {
                warn!(%details, "llm fallback failed");
                anyhow::bail!(
                    "service unavailable: the assistant could not be reached ({details})"
                );
            }
            Err(error) => return Err(error.into()),
        },
    }

    Ok(())
}
