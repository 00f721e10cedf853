use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use studybuddy_core::bootstrap::{Services, create_backend, create_embedder, create_index_backend};
use studybuddy_core::config::{BackendKind, Config};
use studybuddy_core::session::{self, ChatSession, Command};
use studybuddy_core::{Generation, RagError};
use studybuddy_index::{CorpusIndexer, SearchResult, load_corpus};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(
    name = "studybuddy",
    version,
    about = "Answer AZ-900 questions from indexed course notes"
)]
struct Cli {
    /// Configuration file (falls back to STUDYBUDDY_CONFIG, then config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Interactive chat; choose a model with `/model <hosted|local> [api-key]`
    Chat,
    /// Answer a single question and print usage and latency
    Ask {
        question: String,

        /// Print the retrieved chunks and the rendered prompt
        #[arg(long, default_value_t = false)]
        show_context: bool,

        /// Override `llm.backend` for this question
        #[arg(long)]
        backend: Option<BackendKind>,
    },
    /// Drop and rebuild the index from a corpus file
    Index {
        /// Corpus file (JSON array or JSON lines); defaults to `index.corpus_path`
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config_path = studybuddy_core::bootstrap::resolve_config_path(cli.config.as_deref());
    let config = Config::load(&config_path)?;
    config.validate()?;
    tracing::debug!(path = %config_path.display(), "configuration loaded");

    match cli.command {
        Cmd::Chat => run_chat(&config).await,
        Cmd::Ask {
            question,
            show_context,
            backend,
        } => run_ask(&config, &question, show_context, backend).await,
        Cmd::Index { corpus } => run_index(&config, corpus.as_deref()).await,
    }
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn answer_timeout(config: &Config) -> Duration {
    Duration::from_secs(config.timeouts.answer_seconds)
}

async fn run_ask(
    config: &Config,
    question: &str,
    show_context: bool,
    backend: Option<BackendKind>,
) -> anyhow::Result<()> {
    let kind = backend
        .or(config.llm.backend)
        .ok_or(RagError::NotConfigured)
        .context("pass --backend or set llm.backend")?;
    let services = Services::from_config(config).await?;
    let rag = services.rag(create_backend(kind, config, None)?);
    tracing::debug!(backend = rag.backend_name(), model = rag.model(), "answering");

    let outcome = tokio::time::timeout(answer_timeout(config), rag.answer_with_context(question))
        .await
        .with_context(|| {
            format!(
                "no answer within {}s (timeouts.answer_seconds)",
                config.timeouts.answer_seconds
            )
        })??;

    if show_context {
        print_context(&outcome.results);
        println!("--- Prompt ---\n{}\n", outcome.prompt);
    }
    print_generation(&outcome.generation);
    Ok(())
}

fn print_context(results: &[SearchResult]) {
    println!("--- Retrieved Context ---");
    for (rank, r) in results.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} / {} ({})",
            rank + 1,
            r.score,
            r.header,
            r.subheader,
            r.doc_id
        );
    }
    println!();
}

fn print_generation(generation: &Generation) {
    println!("{}", generation.answer);
    match &generation.usage {
        Some(usage) => println!("\n[usage: {usage}]"),
        None => println!("\n[usage: not reported]"),
    }
    println!("[latency: {:.2}s]", generation.latency);
}

async fn run_chat(config: &Config) -> anyhow::Result<()> {
    let services = Services::from_config(config).await?;
    let mut chat = ChatSession::new();
    if let Some(kind) = config.llm.backend {
        match create_backend(kind, config, None) {
            Ok(backend) => chat.set_rag(services.rag(backend)),
            Err(e) => eprintln!("{e:#}"),
        }
    }

    println!("AZ-900 study chat. Ask a question, or /help for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match session::parse_command(line) {
            Some(Ok(Command::Model { kind, api_key })) => {
                match create_backend(kind, config, api_key.as_ref()) {
                    Ok(backend) => {
                        let rag = services.rag(backend);
                        println!("Using {} ({}).", rag.backend_name(), rag.model());
                        chat.set_rag(rag);
                    }
                    Err(e) => println!("{e:#}"),
                }
            }
            Some(Ok(Command::History)) => {
                for message in chat.history() {
                    println!("{:?}: {}", message.role, message.content);
                }
            }
            Some(Ok(Command::Clear)) => chat.clear_history(),
            Some(Ok(Command::Help)) => println!("{}", session::HELP),
            Some(Ok(Command::Quit)) => break,
            Some(Err(message)) => println!("{message}"),
            None => match tokio::time::timeout(answer_timeout(config), chat.ask(line)).await {
                Ok(Ok(answer)) => println!("Assistant: {answer}"),
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "question failed");
                    println!("Sorry, I could not answer that: {e}");
                }
                Err(_) => println!(
                    "Sorry, no answer within {}s.",
                    config.timeouts.answer_seconds
                ),
            },
        }
    }
    Ok(())
}

async fn run_index(config: &Config, corpus: Option<&Path>) -> anyhow::Result<()> {
    let path = corpus.map_or_else(|| PathBuf::from(&config.index.corpus_path), Path::to_path_buf);
    let records = load_corpus(&path)
        .await
        .with_context(|| format!("failed to load corpus {}", path.display()))?;

    let embedder = create_embedder(&config.embedding).await?;
    let indexer = CorpusIndexer::new(create_index_backend(config), embedder, &config.index.name)
        .with_retry(config.index.retry);
    let report = indexer
        .run(records)
        .await
        .with_context(|| format!("failed to index into {}", config.index.name))?;

    println!(
        "Indexed {} chunks into '{}' ({} dims, {} vectors computed).",
        report.indexed, config.index.name, report.dims, report.embedded_fields
    );
    Ok(())
}
