//! AskCareer CLI - career guidance from a role/skill graph and a document index

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use askcareer_documents::{IndexMetadata, IngestMode, Ingestor, RecursiveCharacterSplitter};
use askcareer_retrieval::{
    AssistantConfig, CareerAssistant, ERROR_ANSWER, embedding_provider, format_document_context,
    format_role, format_skill,
};

#[derive(Parser)]
#[command(name = "askcareer")]
#[command(
    version,
    about = "Career guidance from a role/skill graph and a document index",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file (defaults to $ASKCAREER_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Query(QueryCommand),

    /// Build the document index from the markdown knowledge base
    Ingest {
        /// Only reprocess new and modified files
        #[arg(long)]
        incremental: bool,
    },
}

/// Commands answered by the assistant.
#[derive(Subcommand)]
enum QueryCommand {
    /// Ask a free-text career question
    Ask {
        #[arg(required = true)]
        question: Vec<String>,
    },

    /// Show a role and where it can lead
    Role { name: String },

    /// Show a skill, the roles needing it and its prerequisites
    Skill { name: String },

    /// Show the path and skill gap between two roles
    Transition { from: String, to: String },

    /// Ask which skills to develop to move between roles
    Gaps { current: String, target: String },

    /// Ask what a role involves
    Describe { role: String },

    /// Ask for a learning path between two roles
    Path { from: String, to: String },

    /// Search the document index
    Search {
        #[arg(required = true)]
        query: Vec<String>,
        /// Number of chunks to return
        #[arg(short, long, default_value_t = 3)]
        k: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AssistantConfig::from_env(cli.config.as_deref()).await?;

    let command = match cli.command {
        Commands::Ingest { incremental } => {
            cmd_ingest(&config, incremental).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Query(command) => command,
    };

    // Startup failures, such as a missing credential, end here with the
    // error itself rather than the apology.
    let assistant = CareerAssistant::from_config(config).await?;
    match run(&assistant, command).await {
        Ok(output) => {
            println!("{output}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!("Error processing request: {err}");
            println!("{ERROR_ANSWER}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(
    assistant: &CareerAssistant,
    command: QueryCommand,
) -> askcareer_retrieval::Result<String> {
    match command {
        QueryCommand::Ask { question } => Ok(assistant
            .answer_question(&question.join(" "))
            .await?
            .to_string()),
        QueryCommand::Role { name } => cmd_role(assistant, &name).await,
        QueryCommand::Skill { name } => Ok(match assistant.skill_info(&name).await? {
            Some(info) => format_skill(&info),
            None => format!("Skill {name} was not found in the career graph."),
        }),
        QueryCommand::Transition { from, to } => Ok(assistant
            .transition_report(&from, &to)
            .await?
            .unwrap_or_else(|| format!("No transition path found from {from} to {to}."))),
        QueryCommand::Gaps { current, target } => {
            Ok(assistant.skill_gaps(&current, &target).await?.to_string())
        }
        QueryCommand::Describe { role } => {
            Ok(assistant.role_description(&role).await?.to_string())
        }
        QueryCommand::Path { from, to } => {
            Ok(assistant.learning_path(&from, &to).await?.to_string())
        }
        QueryCommand::Search { query, k } => {
            let documents = assistant.relevant_documents(&query.join(" "), k).await?;
            if documents.is_empty() {
                return Ok("No matching documents.".to_string());
            }
            Ok(format_document_context(&documents))
        }
    }
}

/// A role card followed by every reachable role from the vocabulary.
async fn cmd_role(assistant: &CareerAssistant, name: &str) -> askcareer_retrieval::Result<String> {
    let Some(info) = assistant.role_info(name).await? else {
        return Ok(format!("Role {name} was not found in the career graph."));
    };

    let mut sections = vec![format_role(&info)];
    for target in assistant.roles() {
        if target == name {
            continue;
        }
        if let Some(report) = assistant.transition_report(name, &target).await? {
            sections.push(report);
        }
    }
    Ok(sections.join("\n\n"))
}

async fn cmd_ingest(config: &AssistantConfig, incremental: bool) -> anyhow::Result<()> {
    let splitter =
        RecursiveCharacterSplitter::new(config.index.chunk_size, config.index.chunk_overlap)?;
    let provider = embedding_provider(&config.embedding).await?;
    let ingestor = Ingestor::new(&config.index.data_dir, &config.index.dir, provider)
        .with_splitter(splitter);

    let mode = if incremental {
        IngestMode::Incremental
    } else {
        IngestMode::Full
    };
    let report = ingestor.run(mode).await?;
    if let Some(backup) = &report.backup {
        info!("Previous index backed up to {}", backup.display());
    }
    if report.removed > 0 {
        info!("Dropped {} deleted documents from the index", report.removed);
    }

    match IndexMetadata::read(&config.index.dir).await? {
        Some(metadata) => println!("{}", metadata.summary()),
        None => println!(
            "Processed {} documents into {} chunks",
            report.documents, report.total_chunks
        ),
    }
    Ok(())
}
