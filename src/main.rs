use clap::{Parser, Subcommand};
use doc_qa::Result;
use doc_qa::commands::{
    DocQa, ask_questions, ingest_path, init_config, list_files, reset_all, show_status,
    upload_file,
};
use doc_qa::config::{Config, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "doc-qa")]
#[command(about = "Ask questions about your PDF, text and Markdown documents using a local LLM")]
#[command(version)]
struct Cli {
    /// Delete the vector store, uploads and ingestion records before running
    #[arg(long, global = true)]
    fresh_start: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy a document into the upload directory and index it
    Upload {
        /// PDF, TXT or Markdown file
        file: PathBuf,
    },
    /// Index a document or every document in a directory
    Ingest {
        /// File or directory
        path: PathBuf,
    },
    /// Ask a question, or start an interactive session when none is given
    Ask {
        question: Option<String>,
        /// Number of chunks to retrieve as context
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Show what is indexed and whether Ollama is reachable
    Status,
    /// List uploaded files
    Files,
    /// Delete the vector store, uploads and ingestion records
    Reset,
    /// Configure Ollama connection and settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Write the default configuration file
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Commands::Config { show, init } = cli.command {
        if show {
            show_config()?;
        } else if init {
            init_config(&Config::load_default()?)?;
        } else {
            run_interactive_config()?;
        }
        return Ok(());
    }

    let app = DocQa::new(Config::load_default()?).await?;
    if cli.fresh_start {
        app.reset().await?;
    }

    match cli.command {
        Commands::Upload { file } => upload_file(&app, &file).await?,
        Commands::Ingest { path } => ingest_path(&app, &path).await?,
        Commands::Ask { question, k } => ask_questions(&app, question, k).await?,
        Commands::Status => show_status(&app).await?,
        Commands::Files => list_files(&app)?,
        Commands::Reset => reset_all(&app).await?,
        Commands::Config { .. } => {}
    }

    Ok(())
}
