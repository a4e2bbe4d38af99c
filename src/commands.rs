use console::{Style, style};
use dialoguer::Input;
use dialoguer::theme::ColorfulTheme;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::database::{Database, IngestedFile, VectorStoreGateway};
use crate::embeddings::{Embedder, LanguageModel, OllamaClient};
use crate::indexer::{IngestOutcome, Ingestor};
use crate::loader::is_supported;
use crate::qa::{Answer, Answerer, SourceCitation};
use crate::{DocQaError, Result};

pub const UNSUPPORTED_UPLOAD: &str = "Only PDF, TXT, and Markdown files are supported.";
pub const EMPTY_QUESTION: &str = "Question cannot be empty.";
const EXIT_COMMAND: &str = "exit";

/// Snapshot reported by `status`
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub documents_indexed: u64,
    pub ingested_files: Vec<IngestedFile>,
    pub uploaded_files: Vec<String>,
    /// `None` when no Ollama client is configured
    pub ollama_reachable: Option<bool>,
}

/// The wired-up pipeline behind every CLI command
pub struct DocQa {
    config: Config,
    ingestor: Ingestor,
    answerer: Answerer,
    ollama: Option<OllamaClient>,
}

impl DocQa {
    /// Wire the pipeline against the configured Ollama server
    #[inline]
    pub async fn new(config: Config) -> Result<Self> {
        let client = OllamaClient::new(&config)?;
        let shared = Arc::new(client.clone());
        let mut app = Self::with_services(config, shared.clone(), shared).await?;
        app.ollama = Some(client);
        Ok(app)
    }

    /// Wire the pipeline with explicit embedding and language-model services
    #[inline]
    pub async fn with_services(
        config: Config,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        let gateway = Arc::new(VectorStoreGateway::new(&config, embedder));
        let ledger = Database::initialize_from_config(&config)
            .await
            .map_err(|e| DocQaError::Database(format!("{e:#}")))?;

        Ok(Self {
            ingestor: Ingestor::new(&config, Arc::clone(&gateway), ledger),
            answerer: Answerer::new(gateway, llm),
            config,
            ollama: None,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stage a file into the upload directory and ingest it. Returns the
    /// message shown to the user.
    #[inline]
    pub async fn upload(&self, path: &Path) -> Result<String> {
        if !is_supported(path) {
            return Err(DocQaError::InvalidInput(UNSUPPORTED_UPLOAD.to_string()));
        }

        let staged = self.ingestor.gateway().uploads().stage(path)?;
        match self.ingestor.ingest_file(&staged).await {
            IngestOutcome::Ingested {
                filename,
                chunks_added,
            } => Ok(format!(
                "Successfully uploaded '{}' with {} chunks.",
                filename, chunks_added
            )),
            duplicate @ IngestOutcome::Duplicate { .. } => Ok(duplicate.to_string()),
            failed @ IngestOutcome::Failed { .. } => {
                Err(DocQaError::Other(anyhow::anyhow!("{}", failed)))
            }
        }
    }

    /// Ingest a file or every file in a directory
    #[inline]
    pub async fn ingest(&self, path: &Path) -> Result<Vec<IngestOutcome>> {
        if path.is_dir() {
            self.ingestor.ingest_directory(path).await
        } else {
            Ok(vec![self.ingestor.ingest_file(path).await])
        }
    }

    /// Answer one question with `k` chunks of context (configured default
    /// when `None`)
    #[inline]
    pub async fn ask(&self, question: &str, k: Option<usize>) -> Result<Answer> {
        let question = validate_question(question)?;
        let k = k.unwrap_or(self.config.retrieval.default_k);
        if k == 0 {
            return Err(DocQaError::InvalidInput(
                "k must be at least 1".to_string(),
            ));
        }

        self.answerer.answer(question, k).await
    }

    #[inline]
    pub async fn status(&self) -> Result<StatusReport> {
        let documents_indexed = self.ingestor.gateway().count().await?;
        let ingested_files = self
            .ingestor
            .ledger()
            .list_files()
            .await
            .map_err(|e| DocQaError::Database(format!("{e:#}")))?;
        let uploaded_files = self.files()?;

        let ollama_reachable = match &self.ollama {
            Some(client) => {
                let client = client.clone();
                let reachable = tokio::task::spawn_blocking(move || client.ping().is_ok())
                    .await
                    .unwrap_or(false);
                Some(reachable)
            }
            None => None,
        };

        Ok(StatusReport {
            documents_indexed,
            ingested_files,
            uploaded_files,
            ollama_reachable,
        })
    }

    /// Names of staged uploads
    #[inline]
    pub fn files(&self) -> Result<Vec<String>> {
        self.ingestor.gateway().uploads().list()
    }

    /// Delete the index, staged uploads and the ledger
    #[inline]
    pub async fn reset(&self) -> Result<()> {
        info!("Resetting vector store, uploads and ledger");
        self.ingestor.reset().await
    }
}

/// Trimmed question, or `InvalidInput` when it is blank
#[inline]
pub fn validate_question(question: &str) -> Result<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(DocQaError::InvalidInput(EMPTY_QUESTION.to_string()));
    }
    Ok(trimmed)
}

/// Colour for a distance score: close is green, middling yellow, far red
#[inline]
pub fn score_style(score: Option<f64>) -> Style {
    match score {
        Some(s) if s <= 0.3 => Style::new().green(),
        Some(s) if s <= 0.5 => Style::new().yellow(),
        Some(_) => Style::new().red(),
        None => Style::new().dim(),
    }
}

#[inline]
pub fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "N/A".to_string(), |s| format!("{:.2}", s))
}

fn print_citation(index: usize, citation: &SourceCitation) {
    let score = score_style(citation.score).apply_to(format_score(citation.score));
    println!(
        "  {}. {} (score: {})",
        index + 1,
        style(&citation.source).bold(),
        score
    );
    println!("     {}", style(&citation.snippet).dim());
}

#[inline]
pub fn print_answer(answer: &Answer) {
    println!("{}", style("Answer:").cyan().bold());
    println!("{}", answer.answer.trim());

    if !answer.sources.is_empty() {
        println!();
        println!("{}", style("Sources:").cyan().bold());
        for (index, citation) in answer.sources.iter().enumerate() {
            print_citation(index, citation);
        }
    }
}

/// Upload one file and print the result
#[inline]
pub async fn upload_file(app: &DocQa, path: &Path) -> Result<()> {
    let message = app.upload(path).await?;
    println!("{}", message);
    Ok(())
}

/// Ingest a file or directory and print one line per file
#[inline]
pub async fn ingest_path(app: &DocQa, path: &Path) -> Result<()> {
    let outcomes = app.ingest(path).await?;

    for outcome in &outcomes {
        match outcome {
            IngestOutcome::Ingested { .. } => println!("{} {}", style("✓").green(), outcome),
            IngestOutcome::Duplicate { .. } => println!("{} {}", style("-").yellow(), outcome),
            IngestOutcome::Failed { .. } => println!("{} {}", style("✗").red(), outcome),
        }
    }

    let ingested = outcomes.iter().filter(|o| o.is_ingested()).count();
    println!("{}/{} files ingested", ingested, outcomes.len());
    Ok(())
}

/// Answer a single question, or prompt repeatedly until `exit`
#[inline]
pub async fn ask_questions(app: &DocQa, question: Option<String>, k: Option<usize>) -> Result<()> {
    if let Some(question) = question {
        let answer = app.ask(&question, k).await?;
        print_answer(&answer);
        return Ok(());
    }

    println!(
        "Ask questions about your documents. Type '{}' to quit.",
        EXIT_COMMAND
    );

    loop {
        let input: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Question")
            .interact_text()
            .map_err(|e| DocQaError::Other(anyhow::anyhow!("Failed to read question: {}", e)))?;

        if input.trim().eq_ignore_ascii_case(EXIT_COMMAND) {
            break;
        }

        match app.ask(&input, k).await {
            Ok(answer) => print_answer(&answer),
            Err(DocQaError::InvalidInput(message)) => println!("{}", style(message).yellow()),
            Err(e) => {
                warn!("Failed to answer question: {}", e);
                println!("{} {}", style("Error:").red().bold(), e);
            }
        }
        println!();
    }

    Ok(())
}

#[inline]
pub async fn show_status(app: &DocQa) -> Result<()> {
    let report = app.status().await?;

    println!("{}", style("doc-qa status").bold());
    println!("  Documents indexed: {}", report.documents_indexed);
    println!("  Base directory: {}", app.config().get_base_dir().display());

    println!();
    println!("Ingested files ({}):", report.ingested_files.len());
    for file in &report.ingested_files {
        println!("  {}", file);
    }

    println!();
    println!("Uploaded files ({}):", report.uploaded_files.len());
    for name in &report.uploaded_files {
        println!("  {}", name);
    }

    println!();
    let ollama_url = app
        .config()
        .ollama_url()
        .map_or_else(|_| "invalid URL".to_string(), |url| url.to_string());
    match report.ollama_reachable {
        Some(true) => println!("  Ollama: {} ({})", style("reachable").green(), ollama_url),
        Some(false) => println!("  Ollama: {} ({})", style("unreachable").red(), ollama_url),
        None => println!("  Ollama: not checked"),
    }

    Ok(())
}

#[inline]
pub fn list_files(app: &DocQa) -> Result<()> {
    let files = app.files()?;

    if files.is_empty() {
        println!("No files have been uploaded yet.");
        println!("Use 'doc-qa upload <file>' to add one.");
        return Ok(());
    }

    println!("Uploaded files ({} total):", files.len());
    for name in &files {
        println!("  {}", name);
    }
    Ok(())
}

#[inline]
pub async fn reset_all(app: &DocQa) -> Result<()> {
    app.reset().await?;
    println!("Vector store, uploads and ingestion records cleared.");
    Ok(())
}

/// Write the effective configuration to disk
#[inline]
pub fn init_config(config: &Config) -> Result<()> {
    config.save()?;
    println!(
        "Configuration written to {}",
        config.config_file_path().display()
    );
    Ok(())
}
