#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, DuplicateCheck, OllamaConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 doc-qa Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure the Ollama instance used for embeddings and answers.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Ingestion").bold().yellow());
    configure_ingestion(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before ingesting.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.ollama.embedding_model).cyan()
    );
    eprintln!("  Chat Model: {}", style(&config.ollama.chat_model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Chunking:").bold().yellow());
    eprintln!("  Chunk Size: {}", style(config.chunking.chunk_size).cyan());
    eprintln!("  Overlap: {}", style(config.chunking.chunk_overlap).cyan());

    eprintln!();
    eprintln!("{}", style("Ingestion:").bold().yellow());
    eprintln!(
        "  Duplicate Check: {}",
        style(config.ingestion.duplicate_check).cyan()
    );
    eprintln!(
        "  Sample Size: {}",
        style(config.ingestion.duplicate_sample_size).cyan()
    );
    eprintln!("  Default k: {}", style(config.retrieval.default_k).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
    eprintln!(
        "Vector store: {}",
        style(config.vector_store_path().display()).dim()
    );
    eprintln!(
        "Uploads: {}",
        style(config.upload_dir_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    let base_dir = Config::default_base_dir().context("Failed to determine base directory")?;
    Config::load(&base_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No usable configuration found. Using defaults.").yellow()
            );
            Ok(Config::with_base_dir(&base_dir))
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()?;
            Ok(())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.embedding_model.clone())
        .validate_with(non_empty_model)
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(ollama.chat_model.clone())
        .validate_with(non_empty_model)
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_embedding_model(embedding_model)?;
    ollama.set_chat_model(chat_model)?;

    Ok(())
}

fn configure_ingestion(config: &mut Config) -> Result<()> {
    let strategies = &["sample", "exact"];
    let default_index = match config.ingestion.duplicate_check {
        DuplicateCheck::Sample => 0,
        DuplicateCheck::Exact => 1,
    };

    let selected = Select::new()
        .with_prompt("Duplicate check")
        .default(default_index)
        .items(strategies)
        .interact()?;

    config.ingestion.duplicate_check = if selected == 0 {
        DuplicateCheck::Sample
    } else {
        DuplicateCheck::Exact
    };

    let chunk_size: usize = Input::new()
        .with_prompt("Chunk size (characters)")
        .default(config.chunking.chunk_size)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (50..=8192).contains(input) {
                Ok(())
            } else {
                Err("Chunk size must be between 50 and 8192")
            }
        })
        .interact_text()?;

    let chunk_overlap: usize = Input::new()
        .with_prompt("Chunk overlap (characters)")
        .default(config.chunking.chunk_overlap.min(chunk_size - 1))
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input < chunk_size {
                Ok(())
            } else {
                Err("Overlap must be smaller than the chunk size")
            }
        })
        .interact_text()?;

    config.chunking.chunk_size = chunk_size;
    config.chunking.chunk_overlap = chunk_overlap;

    Ok(())
}

fn non_empty_model(input: &String) -> Result<(), &'static str> {
    if input.trim().is_empty() {
        Err("Model name cannot be empty")
    } else {
        Ok(())
    }
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    let url = format!(
        "{}://{}:{}/api/version",
        ollama.protocol, ollama.host, ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) => (400..500).contains(&code),
        Err(_) => false,
    }
}
