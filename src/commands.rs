use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{Config, get_config_dir};
use crate::engine::{ChatEngine, ProcessingStats};
use crate::extract::UploadedFile;
use crate::session::SessionStore;

fn load_config() -> Result<Config> {
    let config_dir = get_config_dir()?;
    Config::load(config_dir)
}

/// Print the active configuration and where it lives.
#[inline]
pub fn show_config() -> Result<()> {
    let config = load_config()?;

    println!("Configuration file: {}", config.config_file_path().display());
    println!();
    print!("{}", toml::to_string_pretty(&config).context("Failed to render config")?);
    Ok(())
}

/// Write the default configuration file if none exists yet.
#[inline]
pub fn init_config() -> Result<()> {
    let config = load_config()?;
    let path = config.config_file_path();

    if path.exists() {
        println!("Configuration already exists: {}", path.display());
        return Ok(());
    }

    config.save()?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn read_uploads(files: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    files
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let bytes = fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(UploadedFile::new(name, bytes))
        })
        .collect()
}

fn report_processing(stats: &ProcessingStats) {
    for warning in &stats.warnings {
        println!("Warning: {warning}");
    }
    println!(
        "Processed {} file(s) into {} chunks (embedding dimension {}).",
        stats.files, stats.chunks, stats.dimension
    );
}

fn build_engine(files: &[PathBuf], top_k: Option<usize>) -> Result<ChatEngine> {
    let mut config = load_config()?;
    if let Some(top_k) = top_k {
        config.retrieval.top_k = top_k;
    }

    let mut engine = ChatEngine::new(config)?;

    if !files.is_empty() {
        info!("Processing {} document(s)", files.len());
        let uploads = read_uploads(files)?;
        let stats = engine.process_documents(&uploads)?;
        report_processing(&stats);
    }

    Ok(engine)
}

/// Process the given documents (if any) and answer a single question.
#[inline]
pub fn ask(files: &[PathBuf], question: &str, top_k: Option<usize>) -> Result<()> {
    let mut engine = build_engine(files, top_k)?;

    let answer = engine.ask(question)?;
    println!("{answer}");
    Ok(())
}

/// Process the given documents and answer questions read from stdin until
/// EOF. The index is built once and queried for every question.
#[inline]
pub fn chat(files: &[PathBuf], top_k: Option<usize>) -> Result<()> {
    let mut engine = build_engine(files, top_k)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("Failed to read question")? == 0 {
            break;
        }

        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        match engine.ask(question) {
            Ok(answer) => println!("{answer}"),
            Err(e) => eprintln!("{e}"),
        }
    }

    Ok(())
}

/// Print the most recent turns of the current session.
#[inline]
pub fn history(limit: usize) -> Result<()> {
    let config = load_config()?;
    let store = SessionStore::new(config.sessions_dir_path(), config.session.max_turns)?;
    let id = store.create_or_resume()?;

    let turns = store.load_recent(id, limit)?;
    if turns.is_empty() {
        println!("No chat history yet.");
        return Ok(());
    }

    for turn in turns {
        println!("[{}] You: {}", turn.asked_at.format("%Y-%m-%d %H:%M:%S"), turn.question);
        println!(
            "[{}] Bot: {}",
            turn.answered_at.format("%Y-%m-%d %H:%M:%S"),
            turn.answer
        );
        println!();
    }

    Ok(())
}

/// Delete the current session's conversation history.
#[inline]
pub fn clear() -> Result<()> {
    let config = load_config()?;
    let store = SessionStore::new(config.sessions_dir_path(), config.session.max_turns)?;
    let id = store.create_or_resume()?;

    store.clear(id)?;
    println!("Chat history cleared.");
    Ok(())
}

/// Remove sessions idle past the retention window.
#[inline]
pub fn reap(older_than_days: Option<u64>) -> Result<()> {
    let config = load_config()?;
    let days = older_than_days.unwrap_or(config.session.retention_days);
    let store = SessionStore::new(config.sessions_dir_path(), config.session.max_turns)?;

    let removed = store.reap_expired(days)?;
    println!("Removed {removed} expired session(s).");
    Ok(())
}
