//! Docvault command-line interface.
//!
//! Every command acts on behalf of one owner (`--owner`) against the store
//! configured in `docvault.toml`, `--config` or `--store`. Results are printed
//! to stdout as JSON; logs and progress go to stderr.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docvault::{DocumentId, DocumentVault, OwnerId, ProgressEvent, ProgressReporter, VaultConfig};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "docvault")]
#[command(version, about = "Store documents and extract their text", long_about = None)]
struct Cli {
    /// Identity that owns the documents acted on
    #[arg(short, long, global = true, default_value = "default")]
    owner: String,

    /// Configuration file (TOML, YAML or JSON); defaults to a discovered docvault.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Store directory, overriding the configuration
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a file and extract its text
    Ingest {
        /// File to ingest
        path: PathBuf,

        /// Media type (guessed from the file name when omitted)
        #[arg(short, long)]
        mime: Option<String>,

        /// Stored file name (defaults to the file's own name)
        #[arg(short, long)]
        name: Option<String>,

        /// Print progress events to stderr
        #[arg(long)]
        progress: bool,
    },

    /// Print the extracted text of a document
    Text {
        id: String,

        /// Print the full JSON response instead of the bare text
        #[arg(long)]
        json: bool,
    },

    /// List documents, newest first
    List,

    /// Delete one or more documents
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Export a document as JSON (metadata, text and base64 bytes)
    Export {
        id: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the original bytes of a document to a file
    Raw {
        id: String,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run extraction again over a stored document
    Reextract {
        id: String,

        #[arg(long)]
        progress: bool,
    },

    /// Print storage statistics
    Stats,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docvault=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(config: Option<&Path>, store: Option<&Path>) -> Result<VaultConfig> {
    let mut config = match config {
        Some(path) => VaultConfig::from_file(path).with_context(|| format!("Failed to load {}", path.display()))?,
        None => VaultConfig::discover()
            .context("Failed to read discovered docvault.toml")?
            .unwrap_or_default(),
    };

    if let Some(store) = store {
        config.storage.root = Some(store.to_path_buf());
    }
    Ok(config)
}

fn parse_id(raw: &str) -> Result<DocumentId> {
    raw.parse::<DocumentId>()
        .with_context(|| format!("'{}' is not a document id", raw))
}

fn progress_reporter(enabled: bool) -> ProgressReporter {
    if !enabled {
        return ProgressReporter::silent();
    }
    ProgressReporter::from_fn(|event: &ProgressEvent| match &event.error {
        Some(error) => eprintln!("[{:>3}%] {}: {}", event.percent, event.stage, error),
        None => eprintln!("[{:>3}%] {}", event.percent, event.stage),
    })
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_config(cli.config.as_deref(), cli.store.as_deref())?;
    let vault = DocumentVault::open(config).context("Failed to open document vault")?;
    let owner = OwnerId::new(cli.owner);

    let result = run(&vault, &owner, cli.command).await;

    if let Err(e) = vault.shutdown().await {
        tracing::warn!("Recognition engine shutdown failed: {}", e);
    }
    result
}

async fn run(vault: &DocumentVault, owner: &OwnerId, command: Commands) -> Result<()> {
    match command {
        Commands::Ingest {
            path,
            mime,
            name,
            progress,
        } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let mime = mime.unwrap_or_else(|| guess_mime(&path));
            let name = match name {
                Some(name) => name,
                None => path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .context("Path has no file name; pass --name")?,
            };

            let record = vault
                .ingest(bytes, &mime, &name, owner, &progress_reporter(progress))
                .await?;
            print_json(&json!({
                "document": record.summary(),
                "extraction_error": record.extraction_error,
                "page_count": record.page_count,
            }))
        }

        Commands::Text { id, json } => {
            let text = vault.get_text(&parse_id(&id)?, owner).await?;
            if json {
                print_json(&text)
            } else {
                println!("{}", text.text);
                Ok(())
            }
        }

        Commands::List => print_json(&vault.list_documents(owner).await?),

        Commands::Delete { ids } => {
            let outcomes = vault.delete_documents(&ids, owner).await;
            print_json(&outcomes)?;
            if outcomes.iter().any(|o| !o.success) {
                bail!("{} of {} deletions failed", outcomes.iter().filter(|o| !o.success).count(), outcomes.len());
            }
            Ok(())
        }

        Commands::Export { id, output } => {
            let export = vault.export_document(&parse_id(&id)?, owner).await?;
            let body = export.to_json()?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, body)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Exported {} to {}", export.name, path.display());
                }
                None => println!("{}", body),
            }
            Ok(())
        }

        Commands::Raw { id, output } => {
            let raw = vault.fetch_raw_file(&parse_id(&id)?, owner).await?;
            tokio::fs::write(&output, &raw.bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            print_json(&json!({
                "name": raw.name,
                "mime_type": raw.mime_type,
                "size_bytes": raw.bytes.len(),
                "output": output,
            }))
        }

        Commands::Reextract { id, progress } => {
            let record = vault
                .reextract_document(&parse_id(&id)?, owner, &progress_reporter(progress))
                .await?;
            print_json(&json!({
                "document": record.summary(),
                "extraction_error": record.extraction_error,
                "last_extraction_at": record.last_extraction_at,
            }))
        }

        Commands::Stats => print_json(&vault.storage_stats(owner).await?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["docvault", "list", "--owner", "alice", "--store", "/tmp/v"]).unwrap();
        assert_eq!(cli.owner, "alice");
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/v")));
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn test_delete_requires_ids() {
        assert!(Cli::try_parse_from(["docvault", "delete"]).is_err());
    }

    #[test]
    fn test_guess_mime_from_extension() {
        assert_eq!(guess_mime(Path::new("scan.pdf")), "application/pdf");
        assert_eq!(guess_mime(Path::new("no_extension")), "application/octet-stream");
    }

    #[test]
    fn test_store_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("vault.toml");
        std::fs::write(&config_path, "[storage]\nroot = \"/somewhere/else\"\n").unwrap();

        let config = load_config(Some(&config_path), Some(Path::new("/override"))).unwrap();
        assert_eq!(config.storage.root, Some(PathBuf::from("/override")));
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!(parse_id("nope").is_err());
    }
}
