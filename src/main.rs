//! Canvasflow - answer requests or generate and revise code and documents.
//!
//! Runs one request through the stage graph per invocation; artifacts and
//! the identifier registry persist in the data directory between runs.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use canvasflow::core::Config;
use canvasflow::store::Store;
use canvasflow::{ChatRequest, Orchestrator};

/// Answer requests or generate and revise code and documents
#[derive(Parser)]
#[command(name = "canvasflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one request through the workflow
    Ask {
        /// The request
        message: String,

        /// Document to process alongside the request
        #[arg(short, long)]
        document: Option<PathBuf>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a stored artifact
    Show {
        /// Identifier (exact, partial or approximate)
        identifier: String,

        /// Also print the record metadata
        #[arg(short, long)]
        metadata: bool,
    },

    /// List recently used identifiers
    Recent,

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Credentials usually live in .env
    dotenvy::dotenv().ok();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    match cli.command {
        Commands::Ask { message, document, json } => cmd_ask(message, document, json)?,
        Commands::Show { identifier, metadata } => cmd_show(&identifier, metadata)?,
        Commands::Recent => cmd_recent()?,
        Commands::Config { path } => cmd_config(path)?,
        Commands::Completions { shell } => cmd_completions(shell),
    }

    Ok(())
}

/// Run one request and print the answer and canvas.
fn cmd_ask(message: String, document: Option<PathBuf>, json: bool) -> Result<()> {
    let config = Config::load()?;

    let rt = tokio::runtime::Runtime::new()?;
    let response = rt.block_on(async {
        let orchestrator = Orchestrator::from_config(&config).await?;

        let mut request = ChatRequest::new(message);
        if let Some(path) = document {
            let metadata = serde_json::json!({ "source": path.display().to_string() });
            request = request.with_document(path, metadata);
        }

        anyhow::Ok(orchestrator.handle(request).await)
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}", response.message);

    if let Some(canvas) = &response.canvas {
        let tag = response.target_format.as_deref().unwrap_or("text");
        println!();
        match &response.file_identifier {
            Some(id) => println!("--- canvas ({tag}, saved as {id}) ---"),
            None => println!("--- canvas ({tag}) ---"),
        }
        println!("{canvas}");
    }

    if let Some(error) = &response.error {
        eprintln!("\nwarning: {error}");
    }

    Ok(())
}

/// Print a stored artifact found through the layered lookup.
fn cmd_show(identifier: &str, metadata: bool) -> Result<()> {
    let config = Config::load()?;
    let store = Store::open(config.data_dir()?, &config.store)?;

    let Some(found) = store.content().resolve(identifier) else {
        anyhow::bail!("No content found for '{identifier}'");
    };

    if metadata {
        println!("# {}", found.key);
        println!("{}", serde_json::to_string_pretty(&found.record.metadata)?);
        println!();
    }
    println!("{}", found.record.content);

    Ok(())
}

/// Print the identifier registry.
fn cmd_recent() -> Result<()> {
    let config = Config::load()?;
    let store = Store::open(config.data_dir()?, &config.store)?;
    let registry = store.registry().read();

    if registry.recent.is_empty() {
        println!("No artifacts yet.");
        return Ok(());
    }

    if let Some(at) = registry.last_timestamp {
        println!("Last used: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    for (i, identifier) in registry.recent.iter().enumerate() {
        println!("{:>2}. {identifier}", i + 1);
    }

    Ok(())
}

/// Show configuration.
fn cmd_config(show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::config_path() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let config = Config::load()?;
    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "canvasflow", &mut io::stdout());
}
