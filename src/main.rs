use clap::{Parser, Subcommand};
use docs_rag::commands::{ask, init_config, reindex, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docs-rag")]
#[command(about = "Grounded documentation Q&A over a local markdown corpus")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to the current directory)
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question grounded in the indexed documentation
    Ask {
        /// The question to answer
        query: String,
    },
    /// Rebuild the embeddings cache and vector index
    Reindex,
    /// Create a starter config.toml, or show the effective configuration
    Config {
        /// Print the effective configuration instead of writing a starter file
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ask { query } => {
            ask(&cli.config_dir, &query).await?;
        }
        Commands::Reindex => {
            reindex(&cli.config_dir).await?;
        }
        Commands::Config { show } => {
            if show {
                show_config(&cli.config_dir)?;
            } else {
                init_config(&cli.config_dir)?;
            }
        }
    }

    Ok(())
}
