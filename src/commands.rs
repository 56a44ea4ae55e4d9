use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::pipeline::RagPipeline;

/// Answer a query against the indexed corpus and print the response.
#[inline]
pub async fn ask(config_dir: &Path, query: &str) -> Result<()> {
    let config = Config::load(config_dir)?;
    let pipeline = RagPipeline::new(config)?;

    let answer = pipeline.answer(query).await?;
    println!("{answer}");

    Ok(())
}

/// Rebuild the embeddings cache from the documents on disk, ignoring any
/// existing cache blob.
#[inline]
pub async fn reindex(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir)?;
    let docs_dir = config.docs_dir.clone();
    let pipeline = RagPipeline::new(config)?;

    info!("Reindexing corpus in {}", docs_dir.display());
    let corpus = pipeline.rebuild().await?;

    println!(
        "Indexed {} chunks from {}",
        corpus.chunks.len(),
        docs_dir.display()
    );
    if corpus.index.is_none() {
        println!("Warning: vector index unavailable, queries will use lexical fallback");
    }

    Ok(())
}

/// Print the effective configuration as TOML.
#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir)?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

/// Write a starter config.toml with the default settings. Refuses to touch
/// an existing file.
#[inline]
pub fn init_config(config_dir: &Path) -> Result<()> {
    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        println!(
            "{} already exists; use `config --show` to inspect it",
            config_path.display()
        );
        return Ok(());
    }

    let config = Config::default_for(&config_dir.join("docs"));
    std::fs::write(&config_path, toml::to_string_pretty(&config)?)?;
    println!("Wrote {}", config_path.display());

    Ok(())
}
