use anyhow::{Context, Result};
use blogkit_core::BlogConfig;
use blogkit_generator::{BuildReport, SiteGenerator, SiteOptions};
use std::path::{Path, PathBuf};

use super::{load_config, store_client};

/// Generate the static site from published posts
pub async fn run(config_path: &Path, output: Option<PathBuf>, strict: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(output) = output {
        config.paths.output_dir = output;
    }

    println!("🔨 Generating static site...");
    println!("   Templates: {}", config.paths.templates_dir.display());
    println!("   Output:    {}", config.paths.output_dir.display());
    println!();

    let options = SiteOptions {
        strict,
        preview: false,
    };
    let report = build(&config, options).await?;

    println!("✅ Site generated!");
    println!("   Posts: {}", report.post_count);
    println!("   Files: {}", report.files.len());
    println!("   Output: {}", config.paths.output_dir.display());
    Ok(())
}

/// One full generation pass against the configured store
pub async fn build(config: &BlogConfig, options: SiteOptions) -> Result<BuildReport> {
    let client = store_client(config)?;
    SiteGenerator::new(
        &client,
        &config.site,
        &config.paths.templates_dir,
        &config.paths.output_dir,
    )
    .with_options(options)
    .run()
    .await
    .context("Site generation failed")
}
