use anyhow::{Context, Result};
use blogkit_core::Post;
use blogkit_store::ContentStore;
use blogkit_validator::{ValidationReport, validate_post, validate_published_posts};
use std::path::Path;

use super::{load_config, store_client};

/// Check every stored post, then the published set as the generator sees it
pub async fn run(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let client = store_client(&config)?;

    println!("Validating posts in the store...");
    let posts = client.list_posts().await.context("Failed to fetch posts")?;
    let published = client
        .published_posts()
        .await
        .context("Failed to fetch published posts")?;

    let (per_post, site) = check(&posts, &published);
    let mut failed = false;

    for (post, report) in &per_post {
        if report.is_valid() && report.warnings.is_empty() {
            continue;
        }
        println!("\n{} ({})", post.title, post.slug);
        for error in &report.errors {
            println!("  ✗ {}", error);
        }
        for warning in &report.warnings {
            println!("  ⚠ {}", warning);
        }
        failed |= !report.is_valid();
    }

    println!();
    for error in &site.errors {
        println!("✗ {}", error);
    }
    for info in &site.info {
        println!("  {}", info);
    }
    failed |= !site.is_valid();

    if failed {
        anyhow::bail!("Validation failed");
    }
    println!("✓ {} posts valid", posts.len());
    Ok(())
}

fn check<'a>(posts: &'a [Post], published: &[Post]) -> (Vec<(&'a Post, ValidationReport)>, ValidationReport) {
    let per_post = posts.iter().map(|post| (post, validate_post(post))).collect();
    (per_post, validate_published_posts(published))
}
