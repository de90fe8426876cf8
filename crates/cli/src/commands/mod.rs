pub mod auth;
pub mod generate;
pub mod images;
pub mod init;
pub mod posts;
pub mod preview;
pub mod validate;

use anyhow::{Context, Result};
use blogkit_core::{BlogConfig, Session};
use blogkit_store::SupabaseClient;
use std::io::{self, Write};
use std::path::Path;

/// Load blog.toml (if present) plus environment overrides
pub fn load_config(path: &Path) -> Result<BlogConfig> {
    blogkit_core::load_config(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Anonymous client for the configured store
pub fn store_client(config: &BlogConfig) -> Result<SupabaseClient> {
    SupabaseClient::from_config(&config.store).context("Store is not configured")
}

/// Client acting as the remembered user, plus that user's session
pub fn session_client(config: &BlogConfig) -> Result<(SupabaseClient, Session)> {
    let session = auth::require_session()?;
    let client = store_client(config)?.with_session(&session);
    Ok((client, session))
}

/// Helper to read user input
pub fn read_input(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Ask a yes/no question; anything but "y"/"yes" is no
pub fn confirm(prompt: &str) -> Result<bool> {
    let answer = read_input(&format!("{} [y/N]: ", prompt))?;
    Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Remedy for the first library error in the chain, if it has one
pub fn suggestion_for(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<blogkit_core::Error>())
        .and_then(blogkit_core::Error::suggestion)
}
