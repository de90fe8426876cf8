use anyhow::{Context, Result};
use blogkit_core::config::{CONFIG_FILE, parse_config_str};
use blogkit_generator::write_default_templates;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_TITLE: &str = "My Blog";
const DEFAULT_URL: &str = "https://example.com";

/// Escape a string for a TOML basic (double-quoted) string
fn toml_escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\x08', "\\b")
        .replace('\x0C', "\\f")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Initialize a blog directory: blog.toml, templates/ and the output directory.
///
/// An existing blog.toml or template is never overwritten.
pub async fn run(path: PathBuf, title: Option<String>, url: Option<String>) -> Result<()> {
    println!("Initializing blog directory: {}", path.display());

    fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let config_path = path.join(CONFIG_FILE);
    if config_path.exists() {
        println!("✓ {} already exists, leaving it untouched", CONFIG_FILE);
    } else {
        let toml = generate_blog_toml(title.as_deref(), url.as_deref())?;
        fs::write(&config_path, toml).context("Failed to write blog.toml")?;
        println!("✓ Wrote {}", config_path.display());
    }

    let templates_dir = path.join("templates");
    let written = write_default_templates(&templates_dir).context("Failed to write templates")?;
    for file in &written {
        println!("✓ Wrote {}", file.display());
    }

    fs::create_dir_all(path.join("docs")).context("Failed to create output directory")?;

    print_next_steps(&path);
    Ok(())
}

fn print_next_steps(path: &Path) {
    println!("\n✓ Initialization complete!");
    println!("\nGenerated structure:");
    println!("  {}/", path.display());
    println!("  ├── blog.toml            ← Set the site title, URL and store credentials");
    println!("  ├── templates/");
    println!("  │   ├── homepage.html");
    println!("  │   ├── post.html");
    println!("  │   └── archive.html");
    println!("  └── docs/                ← Generated site");

    println!("\nNext steps:");
    println!("  1. Edit blog.toml (or set BLOGKIT_STORE_URL / BLOGKIT_STORE_KEY)");
    println!("  2. Sign in: blogkit login");
    println!("  3. Generate: blogkit generate");
}

fn generate_blog_toml(title: Option<&str>, url: Option<&str>) -> Result<String> {
    let site_title = toml_escape_string(title.unwrap_or(DEFAULT_TITLE));
    let base_url = toml_escape_string(url.unwrap_or(DEFAULT_URL));

    let title_comment = if title.is_some() { "" } else { "  # TODO: Set site title" };
    let url_comment = if url.is_some() { "" } else { "  # TODO: Set public URL" };

    let toml = format!(
        "# Generated by blogkit init\n\
# Every value can be overridden from the environment (BLOGKIT_*)\n\
\n\
[site]\n\
title = \"{site_title}\"{title_comment}\n\
base_url = \"{base_url}\"{url_comment}\n\
description = \"Thoughts, notes and experiments\"\n\
language = \"en\"\n\
\n\
[store]\n\
# url = \"https://your-project.supabase.co\"   # or BLOGKIT_STORE_URL\n\
# anon_key = \"...\"                            # or BLOGKIT_STORE_KEY\n\
bucket = \"blog-images\"\n\
\n\
[paths]\n\
templates_dir = \"templates\"\n\
output_dir = \"docs\"\n"
    );

    // Refuse to write a file the loader would reject
    let mut parsed = parse_config_str(&toml).context("Generated blog.toml is invalid")?;
    parsed.validate().context("Generated blog.toml is invalid")?;

    Ok(toml)
}
