use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "blog.toml";

const DEFAULT_BUCKET: &str = "blog-images";

/// Raw TOML configuration structure
/// Every table and field is optional; missing values fall back to defaults
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    store: RawStore,
    #[serde(default)]
    site: RawSite,
    #[serde(default)]
    paths: RawPaths,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStore {
    url: Option<String>,
    anon_key: Option<String>,
    bucket: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSite {
    base_url: Option<String>,
    title: Option<String>,
    description: Option<String>,
    language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPaths {
    templates_dir: Option<String>,
    output_dir: Option<String>,
}

/// Complete blog configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogConfig {
    pub store: StoreConfig,
    pub site: SiteConfig,
    pub paths: PathsConfig,
}

/// Remote content store connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,
    pub bucket: String,
}

impl StoreConfig {
    /// URL and key, or an error naming the missing setting
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let url = self.url.as_deref().ok_or_else(|| {
            Error::ConfigParse("store.url is not set (or BLOGKIT_STORE_URL)".to_string())
        })?;
        let key = self.anon_key.as_deref().ok_or_else(|| {
            Error::ConfigParse("store.anon_key is not set (or BLOGKIT_STORE_KEY)".to_string())
        })?;
        Ok((url, key))
    }
}

/// Public site metadata used by the renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute base URL without trailing slash, e.g. "https://example.com/blog"
    pub base_url: String,
    pub title: String,
    pub description: String,
    pub language: String,
}

/// Filesystem locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    pub templates_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                url: None,
                anon_key: None,
                bucket: DEFAULT_BUCKET.to_string(),
            },
            site: SiteConfig {
                base_url: "https://example.com".to_string(),
                title: "My Blog".to_string(),
                description: "Thoughts, notes and experiments".to_string(),
                language: "en".to_string(),
            },
            paths: PathsConfig {
                templates_dir: PathBuf::from("templates"),
                output_dir: PathBuf::from("docs"),
            },
        }
    }
}

/// Load configuration: `path` (if it exists) → environment overrides → validation
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BlogConfig> {
    let path = path.as_ref();
    let mut config = if path.exists() {
        tracing::debug!(path = %path.display(), "reading configuration file");
        parse_config_str(&fs::read_to_string(path)?)?
    } else {
        tracing::debug!(path = %path.display(), "no configuration file, using defaults");
        BlogConfig::default()
    };

    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Parse blog.toml from a string (useful for testing)
pub fn parse_config_str(content: &str) -> Result<BlogConfig> {
    let raw: RawConfig = toml::from_str(content)?;
    let defaults = BlogConfig::default();

    let config = BlogConfig {
        store: StoreConfig {
            url: raw.store.url,
            anon_key: raw.store.anon_key,
            bucket: raw.store.bucket.unwrap_or(defaults.store.bucket),
        },
        site: SiteConfig {
            base_url: raw.site.base_url.unwrap_or(defaults.site.base_url),
            title: raw.site.title.unwrap_or(defaults.site.title),
            description: raw.site.description.unwrap_or(defaults.site.description),
            language: raw.site.language.unwrap_or(defaults.site.language),
        },
        paths: PathsConfig {
            templates_dir: raw
                .paths
                .templates_dir
                .map(PathBuf::from)
                .unwrap_or(defaults.paths.templates_dir),
            output_dir: raw
                .paths
                .output_dir
                .map(PathBuf::from)
                .unwrap_or(defaults.paths.output_dir),
        },
    };

    Ok(config)
}

impl BlogConfig {
    /// Override values from environment variables
    ///
    /// `lookup` is injected so tests don't touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("BLOGKIT_STORE_URL") {
            self.store.url = Some(url);
        }
        if let Some(key) = non_empty("BLOGKIT_STORE_KEY") {
            self.store.anon_key = Some(key);
        }
        if let Some(bucket) = non_empty("BLOGKIT_STORE_BUCKET") {
            self.store.bucket = bucket;
        }
        if let Some(base_url) = non_empty("BLOGKIT_SITE_URL") {
            self.site.base_url = base_url;
        }
        if let Some(dir) = non_empty("BLOGKIT_OUTPUT_DIR") {
            self.paths.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("BLOGKIT_TEMPLATES_DIR") {
            self.paths.templates_dir = PathBuf::from(dir);
        }
    }

    /// Check URLs and normalize them (trailing slashes removed)
    pub fn validate(&mut self) -> Result<()> {
        self.site.base_url = normalize_url(&self.site.base_url, "site.base_url")?;
        if let Some(url) = &self.store.url {
            self.store.url = Some(normalize_url(url, "store.url")?);
        }
        if self.store.bucket.trim().is_empty() {
            return Err(Error::ConfigParse("store.bucket must not be empty".to_string()));
        }
        if self.site.title.trim().is_empty() {
            return Err(Error::ConfigParse("site.title must not be empty".to_string()));
        }
        Ok(())
    }
}

fn normalize_url(url: &str, field_name: &str) -> Result<String> {
    let trimmed = url.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::ConfigParse(format!(
            "'{}' must be an absolute http(s) URL: '{}'",
            field_name, url
        )));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Validate and convert a path string to PathBuf.
///
/// This function prevents path traversal by rejecting:
/// - Absolute paths (starting with `/` or Windows drive letters)
/// - Paths containing parent directory references (`..`)
///
/// # Examples
///
/// ```text
/// validate_path("homepage", "template")          → Ok(PathBuf)
/// validate_path("/etc/passwd", "template")       → Err("Absolute paths not allowed...")
/// validate_path("../secrets", "template")        → Err("Parent directory references...")
/// ```
pub fn validate_path(path_str: &str, field_name: &str) -> Result<PathBuf> {
    let path = Path::new(path_str);

    // Reject absolute paths
    if path.is_absolute() {
        return Err(Error::InvalidData(format!(
            "Absolute paths not allowed in '{}': '{}'. Use relative paths only.",
            field_name, path_str
        )));
    }

    // Check for parent directory references
    for component in path.components() {
        if component == std::path::Component::ParentDir {
            return Err(Error::InvalidData(format!(
                "Parent directory references (..) not allowed in '{}': '{}'",
                field_name, path_str
            )));
        }
    }

    // Ensure path is not empty
    if path_str.trim().is_empty() {
        return Err(Error::InvalidData(format!(
            "Empty path in '{}' field",
            field_name
        )));
    }

    Ok(path.to_path_buf())
}
