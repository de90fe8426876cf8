//! Named HTML templates and `{{key}}` substitution.

use blogkit_core::config::validate_path;
use blogkit_core::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const HOMEPAGE: &str = "homepage";
pub const POST: &str = "post";
pub const ARCHIVE: &str = "archive";

/// Built-in templates written by `blogkit init`
pub const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    (HOMEPAGE, include_str!("../templates/homepage.html")),
    (POST, include_str!("../templates/post.html")),
    (ARCHIVE, include_str!("../templates/archive.html")),
];

/// Reads `{dir}/{name}.html`
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    dir: PathBuf,
}

impl TemplateLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        let relative = validate_path(name, "template")?;
        let mut path = self.dir.join(relative);
        path.set_extension("html");
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<String> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(Error::TemplateNotFound {
                name: name.to_string(),
                path,
            });
        }
        tracing::debug!(template = name, path = %path.display(), "loading template");
        Ok(fs::read_to_string(&path)?)
    }
}

/// Write the built-in templates into `dir`, keeping any that already exist
pub fn write_default_templates(dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let loader = TemplateLoader::new(dir);
    let mut written = Vec::new();
    for (name, body) in DEFAULT_TEMPLATES {
        let path = loader.path_for(name)?;
        if path.exists() {
            tracing::info!(path = %path.display(), "template exists, leaving it untouched");
            continue;
        }
        fs::write(&path, body)?;
        written.push(path);
    }
    Ok(written)
}

/// Values bound to placeholder keys
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: BTreeMap<String, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bindings = Bindings::new();
        for (k, v) in iter {
            bindings.insert(k, v);
        }
        bindings
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Fail on placeholders with no binding instead of leaving them verbatim
    pub strict: bool,
}

/// Replace every `{{key}}` in one left-to-right pass.
///
/// Bound values are inserted as-is and never re-scanned. Unbound placeholders
/// stay in the output unless `options.strict` is set.
pub fn render(template: &str, bindings: &Bindings, options: RenderOptions) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            return Ok(out);
        };

        let key = &after_open[..end];
        match bindings.get(key) {
            Some(value) => {
                out.push_str(value);
                rest = &after_open[end + 2..];
            }
            None if options.strict && is_key(key) => {
                return Err(Error::UnresolvedPlaceholder {
                    key: key.to_string(),
                });
            }
            None => {
                // Emit one brace and rescan, so "{{{key}}}" still finds "{{key}}"
                out.push('{');
                rest = &rest[start + 1..];
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Placeholder keys are word characters and hyphens, e.g. `post-title`
fn is_key(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
