//! Full site build: fetch, check, render, write.

use crate::pages::{PageContext, archive, homepage, inject_reload_script, post, rss, sitemap};
use crate::template::{self, RenderOptions, TemplateLoader};
use blogkit_core::config::SiteConfig;
use blogkit_core::Result;
use blogkit_store::ContentStore;
use blogkit_validator::validate_published_posts;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};

const ASSET_DIRS: &[&str] = &["assets/css", "assets/js", "assets/images"];

#[derive(Debug, Clone, Copy, Default)]
pub struct SiteOptions {
    /// Fail on unbound template placeholders
    pub strict: bool,
    /// Inject the live-reload script into every HTML page
    pub preview: bool,
}

/// Outcome of a successful build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub post_count: usize,
    /// Written files, in write order
    pub files: Vec<PathBuf>,
}

pub struct SiteGenerator<'a, S: ContentStore> {
    store: &'a S,
    site: &'a SiteConfig,
    templates: TemplateLoader,
    output_dir: PathBuf,
    options: SiteOptions,
}

impl<'a, S: ContentStore> SiteGenerator<'a, S> {
    pub fn new(
        store: &'a S,
        site: &'a SiteConfig,
        templates_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            site,
            templates: TemplateLoader::new(templates_dir),
            output_dir: output_dir.into(),
            options: SiteOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SiteOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn run(&self) -> Result<BuildReport> {
        self.run_at(Utc::now()).await
    }

    /// Build with a fixed generation time.
    ///
    /// Stops at the first error; files written before it are left in place.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<BuildReport> {
        info!(output = %self.output_dir.display(), "generating site");
        fs::create_dir_all(&self.output_dir).await?;

        let posts = self.store.published_posts().await?;
        info!(count = posts.len(), "fetched published posts");

        let report = validate_published_posts(&posts).into_result()?;
        for warning in &report.warnings {
            warn!("{}", warning);
        }

        let ctx = PageContext::new(self.site, now);
        let render = RenderOptions {
            strict: self.options.strict,
        };
        let mut files = Vec::new();

        info!("rendering homepage");
        let tpl = self.templates.load(template::HOMEPAGE)?;
        let html = homepage::render(&tpl, &posts, &ctx, render)?;
        files.push(self.write_html("index.html", html).await?);

        info!(count = posts.len(), "rendering post pages");
        let tpl = self.templates.load(template::POST)?;
        fs::create_dir_all(self.output_dir.join("posts")).await?;
        for p in &posts {
            let html = post::render(&tpl, p, &ctx, render)?;
            files.push(self.write_html(&format!("posts/{}.html", p.slug), html).await?);
        }

        info!("rendering archive");
        let tpl = self.templates.load(template::ARCHIVE)?;
        let html = archive::render(&tpl, &posts, &ctx, render)?;
        files.push(self.write_html("posts/index.html", html).await?);

        info!("rendering feed");
        files.push(self.write("feed.xml", rss::render(&posts, &ctx)).await?);

        info!("rendering sitemap");
        files.push(self.write("sitemap.xml", sitemap::render(&posts, &ctx)).await?);

        for dir in ASSET_DIRS {
            fs::create_dir_all(self.output_dir.join(dir)).await?;
        }

        info!(posts = posts.len(), files = files.len(), "site generated");
        Ok(BuildReport {
            post_count: posts.len(),
            files,
        })
    }

    async fn write_html(&self, relative: &str, html: String) -> Result<PathBuf> {
        let html = if self.options.preview {
            inject_reload_script(&html)
        } else {
            html
        };
        self.write(relative, html).await
    }

    async fn write(&self, relative: &str, contents: String) -> Result<PathBuf> {
        let path = self.output_dir.join(relative);
        fs::write(&path, contents).await?;
        debug!(path = %path.display(), "wrote file");
        Ok(path)
    }
}
