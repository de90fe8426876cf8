// Page renderers. Each takes the published list (newest first) and returns one
// document; writing is left to the orchestrator.

pub mod archive;
pub mod homepage;
pub mod post;
pub mod rss;
pub mod sitemap;

use blogkit_core::Post;
use blogkit_core::config::SiteConfig;
use chrono::{DateTime, Utc};

/// Shared inputs for every renderer
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub site: &'a SiteConfig,
    /// Generation time; drives `year`, `lastBuildDate` and `lastmod`
    pub now: DateTime<Utc>,
}

impl<'a> PageContext<'a> {
    pub fn new(site: &'a SiteConfig, now: DateTime<Utc>) -> Self {
        Self { site, now }
    }

    pub fn year(&self) -> String {
        self.now.format("%Y").to_string()
    }

    /// Absolute URL for a site-relative path starting with `/`
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.site.base_url, path)
    }
}

/// Publication time, falling back to the last update for records that
/// somehow lack one (the orchestrator rejects those before rendering)
pub fn published_at(post: &Post) -> DateTime<Utc> {
    post.published_at.unwrap_or(post.updated_at)
}

/// Script added to every HTML page in preview mode; reloads on server events
pub const RELOAD_SCRIPT: &str = r#"<script>
new EventSource("/_reload").onmessage = () => location.reload();
</script>"#;

/// Insert the live-reload script before `</body>`, or append it
pub fn inject_reload_script(html: &str) -> String {
    match html.rfind("</body>") {
        Some(idx) => format!("{}{}\n{}", &html[..idx], RELOAD_SCRIPT, &html[idx..]),
        None => format!("{}\n{}", html, RELOAD_SCRIPT),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_reload_script() {
        let html = inject_reload_script("<html><body><p>x</p></body></html>");
        assert!(html.contains("/_reload"));
        assert!(html.ends_with("</script>\n</body></html>"));

        let fragment = inject_reload_script("<p>no body</p>");
        assert!(fragment.starts_with("<p>no body</p>\n<script>"));
    }
}
