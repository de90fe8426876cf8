use super::PageContext;
use blogkit_core::Post;
use blogkit_core::text::html_escape;

const CHANGEFREQ: &str = "weekly";
const PRIORITY: &str = "0.8";

/// Every URL the site exposes: root, archive, then one per post
pub fn urls(posts: &[Post], ctx: &PageContext<'_>) -> Vec<String> {
    let mut urls = vec![ctx.absolute_url("/"), ctx.absolute_url("/posts/")];
    urls.extend(posts.iter().map(|post| ctx.absolute_url(&post.url_path())));
    urls
}

pub fn render(posts: &[Post], ctx: &PageContext<'_>) -> String {
    let lastmod = ctx.now.format("%Y-%m-%d").to_string();
    let entries: String = urls(posts, ctx)
        .iter()
        .map(|loc| {
            format!(
                r#"
  <url>
    <loc>{}</loc>
    <lastmod>{}</lastmod>
    <changefreq>{}</changefreq>
    <priority>{}</priority>
  </url>"#,
                html_escape(loc),
                lastmod,
                CHANGEFREQ,
                PRIORITY
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}
</urlset>
"#,
        entries
    )
}
