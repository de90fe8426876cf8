use super::{PageContext, published_at};
use blogkit_core::Post;
use blogkit_core::text::{cdata, html_escape, strip_tags, truncate_chars};
use chrono::{DateTime, Utc};

/// Number of items in `feed.xml`
pub const FEED_ITEMS: usize = 10;

const DESCRIPTION_LEN: usize = 300;

/// RFC 1123 date as used by RSS, always in GMT
fn rfc1123(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn item_description(post: &Post) -> String {
    match post.stored_excerpt() {
        Some(excerpt) => excerpt.to_string(),
        None => truncate_chars(&strip_tags(&post.content), DESCRIPTION_LEN).to_string(),
    }
}

fn item(post: &Post, ctx: &PageContext<'_>) -> String {
    let link = html_escape(&ctx.absolute_url(&post.url_path()));
    format!(
        r#"
    <item>
      <title>{title}</title>
      <link>{link}</link>
      <description>{description}</description>
      <pubDate>{date}</pubDate>
      <guid>{link}</guid>
    </item>"#,
        title = cdata(&post.title),
        description = cdata(&item_description(post)),
        date = rfc1123(published_at(post)),
    )
}

/// RSS 2.0 document for the ten newest posts
pub fn render(posts: &[Post], ctx: &PageContext<'_>) -> String {
    let items: String = posts
        .iter()
        .take(FEED_ITEMS)
        .map(|post| item(post, ctx))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>{title}</title>
    <link>{link}</link>
    <description>{description}</description>
    <language>{language}</language>
    <lastBuildDate>{built}</lastBuildDate>{items}
  </channel>
</rss>
"#,
        title = html_escape(&ctx.site.title),
        link = html_escape(&ctx.site.base_url),
        description = html_escape(&ctx.site.description),
        language = html_escape(&ctx.site.language),
        built = rfc1123(ctx.now),
    )
}
