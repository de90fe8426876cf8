use super::{PageContext, published_at};
use crate::template::{Bindings, RenderOptions, render as render_template};
use blogkit_core::text::html_escape;
use blogkit_core::{Post, Result};

fn featured_image(post: &Post) -> String {
    match post.featured_image.as_deref().filter(|s| !s.is_empty()) {
        Some(src) => format!(
            r#"<div class="post-featured-image"><img src="{}" alt="{}"></div>"#,
            html_escape(src),
            html_escape(&post.title)
        ),
        None => String::new(),
    }
}

/// Render `posts/{slug}.html`. Content is trusted HTML and goes in unescaped.
pub fn render(template: &str, post: &Post, ctx: &PageContext<'_>, options: RenderOptions) -> Result<String> {
    let description = post.stored_excerpt().unwrap_or(&ctx.site.description);

    let bindings = Bindings::new()
        .set("title", html_escape(&post.title))
        .set("description", html_escape(description))
        .set("post-title", html_escape(&post.title))
        .set("post-date", published_at(post).format("%Y-%m-%d").to_string())
        .set("featured-image", featured_image(post))
        .set("post-content", post.content.as_str())
        .set("year", ctx.year());

    render_template(template, &bindings, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::tests_support::{post, site};
    use chrono::{TimeZone, Utc};

    const TEMPLATE: &str = "<title>{{title}}</title><meta content=\"{{description}}\">\
        <h1>{{post-title}}</h1><time>{{post-date}}</time>{{featured-image}}\
        <div>{{post-content}}</div><footer>{{year}}</footer>";

    #[test]
    fn test_post_page_bindings() {
        let site = site();
        let ctx = PageContext::new(&site, Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap());
        let mut p = post("hello", 2024, 7, 4);
        p.title = "A <b> title".to_string();
        p.content = "<p>Raw <em>HTML</em></p>".to_string();

        let html = render(TEMPLATE, &p, &ctx, RenderOptions { strict: true }).unwrap();
        assert!(html.contains("<h1>A &lt;b&gt; title</h1>"));
        assert!(html.contains("<time>2024-07-04</time>"));
        assert!(html.contains("<div><p>Raw <em>HTML</em></p></div>"));
        assert!(html.contains("content=\"Notes\""));
        assert!(html.contains("<footer>2025</footer>"));
        assert!(!html.contains("post-featured-image"));
    }

    #[test]
    fn test_post_page_uses_excerpt_and_image() {
        let site = site();
        let ctx = PageContext::new(&site, Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap());
        let mut p = post("img", 2024, 7, 4);
        p.excerpt = Some("Short summary".to_string());
        p.featured_image = Some("https://cdn.example.com/i.png".to_string());

        let html = render(TEMPLATE, &p, &ctx, RenderOptions::default()).unwrap();
        assert!(html.contains("content=\"Short summary\""));
        assert!(html.contains(r#"<img src="https://cdn.example.com/i.png""#));
    }
}
