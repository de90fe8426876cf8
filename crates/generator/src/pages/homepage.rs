use super::{PageContext, published_at};
use crate::template::{Bindings, RenderOptions, render as render_template};
use blogkit_core::text::{html_escape, strip_tags, truncate_chars};
use blogkit_core::{Post, Result};

/// Number of posts shown on the front page
pub const HOMEPAGE_POSTS: usize = 6;

const CARD_EXCERPT_LEN: usize = 150;

/// Stored excerpt, or the first 150 characters of the text content plus `...`
pub fn card_excerpt(post: &Post) -> String {
    match post.stored_excerpt() {
        Some(excerpt) => excerpt.to_string(),
        None => {
            let text = strip_tags(&post.content);
            format!("{}...", truncate_chars(&text, CARD_EXCERPT_LEN))
        }
    }
}

fn post_card(post: &Post) -> String {
    let title = html_escape(&post.title);
    let url = post.url_path();
    let date = published_at(post).format("%Y-%m-%d");

    let image = match post.featured_image.as_deref().filter(|s| !s.is_empty()) {
        Some(src) => format!(
            r#"
        <div class="post-image">
            <img src="{}" alt="{}" loading="lazy">
        </div>"#,
            html_escape(src),
            title
        ),
        None => String::new(),
    };

    format!(
        r#"
    <article class="post-card">{image}
        <div class="post-content">
            <h2 class="post-title">
                <a href="{url}">{title}</a>
            </h2>
            <p class="post-date">{date}</p>
            <p class="post-excerpt">{excerpt}</p>
            <a href="{url}" class="read-more">Read more →</a>
        </div>
    </article>"#,
        excerpt = html_escape(&card_excerpt(post)),
    )
}

/// Render `index.html` from the first six posts
pub fn render(template: &str, posts: &[Post], ctx: &PageContext<'_>, options: RenderOptions) -> Result<String> {
    let cards: Vec<String> = posts.iter().take(HOMEPAGE_POSTS).map(post_card).collect();

    let bindings = Bindings::new()
        .set("title", html_escape(&ctx.site.title))
        .set("description", html_escape(&ctx.site.description))
        .set("posts", cards.join("\n"))
        .set("year", ctx.year());

    render_template(template, &bindings, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::tests_support::{post, site};
    use chrono::{TimeZone, Utc};

    const TEMPLATE: &str = "<title>{{title}}</title><main>{{posts}}</main><footer>{{year}}</footer>";

    #[test]
    fn test_at_most_six_cards_in_order() {
        let posts: Vec<Post> = (1..=8)
            .rev()
            .map(|d| post(&format!("p{}", d), 2024, 1, d))
            .collect();
        let site = site();
        let ctx = PageContext::new(&site, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());

        let html = render(TEMPLATE, &posts, &ctx, RenderOptions::default()).unwrap();
        assert_eq!(html.matches(r#"<article class="post-card">"#).count(), 6);

        let first = html.find("/posts/p8.html").unwrap();
        let last = html.find("/posts/p3.html").unwrap();
        assert!(first < last);
        assert!(!html.contains("/posts/p2.html"));
        assert!(html.contains("<footer>2024</footer>"));
    }

    #[test]
    fn test_empty_list_renders_empty_region() {
        let site = site();
        let ctx = PageContext::new(&site, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        let html = render(TEMPLATE, &[], &ctx, RenderOptions::default()).unwrap();
        assert!(html.contains("<main></main>"));
        assert!(html.contains("<title>Test Blog</title>"));
    }

    #[test]
    fn test_card_contents() {
        let mut p = post("hello", 2024, 3, 9);
        p.title = "Tom & Jerry".to_string();
        p.featured_image = Some("https://cdn.example.com/a.png".to_string());
        let html = post_card(&p);

        assert!(html.contains(r#"<a href="/posts/hello.html">Tom &amp; Jerry</a>"#));
        assert!(html.contains(r#"<img src="https://cdn.example.com/a.png" alt="Tom &amp; Jerry""#));
        assert!(html.contains("<p class=\"post-date\">2024-03-09</p>"));

        let without_image = post_card(&post("plain", 2024, 3, 9));
        assert!(!without_image.contains("post-image"));
    }

    #[test]
    fn test_card_excerpt() {
        let mut p = post("x", 2024, 1, 1);
        p.content = format!("<p>{}</p>", "a".repeat(200));
        assert_eq!(card_excerpt(&p), format!("{}...", "a".repeat(150)));

        p.content = "<p>Short</p>".to_string();
        assert_eq!(card_excerpt(&p), "Short...");

        p.excerpt = Some("Written by hand".to_string());
        assert_eq!(card_excerpt(&p), "Written by hand");
    }
}
