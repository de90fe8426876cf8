use super::{PageContext, published_at};
use crate::template::{Bindings, RenderOptions, render as render_template};
use blogkit_core::text::html_escape;
use blogkit_core::{Post, Result};
use chrono::Datelike;

/// Posts grouped by publication year, newest year first.
///
/// Within a year the incoming order is kept.
pub fn group_by_year(posts: &[Post]) -> Vec<(i32, Vec<&Post>)> {
    let mut groups: Vec<(i32, Vec<&Post>)> = Vec::new();
    for post in posts {
        let year = published_at(post).year();
        match groups.iter_mut().find(|(y, _)| *y == year) {
            Some((_, bucket)) => bucket.push(post),
            None => groups.push((year, vec![post])),
        }
    }
    groups.sort_by(|a, b| b.0.cmp(&a.0));
    groups
}

fn year_section(year: i32, posts: &[&Post]) -> String {
    let items: Vec<String> = posts
        .iter()
        .map(|post| {
            format!(
                r#"
            <li class="archive-item">
                <span class="archive-date">{}</span>
                <a href="{}" class="archive-title">{}</a>
            </li>"#,
                published_at(post).format("%m-%d"),
                post.url_path(),
                html_escape(&post.title)
            )
        })
        .collect();

    format!(
        r#"
    <section class="archive-year">
        <h2 class="year-title">{}</h2>
        <ul class="archive-list">{}
        </ul>
    </section>"#,
        year,
        items.join("")
    )
}

/// Render `posts/index.html`
pub fn render(template: &str, posts: &[Post], ctx: &PageContext<'_>, options: RenderOptions) -> Result<String> {
    let sections: Vec<String> = group_by_year(posts)
        .iter()
        .map(|(year, posts)| year_section(*year, posts))
        .collect();

    let bindings = Bindings::new()
        .set("title", html_escape(&format!("Archive - {}", ctx.site.title)))
        .set("description", html_escape(&format!("{} archive", ctx.site.title)))
        .set("archive", sections.join("\n"))
        .set("year", ctx.year());

    render_template(template, &bindings, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::tests_support::{post, site};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_group_by_year() {
        // already newest first, as the store returns them
        let posts = vec![
            post("b", 2024, 6, 1),
            post("a", 2024, 1, 1),
            post("c", 2023, 12, 1),
        ];
        let groups = group_by_year(&posts);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, 2024);
        let slugs: Vec<&str> = groups[0].1.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["b", "a"]);
        assert_eq!(groups[1].0, 2023);
        assert_eq!(groups[1].1[0].slug, "c");
    }

    #[test]
    fn test_years_descending_regardless_of_input() {
        let posts = vec![post("old", 2021, 5, 5), post("new", 2023, 1, 1), post("mid", 2022, 3, 3)];
        let years: Vec<i32> = group_by_year(&posts).iter().map(|(y, _)| *y).collect();
        assert_eq!(years, vec![2023, 2022, 2021]);
    }

    #[test]
    fn test_archive_render() {
        let site = site();
        let ctx = PageContext::new(&site, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let posts = vec![post("b", 2024, 6, 1), post("c", 2023, 12, 1)];

        let html = render("<title>{{title}}</title>{{archive}}", &posts, &ctx, RenderOptions::default()).unwrap();
        assert!(html.contains("<title>Archive - Test Blog</title>"));
        assert!(html.contains(r#"<span class="archive-date">06-01</span>"#));
        assert!(html.contains(r#"<a href="/posts/c.html" class="archive-title">Post c</a>"#));
        assert!(html.find(">2024<").unwrap() < html.find(">2023<").unwrap());
    }

    #[test]
    fn test_archive_empty() {
        let site = site();
        let ctx = PageContext::new(&site, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let html = render("[{{archive}}]", &[], &ctx, RenderOptions::default()).unwrap();
        assert_eq!(html, "[]");
    }
}
