// Pre-write validation for posts and image uploads, plus whole-site checks
// run before generation.

use blogkit_core::text::validate_slug;
use blogkit_core::{Error, NewPost, Post, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Slugs that would collide with generated files in `posts/`
pub const RESERVED_SLUGS: &[&str] = &["index"];

/// Largest accepted upload
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

const EXCERPT_WARN_LEN: usize = 300;

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turn collected errors into `Error::Validation`, keeping warnings for the caller
    pub fn into_result(self) -> Result<ValidationReport> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(Error::Validation(self.errors.join("; ")))
        }
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

/// The editable fields of a post, borrowed from whichever shape holds them
#[derive(Debug, Clone, Copy)]
pub struct PostFields<'a> {
    pub title: &'a str,
    pub slug: &'a str,
    pub content: &'a str,
    pub excerpt: Option<&'a str>,
    pub featured_image: Option<&'a str>,
}

impl<'a> From<&'a NewPost> for PostFields<'a> {
    fn from(post: &'a NewPost) -> Self {
        Self {
            title: &post.title,
            slug: &post.slug,
            content: &post.content,
            excerpt: post.excerpt.as_deref(),
            featured_image: post.featured_image.as_deref(),
        }
    }
}

impl<'a> From<&'a Post> for PostFields<'a> {
    fn from(post: &'a Post) -> Self {
        Self {
            title: &post.title,
            slug: &post.slug,
            content: &post.content,
            excerpt: post.excerpt.as_deref(),
            featured_image: post.featured_image.as_deref(),
        }
    }
}

/// Check a post before it is sent to the store
pub fn validate_post<'a>(post: impl Into<PostFields<'a>>) -> ValidationReport {
    let post = post.into();
    let mut report = ValidationReport::default();

    if post.title.trim().is_empty() {
        report.error("Title must not be empty");
    }
    if post.content.trim().is_empty() {
        report.error("Content must not be empty");
    }

    if !validate_slug(post.slug) {
        report.error(format!(
            "Invalid slug '{}': use lowercase letters, digits and single hyphens only",
            post.slug
        ));
    } else if RESERVED_SLUGS.contains(&post.slug) {
        report.error(format!(
            "Slug '{}' is reserved for the archive page",
            post.slug
        ));
    }

    if let Some(excerpt) = post.excerpt {
        let len = excerpt.chars().count();
        if len > EXCERPT_WARN_LEN {
            report.warn(format!(
                "Excerpt is {} characters long; summaries over {} are cut in the feed",
                len, EXCERPT_WARN_LEN
            ));
        }
    }

    if let Some(image) = post.featured_image
        && !image.is_empty()
        && !(image.starts_with("http://") || image.starts_with("https://") || image.starts_with('/'))
    {
        report.warn(format!(
            "Featured image '{}' is neither an absolute URL nor a site path",
            image
        ));
    }

    report
}

/// Check an upload before any blob is written
pub fn validate_image_upload(original_name: &str, size: u64, mime_type: &str) -> ValidationReport {
    let mut report = ValidationReport::default();

    if original_name.trim().is_empty() {
        report.error("File name must not be empty");
    }
    if size == 0 {
        report.error("File is empty");
    } else if size > MAX_IMAGE_BYTES {
        report.error(format!(
            "File is {} bytes; the limit is {} bytes",
            size, MAX_IMAGE_BYTES
        ));
    }
    if !mime_type.starts_with("image/") {
        report.error(format!("'{}' is not an image type", mime_type));
    }

    let guessed = mime_guess::from_path(original_name).first();
    if let Some(guessed) = guessed
        && guessed.essence_str() != mime_type
    {
        report.warn(format!(
            "Extension of '{}' suggests {}, but the upload is {}",
            original_name,
            guessed.essence_str(),
            mime_type
        ));
    }

    report
}

/// Two or more posts that would render to the same file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlugConflict {
    Duplicate { slug: String, post_ids: Vec<String> },
    Reserved { slug: String, post_id: String },
}

impl fmt::Display for SlugConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlugConflict::Duplicate { slug, post_ids } => write!(
                f,
                "slug '{}' is shared by posts {}",
                slug,
                post_ids.join(", ")
            ),
            SlugConflict::Reserved { slug, post_id } => write!(
                f,
                "post {} uses reserved slug '{}'",
                post_id, slug
            ),
        }
    }
}

/// Find posts whose output paths would overwrite each other
pub fn find_slug_conflicts(posts: &[Post]) -> Vec<SlugConflict> {
    let mut by_slug: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for post in posts {
        by_slug.entry(&post.slug).or_default().push(&post.id);
    }

    let mut conflicts = Vec::new();
    for (slug, ids) in by_slug {
        if RESERVED_SLUGS.contains(&slug) {
            conflicts.extend(ids.iter().map(|id| SlugConflict::Reserved {
                slug: slug.to_string(),
                post_id: id.to_string(),
            }));
        }
        if ids.len() > 1 {
            conflicts.push(SlugConflict::Duplicate {
                slug: slug.to_string(),
                post_ids: ids.into_iter().map(String::from).collect(),
            });
        }
    }
    conflicts
}

/// Check the published set as a whole before rendering it
pub fn validate_published_posts(posts: &[Post]) -> ValidationReport {
    let mut report = ValidationReport::default();

    for post in posts {
        if !post.is_published() {
            report.error(format!("Post '{}' is not published", post.slug));
        }
        if post.published_at.is_none() {
            report.error(format!("Published post '{}' has no published_at", post.slug));
        }
        if !validate_slug(&post.slug) {
            report.error(format!("Post {} has invalid slug '{}'", post.id, post.slug));
        }
    }

    for conflict in find_slug_conflicts(posts) {
        report.error(conflict.to_string());
    }

    report.info.push(format!("{} published posts", posts.len()));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogkit_core::PostStatus;
    use chrono::{TimeZone, Utc};

    fn new_post(title: &str, slug: &str, content: &str) -> NewPost {
        NewPost {
            title: title.to_string(),
            slug: slug.to_string(),
            content: content.to_string(),
            excerpt: None,
            featured_image: None,
            status: PostStatus::Draft,
            published_at: None,
            user_id: "u1".to_string(),
        }
    }

    fn published(id: &str, slug: &str) -> Post {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        Post {
            id: id.to_string(),
            title: format!("Post {}", id),
            slug: slug.to_string(),
            content: "<p>Body</p>".to_string(),
            excerpt: None,
            featured_image: None,
            status: PostStatus::Published,
            created_at: at,
            updated_at: at,
            published_at: Some(at),
            user_id: "u1".to_string(),
        }
    }

    #[test]
    fn test_valid_post_passes() {
        let post = new_post("Hello", "hello-world-2", "<p>Hi</p>");
        let report = validate_post(&post);
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_empty_title_and_content_rejected() {
        let post = new_post("  ", "hello", "");
        let report = validate_post(&post);
        assert_eq!(report.errors.len(), 2);
        let err = report.into_result().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("Title"));
    }

    #[test]
    fn test_malformed_slugs_rejected() {
        for slug in ["Hello_World", "-leading", "has space", ""] {
            let report = validate_post(&new_post("T", slug, "c"));
            assert!(!report.is_valid(), "slug '{}' should be rejected", slug);
        }
    }

    #[test]
    fn test_reserved_slug_rejected() {
        let report = validate_post(&new_post("Index", "index", "c"));
        assert!(report.errors[0].contains("reserved"));
    }

    #[test]
    fn test_long_excerpt_and_odd_image_warn() {
        let mut post = new_post("T", "t", "c");
        post.excerpt = Some("x".repeat(400));
        post.featured_image = Some("images/cover.png".to_string());
        let report = validate_post(&post);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_image_upload_checks() {
        assert!(validate_image_upload("photo.png", 2048, "image/png").is_valid());

        let report = validate_image_upload("notes.txt", 10, "text/plain");
        assert!(!report.is_valid());

        let report = validate_image_upload("huge.jpg", MAX_IMAGE_BYTES + 1, "image/jpeg");
        assert!(report.errors[0].contains("limit"));

        let report = validate_image_upload("empty.png", 0, "image/png");
        assert!(report.errors[0].contains("empty"));

        let report = validate_image_upload("photo.png", 10, "image/jpeg");
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_find_slug_conflicts() {
        let posts = vec![
            published("1", "a"),
            published("2", "b"),
            published("3", "a"),
            published("4", "index"),
        ];
        let conflicts = find_slug_conflicts(&posts);
        assert_eq!(
            conflicts,
            vec![
                SlugConflict::Duplicate {
                    slug: "a".to_string(),
                    post_ids: vec!["1".to_string(), "3".to_string()],
                },
                SlugConflict::Reserved {
                    slug: "index".to_string(),
                    post_id: "4".to_string(),
                },
            ]
        );
        assert!(conflicts[0].to_string().contains("1, 3"));
    }

    #[test]
    fn test_validate_published_posts() {
        let good = vec![published("1", "a"), published("2", "b")];
        let report = validate_published_posts(&good);
        assert!(report.is_valid());
        assert_eq!(report.info, vec!["2 published posts".to_string()]);

        let mut missing_date = published("3", "c");
        missing_date.published_at = None;
        let report = validate_published_posts(&[missing_date]);
        assert!(report.errors[0].contains("published_at"));
    }
}
