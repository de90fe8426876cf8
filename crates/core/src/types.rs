use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Publication state of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A blog article as stored in the `posts` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub user_id: String,
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    /// Site-relative URL of the rendered post page
    pub fn url_path(&self) -> String {
        format!("/posts/{}.html", self.slug)
    }

    /// Stored excerpt, ignoring blank values
    pub fn stored_excerpt(&self) -> Option<&str> {
        self.excerpt
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

/// Insert payload for a new post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    pub status: PostStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub user_id: String,
}

/// Partial update for an existing post; `None` leaves a column untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PostStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl PostUpdate {
    pub fn is_empty(&self) -> bool {
        *self == PostUpdate::default()
    }

    /// Apply the changes to a copy of `post`
    pub fn apply_to(&self, post: &Post) -> Post {
        let mut merged = post.clone();
        if let Some(title) = &self.title {
            merged.title = title.clone();
        }
        if let Some(slug) = &self.slug {
            merged.slug = slug.clone();
        }
        if let Some(content) = &self.content {
            merged.content = content.clone();
        }
        if let Some(excerpt) = &self.excerpt {
            merged.excerpt = Some(excerpt.clone());
        }
        if let Some(image) = &self.featured_image {
            merged.featured_image = Some(image.clone());
        }
        if let Some(status) = self.status {
            merged.status = status;
        }
        if let Some(published_at) = self.published_at {
            merged.published_at = Some(published_at);
        }
        merged
    }
}

/// An uploaded image as stored in the `images` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogImage {
    pub id: String,
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub mime_type: String,
    pub storage_path: String,
    pub public_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
}

/// Insert payload for a new image record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewImage {
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub mime_type: String,
    pub storage_path: String,
    pub public_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    pub user_id: String,
}

/// Authenticated account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Signed-in session, passed explicitly to every authenticated operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: User,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Format a byte count for display (e.g. "1.5 MB")
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_post() -> Post {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Post {
            id: "1".into(),
            title: "Hello".into(),
            slug: "hello".into(),
            content: "<p>Hi</p>".into(),
            excerpt: None,
            featured_image: None,
            status: PostStatus::Draft,
            created_at: at,
            updated_at: at,
            published_at: None,
            user_id: "u1".into(),
        }
    }

    #[test]
    fn test_post_deserializes_store_row() {
        let json = r#"{
            "id": "8f0c",
            "title": "Hello",
            "slug": "hello",
            "content": "<p>Hi</p>",
            "excerpt": null,
            "featured_image": null,
            "status": "published",
            "created_at": "2024-01-01T10:00:00+00:00",
            "updated_at": "2024-01-02T10:00:00+00:00",
            "published_at": "2024-01-02T10:00:00+00:00",
            "user_id": "u1"
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert!(post.is_published());
        assert_eq!(post.url_path(), "/posts/hello.html");
        assert!(post.published_at.is_some());
    }

    #[test]
    fn test_stored_excerpt_ignores_blank() {
        let mut post = sample_post();
        assert_eq!(post.stored_excerpt(), None);
        post.excerpt = Some("   ".into());
        assert_eq!(post.stored_excerpt(), None);
        post.excerpt = Some("Summary".into());
        assert_eq!(post.stored_excerpt(), Some("Summary"));
    }

    #[test]
    fn test_post_update_apply_and_serialize() {
        let post = sample_post();
        let update = PostUpdate {
            title: Some("New".into()),
            status: Some(PostStatus::Published),
            ..Default::default()
        };
        let merged = update.apply_to(&post);
        assert_eq!(merged.title, "New");
        assert_eq!(merged.slug, "hello");
        assert!(merged.is_published());

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"title": "New", "status": "published"}));
        assert!(PostUpdate::default().is_empty());
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
    }
}
