use anyhow::{Context, Result};
use blogkit_core::{Error, Post, PostStatus, PostUpdate};
use blogkit_store::{ContentStore, PostDraft, PostService};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{confirm, load_config, session_client};

pub struct NewPostArgs {
    pub title: String,
    pub content: PathBuf,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub image: Option<String>,
    pub publish: bool,
}

pub struct EditPostArgs {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<PathBuf>,
    pub excerpt: Option<String>,
    pub image: Option<String>,
}

fn read_content(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Accept either a slug or an id
async fn resolve<S: ContentStore>(posts: &PostService<S>, key: &str) -> Result<Post> {
    match posts.get_by_slug(key).await {
        Ok(post) => Ok(post),
        Err(Error::NotFound(_)) => Ok(posts.get(key).await?),
        Err(e) => Err(e.into()),
    }
}

fn status_marker(post: &Post) -> &'static str {
    match post.status {
        PostStatus::Published => "●",
        PostStatus::Draft => "○",
    }
}

fn summary_line(post: &Post) -> String {
    format!(
        "{} {:<40} {:<32} {}",
        status_marker(post),
        post.title,
        post.slug,
        post.updated_at.format("%Y-%m-%d %H:%M")
    )
}

fn changes_from(args: EditPostArgs) -> Result<PostUpdate> {
    let content = args.content.as_deref().map(read_content).transpose()?;
    Ok(PostUpdate {
        title: args.title,
        slug: args.slug,
        content,
        excerpt: args.excerpt,
        featured_image: args.image,
        ..Default::default()
    })
}

pub async fn list(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let (client, _) = session_client(&config)?;
    let posts = PostService::new(Arc::new(client))
        .list()
        .await
        .context("Failed to list posts")?;

    if posts.is_empty() {
        println!("No posts yet. Create one with 'blogkit posts new'");
        return Ok(());
    }
    for post in &posts {
        println!("{}", summary_line(post));
    }
    println!("\n{} posts (● published, ○ draft)", posts.len());
    Ok(())
}

pub async fn show(config_path: &Path, key: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let (client, _) = session_client(&config)?;
    let posts = PostService::new(Arc::new(client));
    let post = resolve(&posts, key).await?;

    println!("{}", post.title);
    println!("  id:        {}", post.id);
    println!("  slug:      {}", post.slug);
    println!("  status:    {}", post.status);
    println!("  created:   {}", post.created_at.format("%Y-%m-%d %H:%M"));
    println!("  updated:   {}", post.updated_at.format("%Y-%m-%d %H:%M"));
    if let Some(published) = post.published_at {
        println!("  published: {}", published.format("%Y-%m-%d %H:%M"));
    }
    if let Some(excerpt) = post.stored_excerpt() {
        println!("  excerpt:   {}", excerpt);
    }
    if let Some(image) = &post.featured_image {
        println!("  image:     {}", image);
    }
    println!();
    println!("{}", post.content);
    Ok(())
}

pub async fn create(config_path: &Path, args: NewPostArgs) -> Result<()> {
    let config = load_config(config_path)?;
    let (client, session) = session_client(&config)?;
    let posts = PostService::new(Arc::new(client));

    let draft = PostDraft {
        title: args.title,
        slug: args.slug,
        content: read_content(&args.content)?,
        excerpt: args.excerpt,
        featured_image: args.image,
    };
    let status = if args.publish {
        PostStatus::Published
    } else {
        PostStatus::Draft
    };

    let post = posts
        .create(&session, draft, status)
        .await
        .context("Failed to create post")?;
    println!("✅ Created {} post '{}'", post.status, post.title);
    println!("   id:   {}", post.id);
    println!("   url:  {}{}", config.site.base_url, post.url_path());
    Ok(())
}

pub async fn edit(config_path: &Path, key: &str, args: EditPostArgs) -> Result<()> {
    let config = load_config(config_path)?;
    let (client, _) = session_client(&config)?;
    let posts = PostService::new(Arc::new(client));

    let current = resolve(&posts, key).await?;
    let changes = changes_from(args)?;
    if changes.is_empty() {
        println!("Nothing to change");
        return Ok(());
    }

    let post = posts
        .update(&current.id, changes, Some(current.updated_at))
        .await
        .context("Failed to update post")?;
    println!("✅ Updated '{}'", post.title);
    Ok(())
}

pub async fn publish(config_path: &Path, key: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let (client, _) = session_client(&config)?;
    let posts = PostService::new(Arc::new(client));

    let current = resolve(&posts, key).await?;
    let post = posts.publish(&current.id).await.context("Failed to publish post")?;
    println!("✅ Published '{}'", post.title);
    println!("   Run 'blogkit generate' to update the site");
    Ok(())
}

pub async fn unpublish(config_path: &Path, key: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let (client, _) = session_client(&config)?;
    let posts = PostService::new(Arc::new(client));

    let current = resolve(&posts, key).await?;
    let post = posts.unpublish(&current.id).await.context("Failed to unpublish post")?;
    println!("✅ '{}' is a draft again", post.title);
    Ok(())
}

pub async fn delete(config_path: &Path, key: &str, force: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let (client, _) = session_client(&config)?;
    let posts = PostService::new(Arc::new(client));

    let post = resolve(&posts, key).await?;
    if !force && !confirm(&format!("Delete post '{}' permanently?", post.title))? {
        println!("Cancelled");
        return Ok(());
    }

    posts.delete(&post.id).await.context("Failed to delete post")?;
    println!("✅ Deleted '{}'", post.title);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogkit_store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn stored(id: &str, slug: &str) -> Post {
        let at = Utc.with_ymd_and_hms(2024, 4, 2, 8, 0, 0).unwrap();
        Post {
            id: id.to_string(),
            title: "Hello".to_string(),
            slug: slug.to_string(),
            content: "<p>x</p>".to_string(),
            excerpt: None,
            featured_image: None,
            status: PostStatus::Draft,
            created_at: at,
            updated_at: at,
            published_at: None,
            user_id: "u1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_resolve_by_slug_or_id() {
        let store = MemoryStore::with_posts(vec![stored("id-1", "hello")]);
        let posts = PostService::new(Arc::new(store));

        assert_eq!(resolve(&posts, "hello").await.unwrap().id, "id-1");
        assert_eq!(resolve(&posts, "id-1").await.unwrap().slug, "hello");
        assert!(resolve(&posts, "missing").await.is_err());
    }

    #[test]
    fn test_changes_from_reads_content_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("body.html");
        fs::write(&file, "<p>new</p>").unwrap();

        let changes = changes_from(EditPostArgs {
            title: Some("T".to_string()),
            slug: None,
            content: Some(file),
            excerpt: None,
            image: None,
        })
        .unwrap();
        assert_eq!(changes.title.as_deref(), Some("T"));
        assert_eq!(changes.content.as_deref(), Some("<p>new</p>"));
        assert_eq!(changes.status, None);
    }

    #[test]
    fn test_empty_edit() {
        let changes = changes_from(EditPostArgs {
            title: None,
            slug: None,
            content: None,
            excerpt: None,
            image: None,
        })
        .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_summary_line() {
        let line = summary_line(&stored("1", "hello"));
        assert!(line.starts_with("○ Hello"));
        assert!(line.ends_with("2024-04-02 08:00"));
    }
}
