//! In-memory [`ContentStore`] and [`BlobStore`] for tests and offline runs.
//!
//! Mirrors the remote behavior the services rely on: unique slugs, ordering,
//! `updated_at` bumps on write, and injectable failures per operation.

use crate::{BlobStore, ContentStore};
use async_trait::async_trait;
use blogkit_core::{BlogImage, Error, NewImage, NewPost, Post, PostUpdate, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Failure {
    PostReads,
    PostWrites,
    ImageInsert,
    ImageDelete,
    BlobUpload,
    BlobRemove,
}

#[derive(Default)]
struct Inner {
    posts: Vec<Post>,
    images: Vec<BlogImage>,
    blobs: BTreeMap<String, (Vec<u8>, String)>,
    failures: HashSet<Failure>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with posts, kept exactly as given
    pub fn with_posts(posts: Vec<Post>) -> Self {
        let store = Self::new();
        store.lock().posts = posts;
        store
    }

    pub fn fail(&self, failure: Failure) {
        self.lock().failures.insert(failure);
    }

    pub fn recover(&self, failure: Failure) {
        self.lock().failures.remove(&failure);
    }

    pub fn blob_paths(&self) -> Vec<String> {
        self.lock().blobs.keys().cloned().collect()
    }

    pub fn image_count(&self) -> usize {
        self.lock().images.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test must not poison the store for the assertions after it
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(inner: &Inner, failure: Failure) -> Result<()> {
        if inner.failures.contains(&failure) {
            Err(Error::store(format!("injected failure: {:?}", failure)))
        } else {
            Ok(())
        }
    }

    fn check_slug_free(inner: &Inner, slug: &str, except_id: Option<&str>) -> Result<()> {
        let taken = inner
            .posts
            .iter()
            .any(|p| p.slug == slug && Some(p.id.as_str()) != except_id);
        if taken {
            Err(Error::store(
                "duplicate key value violates unique constraint \"posts_slug_key\"",
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list_posts(&self) -> Result<Vec<Post>> {
        let inner = self.lock();
        Self::check(&inner, Failure::PostReads)?;
        let mut posts = inner.posts.clone();
        posts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(posts)
    }

    async fn published_posts(&self) -> Result<Vec<Post>> {
        let inner = self.lock();
        Self::check(&inner, Failure::PostReads)?;
        let mut posts: Vec<Post> = inner
            .posts
            .iter()
            .filter(|p| p.is_published())
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(posts)
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>> {
        let inner = self.lock();
        Self::check(&inner, Failure::PostReads)?;
        Ok(inner.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let inner = self.lock();
        Self::check(&inner, Failure::PostReads)?;
        Ok(inner.posts.iter().find(|p| p.slug == slug).cloned())
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Post> {
        let mut inner = self.lock();
        Self::check(&inner, Failure::PostWrites)?;
        Self::check_slug_free(&inner, &post.slug, None)?;

        let now = Utc::now();
        let stored = Post {
            id: uuid::Uuid::new_v4().to_string(),
            title: post.title.clone(),
            slug: post.slug.clone(),
            content: post.content.clone(),
            excerpt: post.excerpt.clone(),
            featured_image: post.featured_image.clone(),
            status: post.status,
            created_at: now,
            updated_at: now,
            published_at: post.published_at,
            user_id: post.user_id.clone(),
        };
        inner.posts.push(stored.clone());
        Ok(stored)
    }

    async fn update_post(
        &self,
        id: &str,
        changes: &PostUpdate,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<Post> {
        let mut inner = self.lock();
        Self::check(&inner, Failure::PostWrites)?;
        if let Some(slug) = &changes.slug {
            Self::check_slug_free(&inner, slug, Some(id))?;
        }

        let post = inner
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("posts row {}", id)))?;
        if let Some(expected) = expected_updated_at
            && expected != post.updated_at
        {
            return Err(Error::Conflict(format!(
                "posts row {} is at version {}, not {}",
                id, post.updated_at, expected
            )));
        }

        let previous = post.updated_at;
        *post = changes.apply_to(post);
        // Every write must move the version, even within one clock tick
        post.updated_at = Utc::now().max(previous + Duration::microseconds(1));
        Ok(post.clone())
    }

    async fn delete_post(&self, id: &str) -> Result<()> {
        let mut inner = self.lock();
        Self::check(&inner, Failure::PostWrites)?;
        inner.posts.retain(|p| p.id != id);
        Ok(())
    }

    async fn list_images(&self) -> Result<Vec<BlogImage>> {
        let inner = self.lock();
        let mut images = inner.images.clone();
        images.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(images)
    }

    async fn get_image(&self, id: &str) -> Result<Option<BlogImage>> {
        Ok(self.lock().images.iter().find(|i| i.id == id).cloned())
    }

    async fn insert_image(&self, image: &NewImage) -> Result<BlogImage> {
        let mut inner = self.lock();
        Self::check(&inner, Failure::ImageInsert)?;

        let stored = BlogImage {
            id: uuid::Uuid::new_v4().to_string(),
            filename: image.filename.clone(),
            original_name: image.original_name.clone(),
            size: image.size,
            mime_type: image.mime_type.clone(),
            storage_path: image.storage_path.clone(),
            public_url: image.public_url.clone(),
            alt_text: image.alt_text.clone(),
            created_at: Utc::now(),
            user_id: image.user_id.clone(),
        };
        inner.images.push(stored.clone());
        Ok(stored)
    }

    async fn update_image_alt(&self, id: &str, alt_text: Option<&str>) -> Result<BlogImage> {
        let mut inner = self.lock();
        let image = inner
            .images
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| Error::NotFound(format!("images row {}", id)))?;
        image.alt_text = alt_text.map(String::from);
        Ok(image.clone())
    }

    async fn delete_image(&self, id: &str) -> Result<()> {
        let mut inner = self.lock();
        Self::check(&inner, Failure::ImageDelete)?;
        inner.images.retain(|i| i.id != id);
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let mut inner = self.lock();
        Self::check(&inner, Failure::BlobUpload)?;
        if inner.blobs.contains_key(path) {
            return Err(Error::store(format!("storage object already exists: {}", path)));
        }
        inner
            .blobs
            .insert(path.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.trim_end_matches('/');
        let inner = self.lock();
        Ok(inner
            .blobs
            .keys()
            .filter_map(|path| {
                let rest = if prefix.is_empty() {
                    path.as_str()
                } else {
                    path.strip_prefix(prefix)?.strip_prefix('/')?
                };
                // Only direct children, like the storage list endpoint
                (!rest.contains('/')).then(|| rest.to_string())
            })
            .collect())
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        let mut inner = self.lock();
        Self::check(&inner, Failure::BlobRemove)?;
        for path in paths {
            inner.blobs.remove(path);
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("memory://blog-images/{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogkit_core::PostStatus;

    fn new_post(slug: &str) -> NewPost {
        NewPost {
            title: slug.to_uppercase(),
            slug: slug.to_string(),
            content: "<p>x</p>".to_string(),
            excerpt: None,
            featured_image: None,
            status: PostStatus::Draft,
            published_at: None,
            user_id: "u1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_enforces_unique_slug() {
        let store = MemoryStore::new();
        store.insert_post(&new_post("a")).await.unwrap();
        let err = store.insert_post(&new_post("a")).await.unwrap_err();
        assert!(err.to_string().contains("duplicate key"));
    }

    #[tokio::test]
    async fn test_update_unknown_post_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_post("missing", &PostUpdate::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_versioned_update_refuses_moved_row() {
        let store = MemoryStore::new();
        let read = store.insert_post(&new_post("a")).await.unwrap();

        // Another writer lands after `read` was taken
        let other = PostUpdate {
            title: Some("Theirs".to_string()),
            ..Default::default()
        };
        let theirs = store.update_post(&read.id, &other, None).await.unwrap();
        assert!(theirs.updated_at > read.updated_at);

        let mine = PostUpdate {
            title: Some("Mine".to_string()),
            ..Default::default()
        };
        let err = store
            .update_post(&read.id, &mine, Some(read.updated_at))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.get_post(&read.id).await.unwrap().unwrap().title, "Theirs");

        let ok = store
            .update_post(&read.id, &mine, Some(theirs.updated_at))
            .await
            .unwrap();
        assert_eq!(ok.title, "Mine");
        assert!(ok.updated_at > theirs.updated_at);
    }

    #[tokio::test]
    async fn test_injected_read_failure() {
        let store = MemoryStore::new();
        store.fail(Failure::PostReads);
        assert!(store.published_posts().await.is_err());
        store.recover(Failure::PostReads);
        assert!(store.published_posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blob_list_direct_children() {
        let store = MemoryStore::new();
        store.upload("u1/2024/06/a.png", vec![1], "image/png").await.unwrap();
        store.upload("u1/2024/06/b.png", vec![2], "image/png").await.unwrap();
        store.upload("u1/2024/07/c.png", vec![3], "image/png").await.unwrap();

        let names = store.list("u1/2024/06").await.unwrap();
        assert_eq!(names, vec!["a.png".to_string(), "b.png".to_string()]);
        assert!(store.upload("u1/2024/06/a.png", vec![9], "image/png").await.is_err());
    }
}
