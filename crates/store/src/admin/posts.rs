use super::Clock;
use crate::ContentStore;
use blogkit_core::text::{extract_excerpt, generate_slug};
use blogkit_core::{Error, NewPost, Post, PostStatus, PostUpdate, Result, Session};
use blogkit_validator::validate_post;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Length of excerpts derived from content when the author gives none
const DERIVED_EXCERPT_LEN: usize = 200;

/// Editor input for a new post
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    /// Derived from the title when absent
    pub slug: Option<String>,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
}

#[derive(Clone)]
pub struct PostService<S: ContentStore> {
    store: Arc<S>,
    clock: Clock,
}

impl<S: ContentStore> PostService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub async fn list(&self) -> Result<Vec<Post>> {
        self.store.list_posts().await
    }

    pub async fn get(&self, id: &str) -> Result<Post> {
        self.store
            .get_post(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("post {}", id)))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Post> {
        self.store
            .get_post_by_slug(slug)
            .await?
            .ok_or_else(|| Error::NotFound(format!("post with slug '{}'", slug)))
    }

    /// Validate and insert a new post owned by the session's user
    #[instrument(skip(self, session, draft), fields(title = %draft.title))]
    pub async fn create(&self, session: &Session, draft: PostDraft, status: PostStatus) -> Result<Post> {
        let slug = draft
            .slug
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| generate_slug(&draft.title));
        let excerpt = draft
            .excerpt
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| extract_excerpt(&draft.content, DERIVED_EXCERPT_LEN));

        let post = NewPost {
            title: draft.title,
            slug,
            content: draft.content,
            excerpt: Some(excerpt),
            featured_image: draft.featured_image.filter(|s| !s.trim().is_empty()),
            status,
            published_at: (status == PostStatus::Published).then(self.clock),
            user_id: session.user.id.clone(),
        };

        let report = validate_post(&post).into_result()?;
        for warning in &report.warnings {
            warn!("{}", warning);
        }
        self.ensure_slug_free(&post.slug, None).await?;

        let stored = self.store.insert_post(&post).await?;
        info!(post_id = %stored.id, slug = %stored.slug, status = %stored.status, "post created");
        Ok(stored)
    }

    /// Apply a partial update.
    ///
    /// With `expected_updated_at`, the write is refused with `Error::Conflict`
    /// when the stored row changed since the caller read it. The store repeats
    /// the comparison as part of the write itself, so a change landing after
    /// the read below is caught too. Without it the last write wins.
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        id: &str,
        mut changes: PostUpdate,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<Post> {
        let current = self.get(id).await?;

        if let Some(expected) = expected_updated_at
            && expected != current.updated_at
        {
            return Err(Error::Conflict(format!(
                "post {} was modified at {}, after the version being edited ({})",
                id, current.updated_at, expected
            )));
        }

        // published_at is written once, on the first transition to published
        if current.published_at.is_some() {
            changes.published_at = None;
        } else if changes.status == Some(PostStatus::Published) {
            changes.published_at = Some((self.clock)());
        } else {
            changes.published_at = None;
        }

        let merged = changes.apply_to(&current);
        let report = validate_post(&merged).into_result()?;
        for warning in &report.warnings {
            warn!("{}", warning);
        }
        if changes.slug.as_deref().is_some_and(|s| s != current.slug) {
            self.ensure_slug_free(&merged.slug, Some(id)).await?;
        }

        if changes.is_empty() {
            return Ok(current);
        }

        let stored = self
            .store
            .update_post(id, &changes, expected_updated_at)
            .await?;
        info!(post_id = %stored.id, "post updated");
        Ok(stored)
    }

    pub async fn publish(&self, id: &str) -> Result<Post> {
        let changes = PostUpdate {
            status: Some(PostStatus::Published),
            ..Default::default()
        };
        self.update(id, changes, None).await
    }

    /// Back to draft; `published_at` is kept
    pub async fn unpublish(&self, id: &str) -> Result<Post> {
        let changes = PostUpdate {
            status: Some(PostStatus::Draft),
            ..Default::default()
        };
        self.update(id, changes, None).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.get(id).await?;
        self.store.delete_post(id).await?;
        info!(post_id = %id, "post deleted");
        Ok(())
    }

    async fn ensure_slug_free(&self, slug: &str, except_id: Option<&str>) -> Result<()> {
        match self.store.get_post_by_slug(slug).await? {
            Some(existing) if Some(existing.id.as_str()) != except_id => Err(Error::Validation(
                format!("Slug '{}' is already used by post {}", slug, existing.id),
            )),
            _ => Ok(()),
        }
    }
}
