use super::{SupabaseClient, network_error, parse_json, read_body};
use crate::ContentStore;
use async_trait::async_trait;
use blogkit_core::{BlogImage, Error, NewImage, NewPost, Post, PostStatus, PostUpdate, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

const POSTS: &str = "posts";
const IMAGES: &str = "images";

/// Post changes plus the version bump written with them
#[derive(Serialize)]
struct VersionedUpdate<'a> {
    #[serde(flatten)]
    changes: &'a PostUpdate,
    updated_at: DateTime<Utc>,
}

/// PostgREST filter value matching one exact timestamp
fn eq_timestamp(at: DateTime<Utc>) -> String {
    format!("eq.{}", at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

impl SupabaseClient {
    /// GET rows with PostgREST query parameters
    async fn select<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        debug!(table, ?query, "select");
        let response = self
            .http
            .get(self.rest_url(table))
            .headers(self.headers(None)?)
            .query(&[("select", "*")])
            .query(query)
            .send()
            .await
            .map_err(network_error)?;

        let body = read_body(response).await?;
        parse_json(&body, table)
    }

    async fn select_one<T: DeserializeOwned>(&self, table: &str, column: &str, value: &str) -> Result<Option<T>> {
        let mut rows: Vec<T> = self
            .select(table, &[(column, format!("eq.{}", value)), ("limit", "1".to_string())])
            .await?;
        Ok(rows.pop())
    }

    /// POST one row and return the stored representation
    async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(&self, table: &str, row: &B) -> Result<T> {
        debug!(table, "insert");
        let response = self
            .http
            .post(self.rest_url(table))
            .headers(self.headers(None)?)
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await
            .map_err(network_error)?;

        let body = read_body(response).await?;
        let mut rows: Vec<T> = parse_json(&body, table)?;
        rows.pop()
            .ok_or_else(|| Error::store(format!("insert into {} returned no row", table)))
    }

    /// PATCH the row with this id that also matches `filters`.
    ///
    /// Returns the updated representation, or `None` when no row matched.
    async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
        filters: &[(&str, String)],
        changes: &B,
    ) -> Result<Option<T>> {
        debug!(table, id, ?filters, "update");
        let response = self
            .http
            .patch(self.rest_url(table))
            .headers(self.headers(None)?)
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{}", id))])
            .query(filters)
            .json(changes)
            .send()
            .await
            .map_err(network_error)?;

        let body = read_body(response).await?;
        let mut rows: Vec<T> = parse_json(&body, table)?;
        Ok(rows.pop())
    }

    async fn delete_row(&self, table: &str, id: &str) -> Result<()> {
        debug!(table, id, "delete");
        let response = self
            .http
            .delete(self.rest_url(table))
            .headers(self.headers(None)?)
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await
            .map_err(network_error)?;

        read_body(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for SupabaseClient {
    async fn list_posts(&self) -> Result<Vec<Post>> {
        self.select(POSTS, &[("order", "updated_at.desc".to_string())])
            .await
    }

    async fn published_posts(&self) -> Result<Vec<Post>> {
        self.select(
            POSTS,
            &[
                ("status", format!("eq.{}", PostStatus::Published)),
                ("order", "published_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>> {
        self.select_one(POSTS, "id", id).await
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        self.select_one(POSTS, "slug", slug).await
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Post> {
        self.insert(POSTS, post).await
    }

    async fn update_post(
        &self,
        id: &str,
        changes: &PostUpdate,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<Post> {
        let filters: Vec<(&str, String)> = expected_updated_at
            .map(|at| ("updated_at", eq_timestamp(at)))
            .into_iter()
            .collect();
        let body = VersionedUpdate {
            changes,
            updated_at: Utc::now(),
        };

        if let Some(post) = self.patch(POSTS, id, &filters, &body).await? {
            return Ok(post);
        }
        // Nothing matched: either the row is gone or its version moved on
        match (expected_updated_at, self.get_post(id).await?) {
            (Some(expected), Some(current)) => Err(Error::Conflict(format!(
                "post {} was modified at {}, after the version being edited ({})",
                id, current.updated_at, expected
            ))),
            _ => Err(Error::NotFound(format!("{} row {}", POSTS, id))),
        }
    }

    async fn delete_post(&self, id: &str) -> Result<()> {
        self.delete_row(POSTS, id).await
    }

    async fn list_images(&self) -> Result<Vec<BlogImage>> {
        self.select(IMAGES, &[("order", "created_at.desc".to_string())])
            .await
    }

    async fn get_image(&self, id: &str) -> Result<Option<BlogImage>> {
        self.select_one(IMAGES, "id", id).await
    }

    async fn insert_image(&self, image: &NewImage) -> Result<BlogImage> {
        self.insert(IMAGES, image).await
    }

    async fn update_image_alt(&self, id: &str, alt_text: Option<&str>) -> Result<BlogImage> {
        self.patch(IMAGES, id, &[], &serde_json::json!({ "alt_text": alt_text }))
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} row {}", IMAGES, id)))
    }

    async fn delete_image(&self, id: &str) -> Result<()> {
        self.delete_row(IMAGES, id).await
    }
}
