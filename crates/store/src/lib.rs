// Remote content store: the record/blob/auth seams, the Supabase client that
// implements them, an in-memory fake, and the admin services built on top.

pub mod admin;
pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use blogkit_core::{BlogImage, NewImage, NewPost, Post, PostUpdate, Result, Session, User};
use chrono::{DateTime, Utc};

pub use admin::{ImageService, ImageUpload, PostDraft, PostService};
pub use memory::MemoryStore;
pub use supabase::SupabaseClient;

/// Record operations on the `posts` and `images` tables
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// All posts, most recently updated first
    async fn list_posts(&self) -> Result<Vec<Post>>;

    /// Posts with status = published, ordered by `published_at` descending
    async fn published_posts(&self) -> Result<Vec<Post>>;

    async fn get_post(&self, id: &str) -> Result<Option<Post>>;

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    async fn insert_post(&self, post: &NewPost) -> Result<Post>;

    /// Partial update that also bumps `updated_at`; unknown id is `Error::NotFound`.
    ///
    /// With `expected_updated_at`, the row is only written if its stored
    /// `updated_at` still equals it, checked in the same operation as the
    /// write; otherwise `Error::Conflict`.
    async fn update_post(
        &self,
        id: &str,
        changes: &PostUpdate,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<Post>;

    async fn delete_post(&self, id: &str) -> Result<()>;

    /// All images, newest first
    async fn list_images(&self) -> Result<Vec<BlogImage>>;

    async fn get_image(&self, id: &str) -> Result<Option<BlogImage>>;

    async fn insert_image(&self, image: &NewImage) -> Result<BlogImage>;

    async fn update_image_alt(&self, id: &str, alt_text: Option<&str>) -> Result<BlogImage>;

    async fn delete_image(&self, id: &str) -> Result<()>;
}

/// Object storage keyed by path
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Object names directly under `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    async fn remove(&self, paths: &[String]) -> Result<()>;

    fn public_url(&self, path: &str) -> String;
}

/// Password sign-in against the hosted auth service
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_out(&self, session: &Session) -> Result<()>;

    async fn current_user(&self, session: &Session) -> Result<User>;
}
