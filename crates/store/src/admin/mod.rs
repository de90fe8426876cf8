// Admin operations: validate locally, then issue one store call per step.

mod images;
mod posts;

pub use images::{ImageService, ImageUpload, sanitize_file_name, storage_path};
pub use posts::{PostDraft, PostService};

use chrono::{DateTime, Utc};

/// Source of "now", swappable in tests
pub type Clock = fn() -> DateTime<Utc>;
