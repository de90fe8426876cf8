use super::Clock;
use crate::{BlobStore, ContentStore};
use blogkit_core::{BlogImage, Error, NewImage, Result, Session};
use blogkit_validator::validate_image_upload;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// A file chosen for upload
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub original_name: String,
    pub bytes: Vec<u8>,
    /// Guessed from the file name when absent
    pub mime_type: Option<String>,
    pub alt_text: Option<String>,
}

/// Record and blob operations kept in lockstep
pub struct ImageService<S: ContentStore, B: BlobStore> {
    store: Arc<S>,
    blobs: Arc<B>,
    clock: Clock,
}

impl<S: ContentStore, B: BlobStore> ImageService<S, B> {
    pub fn new(store: Arc<S>, blobs: Arc<B>) -> Self {
        Self {
            store,
            blobs,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub async fn list(&self) -> Result<Vec<BlogImage>> {
        self.store.list_images().await
    }

    /// Ids of the given records whose file is no longer in the bucket.
    ///
    /// Lists each storage folder once rather than probing every object.
    pub async fn missing_files(&self, images: &[BlogImage]) -> Result<HashSet<String>> {
        let mut folders: BTreeMap<&str, Vec<&BlogImage>> = BTreeMap::new();
        for image in images {
            let folder = image
                .storage_path
                .rsplit_once('/')
                .map_or("", |(folder, _)| folder);
            folders.entry(folder).or_default().push(image);
        }

        let mut missing = HashSet::new();
        for (folder, records) in folders {
            let present: HashSet<String> = self.blobs.list(folder).await?.into_iter().collect();
            for image in records {
                let name = image
                    .storage_path
                    .rsplit_once('/')
                    .map_or(image.storage_path.as_str(), |(_, name)| name);
                if !present.contains(name) {
                    warn!(image_id = %image.id, path = %image.storage_path, "image file missing");
                    missing.insert(image.id.clone());
                }
            }
        }
        Ok(missing)
    }

    pub async fn get(&self, id: &str) -> Result<BlogImage> {
        self.store
            .get_image(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("image {}", id)))
    }

    /// Upload the blob, then record it.
    ///
    /// If the record cannot be inserted the blob is removed again, so neither
    /// side is left without the other.
    #[instrument(skip(self, session, upload), fields(name = %upload.original_name))]
    pub async fn upload(&self, session: &Session, upload: ImageUpload) -> Result<BlogImage> {
        let mime_type = upload
            .mime_type
            .unwrap_or_else(|| {
                mime_guess::from_path(&upload.original_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });
        let size = upload.bytes.len() as u64;

        let report = validate_image_upload(&upload.original_name, size, &mime_type).into_result()?;
        for warning in &report.warnings {
            warn!("{}", warning);
        }

        let now = (self.clock)();
        let filename = format!(
            "{}-{}",
            now.timestamp_millis(),
            sanitize_file_name(&upload.original_name)
        );
        let path = storage_path(&session.user.id, now, &filename);

        self.blobs.upload(&path, upload.bytes, &mime_type).await?;

        let record = NewImage {
            filename,
            original_name: upload.original_name,
            size,
            mime_type,
            public_url: self.blobs.public_url(&path),
            storage_path: path.clone(),
            alt_text: upload.alt_text.filter(|a| !a.trim().is_empty()),
            user_id: session.user.id.clone(),
        };

        match self.store.insert_image(&record).await {
            Ok(image) => {
                info!(image_id = %image.id, path = %image.storage_path, "image uploaded");
                Ok(image)
            }
            Err(err) => {
                if let Err(cleanup) = self.blobs.remove(std::slice::from_ref(&path)).await {
                    error!(%path, "blob left behind after failed insert: {}", cleanup);
                }
                Err(err)
            }
        }
    }

    pub async fn update_alt_text(&self, id: &str, alt_text: Option<&str>) -> Result<BlogImage> {
        let alt_text = alt_text.map(str::trim).filter(|a| !a.is_empty());
        self.store.update_image_alt(id, alt_text).await
    }

    /// Remove the blob first; the record is only deleted once the blob is gone
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        let image = self.get(id).await?;

        self.blobs
            .remove(std::slice::from_ref(&image.storage_path))
            .await
            .map_err(|e| {
                Error::StorageConsistency(format!(
                    "blob '{}' could not be removed, record {} kept: {}",
                    image.storage_path, id, e
                ))
            })?;

        self.store.delete_image(id).await.map_err(|e| {
            Error::StorageConsistency(format!(
                "blob '{}' removed but record {} could not be deleted: {}",
                image.storage_path, id, e
            ))
        })?;

        info!(image_id = %id, path = %image.storage_path, "image deleted");
        Ok(())
    }
}

/// `{user_id}/{yyyy}/{MM}/{filename}`
pub fn storage_path(user_id: &str, at: DateTime<Utc>, filename: &str) -> String {
    format!("{}/{}/{}", user_id, at.format("%Y/%m"), filename)
}

/// Keep a file name URL- and path-safe
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '-' || c == '.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Failure, MemoryStore};
    use blogkit_core::User;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 5, 10, 0, 0).unwrap()
    }

    fn session() -> Session {
        Session {
            access_token: "token".to_string(),
            refresh_token: None,
            expires_at: None,
            user: User {
                id: "u1".to_string(),
                email: None,
                created_at: fixed_now(),
            },
        }
    }

    fn png(name: &str) -> ImageUpload {
        ImageUpload {
            original_name: name.to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
            mime_type: None,
            alt_text: Some("A cat".to_string()),
        }
    }

    fn service() -> (Arc<MemoryStore>, ImageService<MemoryStore, MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service =
            ImageService::new(Arc::clone(&store), Arc::clone(&store)).with_clock(fixed_now);
        (store, service)
    }

    #[test]
    fn test_storage_path() {
        assert_eq!(
            storage_path("u1", fixed_now(), "1717581600000-cat.png"),
            "u1/2024/06/1717581600000-cat.png"
        );
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("cat.png"), "cat.png");
        assert_eq!(sanitize_file_name("my cat (1).png"), "my-cat--1-.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("貓.png"), "png");
        assert_eq!(sanitize_file_name("..."), "file");
    }

    #[tokio::test]
    async fn test_upload_creates_blob_and_record() {
        let (store, images) = service();
        let image = images.upload(&session(), png("cat.png")).await.unwrap();

        assert_eq!(image.filename, "1717581600000-cat.png");
        assert_eq!(image.storage_path, "u1/2024/06/1717581600000-cat.png");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.size, 4);
        assert_eq!(image.alt_text.as_deref(), Some("A cat"));
        assert_eq!(image.public_url, "memory://blog-images/u1/2024/06/1717581600000-cat.png");
        assert_eq!(store.blob_paths(), vec![image.storage_path.clone()]);
    }

    #[tokio::test]
    async fn test_upload_rejects_non_image_before_any_write() {
        let (store, images) = service();
        let upload = ImageUpload {
            original_name: "notes.txt".to_string(),
            bytes: b"hello".to_vec(),
            mime_type: None,
            alt_text: None,
        };
        let err = images.upload(&session(), upload).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.blob_paths().is_empty());
    }

    #[tokio::test]
    async fn test_upload_rolls_back_blob_when_insert_fails() {
        let (store, images) = service();
        store.fail(Failure::ImageInsert);

        assert!(images.upload(&session(), png("cat.png")).await.is_err());
        assert!(store.blob_paths().is_empty());
        assert_eq!(store.image_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_blob_then_record() {
        let (store, images) = service();
        let image = images.upload(&session(), png("cat.png")).await.unwrap();

        images.delete(&image.id).await.unwrap();
        assert!(store.blob_paths().is_empty());
        assert_eq!(store.image_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_keeps_record_when_blob_removal_fails() {
        let (store, images) = service();
        let image = images.upload(&session(), png("cat.png")).await.unwrap();
        store.fail(Failure::BlobRemove);

        let err = images.delete(&image.id).await.unwrap_err();
        assert!(matches!(err, Error::StorageConsistency(_)));
        assert!(store.get_image(&image.id).await.unwrap().is_some());
        assert_eq!(store.blob_paths(), vec![image.storage_path]);
    }

    #[tokio::test]
    async fn test_delete_reports_orphaned_record() {
        let (store, images) = service();
        let image = images.upload(&session(), png("cat.png")).await.unwrap();
        store.fail(Failure::ImageDelete);

        let err = images.delete(&image.id).await.unwrap_err();
        assert!(matches!(err, Error::StorageConsistency(_)));
        assert!(store.blob_paths().is_empty());
    }

    #[tokio::test]
    async fn test_upload_blob_failure_writes_no_record() {
        let (store, images) = service();
        store.fail(Failure::BlobUpload);

        assert!(images.upload(&session(), png("cat.png")).await.is_err());
        assert_eq!(store.image_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_files_flags_records_without_blob() {
        let (store, images) = service();
        let kept = images.upload(&session(), png("cat.png")).await.unwrap();
        let lost = images.upload(&session(), png("dog.png")).await.unwrap();
        store.remove(std::slice::from_ref(&lost.storage_path)).await.unwrap();

        let records = images.list().await.unwrap();
        let missing = images.missing_files(&records).await.unwrap();
        assert!(missing.contains(&lost.id));
        assert!(!missing.contains(&kept.id));
        assert_eq!(missing.len(), 1);
    }

    #[tokio::test]
    async fn test_update_alt_text_clears_blank() {
        let (_, images) = service();
        let image = images.upload(&session(), png("cat.png")).await.unwrap();

        let updated = images.update_alt_text(&image.id, Some("  ")).await.unwrap();
        assert_eq!(updated.alt_text, None);
        let updated = images.update_alt_text(&image.id, Some("Sleeping cat")).await.unwrap();
        assert_eq!(updated.alt_text.as_deref(), Some("Sleeping cat"));
    }
}
