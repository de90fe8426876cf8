use anyhow::{Context, Result};
use blogkit_core::{BlogImage, format_file_size};
use blogkit_store::{ImageService, ImageUpload};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{confirm, load_config, session_client};

fn image_line(image: &BlogImage, file_missing: bool) -> String {
    let line = format!(
        "{}  {:<36} {:>9}  {}",
        image.created_at.format("%Y-%m-%d"),
        image.original_name,
        format_file_size(image.size),
        image.id
    );
    if file_missing {
        format!("{}  ⚠️  file missing", line)
    } else {
        line
    }
}

fn upload_from_file(file: &Path, alt: Option<String>) -> Result<ImageUpload> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let original_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("Invalid image filename")?;
    let mime_type = mime_guess::from_path(file).first().map(|m| m.essence_str().to_string());

    Ok(ImageUpload {
        original_name,
        bytes,
        mime_type,
        alt_text: alt,
    })
}

pub async fn list(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let (client, _) = session_client(&config)?;
    let client = Arc::new(client);
    let service = ImageService::new(Arc::clone(&client), client);
    let images = service.list().await.context("Failed to list images")?;

    if images.is_empty() {
        println!("No images uploaded yet");
        return Ok(());
    }
    let missing = service
        .missing_files(&images)
        .await
        .context("Failed to list stored files")?;

    for image in &images {
        println!("{}", image_line(image, missing.contains(&image.id)));
    }
    let total: u64 = images.iter().map(|i| i.size).sum();
    println!("\n{} images, {}", images.len(), format_file_size(total));
    if !missing.is_empty() {
        println!("{} records point at files no longer in storage", missing.len());
    }
    Ok(())
}

pub async fn upload(config_path: &Path, file: PathBuf, alt: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let (client, session) = session_client(&config)?;
    let client = Arc::new(client);
    let images = ImageService::new(Arc::clone(&client), client);

    println!("📤 Uploading {}...", file.display());
    let upload = upload_from_file(&file, alt)?;
    let image = images
        .upload(&session, upload)
        .await
        .context("Failed to upload image")?;

    println!("✅ Uploaded {} ({})", image.original_name, format_file_size(image.size));
    println!("   id:  {}", image.id);
    println!("   url: {}", image.public_url);
    Ok(())
}

pub async fn set_alt(config_path: &Path, id: &str, text: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let (client, _) = session_client(&config)?;
    let client = Arc::new(client);
    let images = ImageService::new(Arc::clone(&client), client);

    let image = images
        .update_alt_text(id, text.as_deref())
        .await
        .context("Failed to update alt text")?;
    match &image.alt_text {
        Some(alt) => println!("✅ Alt text of {} set to \"{}\"", image.original_name, alt),
        None => println!("✅ Alt text of {} cleared", image.original_name),
    }
    Ok(())
}

pub async fn delete(config_path: &Path, id: &str, force: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let (client, _) = session_client(&config)?;
    let client = Arc::new(client);
    let images = ImageService::new(Arc::clone(&client), client);

    let image = images.get(id).await?;
    if !force && !confirm(&format!("Delete image '{}' and its file?", image.original_name))? {
        println!("Cancelled");
        return Ok(());
    }

    images.delete(id).await.context("Failed to delete image")?;
    println!("✅ Deleted {}", image.original_name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_upload_from_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("cat.jpg");
        fs::write(&file, [0xff, 0xd8, 0xff]).unwrap();

        let upload = upload_from_file(&file, Some("A cat".to_string())).unwrap();
        assert_eq!(upload.original_name, "cat.jpg");
        assert_eq!(upload.bytes.len(), 3);
        assert_eq!(upload.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(upload.alt_text.as_deref(), Some("A cat"));
    }

    #[test]
    fn test_image_line_marks_missing_file() {
        let image = BlogImage {
            id: "img-1".to_string(),
            filename: "1717-cat.png".to_string(),
            original_name: "cat.png".to_string(),
            size: 2048,
            mime_type: "image/png".to_string(),
            storage_path: "u1/2024/06/1717-cat.png".to_string(),
            public_url: "memory://blog-images/u1/2024/06/1717-cat.png".to_string(),
            alt_text: None,
            created_at: chrono::Utc::now(),
            user_id: "u1".to_string(),
        };
        assert!(image_line(&image, false).ends_with("img-1"));
        assert!(image_line(&image, true).ends_with("file missing"));
    }

    #[test]
    fn test_upload_from_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(upload_from_file(&dir.path().join("nope.png"), None).is_err());
    }
}
