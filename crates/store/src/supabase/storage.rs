use super::{SupabaseClient, network_error, parse_json, read_body};
use crate::BlobStore;
use async_trait::async_trait;
use blogkit_core::Result;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    name: String,
}

#[async_trait]
impl BlobStore for SupabaseClient {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        debug!(path, size = bytes.len(), "uploading object");
        let response = self
            .http
            .post(self.object_url(path))
            .headers(self.headers(None)?)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(network_error)?;

        read_body(response).await?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}/storage/v1/object/list/{}",
            self.base_url, self.bucket
        );
        let response = self
            .http
            .post(url)
            .headers(self.headers(None)?)
            .json(&serde_json::json!({
                "prefix": prefix,
                "limit": 1000,
                "offset": 0,
                "sortBy": { "column": "name", "order": "asc" }
            }))
            .send()
            .await
            .map_err(network_error)?;

        let body = read_body(response).await?;
        let entries: Vec<ObjectEntry> = parse_json(&body, "storage list")?;
        Ok(entries.into_iter().map(|e| e.name).collect())
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        debug!(?paths, "removing objects");
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);
        let response = self
            .http
            .delete(url)
            .headers(self.headers(None)?)
            .json(&serde_json::json!({ "prefixes": paths }))
            .send()
            .await
            .map_err(network_error)?;

        read_body(response).await?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url() {
        let client = SupabaseClient::new("https://demo.supabase.co", "k", "blog-images").unwrap();
        assert_eq!(
            client.public_url("u1/2024/06/1717-cat.png"),
            "https://demo.supabase.co/storage/v1/object/public/blog-images/u1/2024/06/1717-cat.png"
        );
    }
}
