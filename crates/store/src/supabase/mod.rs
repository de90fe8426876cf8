// Supabase REST client: PostgREST tables, Storage objects and GoTrue auth.

mod auth;
mod rest;
mod storage;

use blogkit_core::config::StoreConfig;
use blogkit_core::{Error, Result, Session};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;

/// Explicitly constructed handle to one Supabase project.
///
/// Without a session every request is made with the anon key; use
/// [`SupabaseClient::with_session`] to act as a signed-in user.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    bucket: String,
    access_token: Option<String>,
}

/// Error payloads differ between PostgREST, Storage and GoTrue
#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    details: Option<String>,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str, bucket: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("blogkit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(network_error)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            bucket: bucket.to_string(),
            access_token: None,
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let (url, key) = config.credentials()?;
        Self::new(url, key, &config.bucket)
    }

    /// Copy of this client that authenticates as the session's user
    pub fn with_session(&self, session: &Session) -> Self {
        Self {
            access_token: Some(session.access_token.clone()),
            ..self.clone()
        }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, endpoint)
    }

    /// `apikey` plus bearer token (session token when present, else the anon key)
    fn headers(&self, bearer: Option<&str>) -> Result<HeaderMap> {
        let token = bearer
            .or(self.access_token.as_deref())
            .unwrap_or(&self.anon_key);

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.anon_key)
                .map_err(|e| Error::InvalidData(format!("Invalid anon key: {}", e)))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| Error::InvalidData(format!("Invalid access token: {}", e)))?,
        );
        Ok(headers)
    }
}

fn network_error(err: reqwest::Error) -> Error {
    Error::store(format!("network error: {}", err))
}

/// Read a response, turning non-2xx statuses into a classified store error
async fn read_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await.map_err(network_error)?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(api_error(status.as_u16(), &body))
    }
}

fn api_error(status: u16, body: &str) -> Error {
    let detail = serde_json::from_str::<ApiError>(body)
        .ok()
        .and_then(|e| {
            let message = e.message.or(e.msg).or(e.error_description).or(e.error)?;
            Some(match e.details {
                Some(details) => format!("{} ({})", message, details),
                None => message,
            })
        })
        .unwrap_or_else(|| body.trim().to_string());

    let detail = match status {
        401 if !detail.to_lowercase().contains("jwt") => format!("auth failed: {}", detail),
        403 if !detail.to_lowercase().contains("permission") => {
            format!("permission denied: {}", detail)
        }
        _ => detail,
    };

    Error::store(format!("HTTP {}: {}", status, detail))
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &str, what: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| Error::InvalidData(format!("Unexpected {} response: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogkit_core::StoreErrorKind;

    fn client() -> SupabaseClient {
        SupabaseClient::new("https://demo.supabase.co/", "anon-key", "blog-images").unwrap()
    }

    #[test]
    fn test_urls() {
        let c = client();
        assert_eq!(c.rest_url("posts"), "https://demo.supabase.co/rest/v1/posts");
        assert_eq!(
            c.object_url("u1/2024/06/1-a.png"),
            "https://demo.supabase.co/storage/v1/object/blog-images/u1/2024/06/1-a.png"
        );
        assert_eq!(c.auth_url("user"), "https://demo.supabase.co/auth/v1/user");
    }

    #[test]
    fn test_headers_prefer_session_token() {
        let c = client();
        let headers = c.headers(None).unwrap();
        assert_eq!(headers["apikey"], "anon-key");
        assert_eq!(headers[AUTHORIZATION], "Bearer anon-key");

        let session: Session = serde_json::from_value(serde_json::json!({
            "access_token": "user-token",
            "user": { "id": "u1", "created_at": "2024-01-01T00:00:00Z" }
        }))
        .unwrap();
        let authed = c.with_session(&session);
        assert_eq!(authed.headers(None).unwrap()[AUTHORIZATION], "Bearer user-token");
        assert_eq!(authed.headers(None).unwrap()["apikey"], "anon-key");
    }

    #[test]
    fn test_api_error_postgrest_payload() {
        let body = r#"{"code":"23505","details":"Key (slug)=(hello) already exists.","hint":null,"message":"duplicate key value violates unique constraint \"posts_slug_key\""}"#;
        match api_error(409, body) {
            Error::Store { kind, message } => {
                assert_eq!(kind, StoreErrorKind::Database);
                assert!(message.contains("HTTP 409"));
                assert!(message.contains("already exists"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_auth_and_storage_payloads() {
        let err = api_error(400, r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#);
        assert!(matches!(err, Error::Store { kind: StoreErrorKind::Auth, .. }));

        let err = api_error(404, r#"{"statusCode":"404","error":"Bucket not found","message":"Bucket not found"}"#);
        assert!(matches!(err, Error::Store { kind: StoreErrorKind::Storage, .. }));

        let err = api_error(401, "plain text");
        assert!(matches!(err, Error::Store { kind: StoreErrorKind::Auth, .. }));

        let err = api_error(403, "{}");
        assert!(matches!(err, Error::Store { kind: StoreErrorKind::Permission, .. }));
    }
}
