use super::{SupabaseClient, network_error, parse_json, read_body};
use crate::Authenticator;
use async_trait::async_trait;
use blogkit_core::{Result, Session, User};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::info;

/// GoTrue password-grant response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)));

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

#[async_trait]
impl Authenticator for SupabaseClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .http
            .post(self.auth_url("token"))
            .headers(self.headers(None)?)
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(network_error)?;

        let body = read_body(response).await?;
        let token: TokenResponse = parse_json(&body, "sign-in")?;
        let session = token.into_session(Utc::now());
        info!(user_id = %session.user.id, "signed in");
        Ok(session)
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        let response = self
            .http
            .post(self.auth_url("logout"))
            .headers(self.headers(Some(&session.access_token))?)
            .send()
            .await
            .map_err(network_error)?;

        read_body(response).await?;
        info!(user_id = %session.user.id, "signed out");
        Ok(())
    }

    async fn current_user(&self, session: &Session) -> Result<User> {
        let response = self
            .http
            .get(self.auth_url("user"))
            .headers(self.headers(Some(&session.access_token))?)
            .send()
            .await
            .map_err(network_error)?;

        let body = read_body(response).await?;
        parse_json(&body, "user")
    }
}
