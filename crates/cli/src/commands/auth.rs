use anyhow::{Context, Result};
use blogkit_core::{Error, Session};
use blogkit_store::Authenticator;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use super::{load_config, read_input, store_client};

/// Read instead of prompting when set
const PASSWORD_ENV: &str = "BLOGKIT_PASSWORD";

/// Get path to the remembered session
fn session_path() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".blogkit").join("session.toml"))
}

fn load_session_from(path: &Path) -> Result<Option<Session>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).context("Failed to read session file")?;
    let session: Session = toml::from_str(&contents).context("Failed to parse session file")?;
    Ok(Some(session))
}

fn save_session_to(path: &Path, session: &Session) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let contents = toml::to_string_pretty(session).context("Failed to serialize session")?;
    fs::write(path, contents).context("Failed to write session file")?;
    restrict_permissions(path)?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// The remembered session, or `Error::Unauthenticated` when absent or expired
pub fn require_session() -> Result<Session> {
    let session = load_session_from(&session_path()?)?
        .ok_or_else(|| Error::Unauthenticated("no saved session".to_string()))?;
    if session.is_expired(Utc::now()) {
        return Err(Error::Unauthenticated("the saved session has expired".to_string()).into());
    }
    Ok(session)
}

pub async fn login(config_path: &Path, email: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let client = store_client(&config)?;

    let email = match email {
        Some(email) => email,
        None => read_input("Email: ")?,
    };
    if email.is_empty() {
        anyhow::bail!("Email is required");
    }
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => read_input("Password: ")?,
    };
    if password.is_empty() {
        anyhow::bail!("Password is required");
    }

    let session = client
        .sign_in(&email, &password)
        .await
        .context("Sign-in failed")?;

    let path = session_path()?;
    save_session_to(&path, &session)?;

    println!("✅ Signed in as {}", session.user.email.as_deref().unwrap_or(&session.user.id));
    if let Some(expires) = session.expires_at {
        println!("   Session valid until {}", expires.format("%Y-%m-%d %H:%M UTC"));
    }
    println!("   Saved to: {}", path.display());
    Ok(())
}

pub async fn logout(config_path: &Path) -> Result<()> {
    let path = session_path()?;
    let Some(session) = load_session_from(&path)? else {
        println!("Not signed in");
        return Ok(());
    };

    // The local session is dropped even when the remote call fails
    let config = load_config(config_path)?;
    let remote = match store_client(&config) {
        Ok(client) => client.sign_out(&session).await.map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };
    fs::remove_file(&path).context("Failed to remove session file")?;

    match remote {
        Ok(()) => println!("✅ Signed out"),
        Err(e) => {
            tracing::warn!("remote sign-out failed: {:#}", e);
            println!("✅ Local session removed (remote sign-out failed)");
        }
    }
    Ok(())
}

pub async fn whoami(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let session = require_session()?;
    let user = store_client(&config)?
        .current_user(&session)
        .await
        .context("Failed to fetch the signed-in user")?;

    println!("👤 {}", user.email.as_deref().unwrap_or("(no email)"));
    println!("   id:      {}", user.id);
    println!("   created: {}", user.created_at.format("%Y-%m-%d"));
    if let Some(expires) = session.expires_at {
        println!("   session: valid until {}", expires.format("%Y-%m-%d %H:%M UTC"));
    }
    Ok(())
}
