use anyhow::{Context, Result};
use axum::{
    Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use blogkit_core::BlogConfig;
use blogkit_generator::SiteOptions;
use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::generate::build;
use super::load_config;

/// Editors emit bursts of events per save
const DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Clone)]
struct AppState {
    reload_tx: broadcast::Sender<()>,
}

const PREVIEW: SiteOptions = SiteOptions {
    strict: false,
    preview: true,
};

/// Generate the site, serve it, and regenerate whenever a template changes.
///
/// Pages are built with a live-reload script that listens on `/_reload`.
pub async fn run(config_path: &Path, port: u16) -> Result<()> {
    let config = load_config(config_path)?;

    println!("🔍 Starting preview server...");
    println!("   Templates: {}", config.paths.templates_dir.display());
    println!("   Output:    {}", config.paths.output_dir.display());

    if !config.paths.templates_dir.is_dir() {
        anyhow::bail!(
            "Templates directory does not exist: {}\nRun 'blogkit init' first",
            config.paths.templates_dir.display()
        );
    }

    let report = build(&config, PREVIEW).await?;
    println!("   ✓ Generated {} posts", report.post_count);

    // Create broadcast channel for reload events
    let (reload_tx, _) = broadcast::channel::<()>(100);

    let app = Router::new()
        .route("/_reload", get(sse_handler))
        .fallback_service(ServeDir::new(&config.paths.output_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState {
            reload_tx: reload_tx.clone(),
        });

    let watcher_config = config.clone();
    tokio::spawn(async move {
        if let Err(e) = watch_templates(watcher_config, reload_tx).await {
            tracing::error!("template watcher stopped: {:#}", e);
        }
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("\n🚀 Preview ready at: http://localhost:{}", port);
    println!("   Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to port")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Rebuild on template changes, then tell connected pages to reload
async fn watch_templates(config: BlogConfig, reload_tx: broadcast::Sender<()>) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(100);

    let mut watcher =
        notify::recommended_watcher(move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.blocking_send(event);
            }
        })?;
    watcher.watch(&config.paths.templates_dir, RecursiveMode::Recursive)?;

    while let Some(event) = rx.recv().await {
        if !is_relevant(&event) {
            continue;
        }

        tokio::time::sleep(DEBOUNCE).await;
        while rx.try_recv().is_ok() {}

        println!("   📝 Template changed, regenerating...");
        match build(&config, PREVIEW).await {
            Ok(report) => {
                tracing::info!(files = report.files.len(), "regenerated");
                let _ = reload_tx.send(());
            }
            Err(e) => eprintln!("   ❌ {:#}", e),
        }
    }

    Ok(())
}

/// Content changes to non-hidden, non-backup files
fn is_relevant(event: &NotifyEvent) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| {
        let filename = p.file_name().unwrap_or_default().to_string_lossy();
        !filename.starts_with('.') && !filename.ends_with('~')
    })
}

/// SSE endpoint for live reload
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl futures::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let mut rx = state.reload_tx.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(()) => yield Ok(Event::default().data("reload")),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
