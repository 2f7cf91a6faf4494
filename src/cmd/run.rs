//! `redirector run` — start the redirect server.
//!
//! Loads the domain mappings, binds the redirect listener (and the admin
//! listener when `--admin-port` is set), serves until SIGTERM / Ctrl+C,
//! and runs a background refresh loop that hot-reloads changed mappings.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::cli::RunArgs;
use crate::config::sources::env::EnvSource;
use crate::config::sources::{file_source_for, is_supported, AUTO_DETECT_CANDIDATES};
use crate::config::{ConfigResolver, ConfigSource};
use crate::error::RedirectorError;
use crate::logging;
use crate::redirect::Dispatcher;
use crate::server::{self, AppState, LoadedConfig};

pub async fn execute(args: RunArgs) -> Result<(), RedirectorError> {
    logging::init(
        &args.log_level,
        logging::resolve_format(args.pretty, args.json),
    );

    let resolver = resolve_config_sources(&args).await?;
    let loaded = resolver.load_with_fallback().await?;
    let mapping_count = loaded.config.mappings.len();
    let target_count = loaded.config.total_targets();

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    // Port 0 binds an ephemeral port; the matcher needs the real one.
    let listen_port = listener.local_addr()?.port();

    let options = args.redirect_options();
    let state = Arc::new(AppState::new(
        LoadedConfig::new(loaded.config, loaded.version, loaded.source_name),
        Dispatcher::new(listen_port, options),
    ));

    // Shutdown signal: flipping to `true` stops the refresh loop and the admin listener
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let refresh_handle = if args.poll_interval > 0 {
        let refresh_state = Arc::clone(&state);
        let poll_interval = Duration::from_secs(args.poll_interval);
        let rx = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            config_refresh_loop(refresh_state, resolver, poll_interval, rx).await;
        }))
    } else {
        None
    };

    let admin_handle = match args.admin_port {
        Some(port) => {
            let admin_addr: SocketAddr = format!("{}:{}", args.host, port).parse()?;
            let admin_listener = TcpListener::bind(admin_addr).await?;
            let admin_router = server::build_admin_router(Arc::clone(&state));
            let rx = shutdown_rx.clone();
            tracing::info!(addr = %admin_addr, "admin listener started");
            Some(tokio::spawn(async move {
                axum::serve(admin_listener, admin_router)
                    .with_graceful_shutdown(wait_for_shutdown(rx))
                    .await
            }))
        }
        None => None,
    };

    tracing::info!(
        addr = %addr,
        listen_port,
        mappings = mapping_count,
        targets = target_count,
        preserve_path = options.preserve_path,
        add_timestamp = options.add_timestamp,
        add_referral = options.add_referral,
        "redirector started"
    );

    let router = server::build_router(state);
    let graceful_shutdown = async move {
        server::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(graceful_shutdown)
        .await?;

    if let Some(handle) = admin_handle {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "admin listener failed"),
            Err(e) => tracing::error!(error = %e, "admin listener task failed"),
        }
    }

    // Wait for the config refresh task to finish (catches panics)
    if let Some(handle) = refresh_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "config refresh task failed");
        }
    }

    tracing::info!("redirector stopped");
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    // A dropped sender also means shutdown.
    let _ = rx.wait_for(|stopped| *stopped).await;
}

/// A mappings file (explicit or auto-detected) is primary with the
/// environment as fallback; without a file the environment is primary.
async fn resolve_config_sources(args: &RunArgs) -> Result<ConfigResolver, RedirectorError> {
    let env_source: Box<dyn ConfigSource> = Box::new(EnvSource::new(&args.mapping_prefix));

    match resolve_file_source(args.config.as_deref(), Path::new(".")).await? {
        Some(file_source) => Ok(ConfigResolver::new(file_source, Some(env_source))),
        None => Ok(ConfigResolver::new(env_source, None)),
    }
}

/// Candidates whose format this build cannot read are skipped.
async fn resolve_file_source(
    explicit: Option<&Path>,
    search_dir: &Path,
) -> Result<Option<Box<dyn ConfigSource>>, RedirectorError> {
    if let Some(path) = explicit {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(RedirectorError::ConfigFileNotFound {
                path: path.to_path_buf(),
            });
        }
        return Ok(Some(Box::new(file_source_for(path)?)));
    }

    for name in AUTO_DETECT_CANDIDATES {
        let path = search_dir.join(name);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            continue;
        }
        if !is_supported(&path) {
            tracing::warn!(
                path = %path.display(),
                "found mappings file in a format this build does not support, skipping"
            );
            continue;
        }
        tracing::info!(path = %path.display(), "auto-detected mappings file");
        return Ok(Some(Box::new(file_source_for(&path)?)));
    }

    Ok(None)
}

async fn config_refresh_loop(
    state: Arc<AppState>,
    resolver: ConfigResolver,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(interval);
    interval.tick().await; // Skip first immediate tick

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => {
                tracing::debug!("config refresh loop shutting down");
                return;
            }
        }

        let (current_source, current_version) = {
            let current = state.config.read().await;
            (current.source_name.clone(), current.version.clone())
        };

        match resolver.reload(&current_source, &current_version).await {
            Ok(Some(loaded)) => {
                let mapping_count = loaded.config.mappings.len();
                let version = loaded.version.short().to_string();
                let mut current = state.config.write().await;
                current.config = Arc::new(loaded.config);
                current.version = loaded.version;
                current.source_name = loaded.source_name.to_string();
                current.loaded_at = Instant::now();
                drop(current);
                state.stats.config_reloads.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    source = loaded.source_name,
                    mappings = mapping_count,
                    version = %version,
                    "mappings reloaded"
                );
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(
                    source = %current_source,
                    error = %e,
                    "mapping reload failed, keeping current mappings"
                );
            }
        }
    }
}

#[cfg(all(test, feature = "yaml"))]
mod tests {
    use super::*;
    use crate::config::model::{DomainMapping, RedirectOptions};
    use crate::redirect::Outcome;

    const TICK: Duration = Duration::from_millis(25);

    const TWO_TARGETS: &str =
        "mappings:\n  - domain: example.com\n    targets: [\"http://a.local\", \"http://b.local\"]\n";
    const THREE_TARGETS: &str = "mappings:\n  - domain: example.com\n    targets: [\"http://a.local\", \"http://b.local\", \"http://c.local\"]\n";

    struct Running {
        state: Arc<AppState>,
        shutdown: watch::Sender<bool>,
        handle: tokio::task::JoinHandle<()>,
    }

    impl Running {
        async fn stop(self) {
            let _ = self.shutdown.send(true);
            self.handle.await.unwrap();
        }
    }

    /// Mappings file as primary, an environment prefix nothing uses as fallback.
    async fn start(path: &Path, env_prefix: &str) -> Running {
        let resolver = ConfigResolver::new(
            Box::new(file_source_for(path).unwrap()),
            Some(Box::new(EnvSource::new(env_prefix))),
        );
        let loaded = resolver.load_with_fallback().await.unwrap();
        let state = Arc::new(AppState::new(
            LoadedConfig::new(loaded.config, loaded.version, loaded.source_name),
            Dispatcher::new(8080, RedirectOptions::default()),
        ));

        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(config_refresh_loop(Arc::clone(&state), resolver, TICK, rx));
        Running {
            state,
            shutdown,
            handle,
        }
    }

    /// Replace the file in one rename so the refresh loop never reads a partial write.
    fn write_mappings(path: &Path, content: &str) {
        let staged = path.with_extension("staged");
        std::fs::write(&staged, content).unwrap();
        std::fs::rename(&staged, path).unwrap();
    }

    async fn wait_for_reloads(state: &AppState, count: u64) {
        for _ in 0..80 {
            if state.stats.config_reloads.load(Ordering::Relaxed) >= count {
                return;
            }
            tokio::time::sleep(TICK).await;
        }
        panic!("expected {count} reloads");
    }

    async fn mappings(state: &AppState) -> Vec<DomainMapping> {
        state.config.read().await.config.mappings.clone()
    }

    async fn next_location(state: &AppState) -> String {
        let config = Arc::clone(&state.config.read().await.config);
        match state
            .dispatcher
            .dispatch(&config.mappings, "example.com", "/")
            .unwrap()
        {
            Outcome::Redirect { location, .. } => location,
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn changed_file_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("redirector.yaml");
        write_mappings(&path, TWO_TARGETS);
        let running = start(&path, "REDIRECTOR_RUN_TEST_PICKUP_").await;

        write_mappings(&path, THREE_TARGETS);
        wait_for_reloads(&running.state, 1).await;

        assert_eq!(mappings(&running.state).await[0].targets.len(), 3);
        assert_eq!(running.state.config.read().await.source_name, "yaml");
        running.stop().await;
    }

    #[tokio::test]
    async fn broken_file_keeps_current_mappings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("redirector.yaml");
        write_mappings(&path, TWO_TARGETS);
        let running = start(&path, "REDIRECTOR_RUN_TEST_BROKEN_").await;
        let before = mappings(&running.state).await;

        write_mappings(&path, "mappings: [ this is : broken");
        tokio::time::sleep(TICK * 8).await;

        assert_eq!(mappings(&running.state).await, before);
        assert_eq!(running.state.config.read().await.source_name, "yaml");
        assert_eq!(running.state.stats.config_reloads.load(Ordering::Relaxed), 0);

        // Fixing the file resumes reloads from it.
        write_mappings(&path, THREE_TARGETS);
        wait_for_reloads(&running.state, 1).await;
        assert_eq!(mappings(&running.state).await[0].targets.len(), 3);
        running.stop().await;
    }

    #[tokio::test]
    async fn started_on_fallback_does_not_reload_every_tick() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("redirector.yaml");
        write_mappings(&path, "mappings: [ this is : broken");
        let running = start(&path, "REDIRECTOR_RUN_TEST_FALLBACK_").await;
        assert_eq!(running.state.config.read().await.source_name, "env");

        tokio::time::sleep(TICK * 8).await;
        assert_eq!(running.state.stats.config_reloads.load(Ordering::Relaxed), 0);

        write_mappings(&path, TWO_TARGETS);
        wait_for_reloads(&running.state, 1).await;
        assert_eq!(running.state.config.read().await.source_name, "yaml");
        assert_eq!(mappings(&running.state).await.len(), 1);
        running.stop().await;
    }

    #[tokio::test]
    async fn rotation_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("redirector.yaml");
        write_mappings(&path, TWO_TARGETS);
        let running = start(&path, "REDIRECTOR_RUN_TEST_ROTATION_").await;

        assert_eq!(next_location(&running.state).await, "http://a.local/");

        write_mappings(&path, THREE_TARGETS);
        wait_for_reloads(&running.state, 1).await;

        assert_eq!(next_location(&running.state).await, "http://b.local/");
        assert_eq!(next_location(&running.state).await, "http://c.local/");
        assert_eq!(next_location(&running.state).await, "http://a.local/");
        running.stop().await;
    }

    #[tokio::test]
    async fn explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        let err = resolve_file_source(Some(&missing), dir.path())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, RedirectorError::ConfigFileNotFound { .. }));
    }

    #[tokio::test]
    async fn auto_detects_yaml_in_search_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_file_source(None, dir.path()).await.unwrap().is_none());

        std::fs::write(dir.path().join("redirector.yml"), TWO_TARGETS).unwrap();
        let source = resolve_file_source(None, dir.path()).await.unwrap().unwrap();
        assert_eq!(source.name(), "yaml");
    }

    #[cfg(not(feature = "json"))]
    #[tokio::test]
    async fn auto_detect_skips_formats_this_build_cannot_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("redirector.json"), "{\"mappings\": []}").unwrap();
        assert!(resolve_file_source(None, dir.path()).await.unwrap().is_none());

        std::fs::write(dir.path().join("redirector.yaml"), TWO_TARGETS).unwrap();
        let source = resolve_file_source(None, dir.path()).await.unwrap().unwrap();
        assert_eq!(source.name(), "yaml");
    }
}
