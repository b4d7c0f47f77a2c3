use exn::ResultExt;
use pkgapi_cache::ResponseCache;
use pkgapi_config::Config;
use pkgapi_models::Platform;
use pkgapi_service::{DownloadQuery, PackageRequest, Service};
use pkgapi_store::Store;
use pkgapi_watch::source::HttpSource;
use pkgapi_watch::{SourceHandle, Watcher};
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{ErrorKind, Result};
use crate::{Cli, Command};

pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    tracing::debug!(db = %config.db.path.display(), "configuration loaded");
    match cli.command {
        // Links are pure formatting; no store needed.
        Command::Links { arch, api, variant, date } => links(&arch, &api, &variant, &date),
        command => {
            let store = Store::open(&config.db.path, config.db.timeout).await.or_raise(|| ErrorKind::Store)?;
            let result = dispatch(command, &config, &store).await;
            let closed = store.close(false, config.db.timeout).await.or_raise(|| ErrorKind::Store);
            result.and(closed)
        },
    }
}

async fn dispatch(command: Command, config: &Config, store: &Store) -> Result<()> {
    match command {
        Command::Watch { once } => watch(config, store, once).await,
        Command::List => {
            let body = service(config, store)?.list().await.or_raise(|| ErrorKind::Service)?;
            write_line(&body)
        },
        Command::Pkg { action, date, platform } => {
            let request = PackageRequest { action, date, platform };
            let count = service(config, store)?.toggle(&request).await.or_raise(|| ErrorKind::Service)?;
            let body = serde_json::json!({ "status": "OK", "count": count });
            write_line(body.to_string().as_bytes())
        },
        Command::History { platform } => {
            let platform = platform
                .map(|p| p.parse::<Platform>())
                .transpose()
                .or_raise(|| ErrorKind::Usage("bad platform value".to_string()))?;
            let history = service(config, store)?.history(platform).await.or_raise(|| ErrorKind::Service)?;
            for (key, record) in history {
                let line = serde_json::json!({ "key": key.to_string(), "record": record });
                write_line(line.to_string().as_bytes())?;
            }
            Ok(())
        },
        Command::Purge { yes } => {
            if !yes {
                exn::bail!(ErrorKind::Usage("refusing to purge without --yes".to_string()));
            }
            let removed = store.purge().await.or_raise(|| ErrorKind::Store)?;
            let body = serde_json::json!({ "status": "OK", "count": removed });
            write_line(body.to_string().as_bytes())
        },
        Command::Links { arch, api, variant, date } => links(&arch, &api, &variant, &date),
    }
}

fn links(arch: &str, api: &str, variant: &str, date: &str) -> Result<()> {
    let links = DownloadQuery::new(arch, api, variant, date).links().or_raise(|| ErrorKind::Service)?;
    let body = serde_json::to_vec(&links).or_raise(|| ErrorKind::Output)?;
    write_line(&body)
}

/// Service for a single command. Its cache lives only as long as the command,
/// so it needs no sweeper; a long-lived host calls [`Service::spawn_sweeper`].
fn service(config: &Config, store: &Store) -> Result<Service> {
    let cache = ResponseCache::new(config.cache.limit, config.cache.ttl).or_raise(|| ErrorKind::Config)?;
    Ok(Service::new(store.clone(), Arc::new(cache)))
}

async fn watch(config: &Config, store: &Store, once: bool) -> Result<()> {
    let source = HttpSource::new(&config.source.url_template, config.source.timeout, config.source.token.clone())
        .or_raise(|| ErrorKind::Watch)?;
    let source: SourceHandle = Arc::new(source);
    let watcher = Watcher::new(source, store.clone(), config.watch.interval);
    let cancel = CancellationToken::new();

    if once {
        let written = watcher.check_release(&cancel).await.or_raise(|| ErrorKind::Watch)?;
        tracing::info!(written, "poll cycle finished");
        return Ok(());
    }

    tracing::info!(interval = ?watcher.interval(), "watching for releases");
    let handle = watcher.start(cancel.clone());
    let signal = tokio::signal::ctrl_c().await.or_raise(|| ErrorKind::Signal);
    tracing::info!("shutting down");
    cancel.cancel();
    handle.await.or_raise(|| ErrorKind::Watch)?;
    signal
}

fn write_line(body: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(body).or_raise(|| ErrorKind::Output)?;
    stdout.write_all(b"\n").or_raise(|| ErrorKind::Output)?;
    stdout.flush().or_raise(|| ErrorKind::Output)
}
