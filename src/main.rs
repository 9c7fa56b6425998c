use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use agora_rooms::booking::BookingService;
use agora_rooms::command;
use agora_rooms::config::Config;
use agora_rooms::engine::ReservationStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries replies; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    agora_rooms::observability::init(config.metrics_port)?;

    let store = Arc::new(ReservationStore::with_rooms(config.rooms.iter().cloned())?);
    let service = BookingService::new(store, config.hours);

    info!("agora-rooms ready");
    info!("  operating hours: {}", config.hours);
    info!("  rooms: {}", config.rooms.len());
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    // Stop on ctrl-c/SIGTERM as well as end of input
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    tracing::warn!("SIGTERM handler unavailable: {e}");
                    ctrl_c.await.ok();
                }
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
    };
    tokio::pin!(shutdown);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let mut reply = command::handle_line_json(&service, &line).await;
                reply.push('\n');
                stdout.write_all(reply.as_bytes()).await?;
                stdout.flush().await?;
            }
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    info!(
        "agora-rooms stopped with {} reservations in memory",
        service.store().reservation_count()
    );
    Ok(())
}
