//! `display`: the public board, redrawn on every change and every second.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use queueboard_client::{ClientConfig, EventFeed, QueueClient};
use queueboard_sync::DisplaySync;
use queueboard_sync::render::render_board;
use tokio::sync::mpsc;
use tracing::info;

/// Clear the terminal and home the cursor.
const CLEAR: &str = "\x1b[2J\x1b[H";

/// Buffered feed events between the socket and the sync loop.
const FEED_BUFFER: usize = 64;

pub async fn run(config: &ClientConfig) -> anyhow::Result<()> {
    let api = Arc::new(QueueClient::new(config)?);

    let (events_tx, events_rx) = mpsc::channel(FEED_BUFFER);
    let feed = EventFeed::new(&config.ws_url);
    info!(url = feed.url(), "subscribing to queue events");
    let feed = feed.spawn(events_tx);

    let sync = DisplaySync::new(api);
    let mut view = sync.subscribe();
    let sync = sync.spawn(events_rx);

    let mut clock = tokio::time::interval(Duration::from_secs(1));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = clock.tick() => {}
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut shutdown => {
                info!("shutting down display");
                break;
            }
        }

        let frame = render_board(&view.borrow_and_update(), &Local::now());
        let mut out = std::io::stdout().lock();
        writeln!(out, "{CLEAR}{frame}")?;
        out.flush()?;
    }

    // Stopping the feed closes the event channel, which ends the sync loop.
    feed.abort();
    let _ = sync.await;
    Ok(())
}
