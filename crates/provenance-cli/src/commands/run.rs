use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{info, warn};

use provenance_core::{
    endpoints::NewEndpoint,
    feed::HttpFetcher,
    pipeline::{build_scheduler, seed_store},
    scheduler::SchedulerEvent,
    storage::Database,
    AppConfig,
};

pub async fn run(config: &AppConfig, extra: &[NewEndpoint]) -> Result<()> {
    let db = Database::new_in_memory().await?;
    seed_store(&db, config, extra).await?;

    let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut scheduler = build_scheduler(&db, config, fetcher)?.with_event_sender(event_tx);

    let events = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                SchedulerEvent::TickCompleted(report) if report.discovered > 0 => {
                    info!(
                        "Tick: {} discovered, {} succeeded, {} failed, {} abandoned",
                        report.discovered, report.succeeded, report.failed, report.abandoned
                    );
                }
                SchedulerEvent::TickCompleted(_) => {}
                SchedulerEvent::TaskFailed {
                    worker,
                    task,
                    message,
                    retryable,
                } => {
                    warn!(
                        "[{}] {} failed{}: {}",
                        worker,
                        task,
                        if retryable { "" } else { " permanently" },
                        message
                    );
                }
            }
        }
    });

    scheduler.start()?;
    println!(
        "Polling every {} seconds. Press Ctrl+C to stop.",
        config.scheduler.interval_secs
    );

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    scheduler.stop().await;
    drop(scheduler);
    events.await.ok();

    println!("Stopped.");
    Ok(())
}
